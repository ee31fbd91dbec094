//! RAII guards for the interpreter's evaluation context.
//!
//! The context is the current scope, the location of the executing code and
//! the `before(...)` snapshots visible to post-conditions. Invocations,
//! blocks, conditions and lazy global initializers all switch it; the
//! [`ScopedInterpreter`] guard restores the previous context when dropped,
//! including during unwinding and on early `?` returns.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use cinder_ir::ast::ExprId;
use cinder_ir::Location;
use rustc_hash::FxHashMap;

use super::Interpreter;
use crate::environment::ScopeRef;
use crate::value::Value;

/// `before(...)` values of one condition source, keyed by the operand.
pub(crate) type BeforeSnapshots = Rc<FxHashMap<ExprId, Value>>;

struct SavedContext {
    env: ScopeRef,
    location: Location,
    before: Option<BeforeSnapshots>,
}

/// Guard that restores the evaluation context on drop.
///
/// Access the interpreter through this guard; it implements `Deref` and
/// `DerefMut`.
pub(crate) struct ScopedInterpreter<'guard> {
    interpreter: &'guard mut Interpreter,
    saved: Option<SavedContext>,
}

impl Drop for ScopedInterpreter<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.interpreter.env = saved.env;
            self.interpreter.location = saved.location;
            self.interpreter.before = saved.before;
        }
    }
}

impl Deref for ScopedInterpreter<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for ScopedInterpreter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl Interpreter {
    /// Switch to `env`, `location` and `before` until the guard drops.
    pub(crate) fn scoped(
        &mut self,
        env: ScopeRef,
        location: Location,
        before: Option<BeforeSnapshots>,
    ) -> ScopedInterpreter<'_> {
        let saved = SavedContext {
            env: std::mem::replace(&mut self.env, env),
            location: std::mem::replace(&mut self.location, location),
            before: std::mem::replace(&mut self.before, before),
        };
        ScopedInterpreter {
            interpreter: self,
            saved: Some(saved),
        }
    }

    /// Run `f` in `env`, keeping the current location and `before` snapshots.
    pub(crate) fn with_env<T>(&mut self, env: ScopeRef, f: impl FnOnce(&mut Self) -> T) -> T {
        let location = self.location.clone();
        let before = self.before.clone();
        let mut scoped = self.scoped(env, location, before);
        f(&mut scoped)
    }

    /// Run `f` in a different program's context.
    pub(crate) fn with_context<T>(
        &mut self,
        env: ScopeRef,
        location: Location,
        before: Option<BeforeSnapshots>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let mut scoped = self.scoped(env, location, before);
        f(&mut scoped)
    }
}
