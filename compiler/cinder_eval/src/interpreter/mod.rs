//! Tree-walking interpreter for Cinder.
//!
//! # Architecture
//!
//! An [`Interpreter`] evaluates one program. Everything that must be
//! consistent across programs (configuration, storage, the reference table,
//! the type registry, the call stack and the import cache) lives in a
//! `SharedState` that imported programs' sub-interpreters share.
//!
//! Evaluation is split by concern:
//!
//! - `declarations` - binding a program's globals, base values
//! - `statements` / `expressions` - the executor proper
//! - `assignment` - places, `=`, `<-`, `<-!` and swap
//! - `members` / `methods` - member and index access, builtin members
//! - `invocation` - the invocation pipeline with conditions
//! - `composites` - constructors and contract singletons
//! - `references` / `transfer` - references and the copy-or-move protocol
//! - `destroy` - the destruction engine
//! - `events` / `imports` / `storage_api` - host-facing operations
//!
//! # Panic boundary
//!
//! `interpret` and `invoke` are the only entry points that run program code.
//! Both go through `guarded`, which converts a panic into a fatal internal
//! error unless the host disabled recovery.

mod assignment;
mod builder;
mod composites;
mod declarations;
mod destroy;
mod events;
mod expressions;
mod imports;
mod interned_names;
mod invocation;
mod members;
mod methods;
mod references;
mod scope_guard;
mod statements;
mod storage_api;
mod transfer;
mod type_codes;

pub use builder::InterpreterBuilder;
pub use type_codes::{
    CompositeCode, ConditionSource, DestructorPlan, FunctionSource, InterfaceCode, MethodPlan,
    Origin, TypeRegistry,
};

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use cinder_ir::ast::Program;
use cinder_ir::{Location, LocationRange, Name, SharedInterner, Span};
use rustc_hash::FxHashMap;

use crate::config::{ComputationKind, Config};
use crate::diagnostics::CallStack;
use crate::environment::{Mutability, Ownership, ScopeRef, Slot};
use crate::errors::{
    computation_limit_exceeded, internal_error, invalidated_resource, not_invokable,
    storage_health, undefined_variable, use_before_initialization, EvalResult,
};
use crate::reference_table::ReferenceTable;
use crate::storage::Storage;
use crate::value::Value;

use interned_names::Names;
use scope_guard::BeforeSnapshots;

/// Storage shared between an interpreter and its host.
pub type SharedStorage = Rc<RefCell<dyn Storage>>;

/// State shared by an interpreter and all of its sub-interpreters.
pub(crate) struct SharedState {
    pub(crate) config: Config,
    pub(crate) storage: SharedStorage,
    pub(crate) references: RefCell<ReferenceTable>,
    pub(crate) types: RefCell<TypeRegistry>,
    pub(crate) call_stack: RefCell<CallStack>,
    /// Every program loaded so far, by location.
    pub(crate) programs: RefCell<FxHashMap<Location, LoadedProgram>>,
}

/// A program's global scope and the value names it declares.
#[derive(Clone)]
pub(crate) struct LoadedProgram {
    pub(crate) scope: ScopeRef,
    pub(crate) names: Vec<Name>,
}

/// Tree-walking interpreter bound to one program.
pub struct Interpreter {
    pub(crate) interner: SharedInterner,
    pub(crate) names: Names,
    program: Rc<Program>,
    /// Location of the code currently executing.
    pub(crate) location: Location,
    pub(crate) globals: ScopeRef,
    /// Current scope.
    pub(crate) env: ScopeRef,
    pub(crate) shared: Rc<SharedState>,
    /// Snapshots visible to the post-condition being evaluated.
    pub(crate) before: Option<BeforeSnapshots>,
    declared: bool,
}

impl Interpreter {
    fn with_shared(
        interner: SharedInterner,
        program: Rc<Program>,
        shared: Rc<SharedState>,
    ) -> Self {
        let names = Names::new(&interner);
        let globals = ScopeRef::global();
        let location = program.location.clone();
        let mut interpreter = Interpreter {
            interner,
            names,
            program,
            location,
            env: globals.clone(),
            globals,
            shared,
            before: None,
            declared: false,
        };
        interpreter.declare_base_values();
        interpreter
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    /// Location of the program this interpreter was built for.
    pub fn program_location(&self) -> &Location {
        &self.program.location
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn storage(&self) -> Ref<'_, dyn Storage> {
        self.shared.storage.borrow()
    }

    pub fn storage_handle(&self) -> SharedStorage {
        Rc::clone(&self.shared.storage)
    }

    pub fn globals(&self) -> &ScopeRef {
        &self.globals
    }

    /// Number of live entries in the reference table.
    pub fn live_references(&self) -> usize {
        let mut table = self.shared.references.borrow_mut();
        table.prune();
        table.len()
    }

    /// Declare the program's globals and initialize its global variables,
    /// in declaration order. Contracts stay lazy until first access.
    #[tracing::instrument(level = "debug", skip_all, fields(location = %self.location))]
    pub fn interpret(&mut self) -> EvalResult<()> {
        self.guarded(|interpreter| {
            interpreter.ensure_declared()?;
            interpreter.initialize_globals()
        })
    }

    /// Invoke the global function `name` with host-supplied arguments.
    #[tracing::instrument(level = "debug", skip_all, fields(function = name))]
    pub fn invoke(&mut self, name: &str, arguments: Vec<Value>) -> EvalResult {
        let name = self.interner.intern(name);
        let result = self.guarded(|interpreter| {
            interpreter.ensure_declared()?;
            let site = interpreter.range(Span::DUMMY);
            let callee = interpreter.read_global(name)?;
            let Value::Function(function) = callee else {
                return Err(not_invokable(callee.type_name()).with_location(site));
            };
            let arguments = arguments
                .into_iter()
                .map(|argument| interpreter.transfer(argument, None))
                .collect::<EvalResult<Vec<_>>>()?;
            interpreter.call_function(&function, arguments, &site)
        })?;
        if self.shared.config.validate_storage {
            self.shared
                .storage
                .borrow()
                .check_health()
                .map_err(|err| storage_health(err.to_string()))?;
        }
        Ok(result)
    }

    /// An interpreter for another program that shares this interpreter's
    /// storage, reference table, type registry and configuration.
    pub fn new_sub_interpreter(&self, program: Rc<Program>, location: Location) -> Interpreter {
        tracing::debug!(%location, "creating sub-interpreter");
        let mut interpreter =
            Interpreter::with_shared(self.interner.clone(), program, Rc::clone(&self.shared));
        interpreter.location = location;
        interpreter
    }

    /// Bind or rebind a global, for host-provided values.
    pub fn define_global(&mut self, name: &str, value: Value) {
        let name = self.interner.intern(name);
        self.globals
            .declare(name, value, Mutability::Constant, Ownership::Owned);
    }

    /// Read a global by name, initializing it if it is still lazy.
    pub fn global(&mut self, name: &str) -> EvalResult {
        let name = self.interner.intern(name);
        self.guarded(|interpreter| {
            interpreter.ensure_declared()?;
            interpreter.read_global(name)
        })
    }

    /// Render a value for display.
    pub fn render(&self, value: &Value) -> String {
        value.display(&self.interner).to_string()
    }

    // Shared helpers

    #[inline]
    pub(crate) fn range(&self, span: Span) -> LocationRange {
        LocationRange::new(self.location.clone(), span)
    }

    #[inline]
    pub(crate) fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Account for one unit of metered work.
    pub(crate) fn meter(&self, kind: ComputationKind) -> EvalResult<()> {
        if let Some(meter) = &self.shared.config.meter {
            meter
                .meter(kind)
                .map_err(|refused| computation_limit_exceeded(refused.kind.name(), refused.limit))?;
        }
        Ok(())
    }

    fn ensure_declared(&mut self) -> EvalResult<()> {
        if !self.declared {
            self.declared = true;
            let program = Rc::clone(&self.program);
            let location = self.location.clone();
            let globals = self.globals.clone();
            self.with_context(globals, location, None, |interpreter| {
                interpreter.declare_program(&program)
            })?;
        }
        Ok(())
    }

    fn read_global(&mut self, name: Name) -> EvalResult {
        let globals = self.globals.clone();
        self.read_slot(&globals, name)
    }

    /// Read `name` from the current scope chain.
    pub(crate) fn read_variable(&mut self, name: Name) -> EvalResult {
        let scope = self
            .env
            .find(name)
            .ok_or_else(|| undefined_variable(self.name_str(name)))?;
        self.read_slot(&scope, name)
    }

    /// Read `name` from `scope`, forcing a lazy slot.
    pub(crate) fn read_slot(&mut self, scope: &ScopeRef, name: Name) -> EvalResult {
        match scope.slot(name) {
            Some(Slot::Value(value)) => Ok(value),
            Some(Slot::Moved) => Err(invalidated_resource(self.name_str(name))),
            Some(Slot::Lazy(_)) => self.force_lazy(scope, name),
            Some(Slot::Initializing) => Err(use_before_initialization(self.name_str(name))),
            None => Err(undefined_variable(self.name_str(name))),
        }
    }

    /// Run `f` behind the panic boundary.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        if !self.shared.config.recover_panics {
            return f(self);
        }
        let depth = self.shared.call_stack.borrow().depth();
        let env = self.env.clone();
        let location = self.location.clone();
        match catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(result) => result,
            Err(payload) => {
                self.shared.call_stack.borrow_mut().truncate(depth);
                self.env = env;
                self.location = location;
                self.before = None;
                let message = panic_message(payload.as_ref());
                tracing::warn!(%message, "recovered from panic during evaluation");
                Err(internal_error(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluation panicked".to_string()
    }
}
