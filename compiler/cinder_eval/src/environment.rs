//! Environment for variable scoping in the interpreter.
//!
//! Scopes form a chain through parent pointers. Function scopes are children
//! of the scope the function was declared in, so closures see their lexical
//! environment and never the caller's.
//!
//! Each variable records whether its scope owns the value. Owned resources
//! still present when a transient scope exits are a loss-of-resource error;
//! borrowed bindings (`self`, `result`, condition parameters, loop variables
//! over resource collections) are exempt.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use cinder_ir::ast::VariableDecl;
use cinder_ir::{Location, Name, TypeId};
use indexmap::IndexMap;

use crate::value::Value;

/// Whether a binding can be reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    /// `let`
    Constant,
    /// `var`
    Variable,
}

impl Mutability {
    #[inline]
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Variable)
    }
}

/// Whether the scope is responsible for the value it binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// Deferred initializer of a global slot.
#[derive(Clone)]
pub enum LazyInit {
    /// A global variable declaration.
    Variable {
        decl: Rc<VariableDecl>,
        location: Location,
    },
    /// A contract singleton, constructed at first access.
    Contract { type_id: TypeId },
    /// A name bound in another program's global scope.
    Imported { scope: ScopeRef, name: Name },
}

impl fmt::Debug for LazyInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LazyInit::Variable { location, .. } => write!(f, "Variable({location})"),
            LazyInit::Contract { type_id } => write!(f, "Contract({type_id})"),
            LazyInit::Imported { name, .. } => write!(f, "Imported({name:?})"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Slot {
    Value(Value),
    /// The resource was moved out.
    Moved,
    Lazy(LazyInit),
    /// A lazy initializer is running; reading now is a use before initialization.
    Initializing,
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub slot: Slot,
    pub mutability: Mutability,
    pub ownership: Ownership,
}

/// Error returned by `ScopeRef::assign`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignError {
    /// Variable exists but is a constant.
    Constant,
    /// Variable not found in any scope.
    Undefined,
}

/// A single scope containing variable bindings.
#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    bindings: IndexMap<Name, Variable>,
    parent: Option<ScopeRef>,
}

/// Shared handle to a scope.
#[derive(Clone)]
pub struct ScopeRef(Rc<RefCell<Scope>>);

impl fmt::Debug for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(scope) => write!(
                f,
                "Scope({:?}, {} bindings)",
                scope.kind,
                scope.bindings.len()
            ),
            Err(_) => f.write_str("Scope(<borrowed>)"),
        }
    }
}

impl ScopeRef {
    /// A fresh global scope.
    pub fn global() -> Self {
        ScopeRef(Rc::new(RefCell::new(Scope {
            kind: ScopeKind::Global,
            bindings: IndexMap::new(),
            parent: None,
        })))
    }

    /// A child scope of this one.
    pub fn child(&self, kind: ScopeKind) -> Self {
        ScopeRef(Rc::new(RefCell::new(Scope {
            kind,
            bindings: IndexMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn kind(&self) -> ScopeKind {
        self.0.borrow().kind
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.0.borrow().parent.clone()
    }

    pub fn ptr_eq(&self, other: &ScopeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Bind `name` in this scope.
    ///
    /// Returns `false` if the name is already bound in this non-global scope.
    /// Global scopes allow rebinding.
    pub fn declare(
        &self,
        name: Name,
        value: Value,
        mutability: Mutability,
        ownership: Ownership,
    ) -> bool {
        self.declare_slot(name, Slot::Value(value), mutability, ownership)
    }

    /// Bind a lazily initialized global.
    pub fn declare_lazy(&self, name: Name, init: LazyInit, mutability: Mutability) -> bool {
        self.declare_slot(name, Slot::Lazy(init), mutability, Ownership::Owned)
    }

    fn declare_slot(
        &self,
        name: Name,
        slot: Slot,
        mutability: Mutability,
        ownership: Ownership,
    ) -> bool {
        let mut scope = self.0.borrow_mut();
        if scope.kind != ScopeKind::Global && scope.bindings.contains_key(&name) {
            return false;
        }
        scope.bindings.insert(
            name,
            Variable {
                slot,
                mutability,
                ownership,
            },
        );
        true
    }

    /// The innermost scope binding `name`.
    pub fn find(&self, name: Name) -> Option<ScopeRef> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.0.borrow().bindings.contains_key(&name) {
                return Some(scope);
            }
            current = scope.parent();
        }
        None
    }

    /// The slot of `name` in this scope only.
    pub fn slot(&self, name: Name) -> Option<Slot> {
        self.0.borrow().bindings.get(&name).map(|v| v.slot.clone())
    }

    pub fn mutability(&self, name: Name) -> Option<Mutability> {
        self.0.borrow().bindings.get(&name).map(|v| v.mutability)
    }

    /// Replace the slot of `name` in this scope, returning the previous one.
    pub fn replace_slot(&self, name: Name, slot: Slot) -> Option<Slot> {
        self.0
            .borrow_mut()
            .bindings
            .get_mut(&name)
            .map(|v| std::mem::replace(&mut v.slot, slot))
    }

    /// Start forcing a lazy slot: returns its initializer and marks the slot
    /// as initializing.
    pub fn begin_initialization(&self, name: Name) -> Option<LazyInit> {
        let mut scope = self.0.borrow_mut();
        let variable = scope.bindings.get_mut(&name)?;
        match std::mem::replace(&mut variable.slot, Slot::Initializing) {
            Slot::Lazy(init) => Some(init),
            other => {
                variable.slot = other;
                None
            }
        }
    }

    /// Move the value out of `name`, leaving the slot moved.
    pub fn take(&self, name: Name) -> Option<Slot> {
        self.find(name)
            .and_then(|scope| scope.replace_slot(name, Slot::Moved))
    }

    /// Assign to the innermost binding of `name`, returning the previous slot.
    pub fn assign(&self, name: Name, value: Value) -> Result<Slot, AssignError> {
        let scope = self.find(name).ok_or(AssignError::Undefined)?;
        let mut scope = scope.0.borrow_mut();
        let variable = scope
            .bindings
            .get_mut(&name)
            .ok_or(AssignError::Undefined)?;
        // A moved constant may be re-initialized; anything else is a reassignment.
        if !variable.mutability.is_mutable() && !matches!(variable.slot, Slot::Moved) {
            return Err(AssignError::Constant);
        }
        Ok(std::mem::replace(&mut variable.slot, Slot::Value(value)))
    }

    /// First owned binding that still holds a live resource.
    pub fn unconsumed_resource(&self) -> Option<Name> {
        let scope = self.0.borrow();
        scope.bindings.iter().find_map(|(name, variable)| {
            match (&variable.slot, variable.ownership) {
                (Slot::Value(value), Ownership::Owned) if value.is_resource() => Some(*name),
                _ => None,
            }
        })
    }

    /// Values owned by this scope.
    pub fn owned_values(&self) -> Vec<Value> {
        let scope = self.0.borrow();
        scope
            .bindings
            .values()
            .filter_map(|variable| match (&variable.slot, variable.ownership) {
                (Slot::Value(value), Ownership::Owned) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names bound in this scope, in declaration order.
    pub fn names(&self) -> Vec<Name> {
        self.0.borrow().bindings.keys().copied().collect()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use cinder_ir::StringInterner;
    use pretty_assertions::assert_eq;

    fn value_of(scope: &ScopeRef, name: Name) -> Option<Value> {
        match scope.find(name)?.slot(name)? {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let global = ScopeRef::global();
        global.declare(x, Value::int(1), Mutability::Constant, Ownership::Owned);
        let inner = global.child(ScopeKind::Block);
        inner.declare(x, Value::int(2), Mutability::Constant, Ownership::Owned);
        assert_eq!(value_of(&inner, x), Some(Value::int(2)));
        assert_eq!(value_of(&global, x), Some(Value::int(1)));
    }

    #[test]
    fn test_redeclaration_only_rejected_in_local_scopes() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let global = ScopeRef::global();
        assert!(global.declare(x, Value::int(1), Mutability::Constant, Ownership::Owned));
        assert!(global.declare(x, Value::int(2), Mutability::Constant, Ownership::Owned));
        let local = global.child(ScopeKind::Function);
        assert!(local.declare(x, Value::int(1), Mutability::Constant, Ownership::Owned));
        assert!(!local.declare(x, Value::int(2), Mutability::Constant, Ownership::Owned));
    }

    #[test]
    fn test_assign_walks_up_and_respects_constants() {
        let interner = StringInterner::new();
        let (x, y, z) = (interner.intern("x"), interner.intern("y"), interner.intern("z"));
        let global = ScopeRef::global();
        global.declare(x, Value::int(1), Mutability::Variable, Ownership::Owned);
        global.declare(y, Value::int(1), Mutability::Constant, Ownership::Owned);
        let inner = global.child(ScopeKind::Block);
        assert!(inner.assign(x, Value::int(5)).is_ok());
        assert_eq!(value_of(&global, x), Some(Value::int(5)));
        assert_eq!(inner.assign(y, Value::int(5)).unwrap_err(), AssignError::Constant);
        assert_eq!(inner.assign(z, Value::int(5)).unwrap_err(), AssignError::Undefined);
    }

    #[test]
    fn test_take_leaves_slot_moved() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let scope = ScopeRef::global().child(ScopeKind::Function);
        scope.declare(x, Value::int(1), Mutability::Constant, Ownership::Owned);
        assert!(matches!(scope.take(x), Some(Slot::Value(_))));
        assert!(matches!(scope.slot(x), Some(Slot::Moved)));
    }

    #[test]
    fn test_begin_initialization_marks_slot() {
        let interner = StringInterner::new();
        let c = interner.intern("C");
        let global = ScopeRef::global();
        let type_id = TypeId::new(&Location::script("test"), "C");
        global.declare_lazy(c, LazyInit::Contract { type_id }, Mutability::Constant);
        assert!(global.begin_initialization(c).is_some());
        assert!(matches!(global.slot(c), Some(Slot::Initializing)));
        assert!(global.begin_initialization(c).is_none());
    }
}
