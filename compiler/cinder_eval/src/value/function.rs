//! Function values.

use std::fmt;
use std::rc::Rc;

use cinder_ir::ast::FunctionDecl;
use cinder_ir::{CompositeKind, Location, LocationRange, Name, NominalType, StaticType, TypeId};

use super::{ReferenceValue, Value};
use crate::environment::ScopeRef;
use crate::errors::EvalResult;
use crate::interpreter::{Interpreter, MethodPlan};

/// Arguments passed to a host function.
#[derive(Clone, Debug)]
pub struct HostInvocation {
    pub arguments: Vec<Value>,
    /// Where the call was made.
    pub location: LocationRange,
}

/// Signature of host-native functions.
pub type HostFn = dyn Fn(&mut Interpreter, HostInvocation) -> EvalResult;

pub struct HostFunction {
    pub name: String,
    pub ty: StaticType,
    pub function: Box<HostFn>,
}

impl HostFunction {
    pub fn new(
        name: impl Into<String>,
        ty: StaticType,
        function: impl Fn(&mut Interpreter, HostInvocation) -> EvalResult + 'static,
    ) -> Self {
        HostFunction {
            name: name.into(),
            ty,
            function: Box::new(function),
        }
    }
}

/// A declared function or closure, with the scope it was declared in.
pub struct InterpretedFunction {
    pub decl: Rc<FunctionDecl>,
    pub scope: ScopeRef,
    pub location: Location,
}

/// A composite method bound to its receiver.
///
/// The receiver is held through an ephemeral reference, so invoking a bound
/// method after the receiver moved fails instead of acting on a stale value.
pub struct BoundFunction {
    pub plan: Rc<MethodPlan>,
    pub receiver: ReferenceValue,
}

/// The callable a composite type name evaluates to.
pub struct ConstructorFunction {
    pub type_id: TypeId,
    pub kind: CompositeKind,
}

/// A builtin member function (`append`, `slice`, `getType`, ...).
pub struct BuiltinMethod {
    pub receiver: Value,
    pub method: Name,
}

#[derive(Clone)]
pub enum FunctionValue {
    Interpreted(Rc<InterpretedFunction>),
    Host(Rc<HostFunction>),
    Bound(Rc<BoundFunction>),
    Constructor(Rc<ConstructorFunction>),
    Builtin(Rc<BuiltinMethod>),
}

fn signature(decl: &FunctionDecl) -> StaticType {
    StaticType::function(
        decl.parameters.iter().map(|p| p.ty.clone()).collect(),
        decl.return_type.clone(),
    )
}

impl FunctionValue {
    pub fn host(
        name: impl Into<String>,
        ty: StaticType,
        function: impl Fn(&mut Interpreter, HostInvocation) -> EvalResult + 'static,
    ) -> Self {
        FunctionValue::Host(Rc::new(HostFunction::new(name, ty, function)))
    }

    pub fn static_type(&self) -> StaticType {
        match self {
            FunctionValue::Interpreted(f) => signature(&f.decl),
            FunctionValue::Host(f) => f.ty.clone(),
            FunctionValue::Bound(f) => signature(f.plan.signature()),
            FunctionValue::Constructor(f) => StaticType::function(
                Vec::new(),
                StaticType::Composite(NominalType::new(f.type_id.clone(), f.kind)),
            ),
            FunctionValue::Builtin(_) => StaticType::function(Vec::new(), StaticType::Void),
        }
    }

    /// Identity comparison: two function values are equal only if they are
    /// the same closure.
    pub fn ptr_eq(&self, other: &FunctionValue) -> bool {
        match (self, other) {
            (FunctionValue::Interpreted(a), FunctionValue::Interpreted(b)) => Rc::ptr_eq(a, b),
            (FunctionValue::Host(a), FunctionValue::Host(b)) => Rc::ptr_eq(a, b),
            (FunctionValue::Bound(a), FunctionValue::Bound(b)) => Rc::ptr_eq(a, b),
            (FunctionValue::Constructor(a), FunctionValue::Constructor(b)) => {
                a.type_id == b.type_id
            }
            (FunctionValue::Builtin(a), FunctionValue::Builtin(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Interpreted(func) => write!(f, "Function({:?})", func.decl.name),
            FunctionValue::Host(func) => write!(f, "HostFunction({})", func.name),
            FunctionValue::Bound(func) => write!(f, "BoundFunction({:?})", func.plan.name),
            FunctionValue::Constructor(func) => write!(f, "Constructor({})", func.type_id),
            FunctionValue::Builtin(func) => write!(f, "BuiltinMethod({:?})", func.method),
        }
    }
}
