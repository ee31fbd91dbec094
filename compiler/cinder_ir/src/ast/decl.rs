//! Declarations.

use std::rc::Rc;

use num_bigint::BigInt;

use super::{Block, Expr, Transfer};
use crate::{CompositeKind, IntegerKind, Location, Name, Span, StaticType, TypeId};

/// A function parameter. The argument label only matters to the checker.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub label: Option<Name>,
    pub name: Name,
    pub ty: StaticType,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ConditionKind {
    Pre,
    Post,
}

impl ConditionKind {
    pub fn name(self) -> &'static str {
        match self {
            ConditionKind::Pre => "pre-condition",
            ConditionKind::Post => "post-condition",
        }
    }
}

/// A boolean assertion checked on entry to or exit from a function.
#[derive(Clone, Debug)]
pub struct Condition {
    pub kind: ConditionKind,
    pub test: Expr,
    pub message: Option<Expr>,
    pub span: Span,
}

/// A function, method, initializer or destructor.
///
/// `body` is `None` for interface requirements that carry only conditions.
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Name,
    pub parameters: Vec<Parameter>,
    pub return_type: StaticType,
    pub pre_conditions: Vec<Condition>,
    pub post_conditions: Vec<Condition>,
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn has_conditions(&self) -> bool {
        !self.pre_conditions.is_empty() || !self.post_conditions.is_empty()
    }

    /// `before(...)` operands referenced by the post-conditions.
    pub fn before_expressions(&self) -> Vec<&Expr> {
        self.post_conditions
            .iter()
            .flat_map(|condition| {
                let mut found = condition.test.before_expressions();
                if let Some(message) = &condition.message {
                    found.extend(message.before_expressions());
                }
                found
            })
            .collect()
    }
}

/// A composite field.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: StaticType,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct EnumCase {
    pub name: Name,
    pub raw_value: BigInt,
}

/// Event emitted automatically when a resource is destroyed.
///
/// Arguments are evaluated with `self` bound to the resource being destroyed.
#[derive(Clone, Debug)]
pub struct DestroyEventDecl {
    pub event: TypeId,
    pub arguments: Vec<(Name, Expr)>,
}

/// A struct, resource, contract, event or enum declaration.
#[derive(Clone, Debug)]
pub struct CompositeDecl {
    pub name: Name,
    pub kind: CompositeKind,
    /// Interfaces, already resolved and flattened by the checker, in
    /// declaration order.
    pub conformances: Vec<TypeId>,
    pub fields: Vec<FieldDecl>,
    pub initializer: Option<Rc<FunctionDecl>>,
    pub destructor: Option<Rc<FunctionDecl>>,
    pub functions: Vec<Rc<FunctionDecl>>,
    pub enum_raw_type: Option<IntegerKind>,
    pub enum_cases: Vec<EnumCase>,
    pub destroy_event: Option<DestroyEventDecl>,
    pub span: Span,
}

/// A struct, resource or contract interface.
///
/// Functions with a body are default implementations. The initializer and
/// destructor contribute conditions, and a destructor with a body is a
/// default destructor that runs before the concrete one.
#[derive(Clone, Debug)]
pub struct InterfaceDecl {
    pub name: Name,
    pub kind: CompositeKind,
    pub conformances: Vec<TypeId>,
    pub fields: Vec<FieldDecl>,
    pub initializer: Option<Rc<FunctionDecl>>,
    pub destructor: Option<Rc<FunctionDecl>>,
    pub functions: Vec<Rc<FunctionDecl>>,
    pub span: Span,
}

/// `let`/`var` declaration, global or local.
///
/// `ty` is the annotated type when one was written; an optional annotation
/// boxes a non-optional value on binding.
#[derive(Clone, Debug)]
pub struct VariableDecl {
    pub name: Name,
    pub ty: Option<StaticType>,
    pub is_constant: bool,
    pub transfer: Transfer,
    pub value: Expr,
    pub span: Span,
}

/// `import a, b from <location>`. An empty list imports every global.
#[derive(Clone, Debug)]
pub struct ImportDecl {
    pub location: Location,
    pub identifiers: Vec<Name>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Declaration {
    Function(Rc<FunctionDecl>),
    Composite(Rc<CompositeDecl>),
    Interface(Rc<InterfaceDecl>),
    Variable(Rc<VariableDecl>),
    Import(ImportDecl),
}

/// A checked program ready for evaluation.
#[derive(Clone, Debug)]
pub struct Program {
    pub location: Location,
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new(location: Location, declarations: Vec<Declaration>) -> Self {
        Program {
            location,
            declarations,
        }
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.declarations.iter().filter_map(|decl| match decl {
            Declaration::Import(import) => Some(import),
            _ => None,
        })
    }
}
