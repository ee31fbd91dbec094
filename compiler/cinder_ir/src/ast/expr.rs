//! Expression nodes.

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use super::{BinaryOp, CastKind, FunctionDecl, UnaryOp};
use crate::{Address, FixedPointKind, IntegerKind, Name, PathDomain, Span, StaticType};

/// Identity of an expression node within one program.
///
/// Used to key `before(...)` snapshots taken when a function is entered.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

/// An expression with its identity and source span.
#[derive(Clone, Debug)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Bool(bool),
    Nil,
    Integer {
        value: BigInt,
        kind: IntegerKind,
    },
    /// Fixed-point literal, already scaled by 10^8.
    FixedPoint {
        scaled: i128,
        kind: FixedPointKind,
    },
    String(String),
    Character(String),
    Address(Address),
    Path {
        domain: PathDomain,
        identifier: Name,
    },
    /// Array literal; `ty` is the array type.
    Array {
        elements: Vec<Expr>,
        ty: StaticType,
    },
    /// Dictionary literal; `ty` is the dictionary type.
    Dictionary {
        entries: Vec<(Expr, Expr)>,
        ty: StaticType,
    },
    Identifier(Name),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `target.name` or, with `optional`, `target?.name`.
    Member {
        target: Box<Expr>,
        name: Name,
        optional: bool,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Invocation {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    /// `create T(...)`; the operand is the constructor invocation.
    Create(Box<Expr>),
    Cast {
        expr: Box<Expr>,
        ty: StaticType,
        kind: CastKind,
    },
    /// `&expr as &T`; `ty` is the reference type, possibly optional.
    Reference {
        expr: Box<Expr>,
        ty: StaticType,
    },
    ForceUnwrap(Box<Expr>),
    Function(Rc<FunctionDecl>),
    /// `before(expr)`, only valid inside post-conditions.
    Before(Box<Expr>),
    /// `Type<T>()`
    TypeValue(StaticType),
}

impl Expr {
    /// Visit this expression and every sub-expression, pre-order.
    ///
    /// Does not descend into nested function expressions.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Bool(_)
            | ExprKind::Nil
            | ExprKind::Integer { .. }
            | ExprKind::FixedPoint { .. }
            | ExprKind::String(_)
            | ExprKind::Character(_)
            | ExprKind::Address(_)
            | ExprKind::Path { .. }
            | ExprKind::Identifier(_)
            | ExprKind::Function(_)
            | ExprKind::TypeValue(_) => {}
            ExprKind::Array { elements, .. } => {
                for element in elements {
                    element.walk(visit);
                }
            }
            ExprKind::Dictionary { entries, .. } => {
                for (key, value) in entries {
                    key.walk(visit);
                    value.walk(visit);
                }
            }
            ExprKind::Unary { operand, .. } => operand.walk(visit),
            ExprKind::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            ExprKind::Conditional {
                test,
                then_expr,
                else_expr,
            } => {
                test.walk(visit);
                then_expr.walk(visit);
                else_expr.walk(visit);
            }
            ExprKind::Member { target, .. } => target.walk(visit),
            ExprKind::Index { target, index } => {
                target.walk(visit);
                index.walk(visit);
            }
            ExprKind::Invocation { callee, arguments } => {
                callee.walk(visit);
                for argument in arguments {
                    argument.walk(visit);
                }
            }
            ExprKind::Create(inner)
            | ExprKind::ForceUnwrap(inner)
            | ExprKind::Before(inner)
            | ExprKind::Cast { expr: inner, .. }
            | ExprKind::Reference { expr: inner, .. } => inner.walk(visit),
        }
    }

    /// Collect the `before(...)` sub-expressions, in source order.
    pub fn before_expressions(&self) -> Vec<&Expr> {
        let mut found = Vec::new();
        self.walk(&mut |expr| {
            if let ExprKind::Before(inner) = &expr.kind {
                found.push(&**inner);
            }
        });
        found
    }
}
