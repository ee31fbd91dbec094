//! Operator enums.

use std::fmt;

/// Binary operators.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Short-circuiting `&&`.
    And,
    /// Short-circuiting `||`.
    Or,
    /// Short-circuiting `??`.
    NilCoalesce,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NilCoalesce => "??",
        }
    }

    /// Operators whose right operand is evaluated only on demand.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::NilCoalesce)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Unary operators.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
    /// `<-expr`: explicit resource move.
    Move,
    /// `*ref`: copy out of a reference.
    Deref,
}

impl UnaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::Move => "<-",
            UnaryOp::Deref => "*",
        }
    }
}

/// Cast flavours.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CastKind {
    /// `as`: statically guaranteed.
    Static,
    /// `as?`: yields `nil` on mismatch.
    Failable,
    /// `as!`: fails the invocation on mismatch.
    Force,
}

/// How a value is bound into its destination.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Transfer {
    /// `=`
    Copy,
    /// `<-`
    Move,
    /// `<-!`: the destination must be `nil`.
    ForceMove,
}
