//! Statement nodes.

use std::rc::Rc;

use super::{Expr, FunctionDecl, Transfer, VariableDecl};
use crate::{Name, Span};

/// A braced sequence of statements. Introduces a scope.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Stmt>, span: Span) -> Self {
        Block { statements, span }
    }
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Expression(Expr),
    Variable(VariableDecl),
    Assignment {
        target: Expr,
        transfer: Transfer,
        value: Expr,
    },
    Swap {
        left: Expr,
        right: Expr,
    },
    If {
        test: IfTest,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        test: Expr,
        block: Block,
    },
    /// `for [index,] element in iterable { ... }`
    For {
        index: Option<Name>,
        element: Name,
        iterable: Expr,
        block: Block,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    /// `emit E(...)`; the operand is the event constructor invocation.
    Emit(Expr),
    Destroy(Expr),
    Function(Rc<FunctionDecl>),
    Block(Block),
}

/// The test of an `if` statement.
#[derive(Clone, Debug)]
pub enum IfTest {
    Expr(Expr),
    /// `if let name = value` / `if let name <- value`
    Let {
        name: Name,
        transfer: Transfer,
        value: Expr,
    },
}

/// One arm of a `switch`. `value` is `None` for `default`.
#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub value: Option<Expr>,
    pub block: Block,
}
