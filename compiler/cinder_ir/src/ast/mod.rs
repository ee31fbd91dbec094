//! Typed abstract syntax tree.
//!
//! The tree is produced by the parser and checker; by the time it reaches the
//! evaluator every expression that needs a static type (literals of
//! containers, casts, references) carries it explicitly.

mod decl;
mod expr;
mod ops;
mod stmt;

pub use decl::{
    CompositeDecl, Condition, ConditionKind, Declaration, DestroyEventDecl, EnumCase, FieldDecl,
    FunctionDecl, ImportDecl, InterfaceDecl, Parameter, Program, VariableDecl,
};
pub use expr::{Expr, ExprId, ExprKind};
pub use ops::{BinaryOp, CastKind, Transfer, UnaryOp};
pub use stmt::{Block, IfTest, Stmt, StmtKind, SwitchCase};
