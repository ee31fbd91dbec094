//! Statement execution.

use std::rc::Rc;

use cinder_ir::ast::{
    Block, Expr, ExprKind, IfTest, Stmt, StmtKind, SwitchCase, Transfer, UnaryOp, VariableDecl,
};
use cinder_ir::Name;

use super::declarations::{box_to, expect_bool};
use super::Interpreter;
use crate::config::ComputationKind;
use crate::environment::{Mutability, Ownership, ScopeKind, ScopeRef};
use crate::errors::{redeclaration, resource_loss, type_mismatch, EvalResult};
use crate::value::{FunctionValue, InterpretedFunction, IntegerValue, StringValue, Value};

/// How a statement completed.
#[derive(Debug)]
pub(crate) enum StmtOutcome {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl Interpreter {
    /// Execute statements in the current scope, stopping at the first
    /// non-normal outcome.
    pub(crate) fn execute_statements(&mut self, statements: &[Stmt]) -> EvalResult<StmtOutcome> {
        for statement in statements {
            match self.execute(statement)? {
                StmtOutcome::Normal => {}
                outcome => return Ok(outcome),
            }
        }
        Ok(StmtOutcome::Normal)
    }

    /// Execute a block in a fresh child scope.
    pub(crate) fn execute_block(&mut self, block: &Block) -> EvalResult<StmtOutcome> {
        let scope = self.env.child(ScopeKind::Block);
        self.execute_in(&scope, block)
    }

    /// Execute a block in `scope`, then leave it.
    fn execute_in(&mut self, scope: &ScopeRef, block: &Block) -> EvalResult<StmtOutcome> {
        let outcome = self.with_env(scope.clone(), |interpreter| {
            interpreter.execute_statements(&block.statements)
        })?;
        self.exit_scope(scope)
            .map_err(|err| err.or_location(|| self.range(block.span)))?;
        Ok(outcome)
    }

    pub(crate) fn execute(&mut self, statement: &Stmt) -> EvalResult<StmtOutcome> {
        self.meter(ComputationKind::Statement)
            .map_err(|err| err.or_location(|| self.range(statement.span)))?;
        self.execute_inner(statement)
            .map_err(|err| err.or_location(|| self.range(statement.span)))
    }

    fn execute_inner(&mut self, statement: &Stmt) -> EvalResult<StmtOutcome> {
        match &statement.kind {
            StmtKind::Expression(expr) => {
                let value = self.eval_expr(expr)?;
                if value.is_resource() {
                    return Err(resource_loss(value.type_name()));
                }
                Ok(StmtOutcome::Normal)
            }
            StmtKind::Variable(decl) => {
                self.declare_local(decl)?;
                Ok(StmtOutcome::Normal)
            }
            StmtKind::Assignment {
                target,
                transfer,
                value,
            } => {
                self.assign(target, *transfer, value)?;
                Ok(StmtOutcome::Normal)
            }
            StmtKind::Swap { left, right } => {
                self.swap(left, right)?;
                Ok(StmtOutcome::Normal)
            }
            StmtKind::If {
                test,
                then_block,
                else_block,
            } => self.execute_if(test, then_block, else_block.as_ref()),
            StmtKind::While { test, block } => self.execute_while(test, block),
            StmtKind::For {
                index,
                element,
                iterable,
                block,
            } => self.execute_for(*index, *element, iterable, block),
            StmtKind::Switch { subject, cases } => self.execute_switch(subject, cases),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => {
                        let value = self.eval_move(expr)?;
                        self.transfer(value, None)?
                    }
                    None => Value::Void,
                };
                Ok(StmtOutcome::Return(value))
            }
            StmtKind::Break => Ok(StmtOutcome::Break),
            StmtKind::Continue => Ok(StmtOutcome::Continue),
            StmtKind::Emit(invocation) => {
                self.emit(invocation)?;
                Ok(StmtOutcome::Normal)
            }
            StmtKind::Destroy(expr) => {
                let value = self.eval_move(expr)?;
                self.destroy_value(&value)?;
                Ok(StmtOutcome::Normal)
            }
            StmtKind::Function(decl) => {
                let function = FunctionValue::Interpreted(Rc::new(InterpretedFunction {
                    decl: Rc::clone(decl),
                    scope: self.env.clone(),
                    location: self.location.clone(),
                }));
                if !self.env.declare(
                    decl.name,
                    Value::Function(function),
                    Mutability::Constant,
                    Ownership::Owned,
                ) {
                    return Err(redeclaration(self.name_str(decl.name)));
                }
                Ok(StmtOutcome::Normal)
            }
            StmtKind::Block(block) => self.execute_block(block),
        }
    }

    /// `let`/`var` in a local scope.
    fn declare_local(&mut self, decl: &VariableDecl) -> EvalResult<()> {
        let value = self.eval_binding(&decl.value, decl.transfer)?;
        let value = match &decl.ty {
            Some(ty) => box_to(value, ty),
            None => value,
        };
        let mutability = if decl.is_constant {
            Mutability::Constant
        } else {
            Mutability::Variable
        };
        if !self
            .env
            .declare(decl.name, value, mutability, Ownership::Owned)
        {
            return Err(redeclaration(self.name_str(decl.name)));
        }
        Ok(())
    }

    fn execute_if(
        &mut self,
        test: &IfTest,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> EvalResult<StmtOutcome> {
        match test {
            IfTest::Expr(expr) => {
                let test = self.eval_expr(expr)?;
                if expect_bool(&test)? {
                    self.execute_block(then_block)
                } else if let Some(else_block) = else_block {
                    self.execute_block(else_block)
                } else {
                    Ok(StmtOutcome::Normal)
                }
            }
            IfTest::Let {
                name,
                transfer,
                value,
            } => {
                let value = self.eval_binding(value, *transfer)?;
                match value {
                    Value::Some(inner) => {
                        let scope = self.env.child(ScopeKind::Block);
                        scope.declare(*name, *inner, Mutability::Constant, Ownership::Owned);
                        self.execute_in(&scope, then_block)
                    }
                    Value::Nil => match else_block {
                        Some(else_block) => self.execute_block(else_block),
                        None => Ok(StmtOutcome::Normal),
                    },
                    other => Err(type_mismatch("optional", other.type_name())),
                }
            }
        }
    }

    fn execute_while(&mut self, test: &Expr, block: &Block) -> EvalResult<StmtOutcome> {
        loop {
            let condition = self.eval_expr(test)?;
            if !expect_bool(&condition)? {
                return Ok(StmtOutcome::Normal);
            }
            self.meter(ComputationKind::Loop)?;
            match self.execute_block(block)? {
                StmtOutcome::Normal | StmtOutcome::Continue => {}
                StmtOutcome::Break => return Ok(StmtOutcome::Normal),
                outcome @ StmtOutcome::Return(_) => return Ok(outcome),
            }
        }
    }

    fn execute_for(
        &mut self,
        index: Option<Name>,
        element: Name,
        iterable: &Expr,
        block: &Block,
    ) -> EvalResult<StmtOutcome> {
        let mut iterable = self.eval_expr(iterable)?;
        if let Value::Reference(reference) = &iterable {
            iterable = self.deref(reference)?;
        }
        // Elements are snapshotted up front; the body may mutate the container.
        let items: Vec<(Value, Ownership)> = match &iterable {
            Value::Array(array) => {
                let resource = array.is_resource();
                let mut items = Vec::with_capacity(array.len());
                for value in array.elements() {
                    if resource {
                        items.push((value, Ownership::Borrowed));
                    } else {
                        items.push((self.transfer(value, None)?, Ownership::Owned));
                    }
                }
                items
            }
            Value::Dictionary(dictionary) => {
                let mut items = Vec::with_capacity(dictionary.len());
                for key in dictionary.keys() {
                    items.push((self.transfer(key, None)?, Ownership::Owned));
                }
                items
            }
            Value::String(string) => string
                .graphemes()
                .map(|g| (Value::Character(StringValue::new(g)), Ownership::Owned))
                .collect(),
            other => return Err(type_mismatch("iterable", other.type_name())),
        };

        for (position, (value, ownership)) in items.into_iter().enumerate() {
            self.meter(ComputationKind::Loop)?;
            let scope = self.env.child(ScopeKind::Block);
            if let Some(index) = index {
                scope.declare(
                    index,
                    Value::Integer(IntegerValue::from_usize(position)),
                    Mutability::Constant,
                    Ownership::Owned,
                );
            }
            scope.declare(element, value, Mutability::Constant, ownership);
            match self.execute_in(&scope, block)? {
                StmtOutcome::Normal | StmtOutcome::Continue => {}
                StmtOutcome::Break => break,
                outcome @ StmtOutcome::Return(_) => return Ok(outcome),
            }
        }
        Ok(StmtOutcome::Normal)
    }

    fn execute_switch(&mut self, subject: &Expr, cases: &[SwitchCase]) -> EvalResult<StmtOutcome> {
        let subject = self.eval_expr(subject)?;
        let mut default = None;
        for case in cases {
            match &case.value {
                Some(value) => {
                    if self.eval_expr(value)? == subject {
                        return self.switch_arm(&case.block);
                    }
                }
                None => default = Some(&case.block),
            }
        }
        match default {
            Some(block) => self.switch_arm(block),
            None => Ok(StmtOutcome::Normal),
        }
    }

    fn switch_arm(&mut self, block: &Block) -> EvalResult<StmtOutcome> {
        match self.execute_block(block)? {
            // `break` leaves the switch, not an enclosing loop.
            StmtOutcome::Break => Ok(StmtOutcome::Normal),
            outcome => Ok(outcome),
        }
    }

    /// `let`/`var`/`if let` binding: move or copy the initializer.
    pub(crate) fn eval_binding(&mut self, expr: &Expr, transfer: Transfer) -> EvalResult {
        let value = if transfer == Transfer::Copy && !is_move(expr) {
            self.eval_expr(expr)?
        } else {
            self.eval_move(expr)?
        };
        let kind = if is_move(expr) { Transfer::Move } else { transfer };
        self.transfer_checked(value, kind, None)
    }
}

fn is_move(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::Move,
            ..
        }
    )
}
