//! Expression evaluation.
//!
//! `eval_expr` reads: an identifier yields the variable's value handle
//! without moving it. `eval_move` is used where the expression is the source
//! of a move (`<-`, `destroy`, `return`, move bindings) and empties the
//! place a resource came from.

use std::rc::Rc;

use cinder_ir::ast::{BinaryOp, CastKind, Expr, ExprKind, Transfer, UnaryOp};
use cinder_ir::{Address, Name, Span, StaticType};
use indexmap::IndexMap;

use super::declarations::{box_to, expect_bool};
use super::Interpreter;
use crate::environment::Slot;
use crate::errors::{
    duplicate_key_in_resource_dictionary, force_cast_type_mismatch, force_nil, internal_error,
    invalidated_resource, non_transferable_value, not_invokable, resource_copy, type_mismatch,
    undefined_variable, use_before_initialization, EvalResult,
};
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::stack::ensure_sufficient_stack;
use crate::value::{
    ArrayData, ArrayValue, DictionaryData, DictionaryValue, FixedPointValue, FunctionValue,
    HashableKey, Header, IntegerValue, InterpretedFunction, PathValue, ReferenceValue, StringValue,
    Value,
};

impl Interpreter {
    /// Evaluate an expression.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr))
            .map_err(|err| err.or_location(|| self.range(expr.span)))
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::Integer { value, kind } => {
                IntegerValue::new(*kind, value.clone()).map(Value::Integer)
            }
            ExprKind::FixedPoint { scaled, kind } => {
                FixedPointValue::new(*kind, *scaled).map(Value::FixedPoint)
            }
            ExprKind::String(s) => Ok(Value::string(s)),
            ExprKind::Character(c) => Ok(Value::Character(StringValue::new(c))),
            ExprKind::Address(address) => Ok(Value::Address(*address)),
            ExprKind::Path { domain, identifier } => Ok(Value::Path(PathValue {
                domain: *domain,
                identifier: *identifier,
            })),
            ExprKind::Array { elements, ty } => self.eval_array_literal(elements, ty),
            ExprKind::Dictionary { entries, ty } => self.eval_dictionary_literal(entries, ty),
            ExprKind::Identifier(name) => self.read_variable(*name),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ExprKind::Conditional {
                test,
                then_expr,
                else_expr,
            } => {
                let test = self.eval_expr(test)?;
                if expect_bool(&test)? {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
            ExprKind::Member {
                target,
                name,
                optional,
            } => self.eval_member(target, *name, *optional),
            ExprKind::Index { target, index } => self.eval_index(target, index),
            ExprKind::Invocation { callee, arguments } => {
                self.eval_invocation(callee, arguments, expr.span)
            }
            ExprKind::Create(invocation) => self.eval_expr(invocation),
            ExprKind::Cast { expr, ty, kind } => {
                let value = self.eval_expr(expr)?;
                self.cast_value(value, ty, *kind)
            }
            ExprKind::Reference { expr, ty } => {
                let value = self.eval_expr(expr)?;
                self.create_reference(value, ty)
            }
            ExprKind::ForceUnwrap(inner) => {
                let value = self.eval_expr(inner)?;
                force_unwrap(value)
            }
            ExprKind::Function(decl) => Ok(Value::Function(FunctionValue::Interpreted(Rc::new(
                InterpretedFunction {
                    decl: Rc::clone(decl),
                    scope: self.env.clone(),
                    location: self.location.clone(),
                },
            )))),
            ExprKind::Before(inner) => self
                .before
                .as_ref()
                .and_then(|snapshots| snapshots.get(&inner.id))
                .cloned()
                .ok_or_else(|| internal_error("`before` evaluated outside a post-condition")),
            ExprKind::TypeValue(ty) => Ok(Value::Type(ty.clone())),
        }
    }

    /// Evaluate `expr` as the source of a move.
    pub(crate) fn eval_move(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_move_inner(expr))
            .map_err(|err| err.or_location(|| self.range(expr.span)))
    }

    fn eval_move_inner(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Identifier(name) => self.move_variable(*name),
            ExprKind::Member {
                target,
                name,
                optional,
            } => {
                let target = self.eval_expr(target)?;
                if !optional {
                    return self.move_member(target, *name);
                }
                match target {
                    Value::Nil => Ok(Value::Nil),
                    Value::Some(inner) => Ok(match self.move_member(*inner, *name)? {
                        member @ (Value::Some(_) | Value::Nil) => member,
                        member => Value::some(member),
                    }),
                    other => self.move_member(other, *name),
                }
            }
            ExprKind::Index { target, index } => {
                let target = self.eval_expr(target)?;
                let index = self.eval_expr(index)?;
                let target = match target {
                    Value::Reference(reference) => self.deref(&reference)?,
                    other => other,
                };
                match &target {
                    Value::Dictionary(dictionary) if dictionary.is_resource() => {
                        let key = hash_key(&index)?;
                        Ok(Value::optional(dictionary.remove(&key)))
                    }
                    Value::Array(array) if array.is_resource() => {
                        Err(non_transferable_value(array.element_type().to_string())
                            .with_note("remove the element from the array to move it"))
                    }
                    _ => self.index_value(target, &index),
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Move,
                operand,
            } => self.eval_move(operand),
            ExprKind::ForceUnwrap(inner) => {
                let value = self.eval_move(inner)?;
                force_unwrap(value)
            }
            ExprKind::Cast { expr, ty, kind } => {
                let value = self.eval_move(expr)?;
                self.cast_value(value, ty, *kind)
            }
            _ => self.eval_expr(expr),
        }
    }

    /// Member `name` of `target` for a move: a resource field is taken out
    /// of its composite.
    fn move_member(&mut self, target: Value, name: Name) -> EvalResult {
        let target = match target {
            Value::Reference(reference) => self.deref(&reference)?,
            Value::Some(inner) => *inner,
            other => other,
        };
        match &target {
            Value::Composite(composite) => match composite.field(name) {
                Some(value) if value.is_resource() => {
                    composite.remove_field(name);
                    Ok(value)
                }
                Some(value) => Ok(value),
                None => self.member_of(target.clone(), name),
            },
            _ => self.member_of(target, name),
        }
    }

    /// Read a variable for a move: a resource leaves the slot invalid.
    fn move_variable(&mut self, name: Name) -> EvalResult {
        let scope = self
            .env
            .find(name)
            .ok_or_else(|| undefined_variable(self.name_str(name)))?;
        let value = match scope.slot(name) {
            Some(Slot::Value(value)) => value,
            Some(Slot::Lazy(_)) => self.force_lazy(&scope, name)?,
            Some(Slot::Moved) => return Err(invalidated_resource(self.name_str(name))),
            Some(Slot::Initializing) => {
                return Err(use_before_initialization(self.name_str(name)))
            }
            None => return Err(undefined_variable(self.name_str(name))),
        };
        if value.is_resource() {
            scope.replace_slot(name, Slot::Moved);
        }
        Ok(value)
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult {
        match op {
            UnaryOp::Move => self.eval_move(operand),
            UnaryOp::Deref => {
                let value = self.eval_expr(operand)?;
                let Value::Reference(reference) = value else {
                    return Err(type_mismatch("reference", value.type_name()));
                };
                let target = self.deref(&reference)?;
                if target.is_resource() {
                    return Err(resource_copy(target.type_name()));
                }
                self.transfer(target, None)
            }
            UnaryOp::Negate | UnaryOp::Not => {
                let value = self.eval_expr(operand)?;
                evaluate_unary(&value, op)
            }
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> EvalResult {
        match op {
            BinaryOp::And => {
                let left = self.eval_expr(left)?;
                if !expect_bool(&left)? {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_expr(right)?;
                Ok(Value::Bool(expect_bool(&right)?))
            }
            BinaryOp::Or => {
                let left = self.eval_expr(left)?;
                if expect_bool(&left)? {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_expr(right)?;
                Ok(Value::Bool(expect_bool(&right)?))
            }
            BinaryOp::NilCoalesce => match self.eval_expr(left)? {
                Value::Nil => self.eval_expr(right),
                Value::Some(inner) => Ok(*inner),
                other => Ok(other),
            },
            _ => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                evaluate_binary(&left, &right, op)
            }
        }
    }

    fn eval_array_literal(&mut self, elements: &[Expr], ty: &StaticType) -> EvalResult {
        let element_type = ty.element_type().cloned().unwrap_or(StaticType::AnyStruct);
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.eval_argument(element)?;
            values.push(box_to(value, &element_type));
        }
        Ok(self.new_array(ty.clone(), values, None))
    }

    fn eval_dictionary_literal(&mut self, entries: &[(Expr, Expr)], ty: &StaticType) -> EvalResult {
        let value_type = match ty {
            StaticType::Dictionary(_, value) => (**value).clone(),
            _ => StaticType::AnyStruct,
        };
        let resource = ty.is_resource();
        let mut map = IndexMap::with_capacity(entries.len());
        for (key_expr, value_expr) in entries {
            let key = self.eval_expr(key_expr)?;
            let hashed = hash_key(&key)?;
            let value = self.eval_argument(value_expr)?;
            let value = box_to(value, &value_type);
            if resource && map.contains_key(&hashed) {
                return Err(duplicate_key_in_resource_dictionary()
                    .with_location(self.range(key_expr.span)));
            }
            if let Some((_, old)) = map.insert(hashed, (key, value)) {
                self.discard(&old);
            }
        }
        Ok(Value::Dictionary(DictionaryValue::new(DictionaryData {
            header: Header::new(self.allocate_id(None), None),
            ty: ty.clone(),
            entries: map,
        })))
    }

    /// A fresh array container.
    pub(crate) fn new_array(
        &mut self,
        ty: StaticType,
        elements: Vec<Value>,
        owner: Option<Address>,
    ) -> Value {
        Value::Array(ArrayValue::new(ArrayData {
            header: Header::new(self.allocate_id(owner), owner),
            ty,
            elements,
        }))
    }

    /// An argument or container element: `<-expr` moves, anything else copies.
    pub(crate) fn eval_argument(&mut self, expr: &Expr) -> EvalResult {
        if matches!(
            expr.kind,
            ExprKind::Unary {
                op: UnaryOp::Move,
                ..
            }
        ) {
            let value = self.eval_move(expr)?;
            self.transfer_checked(value, Transfer::Move, None)
        } else {
            let value = self.eval_expr(expr)?;
            self.transfer_checked(value, Transfer::Copy, None)
        }
    }

    fn eval_invocation(&mut self, callee: &Expr, arguments: &[Expr], span: Span) -> EvalResult {
        if let ExprKind::Member {
            target,
            name,
            optional: true,
        } = &callee.kind
        {
            let receiver = match self.eval_expr(target)? {
                // Arguments are not evaluated when the chain short-circuits.
                Value::Nil => return Ok(Value::Nil),
                Value::Some(inner) => *inner,
                other => other,
            };
            let method = self
                .member_of(receiver, *name)
                .map_err(|err| err.or_location(|| self.range(callee.span)))?;
            return Ok(match self.invoke_value(method, arguments, span)? {
                result @ (Value::Some(_) | Value::Nil) => result,
                result => Value::some(result),
            });
        }
        let callee = self.eval_expr(callee)?;
        self.invoke_value(callee, arguments, span)
    }

    fn invoke_value(&mut self, callee: Value, arguments: &[Expr], span: Span) -> EvalResult {
        let Value::Function(function) = callee else {
            return Err(not_invokable(callee.type_name()));
        };
        let arguments = arguments
            .iter()
            .map(|argument| self.eval_argument(argument))
            .collect::<EvalResult<Vec<_>>>()?;
        let site = self.range(span);
        self.call_function(&function, arguments, &site)
    }

    /// `as`, `as?` and `as!`.
    pub(crate) fn cast_value(
        &mut self,
        value: Value,
        ty: &StaticType,
        kind: CastKind,
    ) -> EvalResult {
        if kind == CastKind::Static {
            return Ok(box_to(value, ty));
        }
        let cast = match (&value, ty.unwrap_optional()) {
            (
                Value::Reference(reference),
                StaticType::Reference {
                    authorized,
                    referenced,
                },
            ) => self.downcast_reference(reference, *authorized, referenced)?,
            _ => {
                let actual = value.static_type();
                self.is_subtype(&actual, ty).then(|| value.clone())
            }
        };
        match (cast, kind) {
            (Some(result), CastKind::Failable) => Ok(Value::some(result)),
            (None, CastKind::Failable) => Ok(Value::Nil),
            (Some(result), _) => Ok(result),
            (None, _) => Err(force_cast_type_mismatch(ty.to_string(), value.type_name())),
        }
    }

    /// A reference re-typed to `&referenced`, if its target conforms and no
    /// authorization would be gained.
    fn downcast_reference(
        &mut self,
        reference: &ReferenceValue,
        authorized: bool,
        referenced: &StaticType,
    ) -> EvalResult<Option<Value>> {
        if authorized && !reference.authorized {
            return Ok(None);
        }
        let target = self.deref(reference)?;
        if !self.is_subtype(&target.static_type(), referenced) {
            return Ok(None);
        }
        Ok(Some(Value::Reference(ReferenceValue {
            authorized,
            borrowed_type: referenced.clone(),
            target: reference.target.clone(),
        })))
    }
}

fn force_unwrap(value: Value) -> EvalResult {
    match value {
        Value::Nil => Err(force_nil()),
        Value::Some(inner) => Ok(*inner),
        other => Ok(other),
    }
}

pub(crate) fn hash_key(value: &Value) -> EvalResult<HashableKey> {
    HashableKey::from_value(value).ok_or_else(|| type_mismatch("hashable value", value.type_name()))
}
