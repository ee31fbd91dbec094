//! Binary and unary operator implementations for the evaluator.
//!
//! Provides direct enum-based dispatch. The type set is closed, so pattern
//! matching is preferred over trait objects for exhaustiveness checking.
//!
//! Short-circuiting operators (`&&`, `||`, `??`) never reach this module:
//! the evaluator decides whether to evaluate their right operand.

use std::cmp::Ordering;

use cinder_ir::ast::{BinaryOp, UnaryOp};

use crate::errors::{internal_error, invalid_operands, EvalError, EvalResult};
use crate::value::{FixedPointValue, IntegerValue, StringValue, Value};

/// Evaluate a strict binary operation.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => return Ok(Value::Bool(left != right)),
        BinaryOp::And | BinaryOp::Or | BinaryOp::NilCoalesce => {
            return Err(internal_error(format!(
                "short-circuit operator `{op}` reached strict evaluation"
            )));
        }
        _ => {}
    }
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) if a.kind() == b.kind() => {
            eval_integer_binary(a, b, op)
        }
        (Value::FixedPoint(a), Value::FixedPoint(b)) if a.kind() == b.kind() => {
            eval_fixed_binary(*a, *b, op)
        }
        (Value::String(a), Value::String(b)) => eval_string_binary(a, b, op),
        (Value::Character(a), Value::Character(b)) => {
            compare(a.as_str().cmp(b.as_str()), op).ok_or_else(|| mismatch(left, right, op))
        }
        (Value::Bool(a), Value::Bool(b)) => {
            compare(a.cmp(b), op).ok_or_else(|| mismatch(left, right, op))
        }
        _ => Err(mismatch(left, right, op)),
    }
}

/// Evaluate `-x` or `!x`.
///
/// Move and dereference act on places rather than values and are handled by
/// the evaluator.
pub fn evaluate_unary(value: &Value, op: UnaryOp) -> EvalResult {
    match (value, op) {
        (Value::Integer(i), UnaryOp::Negate) => i.neg().map(Value::Integer),
        (Value::FixedPoint(f), UnaryOp::Negate) => f.neg().map(Value::FixedPoint),
        (Value::Bool(b), UnaryOp::Not) => Ok(Value::Bool(!b)),
        _ => Err(invalid_unary(value, op)),
    }
}

#[cold]
fn mismatch(left: &Value, right: &Value, op: BinaryOp) -> EvalError {
    invalid_operands(op.as_symbol(), left.type_name(), right.type_name())
}

#[cold]
fn invalid_unary(value: &Value, op: UnaryOp) -> EvalError {
    invalid_operands(op.as_symbol(), value.type_name(), "")
}

/// Map an ordering onto a comparison operator; `None` for non-comparisons.
fn compare(ordering: Ordering, op: BinaryOp) -> Option<Value> {
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Value::Bool(result))
}

/// Arithmetic, bitwise and ordering on integers of one kind.
fn eval_integer_binary(a: &IntegerValue, b: &IntegerValue, op: BinaryOp) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.add(b)?,
        BinaryOp::Sub => a.sub(b)?,
        BinaryOp::Mul => a.mul(b)?,
        BinaryOp::Div => a.div(b)?,
        BinaryOp::Mod => a.rem(b)?,
        BinaryOp::BitAnd => a.bit_and(b)?,
        BinaryOp::BitOr => a.bit_or(b)?,
        BinaryOp::BitXor => a.bit_xor(b)?,
        BinaryOp::Shl => a.shl(b)?,
        BinaryOp::Shr => a.shr(b)?,
        _ => {
            let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            return compare(ordering, op).ok_or_else(|| {
                invalid_operands(op.as_symbol(), a.kind().name(), b.kind().name())
            });
        }
    };
    Ok(Value::Integer(result))
}

fn eval_fixed_binary(a: FixedPointValue, b: FixedPointValue, op: BinaryOp) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.add(&b)?,
        BinaryOp::Sub => a.sub(&b)?,
        BinaryOp::Mul => a.mul(&b)?,
        BinaryOp::Div => a.div(&b)?,
        BinaryOp::Mod => a.rem(&b)?,
        _ => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            return compare(ordering, op).ok_or_else(|| {
                invalid_operands(op.as_symbol(), a.kind().name(), b.kind().name())
            });
        }
    };
    Ok(Value::FixedPoint(result))
}

/// Concatenation and lexicographic comparison.
fn eval_string_binary(a: &StringValue, b: &StringValue, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::String(a.concat(b))),
        _ => compare(a.as_str().cmp(b.as_str()), op)
            .ok_or_else(|| invalid_operands(op.as_symbol(), "String", "String")),
    }
}
