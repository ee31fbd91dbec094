//! Member and index access.
//!
//! Member lookup on a composite tries, in order: fields (and host-injected
//! members), declared fields that were moved out (read as `nil`), `owner`,
//! `rawValue`, methods and the builtins every value has. Reads through a
//! reference never hand out a resource: resource-kinded fields and elements
//! come back as references with the same authorization.

use std::rc::Rc;

use cinder_ir::ast::{Expr, Transfer};
use cinder_ir::{IntegerKind, Name, StaticType};

use super::declarations::expect_integer;
use super::expressions::hash_key;
use super::Interpreter;
use crate::errors::{array_index_out_of_bounds, missing_member, type_mismatch, EvalResult};
use crate::value::{
    BoundFunction, BuiltinMethod, CompositeValue, Container, FunctionValue, IntegerValue,
    ReferenceValue, Value,
};

impl Interpreter {
    /// `target.name` and `target?.name`.
    pub(crate) fn eval_member(&mut self, target: &Expr, name: Name, optional: bool) -> EvalResult {
        let value = self.eval_expr(target)?;
        if !optional {
            return self.member_of(value, name);
        }
        match value {
            Value::Nil => Ok(Value::Nil),
            Value::Some(inner) => Ok(match self.member_of(*inner, name)? {
                member @ (Value::Some(_) | Value::Nil) => member,
                member => Value::some(member),
            }),
            other => self.member_of(other, name),
        }
    }

    /// Member `name` of an already evaluated value.
    pub(crate) fn member_of(&mut self, value: Value, name: Name) -> EvalResult {
        match &value {
            Value::Reference(reference) => self.member_through_reference(reference, name),
            Value::Composite(composite) => self.composite_member(composite, name),
            Value::Function(FunctionValue::Constructor(constructor)) => {
                let case = self
                    .shared
                    .types
                    .borrow()
                    .composite(&constructor.type_id)
                    .and_then(|code| code.enum_case(name));
                case.map(Value::Composite).ok_or_else(|| {
                    missing_member(self.name_str(name), constructor.type_id.to_string())
                })
            }
            _ => {
                if let Some(property) = self.property(&value, name)? {
                    return Ok(property);
                }
                self.builtin_member(value, name)
            }
        }
    }

    fn composite_member(&mut self, composite: &CompositeValue, name: Name) -> EvalResult {
        if let Some(field) = composite.field(name) {
            return Ok(field);
        }
        let type_id = composite.type_id();
        let code = self.shared.types.borrow().composite(&type_id);
        if let Some(code) = &code {
            if code.decl.fields.iter().any(|field| field.name == name) {
                return Ok(Value::Nil);
            }
        }
        if name == self.names.owner {
            return Ok(Value::optional(composite.owner().map(Value::Address)));
        }
        if name == self.names.raw_value {
            if let Some(raw) = composite.borrow().raw_value.clone() {
                return Ok(Value::Integer(raw));
            }
        }
        if let Some(plan) = code.as_ref().and_then(|code| code.method(name)) {
            let container = Container::Composite(composite.clone());
            let receiver = self.reference_to_container(&container, true, &composite.static_type());
            return Ok(Value::Function(FunctionValue::Bound(Rc::new(BoundFunction {
                plan,
                receiver,
            }))));
        }
        self.builtin_member(Value::Composite(composite.clone()), name)
    }

    fn member_through_reference(&mut self, reference: &ReferenceValue, name: Name) -> EvalResult {
        let target = self.deref(reference)?;
        let member = self.member_of(target, name)?;
        Ok(self.borrow_if_resource(member, reference.authorized))
    }

    /// A resource read through a reference becomes a reference to it.
    fn borrow_if_resource(&mut self, value: Value, authorized: bool) -> Value {
        match value {
            Value::Some(inner) if inner.is_resource() => {
                Value::some(self.borrow_if_resource(*inner, authorized))
            }
            value if value.is_resource() => {
                let ty = value.static_type();
                Value::Reference(self.reference_to(value, authorized, &ty))
            }
            value => value,
        }
    }

    /// Non-callable members of builtin kinds.
    fn property(&mut self, value: &Value, name: Name) -> EvalResult<Option<Value>> {
        let property = self.name_str(name);
        Ok(Some(match (value, property) {
            (Value::Array(array), "length") => {
                Value::Integer(IntegerValue::from_usize(array.len()))
            }
            (Value::Dictionary(dictionary), "length") => {
                Value::Integer(IntegerValue::from_usize(dictionary.len()))
            }
            (Value::Dictionary(dictionary), "keys") => {
                let key_type = match dictionary.static_type() {
                    StaticType::Dictionary(key, _) => *key,
                    _ => StaticType::AnyStruct,
                };
                let keys = dictionary
                    .keys()
                    .into_iter()
                    .map(|key| self.transfer(key, None))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.new_array(StaticType::array(key_type), keys, None)
            }
            (Value::Dictionary(dictionary), "values") => {
                let values = dictionary
                    .values()
                    .into_iter()
                    .map(|value| self.transfer_checked(value, Transfer::Copy, None))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.new_array(StaticType::array(dictionary.value_type()), values, None)
            }
            (Value::String(string), "length") => {
                Value::Integer(IntegerValue::from_usize(string.length()))
            }
            (Value::String(string) | Value::Character(string), "utf8") => self.bytes(string.utf8()),
            (Value::Type(ty), "identifier") => Value::string(&ty.to_string()),
            _ => return Ok(None),
        }))
    }

    /// A builtin method as a callable value, or a missing-member error.
    fn builtin_member(&mut self, value: Value, name: Name) -> EvalResult {
        if self.has_builtin(&value, name) {
            return Ok(Value::Function(FunctionValue::Builtin(Rc::new(BuiltinMethod {
                receiver: value,
                method: name,
            }))));
        }
        Err(missing_member(self.name_str(name), value.type_name()))
    }

    /// `[UInt8]` holding `bytes`.
    pub(crate) fn bytes(&mut self, bytes: &[u8]) -> Value {
        let elements = bytes
            .iter()
            .map(|byte| Value::Integer(IntegerValue::from_u8(*byte)))
            .collect();
        self.new_array(
            StaticType::array(StaticType::Integer(IntegerKind::UInt8)),
            elements,
            None,
        )
    }

    /// `target[index]`.
    pub(crate) fn eval_index(&mut self, target: &Expr, index: &Expr) -> EvalResult {
        let target = self.eval_expr(target)?;
        let index = self.eval_expr(index)?;
        self.index_value(target, &index)
    }

    pub(crate) fn index_value(&mut self, target: Value, index: &Value) -> EvalResult {
        match &target {
            Value::Reference(reference) => {
                let authorized = reference.authorized;
                let target = self.deref(reference)?;
                let element = self.index_value(target, index)?;
                Ok(self.borrow_if_resource(element, authorized))
            }
            Value::Array(array) => {
                let position = expect_integer(index)?.to_i128_saturating();
                let element = usize::try_from(position)
                    .ok()
                    .and_then(|position| array.get(position));
                element.ok_or_else(|| array_index_out_of_bounds(position, array.len()))
            }
            Value::Dictionary(dictionary) => {
                let key = hash_key(index)?;
                Ok(Value::optional(dictionary.get(&key)))
            }
            Value::String(string) => {
                let position = expect_integer(index)?.to_i128_saturating();
                Ok(Value::Character(string.character_at(position)?))
            }
            other => Err(type_mismatch("indexable value", other.type_name())),
        }
    }
}
