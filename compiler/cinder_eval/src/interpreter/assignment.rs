//! Assignment (`=`, `<-`, `<-!`) and swap.
//!
//! The value is evaluated before the place. Every assigned value is
//! transferred to the owner of the container it lands in, so assigning into
//! a stored resource re-homes the value at the storage address.

use cinder_ir::ast::{Expr, ExprKind, Transfer};
use cinder_ir::{Address, Name};

use super::declarations::{box_to, expect_integer};
use super::expressions::hash_key;
use super::Interpreter;
use crate::environment::{AssignError, ScopeRef, Slot};
use crate::errors::{
    array_index_out_of_bounds, constant_assignment, force_assignment_to_non_nil,
    invalid_assignment_target, resource_loss, type_mismatch, undefined_variable, EvalResult,
};
use crate::value::{ArrayValue, CompositeValue, Container, DictionaryValue, HashableKey, Value};

/// An assignable location.
enum Place {
    Variable(ScopeRef, Name),
    Field(CompositeValue, Name),
    Element(ArrayValue, usize),
    Entry(DictionaryValue, HashableKey, Value),
}

impl Place {
    /// Current content; a moved variable or removed field reads as `nil`,
    /// a dictionary entry as an optional.
    fn get(&self) -> Value {
        match self {
            Place::Variable(scope, name) => match scope.slot(*name) {
                Some(Slot::Value(value)) => value,
                _ => Value::Nil,
            },
            Place::Field(composite, name) => composite.field(*name).unwrap_or(Value::Nil),
            Place::Element(array, index) => array.get(*index).unwrap_or(Value::Nil),
            Place::Entry(dictionary, key, _) => Value::optional(dictionary.get(key)),
        }
    }

    fn owner(&self) -> Option<Address> {
        match self {
            Place::Variable(..) => None,
            Place::Field(composite, _) => composite.owner(),
            Place::Element(array, _) => array.borrow().header.owner,
            Place::Entry(dictionary, ..) => dictionary.borrow().header.owner,
        }
    }

    fn container(&self) -> Option<Container> {
        match self {
            Place::Variable(..) => None,
            Place::Field(composite, _) => Some(Container::Composite(composite.clone())),
            Place::Element(array, _) => Some(Container::Array(array.clone())),
            Place::Entry(dictionary, ..) => Some(Container::Dictionary(dictionary.clone())),
        }
    }
}

impl Interpreter {
    pub(crate) fn assign(
        &mut self,
        target: &Expr,
        transfer: Transfer,
        value: &Expr,
    ) -> EvalResult<()> {
        let value = self.eval_binding(value, transfer)?;
        let place = self.resolve_place(target)?;
        if let Some(container) = place.container() {
            self.check_not_nested(&value, &container)?;
        }
        let value = match place.owner() {
            Some(owner) => self.transfer(value, Some(owner))?,
            None => value,
        };

        let old = place.get();
        match transfer {
            Transfer::Copy | Transfer::Move => {
                if old.is_resource() {
                    return Err(resource_loss(old.type_name()));
                }
            }
            Transfer::ForceMove => {
                if !old.is_nil() {
                    return Err(force_assignment_to_non_nil());
                }
            }
        }
        self.store(&place, value)?;
        if !old.is_resource() {
            self.discard(&old);
        }
        Ok(())
    }

    /// `left <-> right`.
    pub(crate) fn swap(&mut self, left: &Expr, right: &Expr) -> EvalResult<()> {
        let left = self.resolve_place(left)?;
        let right = self.resolve_place(right)?;
        let left_value = left.get();
        let right_value = right.get();
        if let Some(container) = right.container() {
            self.check_not_nested(&left_value, &container)?;
        }
        if let Some(container) = left.container() {
            self.check_not_nested(&right_value, &container)?;
        }
        let to_right = self.transfer(left_value.clone(), right.owner())?;
        let to_left = self.transfer(right_value.clone(), left.owner())?;
        self.store(&left, to_left)?;
        self.store(&right, to_right)?;
        for old in [left_value, right_value] {
            if !old.is_resource() {
                self.discard(&old);
            }
        }
        Ok(())
    }

    fn resolve_place(&mut self, target: &Expr) -> EvalResult<Place> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let scope = self
                    .env
                    .find(*name)
                    .ok_or_else(|| undefined_variable(self.name_str(*name)))?;
                Ok(Place::Variable(scope, *name))
            }
            ExprKind::Member { target, name, .. } => match self.eval_place_target(target)? {
                Value::Composite(composite) => Ok(Place::Field(composite, *name)),
                other => Err(type_mismatch("composite", other.type_name())),
            },
            ExprKind::Index { target, index } => {
                let container = self.eval_place_target(target)?;
                let index = self.eval_expr(index)?;
                match container {
                    Value::Array(array) => {
                        let position = expect_integer(&index)?.to_i128_saturating();
                        let length = array.len();
                        let position = usize::try_from(position)
                            .ok()
                            .filter(|p| *p < length)
                            .ok_or_else(|| array_index_out_of_bounds(position, length))?;
                        Ok(Place::Element(array, position))
                    }
                    Value::Dictionary(dictionary) => {
                        let key = hash_key(&index)?;
                        Ok(Place::Entry(dictionary, key, index))
                    }
                    other => Err(type_mismatch("indexable value", other.type_name())),
                }
            }
            _ => Err(invalid_assignment_target()),
        }
    }

    /// The container a member or index place lives in.
    fn eval_place_target(&mut self, target: &Expr) -> EvalResult {
        match self.eval_expr(target)? {
            Value::Reference(reference) => self.deref(&reference),
            value => Ok(value),
        }
    }

    fn store(&mut self, place: &Place, value: Value) -> EvalResult<()> {
        match place {
            Place::Variable(scope, name) => {
                scope.assign(*name, value).map_err(|err| match err {
                    AssignError::Constant => constant_assignment(self.name_str(*name)),
                    AssignError::Undefined => undefined_variable(self.name_str(*name)),
                })?;
            }
            Place::Field(composite, name) => {
                composite.set_field(*name, value);
            }
            Place::Element(array, index) => {
                let value = box_to(value, &array.element_type());
                if let Some(slot) = array.borrow_mut().elements.get_mut(*index) {
                    *slot = value;
                }
            }
            Place::Entry(dictionary, key, key_value) => match value {
                Value::Nil => {
                    dictionary.remove(key);
                }
                Value::Some(inner) => {
                    let inner = box_to(*inner, &dictionary.value_type());
                    dictionary.insert(key.clone(), key_value.clone(), inner);
                }
                other => {
                    let other = box_to(other, &dictionary.value_type());
                    dictionary.insert(key.clone(), key_value.clone(), other);
                }
            },
        }
        Ok(())
    }
}
