//! Reference creation and liveness-checked dereference.
//!
//! Ephemeral references name a container by `ValueId` and resolve through
//! the shared reference table, so a move (fresh id) or destroy (table entry
//! invalidated) makes every outstanding reference fail on next use. Storage
//! references re-read storage and re-check the borrowed type each time.

use cinder_ir::StaticType;

use super::Interpreter;
use crate::errors::{
    dereference_failed, invalidated_reference, nested_reference, non_optional_reference_to_nil,
    type_mismatch, EvalResult,
};
use crate::storage::StorageKey;
use crate::subtyping::is_subtype;
use crate::value::{Container, ReferenceTarget, ReferenceValue, Value};

impl Interpreter {
    /// `&value as ty`, where `ty` is a reference type, possibly optional.
    pub(crate) fn create_reference(&mut self, value: Value, ty: &StaticType) -> EvalResult {
        let optional = matches!(ty, StaticType::Optional(_));
        let StaticType::Reference {
            authorized,
            referenced,
        } = ty.unwrap_optional()
        else {
            return Err(type_mismatch("reference type", ty.to_string()));
        };
        let target = match value {
            Value::Reference(_) => return Err(nested_reference()),
            Value::Nil if optional => return Ok(Value::Nil),
            Value::Nil => return Err(non_optional_reference_to_nil()),
            Value::Some(inner) => *inner,
            other => other,
        };
        if matches!(target, Value::Reference(_)) {
            return Err(nested_reference());
        }
        let reference = Value::Reference(self.reference_to(target, *authorized, referenced));
        Ok(if optional {
            Value::some(reference)
        } else {
            reference
        })
    }

    /// Reference to `value`: ephemeral for containers, a snapshot otherwise.
    pub(crate) fn reference_to(
        &mut self,
        value: Value,
        authorized: bool,
        borrowed_type: &StaticType,
    ) -> ReferenceValue {
        match value.container() {
            Some(container) => self.reference_to_container(&container, authorized, borrowed_type),
            None => ReferenceValue {
                authorized,
                borrowed_type: borrowed_type.clone(),
                target: ReferenceTarget::Immediate(Box::new(value)),
            },
        }
    }

    pub(crate) fn reference_to_container(
        &mut self,
        container: &Container,
        authorized: bool,
        borrowed_type: &StaticType,
    ) -> ReferenceValue {
        self.shared.references.borrow_mut().register(container);
        ReferenceValue::ephemeral(container.id(), authorized, borrowed_type.clone())
    }

    /// The current target of `reference`.
    pub(crate) fn deref(&mut self, reference: &ReferenceValue) -> EvalResult {
        match &reference.target {
            ReferenceTarget::Ephemeral(id) => self
                .shared
                .references
                .borrow()
                .resolve(*id)
                .map(|container| container.to_value())
                .ok_or_else(invalidated_reference),
            ReferenceTarget::Immediate(value) => Ok((**value).clone()),
            ReferenceTarget::Storage(key) => {
                let stored = self.shared.storage.borrow().read(key);
                let Some(value) = stored else {
                    return Err(dereference_failed(format!(
                        "nothing is stored at {}",
                        self.render_key(key)
                    )));
                };
                let actual = value.static_type();
                if !self.is_subtype(&actual, &reference.borrowed_type) {
                    return Err(dereference_failed(format!(
                        "expected {}, found {actual}",
                        reference.borrowed_type
                    )));
                }
                Ok(value)
            }
        }
    }

    /// Dynamic subtype check against the registered conformances.
    pub(crate) fn is_subtype(&self, sub: &StaticType, sup: &StaticType) -> bool {
        is_subtype(sub, sup, &*self.shared.types.borrow())
    }

    pub(crate) fn render_key(&self, key: &StorageKey) -> String {
        format!(
            "{}:/{}/{}",
            key.address,
            key.domain,
            self.name_str(key.identifier)
        )
    }
}
