//! The copy-or-move protocol.
//!
//! Every value that lands in a new home (a variable, a field, a container
//! element, an argument, a storage location) goes through [`Interpreter::transfer`]:
//!
//! - resources keep their identity but every container inside them gets a
//!   fresh `ValueId` and the destination's owner, which invalidates all
//!   outstanding ephemeral references;
//! - everything else is deep-copied into fresh containers.

use cinder_ir::ast::Transfer;
use cinder_ir::{Address, CompositeKind};
use indexmap::IndexMap;

use super::Interpreter;
use crate::errors::{
    destroyed_resource, non_transferable_value, recursive_transfer, resource_copy, EvalResult,
};
use crate::storage::containers_of;
use crate::value::{
    ArrayData, ArrayValue, CompositeData, CompositeValue, Container, DictionaryData,
    DictionaryValue, Header, Value, ValueId,
};

impl Interpreter {
    /// Move or copy `value` into a destination owned by `owner`.
    pub(crate) fn transfer(&mut self, value: Value, owner: Option<Address>) -> EvalResult {
        if value.is_resource() {
            self.move_resource(&value, owner)?;
            Ok(value)
        } else {
            self.copy_value(&value, owner)
        }
    }

    /// Like [`Interpreter::transfer`], but a `=` transfer of a resource is an
    /// error rather than a move.
    pub(crate) fn transfer_checked(
        &mut self,
        value: Value,
        kind: Transfer,
        owner: Option<Address>,
    ) -> EvalResult {
        if kind == Transfer::Copy && value.is_resource() {
            return Err(resource_copy(value.type_name()));
        }
        self.transfer(value, owner)
    }

    /// Fresh container id, registered as a slab when `owner` is set.
    pub(crate) fn allocate_id(&self, owner: Option<Address>) -> ValueId {
        self.shared.storage.borrow_mut().allocate_slab(owner)
    }

    fn move_resource(&mut self, value: &Value, owner: Option<Address>) -> EvalResult<()> {
        let containers = containers_of(value);
        if let Some(destroyed) = containers.iter().find(|c| c.is_destroyed()) {
            return Err(destroyed_resource(container_type_name(destroyed)));
        }
        let mut storage = self.shared.storage.borrow_mut();
        let mut references = self.shared.references.borrow_mut();
        for container in containers {
            let old = container.id();
            if storage.slab_owner(old).is_some() {
                storage.remove_slab(old);
            }
            references.invalidate(old);
            let id = storage.allocate_slab(owner);
            container.with_header_mut(|header| {
                header.id = id;
                header.owner = owner;
            });
            tracing::trace!(?old, new = ?id, ?owner, "moved container");
        }
        Ok(())
    }

    fn copy_value(&mut self, value: &Value, owner: Option<Address>) -> EvalResult {
        match value {
            Value::Some(inner) => Ok(Value::some(self.copy_value(inner, owner)?)),
            Value::Composite(composite) => {
                if composite.kind() == CompositeKind::Contract {
                    return Err(non_transferable_value(composite.type_id().to_string()));
                }
                if composite.is_resource() {
                    return Err(resource_copy(composite.type_id().to_string()));
                }
                let (fields, type_id, kind, location, injected, raw_value) = {
                    let data = composite.borrow();
                    (
                        data.fields.clone(),
                        data.type_id.clone(),
                        data.kind,
                        data.location.clone(),
                        data.injected.clone(),
                        data.raw_value.clone(),
                    )
                };
                let mut copied = IndexMap::with_capacity(fields.len());
                for (name, field) in fields {
                    copied.insert(name, self.copy_value(&field, owner)?);
                }
                Ok(Value::Composite(CompositeValue::new(CompositeData {
                    header: Header::new(self.allocate_id(owner), owner),
                    type_id,
                    kind,
                    location,
                    fields: copied,
                    injected,
                    raw_value,
                })))
            }
            Value::Array(array) => {
                if array.is_resource() {
                    return Err(resource_copy(array.static_type().to_string()));
                }
                let elements = array
                    .elements()
                    .iter()
                    .map(|element| self.copy_value(element, owner))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(ArrayValue::new(ArrayData {
                    header: Header::new(self.allocate_id(owner), owner),
                    ty: array.static_type(),
                    elements,
                })))
            }
            Value::Dictionary(dictionary) => {
                if dictionary.is_resource() {
                    return Err(resource_copy(dictionary.static_type().to_string()));
                }
                let entries: Vec<_> = dictionary
                    .borrow()
                    .entries
                    .iter()
                    .map(|(hash, (key, value))| (hash.clone(), key.clone(), value.clone()))
                    .collect();
                let mut copied = IndexMap::with_capacity(entries.len());
                for (hash, key, value) in entries {
                    copied.insert(hash, (key, self.copy_value(&value, owner)?));
                }
                Ok(Value::Dictionary(DictionaryValue::new(DictionaryData {
                    header: Header::new(self.allocate_id(owner), owner),
                    ty: dictionary.static_type(),
                    entries: copied,
                })))
            }
            other => Ok(other.clone()),
        }
    }

    /// Release a non-resource value that was overwritten or removed: its
    /// slabs are freed and references to its containers invalidated.
    pub(crate) fn discard(&mut self, value: &Value) {
        let mut storage = self.shared.storage.borrow_mut();
        let mut references = self.shared.references.borrow_mut();
        for container in containers_of(value) {
            let id = container.id();
            if storage.slab_owner(id).is_some() {
                storage.remove_slab(id);
            }
            references.invalidate(id);
        }
    }

    /// Fail if `value` contains `target`, which would nest a container
    /// inside itself.
    pub(crate) fn check_not_nested(&self, value: &Value, target: &Container) -> EvalResult<()> {
        if containers_of(value).iter().any(|c| c.ptr_eq(target)) {
            return Err(recursive_transfer(value.type_name()));
        }
        Ok(())
    }
}

pub(crate) fn container_type_name(container: &Container) -> String {
    match container {
        Container::Composite(c) => c.type_id().to_string(),
        Container::Array(a) => a.static_type().to_string(),
        Container::Dictionary(d) => d.static_type().to_string(),
    }
}
