//! The storage API: `save`, `load`, `copy`, `borrow` and `check`.
//!
//! Saved values are transferred to the storage address, so every container
//! in them is owned by that address and registered as a slab there. Loading
//! moves a resource back out; non-resources come out as copies.

use cinder_ir::{Address, PathDomain, StaticType};

use super::Interpreter;
use crate::errors::{force_cast_type_mismatch, overwrite, resource_copy, type_mismatch, EvalResult};
use crate::storage::StorageKey;
use crate::value::{PathValue, ReferenceValue, Value};

impl Interpreter {
    /// A `/storage/<identifier>` path.
    pub fn storage_path(&self, identifier: &str) -> PathValue {
        PathValue {
            domain: PathDomain::Storage,
            identifier: self.interner.intern(identifier),
        }
    }

    /// Store `value` at `address` under `path`; the location must be empty.
    pub fn save(&mut self, address: Address, path: PathValue, value: Value) -> EvalResult<()> {
        let key = StorageKey::new(address, path.domain, path.identifier);
        if self.shared.storage.borrow().read(&key).is_some() {
            return Err(overwrite(address, self.render_path(path)));
        }
        let value = self.transfer(value, Some(address))?;
        tracing::trace!(key = %self.render_key(&key), "saving value");
        self.shared.storage.borrow_mut().write(key, Some(value));
        Ok(())
    }

    /// Move the value at `path` out of storage, if it has type `ty`.
    pub fn load(&mut self, address: Address, path: PathValue, ty: &StaticType) -> EvalResult {
        let key = StorageKey::new(address, path.domain, path.identifier);
        let Some(stored) = self.stored_as(&key, ty)? else {
            return Ok(Value::Nil);
        };
        self.shared.storage.borrow_mut().write(key, None);
        tracing::trace!(key = %self.render_key(&key), "loaded value");
        Ok(Value::some(self.release(stored)?))
    }

    /// Copy the non-resource value at `path`, if it has type `ty`.
    pub fn copy(&mut self, address: Address, path: PathValue, ty: &StaticType) -> EvalResult {
        let key = StorageKey::new(address, path.domain, path.identifier);
        let Some(stored) = self.stored_as(&key, ty)? else {
            return Ok(Value::Nil);
        };
        if stored.is_resource() {
            return Err(resource_copy(stored.type_name()));
        }
        Ok(Value::some(self.transfer(stored, None)?))
    }

    /// A storage reference to the value at `path`, typed by the reference
    /// type `ty`, or `nil` if nothing of that type is stored there.
    pub fn borrow(&mut self, address: Address, path: PathValue, ty: &StaticType) -> EvalResult {
        let StaticType::Reference {
            authorized,
            referenced,
        } = ty
        else {
            return Err(type_mismatch("reference type", ty.to_string()));
        };
        if !self.check(address, path, referenced)? {
            return Ok(Value::Nil);
        }
        let key = StorageKey::new(address, path.domain, path.identifier);
        Ok(Value::some(Value::Reference(ReferenceValue::storage(
            key,
            *authorized,
            (**referenced).clone(),
        ))))
    }

    /// Whether a value of type `ty` is stored at `path`.
    pub fn check(
        &mut self,
        address: Address,
        path: PathValue,
        ty: &StaticType,
    ) -> EvalResult<bool> {
        let key = StorageKey::new(address, path.domain, path.identifier);
        let stored = self.shared.storage.borrow().read(&key);
        Ok(stored.is_some_and(|value| self.is_subtype(&value.static_type(), ty)))
    }

    /// The stored value, or `None` when the location is empty. A value of
    /// the wrong type is a failed force cast.
    fn stored_as(&self, key: &StorageKey, ty: &StaticType) -> EvalResult<Option<Value>> {
        let Some(stored) = self.shared.storage.borrow().read(key) else {
            return Ok(None);
        };
        let actual = stored.static_type();
        if !self.is_subtype(&actual, ty) {
            return Err(force_cast_type_mismatch(ty.to_string(), actual.to_string()));
        }
        Ok(Some(stored))
    }

    fn render_path(&self, path: PathValue) -> String {
        format!("/{}/{}", path.domain, self.name_str(path.identifier))
    }
}
