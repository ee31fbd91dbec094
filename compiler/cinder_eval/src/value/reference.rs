//! Reference values.
//!
//! A reference never owns its target. It holds a lookup key and the borrowed
//! static type, which is re-checked against the target's dynamic type on
//! every storage dereference.

use cinder_ir::StaticType;

use super::{Value, ValueId};
use crate::storage::StorageKey;

#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceTarget {
    /// A live container, resolved through the reference table.
    Ephemeral(ValueId),
    /// A snapshot of a primitive value, which has no identity to track.
    Immediate(Box<Value>),
    /// A storage location, re-read on each dereference.
    Storage(StorageKey),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceValue {
    pub authorized: bool,
    pub borrowed_type: StaticType,
    pub target: ReferenceTarget,
}

impl ReferenceValue {
    pub fn ephemeral(id: ValueId, authorized: bool, borrowed_type: StaticType) -> Self {
        ReferenceValue {
            authorized,
            borrowed_type,
            target: ReferenceTarget::Ephemeral(id),
        }
    }

    pub fn storage(key: StorageKey, authorized: bool, borrowed_type: StaticType) -> Self {
        ReferenceValue {
            authorized,
            borrowed_type,
            target: ReferenceTarget::Storage(key),
        }
    }

    pub fn static_type(&self) -> StaticType {
        StaticType::reference(self.authorized, self.borrowed_type.clone())
    }
}
