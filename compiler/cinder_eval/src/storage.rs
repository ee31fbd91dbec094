//! Storage interface.
//!
//! The evaluator treats storage as an ordered map keyed by
//! (address, domain, identifier), plus slab bookkeeping: every container
//! persisted under an address owns a slab registered to that address, and
//! every container, stored or not, takes its `ValueId` from the slab allocator.
//!
//! The interface is synchronous and not thread-safe; hosts that share a
//! storage between threads serialize access themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cinder_ir::{Address, Name, PathDomain};

use crate::value::{Container, Value, ValueId};

/// A storage location.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    pub address: Address,
    pub domain: PathDomain,
    pub identifier: Name,
}

impl StorageKey {
    pub fn new(address: Address, domain: PathDomain, identifier: Name) -> Self {
        StorageKey {
            address,
            domain,
            identifier,
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:/{}/{:?}", self.address, self.domain, self.identifier)
    }
}

/// Inconsistency found by [`Storage::check_health`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageHealthError {
    #[error("stored container {id:?} under {key} has no slab")]
    MissingSlab { id: ValueId, key: StorageKey },
    #[error("stored container {id:?} under {key} is owned by {actual:?}")]
    OwnerMismatch {
        id: ValueId,
        key: StorageKey,
        actual: Option<Address>,
    },
    #[error("container {id:?} is stored more than once")]
    DuplicateId { id: ValueId },
    #[error("slab {id:?} of {address} is not reachable from any stored value")]
    OrphanSlab { id: ValueId, address: Address },
}

pub trait Storage {
    fn read(&self, key: &StorageKey) -> Option<Value>;

    /// Write or clear a location.
    fn write(&mut self, key: StorageKey, value: Option<Value>);

    /// Allocate a container id; `Some(owner)` also registers a slab for it.
    fn allocate_slab(&mut self, owner: Option<Address>) -> ValueId;

    fn remove_slab(&mut self, id: ValueId);

    /// The address a slab is registered to.
    fn slab_owner(&self, id: ValueId) -> Option<Address>;

    /// All registered slabs.
    fn slabs(&self) -> Vec<(ValueId, Address)>;

    /// All occupied locations, in key order.
    fn keys(&self) -> Vec<StorageKey>;

    /// Validate the stored value graph: every stored container has a live
    /// slab registered to its storage address, no container is stored twice,
    /// and every slab is reachable.
    fn check_health(&self) -> Result<(), StorageHealthError> {
        let mut seen = BTreeSet::new();
        for key in self.keys() {
            let Some(value) = self.read(&key) else {
                continue;
            };
            let mut pending = vec![value];
            while let Some(value) = pending.pop() {
                let container = match value {
                    Value::Some(inner) => {
                        pending.push(*inner);
                        continue;
                    }
                    other => match other.container() {
                        Some(container) => container,
                        None => continue,
                    },
                };
                let header = container.header();
                if !seen.insert(header.id) {
                    return Err(StorageHealthError::DuplicateId { id: header.id });
                }
                if self.slab_owner(header.id) != Some(key.address) {
                    return Err(StorageHealthError::MissingSlab { id: header.id, key });
                }
                if header.owner != Some(key.address) {
                    return Err(StorageHealthError::OwnerMismatch {
                        id: header.id,
                        key,
                        actual: header.owner,
                    });
                }
                pending.extend(container.children());
            }
        }
        for (id, address) in self.slabs() {
            if !seen.contains(&id) {
                return Err(StorageHealthError::OrphanSlab { id, address });
            }
        }
        Ok(())
    }
}

/// In-memory storage backend.
#[derive(Default)]
pub struct InMemoryStorage {
    values: BTreeMap<StorageKey, Value>,
    slabs: BTreeMap<ValueId, Address>,
    next_id: u64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Storage for InMemoryStorage {
    fn read(&self, key: &StorageKey) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, key: StorageKey, value: Option<Value>) {
        tracing::trace!(%key, clear = value.is_none(), "storage write");
        match value {
            Some(value) => {
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    fn allocate_slab(&mut self, owner: Option<Address>) -> ValueId {
        self.next_id += 1;
        let id = ValueId::new(self.next_id);
        if let Some(owner) = owner {
            self.slabs.insert(id, owner);
        }
        id
    }

    fn remove_slab(&mut self, id: ValueId) {
        self.slabs.remove(&id);
    }

    fn slab_owner(&self, id: ValueId) -> Option<Address> {
        self.slabs.get(&id).copied()
    }

    fn slabs(&self) -> Vec<(ValueId, Address)> {
        self.slabs.iter().map(|(id, owner)| (*id, *owner)).collect()
    }

    fn keys(&self) -> Vec<StorageKey> {
        self.values.keys().copied().collect()
    }
}

/// Containers reachable from `value`, outermost first.
pub fn containers_of(value: &Value) -> Vec<Container> {
    let mut found = Vec::new();
    let mut pending = vec![value.clone()];
    while let Some(value) = pending.pop() {
        match value {
            Value::Some(inner) => pending.push(*inner),
            other => {
                if let Some(container) = other.container() {
                    pending.extend(container.children());
                    found.push(container);
                }
            }
        }
    }
    found
}
