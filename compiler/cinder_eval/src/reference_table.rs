//! The authoritative table behind ephemeral references.
//!
//! Maps container ids to weak handles. A reference resolves only while its id
//! is registered: moving a container re-registers it under a fresh id,
//! destroying it or leaving its defining scope removes it.

use rustc_hash::FxHashMap;

use crate::value::{Container, ValueId, WeakContainer};

/// Table size below which `register` never prunes.
const MIN_PRUNE_THRESHOLD: usize = 64;

#[derive(Default)]
pub struct ReferenceTable {
    entries: FxHashMap<ValueId, WeakContainer>,
    /// `register` prunes once the table reaches this size.
    prune_threshold: usize,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `container` under its current id.
    ///
    /// Entries of dropped containers are pruned once the table doubles in
    /// size, so temporaries never referenced again do not accumulate.
    pub fn register(&mut self, container: &Container) {
        if self.entries.len() >= self.prune_threshold {
            self.prune();
            self.prune_threshold = (self.entries.len() * 2).max(MIN_PRUNE_THRESHOLD);
        }
        self.entries.insert(container.id(), container.downgrade());
    }

    /// Remove `id`; references holding it fail from now on.
    pub fn invalidate(&mut self, id: ValueId) {
        if self.entries.remove(&id).is_some() {
            tracing::trace!(?id, "reference invalidated");
        }
    }

    /// The live container registered under `id`.
    pub fn resolve(&self, id: ValueId) -> Option<Container> {
        let container = self.entries.get(&id)?.upgrade()?;
        (container.id() == id && !container.is_destroyed()).then_some(container)
    }

    pub fn contains(&self, id: ValueId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose containers no longer exist.
    pub fn prune(&mut self) {
        self.entries.retain(|_, weak| weak.upgrade().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ArrayData, ArrayValue, Header, Value};
    use cinder_ir::StaticType;

    fn array(id: u64) -> ArrayValue {
        ArrayValue::new(ArrayData {
            header: Header::new(ValueId::new(id), None),
            ty: StaticType::array(StaticType::Bool),
            elements: vec![Value::Bool(true)],
        })
    }

    #[test]
    fn test_resolve_follows_registration() {
        let mut table = ReferenceTable::new();
        let a = array(1);
        table.register(&Container::Array(a.clone()));
        assert!(table.resolve(ValueId::new(1)).is_some());
        table.invalidate(ValueId::new(1));
        assert!(table.resolve(ValueId::new(1)).is_none());
    }

    #[test]
    fn test_stale_id_does_not_resolve_after_renumbering() {
        let mut table = ReferenceTable::new();
        let a = array(1);
        table.register(&Container::Array(a.clone()));
        a.borrow_mut().header.id = ValueId::new(2);
        assert!(table.resolve(ValueId::new(1)).is_none());
    }

    #[test]
    fn test_destroyed_container_does_not_resolve() {
        let mut table = ReferenceTable::new();
        let a = array(1);
        table.register(&Container::Array(a.clone()));
        a.borrow_mut().header.destroyed = true;
        assert!(table.resolve(ValueId::new(1)).is_none());
    }

    #[test]
    fn test_prune_drops_dead_entries() {
        let mut table = ReferenceTable::new();
        table.register(&Container::Array(array(1)));
        table.prune();
        assert!(table.is_empty());
    }

    #[test]
    fn test_register_prunes_dropped_temporaries() {
        let mut table = ReferenceTable::new();
        for id in 0..1_000 {
            table.register(&Container::Array(array(id)));
        }
        assert!(table.len() <= MIN_PRUNE_THRESHOLD);
    }

    #[test]
    fn test_register_keeps_live_entries_when_pruning() {
        let mut table = ReferenceTable::new();
        let live = array(1_000);
        table.register(&Container::Array(live.clone()));
        for id in 0..200 {
            table.register(&Container::Array(array(id)));
        }
        assert!(table.resolve(ValueId::new(1_000)).is_some());
    }
}
