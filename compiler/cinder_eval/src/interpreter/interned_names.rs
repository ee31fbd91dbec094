//! Pre-interned names for hot-path member lookup.
//!
//! Interned once at `Interpreter` construction so that member access,
//! receiver binding and builtin dispatch compare `Name`s (`u32 == u32`)
//! instead of going through the interner.

use cinder_ir::{Name, StringInterner};

/// Identifiers the evaluator binds or resolves implicitly.
#[derive(Clone, Copy)]
pub(crate) struct Names {
    pub(crate) self_: Name,
    pub(crate) base: Name,
    pub(crate) result: Name,
    pub(crate) uuid: Name,
    pub(crate) owner: Name,
    pub(crate) raw_value: Name,
    pub(crate) init: Name,
    pub(crate) destroy: Name,
}

impl Names {
    pub(crate) fn new(interner: &StringInterner) -> Self {
        Self {
            self_: interner.intern("self"),
            base: interner.intern("base"),
            result: interner.intern("result"),
            uuid: interner.intern("uuid"),
            owner: interner.intern("owner"),
            raw_value: interner.intern("rawValue"),
            init: interner.intern("init"),
            destroy: interner.intern("destroy"),
        }
    }
}
