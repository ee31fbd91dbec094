//! Container values: composites, arrays and dictionaries.
//!
//! Containers are shared handles (`Rc<RefCell<_>>`). Copy semantics for
//! non-resource kinds are provided by the transfer protocol, which deep-copies
//! into fresh containers; a handle clone is never a language-level copy.
//!
//! Every container carries a `ValueId`. Ephemeral references name containers
//! by id and resolve through the reference table, so assigning a fresh id is
//! how a move invalidates outstanding references.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use cinder_ir::{Address, CompositeKind, Location, Name, PathDomain, StaticType, TypeId};
use indexmap::IndexMap;

use super::{FixedPointValue, IntegerValue, StringValue, Value};

/// Identity of a container, allocated by the storage interface.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u64);

impl ValueId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        ValueId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({})", self.0)
    }
}

/// Bookkeeping shared by every container kind.
#[derive(Clone, Debug)]
pub struct Header {
    pub id: ValueId,
    /// Storage address when the container is persisted.
    pub owner: Option<Address>,
    pub destroyed: bool,
}

impl Header {
    pub fn new(id: ValueId, owner: Option<Address>) -> Self {
        Header {
            id,
            owner,
            destroyed: false,
        }
    }
}

// Composite

#[derive(Debug)]
pub struct CompositeData {
    pub header: Header,
    pub type_id: TypeId,
    pub kind: CompositeKind,
    /// Location of the declaring program.
    pub location: Location,
    pub fields: IndexMap<Name, Value>,
    /// Host-injected members; not part of the transferred value.
    pub injected: IndexMap<Name, Value>,
    /// Raw value of an enum case.
    pub raw_value: Option<IntegerValue>,
}

#[derive(Clone)]
pub struct CompositeValue(Rc<RefCell<CompositeData>>);

impl CompositeValue {
    pub fn new(data: CompositeData) -> Self {
        CompositeValue(Rc::new(RefCell::new(data)))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, CompositeData> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, CompositeData> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> ValueId {
        self.0.borrow().header.id
    }

    pub fn type_id(&self) -> TypeId {
        self.0.borrow().type_id.clone()
    }

    pub fn kind(&self) -> CompositeKind {
        self.0.borrow().kind
    }

    pub fn is_resource(&self) -> bool {
        self.kind().is_resource()
    }

    pub fn owner(&self) -> Option<Address> {
        self.0.borrow().header.owner
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.borrow().header.destroyed
    }

    pub fn field(&self, name: Name) -> Option<Value> {
        let data = self.0.borrow();
        data.fields
            .get(&name)
            .or_else(|| data.injected.get(&name))
            .cloned()
    }

    /// Set a field, returning the previous value.
    pub fn set_field(&self, name: Name, value: Value) -> Option<Value> {
        self.0.borrow_mut().fields.insert(name, value)
    }

    /// Remove a field, keeping the order of the others.
    pub fn remove_field(&self, name: Name) -> Option<Value> {
        self.0.borrow_mut().fields.shift_remove(&name)
    }

    pub fn static_type(&self) -> StaticType {
        let data = self.0.borrow();
        StaticType::Composite(cinder_ir::NominalType::new(data.type_id.clone(), data.kind))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &CompositeValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> Weak<RefCell<CompositeData>> {
        Rc::downgrade(&self.0)
    }
}

impl fmt::Debug for CompositeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Composite")
                .field("type_id", &data.type_id)
                .field("id", &data.header.id)
                .field("fields", &data.fields)
                .finish(),
            Err(_) => f.write_str("Composite(<borrowed>)"),
        }
    }
}

// Array

#[derive(Debug)]
pub struct ArrayData {
    pub header: Header,
    /// The array's own static type (variable or constant sized).
    pub ty: StaticType,
    pub elements: Vec<Value>,
}

#[derive(Clone)]
pub struct ArrayValue(Rc<RefCell<ArrayData>>);

impl ArrayValue {
    pub fn new(data: ArrayData) -> Self {
        ArrayValue(Rc::new(RefCell::new(data)))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, ArrayData> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, ArrayData> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> ValueId {
        self.0.borrow().header.id
    }

    pub fn len(&self) -> usize {
        self.0.borrow().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().elements.is_empty()
    }

    pub fn static_type(&self) -> StaticType {
        self.0.borrow().ty.clone()
    }

    pub fn element_type(&self) -> StaticType {
        self.0
            .borrow()
            .ty
            .element_type()
            .cloned()
            .unwrap_or(StaticType::AnyStruct)
    }

    pub fn is_resource(&self) -> bool {
        self.0.borrow().ty.is_resource()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().elements.get(index).cloned()
    }

    /// Snapshot of the elements.
    pub fn elements(&self) -> Vec<Value> {
        self.0.borrow().elements.clone()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ArrayValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> Weak<RefCell<ArrayData>> {
        Rc::downgrade(&self.0)
    }
}

impl fmt::Debug for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f.debug_list().entries(data.elements.iter()).finish(),
            Err(_) => f.write_str("Array(<borrowed>)"),
        }
    }
}

// Dictionary

/// Hashable projection of a dictionary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashableKey {
    Bool(bool),
    Integer(IntegerValue),
    FixedPoint(FixedPointValue),
    String(StringValue),
    Character(StringValue),
    Address(Address),
    Path(PathDomain, Name),
    Type(StaticType),
    Enum(TypeId, IntegerValue),
}

impl HashableKey {
    /// The key for `value`, or `None` if the value is not hashable.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Bool(b) => HashableKey::Bool(*b),
            Value::Integer(i) => HashableKey::Integer(i.clone()),
            Value::FixedPoint(f) => HashableKey::FixedPoint(*f),
            Value::String(s) => HashableKey::String(s.clone()),
            Value::Character(c) => HashableKey::Character(c.clone()),
            Value::Address(a) => HashableKey::Address(*a),
            Value::Path(p) => HashableKey::Path(p.domain, p.identifier),
            Value::Type(t) => HashableKey::Type(t.clone()),
            Value::Composite(c) => {
                let data = c.borrow();
                let raw = data.raw_value.clone()?;
                HashableKey::Enum(data.type_id.clone(), raw)
            }
            _ => return None,
        })
    }
}

#[derive(Debug)]
pub struct DictionaryData {
    pub header: Header,
    pub ty: StaticType,
    /// Insertion-ordered entries; each keeps its original key value.
    pub entries: IndexMap<HashableKey, (Value, Value)>,
}

#[derive(Clone)]
pub struct DictionaryValue(Rc<RefCell<DictionaryData>>);

impl DictionaryValue {
    pub fn new(data: DictionaryData) -> Self {
        DictionaryValue(Rc::new(RefCell::new(data)))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, DictionaryData> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, DictionaryData> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> ValueId {
        self.0.borrow().header.id
    }

    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().entries.is_empty()
    }

    pub fn static_type(&self) -> StaticType {
        self.0.borrow().ty.clone()
    }

    pub fn value_type(&self) -> StaticType {
        match &self.0.borrow().ty {
            StaticType::Dictionary(_, value) => (**value).clone(),
            _ => StaticType::AnyStruct,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.0.borrow().ty.is_resource()
    }

    pub fn get(&self, key: &HashableKey) -> Option<Value> {
        self.0.borrow().entries.get(key).map(|(_, v)| v.clone())
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&self, key: HashableKey, key_value: Value, value: Value) -> Option<Value> {
        self.0
            .borrow_mut()
            .entries
            .insert(key, (key_value, value))
            .map(|(_, old)| old)
    }

    /// Remove, keeping insertion order of the remaining entries.
    pub fn remove(&self, key: &HashableKey) -> Option<Value> {
        self.0
            .borrow_mut()
            .entries
            .shift_remove(key)
            .map(|(_, old)| old)
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0
            .borrow()
            .entries
            .values()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0
            .borrow()
            .entries
            .values()
            .map(|(_, v)| v.clone())
            .collect()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &DictionaryValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> Weak<RefCell<DictionaryData>> {
        Rc::downgrade(&self.0)
    }
}

impl fmt::Debug for DictionaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_map()
                .entries(data.entries.values().map(|(k, v)| (k, v)))
                .finish(),
            Err(_) => f.write_str("Dictionary(<borrowed>)"),
        }
    }
}

// Uniform container access

/// Any container, for code that treats all three kinds alike.
#[derive(Clone, Debug)]
pub enum Container {
    Composite(CompositeValue),
    Array(ArrayValue),
    Dictionary(DictionaryValue),
}

impl Container {
    pub fn id(&self) -> ValueId {
        self.header().id
    }

    pub fn header(&self) -> Header {
        match self {
            Container::Composite(c) => c.borrow().header.clone(),
            Container::Array(a) => a.borrow().header.clone(),
            Container::Dictionary(d) => d.borrow().header.clone(),
        }
    }

    pub fn with_header_mut<R>(&self, f: impl FnOnce(&mut Header) -> R) -> R {
        match self {
            Container::Composite(c) => f(&mut c.borrow_mut().header),
            Container::Array(a) => f(&mut a.borrow_mut().header),
            Container::Dictionary(d) => f(&mut d.borrow_mut().header),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.header().destroyed
    }

    pub fn is_resource(&self) -> bool {
        match self {
            Container::Composite(c) => c.is_resource(),
            Container::Array(a) => a.is_resource(),
            Container::Dictionary(d) => d.is_resource(),
        }
    }

    /// Values held directly by this container.
    pub fn children(&self) -> Vec<Value> {
        match self {
            Container::Composite(c) => c.borrow().fields.values().cloned().collect(),
            Container::Array(a) => a.elements(),
            Container::Dictionary(d) => d.values(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Container::Composite(c) => Value::Composite(c.clone()),
            Container::Array(a) => Value::Array(a.clone()),
            Container::Dictionary(d) => Value::Dictionary(d.clone()),
        }
    }

    pub fn downgrade(&self) -> WeakContainer {
        match self {
            Container::Composite(c) => WeakContainer::Composite(c.downgrade()),
            Container::Array(a) => WeakContainer::Array(a.downgrade()),
            Container::Dictionary(d) => WeakContainer::Dictionary(d.downgrade()),
        }
    }

    pub fn ptr_eq(&self, other: &Container) -> bool {
        match (self, other) {
            (Container::Composite(a), Container::Composite(b)) => a.ptr_eq(b),
            (Container::Array(a), Container::Array(b)) => a.ptr_eq(b),
            (Container::Dictionary(a), Container::Dictionary(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Non-owning container handle held by the reference table.
#[derive(Clone, Debug)]
pub enum WeakContainer {
    Composite(Weak<RefCell<CompositeData>>),
    Array(Weak<RefCell<ArrayData>>),
    Dictionary(Weak<RefCell<DictionaryData>>),
}

impl WeakContainer {
    pub fn upgrade(&self) -> Option<Container> {
        match self {
            WeakContainer::Composite(w) => {
                w.upgrade().map(|rc| Container::Composite(CompositeValue(rc)))
            }
            WeakContainer::Array(w) => w.upgrade().map(|rc| Container::Array(ArrayValue(rc))),
            WeakContainer::Dictionary(w) => {
                w.upgrade().map(|rc| Container::Dictionary(DictionaryValue(rc)))
            }
        }
    }
}
