//! Runtime values.
//!
//! `Value` is a closed enum. Primitive variants are immutable and cheap to
//! clone; container variants (`Array`, `Dictionary`, `Composite`) are shared
//! handles whose copy/move semantics are implemented by the transfer protocol
//! in `interpreter::transfer`.

mod container;
mod fixed;
mod function;
mod integer;
mod reference;
mod string;

use std::fmt;

use cinder_ir::{Address, IntegerKind, Name, PathDomain, StaticType, StringInterner};

pub use container::{
    ArrayData, ArrayValue, CompositeData, CompositeValue, Container, DictionaryData,
    DictionaryValue, HashableKey, Header, ValueId, WeakContainer,
};
pub use fixed::{FixedPointValue, SCALE_FACTOR};
pub use function::{
    BoundFunction, BuiltinMethod, ConstructorFunction, FunctionValue, HostFn, HostFunction,
    HostInvocation, InterpretedFunction,
};
pub use integer::IntegerValue;
pub use reference::{ReferenceTarget, ReferenceValue};
pub use string::{quote, StringValue};

/// A storage path such as `/storage/vault`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathValue {
    pub domain: PathDomain,
    pub identifier: Name,
}

impl PathValue {
    pub fn static_type(self) -> StaticType {
        match self.domain {
            PathDomain::Storage => StaticType::StoragePath,
            PathDomain::Public => StaticType::PublicPath,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Nil,
    Some(Box<Value>),
    Bool(bool),
    Integer(IntegerValue),
    FixedPoint(FixedPointValue),
    String(StringValue),
    Character(StringValue),
    Address(Address),
    Path(PathValue),
    Array(ArrayValue),
    Dictionary(DictionaryValue),
    Composite(CompositeValue),
    Function(FunctionValue),
    Reference(ReferenceValue),
    Type(StaticType),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Integer(IntegerValue::int(value))
    }

    pub fn string(value: &str) -> Self {
        Value::String(StringValue::new(value))
    }

    pub fn some(value: Value) -> Self {
        Value::Some(Box::new(value))
    }

    pub fn optional(value: Option<Value>) -> Self {
        match value {
            Some(v) => Value::some(v),
            None => Value::Nil,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Whether this value is under linear ownership.
    pub fn is_resource(&self) -> bool {
        match self {
            Value::Composite(c) => c.is_resource(),
            Value::Array(a) => a.is_resource(),
            Value::Dictionary(d) => d.is_resource(),
            Value::Some(inner) => inner.is_resource(),
            _ => false,
        }
    }

    pub fn container(&self) -> Option<Container> {
        match self {
            Value::Composite(c) => Some(Container::Composite(c.clone())),
            Value::Array(a) => Some(Container::Array(a.clone())),
            Value::Dictionary(d) => Some(Container::Dictionary(d.clone())),
            _ => None,
        }
    }

    /// The dynamic type of this value.
    pub fn static_type(&self) -> StaticType {
        match self {
            Value::Void => StaticType::Void,
            Value::Nil => StaticType::optional(StaticType::Never),
            Value::Some(inner) => StaticType::optional(inner.static_type()),
            Value::Bool(_) => StaticType::Bool,
            Value::Integer(i) => StaticType::Integer(i.kind()),
            Value::FixedPoint(f) => StaticType::FixedPoint(f.kind()),
            Value::String(_) => StaticType::String,
            Value::Character(_) => StaticType::Character,
            Value::Address(_) => StaticType::Address,
            Value::Path(p) => p.static_type(),
            Value::Array(a) => a.static_type(),
            Value::Dictionary(d) => d.static_type(),
            Value::Composite(c) => c.static_type(),
            Value::Function(f) => f.static_type(),
            Value::Reference(r) => r.static_type(),
            Value::Type(_) => StaticType::MetaType,
        }
    }

    /// Type name for diagnostics.
    pub fn type_name(&self) -> String {
        self.static_type().to_string()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&IntegerValue> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringValue> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeValue> {
        match self {
            Value::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Render for display; composite field names and paths need the interner.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> ValueDisplay<'a> {
        ValueDisplay {
            value: self,
            interner,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<IntegerValue> for Value {
    fn from(i: IntegerValue) -> Self {
        Value::Integer(i)
    }
}

impl From<FixedPointValue> for Value {
    fn from(f: FixedPointValue) -> Self {
        Value::FixedPoint(f)
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

/// Structural equality.
///
/// Containers compare by content, ignoring identity and owner. Functions
/// compare by identity. This is the equality of the `==` operator for the
/// kinds the language considers equatable.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Nil, Value::Nil) => true,
            (Value::Some(a), Value::Some(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::FixedPoint(a), Value::FixedPoint(b)) => a == b,
            (Value::String(a), Value::String(b)) | (Value::Character(a), Value::Character(b)) => {
                a == b
            }
            (Value::Address(a), Value::Address(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.ty == b.ty && a.elements == b.elements
                }
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.ty == b.ty
                        && a.entries.len() == b.entries.len()
                        && a.entries
                            .iter()
                            .all(|(k, (_, v))| b.entries.get(k).is_some_and(|(_, w)| v == w))
                }
            }
            (Value::Composite(a), Value::Composite(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.type_id == b.type_id && a.fields == b.fields
                }
            }
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

/// Display adapter returned by [`Value::display`].
pub struct ValueDisplay<'a> {
    value: &'a Value,
    interner: &'a StringInterner,
}

impl ValueDisplay<'_> {
    fn nested<'b>(&'b self, value: &'b Value) -> ValueDisplay<'b> {
        ValueDisplay {
            value,
            interner: self.interner,
        }
    }
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Void => f.write_str("()"),
            Value::Nil => f.write_str("nil"),
            Value::Some(inner) => write!(f, "{}", self.nested(inner)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::FixedPoint(x) => write!(f, "{x}"),
            Value::String(s) | Value::Character(s) => f.write_str(&quote(s.as_str())),
            Value::Address(a) => write!(f, "{a}"),
            Value::Path(p) => write!(
                f,
                "/{}/{}",
                p.domain,
                self.interner.lookup(p.identifier)
            ),
            Value::Array(a) => {
                f.write_str("[")?;
                for (i, element) in a.borrow().elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.nested(element))?;
                }
                f.write_str("]")
            }
            Value::Dictionary(d) => {
                f.write_str("{")?;
                for (i, (key, value)) in d.borrow().entries.values().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", self.nested(key), self.nested(value))?;
                }
                f.write_str("}")
            }
            Value::Composite(c) => {
                let data = c.borrow();
                write!(f, "{}(", data.type_id.identifier())?;
                for (i, (name, value)) in data.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", self.interner.lookup(*name), self.nested(value))?;
                }
                f.write_str(")")
            }
            Value::Function(func) => write!(f, "Function<{}>", func.static_type()),
            Value::Reference(r) => write!(f, "{}", r.static_type()),
            Value::Type(t) => write!(f, "Type<{t}>()"),
        }
    }
}

/// Convert an integer value into `kind`, for the base conversion functions.
pub fn convert_integer(value: &Value, kind: IntegerKind) -> Option<crate::errors::EvalResult> {
    match value {
        Value::Integer(i) => Some(i.convert(kind).map(Value::Integer)),
        Value::FixedPoint(x) => Some(
            IntegerValue::new(kind, num_bigint::BigInt::from(x.integer_part())).map(Value::Integer),
        ),
        _ => None,
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use cinder_ir::{FixedPointKind, Location, StringInterner};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn array(elements: Vec<Value>, id: u64) -> Value {
        Value::Array(ArrayValue::new(ArrayData {
            header: Header::new(ValueId::new(id), None),
            ty: StaticType::array(StaticType::Integer(IntegerKind::Int)),
            elements,
        }))
    }

    #[test]
    fn test_structural_equality_ignores_identity() {
        assert_eq!(
            array(vec![Value::int(1), Value::int(2)], 1),
            array(vec![Value::int(1), Value::int(2)], 2)
        );
        assert_ne!(array(vec![Value::int(1)], 1), array(vec![Value::int(2)], 1));
        assert_ne!(Value::int(1), Value::Integer(IntegerValue::of(IntegerKind::UInt8, 1).unwrap()));
    }

    #[test]
    fn test_display() {
        let interner = StringInterner::new();
        let a = interner.intern("a");
        let composite = Value::Composite(CompositeValue::new(CompositeData {
            header: Header::new(ValueId::new(3), None),
            type_id: cinder_ir::TypeId::new(&Location::script("test"), "S"),
            kind: cinder_ir::CompositeKind::Structure,
            location: Location::script("test"),
            fields: IndexMap::from([(a, Value::string("x"))]),
            injected: IndexMap::new(),
            raw_value: None,
        }));
        assert_eq!(composite.display(&interner).to_string(), "S(a: \"x\")");
        assert_eq!(
            array(vec![Value::int(1), Value::int(2)], 1)
                .display(&interner)
                .to_string(),
            "[1, 2]"
        );
        let fixed = FixedPointValue::new(FixedPointKind::UFix64, 150_000_000).unwrap();
        assert_eq!(Value::some(fixed.into()).display(&interner).to_string(), "1.50000000");
        assert_eq!(Value::Nil.display(&interner).to_string(), "nil");
    }

    #[test]
    fn test_resource_kind_is_dynamic() {
        assert!(!Value::int(1).is_resource());
        assert!(!Value::Nil.is_resource());
        assert_eq!(
            Value::Nil.static_type(),
            StaticType::optional(StaticType::Never)
        );
    }

    #[test]
    fn test_convert_integer() {
        assert_eq!(
            convert_integer(&Value::int(255), IntegerKind::UInt8)
                .unwrap()
                .unwrap(),
            Value::Integer(IntegerValue::of(IntegerKind::UInt8, 255).unwrap())
        );
        assert!(convert_integer(&Value::int(256), IntegerKind::UInt8)
            .unwrap()
            .is_err());
    }
}
