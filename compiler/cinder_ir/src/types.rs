//! Static types as elaborated by the checker.
//!
//! The evaluator never infers types. It consumes these to tag containers with
//! their element types, to decide copy versus move, and to perform the
//! dynamic checks behind casts, dereferences and storage reads.

use std::fmt;
use std::sync::Arc;

use crate::Location;

/// Fixed- and arbitrary-width integer kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IntegerKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Word8,
    Word16,
    Word32,
    Word64,
}

impl IntegerKind {
    pub const ALL: [IntegerKind; 18] = [
        IntegerKind::Int,
        IntegerKind::Int8,
        IntegerKind::Int16,
        IntegerKind::Int32,
        IntegerKind::Int64,
        IntegerKind::Int128,
        IntegerKind::Int256,
        IntegerKind::UInt,
        IntegerKind::UInt8,
        IntegerKind::UInt16,
        IntegerKind::UInt32,
        IntegerKind::UInt64,
        IntegerKind::UInt128,
        IntegerKind::UInt256,
        IntegerKind::Word8,
        IntegerKind::Word16,
        IntegerKind::Word32,
        IntegerKind::Word64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntegerKind::Int => "Int",
            IntegerKind::Int8 => "Int8",
            IntegerKind::Int16 => "Int16",
            IntegerKind::Int32 => "Int32",
            IntegerKind::Int64 => "Int64",
            IntegerKind::Int128 => "Int128",
            IntegerKind::Int256 => "Int256",
            IntegerKind::UInt => "UInt",
            IntegerKind::UInt8 => "UInt8",
            IntegerKind::UInt16 => "UInt16",
            IntegerKind::UInt32 => "UInt32",
            IntegerKind::UInt64 => "UInt64",
            IntegerKind::UInt128 => "UInt128",
            IntegerKind::UInt256 => "UInt256",
            IntegerKind::Word8 => "Word8",
            IntegerKind::Word16 => "Word16",
            IntegerKind::Word32 => "Word32",
            IntegerKind::Word64 => "Word64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Width in bits, or `None` for the arbitrary-precision kinds.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            IntegerKind::Int | IntegerKind::UInt => None,
            IntegerKind::Int8 | IntegerKind::UInt8 | IntegerKind::Word8 => Some(8),
            IntegerKind::Int16 | IntegerKind::UInt16 | IntegerKind::Word16 => Some(16),
            IntegerKind::Int32 | IntegerKind::UInt32 | IntegerKind::Word32 => Some(32),
            IntegerKind::Int64 | IntegerKind::UInt64 | IntegerKind::Word64 => Some(64),
            IntegerKind::Int128 | IntegerKind::UInt128 => Some(128),
            IntegerKind::Int256 | IntegerKind::UInt256 => Some(256),
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntegerKind::Int
                | IntegerKind::Int8
                | IntegerKind::Int16
                | IntegerKind::Int32
                | IntegerKind::Int64
                | IntegerKind::Int128
                | IntegerKind::Int256
        )
    }

    /// `Word` kinds wrap around instead of reporting overflow.
    pub fn is_wrapping(self) -> bool {
        matches!(
            self,
            IntegerKind::Word8 | IntegerKind::Word16 | IntegerKind::Word32 | IntegerKind::Word64
        )
    }
}

/// Fixed-point kinds. Both carry 8 decimal places.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FixedPointKind {
    Fix64,
    UFix64,
}

impl FixedPointKind {
    /// Number of decimal places.
    pub const SCALE: u32 = 8;

    pub fn name(self) -> &'static str {
        match self {
            FixedPointKind::Fix64 => "Fix64",
            FixedPointKind::UFix64 => "UFix64",
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, FixedPointKind::Fix64)
    }
}

/// Abstract numeric supertypes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NumericSupertype {
    Number,
    SignedNumber,
    Integer,
    SignedInteger,
    FixedPoint,
    SignedFixedPoint,
}

impl NumericSupertype {
    pub fn name(self) -> &'static str {
        match self {
            NumericSupertype::Number => "Number",
            NumericSupertype::SignedNumber => "SignedNumber",
            NumericSupertype::Integer => "Integer",
            NumericSupertype::SignedInteger => "SignedInteger",
            NumericSupertype::FixedPoint => "FixedPoint",
            NumericSupertype::SignedFixedPoint => "SignedFixedPoint",
        }
    }
}

/// The kind of a composite declaration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompositeKind {
    Structure,
    Resource,
    Contract,
    Event,
    Enum,
}

impl CompositeKind {
    #[inline]
    pub fn is_resource(self) -> bool {
        matches!(self, CompositeKind::Resource)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            CompositeKind::Structure => "struct",
            CompositeKind::Resource => "resource",
            CompositeKind::Contract => "contract",
            CompositeKind::Event => "event",
            CompositeKind::Enum => "enum",
        }
    }
}

/// Location-qualified nominal type identifier, e.g. `s.tx.Vault`.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TypeId(Arc<str>);

impl TypeId {
    pub fn new(location: &Location, qualified_identifier: &str) -> Self {
        TypeId(Arc::from(location.type_id(qualified_identifier)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The unqualified identifier: everything after the location prefix.
    pub fn identifier(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// A composite or interface type, identified nominally.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NominalType {
    pub type_id: TypeId,
    pub kind: CompositeKind,
}

impl NominalType {
    pub fn new(type_id: TypeId, kind: CompositeKind) -> Self {
        NominalType { type_id, kind }
    }
}

/// Signature of a function type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FunctionType {
    pub parameters: Vec<StaticType>,
    pub return_type: StaticType,
}

/// A static type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum StaticType {
    Void,
    Never,
    Bool,
    String,
    Character,
    Address,
    Path,
    StoragePath,
    PublicPath,
    Integer(IntegerKind),
    FixedPoint(FixedPointKind),
    Numeric(NumericSupertype),
    Any,
    AnyStruct,
    AnyResource,
    Optional(Box<StaticType>),
    VariableArray(Box<StaticType>),
    ConstantArray(Box<StaticType>, usize),
    Dictionary(Box<StaticType>, Box<StaticType>),
    Composite(NominalType),
    Interface(NominalType),
    Intersection(Vec<NominalType>),
    Reference {
        authorized: bool,
        referenced: Box<StaticType>,
    },
    Function(Box<FunctionType>),
    MetaType,
}

impl StaticType {
    /// `Int`, the default integer type.
    pub fn int() -> Self {
        StaticType::Integer(IntegerKind::Int)
    }

    pub fn optional(inner: StaticType) -> Self {
        StaticType::Optional(Box::new(inner))
    }

    pub fn array(element: StaticType) -> Self {
        StaticType::VariableArray(Box::new(element))
    }

    pub fn dictionary(key: StaticType, value: StaticType) -> Self {
        StaticType::Dictionary(Box::new(key), Box::new(value))
    }

    pub fn reference(authorized: bool, referenced: StaticType) -> Self {
        StaticType::Reference {
            authorized,
            referenced: Box::new(referenced),
        }
    }

    pub fn function(parameters: Vec<StaticType>, return_type: StaticType) -> Self {
        StaticType::Function(Box::new(FunctionType {
            parameters,
            return_type,
        }))
    }

    /// Whether values of this type are under linear ownership.
    pub fn is_resource(&self) -> bool {
        match self {
            StaticType::AnyResource => true,
            StaticType::Composite(nominal) | StaticType::Interface(nominal) => {
                nominal.kind.is_resource()
            }
            StaticType::Intersection(types) => types.iter().any(|t| t.kind.is_resource()),
            StaticType::Optional(inner)
            | StaticType::VariableArray(inner)
            | StaticType::ConstantArray(inner, _) => inner.is_resource(),
            StaticType::Dictionary(_, value) => value.is_resource(),
            StaticType::Void
            | StaticType::Never
            | StaticType::Bool
            | StaticType::String
            | StaticType::Character
            | StaticType::Address
            | StaticType::Path
            | StaticType::StoragePath
            | StaticType::PublicPath
            | StaticType::Integer(_)
            | StaticType::FixedPoint(_)
            | StaticType::Numeric(_)
            | StaticType::Any
            | StaticType::AnyStruct
            | StaticType::Reference { .. }
            | StaticType::Function(_)
            | StaticType::MetaType => false,
        }
    }

    /// Strip any number of optional layers.
    pub fn unwrap_optional(&self) -> &StaticType {
        match self {
            StaticType::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    /// Element type of an array type.
    pub fn element_type(&self) -> Option<&StaticType> {
        match self {
            StaticType::VariableArray(element) | StaticType::ConstantArray(element, _) => {
                Some(element)
            }
            _ => None,
        }
    }

    /// Whether values of this type may be dictionary keys.
    pub fn is_hashable(&self) -> bool {
        match self {
            StaticType::Bool
            | StaticType::String
            | StaticType::Character
            | StaticType::Address
            | StaticType::Path
            | StaticType::StoragePath
            | StaticType::PublicPath
            | StaticType::Integer(_)
            | StaticType::FixedPoint(_)
            | StaticType::Numeric(_)
            | StaticType::MetaType => true,
            StaticType::Composite(nominal) => nominal.kind == CompositeKind::Enum,
            _ => false,
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Void => f.write_str("Void"),
            StaticType::Never => f.write_str("Never"),
            StaticType::Bool => f.write_str("Bool"),
            StaticType::String => f.write_str("String"),
            StaticType::Character => f.write_str("Character"),
            StaticType::Address => f.write_str("Address"),
            StaticType::Path => f.write_str("Path"),
            StaticType::StoragePath => f.write_str("StoragePath"),
            StaticType::PublicPath => f.write_str("PublicPath"),
            StaticType::Integer(kind) => f.write_str(kind.name()),
            StaticType::FixedPoint(kind) => f.write_str(kind.name()),
            StaticType::Numeric(kind) => f.write_str(kind.name()),
            StaticType::Any => f.write_str("Any"),
            StaticType::AnyStruct => f.write_str("AnyStruct"),
            StaticType::AnyResource => f.write_str("AnyResource"),
            StaticType::Optional(inner) => write!(f, "{inner}?"),
            StaticType::VariableArray(element) => write!(f, "[{element}]"),
            StaticType::ConstantArray(element, size) => write!(f, "[{element}; {size}]"),
            StaticType::Dictionary(key, value) => write!(f, "{{{key}: {value}}}"),
            StaticType::Composite(nominal) | StaticType::Interface(nominal) => {
                write!(f, "{}", nominal.type_id)
            }
            StaticType::Intersection(types) => {
                f.write_str("{")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", t.type_id)?;
                }
                f.write_str("}")
            }
            StaticType::Reference {
                authorized,
                referenced,
            } => {
                if *authorized {
                    write!(f, "auth &{referenced}")
                } else {
                    write!(f, "&{referenced}")
                }
            }
            StaticType::Function(function) => {
                f.write_str("fun(")?;
                for (i, p) in function.parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "): {}", function.return_type)
            }
            StaticType::MetaType => f.write_str("Type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str) -> StaticType {
        StaticType::Composite(NominalType::new(
            TypeId::new(&Location::script("test"), name),
            CompositeKind::Resource,
        ))
    }

    #[test]
    fn test_resource_kind_propagates_through_containers() {
        let r = resource("R");
        assert!(r.is_resource());
        assert!(StaticType::optional(r.clone()).is_resource());
        assert!(StaticType::array(r.clone()).is_resource());
        assert!(StaticType::dictionary(StaticType::String, r.clone()).is_resource());
        assert!(!StaticType::reference(false, r).is_resource());
        assert!(!StaticType::array(StaticType::Integer(IntegerKind::Int)).is_resource());
    }

    #[test]
    fn test_display() {
        let ty = StaticType::dictionary(
            StaticType::String,
            StaticType::optional(StaticType::array(StaticType::Integer(IntegerKind::UInt8))),
        );
        assert_eq!(ty.to_string(), "{String: [UInt8]?}");
        assert_eq!(
            StaticType::reference(true, resource("R")).to_string(),
            "auth &s.test.R"
        );
    }

    #[test]
    fn test_integer_kind_metadata() {
        assert_eq!(IntegerKind::from_name("Word16"), Some(IntegerKind::Word16));
        assert_eq!(IntegerKind::Int.bit_width(), None);
        assert_eq!(IntegerKind::UInt128.bit_width(), Some(128));
        assert!(IntegerKind::Word64.is_wrapping());
        assert!(!IntegerKind::UInt64.is_signed());
    }

    #[test]
    fn test_type_id_identifier() {
        let id = TypeId::new(&Location::script("tx"), "Vault");
        assert_eq!(id.identifier(), "Vault");
        assert_eq!(id.as_str(), "s.tx.Vault");
    }
}
