//! Program locations, account addresses and storage path domains.
//!
//! A `Location` identifies the program a declaration came from. Nominal type
//! identity is qualified by location, so two programs may both declare a
//! `Vault` without the types being confused at runtime.

use std::fmt;
use std::sync::Arc;

use crate::Span;

/// An 8-byte account address.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct Address(pub u64);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address(0);

    /// Create an address from its integer form.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Big-endian byte representation.
    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Hex form without the `0x` prefix, as used inside type identifiers.
    pub fn short_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// The domain part of a storage path (`/storage/x`, `/public/x`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathDomain {
    Storage,
    Public,
}

impl PathDomain {
    /// Parse a domain identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "storage" => Some(PathDomain::Storage),
            "public" => Some(PathDomain::Public),
            _ => None,
        }
    }

    pub fn identifier(self) -> &'static str {
        match self {
            PathDomain::Storage => "storage",
            PathDomain::Public => "public",
        }
    }
}

impl fmt::Display for PathDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Where a program came from.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Location {
    /// A transient script submitted by the host.
    Script(Arc<str>),
    /// A program deployed under an account.
    Address { address: Address, name: Arc<str> },
    /// A named program without an account, e.g. a host-provided library.
    Identifier(Arc<str>),
}

impl Location {
    pub fn script(name: &str) -> Self {
        Location::Script(Arc::from(name))
    }

    pub fn address(address: Address, name: &str) -> Self {
        Location::Address {
            address,
            name: Arc::from(name),
        }
    }

    pub fn identifier(name: &str) -> Self {
        Location::Identifier(Arc::from(name))
    }

    /// The account this program is deployed under, if any.
    pub fn owning_address(&self) -> Option<Address> {
        match self {
            Location::Address { address, .. } => Some(*address),
            Location::Script(_) | Location::Identifier(_) => None,
        }
    }

    /// Qualify a nominal type name with this location.
    pub fn type_id(&self, qualified_identifier: &str) -> String {
        format!("{self}.{qualified_identifier}")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Script(name) => write!(f, "s.{name}"),
            Location::Address { address, .. } => write!(f, "A.{}", address.short_hex()),
            Location::Identifier(name) => write!(f, "I.{name}"),
        }
    }
}

/// A source position inside a particular program.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct LocationRange {
    pub location: Location,
    pub span: Span,
}

impl LocationRange {
    pub fn new(location: Location, span: Span) -> Self {
        LocationRange { location, span }
    }
}

impl fmt::Display for LocationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.location, self.span)
    }
}
