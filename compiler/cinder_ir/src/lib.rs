//! Cinder IR - typed program representation for the Cinder evaluator.
//!
//! The parser and checker are separate collaborators; this crate is the
//! contract between them and the evaluator:
//! - `Span`, `Name` and the sharded `StringInterner`
//! - `Location`, `LocationRange`, `Address` and `PathDomain`
//! - `StaticType` and friends, used for boxing and dynamic type checks
//! - the `ast` module with declarations, statements and expressions
//! - `AstBuilder` for constructing programs without a front end

pub mod ast;
mod builder;
mod interner;
mod location;
mod name;
mod span;
mod types;

pub use builder::{fixed_point, AstBuilder, CompositeBuilder, FunctionBuilder, InterfaceBuilder};
pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use location::{Address, Location, LocationRange, PathDomain};
pub use name::Name;
pub use span::{Span, SpanError};
pub use types::{
    CompositeKind, FixedPointKind, FunctionType, IntegerKind, NominalType, NumericSupertype,
    StaticType, TypeId,
};
