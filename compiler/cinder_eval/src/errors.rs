//! Error types for evaluation.
//!
//! # Structured Error Categories
//!
//! `EvalErrorKind` carries the structured data of each failure (indices,
//! sizes, names, rendered messages) so hosts and tests can match on exact
//! error identity. Factory functions below are the public way to build them.
//! Every kind maps onto an `ErrorCategory`.

use std::fmt;

use cinder_ir::ast::ConditionKind;
use cinder_ir::{Address, LocationRange};

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Broad classification of runtime failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Array or string index or slice out of range.
    Bounds,
    /// Force-unwrap of `nil`, dereference of an invalid or absent reference.
    NilSafety,
    /// Use after move, double destroy, force-assign into non-nil, resource loss.
    Ownership,
    /// Failed pre- or post-condition.
    Condition,
    /// Missing member, type mismatch, undefined name.
    Member,
    /// Overflow, underflow, division by zero, negative shift.
    Arithmetic,
    /// Failure reported by a host hook.
    Host,
    /// Stack depth, computation limit, internal invariant violation.
    Fatal,
}

/// Typed error kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    // Bounds
    #[error("array index out of bounds: {index}, but size is {size}")]
    ArrayIndexOutOfBounds { index: i128, size: usize },
    #[error("slice indices [{from}:{up_to}] are out of bounds for array of size {size}")]
    ArraySliceIndices { from: i128, up_to: i128, size: usize },
    #[error("invalid slice index: {from} > {up_to}")]
    InvalidSliceIndex { from: i128, up_to: i128 },
    #[error("string index out of bounds: {index}, but length is {length}")]
    StringIndexOutOfBounds { index: i128, length: usize },
    #[error("slice indices [{from}:{up_to}] are out of bounds for string of length {length}")]
    StringSliceIndices {
        from: i128,
        up_to: i128,
        length: usize,
    },

    // Nil safety
    #[error("unexpectedly found nil while forcing an optional value")]
    ForceNil,
    #[error("referenced value has been moved or destroyed after taking the reference")]
    InvalidatedResourceReference,
    #[error("dereference failed: {reason}")]
    DereferenceFailed { reason: String },
    #[error("cannot create a non-optional reference to nil")]
    NonOptionalReferenceToNil,
    #[error("cannot create a reference to a reference")]
    NestedReference,

    // Ownership
    #[error("resource `{name}` has been moved and is no longer valid")]
    InvalidatedResource { name: String },
    #[error("resource `{type_id}` has already been destroyed")]
    DestroyedResource { type_id: String },
    #[error("cannot copy resource of type `{type_name}`")]
    ResourceCopy { type_name: String },
    #[error("force-assignment into a non-nil destination")]
    ForceAssignmentToNonNil,
    #[error("loss of resource: `{name}` was neither moved nor destroyed")]
    ResourceLoss { name: String },
    #[error("failed to save value: path {path} in account {address} already stores a value")]
    Overwrite { address: Address, path: String },
    #[error("value of type `{type_name}` cannot be transferred")]
    NonTransferableValue { type_name: String },
    #[error("value of type `{type_name}` would be transferred into itself")]
    RecursiveTransfer { type_name: String },
    #[error("cannot create resource `{type_id}` outside of its declaring location {location}")]
    ResourceConstruction { type_id: String, location: String },
    #[error("duplicate key in resource dictionary")]
    DuplicateKeyInResourceDictionary,

    // Conditions
    #[error("{}", render_condition(*kind, message))]
    Condition {
        kind: ConditionKind,
        message: String,
    },

    // Members and typing
    #[error("value of type `{type_name}` has no member `{name}`")]
    MissingMember { name: String, type_name: String },
    #[error("type mismatch: expected `{expected}`, got `{actual}`")]
    TypeMismatch { expected: String, actual: String },
    #[error("unexpectedly found non-`{expected}` while force-casting value of type `{actual}`")]
    ForceCastTypeMismatch { expected: String, actual: String },
    #[error("cannot find variable `{name}` in this scope")]
    UndefinedVariable { name: String },
    #[error("cannot use `{name}` before it is initialized")]
    UseBeforeInitialization { name: String },
    #[error("cannot redeclare `{name}`: it is already declared in this scope")]
    Redeclaration { name: String },
    #[error("cannot assign to constant `{name}`")]
    ConstantAssignment { name: String },
    #[error("value of type `{type_name}` is not invokable")]
    NotInvokable { type_name: String },
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("operator `{op}` cannot be applied to `{left}` and `{right}`")]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
    },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    // Arithmetic
    #[error("{type_name} overflow")]
    Overflow { type_name: String },
    #[error("{type_name} underflow")]
    Underflow { type_name: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("negative shift amount")]
    NegativeShift,

    // Host
    #[error("cannot emit event: no event handler is configured")]
    EventEmissionUnavailable,
    #[error("cannot create resource: no UUID generator is configured")]
    UuidUnavailable,
    #[error("cannot import {location}: no import resolver is configured")]
    ImportUnavailable { location: String },
    #[error("import of {location} failed: {message}")]
    ImportFailed { location: String, message: String },
    #[error("host error: {message}")]
    Host { message: String },
    #[error("storage is unhealthy: {message}")]
    StorageHealth { message: String },

    // Fatal
    #[error("call stack limit of {limit} frames exceeded")]
    CallStackLimitExceeded { limit: usize },
    #[error("computation limit exceeded: {kind} (limit {limit})")]
    ComputationLimitExceeded { kind: String, limit: u64 },
    #[error("internal error: {message}")]
    Internal { message: String },
}

fn render_condition(kind: ConditionKind, message: &str) -> String {
    if message.is_empty() {
        format!("{} failed", kind.name())
    } else {
        format!("{} failed: {message}", kind.name())
    }
}

impl EvalErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ArrayIndexOutOfBounds { .. }
            | Self::ArraySliceIndices { .. }
            | Self::InvalidSliceIndex { .. }
            | Self::StringIndexOutOfBounds { .. }
            | Self::StringSliceIndices { .. } => ErrorCategory::Bounds,

            Self::ForceNil
            | Self::InvalidatedResourceReference
            | Self::DereferenceFailed { .. }
            | Self::NonOptionalReferenceToNil
            | Self::NestedReference => ErrorCategory::NilSafety,

            Self::InvalidatedResource { .. }
            | Self::DestroyedResource { .. }
            | Self::ResourceCopy { .. }
            | Self::ForceAssignmentToNonNil
            | Self::ResourceLoss { .. }
            | Self::Overwrite { .. }
            | Self::NonTransferableValue { .. }
            | Self::RecursiveTransfer { .. }
            | Self::ResourceConstruction { .. }
            | Self::DuplicateKeyInResourceDictionary => ErrorCategory::Ownership,

            Self::Condition { .. } => ErrorCategory::Condition,

            Self::MissingMember { .. }
            | Self::TypeMismatch { .. }
            | Self::ForceCastTypeMismatch { .. }
            | Self::UndefinedVariable { .. }
            | Self::UseBeforeInitialization { .. }
            | Self::Redeclaration { .. }
            | Self::ConstantAssignment { .. }
            | Self::NotInvokable { .. }
            | Self::ArgumentCount { .. }
            | Self::InvalidOperands { .. }
            | Self::InvalidAssignmentTarget => ErrorCategory::Member,

            Self::Overflow { .. }
            | Self::Underflow { .. }
            | Self::DivisionByZero
            | Self::NegativeShift => ErrorCategory::Arithmetic,

            Self::EventEmissionUnavailable
            | Self::UuidUnavailable
            | Self::ImportUnavailable { .. }
            | Self::ImportFailed { .. }
            | Self::Host { .. }
            | Self::StorageHealth { .. } => ErrorCategory::Host,

            Self::CallStackLimitExceeded { .. }
            | Self::ComputationLimitExceeded { .. }
            | Self::Internal { .. } => ErrorCategory::Fatal,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Function or method name.
    pub name: String,
    /// Where the call was made.
    pub call_site: Option<LocationRange>,
}

/// Snapshot of the call stack at an error site, most recent call first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: {}", frame.name)?;
            if let Some(site) = &frame.call_site {
                write!(f, " at {site}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Evaluation error.
///
/// Two errors are equal when their kinds and location ranges are equal;
/// backtraces and notes are presentation details.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Where the error occurred.
    pub location: Option<LocationRange>,
    /// Call stack at the error site, captured when the error leaves a function.
    pub backtrace: Option<EvalBacktrace>,
    /// Additional context.
    pub notes: Vec<String>,
}

impl EvalError {
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        Self {
            kind,
            location: None,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    /// Attach a location, replacing any existing one.
    #[must_use]
    pub fn with_location(mut self, location: LocationRange) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach a location unless the error already has a more precise one.
    #[must_use]
    pub fn or_location(mut self, location: impl FnOnce() -> LocationRange) -> Self {
        if self.location.is_none() {
            self.location = Some(location());
        }
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    #[inline]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl PartialEq for EvalError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.location == other.location
    }
}

impl Eq for EvalError {}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        EvalError::from_kind(kind)
    }
}

/// Failure reported by a host hook.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError {
            message: message.into(),
        }
    }
}

impl From<HostError> for EvalError {
    fn from(error: HostError) -> Self {
        host_error(error.message)
    }
}

// Bounds

#[cold]
pub fn array_index_out_of_bounds(index: i128, size: usize) -> EvalError {
    EvalErrorKind::ArrayIndexOutOfBounds { index, size }.into()
}

#[cold]
pub fn array_slice_indices(from: i128, up_to: i128, size: usize) -> EvalError {
    EvalErrorKind::ArraySliceIndices { from, up_to, size }.into()
}

#[cold]
pub fn invalid_slice_index(from: i128, up_to: i128) -> EvalError {
    EvalErrorKind::InvalidSliceIndex { from, up_to }.into()
}

#[cold]
pub fn string_index_out_of_bounds(index: i128, length: usize) -> EvalError {
    EvalErrorKind::StringIndexOutOfBounds { index, length }.into()
}

#[cold]
pub fn string_slice_indices(from: i128, up_to: i128, length: usize) -> EvalError {
    EvalErrorKind::StringSliceIndices {
        from,
        up_to,
        length,
    }
    .into()
}

// Nil safety

#[cold]
pub fn force_nil() -> EvalError {
    EvalErrorKind::ForceNil.into()
}

#[cold]
pub fn invalidated_reference() -> EvalError {
    EvalErrorKind::InvalidatedResourceReference.into()
}

#[cold]
pub fn dereference_failed(reason: impl Into<String>) -> EvalError {
    EvalErrorKind::DereferenceFailed {
        reason: reason.into(),
    }
    .into()
}

#[cold]
pub fn non_optional_reference_to_nil() -> EvalError {
    EvalErrorKind::NonOptionalReferenceToNil.into()
}

#[cold]
pub fn nested_reference() -> EvalError {
    EvalErrorKind::NestedReference.into()
}

// Ownership

#[cold]
pub fn invalidated_resource(name: impl Into<String>) -> EvalError {
    EvalErrorKind::InvalidatedResource { name: name.into() }.into()
}

#[cold]
pub fn destroyed_resource(type_id: impl Into<String>) -> EvalError {
    EvalErrorKind::DestroyedResource {
        type_id: type_id.into(),
    }
    .into()
}

#[cold]
pub fn resource_copy(type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::ResourceCopy {
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn force_assignment_to_non_nil() -> EvalError {
    EvalErrorKind::ForceAssignmentToNonNil.into()
}

#[cold]
pub fn resource_loss(name: impl Into<String>) -> EvalError {
    EvalErrorKind::ResourceLoss { name: name.into() }.into()
}

#[cold]
pub fn overwrite(address: Address, path: impl Into<String>) -> EvalError {
    EvalErrorKind::Overwrite {
        address,
        path: path.into(),
    }
    .into()
}

#[cold]
pub fn non_transferable_value(type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::NonTransferableValue {
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn recursive_transfer(type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::RecursiveTransfer {
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn resource_construction(type_id: impl Into<String>, location: impl Into<String>) -> EvalError {
    EvalErrorKind::ResourceConstruction {
        type_id: type_id.into(),
        location: location.into(),
    }
    .into()
}

#[cold]
pub fn duplicate_key_in_resource_dictionary() -> EvalError {
    EvalErrorKind::DuplicateKeyInResourceDictionary.into()
}

// Conditions

#[cold]
pub fn condition_failed(kind: ConditionKind, message: impl Into<String>) -> EvalError {
    EvalErrorKind::Condition {
        kind,
        message: message.into(),
    }
    .into()
}

// Members and typing

#[cold]
pub fn missing_member(name: impl Into<String>, type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::MissingMember {
        name: name.into(),
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> EvalError {
    EvalErrorKind::TypeMismatch {
        expected: expected.into(),
        actual: actual.into(),
    }
    .into()
}

#[cold]
pub fn force_cast_type_mismatch(
    expected: impl Into<String>,
    actual: impl Into<String>,
) -> EvalError {
    EvalErrorKind::ForceCastTypeMismatch {
        expected: expected.into(),
        actual: actual.into(),
    }
    .into()
}

#[cold]
pub fn undefined_variable(name: impl Into<String>) -> EvalError {
    EvalErrorKind::UndefinedVariable { name: name.into() }.into()
}

#[cold]
pub fn use_before_initialization(name: impl Into<String>) -> EvalError {
    EvalErrorKind::UseBeforeInitialization { name: name.into() }.into()
}

#[cold]
pub fn redeclaration(name: impl Into<String>) -> EvalError {
    EvalErrorKind::Redeclaration { name: name.into() }.into()
}

#[cold]
pub fn constant_assignment(name: impl Into<String>) -> EvalError {
    EvalErrorKind::ConstantAssignment { name: name.into() }.into()
}

#[cold]
pub fn not_invokable(type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::NotInvokable {
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn argument_count(expected: usize, got: usize) -> EvalError {
    EvalErrorKind::ArgumentCount { expected, got }.into()
}

#[cold]
pub fn invalid_operands(op: &str, left: impl Into<String>, right: impl Into<String>) -> EvalError {
    EvalErrorKind::InvalidOperands {
        op: op.to_owned(),
        left: left.into(),
        right: right.into(),
    }
    .into()
}

#[cold]
pub fn invalid_assignment_target() -> EvalError {
    EvalErrorKind::InvalidAssignmentTarget.into()
}

// Arithmetic

#[cold]
pub fn overflow(type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::Overflow {
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn underflow(type_name: impl Into<String>) -> EvalError {
    EvalErrorKind::Underflow {
        type_name: type_name.into(),
    }
    .into()
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalErrorKind::DivisionByZero.into()
}

#[cold]
pub fn negative_shift() -> EvalError {
    EvalErrorKind::NegativeShift.into()
}

// Host

#[cold]
pub fn event_emission_unavailable() -> EvalError {
    EvalErrorKind::EventEmissionUnavailable.into()
}

#[cold]
pub fn uuid_unavailable() -> EvalError {
    EvalErrorKind::UuidUnavailable.into()
}

#[cold]
pub fn import_unavailable(location: impl Into<String>) -> EvalError {
    EvalErrorKind::ImportUnavailable {
        location: location.into(),
    }
    .into()
}

#[cold]
pub fn import_failed(location: impl Into<String>, message: impl Into<String>) -> EvalError {
    EvalErrorKind::ImportFailed {
        location: location.into(),
        message: message.into(),
    }
    .into()
}

#[cold]
pub fn host_error(message: impl Into<String>) -> EvalError {
    EvalErrorKind::Host {
        message: message.into(),
    }
    .into()
}

#[cold]
pub fn storage_health(message: impl Into<String>) -> EvalError {
    EvalErrorKind::StorageHealth {
        message: message.into(),
    }
    .into()
}

// Fatal

#[cold]
pub fn call_stack_limit_exceeded(limit: usize) -> EvalError {
    EvalErrorKind::CallStackLimitExceeded { limit }.into()
}

#[cold]
pub fn computation_limit_exceeded(kind: impl Into<String>, limit: u64) -> EvalError {
    EvalErrorKind::ComputationLimitExceeded {
        kind: kind.into(),
        limit,
    }
    .into()
}

#[cold]
pub fn internal_error(message: impl Into<String>) -> EvalError {
    EvalErrorKind::Internal {
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_ir::{Location, Span};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_condition_message_rendering() {
        assert_eq!(
            condition_failed(ConditionKind::Pre, "x must be positive").to_string(),
            "pre-condition failed: x must be positive"
        );
        assert_eq!(
            condition_failed(ConditionKind::Post, "").to_string(),
            "post-condition failed"
        );
    }

    #[test]
    fn test_equality_ignores_backtrace_and_notes() {
        let location = LocationRange::new(Location::script("test"), Span::new(3, 7));
        let a = array_index_out_of_bounds(2, 2).with_location(location.clone());
        let b = array_index_out_of_bounds(2, 2)
            .with_location(location)
            .with_note("while indexing `xs`")
            .with_backtrace(EvalBacktrace::new(vec![BacktraceFrame {
                name: "main".into(),
                call_site: None,
            }]));
        assert_eq!(a, b);
        assert_ne!(a, array_index_out_of_bounds(-1, 2));
    }

    #[test]
    fn test_or_location_keeps_innermost() {
        let inner = LocationRange::new(Location::script("test"), Span::new(1, 2));
        let outer = LocationRange::new(Location::script("test"), Span::new(0, 9));
        let err = force_nil()
            .or_location(|| inner.clone())
            .or_location(|| outer);
        assert_eq!(err.location, Some(inner));
    }

    #[test]
    fn test_categories() {
        assert_eq!(array_slice_indices(0, 10, 6).category(), ErrorCategory::Bounds);
        assert_eq!(invalidated_reference().category(), ErrorCategory::NilSafety);
        assert_eq!(resource_loss("r").category(), ErrorCategory::Ownership);
        assert_eq!(missing_member("x", "S").category(), ErrorCategory::Member);
        assert_eq!(overflow("Int8").category(), ErrorCategory::Arithmetic);
        assert_eq!(event_emission_unavailable().category(), ErrorCategory::Host);
        assert!(call_stack_limit_exceeded(8).is_fatal());
        assert!(!division_by_zero().is_fatal());
    }
}
