//! Cinder Eval - tree-walking evaluator for the Cinder resource-oriented language.
//!
//! This crate executes checked programs (see `cinder_ir`) with linear
//! ownership of resources.
//!
//! # Architecture
//!
//! The evaluator uses:
//! - `Value`: primitives plus shared container handles (`value`)
//! - `ScopeRef`: lexical scopes with lazy, moved and borrowed slots (`environment`)
//! - `Interpreter::transfer`: the copy-or-move protocol every new home goes through
//! - `ReferenceTable`: liveness of ephemeral references by container id
//! - `Storage`: account storage plus the slab index behind ownership checks
//! - `evaluate_binary` / `evaluate_unary`: direct enum-based operator dispatch
//! - `Config`: host hooks for events, imports, contracts, UUIDs and metering
//!
//! # Re-exports
//!
//! Common entry points are re-exported at the crate root:
//! - `Interpreter`, `InterpreterBuilder`
//! - `Value` and the container handles
//! - `EvalError`, `EvalErrorKind`, `EvalResult`, `ErrorCategory`

pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod errors;
pub mod interpreter;
pub mod operators;
pub mod reference_table;
pub mod stack;
pub mod storage;
pub mod subtyping;
pub mod value;

pub use config::{
    BufferEventHandler, ComputationKind, ComputationMeter, ConditionOrdering, Config,
    ContractValueHandler, CounterUuidGenerator, EmittedEvent, EventHandler, ImportResolver,
    InjectedFieldsHandler, InvocationObserver, LimitExceeded, LimitMeter, UuidGenerator,
    DEFAULT_MAX_CALL_DEPTH,
};
pub use environment::{Mutability, Ownership, ScopeRef};
pub use errors::{
    BacktraceFrame, ErrorCategory, EvalBacktrace, EvalError, EvalErrorKind, EvalResult, HostError,
};
pub use interpreter::{Interpreter, InterpreterBuilder, SharedStorage};
pub use operators::{evaluate_binary, evaluate_unary};
pub use stack::ensure_sufficient_stack;
pub use storage::{InMemoryStorage, Storage, StorageHealthError, StorageKey};
pub use value::{
    ArrayValue, CompositeValue, DictionaryValue, FixedPointValue, FunctionValue, IntegerValue,
    PathValue, ReferenceValue, StringValue, Value,
};

#[cfg(test)]
mod tests;
