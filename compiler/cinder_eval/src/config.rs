//! Host hooks and interpreter configuration.
//!
//! Everything the evaluator needs from its embedding host arrives through
//! the traits in this module: event delivery, import resolution, contract
//! construction arguments, injected composite members, UUIDs, metering and
//! invocation tracing. All hooks are optional; a missing hook surfaces as a
//! host error only when a program actually needs it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use cinder_ir::ast::Program;
use cinder_ir::{CompositeKind, Location, LocationRange, TypeId};
use parking_lot::Mutex;

use crate::errors::HostError;
use crate::value::{CompositeValue, Value};

/// An event handed to the host.
#[derive(Clone, Debug)]
pub struct EmittedEvent {
    pub type_id: TypeId,
    /// Field names and values, in declaration order.
    pub fields: Vec<(String, Value)>,
    /// The immutable event composite.
    pub value: CompositeValue,
    pub location: LocationRange,
}

pub trait EventHandler {
    fn on_event(&self, event: &EmittedEvent) -> Result<(), HostError>;
}

/// Event handler that records events in memory.
///
/// Used by tests and hosts that collect events for later inspection.
pub struct BufferEventHandler {
    events: Mutex<Vec<EmittedEvent>>,
}

impl BufferEventHandler {
    pub fn new() -> Self {
        BufferEventHandler {
            events: Mutex::new(Vec::new()),
        }
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events.lock().clone()
    }

    /// Type identifiers of the recorded events, oldest first.
    pub fn type_ids(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.type_id.to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for BufferEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for BufferEventHandler {
    fn on_event(&self, event: &EmittedEvent) -> Result<(), HostError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

pub trait ImportResolver {
    /// The typed program at `location`.
    fn resolve(&self, location: &Location) -> Result<Rc<Program>, HostError>;
}

pub trait ContractValueHandler {
    /// Arguments for a contract's initializer, requested once at first access.
    fn initializer_arguments(
        &self,
        type_id: &TypeId,
        location: &Location,
    ) -> Result<Vec<Value>, HostError>;
}

pub trait InjectedFieldsHandler {
    /// Extra members for a newly constructed composite.
    fn injected_fields(
        &self,
        type_id: &TypeId,
        kind: CompositeKind,
        location: &Location,
    ) -> Vec<(String, Value)>;
}

pub trait UuidGenerator {
    fn next_uuid(&self) -> Result<u64, HostError>;
}

/// Generates sequential UUIDs starting at 1.
#[derive(Default)]
pub struct CounterUuidGenerator {
    last: Cell<u64>,
}

impl CounterUuidGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UuidGenerator for CounterUuidGenerator {
    fn next_uuid(&self) -> Result<u64, HostError> {
        let next = self
            .last
            .get()
            .checked_add(1)
            .ok_or_else(|| HostError::new("UUID space exhausted"))?;
        self.last.set(next);
        Ok(next)
    }
}

/// Kinds of metered work.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ComputationKind {
    Statement,
    Loop,
    FunctionInvocation,
}

impl ComputationKind {
    pub const ALL: [ComputationKind; 3] = [
        ComputationKind::Statement,
        ComputationKind::Loop,
        ComputationKind::FunctionInvocation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComputationKind::Statement => "statement",
            ComputationKind::Loop => "loop",
            ComputationKind::FunctionInvocation => "function invocation",
        }
    }

    fn index(self) -> usize {
        match self {
            ComputationKind::Statement => 0,
            ComputationKind::Loop => 1,
            ComputationKind::FunctionInvocation => 2,
        }
    }
}

impl fmt::Display for ComputationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A meter's refusal to admit more work.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LimitExceeded {
    pub kind: ComputationKind,
    pub limit: u64,
}

pub trait ComputationMeter {
    /// Account for one unit of `kind`.
    fn meter(&self, kind: ComputationKind) -> Result<(), LimitExceeded>;
}

/// Meter with optional per-kind limits.
#[derive(Default)]
pub struct LimitMeter {
    limits: [Option<u64>; 3],
    used: Cell<[u64; 3]>,
}

impl LimitMeter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(mut self, kind: ComputationKind, limit: u64) -> Self {
        self.limits[kind.index()] = Some(limit);
        self
    }

    pub fn used(&self, kind: ComputationKind) -> u64 {
        self.used.get()[kind.index()]
    }

    pub fn reset(&self) {
        self.used.set([0; 3]);
    }
}

impl ComputationMeter for LimitMeter {
    fn meter(&self, kind: ComputationKind) -> Result<(), LimitExceeded> {
        let mut used = self.used.get();
        let slot = &mut used[kind.index()];
        *slot = slot.saturating_add(1);
        let count = *slot;
        self.used.set(used);
        match self.limits[kind.index()] {
            Some(limit) if count > limit => Err(LimitExceeded { kind, limit }),
            _ => Ok(()),
        }
    }
}

pub trait InvocationObserver {
    fn on_invoke(&self, _name: &str, _depth: usize) {}

    fn on_return(&self, _name: &str, _depth: usize, _succeeded: bool) {}
}

/// Relative order of a function's own conditions and the conditions it
/// inherits from interfaces.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ConditionOrdering {
    /// Own pre-conditions, inherited pre-conditions, body, own post-conditions,
    /// inherited post-conditions.
    #[default]
    OwnFirst,
    /// Inherited conditions before own, for both pre- and post-conditions.
    InterfaceFirst,
}

/// Default maximum call depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Interpreter configuration, assembled by `InterpreterBuilder`.
#[derive(Clone)]
pub struct Config {
    pub event_handler: Option<Rc<dyn EventHandler>>,
    pub import_resolver: Option<Rc<dyn ImportResolver>>,
    pub contract_value_handler: Option<Rc<dyn ContractValueHandler>>,
    pub injected_fields_handler: Option<Rc<dyn InjectedFieldsHandler>>,
    pub uuid_generator: Option<Rc<dyn UuidGenerator>>,
    pub meter: Option<Rc<dyn ComputationMeter>>,
    pub invocation_observer: Option<Rc<dyn InvocationObserver>>,
    pub condition_ordering: ConditionOrdering,
    pub max_call_depth: usize,
    /// Convert panics inside `interpret`/`invoke` into fatal errors.
    pub recover_panics: bool,
    /// Run the storage health check after each top-level invocation.
    pub validate_storage: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            event_handler: None,
            import_resolver: None,
            contract_value_handler: None,
            injected_fields_handler: None,
            uuid_generator: None,
            meter: None,
            invocation_observer: None,
            condition_ordering: ConditionOrdering::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            recover_panics: true,
            validate_storage: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("event_handler", &self.event_handler.is_some())
            .field("import_resolver", &self.import_resolver.is_some())
            .field("uuid_generator", &self.uuid_generator.is_some())
            .field("meter", &self.meter.is_some())
            .field("condition_ordering", &self.condition_ordering)
            .field("max_call_depth", &self.max_call_depth)
            .field("recover_panics", &self.recover_panics)
            .field("validate_storage", &self.validate_storage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counter_uuids_are_sequential() {
        let generator = CounterUuidGenerator::new();
        assert_eq!(generator.next_uuid().unwrap(), 1);
        assert_eq!(generator.next_uuid().unwrap(), 2);
    }

    #[test]
    fn test_limit_meter_refuses_past_limit() {
        let meter = LimitMeter::new().with_limit(ComputationKind::Loop, 2);
        assert!(meter.meter(ComputationKind::Loop).is_ok());
        assert!(meter.meter(ComputationKind::Loop).is_ok());
        assert_eq!(
            meter.meter(ComputationKind::Loop),
            Err(LimitExceeded {
                kind: ComputationKind::Loop,
                limit: 2
            })
        );
        for _ in 0..10 {
            assert!(meter.meter(ComputationKind::Statement).is_ok());
        }
        assert_eq!(meter.used(ComputationKind::Statement), 10);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(config.condition_ordering, ConditionOrdering::OwnFirst);
        assert!(config.recover_panics);
        assert!(!config.validate_storage);
    }
}
