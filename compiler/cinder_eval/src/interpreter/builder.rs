//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use std::cell::RefCell;
use std::rc::Rc;

use cinder_ir::ast::Program;
use cinder_ir::SharedInterner;
use rustc_hash::FxHashMap;

use super::imports::declared_names;
use super::{Interpreter, LoadedProgram, SharedState, SharedStorage, TypeRegistry};
use crate::config::{
    ComputationMeter, ConditionOrdering, Config, ContractValueHandler, EventHandler,
    ImportResolver, InjectedFieldsHandler, InvocationObserver, UuidGenerator,
};
use crate::diagnostics::CallStack;
use crate::reference_table::ReferenceTable;
use crate::storage::InMemoryStorage;

/// Builder for creating Interpreter instances.
///
/// Every hook is optional. Without an explicit storage the interpreter uses
/// a fresh [`InMemoryStorage`].
pub struct InterpreterBuilder {
    interner: SharedInterner,
    program: Rc<Program>,
    storage: Option<SharedStorage>,
    config: Config,
}

impl InterpreterBuilder {
    pub fn new(interner: SharedInterner, program: impl Into<Rc<Program>>) -> Self {
        Self {
            interner,
            program: program.into(),
            storage: None,
            config: Config::default(),
        }
    }

    /// Set the storage the interpreter reads and writes.
    #[must_use]
    pub fn storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn event_handler(mut self, handler: Rc<dyn EventHandler>) -> Self {
        self.config.event_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn import_resolver(mut self, resolver: Rc<dyn ImportResolver>) -> Self {
        self.config.import_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn contract_value_handler(mut self, handler: Rc<dyn ContractValueHandler>) -> Self {
        self.config.contract_value_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn injected_fields_handler(mut self, handler: Rc<dyn InjectedFieldsHandler>) -> Self {
        self.config.injected_fields_handler = Some(handler);
        self
    }

    /// Set the UUID generator.
    ///
    /// Required for programs that create resources.
    #[must_use]
    pub fn uuid_generator(mut self, generator: Rc<dyn UuidGenerator>) -> Self {
        self.config.uuid_generator = Some(generator);
        self
    }

    #[must_use]
    pub fn meter(mut self, meter: Rc<dyn ComputationMeter>) -> Self {
        self.config.meter = Some(meter);
        self
    }

    #[must_use]
    pub fn invocation_observer(mut self, observer: Rc<dyn InvocationObserver>) -> Self {
        self.config.invocation_observer = Some(observer);
        self
    }

    #[must_use]
    pub fn condition_ordering(mut self, ordering: ConditionOrdering) -> Self {
        self.config.condition_ordering = ordering;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    /// Convert panics during evaluation into fatal errors (default `true`).
    #[must_use]
    pub fn recover_panics(mut self, recover: bool) -> Self {
        self.config.recover_panics = recover;
        self
    }

    /// Check storage health after each top-level invocation (default `false`).
    #[must_use]
    pub fn validate_storage(mut self, validate: bool) -> Self {
        self.config.validate_storage = validate;
        self
    }

    /// Build the interpreter.
    pub fn build(self) -> Interpreter {
        let storage = self
            .storage
            .unwrap_or_else(|| Rc::new(RefCell::new(InMemoryStorage::new())));
        let call_stack = CallStack::new(self.config.max_call_depth);
        let shared = Rc::new(SharedState {
            config: self.config,
            storage,
            references: RefCell::new(ReferenceTable::new()),
            types: RefCell::new(TypeRegistry::new()),
            call_stack: RefCell::new(call_stack),
            programs: RefCell::new(FxHashMap::default()),
        });
        let names = declared_names(&self.program);
        let interpreter = Interpreter::with_shared(self.interner, self.program, shared);
        interpreter.shared.programs.borrow_mut().insert(
            interpreter.location.clone(),
            LoadedProgram {
                scope: interpreter.globals.clone(),
                names,
            },
        );
        interpreter
    }
}
