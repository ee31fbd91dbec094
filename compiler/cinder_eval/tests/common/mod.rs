//! Shared harness for the evaluator integration tests.
//!
//! Programs are built with `AstBuilder`. Every harness interpreter has a
//! UUID generator, an event handler that writes into the same trace as the
//! `note(_:)` host function, so tests can assert the relative order of
//! program effects and emitted events.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use cinder_eval::{
    CounterUuidGenerator, EmittedEvent, EvalResult, EventHandler, FunctionValue, HostError,
    Interpreter, InterpreterBuilder, Value,
};
use cinder_ir::ast::{Declaration, Expr, Stmt};
use cinder_ir::{AstBuilder, Location, SharedInterner, StaticType};

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber when `CINDER_LOG` is set, e.g.
/// `CINDER_LOG=cinder_eval=trace`. Safe to call from every test.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if let Ok(directives) = std::env::var("CINDER_LOG") {
            tracing_subscriber::registry()
                .with(fmt::layer().with_test_writer().with_target(true))
                .with(EnvFilter::new(directives))
                .init();
        }
    });
}

/// Ordered record of `note(_:)` calls and emitted events.
#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// Records each event as `event:<identifier>`.
struct TraceEvents(Trace);

impl EventHandler for TraceEvents {
    fn on_event(&self, event: &EmittedEvent) -> Result<(), HostError> {
        self.0.push(format!("event:{}", event.type_id.identifier()));
        Ok(())
    }
}

pub struct Harness {
    pub b: AstBuilder,
    pub trace: Trace,
}

impl Harness {
    pub fn new() -> Self {
        Self::at(Location::script("test"))
    }

    pub fn at(location: Location) -> Self {
        init_tracing();
        Harness {
            b: AstBuilder::new(SharedInterner::new(), location),
            trace: Trace::default(),
        }
    }

    /// Builder for an interpreter over `declarations` with the harness hooks.
    pub fn builder(&self, declarations: Vec<Declaration>) -> InterpreterBuilder {
        InterpreterBuilder::new(self.b.interner().clone(), self.b.program(declarations))
            .uuid_generator(Rc::new(CounterUuidGenerator::new()))
            .event_handler(Rc::new(TraceEvents(self.trace.clone())))
    }

    pub fn interpreter(&self, declarations: Vec<Declaration>) -> Interpreter {
        self.finish(self.builder(declarations))
    }

    /// Build and bind `note(_:)`, which appends its argument to the trace
    /// and returns `true`, so it can be used inside conditions.
    pub fn finish(&self, builder: InterpreterBuilder) -> Interpreter {
        let mut interpreter = builder.build();
        let trace = self.trace.clone();
        let note = FunctionValue::host(
            "note",
            StaticType::function(vec![StaticType::String], StaticType::Bool),
            move |_, invocation| -> EvalResult {
                for argument in &invocation.arguments {
                    match argument {
                        Value::String(s) => trace.push(s.as_str()),
                        other => trace.push(format!("{other:?}")),
                    }
                }
                Ok(Value::Bool(true))
            },
        );
        interpreter.define_global("note", Value::Function(note));
        interpreter
    }

    /// `note("entry")`
    pub fn note(&self, entry: &str) -> Expr {
        self.b.call_named("note", vec![self.b.string(entry)])
    }

    /// `note("entry")` as a statement.
    pub fn note_stmt(&self, entry: &str) -> Stmt {
        self.b.expr_stmt(self.note(entry))
    }

    /// Declare `fun main(): returns { body }` next to `declarations` and run it.
    pub fn run_main(
        &self,
        mut declarations: Vec<Declaration>,
        returns: StaticType,
        body: Vec<Stmt>,
    ) -> EvalResult {
        declarations.push(self.b.function("main").returns(returns).body(body).declare());
        let mut interpreter = self.interpreter(declarations);
        interpreter.invoke("main", Vec::new())
    }
}
