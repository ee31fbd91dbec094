//! Event emission.

use cinder_ir::ast::{Expr, ExprKind};
use cinder_ir::{LocationRange, Name, TypeId};

use super::Interpreter;
use crate::config::EmittedEvent;
use crate::errors::{
    event_emission_unavailable, host_error, internal_error, not_invokable, EvalResult,
};
use crate::value::{CompositeValue, FunctionValue, Value};

impl Interpreter {
    /// `emit E(...)`.
    pub(crate) fn emit(&mut self, invocation: &Expr) -> EvalResult<()> {
        if self.shared.config.event_handler.is_none() {
            return Err(event_emission_unavailable());
        }
        let ExprKind::Invocation { callee, arguments } = &invocation.kind else {
            return Err(internal_error("`emit` requires an event invocation"));
        };
        let site = self.range(invocation.span);
        let Value::Function(FunctionValue::Constructor(constructor)) = self.eval_expr(callee)?
        else {
            return Err(not_invokable("event"));
        };
        let arguments = arguments
            .iter()
            .map(|argument| self.eval_argument(argument))
            .collect::<EvalResult<Vec<_>>>()?;
        let type_id = constructor.type_id.clone();
        let Value::Composite(event) = self.construct(&type_id, arguments, &site)? else {
            return Err(not_invokable(type_id.to_string()));
        };
        self.send_event(type_id, event, site)
    }

    /// Build an event of `type_id` from named field values and emit it.
    pub(crate) fn deliver_event(
        &mut self,
        type_id: &TypeId,
        fields: Vec<(Name, Value)>,
        site: LocationRange,
    ) -> EvalResult<()> {
        if self.shared.config.event_handler.is_none() {
            return Err(event_emission_unavailable());
        }
        let code = self.composite_code(type_id)?;
        let event = self.instantiate(&code)?;
        for (name, value) in fields {
            event.set_field(name, value);
        }
        self.send_event(type_id.clone(), event, site)
    }

    fn send_event(
        &mut self,
        type_id: TypeId,
        event: CompositeValue,
        location: LocationRange,
    ) -> EvalResult<()> {
        let Some(handler) = self.shared.config.event_handler.clone() else {
            return Err(event_emission_unavailable());
        };
        let fields = event
            .borrow()
            .fields
            .iter()
            .map(|(name, value)| (self.name_str(*name).to_string(), value.clone()))
            .collect();
        tracing::debug!(%type_id, "emitting event");
        let emitted = EmittedEvent {
            type_id,
            fields,
            value: event,
            location,
        };
        handler
            .on_event(&emitted)
            .map_err(|err| host_error(err.message))
    }
}
