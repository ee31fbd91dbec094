//! The destruction engine.
//!
//! Destroying a resource composite runs, in order: its destroy event,
//! interface default destructors (each with its own conditions), the
//! concrete destructor, then destroys every remaining resource field
//! depth-first. Only then is the composite marked destroyed and every
//! reference to it invalidated.

use std::rc::Rc;

use cinder_ir::ast::DestroyEventDecl;
use cinder_ir::{LocationRange, Name};

use super::transfer::container_type_name;
use super::type_codes::CompositeCode;
use super::Interpreter;
use crate::environment::{Mutability, Ownership, ScopeKind};
use crate::errors::{destroyed_resource, EvalResult};
use crate::value::{CompositeValue, Container, Value};

impl Interpreter {
    /// `destroy value`.
    pub(crate) fn destroy_value(&mut self, value: &Value) -> EvalResult<()> {
        match value {
            Value::Some(inner) => self.destroy_value(inner),
            Value::Composite(composite) => self.destroy_composite(composite),
            Value::Array(_) | Value::Dictionary(_) if value.is_resource() => {
                let Some(container) = value.container() else {
                    return Ok(());
                };
                if container.is_destroyed() {
                    return Err(destroyed_resource(container_type_name(&container)));
                }
                for element in container.children() {
                    self.destroy_value(&element)?;
                }
                self.finish_destroy(&container);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(type_id = %composite.type_id()))]
    fn destroy_composite(&mut self, composite: &CompositeValue) -> EvalResult<()> {
        if composite.is_destroyed() {
            return Err(destroyed_resource(composite.type_id().to_string()));
        }
        if !composite.is_resource() {
            return Ok(());
        }
        let code = self.composite_code(&composite.type_id())?;
        let site = LocationRange::new(code.location.clone(), code.decl.span);

        if let Some(event) = &code.decl.destroy_event {
            self.emit_destroy_event(&code, composite, event, &site)?;
        }
        let name = format!("{}.destroy", code.type_id.identifier());
        for default in &code.destructor.defaults {
            let conditions = if default.decl.has_conditions() {
                vec![default.clone()]
            } else {
                Vec::new()
            };
            self.activate(&name, default, &conditions, Some(composite), Vec::new(), &site)?;
        }
        if let Some(plan) = &code.destructor.concrete {
            self.invoke_plan(plan, composite, Vec::new(), &site)?;
        }

        let fields: Vec<Value> = composite.borrow().fields.values().cloned().collect();
        for field in fields {
            if field.is_resource() {
                self.destroy_value(&field)?;
            } else {
                self.discard(&field);
            }
        }
        self.finish_destroy(&Container::Composite(composite.clone()));
        Ok(())
    }

    fn finish_destroy(&mut self, container: &Container) {
        let id = container.id();
        container.with_header_mut(|header| header.destroyed = true);
        self.shared.references.borrow_mut().invalidate(id);
        let mut storage = self.shared.storage.borrow_mut();
        if storage.slab_owner(id).is_some() {
            storage.remove_slab(id);
        }
        tracing::trace!(?id, "destroyed container");
    }

    /// Emit the default destroy event, with its arguments evaluated against
    /// the resource about to be destroyed.
    fn emit_destroy_event(
        &mut self,
        code: &Rc<CompositeCode>,
        composite: &CompositeValue,
        event: &DestroyEventDecl,
        site: &LocationRange,
    ) -> EvalResult<()> {
        let scope = code.scope.child(ScopeKind::Function);
        scope.declare(
            self.names.self_,
            Value::Composite(composite.clone()),
            Mutability::Constant,
            Ownership::Borrowed,
        );
        let arguments = self.with_context(scope, code.location.clone(), None, |interpreter| {
            event
                .arguments
                .iter()
                .map(|(name, expr)| Ok((*name, interpreter.eval_argument(expr)?)))
                .collect::<EvalResult<Vec<(Name, Value)>>>()
        })?;
        self.deliver_event(&event.event, arguments, site.clone())
    }
}
