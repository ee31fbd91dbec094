//! Function invocation.
//!
//! Every interpreted call goes through one activation pipeline:
//!
//! 1. meter, push a call frame, check the argument count
//! 2. bind parameters (owned) and the receiver (`self`, plus `base` for
//!    interface defaults, both borrowed) in a child of the defining scope
//! 3. take `before(...)` snapshots for each condition source
//! 4. pre-conditions, in the configured order
//! 5. the body
//! 6. bind `result` and run post-conditions, in the configured order
//! 7. loss check on the function scope, then invalidate its locals
//!
//! Conditions run in their declaring source's scope and location, with the
//! parameters rebound (borrowed) under the names that source declared.

use std::rc::Rc;

use cinder_ir::ast::Condition;
use cinder_ir::{LocationRange, StaticType};
use rustc_hash::FxHashMap;

use super::declarations::{box_to, expect_bool};
use super::scope_guard::BeforeSnapshots;
use super::statements::StmtOutcome;
use super::type_codes::{ConditionSource, FunctionSource, MethodPlan, Origin};
use super::Interpreter;
use crate::config::{ComputationKind, ConditionOrdering};
use crate::diagnostics::CallFrame;
use crate::environment::{Mutability, Ownership, ScopeKind, ScopeRef};
use crate::errors::{
    argument_count, condition_failed, resource_loss, type_mismatch, EvalError, EvalResult,
};
use crate::value::{CompositeValue, FunctionValue, HostInvocation, Value};

impl Interpreter {
    /// Call any function value with already-transferred arguments.
    pub(crate) fn call_function(
        &mut self,
        function: &FunctionValue,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        match function {
            FunctionValue::Interpreted(function) => {
                let body = FunctionSource {
                    decl: Rc::clone(&function.decl),
                    origin: Origin::Own,
                    scope: function.scope.clone(),
                    location: function.location.clone(),
                };
                let conditions = if function.decl.has_conditions() {
                    vec![body.clone()]
                } else {
                    Vec::new()
                };
                let name = self.name_str(function.decl.name);
                self.activate(name, &body, &conditions, None, arguments, site)
            }
            FunctionValue::Bound(bound) => {
                let receiver = match self.deref(&bound.receiver) {
                    Ok(Value::Composite(receiver)) => receiver,
                    Ok(other) => return Err(type_mismatch("composite", other.type_name())),
                    Err(err) => return Err(err.or_location(|| site.clone())),
                };
                self.invoke_plan(&bound.plan, &receiver, arguments, site)
            }
            FunctionValue::Host(host) => {
                let invocation = HostInvocation {
                    arguments,
                    location: site.clone(),
                };
                (host.function)(self, invocation).map_err(|err| err.or_location(|| site.clone()))
            }
            FunctionValue::Constructor(constructor) => {
                let type_id = constructor.type_id.clone();
                self.construct(&type_id, arguments, site)
            }
            FunctionValue::Builtin(builtin) => {
                let receiver = builtin.receiver.clone();
                self.call_builtin(&receiver, builtin.method, arguments, site)
                    .map_err(|err| err.or_location(|| site.clone()))
            }
        }
    }

    /// Run a method plan against `receiver`.
    pub(crate) fn invoke_plan(
        &mut self,
        plan: &MethodPlan,
        receiver: &CompositeValue,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        self.activate(
            &plan.qualified_name,
            &plan.body,
            &plan.conditions,
            Some(receiver),
            arguments,
            site,
        )
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = name))]
    pub(crate) fn activate(
        &mut self,
        name: &str,
        body: &FunctionSource,
        conditions: &[ConditionSource],
        receiver: Option<&CompositeValue>,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        self.meter(ComputationKind::FunctionInvocation)
            .map_err(|err| err.or_location(|| site.clone()))?;
        self.shared
            .call_stack
            .borrow_mut()
            .push(CallFrame {
                name: name.to_string(),
                call_site: Some(site.clone()),
            })
            .map_err(|err| err.with_location(site.clone()))?;
        let depth = self.shared.call_stack.borrow().depth();
        let observer = self.shared.config.invocation_observer.clone();
        if let Some(observer) = &observer {
            observer.on_invoke(name, depth);
        }

        let result = self
            .run_activation(body, conditions, receiver, arguments, site)
            .map_err(|err| self.shared.call_stack.borrow().attach_backtrace(err));

        self.shared.call_stack.borrow_mut().pop();
        if let Some(observer) = &observer {
            observer.on_return(name, depth, result.is_ok());
        }
        result
    }

    fn run_activation(
        &mut self,
        body: &FunctionSource,
        conditions: &[ConditionSource],
        receiver: Option<&CompositeValue>,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        let decl = &body.decl;
        if arguments.len() != decl.parameters.len() {
            return Err(argument_count(decl.parameters.len(), arguments.len())
                .with_location(site.clone()));
        }

        let arguments: Vec<Value> = decl
            .parameters
            .iter()
            .zip(arguments)
            .map(|(parameter, argument)| box_to(argument, &parameter.ty))
            .collect();
        let function_scope = body.scope.child(ScopeKind::Function);
        for (parameter, argument) in decl.parameters.iter().zip(&arguments) {
            function_scope.declare(
                parameter.name,
                argument.clone(),
                Mutability::Constant,
                Ownership::Owned,
            );
        }
        if let Some(receiver) = receiver {
            self.bind_receiver(&function_scope, receiver, body.is_interface_default());
        }

        let snapshots = self.take_snapshots(conditions, receiver, &arguments)?;
        for index in ordered(conditions, self.shared.config.condition_ordering) {
            let source = &conditions[index];
            let scope = self.condition_scope(source, receiver, &arguments, None);
            self.check_conditions(source, &scope, &source.decl.pre_conditions, None)?;
        }

        let returned = match &decl.body {
            Some(block) => {
                let outcome = self.with_context(
                    function_scope.clone(),
                    body.location.clone(),
                    None,
                    |interpreter| interpreter.execute_statements(&block.statements),
                )?;
                match outcome {
                    StmtOutcome::Return(value) => box_to(value, &decl.return_type),
                    StmtOutcome::Normal | StmtOutcome::Break | StmtOutcome::Continue => {
                        Value::Void
                    }
                }
            }
            None => Value::Void,
        };

        if conditions.iter().any(|c| !c.decl.post_conditions.is_empty()) {
            let result = self.result_binding(&returned, &decl.return_type)?;
            for index in ordered(conditions, self.shared.config.condition_ordering) {
                let source = &conditions[index];
                let scope =
                    self.condition_scope(source, receiver, &arguments, Some(result.clone()));
                self.check_conditions(
                    source,
                    &scope,
                    &source.decl.post_conditions,
                    snapshots[index].clone(),
                )?;
            }
        }

        self.exit_scope(&function_scope).map_err(|err| {
            err.or_location(|| LocationRange::new(body.location.clone(), decl.span))
        })?;
        Ok(returned)
    }

    fn bind_receiver(&self, scope: &ScopeRef, receiver: &CompositeValue, with_base: bool) {
        let receiver = Value::Composite(receiver.clone());
        if with_base {
            scope.declare(
                self.names.base,
                receiver.clone(),
                Mutability::Constant,
                Ownership::Borrowed,
            );
        }
        scope.declare(
            self.names.self_,
            receiver,
            Mutability::Constant,
            Ownership::Borrowed,
        );
    }

    /// Scope a condition source's conditions run in.
    fn condition_scope(
        &self,
        source: &ConditionSource,
        receiver: Option<&CompositeValue>,
        arguments: &[Value],
        result: Option<Value>,
    ) -> ScopeRef {
        let scope = source.scope.child(ScopeKind::Function);
        for (parameter, argument) in source.decl.parameters.iter().zip(arguments) {
            scope.declare(
                parameter.name,
                argument.clone(),
                Mutability::Constant,
                Ownership::Borrowed,
            );
        }
        if let Some(receiver) = receiver {
            self.bind_receiver(&scope, receiver, source.is_interface_default());
        }
        if let Some(result) = result {
            scope.declare(
                self.names.result,
                result,
                Mutability::Constant,
                Ownership::Borrowed,
            );
        }
        scope
    }

    /// Evaluate each source's `before(...)` operands in the pre-state.
    fn take_snapshots(
        &mut self,
        conditions: &[ConditionSource],
        receiver: Option<&CompositeValue>,
        arguments: &[Value],
    ) -> EvalResult<Vec<Option<BeforeSnapshots>>> {
        let mut all = Vec::with_capacity(conditions.len());
        for source in conditions {
            let operands = source.decl.before_expressions();
            if operands.is_empty() {
                all.push(None);
                continue;
            }
            let scope = self.condition_scope(source, receiver, arguments, None);
            let snapshots = self.with_context(scope, source.location.clone(), None, |interpreter| {
                let mut snapshots = FxHashMap::default();
                for operand in operands {
                    let value = interpreter.eval_expr(operand)?;
                    let value = if value.is_resource() {
                        value
                    } else {
                        interpreter.transfer(value, None)?
                    };
                    snapshots.insert(operand.id, value);
                }
                Ok::<_, EvalError>(snapshots)
            })?;
            all.push(Some(Rc::new(snapshots)));
        }
        Ok(all)
    }

    fn check_conditions(
        &mut self,
        source: &ConditionSource,
        scope: &ScopeRef,
        conditions: &[Condition],
        before: Option<BeforeSnapshots>,
    ) -> EvalResult<()> {
        if conditions.is_empty() {
            return Ok(());
        }
        self.with_context(scope.clone(), source.location.clone(), before, |interpreter| {
            for condition in conditions {
                interpreter.check_condition(condition, &source.location)?;
            }
            Ok(())
        })
    }

    fn check_condition(
        &mut self,
        condition: &Condition,
        location: &cinder_ir::Location,
    ) -> EvalResult<()> {
        let site = || LocationRange::new(location.clone(), condition.span);
        let test = self.eval_expr(&condition.test)?;
        if expect_bool(&test).map_err(|err| err.or_location(site))? {
            return Ok(());
        }
        let message = match &condition.message {
            Some(message) => match self.eval_expr(message)? {
                Value::String(s) => s.as_str().to_string(),
                other => self.render(&other),
            },
            None => String::new(),
        };
        tracing::debug!(kind = condition.kind.name(), %message, "condition failed");
        Err(condition_failed(condition.kind, message).with_location(site()))
    }

    /// The implicit `result` binding of post-conditions.
    fn result_binding(&mut self, returned: &Value, return_type: &StaticType) -> EvalResult {
        match returned {
            Value::Nil | Value::Void => Ok(returned.clone()),
            Value::Some(inner) if inner.is_resource() => {
                let ty = inner.static_type();
                Ok(Value::some(Value::Reference(self.reference_to(
                    (**inner).clone(),
                    false,
                    &ty,
                ))))
            }
            value if value.is_resource() => {
                let ty = return_type.unwrap_optional().clone();
                Ok(Value::Reference(self.reference_to(value.clone(), false, &ty)))
            }
            value => self.transfer(value.clone(), None),
        }
    }

    /// Leave a function or block scope: any owned resource still bound is
    /// lost; the remaining locals are released.
    pub(crate) fn exit_scope(&mut self, scope: &ScopeRef) -> EvalResult<()> {
        if let Some(name) = scope.unconsumed_resource() {
            return Err(resource_loss(self.name_str(name)));
        }
        for value in scope.owned_values() {
            if !matches!(value, Value::Function(_)) {
                self.discard(&value);
            }
        }
        Ok(())
    }
}

/// Indices of `conditions` in evaluation order.
fn ordered(conditions: &[ConditionSource], ordering: ConditionOrdering) -> Vec<usize> {
    let (own, inherited): (Vec<usize>, Vec<usize>) =
        (0..conditions.len()).partition(|&i| conditions[i].origin == Origin::Own);
    match ordering {
        ConditionOrdering::OwnFirst => own.into_iter().chain(inherited).collect(),
        ConditionOrdering::InterfaceFirst => inherited.into_iter().chain(own).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_ir::ast::{ConditionKind, FunctionDecl};
    use cinder_ir::{Location, Span, StringInterner, TypeId};
    use pretty_assertions::assert_eq;

    fn source(interner: &StringInterner, origin: Origin) -> ConditionSource {
        FunctionSource {
            decl: Rc::new(FunctionDecl {
                name: interner.intern("f"),
                parameters: Vec::new(),
                return_type: StaticType::Void,
                pre_conditions: Vec::new(),
                post_conditions: Vec::new(),
                body: None,
                span: Span::DUMMY,
            }),
            origin,
            scope: ScopeRef::global(),
            location: Location::script("test"),
        }
    }

    #[test]
    fn test_condition_ordering_policies() {
        let interner = StringInterner::new();
        let interface = Origin::Interface(TypeId::new(&Location::script("test"), "I"));
        let conditions = vec![
            source(&interner, Origin::Own),
            source(&interner, interface.clone()),
            source(&interner, interface),
        ];
        assert_eq!(ordered(&conditions, ConditionOrdering::OwnFirst), vec![0, 1, 2]);
        assert_eq!(ordered(&conditions, ConditionOrdering::InterfaceFirst), vec![1, 2, 0]);
    }

    #[test]
    fn test_condition_kind_names() {
        assert_eq!(ConditionKind::Pre.name(), "pre-condition");
        assert_eq!(ConditionKind::Post.name(), "post-condition");
    }
}
