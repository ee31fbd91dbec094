//! Composite construction, enum cases and contract singletons.

use std::rc::Rc;

use cinder_ir::{CompositeKind, IntegerKind, LocationRange, Name, TypeId};
use indexmap::IndexMap;
use num_bigint::BigInt;

use super::declarations::{box_to, expect_integer, take_arguments};
use super::type_codes::CompositeCode;
use super::Interpreter;
use crate::environment::{ScopeRef, Slot};
use crate::errors::{
    argument_count, host_error, internal_error, resource_construction, uuid_unavailable,
    EvalResult,
};
use crate::value::{CompositeData, CompositeValue, Container, Header, IntegerValue, Value};

impl Interpreter {
    /// Invoke the constructor of `type_id`.
    #[tracing::instrument(level = "debug", skip_all, fields(type_id = %type_id))]
    pub(crate) fn construct(
        &mut self,
        type_id: &TypeId,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        let code = self.composite_code(type_id)?;
        if code.kind == CompositeKind::Enum {
            return enum_from_raw_value(&code, arguments);
        }
        if code.kind.is_resource() && code.location != self.location {
            return Err(resource_construction(
                type_id.to_string(),
                self.location.to_string(),
            ));
        }
        let composite = self.instantiate(&code)?;
        self.initialize_composite(&code, &composite, arguments, site)?;
        Ok(Value::Composite(composite))
    }

    pub(crate) fn composite_code(&self, type_id: &TypeId) -> EvalResult<Rc<CompositeCode>> {
        self.shared
            .types
            .borrow()
            .composite(type_id)
            .ok_or_else(|| internal_error(format!("unknown composite type {type_id}")))
    }

    /// A fresh, field-less composite of `code`'s type, with its `uuid` and
    /// host-injected members.
    pub(crate) fn instantiate(&mut self, code: &CompositeCode) -> EvalResult<CompositeValue> {
        let mut fields = IndexMap::new();
        if code.kind.is_resource() {
            let generator = self
                .shared
                .config
                .uuid_generator
                .clone()
                .ok_or_else(uuid_unavailable)?;
            let uuid = generator
                .next_uuid()
                .map_err(|err| host_error(err.message))?;
            let uuid = IntegerValue::new(IntegerKind::UInt64, BigInt::from(uuid))?;
            fields.insert(self.names.uuid, Value::Integer(uuid));
        }
        let injected = match self.shared.config.injected_fields_handler.clone() {
            Some(handler) => handler
                .injected_fields(&code.type_id, code.kind, &code.location)
                .into_iter()
                .map(|(name, value)| (self.interner.intern(&name), value))
                .collect(),
            None => IndexMap::new(),
        };
        Ok(CompositeValue::new(CompositeData {
            header: Header::new(self.allocate_id(None), None),
            type_id: code.type_id.clone(),
            kind: code.kind,
            location: code.location.clone(),
            fields,
            injected,
            raw_value: None,
        }))
    }

    /// Run the initializer against a freshly instantiated composite.
    ///
    /// Without an initializer body the arguments fill the declared fields
    /// positionally; inherited initializer conditions still run, seeing
    /// resource arguments through references.
    fn initialize_composite(
        &mut self,
        code: &CompositeCode,
        composite: &CompositeValue,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult<()> {
        match &code.initializer {
            Some(plan) if plan.body.decl.body.is_some() => {
                self.invoke_plan(plan, composite, arguments, site)?;
            }
            Some(plan) => {
                let borrowed = arguments
                    .iter()
                    .map(|argument| self.borrow_argument(argument))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.fill_fields(code, composite, arguments)?;
                self.invoke_plan(plan, composite, borrowed, site)?;
            }
            None => self.fill_fields(code, composite, arguments)?,
        }
        Ok(())
    }

    fn borrow_argument(&mut self, argument: &Value) -> EvalResult {
        if argument.is_resource() {
            let ty = argument.static_type();
            Ok(Value::Reference(self.reference_to(argument.clone(), false, &ty)))
        } else {
            self.transfer(argument.clone(), None)
        }
    }

    fn fill_fields(
        &mut self,
        code: &CompositeCode,
        composite: &CompositeValue,
        arguments: Vec<Value>,
    ) -> EvalResult<()> {
        let fields = &code.decl.fields;
        if arguments.is_empty() {
            return Ok(());
        }
        if arguments.len() != fields.len() {
            return Err(argument_count(fields.len(), arguments.len()));
        }
        for (field, argument) in fields.iter().zip(arguments) {
            composite.set_field(field.name, box_to(argument, &field.ty));
        }
        Ok(())
    }

    /// Materialize the cases of an enum declaration.
    pub(crate) fn with_enum_cases(&mut self, mut code: CompositeCode) -> EvalResult<CompositeCode> {
        if code.kind != CompositeKind::Enum {
            return Ok(code);
        }
        let raw_kind = code.enum_raw_type.unwrap_or(IntegerKind::UInt8);
        let decl = Rc::clone(&code.decl);
        for case in &decl.enum_cases {
            let raw = IntegerValue::new(raw_kind, case.raw_value.clone())
                .map_err(|err| err.or_location(|| self.range(decl.span)))?;
            let mut fields = IndexMap::new();
            fields.insert(self.names.raw_value, Value::Integer(raw.clone()));
            let value = CompositeValue::new(CompositeData {
                header: Header::new(self.allocate_id(None), None),
                type_id: code.type_id.clone(),
                kind: CompositeKind::Enum,
                location: code.location.clone(),
                fields,
                injected: IndexMap::new(),
                raw_value: Some(raw),
            });
            code.enum_cases.push((case.name, value));
        }
        Ok(code)
    }

    /// Construct the contract singleton bound to `name` in `scope`.
    ///
    /// The slot holds the contract before its initializer runs, so the
    /// initializer may refer to the contract by name.
    #[tracing::instrument(level = "debug", skip_all, fields(type_id = %type_id))]
    pub(crate) fn force_contract(
        &mut self,
        scope: &ScopeRef,
        name: Name,
        type_id: &TypeId,
    ) -> EvalResult {
        let code = self.composite_code(type_id)?;
        let composite = self.instantiate(&code)?;
        if let Some(owner) = code.location.owning_address() {
            Container::Composite(composite.clone()).with_header_mut(|header| {
                header.owner = Some(owner);
            });
        }
        scope.replace_slot(name, Slot::Value(Value::Composite(composite.clone())));

        let arguments = match self.shared.config.contract_value_handler.clone() {
            Some(handler) => handler
                .initializer_arguments(type_id, &code.location)
                .map_err(|err| host_error(err.message))?,
            None => Vec::new(),
        };
        let arguments = arguments
            .into_iter()
            .map(|argument| self.transfer(argument, None))
            .collect::<EvalResult<Vec<_>>>()?;
        let site = LocationRange::new(code.location.clone(), code.decl.span);
        self.with_context(
            code.scope.clone(),
            code.location.clone(),
            None,
            |interpreter| interpreter.initialize_composite(&code, &composite, arguments, &site),
        )?;
        Ok(Value::Composite(composite))
    }
}

/// `E(rawValue: raw)`: the case with that raw value, or `nil`.
fn enum_from_raw_value(code: &CompositeCode, arguments: Vec<Value>) -> EvalResult {
    let [raw] = take_arguments(arguments)?;
    let raw = expect_integer(&raw)?;
    let case = code.enum_cases.iter().find(|(_, case)| {
        case.borrow()
            .raw_value
            .as_ref()
            .is_some_and(|value| value.value() == raw.value())
    });
    Ok(Value::optional(
        case.map(|(_, case)| Value::Composite(case.clone())),
    ))
}
