//! Program declarations and lazily initialized globals.
//!
//! Declaring a program binds every global without running any program code:
//! imports, interfaces and composites first (so method plans can see every
//! interface), then functions, then global variables as lazy slots. Base
//! values are bound before any of that, so programs may shadow them.

use std::rc::Rc;

use cinder_ir::ast::{CompositeDecl, Declaration, InterfaceDecl, Program, VariableDecl};
use cinder_ir::{
    Address, CompositeKind, FixedPointKind, IntegerKind, Name, NumericSupertype, StaticType,
    TypeId,
};

use super::type_codes::{CompositeCode, DestructorPlan, InterfaceCode};
use super::Interpreter;
use crate::environment::{LazyInit, Mutability, Ownership, ScopeRef, Slot};
use crate::errors::{argument_count, type_mismatch, use_before_initialization, EvalResult};
use crate::value::{
    convert_integer, ConstructorFunction, FixedPointValue, FunctionValue, HostInvocation,
    InterpretedFunction, IntegerValue, PathValue, Value,
};

impl Interpreter {
    /// Bind every global of `program` in the current global scope.
    pub(crate) fn declare_program(&mut self, program: &Program) -> EvalResult<()> {
        for import in program.imports() {
            self.import(import)?;
        }

        let interfaces: Vec<&Rc<InterfaceDecl>> = program
            .declarations
            .iter()
            .filter_map(|decl| match decl {
                Declaration::Interface(interface) => Some(interface),
                _ => None,
            })
            .collect();
        // Two passes: an interface may inherit from one declared after it.
        for decl in &interfaces {
            self.declare_interface(decl, decl.conformances.clone());
        }
        for decl in &interfaces {
            let conformances = self
                .shared
                .types
                .borrow()
                .transitive_conformances(&decl.conformances);
            self.declare_interface(decl, conformances);
        }

        for decl in &program.declarations {
            match decl {
                Declaration::Composite(composite) => self.declare_composite(composite)?,
                Declaration::Function(function) => {
                    let value = FunctionValue::Interpreted(Rc::new(InterpretedFunction {
                        decl: Rc::clone(function),
                        scope: self.globals.clone(),
                        location: self.location.clone(),
                    }));
                    self.globals.declare(
                        function.name,
                        Value::Function(value),
                        Mutability::Constant,
                        Ownership::Owned,
                    );
                }
                Declaration::Variable(variable) => {
                    let mutability = if variable.is_constant {
                        Mutability::Constant
                    } else {
                        Mutability::Variable
                    };
                    self.globals.declare_lazy(
                        variable.name,
                        LazyInit::Variable {
                            decl: Rc::clone(variable),
                            location: self.location.clone(),
                        },
                        mutability,
                    );
                }
                Declaration::Interface(_) | Declaration::Import(_) => {}
            }
        }
        Ok(())
    }

    /// Initialize the program's own global variables, in declaration order.
    pub(crate) fn initialize_globals(&mut self) -> EvalResult<()> {
        let program = Rc::clone(self.program());
        let globals = self.globals.clone();
        for decl in &program.declarations {
            if let Declaration::Variable(variable) = decl {
                self.read_slot(&globals, variable.name)?;
            }
        }
        Ok(())
    }

    fn declare_interface(&mut self, decl: &Rc<InterfaceDecl>, conformances: Vec<TypeId>) {
        let code = InterfaceCode {
            type_id: TypeId::new(&self.location, self.name_str(decl.name)),
            kind: decl.kind,
            location: self.location.clone(),
            decl: Rc::clone(decl),
            conformances,
            scope: self.globals.clone(),
        };
        self.shared.types.borrow_mut().insert_interface(Rc::new(code));
    }

    fn declare_composite(&mut self, decl: &Rc<CompositeDecl>) -> EvalResult<()> {
        let identifier = self.name_str(decl.name);
        let type_id = TypeId::new(&self.location, identifier);
        let code = {
            let types = self.shared.types.borrow();
            let conformances = types.transitive_conformances(&decl.conformances);
            let methods = types.plan_methods(
                identifier,
                &decl.functions,
                &conformances,
                &self.globals,
                &self.location,
                &self.interner,
            );
            let initializer = types.plan_special(
                self.names.init,
                format!("{identifier}.init"),
                decl.initializer.as_ref(),
                &conformances,
                &self.globals,
                &self.location,
                |interface| interface.initializer.as_ref(),
                false,
            );
            let destructor = DestructorPlan {
                defaults: types.default_destructors(&conformances),
                concrete: types.plan_special(
                    self.names.destroy,
                    format!("{identifier}.destroy"),
                    decl.destructor.as_ref(),
                    &conformances,
                    &self.globals,
                    &self.location,
                    |interface| interface.destructor.as_ref(),
                    true,
                ),
            };
            CompositeCode {
                type_id: type_id.clone(),
                kind: decl.kind,
                location: self.location.clone(),
                decl: Rc::clone(decl),
                conformances,
                initializer,
                destructor,
                methods,
                scope: self.globals.clone(),
                enum_cases: Vec::new(),
                enum_raw_type: decl.enum_raw_type,
            }
        };
        let code = self.with_enum_cases(code)?;
        self.shared.types.borrow_mut().insert_composite(Rc::new(code));

        match decl.kind {
            CompositeKind::Contract => {
                self.globals
                    .declare_lazy(decl.name, LazyInit::Contract { type_id }, Mutability::Constant);
            }
            kind => {
                let constructor = FunctionValue::Constructor(Rc::new(ConstructorFunction {
                    type_id,
                    kind,
                }));
                self.globals.declare(
                    decl.name,
                    Value::Function(constructor),
                    Mutability::Constant,
                    Ownership::Owned,
                );
            }
        }
        Ok(())
    }

    /// Force a lazy slot of `scope`.
    ///
    /// Variable initializers and contract singletons are memoized; imported
    /// names stay aliases of the exporting program's slot.
    pub(crate) fn force_lazy(&mut self, scope: &ScopeRef, name: Name) -> EvalResult {
        let Some(init) = scope.begin_initialization(name) else {
            return Err(use_before_initialization(self.name_str(name)));
        };
        tracing::debug!(name = self.name_str(name), ?init, "forcing lazy global");
        let result = match &init {
            LazyInit::Variable { decl, location } => {
                let decl = Rc::clone(decl);
                self.with_context(scope.clone(), location.clone(), None, |interpreter| {
                    interpreter.evaluate_global(&decl)
                })
            }
            LazyInit::Contract { type_id } => {
                let type_id = type_id.clone();
                self.force_contract(scope, name, &type_id)
            }
            LazyInit::Imported {
                scope: source,
                name: source_name,
            } => {
                scope.replace_slot(name, Slot::Lazy(init.clone()));
                return self.read_slot(source, *source_name);
            }
        };
        match result {
            Ok(value) => {
                scope.replace_slot(name, Slot::Value(value.clone()));
                Ok(value)
            }
            Err(err) => {
                scope.replace_slot(name, Slot::Lazy(init));
                Err(err)
            }
        }
    }

    fn evaluate_global(&mut self, decl: &VariableDecl) -> EvalResult {
        let value = self
            .eval_binding(&decl.value, decl.transfer)
            .map_err(|err| err.or_location(|| self.range(decl.span)))?;
        Ok(match &decl.ty {
            Some(ty) => box_to(value, ty),
            None => value,
        })
    }

    /// Bind the base values every program can see: numeric conversion
    /// functions and the storage functions.
    pub(crate) fn declare_base_values(&mut self) {
        let number = StaticType::Numeric(NumericSupertype::Number);
        for kind in IntegerKind::ALL {
            let function = FunctionValue::host(
                kind.name(),
                StaticType::function(vec![number.clone()], StaticType::Integer(kind)),
                move |_, invocation| convert_to_integer(kind, &invocation),
            );
            self.declare_base(kind.name(), Value::Function(function));
        }
        for kind in [FixedPointKind::Fix64, FixedPointKind::UFix64] {
            let function = FunctionValue::host(
                kind.name(),
                StaticType::function(vec![number.clone()], StaticType::FixedPoint(kind)),
                move |_, invocation| convert_to_fixed(kind, &invocation),
            );
            self.declare_base(kind.name(), Value::Function(function));
        }

        let path_params = vec![StaticType::Address, StaticType::Path];
        let with = |extra: StaticType| {
            let mut params = path_params.clone();
            params.push(extra);
            params
        };
        let save = FunctionValue::host(
            "save",
            StaticType::function(with(StaticType::Any), StaticType::Void),
            |interpreter, invocation| {
                let [address, path, value] = take_arguments(invocation.arguments)?;
                interpreter.save(expect_address(&address)?, expect_path(&path)?, value)?;
                Ok(Value::Void)
            },
        );
        let load = FunctionValue::host(
            "load",
            StaticType::function(with(StaticType::MetaType), StaticType::optional(StaticType::Any)),
            |interpreter, invocation| {
                let [address, path, ty] = take_arguments(invocation.arguments)?;
                interpreter.load(expect_address(&address)?, expect_path(&path)?, &expect_type(&ty)?)
            },
        );
        let copy = FunctionValue::host(
            "copy",
            StaticType::function(
                with(StaticType::MetaType),
                StaticType::optional(StaticType::AnyStruct),
            ),
            |interpreter, invocation| {
                let [address, path, ty] = take_arguments(invocation.arguments)?;
                interpreter.copy(expect_address(&address)?, expect_path(&path)?, &expect_type(&ty)?)
            },
        );
        let borrow = FunctionValue::host(
            "borrow",
            StaticType::function(with(StaticType::MetaType), StaticType::optional(StaticType::Any)),
            |interpreter, invocation| {
                let [address, path, ty] = take_arguments(invocation.arguments)?;
                interpreter.borrow(
                    expect_address(&address)?,
                    expect_path(&path)?,
                    &expect_type(&ty)?,
                )
            },
        );
        let check = FunctionValue::host(
            "check",
            StaticType::function(with(StaticType::MetaType), StaticType::Bool),
            |interpreter, invocation| {
                let [address, path, ty] = take_arguments(invocation.arguments)?;
                interpreter
                    .check(expect_address(&address)?, expect_path(&path)?, &expect_type(&ty)?)
                    .map(Value::Bool)
            },
        );
        for (name, function) in [
            ("save", save),
            ("load", load),
            ("copy", copy),
            ("borrow", borrow),
            ("check", check),
        ] {
            self.declare_base(name, Value::Function(function));
        }
    }

    fn declare_base(&mut self, name: &str, value: Value) {
        let name = self.interner.intern(name);
        self.globals
            .declare(name, value, Mutability::Constant, Ownership::Owned);
    }
}

/// Wrap `value` in as many optional layers as `ty` expects.
pub(crate) fn box_to(value: Value, ty: &StaticType) -> Value {
    if value.is_nil() {
        return value;
    }
    let expected = optional_depth(ty);
    let mut actual = 0;
    let mut cursor = &value;
    while let Value::Some(inner) = cursor {
        actual += 1;
        cursor = inner;
    }
    let mut boxed = value;
    for _ in actual..expected {
        boxed = Value::some(boxed);
    }
    boxed
}

fn optional_depth(ty: &StaticType) -> usize {
    match ty {
        StaticType::Optional(inner) => 1 + optional_depth(inner),
        _ => 0,
    }
}

pub(crate) fn take_arguments<const N: usize>(arguments: Vec<Value>) -> EvalResult<[Value; N]> {
    let got = arguments.len();
    arguments
        .try_into()
        .map_err(|_| argument_count(N, got))
}

fn convert_to_integer(kind: IntegerKind, invocation: &HostInvocation) -> EvalResult {
    let [value] = invocation.arguments.as_slice() else {
        return Err(argument_count(1, invocation.arguments.len()));
    };
    convert_integer(value, kind)
        .unwrap_or_else(|| Err(type_mismatch(kind.name(), value.type_name())))
        .map_err(|err| err.or_location(|| invocation.location.clone()))
}

fn convert_to_fixed(kind: FixedPointKind, invocation: &HostInvocation) -> EvalResult {
    let [value] = invocation.arguments.as_slice() else {
        return Err(argument_count(1, invocation.arguments.len()));
    };
    let converted = match value {
        Value::Integer(i) => FixedPointValue::from_integer(kind, i.value()),
        Value::FixedPoint(f) => f.convert(kind),
        other => return Err(type_mismatch(kind.name(), other.type_name())),
    };
    converted
        .map(Value::FixedPoint)
        .map_err(|err| err.or_location(|| invocation.location.clone()))
}

pub(crate) fn expect_address(value: &Value) -> EvalResult<Address> {
    match value {
        Value::Address(address) => Ok(*address),
        other => Err(type_mismatch("Address", other.type_name())),
    }
}

pub(crate) fn expect_path(value: &Value) -> EvalResult<PathValue> {
    match value {
        Value::Path(path) => Ok(*path),
        other => Err(type_mismatch("Path", other.type_name())),
    }
}

pub(crate) fn expect_type(value: &Value) -> EvalResult<StaticType> {
    match value {
        Value::Type(ty) => Ok(ty.clone()),
        other => Err(type_mismatch("Type", other.type_name())),
    }
}

pub(crate) fn expect_integer(value: &Value) -> EvalResult<&IntegerValue> {
    value
        .as_integer()
        .ok_or_else(|| type_mismatch("Integer", value.type_name()))
}

pub(crate) fn expect_bool(value: &Value) -> EvalResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| type_mismatch("Bool", value.type_name()))
}
