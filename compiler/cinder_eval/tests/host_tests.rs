//! End-to-end tests for the host surface: events, imports, contracts,
//! enums, UUIDs, injected members, invocation tracing and the storage
//! functions every program can call.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cinder_eval::{
    BufferEventHandler, ContractValueHandler, EvalErrorKind, HostError, ImportResolver,
    InjectedFieldsHandler, InterpreterBuilder, InvocationObserver, Value,
};
use cinder_ir::ast::{Declaration, Program};
use cinder_ir::{
    Address, AstBuilder, CompositeKind, IntegerKind, Location, PathDomain, StaticType, TypeId,
};
use common::Harness;

const ACCOUNT: Address = Address::new(0x42);

mod events {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transfer_program(b: &AstBuilder) -> Vec<Declaration> {
        let sent = b
            .composite("Sent", CompositeKind::Event)
            .field("amount", StaticType::int())
            .field("memo", StaticType::String)
            .declare();
        let send = b
            .function("send")
            .body(vec![b.emit("Sent", vec![b.int(5), b.string("rent")])])
            .declare();
        vec![sent, send]
    }

    #[test]
    fn emitted_events_reach_the_handler_with_fields() {
        let h = Harness::new();
        let events = Rc::new(BufferEventHandler::new());
        let builder = h
            .builder(transfer_program(&h.b))
            .event_handler(events.clone());
        let mut interpreter = h.finish(builder);
        interpreter.invoke("send", Vec::new()).unwrap();

        let emitted = events.events();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].type_id.identifier(), "Sent");
        assert_eq!(
            emitted[0].fields,
            vec![
                ("amount".to_string(), Value::int(5)),
                ("memo".to_string(), Value::string("rent")),
            ]
        );
    }

    #[test]
    fn emitting_without_a_handler_fails() {
        let h = Harness::new();
        let builder =
            InterpreterBuilder::new(h.b.interner().clone(), h.b.program(transfer_program(&h.b)));
        let mut interpreter = h.finish(builder);
        let err = interpreter.invoke("send", Vec::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::EventEmissionUnavailable);
    }
}

mod imports {
    use super::*;
    use pretty_assertions::assert_eq;

    fn library_location() -> Location {
        Location::address(ACCOUNT, "Math")
    }

    /// Serves one library program and counts how often it is asked for it.
    struct Library {
        program: Rc<Program>,
        resolved: Cell<usize>,
    }

    impl Library {
        fn new(main: &AstBuilder) -> Self {
            let b = AstBuilder::new(main.interner().clone(), library_location());
            let double = b
                .function("double")
                .param("x", StaticType::int())
                .returns(StaticType::int())
                .body(vec![b.ret(b.mul(b.ident("x"), b.int(2)))])
                .declare();
            let triple = b
                .function("triple")
                .param("x", StaticType::int())
                .returns(StaticType::int())
                .body(vec![b.ret(b.mul(b.ident("x"), b.int(3)))])
                .declare();
            let coin = b.composite("Coin", CompositeKind::Resource).declare();
            let mint = b
                .function("mint")
                .returns(b.resource_type("Coin"))
                .body(vec![b.ret(b.create("Coin", vec![]))])
                .declare();
            Library {
                program: Rc::new(b.program(vec![double, triple, coin, mint])),
                resolved: Cell::new(0),
            }
        }
    }

    impl ImportResolver for Library {
        fn resolve(&self, location: &Location) -> Result<Rc<Program>, HostError> {
            if *location != library_location() {
                return Err(HostError::new(format!("no program at {location}")));
            }
            self.resolved.set(self.resolved.get() + 1);
            Ok(Rc::clone(&self.program))
        }
    }

    #[test]
    fn imported_functions_resolve_once_per_location() {
        let h = Harness::new();
        let b = &h.b;
        let library = Rc::new(Library::new(b));
        let main = b
            .function("main")
            .returns(StaticType::int())
            .body(vec![b.ret(b.add(
                b.call_named("double", vec![b.int(10)]),
                b.call_named("triple", vec![b.int(1)]),
            ))])
            .declare();
        let declarations = vec![
            b.import(library_location(), &["double"]),
            b.import(library_location(), &["triple"]),
            main,
        ];
        let builder = h.builder(declarations).import_resolver(library.clone());
        let mut interpreter = h.finish(builder);

        assert_eq!(interpreter.invoke("main", Vec::new()).unwrap(), Value::int(23));
        assert_eq!(interpreter.invoke("main", Vec::new()).unwrap(), Value::int(23));
        assert_eq!(library.resolved.get(), 1);
    }

    #[test]
    fn importing_an_undeclared_name_fails() {
        let h = Harness::new();
        let b = &h.b;
        let library = Rc::new(Library::new(b));
        let builder = h
            .builder(vec![b.import(library_location(), &["halve"])])
            .import_resolver(library);
        let mut interpreter = h.finish(builder);
        let err = interpreter.interpret().unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::ImportFailed { .. }));
    }

    #[test]
    fn resolver_errors_become_import_failures() {
        let h = Harness::new();
        let b = &h.b;
        let library = Rc::new(Library::new(b));
        let elsewhere = Location::address(ACCOUNT, "Other");
        let builder = h
            .builder(vec![b.import(elsewhere, &["double"])])
            .import_resolver(library);
        let mut interpreter = h.finish(builder);
        let err = interpreter.interpret().unwrap_err();
        assert!(matches!(
            err.kind,
            EvalErrorKind::ImportFailed { ref message, .. } if message.contains("no program")
        ));
    }

    #[test]
    fn imported_resources_are_created_only_by_their_program() {
        let h = Harness::new();
        let b = &h.b;
        let library = Rc::new(Library::new(b));
        let minted = b
            .function("minted")
            .body(vec![
                b.let_move("coin", b.call_named("mint", vec![])),
                b.destroy(b.ident("coin")),
            ])
            .declare();
        let forged = b
            .function("forged")
            .body(vec![
                b.let_move("coin", b.create("Coin", vec![])),
                b.destroy(b.ident("coin")),
            ])
            .declare();
        let declarations = vec![
            b.import(library_location(), &["Coin", "mint"]),
            minted,
            forged,
        ];
        let builder = h.builder(declarations).import_resolver(library);
        let mut interpreter = h.finish(builder);

        interpreter.invoke("minted", Vec::new()).unwrap();
        let err = interpreter.invoke("forged", Vec::new()).unwrap_err();
        assert!(matches!(
            err.kind,
            EvalErrorKind::ResourceConstruction { .. }
        ));
    }

    #[test]
    fn importing_without_a_resolver_fails() {
        let h = Harness::new();
        let b = &h.b;
        let mut interpreter = h.interpreter(vec![b.import(library_location(), &["double"])]);
        let err = interpreter.interpret().unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::ImportUnavailable { .. }));
    }
}

mod contracts {
    use super::*;
    use pretty_assertions::assert_eq;

    struct OpeningBalance;

    impl ContractValueHandler for OpeningBalance {
        fn initializer_arguments(
            &self,
            type_id: &TypeId,
            _location: &Location,
        ) -> Result<Vec<Value>, HostError> {
            assert_eq!(type_id.identifier(), "Bank");
            Ok(vec![Value::int(10)])
        }
    }

    fn bank(h: &Harness) -> Declaration {
        let b = &h.b;
        b.composite("Bank", CompositeKind::Contract)
            .field("total", StaticType::int())
            .initializer(
                b.initializer()
                    .param("total", StaticType::int())
                    .body(vec![
                        h.note_stmt("init"),
                        b.assign(b.member(b.ident("self"), "total"), b.ident("total")),
                    ])
                    .build(),
            )
            .declare()
    }

    #[test]
    fn contract_initializes_lazily_and_once() {
        let h = Harness::at(Location::address(ACCOUNT, "Bank"));
        let b = &h.b;
        let main = b
            .function("main")
            .returns(StaticType::int())
            .body(vec![b.ret(b.add(
                b.member(b.ident("Bank"), "total"),
                b.member(b.ident("Bank"), "total"),
            ))])
            .declare();
        let builder = h
            .builder(vec![bank(&h), main])
            .contract_value_handler(Rc::new(OpeningBalance));
        let mut interpreter = h.finish(builder);

        interpreter.interpret().unwrap();
        assert!(h.trace.entries().is_empty());
        assert_eq!(interpreter.invoke("main", Vec::new()).unwrap(), Value::int(20));
        assert_eq!(h.trace.entries(), vec!["init"]);
    }

    #[test]
    fn contract_is_owned_by_its_account() {
        let h = Harness::at(Location::address(ACCOUNT, "Bank"));
        let b = &h.b;
        let main = b
            .function("main")
            .returns(StaticType::optional(StaticType::Address))
            .body(vec![b.ret(b.member(b.ident("Bank"), "owner"))])
            .declare();
        let builder = h
            .builder(vec![bank(&h), main])
            .contract_value_handler(Rc::new(OpeningBalance));
        let mut interpreter = h.finish(builder);
        assert_eq!(
            interpreter.invoke("main", Vec::new()).unwrap(),
            Value::some(Value::Address(ACCOUNT))
        );
    }
}

mod enums {
    use super::*;
    use pretty_assertions::assert_eq;

    fn color(b: &AstBuilder) -> Declaration {
        b.composite("Color", CompositeKind::Enum)
            .raw_type(IntegerKind::UInt8)
            .case("red", 0)
            .case("green", 1)
            .declare()
    }

    #[test]
    fn case_exposes_its_raw_value() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.member(b.member(b.ident("Color"), "green"), "rawValue"))];
        let value = h
            .run_main(vec![color(b)], StaticType::Integer(IntegerKind::UInt8), body)
            .unwrap();
        assert_eq!(value.static_type(), StaticType::Integer(IntegerKind::UInt8));
        let rendered = h.interpreter(vec![color(b)]).render(&value);
        assert_eq!(rendered, "1");
    }

    #[test]
    fn constructor_finds_case_by_raw_value() {
        let h = Harness::new();
        let b = &h.b;
        let lookup = |raw: i64| {
            vec![b.ret(b.optional_member(
                b.call_named("Color", vec![b.int_of(IntegerKind::UInt8, raw)]),
                "rawValue",
            ))]
        };
        let optional_raw = StaticType::optional(StaticType::Integer(IntegerKind::UInt8));

        let found = h
            .run_main(vec![color(b)], optional_raw.clone(), lookup(0))
            .unwrap();
        assert!(matches!(found, Value::Some(_)));

        let missing = h.run_main(vec![color(b)], optional_raw, lookup(7)).unwrap();
        assert_eq!(missing, Value::Nil);
    }
}

mod uuids {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(b: &AstBuilder) -> Declaration {
        b.composite("Token", CompositeKind::Resource).declare()
    }

    #[test]
    fn resources_get_sequential_uuids() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("first", b.create("Token", vec![])),
            b.let_move("second", b.create("Token", vec![])),
            b.let_("ids", b.array(
                vec![
                    b.member(b.ident("first"), "uuid"),
                    b.member(b.ident("second"), "uuid"),
                ],
                StaticType::Integer(IntegerKind::UInt64),
            )),
            b.destroy(b.ident("first")),
            b.destroy(b.ident("second")),
            b.ret(b.ident("ids")),
        ];
        let ids = h
            .run_main(
                vec![token(b)],
                StaticType::array(StaticType::Integer(IntegerKind::UInt64)),
                body,
            )
            .unwrap();
        assert_eq!(h.interpreter(Vec::new()).render(&ids), "[1, 2]");
    }

    #[test]
    fn creating_a_resource_needs_a_generator() {
        let h = Harness::new();
        let b = &h.b;
        let main = b
            .function("main")
            .body(vec![
                b.let_move("token", b.create("Token", vec![])),
                b.destroy(b.ident("token")),
            ])
            .declare();
        let builder =
            InterpreterBuilder::new(b.interner().clone(), b.program(vec![token(b), main]));
        let mut interpreter = h.finish(builder);
        let err = interpreter.invoke("main", Vec::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UuidUnavailable);
    }
}

mod hooks {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Stamp;

    impl InjectedFieldsHandler for Stamp {
        fn injected_fields(
            &self,
            type_id: &TypeId,
            kind: CompositeKind,
            _location: &Location,
        ) -> Vec<(String, Value)> {
            if kind == CompositeKind::Structure && type_id.identifier() == "Receipt" {
                vec![("issuer".to_string(), Value::Address(ACCOUNT))]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn injected_members_are_readable() {
        let h = Harness::new();
        let b = &h.b;
        let receipt = b
            .composite("Receipt", CompositeKind::Structure)
            .field("amount", StaticType::int())
            .declare();
        let main = b
            .function("main")
            .returns(StaticType::Address)
            .body(vec![b.ret(b.member(
                b.call_named("Receipt", vec![b.int(3)]),
                "issuer",
            ))])
            .declare();
        let builder = h
            .builder(vec![receipt, main])
            .injected_fields_handler(Rc::new(Stamp));
        let mut interpreter = h.finish(builder);
        assert_eq!(
            interpreter.invoke("main", Vec::new()).unwrap(),
            Value::Address(ACCOUNT)
        );
    }

    #[derive(Default)]
    struct CallLog(RefCell<Vec<String>>);

    impl InvocationObserver for CallLog {
        fn on_invoke(&self, name: &str, depth: usize) {
            self.0.borrow_mut().push(format!("enter {name} {depth}"));
        }

        fn on_return(&self, name: &str, depth: usize, succeeded: bool) {
            self.0
                .borrow_mut()
                .push(format!("leave {name} {depth} {succeeded}"));
        }
    }

    #[test]
    fn observer_sees_nested_calls() {
        let h = Harness::new();
        let b = &h.b;
        let inner = b
            .function("inner")
            .returns(StaticType::int())
            .body(vec![b.ret(b.int(1))])
            .declare();
        let outer = b
            .function("outer")
            .returns(StaticType::int())
            .body(vec![b.ret(b.call_named("inner", vec![]))])
            .declare();
        let log = Rc::new(CallLog::default());
        let builder = h
            .builder(vec![inner, outer])
            .invocation_observer(log.clone());
        let mut interpreter = h.finish(builder);
        interpreter.invoke("outer", Vec::new()).unwrap();
        assert_eq!(
            *log.0.borrow(),
            vec![
                "enter outer 1",
                "enter inner 2",
                "leave inner 2 true",
                "leave outer 1 true",
            ]
        );
    }
}

mod storage {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vault(b: &AstBuilder) -> Declaration {
        b.composite("Vault", CompositeKind::Resource)
            .field("balance", StaticType::int())
            .declare()
    }

    fn path(b: &AstBuilder) -> cinder_ir::ast::Expr {
        b.path(PathDomain::Storage, "vault")
    }

    #[test]
    fn programs_save_borrow_and_load() {
        let h = Harness::new();
        let b = &h.b;
        let vault_ref = StaticType::reference(false, b.resource_type("Vault"));
        let body = vec![
            b.expr_stmt(b.call_named(
                "save",
                vec![
                    b.address(0x42),
                    path(b),
                    b.mv(b.create("Vault", vec![b.int(30)])),
                ],
            )),
            b.let_(
                "borrowed",
                b.force_unwrap(b.call_named(
                    "borrow",
                    vec![b.address(0x42), path(b), b.type_value(vault_ref)],
                )),
            ),
            b.let_("balance", b.member(b.ident("borrowed"), "balance")),
            b.let_move(
                "loaded",
                b.force_unwrap(b.call_named(
                    "load",
                    vec![
                        b.address(0x42),
                        path(b),
                        b.type_value(b.resource_type("Vault")),
                    ],
                )),
            ),
            b.destroy(b.ident("loaded")),
            b.if_(
                b.call_named(
                    "check",
                    vec![
                        b.address(0x42),
                        path(b),
                        b.type_value(b.resource_type("Vault")),
                    ],
                ),
                vec![b.ret(b.int(-1))],
                None,
            ),
            b.ret(b.ident("balance")),
        ];
        let result = h.run_main(vec![vault(b)], StaticType::int(), body);
        assert_eq!(result.unwrap(), Value::int(30));
    }

    #[test]
    fn saved_resource_survives_the_invocation() {
        let h = Harness::new();
        let b = &h.b;
        let stash = b
            .function("stash")
            .body(vec![b.expr_stmt(b.call_named(
                "save",
                vec![
                    b.address(0x42),
                    path(b),
                    b.mv(b.create("Vault", vec![b.int(1)])),
                ],
            ))])
            .declare();
        let builder = h.builder(vec![vault(b), stash]).validate_storage(true);
        let mut interpreter = h.finish(builder);
        interpreter.invoke("stash", Vec::new()).unwrap();

        let vault_type = b.resource_type("Vault");
        let key = interpreter.storage_path("vault");
        assert!(interpreter.check(ACCOUNT, key.clone(), &vault_type).unwrap());

        let err = interpreter.invoke("stash", Vec::new()).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::Overwrite { .. }));
    }

    #[test]
    fn health_check_reports_orphan_slabs() {
        let h = Harness::new();
        let b = &h.b;
        let noop = b.function("noop").body(vec![]).declare();
        let builder = h.builder(vec![noop]).validate_storage(true);
        let mut interpreter = h.finish(builder);
        interpreter.invoke("noop", Vec::new()).unwrap();

        interpreter
            .storage_handle()
            .borrow_mut()
            .allocate_slab(Some(ACCOUNT));
        let err = interpreter.invoke("noop", Vec::new()).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::StorageHealth { .. }));
    }
}
