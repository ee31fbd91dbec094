//! End-to-end tests for linear resources: moves, loss, destruction order,
//! reference invalidation and inherited conditions.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use std::rc::Rc;

use cinder_eval::{
    ConditionOrdering, CounterUuidGenerator, EvalErrorKind, InterpreterBuilder, Value,
};
use cinder_ir::ast::{Declaration, Transfer};
use cinder_ir::{AstBuilder, CompositeKind, StaticType};
use common::Harness;

/// `resource R { let v: Int }`
fn r(b: &AstBuilder) -> Declaration {
    b.composite("R", CompositeKind::Resource)
        .field("v", StaticType::int())
        .declare()
}

mod moves {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn use_after_move_fails() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("a", b.create("R", vec![b.int(1)])),
            b.let_move("moved", b.ident("a")),
            b.destroy(b.ident("moved")),
            b.destroy(b.ident("a")),
        ];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::InvalidatedResource { name: "a".into() }
        );
    }

    #[test]
    fn copying_a_resource_fails() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("a", b.create("R", vec![b.int(1)])),
            b.let_("copy", b.ident("a")),
        ];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::ResourceCopy { .. }));
    }

    #[test]
    fn swap_exchanges_resources() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.var_move("left", b.create("R", vec![b.int(1)])),
            b.var_move("right", b.create("R", vec![b.int(2)])),
            b.swap(b.ident("left"), b.ident("right")),
            b.let_("v", b.member(b.ident("left"), "v")),
            b.destroy(b.ident("left")),
            b.destroy(b.ident("right")),
            b.ret(b.ident("v")),
        ];
        assert_eq!(
            h.run_main(vec![r(b)], StaticType::int(), body).unwrap(),
            Value::int(2)
        );
    }

    #[test]
    fn resources_move_out_of_arrays() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.var_move(
                "rs",
                b.array(
                    vec![
                        b.mv(b.create("R", vec![b.int(1)])),
                        b.mv(b.create("R", vec![b.int(2)])),
                    ],
                    b.resource_type("R"),
                ),
            ),
            b.let_move("first", b.method(b.ident("rs"), "removeFirst", vec![])),
            b.let_("v", b.member(b.ident("first"), "v")),
            b.let_("left", b.member(b.ident("rs"), "length")),
            b.destroy(b.ident("first")),
            b.destroy(b.ident("rs")),
            b.ret(b.add(b.mul(b.ident("v"), b.int(10)), b.ident("left"))),
        ];
        assert_eq!(
            h.run_main(vec![r(b)], StaticType::int(), body).unwrap(),
            Value::int(11)
        );
    }
}

mod loss {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unconsumed_local_is_lost() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.let_move("kept", b.create("R", vec![b.int(1)]))];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ResourceLoss { name: "kept".into() });
    }

    #[test]
    fn unconsumed_parameter_is_lost() {
        let h = Harness::new();
        let b = &h.b;
        let take = b
            .function("take")
            .param("r", b.resource_type("R"))
            .body(vec![])
            .declare();
        let body = vec![b.expr_stmt(b.call_named(
            "take",
            vec![b.mv(b.create("R", vec![b.int(1)]))],
        ))];
        let err = h
            .run_main(vec![r(b), take], StaticType::Void, body)
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ResourceLoss { name: "r".into() });
    }

    #[test]
    fn overwriting_a_resource_is_a_loss() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.var_move("a", b.create("R", vec![b.int(1)])),
            b.move_assign(b.ident("a"), b.create("R", vec![b.int(2)])),
        ];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::ResourceLoss { .. }));
    }

    #[test]
    fn force_assignment_requires_nil() {
        let h = Harness::new();
        let b = &h.b;
        let slot = |b: &AstBuilder| {
            b.local_typed(
                "slot",
                StaticType::optional(b.resource_type("R")),
                false,
                Transfer::Move,
                b.nil(),
            )
        };

        let body = vec![
            slot(b),
            b.force_assign(b.ident("slot"), b.create("R", vec![b.int(1)])),
            b.destroy(b.ident("slot")),
        ];
        h.run_main(vec![r(b)], StaticType::Void, body).unwrap();

        let body = vec![
            slot(b),
            b.force_assign(b.ident("slot"), b.create("R", vec![b.int(1)])),
            b.force_assign(b.ident("slot"), b.create("R", vec![b.int(2)])),
        ];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ForceAssignmentToNonNil);
    }

    #[test]
    fn discarded_creation_is_a_loss() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.expr_stmt(b.create("R", vec![b.int(1)]))];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::ResourceLoss { .. }));
    }

    #[test]
    fn discarded_call_result_is_a_loss() {
        let h = Harness::new();
        let b = &h.b;
        let make = b
            .function("make")
            .returns(b.resource_type("R"))
            .body(vec![b.ret(b.create("R", vec![b.int(1)]))])
            .declare();
        let body = vec![b.expr_stmt(b.call_named("make", vec![]))];
        let err = h
            .run_main(vec![r(b), make], StaticType::Void, body)
            .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::ResourceLoss { .. }));
    }
}

mod references {
    use super::*;
    use pretty_assertions::assert_eq;

    fn borrowed(b: &AstBuilder) -> cinder_ir::ast::Stmt {
        b.let_(
            "borrowed",
            b.reference(
                b.ident("owned"),
                StaticType::reference(false, b.resource_type("R")),
            ),
        )
    }

    #[test]
    fn reference_reads_through_to_the_resource() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("owned", b.create("R", vec![b.int(7)])),
            borrowed(b),
            b.let_("v", b.member(b.ident("borrowed"), "v")),
            b.destroy(b.ident("owned")),
            b.ret(b.ident("v")),
        ];
        assert_eq!(
            h.run_main(vec![r(b)], StaticType::int(), body).unwrap(),
            Value::int(7)
        );
    }

    #[test]
    fn moving_the_resource_invalidates_references() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("owned", b.create("R", vec![b.int(7)])),
            borrowed(b),
            b.let_move("moved", b.ident("owned")),
            b.let_("v", b.member(b.ident("borrowed"), "v")),
            b.destroy(b.ident("moved")),
        ];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidatedResourceReference);
    }

    #[test]
    fn destroying_the_resource_invalidates_references() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("owned", b.create("R", vec![b.int(7)])),
            borrowed(b),
            b.destroy(b.ident("owned")),
            b.ret(b.member(b.ident("borrowed"), "v")),
        ];
        let err = h.run_main(vec![r(b)], StaticType::int(), body).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidatedResourceReference);
    }
}

mod destruction {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token_program(h: &Harness) -> Vec<Declaration> {
        let b = &h.b;
        let burned = b
            .composite("Burned", CompositeKind::Event)
            .field("amount", StaticType::int())
            .declare();
        let burnable = b
            .interface("Burnable", CompositeKind::Resource)
            .destructor(b.destructor().body(vec![h.note_stmt("default")]).build())
            .declare();
        let child = b
            .composite("Child", CompositeKind::Resource)
            .destructor(b.destructor().body(vec![h.note_stmt("child")]).build())
            .declare();
        let token = b
            .composite("Token", CompositeKind::Resource)
            .conforms("Burnable")
            .field("amount", StaticType::int())
            .field("child", b.resource_type("Child"))
            .destroy_event("Burned", vec![("amount", b.member(b.ident("self"), "amount"))])
            .destructor(b.destructor().body(vec![h.note_stmt("concrete")]).build())
            .declare();
        vec![burned, burnable, child, token]
    }

    #[test]
    fn destroy_runs_event_defaults_destructor_then_fields() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move(
                "token",
                b.create("Token", vec![b.int(5), b.mv(b.create("Child", vec![]))]),
            ),
            b.destroy(b.ident("token")),
        ];
        h.run_main(token_program(&h), StaticType::Void, body)
            .unwrap();
        assert_eq!(
            h.trace.entries(),
            vec!["event:Burned", "default", "concrete", "child"]
        );
    }

    #[test]
    fn destroy_event_without_handler_fails() {
        let h = Harness::new();
        let b = &h.b;
        let mut declarations = token_program(&h);
        declarations.push(
            b.function("main")
                .body(vec![
                    b.let_move(
                        "token",
                        b.create("Token", vec![b.int(5), b.mv(b.create("Child", vec![]))]),
                    ),
                    b.destroy(b.ident("token")),
                ])
                .declare(),
        );
        let builder = InterpreterBuilder::new(b.interner().clone(), b.program(declarations))
            .uuid_generator(Rc::new(CounterUuidGenerator::new()));
        let mut interpreter = h.finish(builder);
        let err = interpreter.invoke("main", Vec::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::EventEmissionUnavailable);
        assert!(h.trace.entries().is_empty());
    }

    #[test]
    fn destroying_a_moved_resource_fails() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("a", b.create("R", vec![b.int(1)])),
            b.destroy(b.ident("a")),
            b.destroy(b.ident("a")),
        ];
        let err = h.run_main(vec![r(b)], StaticType::Void, body).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::InvalidatedResource { name: "a".into() }
        );
    }

    /// `resource D {}` whose destructor notes `"d"`.
    fn noisy(h: &Harness) -> Declaration {
        h.b.composite("D", CompositeKind::Resource)
            .destructor(h.b.destructor().body(vec![h.note_stmt("d")]).build())
            .declare()
    }

    #[test]
    fn destroying_an_array_destroys_each_element_once() {
        let h = Harness::new();
        let b = &h.b;
        let elements = (0..3).map(|_| b.mv(b.create("D", vec![]))).collect();
        let body = vec![
            b.let_move("ds", b.array(elements, b.resource_type("D"))),
            b.destroy(b.ident("ds")),
        ];
        h.run_main(vec![noisy(&h)], StaticType::Void, body).unwrap();
        assert_eq!(h.trace.entries(), vec!["d", "d", "d"]);
    }

    #[test]
    fn destroying_a_dictionary_destroys_each_value_once() {
        let h = Harness::new();
        let b = &h.b;
        let entries = ["a", "b", "c"]
            .iter()
            .map(|key| (b.string(key), b.mv(b.create("D", vec![]))))
            .collect();
        let body = vec![
            b.let_move(
                "ds",
                b.dictionary(entries, StaticType::String, b.resource_type("D")),
            ),
            b.destroy(b.ident("ds")),
        ];
        h.run_main(vec![noisy(&h)], StaticType::Void, body).unwrap();
        assert_eq!(h.trace.entries(), vec!["d", "d", "d"]);
    }

    #[test]
    fn destroying_nil_is_a_no_op() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.local_typed(
                "maybe",
                StaticType::optional(b.resource_type("D")),
                true,
                Transfer::Move,
                b.nil(),
            ),
            b.destroy(b.ident("maybe")),
        ];
        h.run_main(vec![noisy(&h)], StaticType::Void, body).unwrap();
        assert!(h.trace.entries().is_empty());
    }

    #[test]
    fn destroying_empty_containers_is_a_no_op() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_move("ds", b.array(vec![], b.resource_type("D"))),
            b.let_move(
                "named",
                b.dictionary(vec![], StaticType::String, b.resource_type("D")),
            ),
            b.destroy(b.ident("ds")),
            b.destroy(b.ident("named")),
        ];
        h.run_main(vec![noisy(&h)], StaticType::Void, body).unwrap();
        assert!(h.trace.entries().is_empty());
    }
}

mod conditions {
    use super::*;
    use pretty_assertions::assert_eq;

    fn guarded_door(h: &Harness) -> Vec<Declaration> {
        let b = &h.b;
        let guarded = b
            .interface("Guarded", CompositeKind::Resource)
            .function(b.function("open").pre(h.note("interface"), None).build())
            .declare();
        let door = b
            .composite("Door", CompositeKind::Resource)
            .conforms("Guarded")
            .function(
                b.function("open")
                    .pre(h.note("own"), None)
                    .body(vec![h.note_stmt("body")])
                    .build(),
            )
            .declare();
        let main = b
            .function("main")
            .body(vec![
                b.let_move("door", b.create("Door", vec![])),
                b.expr_stmt(b.method(b.ident("door"), "open", vec![])),
                b.destroy(b.ident("door")),
            ])
            .declare();
        vec![guarded, door, main]
    }

    #[test]
    fn own_conditions_run_first_by_default() {
        let h = Harness::new();
        let mut interpreter = h.interpreter(guarded_door(&h));
        interpreter.invoke("main", Vec::new()).unwrap();
        assert_eq!(h.trace.entries(), vec!["own", "interface", "body"]);
    }

    #[test]
    fn interface_conditions_can_run_first() {
        let h = Harness::new();
        let builder = h
            .builder(guarded_door(&h))
            .condition_ordering(ConditionOrdering::InterfaceFirst);
        let mut interpreter = h.finish(builder);
        interpreter.invoke("main", Vec::new()).unwrap();
        assert_eq!(h.trace.entries(), vec!["interface", "own", "body"]);
    }

    #[test]
    fn inherited_pre_condition_failure_stops_the_call() {
        let h = Harness::new();
        let b = &h.b;
        let positive = b
            .interface("Positive", CompositeKind::Resource)
            .function(
                b.function("spend")
                    .param("amount", StaticType::int())
                    .pre(b.gt(b.ident("amount"), b.int(0)), None)
                    .build(),
            )
            .declare();
        let wallet = b
            .composite("Wallet", CompositeKind::Resource)
            .conforms("Positive")
            .function(
                b.function("spend")
                    .param("amount", StaticType::int())
                    .body(vec![h.note_stmt("spent")])
                    .build(),
            )
            .declare();
        let body = vec![
            b.let_move("wallet", b.create("Wallet", vec![])),
            b.expr_stmt(b.method(b.ident("wallet"), "spend", vec![b.int(0)])),
            b.destroy(b.ident("wallet")),
        ];
        let err = h
            .run_main(vec![positive, wallet], StaticType::Void, body)
            .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::Condition { .. }));
        assert!(h.trace.entries().is_empty());
    }
}
