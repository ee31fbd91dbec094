//! End-to-end tests for the executor: control flow, functions, closures,
//! conditions, casts, globals and limits.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use std::rc::Rc;

use cinder_eval::{ComputationKind, EvalErrorKind, LimitMeter, Value};
use cinder_ir::ast::{BinaryOp, CastKind, ConditionKind, Declaration, Transfer};
use cinder_ir::{AstBuilder, CompositeKind, IntegerKind, StaticType};
use common::Harness;

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recursive_fibonacci() {
        let h = Harness::new();
        let b = &h.b;
        let fib = b
            .function("fib")
            .param("n", StaticType::int())
            .returns(StaticType::int())
            .body(vec![
                b.if_(
                    b.lt(b.ident("n"), b.int(2)),
                    vec![b.ret(b.ident("n"))],
                    None,
                ),
                b.ret(b.add(
                    b.call_named("fib", vec![b.sub(b.ident("n"), b.int(1))]),
                    b.call_named("fib", vec![b.sub(b.ident("n"), b.int(2))]),
                )),
            ])
            .declare();
        let mut interpreter = h.interpreter(vec![fib]);
        assert_eq!(
            interpreter.invoke("fib", vec![Value::int(14)]).unwrap(),
            Value::int(377)
        );
    }

    #[test]
    fn iterative_factorial() {
        let h = Harness::new();
        let b = &h.b;
        let factorial = b
            .function("factorial")
            .param("n", StaticType::int())
            .returns(StaticType::int())
            .body(vec![
                b.var("acc", b.int(1)),
                b.var("i", b.ident("n")),
                b.while_(
                    b.gt(b.ident("i"), b.int(1)),
                    vec![
                        b.assign(b.ident("acc"), b.mul(b.ident("acc"), b.ident("i"))),
                        b.assign(b.ident("i"), b.sub(b.ident("i"), b.int(1))),
                    ],
                ),
                b.ret(b.ident("acc")),
            ])
            .declare();
        let mut interpreter = h.interpreter(vec![factorial]);
        assert_eq!(
            interpreter.invoke("factorial", vec![Value::int(5)]).unwrap(),
            Value::int(120)
        );
    }

    #[test]
    fn closures_capture_their_defining_scope() {
        let h = Harness::new();
        let b = &h.b;
        let counter = b
            .function("counter")
            .returns(StaticType::function(Vec::new(), StaticType::int()))
            .body(vec![
                b.var("count", b.int(0)),
                b.ret(b.closure(
                    b.function("next")
                        .returns(StaticType::int())
                        .body(vec![
                            b.assign(b.ident("count"), b.add(b.ident("count"), b.int(1))),
                            b.ret(b.ident("count")),
                        ])
                        .build(),
                )),
            ])
            .declare();
        let body = vec![
            b.let_("next", b.call_named("counter", vec![])),
            b.expr_stmt(b.call_named("next", vec![])),
            b.ret(b.call_named("next", vec![])),
        ];
        let result = h.run_main(vec![counter], StaticType::int(), body);
        assert_eq!(result.unwrap(), Value::int(2));
    }

    #[test]
    fn nested_function_declarations_are_local() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.function_stmt(
                b.function("twice")
                    .param("x", StaticType::int())
                    .returns(StaticType::int())
                    .body(vec![b.ret(b.mul(b.ident("x"), b.int(2)))])
                    .build(),
            ),
            b.ret(b.call_named("twice", vec![b.int(21)])),
        ];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::int(), body).unwrap(),
            Value::int(42)
        );
    }

    #[test]
    fn wrong_argument_count_fails() {
        let h = Harness::new();
        let b = &h.b;
        let id = b
            .function("id")
            .param("x", StaticType::int())
            .returns(StaticType::int())
            .body(vec![b.ret(b.ident("x"))])
            .declare();
        let mut interpreter = h.interpreter(vec![id]);
        let err = interpreter.invoke("id", Vec::new()).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::ArgumentCount {
                expected: 1,
                got: 0
            }
        );
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn for_loop_with_index_break_and_continue() {
        let h = Harness::new();
        let b = &h.b;
        let values = b.array(
            vec![b.int(10), b.int(11), b.int(12), b.int(13), b.int(14)],
            StaticType::int(),
        );
        let body = vec![
            b.var("sum", b.int(0)),
            b.for_in_indexed(
                "i",
                "x",
                values,
                vec![
                    b.if_(b.eq(b.ident("i"), b.int(1)), vec![b.continue_()], None),
                    b.if_(b.eq(b.ident("i"), b.int(3)), vec![b.break_()], None),
                    b.assign(b.ident("sum"), b.add(b.ident("sum"), b.ident("x"))),
                ],
            ),
            b.ret(b.ident("sum")),
        ];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::int(), body).unwrap(),
            Value::int(22)
        );
    }

    #[test]
    fn for_loop_over_string_yields_characters() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.var("reversed", b.string("")),
            b.for_in(
                "c",
                b.string("abc"),
                vec![b.assign(
                    b.ident("reversed"),
                    b.add(b.method(b.ident("c"), "toString", vec![]), b.ident("reversed")),
                )],
            ),
            b.ret(b.ident("reversed")),
        ];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::String, body).unwrap(),
            Value::string("cba")
        );
    }

    #[test]
    fn switch_runs_matching_case_or_default() {
        let h = Harness::new();
        let b = &h.b;
        let classify = b
            .function("classify")
            .param("n", StaticType::int())
            .returns(StaticType::String)
            .body(vec![
                b.switch(
                    b.ident("n"),
                    vec![
                        (Some(b.int(1)), vec![b.ret(b.string("one"))]),
                        (Some(b.int(2)), vec![b.break_()]),
                        (None, vec![b.ret(b.string("many"))]),
                    ],
                ),
                b.ret(b.string("two")),
            ])
            .declare();
        let mut interpreter = h.interpreter(vec![classify]);
        let mut classify = |n| interpreter.invoke("classify", vec![Value::int(n)]).unwrap();
        assert_eq!(classify(1), Value::string("one"));
        assert_eq!(classify(2), Value::string("two"));
        assert_eq!(classify(7), Value::string("many"));
    }

    #[test]
    fn if_let_binds_the_unwrapped_value() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_(
                "d",
                b.dictionary(
                    vec![(b.string("k"), b.int(3))],
                    StaticType::String,
                    StaticType::int(),
                ),
            ),
            b.if_let(
                "v",
                Transfer::Copy,
                b.index(b.ident("d"), b.string("k")),
                vec![b.ret(b.ident("v"))],
                Some(vec![b.ret(b.int(0))]),
            ),
        ];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::int(), body).unwrap(),
            Value::int(3)
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.let_("a", b.and(b.boolean(false), h.note("and"))),
            b.let_("o", b.or(b.boolean(true), h.note("or"))),
            b.let_(
                "c",
                b.coalesce(
                    b.cast(b.int(1), StaticType::optional(StaticType::int()), CastKind::Static),
                    b.call_named("note", vec![b.string("coalesce")]),
                ),
            ),
            b.ret(b.and(b.not(b.ident("a")), b.ident("o"))),
        ];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::Bool, body).unwrap(),
            Value::Bool(true)
        );
        assert!(h.trace.entries().is_empty());
    }

    #[test]
    fn conditional_expression() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.conditional(
            b.binary(BinaryOp::LtEq, b.int(2), b.int(2)),
            b.string("yes"),
            b.string("no"),
        ))];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::String, body).unwrap(),
            Value::string("yes")
        );
    }

    #[test]
    fn block_scope_ends_with_the_block() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            b.var("x", b.int(1)),
            b.block_stmt(vec![
                b.let_("x", b.int(2)),
                b.let_("inner", b.int(3)),
            ]),
            b.ret(b.ident("x")),
        ];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::int(), body).unwrap(),
            Value::int(1)
        );

        let body = vec![
            b.block_stmt(vec![b.let_("inner", b.int(3))]),
            b.ret(b.ident("inner")),
        ];
        let err = h.run_main(Vec::new(), StaticType::int(), body).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::UndefinedVariable { name: "inner".into() }
        );
    }
}

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn array_index_past_end() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.index(
            b.array(vec![b.int(1), b.int(2)], StaticType::int()),
            b.int(2),
        ))];
        let err = h.run_main(Vec::new(), StaticType::int(), body).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::ArrayIndexOutOfBounds { index: 2, size: 2 }
        );
        assert!(err.location.is_some());
    }

    #[test]
    fn negative_array_index() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.index(
            b.array(vec![b.int(1), b.int(2)], StaticType::int()),
            b.negate(b.int(1)),
        ))];
        let err = h.run_main(Vec::new(), StaticType::int(), body).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::ArrayIndexOutOfBounds { index: -1, size: 2 }
        );
    }

    #[test]
    fn force_unwrap_of_nil() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.force_unwrap(b.nil()))];
        let err = h.run_main(Vec::new(), StaticType::int(), body).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ForceNil);
    }

    #[test]
    fn fixed_width_overflow() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.add(
            b.int_of(IntegerKind::UInt8, 255),
            b.int_of(IntegerKind::UInt8, 1),
        ))];
        let err = h
            .run_main(Vec::new(), StaticType::Integer(IntegerKind::UInt8), body)
            .unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::Overflow {
                type_name: "UInt8".into()
            }
        );
    }

    #[test]
    fn assignment_to_constant() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.let_("x", b.int(1)), b.assign(b.ident("x"), b.int(2))];
        let err = h.run_main(Vec::new(), StaticType::Void, body).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::ConstantAssignment { name: "x".into() }
        );
    }

    #[test]
    fn errors_leaving_functions_carry_a_backtrace() {
        let h = Harness::new();
        let b = &h.b;
        let fail = b
            .function("fail")
            .body(vec![b.expr_stmt(b.force_unwrap(b.nil()))])
            .declare();
        let body = vec![b.expr_stmt(b.call_named("fail", vec![]))];
        let err = h.run_main(vec![fail], StaticType::Void, body).unwrap_err();
        let backtrace = err.backtrace.unwrap();
        let names: Vec<&str> = backtrace.frames().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["fail", "main"]);
    }
}

mod casts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failable_cast_yields_nil_on_mismatch() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.cast(
            b.cast(b.int(1), StaticType::AnyStruct, CastKind::Static),
            StaticType::String,
            CastKind::Failable,
        ))];
        assert_eq!(
            h.run_main(Vec::new(), StaticType::optional(StaticType::String), body)
                .unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn force_cast_fails_on_mismatch() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.cast(b.int(1), StaticType::String, CastKind::Force))];
        let err = h
            .run_main(Vec::new(), StaticType::String, body)
            .unwrap_err();
        assert!(matches!(
            err.kind,
            EvalErrorKind::ForceCastTypeMismatch { .. }
        ));
    }

    #[test]
    fn integer_conversion_functions() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![b.ret(b.call_named("UInt8", vec![b.int(200)]))];
        let value = h
            .run_main(Vec::new(), StaticType::Integer(IntegerKind::UInt8), body)
            .unwrap();
        assert_eq!(value.static_type(), StaticType::Integer(IntegerKind::UInt8));

        let body = vec![b.ret(b.call_named("UInt8", vec![b.int(300)]))];
        let err = h
            .run_main(Vec::new(), StaticType::Integer(IntegerKind::UInt8), body)
            .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::Overflow { .. }));
    }
}

mod conditions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failing_pre_condition_reports_message() {
        let h = Harness::new();
        let b = &h.b;
        let withdraw = b
            .function("withdraw")
            .param("amount", StaticType::int())
            .pre(
                b.gt(b.ident("amount"), b.int(0)),
                Some(b.string("amount must be positive")),
            )
            .body(vec![])
            .declare();
        let mut interpreter = h.interpreter(vec![withdraw]);
        interpreter.invoke("withdraw", vec![Value::int(5)]).unwrap();
        let err = interpreter
            .invoke("withdraw", vec![Value::int(0)])
            .unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::Condition {
                kind: ConditionKind::Pre,
                message: "amount must be positive".into(),
            }
        );
    }

    #[test]
    fn post_condition_sees_result_and_before() {
        let h = Harness::new();
        let b = &h.b;
        let counter = b.global_var("counter", b.int(0));
        let bump = |by: i64| {
            b.function("bump")
                .returns(StaticType::int())
                .post(
                    b.eq(b.ident("counter"), b.add(b.before(b.ident("counter")), b.int(1))),
                    None,
                )
                .post(b.eq(b.ident("result"), b.ident("counter")), None)
                .body(vec![
                    b.assign(b.ident("counter"), b.add(b.ident("counter"), b.int(by))),
                    b.ret(b.ident("counter")),
                ])
                .declare()
        };

        let mut interpreter = h.interpreter(vec![counter.clone(), bump(1)]);
        interpreter.interpret().unwrap();
        assert_eq!(interpreter.invoke("bump", Vec::new()).unwrap(), Value::int(1));

        let mut interpreter = h.interpreter(vec![counter, bump(2)]);
        interpreter.interpret().unwrap();
        let err = interpreter.invoke("bump", Vec::new()).unwrap_err();
        assert!(matches!(
            err.kind,
            EvalErrorKind::Condition {
                kind: ConditionKind::Post,
                ..
            }
        ));
    }
}

mod globals {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn globals_initialize_in_declaration_order() {
        let h = Harness::new();
        let b = &h.b;
        let first = b.global_let("first", h.note("first"));
        let second = b.global_let("second", h.note("second"));
        let mut interpreter = h.interpreter(vec![first, second]);
        interpreter.interpret().unwrap();
        assert_eq!(h.trace.entries(), vec!["first", "second"]);
        assert_eq!(interpreter.global("second").unwrap(), Value::Bool(true));
    }

    #[test]
    fn global_can_refer_to_a_later_global() {
        let h = Harness::new();
        let b = &h.b;
        let a = b.global_let("a", b.add(b.ident("b"), b.int(1)));
        let later = b.global_let("b", b.int(41));
        let mut interpreter = h.interpreter(vec![a, later]);
        interpreter.interpret().unwrap();
        assert_eq!(interpreter.global("a").unwrap(), Value::int(42));
    }

    #[test]
    fn self_referential_global_fails() {
        let h = Harness::new();
        let b = &h.b;
        let a = b.global_let("a", b.ident("a"));
        let mut interpreter = h.interpreter(vec![a]);
        let err = interpreter.interpret().unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::UseBeforeInitialization { name: "a".into() }
        );
    }
}

mod limits {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loop_limit_stops_long_loops() {
        let h = Harness::new();
        let b = &h.b;
        let spin = b
            .function("spin")
            .body(vec![
                b.var("i", b.int(0)),
                b.while_(
                    b.lt(b.ident("i"), b.int(10)),
                    vec![b.assign(b.ident("i"), b.add(b.ident("i"), b.int(1)))],
                ),
            ])
            .declare();
        let meter = Rc::new(LimitMeter::new().with_limit(ComputationKind::Loop, 3));
        let mut interpreter = h.finish(h.builder(vec![spin]).meter(meter.clone()));
        let err = interpreter.invoke("spin", Vec::new()).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::ComputationLimitExceeded {
                kind: "loop".into(),
                limit: 3
            }
        );
        assert_eq!(meter.used(ComputationKind::Loop), 4);
    }

    #[test]
    fn call_depth_limit_stops_unbounded_recursion() {
        let h = Harness::new();
        let b = &h.b;
        let down = b
            .function("down")
            .param("n", StaticType::int())
            .returns(StaticType::int())
            .body(vec![b.ret(b.call_named(
                "down",
                vec![b.add(b.ident("n"), b.int(1))],
            ))])
            .declare();
        let mut interpreter = h.finish(h.builder(vec![down]).max_call_depth(32));
        let err = interpreter.invoke("down", vec![Value::int(0)]).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::CallStackLimitExceeded { limit: 32 }
        );
        assert!(err.kind.is_fatal());
    }
}

mod optional_chaining {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `struct S { let v: Int; fun plus(x: Int): Int { return self.v + x } }`
    fn s(b: &AstBuilder) -> Declaration {
        let plus = b
            .function("plus")
            .param("x", StaticType::int())
            .returns(StaticType::int())
            .body(vec![b.ret(b.add(b.member(b.ident("self"), "v"), b.ident("x")))])
            .build();
        b.composite("S", CompositeKind::Structure)
            .field("v", StaticType::int())
            .function(plus)
            .declare()
    }

    /// `let s: S? = value`
    fn maybe_s(b: &AstBuilder, value: cinder_ir::ast::Expr) -> cinder_ir::ast::Stmt {
        b.local_typed(
            "s",
            StaticType::optional(b.struct_type("S")),
            true,
            Transfer::Copy,
            value,
        )
    }

    fn optional_int() -> StaticType {
        StaticType::optional(StaticType::int())
    }

    #[test]
    fn returned_member_of_nil_is_nil() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            maybe_s(b, b.nil()),
            b.ret(b.optional_member(b.ident("s"), "v")),
        ];
        assert_eq!(
            h.run_main(vec![s(b)], optional_int(), body).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn returned_member_of_some_is_wrapped() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            maybe_s(b, b.call_named("S", vec![b.int(7)])),
            b.ret(b.optional_member(b.ident("s"), "v")),
        ];
        assert_eq!(
            h.run_main(vec![s(b)], optional_int(), body).unwrap(),
            Value::some(Value::int(7))
        );
    }

    #[test]
    fn move_binding_follows_the_chain() {
        let h = Harness::new();
        let b = &h.b;
        let body = vec![
            maybe_s(b, b.nil()),
            b.let_move("x", b.optional_member(b.ident("s"), "v")),
            b.ret(b.ident("x")),
        ];
        assert_eq!(
            h.run_main(vec![s(b)], optional_int(), body).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn nil_receiver_skips_arguments() {
        let h = Harness::new();
        let b = &h.b;
        let argument = b.conditional(h.note("argument"), b.int(1), b.int(2));
        let body = vec![
            maybe_s(b, b.nil()),
            b.ret(b.optional_method(b.ident("s"), "plus", vec![argument])),
        ];
        assert_eq!(
            h.run_main(vec![s(b)], optional_int(), body).unwrap(),
            Value::Nil
        );
        assert!(h.trace.entries().is_empty());
    }

    #[test]
    fn present_receiver_evaluates_arguments_once() {
        let h = Harness::new();
        let b = &h.b;
        let argument = b.conditional(h.note("argument"), b.int(1), b.int(2));
        let body = vec![
            maybe_s(b, b.call_named("S", vec![b.int(7)])),
            b.ret(b.optional_method(b.ident("s"), "plus", vec![argument])),
        ];
        assert_eq!(
            h.run_main(vec![s(b)], optional_int(), body).unwrap(),
            Value::some(Value::int(8))
        );
        assert_eq!(h.trace.entries(), vec!["argument"]);
    }
}
