use mica_runtime::{AirNode, ExceptionKind, GlobalContext, Name, Script, Value, Xop};

use crate::common::{body, if_then, konst, local, name, op, op_assign, ret, run, sloc, var};

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Integer).collect())
}

#[test]
fn immutable_write_names_the_value_and_keeps_it() {
    let mut ctx = GlobalContext::new();
    ctx.define_global(name("limit"), Value::Integer(1), true).unwrap();
    let code = vec![
        AirNode::PushGlobalReference {
            sloc: sloc(),
            name: name("limit"),
        },
        konst(2),
        op(Xop::Assign),
    ];
    let err = run(&mut ctx, code).unwrap_err();
    assert_eq!(
        err.exception_kind(),
        Some(&ExceptionKind::WriteViolation {
            value: "1".to_string()
        })
    );
    let limit = ctx.get_global(&name("limit")).unwrap();
    assert_eq!(limit.dereference_readonly().unwrap(), Value::Integer(1));
}

#[test]
fn unset_of_missing_elements_yields_null() {
    let member = |text: &str| AirNode::MemberAccess {
        sloc: sloc(),
        name: name(text),
    };
    let mut ctx = GlobalContext::new();
    let code = [
        var("o", vec![konst(Value::Null)]),
        var("a", vec![konst(ints(&[1, 2]))]),
        vec![
            // unset o.a.b (null parent on the way)
            local(0, "o"),
            member("a"),
            member("b"),
            op(Xop::Unset),
            // unset a[5]
            local(0, "a"),
            konst(5),
            op(Xop::Subscr),
            op(Xop::Unset),
            // unset a[-1]
            local(0, "a"),
            konst(-1),
            op(Xop::Subscr),
            op(Xop::Unset),
            local(0, "o"),
            local(0, "a"),
            AirNode::PushUnnamedArray {
                sloc: sloc(),
                nelems: 5,
            },
            ret(),
        ],
    ]
    .concat();
    assert_eq!(
        run(&mut ctx, code).unwrap(),
        Value::array(vec![
            Value::Null,
            Value::Null,
            Value::Integer(2),
            Value::Null,
            ints(&[1]),
        ])
    );
}

#[test]
fn defers_unwind_into_catch() {
    // var log = [];
    // try {
    //     for (var i = 0; i < 3; ++i) { defer log[$] = i; if (i == 2) throw "stop"; }
    // } catch (e) { log[$] = e; }
    // return log;
    let loop_body = vec![
        AirNode::DeferExpression {
            sloc: sloc(),
            code_body: body(vec![
                local(3, "log"),
                op(Xop::Tail),
                local(1, "i"),
                op(Xop::Assign),
            ]),
        },
        local(1, "i"),
        konst(2),
        op(Xop::CmpEq),
        if_then(vec![konst("stop"), AirNode::ThrowStatement { sloc: sloc() }]),
    ];
    let code = [
        var("log", vec![konst(Value::array(Vec::new()))]),
        vec![
            AirNode::TryStatement {
                sloc_try: sloc(),
                code_try: body(vec![AirNode::ForStatement {
                    code_init: body(var("i", vec![konst(0)])),
                    code_cond: body(vec![local(0, "i"), konst(3), op(Xop::CmpLt)]),
                    code_step: body(vec![local(0, "i"), op(Xop::IncPre)]),
                    code_body: body(loop_body),
                }]),
                sloc_catch: sloc(),
                name_except: name("e"),
                code_catch: body(vec![
                    local(1, "log"),
                    op(Xop::Tail),
                    local(0, "e"),
                    op(Xop::Assign),
                    AirNode::ClearStack,
                ]),
            },
            local(0, "log"),
            ret(),
        ],
    ]
    .concat();
    let mut ctx = GlobalContext::new();
    assert_eq!(
        run(&mut ctx, code).unwrap(),
        Value::array(vec![
            Value::Integer(0),
            Value::Integer(1),
            Value::Integer(2),
            Value::from("stop"),
        ])
    );
}

#[test]
fn script_sums_its_arguments() {
    // var s = 0; for each (k, v -> __varg) s += v; return s;
    let code = [
        var("s", vec![konst(0)]),
        vec![
            AirNode::ForEachStatement {
                name_key: Name::new("k"),
                name_mapped: Name::new("v"),
                code_init: body(vec![local(1, "__varg")]),
                code_body: body(vec![
                    local(2, "s"),
                    local(1, "v"),
                    op_assign(Xop::Add),
                    AirNode::ClearStack,
                ]),
            },
            local(0, "s"),
            ret(),
        ],
    ]
    .concat();
    let mut ctx = GlobalContext::new();
    let result = Script::new("sum.mica", code)
        .execute(&mut ctx, (1..=4).map(Value::Integer).collect())
        .unwrap();
    assert_eq!(result.dereference_readonly().unwrap(), Value::Integer(10));
}

#[test]
fn uncaught_exception_reports_its_trace() {
    let mut ctx = GlobalContext::new();
    let code = vec![konst("boom"), AirNode::ThrowStatement { sloc: sloc() }];
    let err = Script::new("boom.mica", code)
        .execute(&mut ctx, Vec::new())
        .unwrap_err();
    let printed = err.to_string();
    assert!(printed.starts_with("runtime error: boom"), "{printed}");
    assert!(printed.contains("[throw] at"), "{printed}");
    assert!(printed.contains("[function] at"), "{printed}");
}
