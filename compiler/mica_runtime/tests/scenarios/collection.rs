use mica_runtime::{AirNode, GlobalContext, PtcAware, Value, Xop};

use crate::common::{
    assign, body, call, function, konst, local, name, null_var, op, ret, run, var,
};

/// Two closures over `x`, `y`, `z` that also capture each other:
///
/// ```text
/// var x = 1; var y = 2; var z = 3; var f; var g;
/// f = func() { return [x, y, g]; };
/// g = func() { return [z, f]; };
/// return f;
/// ```
fn mutual_closures() -> Vec<AirNode> {
    let array = |nelems| AirNode::PushUnnamedArray {
        sloc: crate::common::sloc(),
        nelems,
    };
    [
        var("x", vec![konst(1)]),
        var("y", vec![konst(2)]),
        var("z", vec![konst(3)]),
        vec![null_var("f"), null_var("g")],
        assign(
            0,
            "f",
            vec![function(
                &[],
                vec![local(1, "x"), local(1, "y"), local(1, "g"), array(3), ret()],
            )],
        ),
        assign(
            0,
            "g",
            vec![function(&[], vec![local(1, "z"), local(1, "f"), array(2), ret()])],
        ),
        vec![local(0, "f"), ret()],
    ]
    .concat()
}

#[test]
fn mutually_capturing_closures_are_collected() {
    let mut ctx = GlobalContext::new();

    let foreign = ctx.create_variable();
    foreign.borrow_mut().initialize(Value::Integer(42), false).unwrap();
    ctx.register_foreign(foreign.clone());

    let closure = run(&mut ctx, mutual_closures()).unwrap();
    ctx.define_global(name("keep"), closure, false).unwrap();

    // Reachable through the global: nothing to collect, and the closures
    // still work.
    assert_eq!(ctx.collect_garbage(), 0);
    let code = vec![
        AirNode::PushGlobalReference {
            sloc: crate::common::sloc(),
            name: name("keep"),
        },
        call(0, PtcAware::None),
        op(Xop::Countof),
        ret(),
    ];
    assert_eq!(run(&mut ctx, code).unwrap(), Value::Integer(3));

    // Clearing the only external reference leaves x, y, z, f and g.
    assert!(ctx.erase_global(&name("keep")));
    assert_eq!(ctx.collect_garbage(), 5);

    assert!(foreign.borrow().is_initialized());
    assert_eq!(*foreign.borrow().value(), Value::Integer(42));
    assert_eq!(ctx.tracked_variable_count(), 1);
}

#[test]
fn closure_cycles_in_a_loop_stay_bounded() {
    // for (var i = 0; i < 1000; ++i) { var f = func() { return f; }; }
    let mut ctx = GlobalContext::builder().gc_threshold(32).build();
    let code = vec![AirNode::ForStatement {
        code_init: body(var("i", vec![konst(0)])),
        code_cond: body(vec![local(0, "i"), konst(1000), op(Xop::CmpLt)]),
        code_step: body(vec![local(0, "i"), op(Xop::IncPre)]),
        code_body: body(var("f", vec![function(&[], vec![local(1, "f"), ret()])])),
    }];
    run(&mut ctx, code).unwrap();

    let leftover = ctx.tracked_variable_count();
    assert!(leftover <= 40, "{leftover} variables survived the loop");
    assert_eq!(ctx.collect_garbage(), leftover);
    assert_eq!(ctx.tracked_variable_count(), 0);
}

#[test]
fn dropping_the_context_tears_down_cycles() {
    let survivor;
    {
        let mut ctx = GlobalContext::new();
        let code = [
            var("f", vec![function(&[], vec![local(1, "f"), ret()])]),
            vec![local(0, "f"), ret()],
        ]
        .concat();
        let function = ctx.instantiate(&crate::common::sloc(), "outer", &[], &code).unwrap();
        let result = ctx.call(&function, Vec::new()).unwrap();
        survivor = result.get_variable_opt().cloned().unwrap();
        assert!(survivor.borrow().is_initialized());
    }
    assert!(!survivor.borrow().is_initialized());
}
