use mica_runtime::{AirNode, GlobalContext, PtcAware, Value, Xop};

use crate::common::{assign, call, function, if_then, konst, local, null_var, op, ret, run, var};

/// `n == 0 ? base : <recur>` where `<recur>` calls `callee(n - 1)`.
fn countdown_body(callee: &str, base: impl Into<Value>, ptc: PtcAware) -> Vec<AirNode> {
    let mut code = vec![
        local(0, "n"),
        konst(0),
        op(Xop::CmpEq),
        if_then(vec![konst(base), ret()]),
        local(1, callee),
        local(0, "n"),
        konst(1),
        op(Xop::Sub),
        call(1, ptc),
    ];
    if !ptc.is_tail() {
        code.push(ret());
    }
    code
}

#[test]
fn million_tail_calls_run_in_constant_depth() {
    let mut ctx = GlobalContext::builder().max_recursion_depth(Some(8)).build();
    let code = [
        var(
            "lp",
            vec![function(&["n"], countdown_body("lp", "done", PtcAware::ByVal))],
        ),
        vec![local(0, "lp"), konst(1_000_000), call(1, PtcAware::None), ret()],
    ]
    .concat();
    assert_eq!(run(&mut ctx, code).unwrap(), Value::from("done"));
    assert_eq!(ctx.frame_depth(), 0);

    // `lp` captures its own variable: only the collector can free it.
    assert_eq!(ctx.collect_garbage(), 1);
    assert_eq!(ctx.tracked_variable_count(), 0);
}

#[test]
fn mutual_tail_recursion() {
    let mut ctx = GlobalContext::builder().max_recursion_depth(Some(8)).build();
    let code = [
        vec![null_var("even"), null_var("odd")],
        assign(
            0,
            "even",
            vec![function(&["n"], countdown_body("odd", true, PtcAware::ByVal))],
        ),
        assign(
            0,
            "odd",
            vec![function(&["n"], countdown_body("even", false, PtcAware::ByVal))],
        ),
        vec![local(0, "even"), konst(100_001), call(1, PtcAware::None), ret()],
    ]
    .concat();
    assert_eq!(run(&mut ctx, code).unwrap(), Value::Boolean(false));
}

#[test]
fn deep_non_tail_recursion_grows_the_native_stack() {
    // sum(n) = n == 0 ? 0 : n + sum(n - 1)
    let sum = vec![
        local(0, "n"),
        konst(0),
        op(Xop::CmpEq),
        if_then(vec![konst(0), ret()]),
        local(0, "n"),
        local(1, "sum"),
        local(0, "n"),
        konst(1),
        op(Xop::Sub),
        call(1, PtcAware::None),
        op(Xop::Add),
        ret(),
    ];
    let mut ctx = GlobalContext::builder().max_recursion_depth(None).build();
    let code = [
        var("sum", vec![function(&["n"], sum)]),
        vec![local(0, "sum"), konst(10_000), call(1, PtcAware::None), ret()],
    ]
    .concat();
    assert_eq!(run(&mut ctx, code).unwrap(), Value::Integer(50_005_000));
}
