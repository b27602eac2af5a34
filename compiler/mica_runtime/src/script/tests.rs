use mica_ir::Xop;

use super::*;
use crate::air::AirStatus;
use crate::errors::FrameKind;

fn local(name: &str) -> AirNode {
    AirNode::local_reference(SourceLocation::new("main.mica", 2, 1), 0, Name::new(name))
}

fn ret() -> AirNode {
    AirNode::SimpleStatus {
        status: AirStatus::ReturnRef,
    }
}

#[test]
fn test_script_location() {
    let script = Script::new("main.mica", Vec::new());
    assert_eq!(script.sloc().file(), "main.mica");
    assert_eq!(script.sloc().line(), 1);
}

#[test]
fn test_script_arguments_are_variadic() {
    let mut ctx = GlobalContext::new();
    let script = Script::new("main.mica", vec![local("__varg"), ret()]);
    let result = script
        .execute(&mut ctx, vec![Value::Integer(1), Value::from("two")])
        .unwrap();
    assert_eq!(
        result.dereference_readonly().unwrap(),
        Value::array(vec![Value::Integer(1), Value::from("two")])
    );
}

#[test]
fn test_script_with_named_params() {
    let mut ctx = GlobalContext::new();
    let code = vec![
        local("x"),
        local("y"),
        AirNode::ApplyOperator {
            sloc: SourceLocation::new("main.mica", 3, 1),
            xop: Xop::Mul,
            assign: false,
        },
        ret(),
    ];
    let script = Script::new("main.mica", code).with_params(vec![Name::new("x"), Name::new("y")]);
    let result = script
        .execute(&mut ctx, vec![Value::Integer(6), Value::Integer(7)])
        .unwrap();
    assert_eq!(result.dereference_readonly().unwrap(), Value::Integer(42));
}

#[test]
fn test_empty_script_returns_void() {
    let mut ctx = GlobalContext::new();
    let result = Script::new("empty.mica", Vec::new())
        .execute(&mut ctx, Vec::new())
        .unwrap();
    assert!(result.is_void());
}

#[test]
fn test_script_error_names_file_scope() {
    let mut ctx = GlobalContext::new();
    let code = vec![
        AirNode::PushConstant {
            value: Value::from("bad"),
        },
        AirNode::ThrowStatement {
            sloc: SourceLocation::new("main.mica", 5, 3),
        },
    ];
    let err = Script::new("main.mica", code)
        .execute(&mut ctx, Vec::new())
        .unwrap_err();
    let exception = err.as_exception().unwrap();
    assert_eq!(exception.message(), "bad");
    assert_eq!(exception.frames[0].sloc.line(), 5);
    let scope = &exception.frames[1];
    assert_eq!(scope.kind, FrameKind::Function);
    assert_eq!(scope.value, Value::from("[file scope]"));
}
