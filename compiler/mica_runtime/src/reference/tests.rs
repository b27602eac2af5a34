use mica_ir::Name;
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::ExceptionKind;

fn initialized(value: Value, immutable: bool) -> SharedVariable {
    let var = SharedVariable::new();
    assert!(var.borrow_mut().initialize(value, immutable).is_ok());
    var
}

fn with_key(mut r: Reference, name: &str) -> Reference {
    r.push_modifier(ReferenceModifier::ObjectKey(Name::new(name)));
    r
}

#[test]
fn test_write_vivifies_path() {
    let var = initialized(Value::Null, false);
    let mut r = with_key(Reference::variable(var.clone()), "list");
    r.push_modifier(ReferenceModifier::ArrayIndex(1));
    assert!(r.write(Value::Integer(9)).is_ok());

    assert_eq!(
        r.dereference_readonly().ok(),
        Some(Value::Integer(9))
    );
    let root = Reference::variable(var).dereference_readonly().ok();
    assert_eq!(
        root.as_ref().map(ToString::to_string).as_deref(),
        Some("{\"list\": [null, 9]}")
    );
}

#[test]
fn test_read_through_null_is_null() {
    let var = initialized(Value::Null, false);
    let r = with_key(with_key(Reference::variable(var), "a"), "b");
    assert_eq!(r.dereference_readonly().ok(), Some(Value::Null));
}

#[test]
fn test_immutable_write_leaves_value() {
    let var = initialized(Value::Integer(5), true);
    let r = Reference::variable(var.clone());
    let err = r.write(Value::Integer(6)).err();
    assert_eq!(
        err.as_ref().and_then(|e| e.exception_kind()),
        Some(&ExceptionKind::WriteViolation {
            value: "5".to_string()
        })
    );
    assert_eq!(var.borrow().value(), &Value::Integer(5));
}

#[test]
fn test_uninitialized_variable_rejects_access() {
    let r = Reference::variable(SharedVariable::new());
    for err in [r.dereference_readonly().err(), r.write(Value::Null).err()] {
        assert_eq!(
            err.as_ref().and_then(|e| e.exception_kind()),
            Some(&ExceptionKind::UninitializedUse)
        );
    }
}

#[test]
fn test_constant_and_temporary_are_read_only() {
    let c = Reference::constant(Value::Integer(1));
    let t = Reference::temporary(Value::Integer(2));
    assert!(matches!(
        c.write(Value::Null).err().as_ref().and_then(|e| e.exception_kind()),
        Some(ExceptionKind::NotAssignable { what: "constant", .. })
    ));
    assert!(matches!(
        t.write(Value::Null).err().as_ref().and_then(|e| e.exception_kind()),
        Some(ExceptionKind::NotAssignable { what: "temporary", .. })
    ));
    assert_eq!(t.dereference_readonly().ok(), Some(Value::Integer(2)));
}

#[test]
fn test_void_and_tail_call_not_dereferenceable() {
    assert_eq!(
        Reference::void()
            .dereference_readonly()
            .err()
            .as_ref()
            .and_then(|e| e.exception_kind()),
        Some(&ExceptionKind::VoidUse)
    );
    let pending = Reference::ptc(PtcArguments {
        sloc: SourceLocation::default(),
        ptc: PtcAware::ByVal,
        target: Value::Null,
        self_ref: Reference::constant(Value::Null),
        args: Vec::new(),
    });
    assert!(pending.is_ptc_args());
    assert_eq!(
        pending
            .dereference_readonly()
            .err()
            .as_ref()
            .and_then(|e| e.exception_kind()),
        Some(&ExceptionKind::TailCallDereference)
    );
}

#[test]
fn test_unset_semantics() {
    let var = initialized(
        Value::array(vec![Value::Integer(1), Value::Integer(2)]),
        false,
    );
    let mut r = Reference::variable(var.clone());
    assert!(matches!(
        r.dereference_unset().err().as_ref().and_then(|e| e.exception_kind()),
        Some(ExceptionKind::NotUnsettable)
    ));

    r.push_modifier(ReferenceModifier::ArrayTail);
    assert_eq!(r.dereference_unset().ok(), Some(Value::Integer(2)));
    assert_eq!(r.dereference_unset().ok(), Some(Value::Integer(1)));
    assert_eq!(r.dereference_unset().ok(), Some(Value::Null));

    let through_null = with_key(with_key(Reference::variable(initialized(Value::Null, false)), "a"), "b");
    assert_eq!(through_null.dereference_unset().ok(), Some(Value::Null));
}

#[test]
fn test_modify_opt_skips_missing() {
    let var = initialized(Value::array(vec![Value::Integer(1)]), false);
    let mut r = Reference::variable(var.clone());
    r.push_modifier(ReferenceModifier::ArrayIndex(3));
    assert_eq!(r.modify_opt(|v| *v = Value::Null).ok(), Some(None));
    r.pop_modifier();
    r.push_modifier(ReferenceModifier::ArrayIndex(0));
    assert_eq!(
        r.modify_opt(|v| *v = Value::Integer(8)).ok(),
        Some(Some(()))
    );
    assert_eq!(
        var.borrow().value(),
        &Value::array(vec![Value::Integer(8)])
    );
}

#[test]
fn test_mutate_into_temporary_snapshots() {
    let var = initialized(Value::Integer(3), false);
    let mut r = Reference::variable(var.clone());
    assert!(r.mutate_into_temporary().is_ok());
    assert!(r.is_temporary());
    assert!(Reference::variable(var).write(Value::Integer(4)).is_ok());
    assert_eq!(r.dereference_readonly().ok(), Some(Value::Integer(3)));
}

#[test]
fn test_get_variable_requires_bare_reference() {
    let var = initialized(Value::Null, false);
    let r = Reference::variable(var.clone());
    assert!(r.get_variable_opt().is_some_and(|v| v.ptr_eq(&var)));
    assert!(with_key(r, "k").get_variable_opt().is_none());
}

#[test]
fn test_enumerate_reports_root_variable() {
    let var = initialized(Value::Null, false);
    let r = with_key(Reference::variable(var.clone()), "k");
    let mut seen = Vec::new();
    r.enumerate_variables(&mut |v| seen.push(v.id()));
    assert_eq!(seen, vec![var.id()]);
}
