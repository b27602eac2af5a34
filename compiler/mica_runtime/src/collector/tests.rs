use mica_ir::Name;

use super::*;
use crate::reference::Reference;
use crate::value::{ObjectMap, Value};

/// A function value capturing `var`, like a closure's bound reference.
fn holding(var: &SharedVariable) -> Value {
    use crate::function::NativeFunction;
    let captured = Reference::variable(var.clone());
    Value::function(std::rc::Rc::new(
        NativeFunction::new("holder", |_, _, _| Ok(Reference::void())).with_capture(captured),
    ))
}

fn initialize(var: &SharedVariable, value: Value) {
    assert!(var.borrow_mut().initialize(value, false).is_ok());
}

#[test]
fn test_acyclic_garbage_needs_no_collection() {
    let mut gc = GarbageCollector::new(10);
    let var = gc.create_variable();
    assert_eq!(gc.tracked_count(), 1);
    drop(var);
    assert_eq!(gc.tracked_count(), 0);
    assert_eq!(gc.collect(Vec::new()), 0);
}

#[test]
fn test_rooted_variables_survive() {
    let mut gc = GarbageCollector::new(10);
    let a = gc.create_variable();
    let b = gc.create_variable();
    initialize(&b, Value::Integer(2));
    initialize(&a, holding(&b));
    assert_eq!(gc.collect(vec![a.clone()]), 0);
    assert_eq!(b.borrow().value(), &Value::Integer(2));
}

#[test]
fn test_cycle_is_torn_down() {
    let mut gc = GarbageCollector::new(10);
    let a = gc.create_variable();
    let b = gc.create_variable();
    initialize(&a, holding(&b));
    initialize(&b, holding(&a));
    let weak_a = a.downgrade();
    let weak_b = b.downgrade();
    drop(a);
    drop(b);
    // The cycle keeps both alive.
    assert!(weak_a.is_alive() && weak_b.is_alive());

    assert_eq!(gc.collect(Vec::new()), 2);
    assert!(!weak_a.is_alive());
    assert!(!weak_b.is_alive());
    assert_eq!(gc.tracked_count(), 0);
}

#[test]
fn test_foreign_variable_is_a_root() {
    let mut gc = GarbageCollector::new(10);
    let foreign = gc.create_variable();
    let inner = gc.create_variable();
    initialize(&inner, Value::Integer(1));
    let mut members = ObjectMap::default();
    members.insert(Name::new("f"), holding(&inner));
    initialize(&foreign, Value::object(members));
    gc.register_foreign(foreign.clone());
    let weak_inner = inner.downgrade();
    drop(inner);

    assert_eq!(gc.collect(Vec::new()), 0);
    assert!(foreign.borrow().is_initialized());
    assert!(weak_inner.is_alive());

    assert!(gc.unregister_foreign(&foreign));
    assert!(!gc.unregister_foreign(&foreign));
    // The host handle alone is not a root: both variables go.
    assert_eq!(gc.collect(Vec::new()), 2);
    assert!(!foreign.borrow().is_initialized());
    assert!(!weak_inner.is_alive());
}

#[test]
fn test_threshold_policy() {
    let mut gc = GarbageCollector::new(3);
    let a = gc.create_variable();
    let b = gc.create_variable();
    assert!(!gc.should_collect());
    let c = gc.create_variable();
    assert!(gc.should_collect());
    assert_eq!(gc.collect(vec![a, b, c]), 0);
    assert!(!gc.should_collect());
}

#[test]
fn test_finalize_tears_down_everything() {
    let mut gc = GarbageCollector::default();
    assert_eq!(gc.threshold(), DEFAULT_GC_THRESHOLD);
    let a = gc.create_variable();
    initialize(&a, Value::Integer(1));
    gc.register_foreign(a.clone());
    assert_eq!(gc.finalize(), 1);
    assert!(!a.borrow().is_initialized());
}
