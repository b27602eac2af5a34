use super::*;
use crate::function::NativeFunction;
use crate::variable::WeakVariable;

/// Initialize `from` with a function value that keeps `to` alive.
fn link(from: &SharedVariable, to: &SharedVariable) {
    let holder = NativeFunction::new("holder", |_, _, _| Ok(Reference::void()))
        .with_capture(Reference::variable(to.clone()))
        .into_value();
    from.borrow_mut().initialize(holder, false).unwrap();
}

/// Two tracked variables that reference each other. Only weak handles leave.
fn make_cycle(ctx: &mut GlobalContext) -> (WeakVariable, WeakVariable) {
    let a = ctx.create_variable();
    let b = ctx.create_variable();
    link(&a, &b);
    link(&b, &a);
    (a.downgrade(), b.downgrade())
}

#[test]
fn test_builder_options() {
    let ctx = GlobalContext::builder()
        .gc_threshold(7)
        .max_recursion_depth(Some(32))
        .build();
    assert_eq!(
        ctx.options(),
        &RuntimeOptions {
            gc_threshold: 7,
            max_recursion_depth: Some(32),
        }
    );
    assert_eq!(ctx.collector.threshold(), 7);
    assert_eq!(ctx.frame_depth(), 0);
}

#[test]
fn test_builder_replaces_options() {
    let options = RuntimeOptions {
        gc_threshold: 1,
        max_recursion_depth: None,
    };
    let ctx = GlobalContext::builder().options(options.clone()).build();
    assert_eq!(ctx.options(), &options);
}

#[test]
fn test_globals() {
    let mut ctx = GlobalContext::new();
    let name = Name::new("limit");
    let var = ctx.define_global(name.clone(), Value::Integer(3), true).unwrap();
    assert!(var.borrow().is_immutable());

    let global = ctx.get_global(&name).unwrap();
    assert_eq!(global.dereference_readonly().unwrap(), Value::Integer(3));
    assert!(global.write(Value::Integer(4)).is_err());

    assert!(ctx.erase_global(&name));
    assert!(ctx.get_global(&name).is_none());
    assert!(!ctx.erase_global(&name));
}

#[test]
fn test_open_global_creates_slot() {
    let mut ctx = GlobalContext::new();
    let name = Name::new("slot");
    assert!(ctx.open_global(name.clone()).is_uninit());
    *ctx.open_global(name.clone()) = Reference::constant(Value::from("set"));
    assert_eq!(
        ctx.get_global(&name).unwrap().dereference_readonly().unwrap(),
        Value::from("set")
    );
}

#[test]
fn test_collect_unreachable_cycle() {
    let mut ctx = GlobalContext::new();
    let (a, b) = make_cycle(&mut ctx);
    assert_eq!(ctx.tracked_variable_count(), 2);

    assert_eq!(ctx.collect_garbage(), 2);
    assert!(!a.is_alive());
    assert!(!b.is_alive());
    assert_eq!(ctx.tracked_variable_count(), 0);
}

#[test]
fn test_globals_are_roots() {
    let mut ctx = GlobalContext::new();
    let (a, _) = make_cycle(&mut ctx);
    let root = a.upgrade().unwrap();
    *ctx.open_global(Name::new("root")) = Reference::variable(root);

    assert_eq!(ctx.collect_garbage(), 0);
    assert!(a.is_alive());

    ctx.erase_global(&Name::new("root"));
    assert_eq!(ctx.collect_garbage(), 2);
}

#[test]
fn test_foreign_roots() {
    let mut ctx = GlobalContext::new();
    let (a, b) = make_cycle(&mut ctx);
    let held = b.upgrade().unwrap();
    ctx.register_foreign(held.clone());

    assert_eq!(ctx.collect_garbage(), 0);
    assert!(a.upgrade().unwrap().borrow().is_initialized());

    assert!(ctx.unregister_foreign(&held));
    assert!(!ctx.unregister_foreign(&held));
    assert_eq!(ctx.collect_garbage(), 2);
    // The host handle keeps the storage, but it has been torn down.
    assert!(!held.borrow().is_initialized());
}

#[test]
fn test_automatic_collection_threshold() {
    let mut ctx = GlobalContext::builder().gc_threshold(4).build();
    let (a, _) = make_cycle(&mut ctx);
    ctx.maybe_collect();
    assert!(a.is_alive());

    let (_, _) = make_cycle(&mut ctx);
    ctx.maybe_collect();
    assert!(!a.is_alive());
    assert_eq!(ctx.tracked_variable_count(), 0);
}

#[test]
fn test_drop_tears_down_cycles() {
    let held;
    {
        let mut ctx = GlobalContext::new();
        let (a, _) = make_cycle(&mut ctx);
        held = a.upgrade().unwrap();
        *ctx.open_global(Name::new("root")) = Reference::variable(held.clone());
    }
    assert!(!held.borrow().is_initialized());
}
