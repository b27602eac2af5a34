use pretty_assertions::assert_eq;

use super::*;
use crate::value::Value;

fn names(n: usize) -> Vec<Name> {
    (0..n).map(|i| Name::from(format!("v{i}"))).collect()
}

fn bind(dict: &mut ReferenceDictionary, name: &Name, n: i64) {
    let (slot, _) = dict.insert(name.clone());
    *slot = Reference::constant(Value::Integer(n));
}

fn value_of(dict: &ReferenceDictionary, name: &Name) -> Option<Value> {
    dict.find(name).and_then(|r| r.dereference_readonly().ok())
}

fn order(dict: &ReferenceDictionary) -> Vec<String> {
    dict.iter().map(|(k, _)| k.to_string()).collect()
}

#[test]
fn test_empty_dictionary() {
    let dict = ReferenceDictionary::new();
    assert!(dict.is_empty());
    assert_eq!(dict.capacity(), 0);
    assert!(dict.find(&Name::new("x")).is_none());
    assert!(dict.get_hint(&Name::new("x")).is_none());
    assert_eq!(dict.iter().count(), 0);
}

#[test]
fn test_insert_then_find_each() {
    let mut dict = ReferenceDictionary::new();
    let keys = names(100);
    for (i, k) in keys.iter().enumerate() {
        bind(&mut dict, k, i64::try_from(i).unwrap_or_default());
    }
    assert_eq!(dict.len(), 100);
    assert!(dict.capacity() >= 200);
    assert!(dict.capacity().is_power_of_two());
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(
            value_of(&dict, k),
            Some(Value::Integer(i64::try_from(i).unwrap_or_default()))
        );
    }
}

#[test]
fn test_insert_never_overwrites() {
    let mut dict = ReferenceDictionary::new();
    let x = Name::new("x");
    let (slot, inserted) = dict.insert(x.clone());
    assert!(inserted);
    assert!(slot.is_uninit());
    *slot = Reference::constant(Value::Integer(1));

    let (slot, inserted) = dict.insert(x.clone());
    assert!(!inserted);
    assert!(slot.is_constant());
    assert_eq!(value_of(&dict, &x), Some(Value::Integer(1)));
    assert_eq!(dict.len(), 1);
}

#[test]
fn test_erase_then_find_misses() {
    let mut dict = ReferenceDictionary::new();
    let keys = names(20);
    for k in &keys {
        bind(&mut dict, k, 0);
    }
    assert!(dict.erase(&keys[7]));
    assert!(!dict.erase(&keys[7]));
    assert!(dict.find(&keys[7]).is_none());
    assert_eq!(dict.len(), 19);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(dict.find(k).is_some(), i != 7);
    }
}

#[test]
fn test_iteration_order_survives_erase_and_rehash() {
    let mut dict = ReferenceDictionary::new();
    let keys = names(6);
    for k in &keys {
        bind(&mut dict, k, 0);
    }
    dict.erase(&keys[0]);
    dict.erase(&keys[3]);
    // Forces several rehashes.
    for k in names(40).iter().skip(6) {
        bind(&mut dict, k, 0);
    }
    let got = order(&dict);
    let mut expected = vec!["v1", "v2", "v4", "v5"];
    let tail: Vec<String> = (6..40).map(|i| format!("v{i}")).collect();
    expected.extend(tail.iter().map(String::as_str));
    assert_eq!(got, expected);
}

#[test]
fn test_hint_round_trip() {
    let mut dict = ReferenceDictionary::new();
    let keys = names(3);
    for k in &keys {
        bind(&mut dict, k, 5);
    }
    let hint = dict.get_hint(&keys[1]);
    assert!(hint.is_some());
    let hint = hint.unwrap_or(NIL);
    assert!(dict.use_hint(hint, &keys[1]).is_some());
    // A hint never resolves a different name.
    assert!(dict.use_hint(hint, &keys[0]).is_none());
    assert!(dict.use_hint(NIL, &keys[1]).is_none());
    if let Some(r) = dict.use_hint_mut(hint, &keys[1]) {
        *r = Reference::constant(Value::Integer(9));
    }
    assert_eq!(value_of(&dict, &keys[1]), Some(Value::Integer(9)));
}

#[test]
fn test_clear_keeps_capacity() {
    let mut dict = ReferenceDictionary::new();
    for k in &names(10) {
        bind(&mut dict, k, 0);
    }
    let capacity = dict.capacity();
    dict.clear();
    assert!(dict.is_empty());
    assert_eq!(dict.capacity(), capacity);
    assert_eq!(dict.iter().count(), 0);
    bind(&mut dict, &Name::new("again"), 1);
    assert_eq!(order(&dict), vec!["again"]);
}

mod proptest_model {
    use super::super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Insert(u8),
        Erase(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0u8..48).prop_map(Op::Insert),
            2 => (0u8..48).prop_map(Op::Erase),
        ]
    }

    proptest! {
        #[test]
        fn matches_insertion_order_model(ops in proptest::collection::vec(op(), 0..200)) {
            let mut dict = ReferenceDictionary::new();
            let mut model: Vec<u8> = Vec::new();
            for op in ops {
                match op {
                    Op::Insert(k) => {
                        let (_, inserted) = dict.insert(Name::from(format!("k{k}")));
                        prop_assert_eq!(inserted, !model.contains(&k));
                        if inserted {
                            model.push(k);
                        }
                    }
                    Op::Erase(k) => {
                        let erased = dict.erase(&Name::from(format!("k{k}")));
                        prop_assert_eq!(erased, model.contains(&k));
                        model.retain(|&m| m != k);
                    }
                }
                prop_assert!(dict.len() * 2 <= dict.capacity().max(1));
            }
            let got: Vec<String> = dict.iter().map(|(n, _)| n.to_string()).collect();
            let expected: Vec<String> = model.iter().map(|k| format!("k{k}")).collect();
            prop_assert_eq!(got, expected);
            for k in 0u8..48 {
                let found = dict.find(&Name::from(format!("k{k}"))).is_some();
                prop_assert_eq!(found, model.contains(&k));
            }
        }
    }
}
