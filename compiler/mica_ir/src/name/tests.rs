use super::*;
use rustc_hash::FxHashMap;

#[test]
fn test_equal_text_equal_name() {
    let a = Name::new("counter");
    let b = Name::from(String::from("counter"));
    assert_eq!(a, b);
    assert_eq!(a.prehash(), b.prehash());
}

#[test]
fn test_different_text_different_name() {
    assert_ne!(Name::new("x"), Name::new("y"));
}

#[test]
fn test_clone_shares_text() {
    let a = Name::new("shared");
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(b.as_str(), "shared");
}

#[test]
fn test_usable_as_map_key() {
    let mut map = FxHashMap::default();
    map.insert(Name::new("a"), 1);
    map.insert(Name::new("b"), 2);
    assert_eq!(map.get(&Name::new("a")), Some(&1));
    assert_eq!(map.get(&Name::new("b")), Some(&2));
    assert_eq!(map.get(&Name::new("c")), None);
}

#[test]
fn test_ordering_follows_text() {
    let mut names = vec![Name::new("b"), Name::new("c"), Name::new("a")];
    names.sort();
    let texts: Vec<_> = names.iter().map(Name::as_str).collect();
    assert_eq!(texts, ["a", "b", "c"]);
}

#[test]
fn test_display_and_empty() {
    assert_eq!(Name::new("__this").to_string(), "__this");
    assert!(Name::new("").is_empty());
    assert!(!Name::new("x").is_empty());
}
