use super::*;

#[test]
fn test_display() {
    let sloc = SourceLocation::new("main.mica", 12, 5);
    assert_eq!(sloc.to_string(), "main.mica:12:5");
    assert_eq!(format!("{sloc:?}"), "SourceLocation(main.mica:12:5)");
}

#[test]
fn test_accessors() {
    let sloc = SourceLocation::new("lib.mica", 3, 14);
    assert_eq!(sloc.file(), "lib.mica");
    assert_eq!(sloc.line(), 3);
    assert_eq!(sloc.column(), 14);
}

#[test]
fn test_default_is_unknown() {
    let sloc = SourceLocation::default();
    assert_eq!(sloc.file(), "[unknown]");
    assert_eq!(sloc.line(), 0);
}
