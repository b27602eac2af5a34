//! Reference modifiers: one path step from a parent value into a child.
//!
//! Four access modes, each walking one step:
//!
//! | Mode | Null parent | Missing element | Type mismatch |
//! |------|-------------|-----------------|---------------|
//! | read | `None` | `None` | exception |
//! | write | `None` | `None` | exception |
//! | open | becomes `[]` / `{}` | created (null) | exception |
//! | unset | null | null | exception |
//!
//! Array indices wrap: `-1` is the last element. Only `open` grows storage.

use std::fmt;

use mica_ir::Name;

use crate::errors::{custom, type_mismatch, RuntimeResult};
use crate::value::{ObjectMap, Value};

/// One step of a reference path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceModifier {
    /// Array element; negative indices count from the end.
    ArrayIndex(i64),
    /// Object member.
    ObjectKey(Name),
    /// `[^]`: the first element, or a new one in front when opened.
    ArrayHead,
    /// `[$]`: the last element, or a new one at the back when opened.
    ArrayTail,
}

/// An array index resolved against a length.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WrappedIndex {
    /// Index into the array after any growth.
    pub rindex: usize,
    /// Elements to insert in front for the index to exist.
    pub nprepend: usize,
    /// Elements to append for the index to exist.
    pub nappend: usize,
}

/// Resolve a possibly negative index against an array of `size` elements.
pub fn wrap_index(index: i64, size: usize) -> WrappedIndex {
    let ssize = i128::try_from(size).unwrap_or(i128::MAX);
    let index = i128::from(index);
    let to_usize = |n: i128| usize::try_from(n).unwrap_or(usize::MAX);

    if index >= ssize {
        WrappedIndex {
            rindex: to_usize(index),
            nprepend: 0,
            nappend: to_usize(index - ssize + 1),
        }
    } else if index >= 0 {
        WrappedIndex {
            rindex: to_usize(index),
            nprepend: 0,
            nappend: 0,
        }
    } else if index < -ssize {
        WrappedIndex {
            rindex: 0,
            nprepend: to_usize(-ssize - index),
            nappend: 0,
        }
    } else {
        WrappedIndex {
            rindex: to_usize(index + ssize),
            nprepend: 0,
            nappend: 0,
        }
    }
}

impl ReferenceModifier {
    fn operation(&self) -> &'static str {
        match self {
            ReferenceModifier::ArrayIndex(_) => "integer subscript",
            ReferenceModifier::ObjectKey(_) => "object key",
            ReferenceModifier::ArrayHead => "head operator",
            ReferenceModifier::ArrayTail => "tail operator",
        }
    }

    fn is_array_step(&self) -> bool {
        !matches!(self, ReferenceModifier::ObjectKey(_))
    }

    #[cold]
    fn mismatch(&self, parent: &Value) -> crate::errors::RuntimeError {
        type_mismatch(self.operation(), parent, self)
    }

    /// Read the child; `None` if the parent is null or lacks it.
    pub fn apply_read_opt<'a>(&self, parent: &'a Value) -> RuntimeResult<Option<&'a Value>> {
        match parent {
            Value::Null => Ok(None),
            Value::Array(items) if self.is_array_step() => Ok(match self {
                ReferenceModifier::ArrayIndex(index) => {
                    let w = wrap_index(*index, items.len());
                    if w.nprepend > 0 || w.nappend > 0 {
                        None
                    } else {
                        items.get(w.rindex)
                    }
                }
                ReferenceModifier::ArrayHead => items.first(),
                _ => items.last(),
            }),
            Value::Object(members) => match self {
                ReferenceModifier::ObjectKey(key) => Ok(members.get(key)),
                _ => Err(self.mismatch(parent)),
            },
            _ => Err(self.mismatch(parent)),
        }
    }

    /// Whether this step applies to `parent` (an array step on an array, a
    /// key on an object).
    fn fits(&self, parent: &Value) -> bool {
        match parent {
            Value::Array(_) => self.is_array_step(),
            Value::Object(_) => !self.is_array_step(),
            _ => false,
        }
    }

    /// Mutable access to an existing child; never creates storage.
    pub fn apply_write_opt<'a>(&self, parent: &'a mut Value) -> RuntimeResult<Option<&'a mut Value>> {
        if parent.is_null() {
            return Ok(None);
        }
        if !self.fits(parent) {
            return Err(self.mismatch(parent));
        }
        Ok(match (parent, self) {
            (Value::Array(items), ReferenceModifier::ArrayIndex(index)) => {
                let items = items.make_mut();
                let w = wrap_index(*index, items.len());
                if w.nprepend > 0 || w.nappend > 0 {
                    None
                } else {
                    items.get_mut(w.rindex)
                }
            }
            (Value::Array(items), ReferenceModifier::ArrayHead) => items.make_mut().first_mut(),
            (Value::Array(items), _) => items.make_mut().last_mut(),
            (Value::Object(members), ReferenceModifier::ObjectKey(key)) => {
                members.make_mut().get_mut(key)
            }
            _ => None,
        })
    }

    /// Mutable access to the child, creating it (and a null parent) as
    /// needed.
    pub fn apply_open<'a>(&self, parent: &'a mut Value) -> RuntimeResult<&'a mut Value> {
        if parent.is_null() {
            *parent = if self.is_array_step() {
                Value::array(Vec::new())
            } else {
                Value::object(ObjectMap::default())
            };
        }
        if !self.fits(parent) {
            return Err(self.mismatch(parent));
        }
        match (parent, self) {
            (Value::Array(items), _) => self.open_element(items.make_mut()),
            (Value::Object(members), ReferenceModifier::ObjectKey(key)) => {
                Ok(members.make_mut().entry(key.clone()).or_default())
            }
            _ => Err(custom("object step without a key")),
        }
    }

    fn open_element<'a>(&self, items: &'a mut Vec<Value>) -> RuntimeResult<&'a mut Value> {
        match self {
            ReferenceModifier::ArrayIndex(index) => {
                let w = wrap_index(*index, items.len());
                let grow = w.nprepend.max(w.nappend);
                if grow > 0 && items.try_reserve(grow).is_err() {
                    return Err(custom(format!("array length overflow (index {index})")));
                }
                if w.nprepend > 0 {
                    items.splice(0..0, std::iter::repeat_n(Value::Null, w.nprepend));
                } else if w.nappend > 0 {
                    items.resize(items.len() + w.nappend, Value::Null);
                }
                items
                    .get_mut(w.rindex)
                    .ok_or_else(|| custom(format!("array index {index} out of range")))
            }
            ReferenceModifier::ArrayHead => {
                let front = items.first().cloned().unwrap_or_default();
                items.insert(0, front);
                items
                    .first_mut()
                    .ok_or_else(|| custom("head insertion failed"))
            }
            _ => {
                let back = items.last().cloned().unwrap_or_default();
                items.push(back);
                items
                    .last_mut()
                    .ok_or_else(|| custom("tail insertion failed"))
            }
        }
    }

    /// Remove the child and return its value; null if absent.
    pub fn apply_unset(&self, parent: &mut Value) -> RuntimeResult<Value> {
        match parent {
            Value::Null => Ok(Value::Null),
            Value::Array(items) if self.is_array_step() => {
                let items = items.make_mut();
                Ok(match self {
                    ReferenceModifier::ArrayIndex(index) => {
                        let w = wrap_index(*index, items.len());
                        if w.nprepend > 0 || w.nappend > 0 {
                            Value::Null
                        } else {
                            items.remove(w.rindex)
                        }
                    }
                    ReferenceModifier::ArrayHead => {
                        if items.is_empty() {
                            Value::Null
                        } else {
                            items.remove(0)
                        }
                    }
                    _ => items.pop().unwrap_or_default(),
                })
            }
            Value::Object(members) if !self.is_array_step() => match self {
                ReferenceModifier::ObjectKey(key) => {
                    Ok(members.make_mut().remove(key).unwrap_or_default())
                }
                _ => Ok(Value::Null),
            },
            _ => Err(self.mismatch(parent)),
        }
    }
}

impl fmt::Display for ReferenceModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceModifier::ArrayIndex(index) => write!(f, "{index}"),
            ReferenceModifier::ObjectKey(key) => write!(f, "{:?}", key.as_str()),
            ReferenceModifier::ArrayHead => write!(f, "[^]"),
            ReferenceModifier::ArrayTail => write!(f, "[$]"),
        }
    }
}
