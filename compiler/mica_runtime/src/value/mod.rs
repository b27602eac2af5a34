//! Runtime values.
//!
//! # Heap Enforcement
//!
//! Strings, arrays and objects live behind `Heap<T>`, whose constructor is
//! private to this module. Use the factory methods:
//!
//! ```text
//! let s = Value::string("hello");
//! let a = Value::array(vec![Value::Integer(1)]);
//! ```
//!
//! Mutation goes through `as_array_mut` / `as_object_mut`, which detach a
//! shared payload before handing out `&mut` (copy-on-write).
//!
//! # Variable Enumeration
//!
//! A value may own Variables indirectly: a closure holds bound references,
//! an array may hold closures. `enumerate_variables` reports every Variable
//! directly owned by the value, recursing through containers and closure
//! bodies but never into the reported Variables themselves. The collector
//! keeps the visited set.

mod heap;

use std::fmt;
use std::rc::Rc;

use mica_ir::Name;
use rustc_hash::FxHashMap;

use crate::function::Function;
use crate::variable::SharedVariable;

pub use heap::Heap;

/// Object payload: member name to value.
pub type ObjectMap = FxHashMap<Name, Value>;

/// Result of comparing two values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Compare {
    Unordered,
    Less,
    Equal,
    Greater,
}

/// A dynamically typed value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Heap<str>),
    Array(Heap<Vec<Value>>),
    Object(Heap<ObjectMap>),
    Function(Rc<dyn Function>),
}

// Factory Methods

impl Value {
    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(Heap::from_rc(s.into()))
    }

    /// Create an array value.
    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Heap::new(items))
    }

    /// Create an object value.
    #[inline]
    pub fn object(members: ObjectMap) -> Self {
        Value::Object(Heap::new(members))
    }

    /// Create a function value.
    #[inline]
    pub fn function(f: Rc<dyn Function>) -> Self {
        Value::Function(f)
    }
}

// Accessors

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer or real, as a real.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Mutable array payload, detached from other holders.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.make_mut()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Value::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Mutable object payload, detached from other holders.
    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match self {
            Value::Object(members) => Some(members.make_mut()),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<dyn Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Type name as reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Truthiness, as tested by conditions.
    pub fn test(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Real(r) => *r != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }
}

// Comparison

impl Value {
    /// Compare two values.
    ///
    /// Integers and reals compare numerically with each other. Arrays compare
    /// lexicographically. Objects and functions are never ordered, and
    /// neither are values of unrelated types.
    pub fn compare(&self, other: &Value) -> Compare {
        match (self, other) {
            (Value::Null, Value::Null) => Compare::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => ordering(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => ordering(a.cmp(b)),
            (Value::Integer(_) | Value::Real(_), Value::Integer(_) | Value::Real(_)) => {
                match (self.as_real(), other.as_real()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b).map_or(Compare::Unordered, ordering),
                    _ => Compare::Unordered,
                }
            }
            (Value::String(a), Value::String(b)) => ordering((**a).cmp(&**b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let c = x.compare(y);
                    if c != Compare::Equal {
                        return c;
                    }
                }
                ordering(a.len().cmp(&b.len()))
            }
            _ => Compare::Unordered,
        }
    }
}

fn ordering(o: std::cmp::Ordering) -> Compare {
    match o {
        std::cmp::Ordering::Less => Compare::Less,
        std::cmp::Ordering::Equal => Compare::Equal,
        std::cmp::Ordering::Greater => Compare::Greater,
    }
}

// Variable enumeration

impl Value {
    /// Report every Variable this value directly owns.
    pub fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        match self {
            Value::Array(items) => {
                for item in items.iter() {
                    item.enumerate_variables(callback);
                }
            }
            Value::Object(members) => {
                for member in members.values() {
                    member.enumerate_variables(callback);
                }
            }
            Value::Function(f) => f.enumerate_variables(callback),
            Value::Null
            | Value::Boolean(_)
            | Value::Integer(_)
            | Value::Real(_)
            | Value::String(_) => {}
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::String(a), Value::String(b)) => **a == **b,
            (Value::Array(a), Value::Array(b)) => **a == **b,
            (Value::Object(a), Value::Object(b)) => **a == **b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(r) => write!(f, "{r:?}"),
            Value::String(s) => write!(f, "{:?}", &**s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(members) => {
                // Sorted for stable output.
                let mut entries: Vec<_> = members.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                write!(f, "{{")?;
                for (i, (k, v)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {v}", k.as_str())?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "[function {}]", func.describe()),
        }
    }
}
