//! Prehashed identifier.
//!
//! Scope tables probe by hash on every variable access, so the hash of an
//! identifier is computed once, when the front-end creates the `Name`, and
//! travels with it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHasher;

/// Identifier with a precomputed hash.
///
/// Cloning shares the text. Equality checks the hash first, then pointer
/// identity, then the text.
#[derive(Clone)]
pub struct Name {
    text: Rc<str>,
    hash: u64,
}

impl Name {
    /// Create a name, hashing its text.
    pub fn new(text: &str) -> Self {
        Name {
            text: Rc::from(text),
            hash: Self::hash_text(text),
        }
    }

    /// The identifier text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The precomputed hash.
    #[inline]
    pub fn prehash(&self) -> u64 {
        self.hash
    }

    /// Whether the identifier is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn hash_text(text: &str) -> u64 {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        // Fx leaves the low bits weak for short keys; fold the high half in
        // because probe origins are taken from the low bits.
        let raw = hasher.finish();
        raw ^ (raw >> 29) ^ (raw >> 47)
    }
}

impl PartialEq for Name {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && (Rc::ptr_eq(&self.text, &other.text) || self.text == other.text)
    }
}

impl Eq for Name {}

impl Hash for Name {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

impl From<String> for Name {
    fn from(text: String) -> Self {
        let hash = Self::hash_text(&text);
        Name {
            text: Rc::from(text),
            hash,
        }
    }
}

#[cfg(test)]
mod tests;
