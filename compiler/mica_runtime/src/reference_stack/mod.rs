//! Evaluation stack of references.
//!
//! Underflow means the instruction program is malformed, so it is a fatal
//! error rather than an exception.

use crate::errors::{FatalError, RuntimeResult};
use crate::reference::Reference;

#[derive(Debug, Default)]
pub struct ReferenceStack {
    refs: Vec<Reference>,
}

impl ReferenceStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    #[inline]
    pub fn push(&mut self, reference: Reference) {
        self.refs.push(reference);
    }

    pub fn pop(&mut self) -> RuntimeResult<Reference> {
        self.refs.pop().ok_or_else(|| Self::underflow(1, 0))
    }

    /// Pop the top `n` references, returned in push order.
    pub fn pop_n(&mut self, n: usize) -> RuntimeResult<Vec<Reference>> {
        let available = self.refs.len();
        if n > available {
            return Err(Self::underflow(n, available));
        }
        Ok(self.refs.split_off(available - n))
    }

    pub fn top(&self) -> RuntimeResult<&Reference> {
        self.refs.last().ok_or_else(|| Self::underflow(1, 0))
    }

    pub fn top_mut(&mut self) -> RuntimeResult<&mut Reference> {
        self.refs.last_mut().ok_or_else(|| Self::underflow(1, 0))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.refs.clear();
    }

    /// Drop everything above depth `len`.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.refs.truncate(len);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reference> {
        self.refs.iter()
    }

    #[cold]
    fn underflow(needed: usize, available: usize) -> crate::errors::RuntimeError {
        FatalError::StackUnderflow { needed, available }.into()
    }
}

impl FromIterator<Reference> for ReferenceStack {
    fn from_iter<I: IntoIterator<Item = Reference>>(iter: I) -> Self {
        ReferenceStack {
            refs: iter.into_iter().collect(),
        }
    }
}
