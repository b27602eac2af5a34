//! Source locations.
//!
//! The front-end resolves every diagnostic position before handing the
//! instruction program over; the runtime only copies these around and prints
//! them in backtraces.

use std::fmt;
use std::rc::Rc;

/// A position in a source file.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Rc<str>,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Create a location.
    pub fn new(file: impl Into<Rc<str>>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }

    /// File name as given by the front-end.
    #[inline]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// One-based line number, zero when unknown.
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// One-based column number, zero when unknown.
    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        SourceLocation::new("[unknown]", 0, 0)
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceLocation({self})")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests;
