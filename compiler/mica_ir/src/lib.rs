//! Mica IR - leaf types shared by the front-end and the runtime.
//!
//! This crate contains the small, dependency-free vocabulary that a compiled
//! instruction program is expressed in:
//! - `SourceLocation` for pre-resolved diagnostics positions
//! - `Name` for prehashed identifiers (scope lookup, object keys)
//! - `Xop` for the closed operator set
//! - `PtcAware` for the proper-tail-call mode of a call site
//!
//! # Design Philosophy
//!
//! - **Hash Once**: identifiers carry their hash so hot-path lookups never
//!   rehash the text.
//! - **Closed Sets**: operators and call modes are plain enums matched
//!   exhaustively by the interpreter.

mod name;
mod operator;
mod source_location;

pub use name::Name;
pub use operator::{PtcAware, Xop};
pub use source_location::SourceLocation;
