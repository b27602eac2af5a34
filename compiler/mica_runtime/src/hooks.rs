//! Debugger and tracer callbacks.

use mica_ir::{Name, SourceLocation};

use crate::value::Value;

/// Observer of interpreter events. Every method defaults to a no-op.
///
/// Hooks are read-only: they see locations and values but cannot change
/// control flow.
pub trait Hooks {
    /// A `SingleStepTrap` instruction was reached.
    fn on_single_step_trap(&self, _sloc: &SourceLocation) {}

    /// A variable is about to be declared.
    fn on_variable_declare(&self, _sloc: &SourceLocation, _name: &Name) {}

    /// A function is about to be called.
    fn on_function_call(&self, _sloc: &SourceLocation, _target: &Value) {}
}
