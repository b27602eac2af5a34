//! A compiled top-level script.

use mica_ir::{Name, SourceLocation};

use crate::air::AirNode;
use crate::errors::RuntimeResult;
use crate::global_context::GlobalContext;
use crate::reference::Reference;
use crate::value::Value;

/// Top-level code of one source file.
///
/// Executing a script instantiates its code as a variadic function named
/// `[file scope]` and calls it: script arguments are available as `__varg`.
#[derive(Clone, Debug)]
pub struct Script {
    sloc: SourceLocation,
    params: Vec<Name>,
    code: Vec<AirNode>,
}

impl Script {
    pub fn new(file: &str, code: Vec<AirNode>) -> Self {
        Script {
            sloc: SourceLocation::new(file, 1, 0),
            params: vec![Name::new("...")],
            code,
        }
    }

    /// Name the script's leading arguments.
    #[must_use]
    pub fn with_params(mut self, params: Vec<Name>) -> Self {
        self.params = params;
        self
    }

    pub fn sloc(&self) -> &SourceLocation {
        &self.sloc
    }

    pub fn execute(&self, ctx: &mut GlobalContext, args: Vec<Value>) -> RuntimeResult<Reference> {
        let function = ctx.instantiate(&self.sloc, "[file scope]", &self.params, &self.code)?;
        tracing::debug!(file = self.sloc.file(), "executing script");
        ctx.call(&function, args)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
mod tests;
