//! Callable values.
//!
//! `Function` is the one trait-object seam of the runtime: script closures
//! (`InstantiatedFunction`) and host functions (`NativeFunction`) both
//! implement it. Instructions themselves are never dispatched dynamically.

use std::fmt;
use std::rc::Rc;

use mica_ir::{Name, SourceLocation};

use crate::air::Program;
use crate::errors::RuntimeResult;
use crate::global_context::GlobalContext;
use crate::reference::Reference;
use crate::value::Value;
use crate::variable::SharedVariable;

/// A callable value.
pub trait Function: fmt::Debug {
    /// Short description for printing (`name(params) @ location`).
    fn describe(&self) -> String;

    /// Report every Variable the function keeps alive.
    fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable));

    /// Run the function.
    ///
    /// The result may be a pending tail call (`Reference::ptc`); the caller's
    /// call loop resolves it.
    fn invoke_ptc_aware(
        self: Rc<Self>,
        ctx: &mut GlobalContext,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference>;
}

type NativeBody = dyn Fn(&mut GlobalContext, Reference, Vec<Reference>) -> RuntimeResult<Reference>;

/// A host function.
///
/// Values the function holds across calls must be declared with
/// `with_capture` so the collector sees them.
pub struct NativeFunction {
    name: String,
    body: Box<NativeBody>,
    captures: Vec<Reference>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&mut GlobalContext, Reference, Vec<Reference>) -> RuntimeResult<Reference> + 'static,
    ) -> Self {
        NativeFunction {
            name: name.into(),
            body: Box::new(body),
            captures: Vec::new(),
        }
    }

    /// Keep `reference` alive, and visible to the collector, for as long as
    /// the function lives.
    #[must_use]
    pub fn with_capture(mut self, reference: Reference) -> Self {
        self.captures.push(reference);
        self
    }

    pub fn captures(&self) -> &[Reference] {
        &self.captures
    }

    /// Wrap into a function value.
    pub fn into_value(self) -> Value {
        Value::function(Rc::new(self))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl Function for NativeFunction {
    fn describe(&self) -> String {
        format!("{} [native]", self.name)
    }

    fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        for capture in &self.captures {
            capture.enumerate_variables(callback);
        }
    }

    fn invoke_ptc_aware(
        self: Rc<Self>,
        ctx: &mut GlobalContext,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        // The native frame roots the arguments while the body runs.
        ctx.enter_native(Value::function(self.clone()), &self_ref, &args);
        let result = (self.body)(ctx, self_ref, args);
        ctx.leave_native();
        result
    }
}

/// A script closure: a solidified body whose outer references were bound
/// when it was instantiated.
pub struct InstantiatedFunction {
    pub(crate) sloc: SourceLocation,
    pub(crate) name: String,
    pub(crate) params: Vec<Name>,
    pub(crate) program: Program,
}

impl InstantiatedFunction {
    pub fn sloc(&self) -> &SourceLocation {
        &self.sloc
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Name] {
        &self.params
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl fmt::Debug for InstantiatedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstantiatedFunction({})", self.describe())
    }
}

impl Function for InstantiatedFunction {
    fn describe(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(Name::as_str).collect();
        format!("{}({}) @ {}", self.name, params.join(", "), self.sloc)
    }

    fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        self.program.enumerate_variables(callback);
    }

    fn invoke_ptc_aware(
        self: Rc<Self>,
        ctx: &mut GlobalContext,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        ctx.execute_function(self, self_ref, args)
    }
}
