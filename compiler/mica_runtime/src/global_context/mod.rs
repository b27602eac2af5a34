//! The global context: globals, the collector, the call frames and the
//! embedding API.
//!
//! Everything the interpreter needs travels through `&mut GlobalContext`.
//! The instruction loop itself lives in `executive`; this module owns the
//! state and the host-facing operations.
//!
//! # Collector Roots
//!
//! A collection pass is rooted at the global names plus, for every live
//! frame, the callee, its `this` reference, every scope binding, pending
//! deferred bodies, the evaluation stacks and any exception unwinding
//! through a deferred body.

mod builder;
mod names;

use std::rc::Rc;

use mica_ir::{Name, SourceLocation};

pub use builder::{GlobalContextBuilder, RuntimeOptions};
pub(crate) use names::PredefinedNames;

use crate::air::AirNode;
use crate::collector::GarbageCollector;
use crate::errors::RuntimeResult;
use crate::executive::Frame;
use crate::hooks::Hooks;
use crate::reference::Reference;
use crate::reference_dictionary::ReferenceDictionary;
use crate::value::Value;
use crate::variable::SharedVariable;

/// Interpreter state shared by every function call.
pub struct GlobalContext {
    pub(crate) globals: ReferenceDictionary,
    pub(crate) collector: GarbageCollector,
    pub(crate) frames: Vec<Frame>,
    pub(crate) options: RuntimeOptions,
    pub(crate) hooks: Option<Rc<dyn Hooks>>,
    pub(crate) names: PredefinedNames,
}

impl GlobalContext {
    /// Context with default options and no hooks.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> GlobalContextBuilder {
        GlobalContextBuilder::default()
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Number of live call frames, native ones included.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    // Globals

    /// Slot bound to `name` among the globals, created as uninitialized if
    /// missing.
    pub fn open_global(&mut self, name: Name) -> &mut Reference {
        self.globals.insert(name).0
    }

    pub fn get_global(&self, name: &Name) -> Option<&Reference> {
        self.globals.find(name)
    }

    /// Create a collector-tracked variable holding `value` and bind it to
    /// `name` among the globals.
    pub fn define_global(&mut self, name: Name, value: Value, immutable: bool) -> RuntimeResult<SharedVariable> {
        let var = self.collector.create_variable();
        var.borrow_mut().initialize(value, immutable)?;
        *self.open_global(name) = Reference::variable(var.clone());
        Ok(var)
    }

    /// Remove a global binding.
    pub fn erase_global(&mut self, name: &Name) -> bool {
        self.globals.erase(name)
    }

    // Functions

    /// Turn a body into a callable closure.
    ///
    /// References that reach past the function boundary are bound against the
    /// scopes of the innermost active script frame, if any.
    pub fn instantiate(
        &self,
        sloc: &SourceLocation,
        name: &str,
        params: &[Name],
        code: &[AirNode],
    ) -> RuntimeResult<Value> {
        self.instantiate_function(sloc, name, params, code)
    }

    /// Call `target` with argument values and a null `this`.
    pub fn call(&mut self, target: &Value, args: Vec<Value>) -> RuntimeResult<Reference> {
        let args = args.into_iter().map(Reference::temporary).collect();
        self.call_with_this(target, Reference::constant(Value::Null), args)
    }

    /// Call `target` with explicit `this` and argument references.
    pub fn call_with_this(
        &mut self,
        target: &Value,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        self.call_function(&SourceLocation::default(), target, self_ref, args)
    }

    // Collector

    /// Create a variable tracked by the collector.
    pub fn create_variable(&mut self) -> SharedVariable {
        self.collector.create_variable()
    }

    /// Root a host-held variable: it, and everything it reaches, survives
    /// collection until unregistered.
    pub fn register_foreign(&mut self, var: SharedVariable) {
        self.collector.register_foreign(var);
    }

    /// Drop a root added by `register_foreign`.
    pub fn unregister_foreign(&mut self, var: &SharedVariable) -> bool {
        self.collector.unregister_foreign(var)
    }

    /// Run a full collection now. Returns the number of variables torn down.
    pub fn collect_garbage(&mut self) -> usize {
        let roots = self.gather_roots();
        self.collector.collect(roots)
    }

    /// Number of live variables the collector is tracking.
    pub fn tracked_variable_count(&self) -> usize {
        self.collector.tracked_count()
    }

    /// Collection checkpoint.
    pub(crate) fn maybe_collect(&mut self) {
        if self.collector.should_collect() {
            self.collect_garbage();
        }
    }

    fn gather_roots(&self) -> Vec<SharedVariable> {
        let mut roots = Vec::new();
        let mut push = |var: &SharedVariable| roots.push(var.clone());
        for (_, reference) in &self.globals {
            reference.enumerate_variables(&mut push);
        }
        for frame in &self.frames {
            frame.enumerate_variables(&mut push);
        }
        roots
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GlobalContext {
    fn drop(&mut self) {
        self.collector.finalize();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
mod tests;
