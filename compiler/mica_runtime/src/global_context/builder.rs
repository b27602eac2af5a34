//! `GlobalContextBuilder` and runtime options.

use std::rc::Rc;

use super::{GlobalContext, PredefinedNames};
use crate::collector::{GarbageCollector, DEFAULT_GC_THRESHOLD};
use crate::hooks::Hooks;
use crate::reference_dictionary::ReferenceDictionary;

/// Tunables of a `GlobalContext`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Variable allocations between automatic collections.
    pub gc_threshold: usize,
    /// Maximum number of nested non-tail calls. `None` relies on native
    /// stack growth alone.
    pub max_recursion_depth: Option<usize>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_recursion_depth: default_recursion_limit(),
        }
    }
}

/// WASM cannot grow its stack, so nested calls are capped.
#[cfg(target_arch = "wasm32")]
fn default_recursion_limit() -> Option<usize> {
    Some(200)
}

#[cfg(not(target_arch = "wasm32"))]
fn default_recursion_limit() -> Option<usize> {
    None
}

/// Builder for `GlobalContext`.
#[derive(Default)]
pub struct GlobalContextBuilder {
    options: RuntimeOptions,
    hooks: Option<Rc<dyn Hooks>>,
}

impl GlobalContextBuilder {
    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    /// Number of variable allocations between automatic collections.
    #[must_use]
    pub fn gc_threshold(mut self, threshold: usize) -> Self {
        self.options.gc_threshold = threshold;
        self
    }

    #[must_use]
    pub fn max_recursion_depth(mut self, depth: Option<usize>) -> Self {
        self.options.max_recursion_depth = depth;
        self
    }

    /// Install debugger or tracer callbacks.
    #[must_use]
    pub fn hooks(mut self, hooks: Rc<dyn Hooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn build(self) -> GlobalContext {
        tracing::debug!(
            gc_threshold = self.options.gc_threshold,
            max_recursion_depth = ?self.options.max_recursion_depth,
            "global context created"
        );
        GlobalContext {
            globals: ReferenceDictionary::new(),
            collector: GarbageCollector::new(self.options.gc_threshold),
            frames: Vec::new(),
            options: self.options,
            hooks: self.hooks,
            names: PredefinedNames::new(),
        }
    }
}
