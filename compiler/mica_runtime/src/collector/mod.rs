//! Tracing collector over the Variable graph.
//!
//! Variables are reference counted, which frees acyclic garbage on its own.
//! A closure that captures the variable holding it forms a cycle that counts
//! never release; this collector finds such variables by marking from an
//! explicit root set and tears down every tracked variable left unmarked.
//!
//! # Tracking
//!
//! Every variable the runtime allocates is registered as a `WeakVariable`.
//! The registry never keeps a variable alive; dead entries are pruned during
//! collection.
//!
//! # Marking
//!
//! The caller supplies the roots (scope tables, evaluation stacks, live
//! functions) as the variables they reference directly. Foreign variables
//! registered by the host are roots until unregistered. Marking follows
//! `Value::enumerate_variables` with a worklist and a visited set keyed by
//! variable identity, so cycles terminate.
//!
//! # Teardown
//!
//! Unmarked variables that are still alive are upgraded first, then each is
//! uninitialized and its old value dropped outside the borrow. Dropping values
//! releases closures, which releases the strong counts that formed the cycle.

use rustc_hash::FxHashSet;

use crate::variable::{SharedVariable, WeakVariable};

/// Default number of allocations between automatic collections.
pub const DEFAULT_GC_THRESHOLD: usize = 1000;

#[derive(Debug)]
pub struct GarbageCollector {
    tracked: Vec<WeakVariable>,
    foreign: Vec<SharedVariable>,
    allocations_since_gc: usize,
    threshold: usize,
}

impl Default for GarbageCollector {
    fn default() -> Self {
        Self::new(DEFAULT_GC_THRESHOLD)
    }
}

impl GarbageCollector {
    pub fn new(threshold: usize) -> Self {
        GarbageCollector {
            tracked: Vec::new(),
            foreign: Vec::new(),
            allocations_since_gc: 0,
            threshold,
        }
    }

    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    /// Allocate a tracked, uninitialized variable.
    pub fn create_variable(&mut self) -> SharedVariable {
        let var = SharedVariable::new();
        self.tracked.push(var.downgrade());
        self.allocations_since_gc = self.allocations_since_gc.saturating_add(1);
        var
    }

    /// Whether enough allocations happened since the last collection.
    #[inline]
    pub fn should_collect(&self) -> bool {
        self.allocations_since_gc >= self.threshold
    }

    /// Number of tracked variables still alive.
    pub fn tracked_count(&self) -> usize {
        self.tracked.iter().filter(|w| w.is_alive()).count()
    }

    /// Make `var` a permanent root.
    pub fn register_foreign(&mut self, var: SharedVariable) {
        if !self.foreign.iter().any(|v| v.ptr_eq(&var)) {
            self.foreign.push(var);
        }
    }

    /// Stop rooting `var`. Returns whether it was registered.
    pub fn unregister_foreign(&mut self, var: &SharedVariable) -> bool {
        let before = self.foreign.len();
        self.foreign.retain(|v| !v.ptr_eq(var));
        self.foreign.len() != before
    }

    /// Mark from `roots` plus the foreign variables and tear down every
    /// unreachable tracked variable. Returns how many were torn down.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn collect(&mut self, roots: Vec<SharedVariable>) -> usize {
        self.allocations_since_gc = 0;

        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut worklist = roots;
        worklist.extend(self.foreign.iter().cloned());
        while let Some(var) = worklist.pop() {
            if !visited.insert(var.id()) {
                continue;
            }
            var.borrow()
                .value()
                .enumerate_variables(&mut |child| worklist.push(child.clone()));
        }

        self.tracked.retain(WeakVariable::is_alive);
        let unreachable: Vec<SharedVariable> = self
            .tracked
            .iter()
            .filter_map(WeakVariable::upgrade)
            .filter(|var| !visited.contains(&var.id()))
            .collect();
        let count = Self::tear_down(&unreachable);
        drop(unreachable);
        self.tracked.retain(WeakVariable::is_alive);

        tracing::debug!(
            marked = visited.len(),
            collected = count,
            tracked = self.tracked.len(),
            "collection finished"
        );
        count
    }

    /// Tear down every tracked variable, reachable or not.
    ///
    /// Run when the owning context goes away so no cycle outlives it.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn finalize(&mut self) -> usize {
        self.foreign.clear();
        let live: Vec<SharedVariable> = self
            .tracked
            .drain(..)
            .filter_map(|w| w.upgrade())
            .collect();
        let count = Self::tear_down(&live);
        tracing::debug!(finalized = count, "collector finalized");
        count
    }

    fn tear_down(vars: &[SharedVariable]) -> usize {
        for var in vars {
            let old = var.borrow_mut().uninitialize();
            drop(old);
        }
        vars.len()
    }
}

#[cfg(test)]
mod tests;
