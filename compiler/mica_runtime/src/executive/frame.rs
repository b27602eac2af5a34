//! Call frames and lexical scopes.

use mica_ir::SourceLocation;

use crate::air::Program;
use crate::reference::Reference;
use crate::reference_dictionary::ReferenceDictionary;
use crate::reference_stack::ReferenceStack;
use crate::value::Value;
use crate::variable::SharedVariable;

/// One lexical scope: its bindings and the bodies deferred until it exits.
#[derive(Default)]
pub(crate) struct Scope {
    pub(crate) names: ReferenceDictionary,
    pub(crate) defers: Vec<(SourceLocation, Program)>,
}

/// Activation record of one call.
pub(crate) struct Frame {
    pub(crate) func: Value,
    pub(crate) self_ref: Reference,
    /// Innermost last.
    pub(crate) scopes: Vec<Scope>,
    pub(crate) stack: ReferenceStack,
    /// Stacks set aside while deferred bodies run.
    pub(crate) saved_stacks: Vec<ReferenceStack>,
    /// Values of exceptions propagating through deferred bodies.
    pub(crate) unwinding: Vec<Value>,
}

impl Frame {
    /// Frame of a script function, opened with its parameter scope.
    pub(crate) fn script(func: Value, self_ref: Reference) -> Self {
        Frame {
            func,
            self_ref,
            scopes: vec![Scope::default()],
            stack: ReferenceStack::new(),
            saved_stacks: Vec::new(),
            unwinding: Vec::new(),
        }
    }

    /// Frame of a host function. It has no scopes; its stack holds the
    /// arguments so they stay reachable while the host runs.
    pub(crate) fn native(func: Value, self_ref: Reference, args: &[Reference]) -> Self {
        Frame {
            func,
            self_ref,
            scopes: Vec::new(),
            stack: args.iter().cloned().collect(),
            saved_stacks: Vec::new(),
            unwinding: Vec::new(),
        }
    }

    pub(crate) fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        self.func.enumerate_variables(callback);
        self.self_ref.enumerate_variables(callback);
        for scope in &self.scopes {
            for (_, reference) in &scope.names {
                reference.enumerate_variables(callback);
            }
            for (_, body) in &scope.defers {
                body.enumerate_variables(callback);
            }
        }
        for stack in std::iter::once(&self.stack).chain(&self.saved_stacks) {
            for reference in stack.iter() {
                reference.enumerate_variables(callback);
            }
        }
        for value in &self.unwinding {
            value.enumerate_variables(callback);
        }
    }
}
