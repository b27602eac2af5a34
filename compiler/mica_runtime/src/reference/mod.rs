//! References: replayable assignable locations.
//!
//! A `Reference` is a root plus an ordered chain of modifiers. It never holds
//! an address into a container; each access replays the chain against the
//! current root value, so auto-vivification may relocate storage freely
//! between creating a reference and using it.

use std::rc::Rc;

use mica_ir::{PtcAware, SourceLocation};
use smallvec::SmallVec;

use crate::errors::{
    not_assignable, not_unsettable, tail_call_dereference, uninitialized_use, void_use,
    RuntimeResult,
};
use crate::reference_modifier::ReferenceModifier;
use crate::value::Value;
use crate::variable::SharedVariable;

/// Arguments of a pending proper tail call.
#[derive(Clone, Debug)]
pub struct PtcArguments {
    pub sloc: SourceLocation,
    pub ptc: PtcAware,
    pub target: Value,
    pub self_ref: Reference,
    pub args: Vec<Reference>,
}

/// What a reference starts from.
#[derive(Clone, Debug, Default)]
pub enum ReferenceRoot {
    /// Declared but not yet bound.
    #[default]
    Uninit,
    /// Result of a call that returned nothing.
    Void,
    /// Literal; read-only.
    Constant(Value),
    /// Computed value; read-only.
    Temporary(Value),
    /// Named, writable storage.
    Variable(SharedVariable),
    /// A tail call the interpreter has not run yet.
    PtcArgs(Rc<PtcArguments>),
}

/// A root plus a chain of modifiers.
#[derive(Clone, Debug, Default)]
pub struct Reference {
    root: ReferenceRoot,
    modifiers: SmallVec<[ReferenceModifier; 4]>,
}

impl Reference {
    #[inline]
    pub fn uninit() -> Self {
        Self::default()
    }

    #[inline]
    pub fn void() -> Self {
        Self::from_root(ReferenceRoot::Void)
    }

    #[inline]
    pub fn constant(value: Value) -> Self {
        Self::from_root(ReferenceRoot::Constant(value))
    }

    #[inline]
    pub fn temporary(value: Value) -> Self {
        Self::from_root(ReferenceRoot::Temporary(value))
    }

    #[inline]
    pub fn variable(var: SharedVariable) -> Self {
        Self::from_root(ReferenceRoot::Variable(var))
    }

    #[inline]
    pub fn ptc(args: PtcArguments) -> Self {
        Self::from_root(ReferenceRoot::PtcArgs(Rc::new(args)))
    }

    fn from_root(root: ReferenceRoot) -> Self {
        Reference {
            root,
            modifiers: SmallVec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> &ReferenceRoot {
        &self.root
    }

    #[inline]
    pub fn modifiers(&self) -> &[ReferenceModifier] {
        &self.modifiers
    }

    #[inline]
    pub fn is_uninit(&self) -> bool {
        matches!(self.root, ReferenceRoot::Uninit)
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self.root, ReferenceRoot::Void)
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self.root, ReferenceRoot::Constant(_))
    }

    #[inline]
    pub fn is_temporary(&self) -> bool {
        matches!(self.root, ReferenceRoot::Temporary(_))
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        matches!(self.root, ReferenceRoot::Variable(_))
    }

    #[inline]
    pub fn is_ptc_args(&self) -> bool {
        matches!(self.root, ReferenceRoot::PtcArgs(_))
    }

    /// The variable this reference names directly (no modifiers).
    pub fn get_variable_opt(&self) -> Option<&SharedVariable> {
        match &self.root {
            ReferenceRoot::Variable(var) if self.modifiers.is_empty() => Some(var),
            _ => None,
        }
    }

    /// Pending tail call arguments, consuming the reference.
    pub fn into_ptc_args(self) -> Result<Rc<PtcArguments>, Reference> {
        match self.root {
            ReferenceRoot::PtcArgs(args) => Ok(args),
            root => Err(Reference {
                root,
                modifiers: self.modifiers,
            }),
        }
    }

    #[inline]
    pub fn push_modifier(&mut self, modifier: ReferenceModifier) {
        self.modifiers.push(modifier);
    }

    #[inline]
    pub fn pop_modifier(&mut self) -> Option<ReferenceModifier> {
        self.modifiers.pop()
    }

    /// Read the value this reference designates. Missing elements read as
    /// null.
    pub fn dereference_readonly(&self) -> RuntimeResult<Value> {
        match &self.root {
            ReferenceRoot::Constant(value) | ReferenceRoot::Temporary(value) => {
                self.read_through(value)
            }
            ReferenceRoot::Variable(var) => {
                let var = var.borrow();
                if !var.is_initialized() {
                    return Err(uninitialized_use());
                }
                self.read_through(var.value())
            }
            ReferenceRoot::Uninit => Err(uninitialized_use()),
            ReferenceRoot::Void => Err(void_use()),
            ReferenceRoot::PtcArgs(_) => Err(tail_call_dereference()),
        }
    }

    fn read_through(&self, root: &Value) -> RuntimeResult<Value> {
        let mut current = root;
        for m in &self.modifiers {
            match m.apply_read_opt(current)? {
                Some(child) => current = child,
                None => return Ok(Value::Null),
            }
        }
        Ok(current.clone())
    }

    fn check_writable(&self) -> RuntimeResult<&SharedVariable> {
        match &self.root {
            ReferenceRoot::Variable(var) => Ok(var),
            ReferenceRoot::Constant(value) => Err(not_assignable("constant", value)),
            ReferenceRoot::Temporary(value) => Err(not_assignable("temporary", value)),
            ReferenceRoot::Uninit => Err(uninitialized_use()),
            ReferenceRoot::Void => Err(void_use()),
            ReferenceRoot::PtcArgs(_) => Err(tail_call_dereference()),
        }
    }

    /// Run `f` on the designated slot, creating containers and elements along
    /// the path as needed.
    pub fn open_with<R>(&self, f: impl FnOnce(&mut Value) -> RuntimeResult<R>) -> RuntimeResult<R> {
        let var = self.check_writable()?;
        let mut var = var.borrow_mut();
        let mut slot = var.open_value()?;
        for m in &self.modifiers {
            slot = m.apply_open(slot)?;
        }
        f(slot)
    }

    /// Run `f` on the designated slot if it exists; never creates storage.
    pub fn modify_opt<R>(&self, f: impl FnOnce(&mut Value) -> R) -> RuntimeResult<Option<R>> {
        let var = self.check_writable()?;
        let mut var = var.borrow_mut();
        let mut slot = var.open_value()?;
        for m in &self.modifiers {
            match m.apply_write_opt(slot)? {
                Some(child) => slot = child,
                None => return Ok(None),
            }
        }
        Ok(Some(f(slot)))
    }

    /// Assign through the reference, creating storage as needed.
    pub fn write(&self, value: Value) -> RuntimeResult<()> {
        self.open_with(|slot| {
            *slot = value;
            Ok(())
        })
    }

    /// Remove the designated element and return its value.
    ///
    /// Fails on a reference without modifiers. A missing element, or a null
    /// container on the way, yields null.
    pub fn dereference_unset(&self) -> RuntimeResult<Value> {
        let Some((last, path)) = self.modifiers.split_last() else {
            return Err(not_unsettable());
        };
        let var = self.check_writable()?;
        let mut var = var.borrow_mut();
        let mut parent = var.open_value()?;
        for m in path {
            match m.apply_write_opt(parent)? {
                Some(child) => parent = child,
                None => return Ok(Value::Null),
            }
        }
        last.apply_unset(parent)
    }

    /// Collapse into a temporary holding the current value.
    pub fn mutate_into_temporary(&mut self) -> RuntimeResult<()> {
        if self.is_temporary() && self.modifiers.is_empty() {
            return Ok(());
        }
        let value = self.dereference_readonly()?;
        *self = Reference::temporary(value);
        Ok(())
    }

    /// Report the Variables this reference keeps alive.
    pub fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        match &self.root {
            ReferenceRoot::Uninit | ReferenceRoot::Void => {}
            ReferenceRoot::Constant(value) | ReferenceRoot::Temporary(value) => {
                value.enumerate_variables(callback);
            }
            ReferenceRoot::Variable(var) => callback(var),
            ReferenceRoot::PtcArgs(ptc) => {
                ptc.target.enumerate_variables(callback);
                ptc.self_ref.enumerate_variables(callback);
                for arg in &ptc.args {
                    arg.enumerate_variables(callback);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
