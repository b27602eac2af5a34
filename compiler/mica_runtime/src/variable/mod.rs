//! Variables: heap-resident mutable cells.
//!
//! A `Variable` is shared by every Reference bound to it and by every closure
//! that captured it. Handles are `SharedVariable` (strong) and `WeakVariable`
//! (the collector's registry). Reference cycles through closures keep strong
//! counts above zero; the collector breaks them by tearing the cell down.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::errors::{reinitialization, uninitialized_use, write_violation, RuntimeResult};
use crate::value::Value;

/// Lifecycle of a variable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VariableState {
    #[default]
    Uninitialized,
    Mutable,
    Immutable,
}

/// A value cell with initialization and mutability tracking.
#[derive(Debug, Default)]
pub struct Variable {
    value: Value,
    state: VariableState,
}

impl Variable {
    #[inline]
    pub fn state(&self) -> VariableState {
        self.state
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state != VariableState::Uninitialized
    }

    #[inline]
    pub fn is_immutable(&self) -> bool {
        self.state == VariableState::Immutable
    }

    /// Current value; null while uninitialized.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Give the variable its first value.
    ///
    /// Fails if the variable is already initialized.
    pub fn initialize(&mut self, value: Value, immutable: bool) -> RuntimeResult<()> {
        if self.is_initialized() {
            return Err(reinitialization());
        }
        self.value = value;
        self.state = if immutable {
            VariableState::Immutable
        } else {
            VariableState::Mutable
        };
        Ok(())
    }

    /// Mutable access to the value for a write.
    ///
    /// Fails on an uninitialized variable, and on an immutable one (naming the
    /// value it keeps).
    pub fn open_value(&mut self) -> RuntimeResult<&mut Value> {
        match self.state {
            VariableState::Uninitialized => Err(uninitialized_use()),
            VariableState::Immutable => Err(write_violation(&self.value)),
            VariableState::Mutable => Ok(&mut self.value),
        }
    }

    /// Return to the uninitialized state, handing back the old value.
    pub fn uninitialize(&mut self) -> Value {
        self.state = VariableState::Uninitialized;
        std::mem::take(&mut self.value)
    }
}

/// Strong, shared handle to a `Variable`.
#[derive(Clone, Default)]
pub struct SharedVariable(Rc<RefCell<Variable>>);

impl SharedVariable {
    /// An uninitialized variable. Runtime code allocates through the collector
    /// so the variable is tracked.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, Variable> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, Variable> {
        self.0.borrow_mut()
    }

    /// Whether both handles name the same variable.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the variable, stable while it is alive.
    #[inline]
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    #[inline]
    pub fn downgrade(&self) -> WeakVariable {
        WeakVariable(Rc::downgrade(&self.0))
    }
}

// Never prints the value: variables sit on reference cycles.
impl fmt::Debug for SharedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(var) => write!(f, "SharedVariable({:?} @ {:#x})", var.state(), self.id()),
            Err(_) => write!(f, "SharedVariable(<borrowed> @ {:#x})", self.id()),
        }
    }
}

/// Weak handle to a `Variable`, held by the collector's registry.
#[derive(Clone, Debug)]
pub struct WeakVariable(Weak<RefCell<Variable>>);

impl WeakVariable {
    #[inline]
    pub fn upgrade(&self) -> Option<SharedVariable> {
        self.0.upgrade().map(SharedVariable)
    }

    /// Whether the variable is still alive.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
