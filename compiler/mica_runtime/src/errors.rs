//! Runtime error types.
//!
//! Two families travel through the same `Result`:
//!
//! - **Exceptions** are language-level, value-carrying and catchable by
//!   `try`. They collect a backtrace of source locations while unwinding.
//! - **Fatal errors** signal an instruction program the front-end should
//!   never have produced (stack underflow, scope depth out of range, a
//!   `break` escaping a function). `try` never catches them.
//!
//! # Structured Error Categories
//!
//! `ExceptionKind` gives every runtime-raised exception a typed category so
//! hosts and tests match on kinds, not message text. Factory functions
//! (e.g. `type_mismatch()`) are the public way to build them; they fill both
//! the kind and the thrown value (the message string).

use std::fmt;

use mica_ir::{Name, SourceLocation, Xop};

use crate::value::Value;

/// Result of a runtime operation.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Typed category of a language exception.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExceptionKind {
    // Reference access
    TypeMismatch {
        operation: &'static str,
        parent: String,
        operand: String,
    },
    WriteViolation {
        value: String,
    },
    UninitializedUse,
    NotAssignable {
        what: &'static str,
        value: String,
    },
    VoidUse,
    TailCallDereference,
    NotUnsettable,

    // Names
    UndeclaredIdentifier {
        name: String,
    },
    BypassedInitialization {
        name: String,
    },
    Reinitialization,

    // Calls
    NotCallable {
        type_name: &'static str,
    },
    RecursionLimit {
        depth: usize,
    },

    // Operators
    InvalidOperand {
        op: Xop,
        operands: String,
    },
    ArithmeticOverflow {
        operation: String,
    },
    DivisionByZero,
    Unordered {
        lhs: String,
        rhs: String,
    },

    // Statements
    AssertionFailure {
        message: String,
    },
    InvalidInitializer {
        expected: &'static str,
        got: &'static str,
    },
    InvalidRange {
        type_name: &'static str,
    },

    /// Raised by a `throw` statement; the thrown value is the payload.
    Thrown,

    /// Catch-all for host functions that report plain messages.
    Custom {
        message: String,
    },
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                operation,
                parent,
                operand,
            } => write!(
                f,
                "{operation} inapplicable (parent `{parent}`, operand `{operand}`)"
            ),
            Self::WriteViolation { value } => {
                write!(f, "attempt to modify an immutable variable `{value}`")
            }
            Self::UninitializedUse => write!(f, "attempt to use an uninitialized variable"),
            Self::NotAssignable { what, value } => {
                write!(f, "attempt to modify a {what} `{value}`")
            }
            Self::VoidUse => write!(
                f,
                "attempt to use the result of a function call which returned no value"
            ),
            Self::TailCallDereference => write!(f, "tail call wrapper not dereferenceable"),
            Self::NotUnsettable => write!(f, "non-member values cannot be unset"),

            Self::UndeclaredIdentifier { name } => write!(f, "undeclared identifier `{name}`"),
            Self::BypassedInitialization { name } => {
                write!(f, "initialization of variable or reference `{name}` bypassed")
            }
            Self::Reinitialization => write!(f, "attempt to initialize a variable twice"),

            Self::NotCallable { type_name } => {
                write!(f, "attempt to call a non-function (type `{type_name}`)")
            }
            Self::RecursionLimit { depth } => {
                write!(f, "maximum recursion depth exceeded (limit: {depth})")
            }

            Self::InvalidOperand { op, operands } => {
                write!(f, "operator `{op}` inapplicable to {operands}")
            }
            Self::ArithmeticOverflow { operation } => {
                write!(f, "integer overflow in {operation}")
            }
            Self::DivisionByZero => write!(f, "integer division by zero"),
            Self::Unordered { lhs, rhs } => {
                write!(f, "values not comparable (operands `{lhs}` and `{rhs}`)")
            }

            Self::AssertionFailure { message } => write!(f, "assertion failure: {message}"),
            Self::InvalidInitializer { expected, got } => {
                write!(f, "initializer was not an {expected} (got `{got}`)")
            }
            Self::InvalidRange { type_name } => {
                write!(f, "range value not iterable (type `{type_name}`)")
            }

            Self::Thrown => write!(f, "exception thrown"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Role of a backtrace frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Raised by the runtime while executing an instruction.
    Native,
    /// Raised by a `throw` statement.
    Throw,
    /// Passed through a call site.
    Call,
    /// Left a function body.
    Function,
    /// Raised or superseded inside a deferred body.
    Defer,
    /// Re-raised from a `catch` clause.
    Catch,
}

impl FrameKind {
    /// Short label used in printed backtraces and `__backtrace` objects.
    pub fn label(self) -> &'static str {
        match self {
            FrameKind::Native => "native",
            FrameKind::Throw => "throw",
            FrameKind::Call => "call",
            FrameKind::Function => "function",
            FrameKind::Defer => "defer",
            FrameKind::Catch => "catch",
        }
    }
}

/// One entry of the location chain carried by an exception.
#[derive(Clone, Debug)]
pub struct BacktraceFrame {
    pub kind: FrameKind,
    pub sloc: SourceLocation,
    /// Value relevant at this frame (the thrown value, or the callee).
    pub value: Value,
}

/// A catchable language exception.
#[derive(Clone, Debug)]
pub struct RuntimeException {
    /// Structured category.
    pub kind: ExceptionKind,
    /// The value seen by a `catch` clause.
    pub value: Value,
    /// Location chain, innermost first.
    pub frames: Vec<BacktraceFrame>,
}

impl RuntimeException {
    /// Exception from a `throw` statement.
    pub fn thrown(sloc: SourceLocation, value: Value) -> Self {
        RuntimeException {
            kind: ExceptionKind::Thrown,
            value: value.clone(),
            frames: vec![BacktraceFrame {
                kind: FrameKind::Throw,
                sloc,
                value,
            }],
        }
    }

    fn from_kind(kind: ExceptionKind) -> Self {
        let value = Value::string(kind.to_string());
        RuntimeException {
            kind,
            value,
            frames: Vec::new(),
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        match &self.kind {
            ExceptionKind::Thrown => match self.value.as_str() {
                Some(text) => text.to_string(),
                None => self.value.to_string(),
            },
            kind => kind.to_string(),
        }
    }

    /// Append a frame to the location chain.
    pub fn push_frame(&mut self, kind: FrameKind, sloc: SourceLocation, value: Value) {
        self.frames.push(BacktraceFrame { kind, sloc, value });
    }
}

impl fmt::Display for RuntimeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "runtime error: {}", self.message())?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: [{}] at {}", frame.kind.label(), frame.sloc)?;
            if !frame.value.is_null() {
                write!(f, " ({})", frame.value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Unrecoverable host-level error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FatalError {
    #[error("evaluation stack underflow (needed {needed}, had {available})")]
    StackUnderflow { needed: usize, available: usize },
    #[error("scope depth {depth} out of range (frame has {available} scopes)")]
    ScopeDepth { depth: u32, available: usize },
    #[error("`{status}` escaped a function body")]
    StrayStatus { status: &'static str },
    #[error("no active call frame")]
    NoFrame,
    #[error("stack top is not a variable reference")]
    NotAVariable,
}

/// Error produced by the runtime.
#[derive(Clone, Debug)]
pub enum RuntimeError {
    /// Catchable language exception.
    Exception(Box<RuntimeException>),
    /// Never caught at the language level.
    Fatal(FatalError),
}

impl RuntimeError {
    /// Whether `try` may catch this error.
    #[inline]
    pub fn is_exception(&self) -> bool {
        matches!(self, RuntimeError::Exception(_))
    }

    /// The exception, if this is one.
    pub fn as_exception(&self) -> Option<&RuntimeException> {
        match self {
            RuntimeError::Exception(e) => Some(e),
            RuntimeError::Fatal(_) => None,
        }
    }

    /// The exception category, if this is an exception.
    pub fn exception_kind(&self) -> Option<&ExceptionKind> {
        self.as_exception().map(|e| &e.kind)
    }

    /// Record a location on an unwinding exception. Fatal errors pass through.
    #[must_use]
    pub fn with_frame(mut self, kind: FrameKind, sloc: &SourceLocation, value: Value) -> Self {
        if let RuntimeError::Exception(e) = &mut self {
            e.push_frame(kind, sloc.clone(), value);
        }
        self
    }

    /// Record the instruction location on an exception raised by the runtime.
    ///
    /// Only the first (innermost) location is kept; outer instructions that
    /// merely propagate the error do not add noise.
    #[must_use]
    pub fn at(mut self, sloc: &SourceLocation) -> Self {
        if let RuntimeError::Exception(e) = &mut self {
            if e.frames.is_empty() {
                e.push_frame(FrameKind::Native, sloc.clone(), Value::Null);
            }
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Exception(e) => write!(f, "{e}"),
            RuntimeError::Fatal(e) => write!(f, "fatal error: {e}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<RuntimeException> for RuntimeError {
    fn from(e: RuntimeException) -> Self {
        RuntimeError::Exception(Box::new(e))
    }
}

impl From<FatalError> for RuntimeError {
    fn from(e: FatalError) -> Self {
        RuntimeError::Fatal(e)
    }
}

fn raise(kind: ExceptionKind) -> RuntimeError {
    RuntimeException::from_kind(kind).into()
}

// Reference access errors

/// A modifier was applied to a value of the wrong type.
#[cold]
pub fn type_mismatch(operation: &'static str, parent: &Value, operand: &dyn fmt::Display) -> RuntimeError {
    raise(ExceptionKind::TypeMismatch {
        operation,
        parent: parent.to_string(),
        operand: operand.to_string(),
    })
}

/// Write through a reference to an immutable variable.
#[cold]
pub fn write_violation(current: &Value) -> RuntimeError {
    raise(ExceptionKind::WriteViolation {
        value: current.to_string(),
    })
}

/// Use of a variable before its initialization.
#[cold]
pub fn uninitialized_use() -> RuntimeError {
    raise(ExceptionKind::UninitializedUse)
}

/// Write to a constant or temporary.
#[cold]
pub fn not_assignable(what: &'static str, value: &Value) -> RuntimeError {
    raise(ExceptionKind::NotAssignable {
        what,
        value: value.to_string(),
    })
}

/// Use of the result of a call that returned nothing.
#[cold]
pub fn void_use() -> RuntimeError {
    raise(ExceptionKind::VoidUse)
}

/// Dereference of a pending tail call.
#[cold]
pub fn tail_call_dereference() -> RuntimeError {
    raise(ExceptionKind::TailCallDereference)
}

/// `unset` of a reference without modifiers.
#[cold]
pub fn not_unsettable() -> RuntimeError {
    raise(ExceptionKind::NotUnsettable)
}

// Name errors

/// Lookup of a name that is not bound.
#[cold]
pub fn undeclared_identifier(name: &Name) -> RuntimeError {
    raise(ExceptionKind::UndeclaredIdentifier {
        name: name.to_string(),
    })
}

/// Lookup of a name whose initialization was skipped.
#[cold]
pub fn bypassed_initialization(name: &Name) -> RuntimeError {
    raise(ExceptionKind::BypassedInitialization {
        name: name.to_string(),
    })
}

/// Initialization of an already initialized variable.
#[cold]
pub fn reinitialization() -> RuntimeError {
    raise(ExceptionKind::Reinitialization)
}

// Call errors

/// Call of a value that is not a function.
#[cold]
pub fn not_callable(value: &Value) -> RuntimeError {
    raise(ExceptionKind::NotCallable {
        type_name: value.type_name(),
    })
}

/// Too many nested non-tail calls.
#[cold]
pub fn recursion_limit(depth: usize) -> RuntimeError {
    raise(ExceptionKind::RecursionLimit { depth })
}

// Operator errors

/// Operator applied to operands it does not support.
#[cold]
pub fn invalid_operand(op: Xop, operands: &[&Value]) -> RuntimeError {
    let operands = operands
        .iter()
        .map(|v| format!("`{}`", v.type_name()))
        .collect::<Vec<_>>()
        .join(" and ");
    raise(ExceptionKind::InvalidOperand { op, operands })
}

/// Checked integer arithmetic overflowed.
#[cold]
pub fn arithmetic_overflow(operation: impl Into<String>) -> RuntimeError {
    raise(ExceptionKind::ArithmeticOverflow {
        operation: operation.into(),
    })
}

/// Integer division or remainder by zero.
#[cold]
pub fn division_by_zero() -> RuntimeError {
    raise(ExceptionKind::DivisionByZero)
}

/// Ordering comparison between unordered values.
#[cold]
pub fn unordered(lhs: &Value, rhs: &Value) -> RuntimeError {
    raise(ExceptionKind::Unordered {
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    })
}

// Statement errors

/// Failed `assert`.
#[cold]
pub fn assertion_failure(message: &str) -> RuntimeError {
    raise(ExceptionKind::AssertionFailure {
        message: message.to_string(),
    })
}

/// Destructuring from a value of the wrong type.
#[cold]
pub fn invalid_initializer(expected: &'static str, got: &Value) -> RuntimeError {
    raise(ExceptionKind::InvalidInitializer {
        expected,
        got: got.type_name(),
    })
}

/// `for each` over a value that is neither array, object nor null.
#[cold]
pub fn invalid_range(range: &Value) -> RuntimeError {
    raise(ExceptionKind::InvalidRange {
        type_name: range.type_name(),
    })
}

/// Plain-message exception, for host functions.
#[cold]
pub fn custom(message: impl Into<String>) -> RuntimeError {
    raise(ExceptionKind::Custom {
        message: message.into(),
    })
}
