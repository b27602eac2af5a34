//! Mica Runtime - execution core of the Mica scripting language.
//!
//! This crate runs programs that a front-end has already lowered to AIR
//! ("abstract instruction representation") trees:
//!
//! - `AirNode` / `Program`: the closed instruction set, plus `solidify`
//! - `GlobalContext`: globals, call frames, the collector and the embedding API
//! - `Reference` / `ReferenceModifier`: replayable paths into values
//! - `ReferenceDictionary`: the scope table, with cached lookup hints
//! - `Variable`: named storage with an initialization state
//! - `GarbageCollector`: tracing collection of reference cycles
//!
//! # Architecture
//!
//! Values are reference-counted and copy-on-write. Variables are shared
//! cells, so closures that capture one another leak under counting alone;
//! the collector marks from the context's roots and tears down everything
//! else it tracks. Calls in tail position are trampolined and run in
//! constant native stack; other calls grow the native stack on demand.
//!
//! # Tracing
//!
//! Enable tracing with environment variables:
//! - `RUST_LOG=mica_runtime=debug` - collector passes, closure instantiation
//! - `RUST_LOG=mica_runtime=trace` - tail-call chains, caught exceptions
//!
//! Hosts that have no subscriber of their own can call [`init_tracing`].

mod air;
mod collector;
mod errors;
mod executive;
mod function;
mod global_context;
mod hooks;
mod reference;
mod reference_dictionary;
mod reference_modifier;
mod reference_stack;
mod script;
mod stack;
mod value;
mod variable;

use std::sync::Once;

pub use air::{AirNode, AirStatus, Program};
pub use collector::{GarbageCollector, DEFAULT_GC_THRESHOLD};
pub use errors::{
    // Reference access errors
    not_assignable, not_unsettable, tail_call_dereference, type_mismatch, uninitialized_use,
    void_use, write_violation,
    // Name errors
    bypassed_initialization, reinitialization, undeclared_identifier,
    // Call errors
    not_callable, recursion_limit,
    // Operator errors
    arithmetic_overflow, division_by_zero, invalid_operand, unordered,
    // Statement errors
    assertion_failure, invalid_initializer, invalid_range,
    // Host errors
    custom,
    BacktraceFrame, ExceptionKind, FatalError, FrameKind, RuntimeError, RuntimeException,
    RuntimeResult,
};
pub use executive::{evaluate_binary, evaluate_unary};
pub use function::{Function, InstantiatedFunction, NativeFunction};
pub use global_context::{GlobalContext, GlobalContextBuilder, RuntimeOptions};
pub use hooks::Hooks;
pub use mica_ir::{Name, PtcAware, SourceLocation, Xop};
pub use reference::{PtcArguments, Reference, ReferenceRoot};
pub use reference_dictionary::ReferenceDictionary;
pub use reference_modifier::{wrap_index, ReferenceModifier, WrappedIndex};
pub use reference_stack::ReferenceStack;
pub use script::Script;
pub use stack::ensure_sufficient_stack;
pub use value::{Compare, Heap, ObjectMap, Value};
pub use variable::{SharedVariable, Variable, VariableState, WeakVariable};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, and only the first call has an
/// effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
