//! Native stack growth for nested calls.
//!
//! Every non-tail call runs the callee on the host stack, so deeply nested
//! script recursion is deep host recursion. `GlobalContext` routes each
//! invocation through [`ensure_sufficient_stack`]; the deep recursion
//! scenario in `tests/scenarios` drives it ten thousand frames deep.

/// Headroom below which a call switches to a fresh segment.
const CALL_HEADROOM: usize = 256 * 1024;

/// Size of each segment allocated when the headroom runs out.
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first moving to a new stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(CALL_HEADROOM, SEGMENT_SIZE, f)
}

/// WASM manages its own stack; depth is bounded by
/// `RuntimeOptions::max_recursion_depth` instead.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
