//! Stack growth for the recursive passes.
//!
//! The parser, resolver and evaluator recurse once per nesting level of the
//! program, so a long enough expression or a deep enough call chain would
//! run off the end of the native stack.  Their recursive entry points run
//! through [`ensure_sufficient_stack`], which switches to a freshly
//! allocated segment when the current one is nearly used up.
//!
//! On `wasm32` the closure is called directly.

/// Grow when less than this much stack remains.
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated segment.
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a new stack segment if the current one is
/// within `RED_ZONE` bytes of overflowing.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
