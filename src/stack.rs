//! Stack growth for the recursive parser and evaluator.
//!
//! Deeply nested source and deeply recursive Monkey functions recurse on the
//! host stack. Wrapping the recursive entry points in
//! [`ensure_sufficient_stack`] grows the stack on demand, so recursion depth
//! is bounded by available memory instead of the thread's native stack size.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

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
