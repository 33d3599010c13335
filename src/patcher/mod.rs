//! # Patcher
//!
//! This module covers patchers, the only code that ever writes to program text.
//! Everything above them (scanning, bookkeeping, reversal) is safe code operating on [`TextView`](crate::view::TextView)s.

pub mod mem;
pub mod word;

/// Writes a single instruction word
///
/// # Safety
///
/// Patchers are inherently unsafe. The implementor must ensure that `write` either stores the full word or leaves the
/// target untouched and reports an error
pub unsafe trait Patcher {
    /// Error type that can occur when writing. If writing always succeeds, use `()`.
    type Error;

    /// Stores `value` at `target`
    ///
    /// # Safety
    ///
    /// - `target` must be 4-byte aligned and [valid](https://doc.rust-lang.org/stable/std/ptr/index.html#safety) for a word-sized write,
    ///   or made so by the patcher (see [`PermissionWrapper`](mem::PermissionWrapper))
    /// - the caller must guarantee that nothing executes or reads the target concurrently
    unsafe fn write(&self, target: *mut u32, value: u32) -> Result<(), Self::Error>;
}

unsafe impl<P: Patcher> Patcher for &P {
    type Error = P::Error;

    unsafe fn write(&self, target: *mut u32, value: u32) -> Result<(), Self::Error> {
        (**self).write(target, value)
    }
}
