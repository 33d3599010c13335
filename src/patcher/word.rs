//! This module contains a plain word patcher

use std::ptr;

use super::Patcher;

/// Patcher storing words directly, without touching memory protections.
/// This patcher never fails.
///
/// Suited for text that is already writable, e.g. because the host lifted the protection for us.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordPatcher;
impl WordPatcher {
    /// Creates a new [`WordPatcher`]
    pub fn new() -> Self {
        Self::default()
    }
}
unsafe impl Patcher for WordPatcher {
    type Error = ();

    unsafe fn write(&self, target: *mut u32, value: u32) -> Result<(), Self::Error> {
        // Safety: caller must ensure that `target` is valid and writable
        ptr::write_volatile(target, value);
        Ok(())
    }
}
