//! This module contains a patcher which adjusts memory permissions to patch read-only text

use std::mem;

use region::Protection;
use thiserror::Error;

use super::Patcher;

/// Errors when using permission patching
#[derive(Debug, Error)]
pub enum PermissionError<E> {
    /// Error when setting memory protections
    #[error("Error setting memory protections")]
    ProtectionError(#[from] region::Error),
    /// Custom error type from the underlying patcher
    #[error("{0:?}")]
    CustomError(E),
}
impl From<()> for PermissionError<()> {
    fn from(e: ()) -> Self {
        Self::CustomError(e)
    }
}

/// This struct wraps patchers to allow them to write to text that's normally unwritable.
/// It achieves this result by changing the memory permissions of the target page, triggering the write, and then reverting the permissions.
///
/// # Safety
///
/// The permissions of the whole page holding the target are changed for the duration of the write.
/// Other code relying on that page being read-only during that time is undefined behavior.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionWrapper<P: Patcher> {
    /// Underlying patcher.
    patcher: P,
}
impl<P: Patcher> PermissionWrapper<P> {
    /// Creates a new PermissionWrapper
    pub fn new(patcher: P) -> Self {
        Self { patcher }
    }
}

unsafe impl<P> Patcher for PermissionWrapper<P>
where
    P: Patcher,
    PermissionError<P::Error>: From<P::Error>,
{
    type Error = PermissionError<P::Error>;

    unsafe fn write(&self, target: *mut u32, value: u32) -> Result<(), Self::Error> {
        // the previous protection is restored when `_guard` drops
        let _guard = region::protect_with_handle(target, mem::size_of::<u32>(), Protection::all())?;
        self.patcher.write(target, value).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use region::Protection;

    use crate::patcher::mem::PermissionWrapper;
    use crate::patcher::word::WordPatcher;
    use crate::patcher::Patcher;

    #[test]
    /// Tests to ensure permissions are lifted for the write and put back afterwards
    fn test_perms() {
        // Allocate a page and make it read-only, like program text.
        // Normally, writing to this page would result in a segfault, but PermissionWrapper changes the permissions to be writable so that no fault occurs
        let mut page = region::alloc(region::page::size(), Protection::READ_WRITE).unwrap();
        let ptr = page.as_mut_ptr::<u32>();
        unsafe {
            ptr::write_volatile(ptr, 0x0002_0336);
            region::protect(ptr, 4, Protection::READ).unwrap();
        }

        // sanity check
        assert_eq!(region::query(ptr).unwrap().protection(), Protection::READ);

        // create the patcher and wrapper
        let patcher = WordPatcher::new();
        let wrapper = PermissionWrapper::new(patcher);

        // patch the word
        unsafe { wrapper.write(ptr, 0).unwrap() };

        // make sure the data was actually changed
        assert_eq!(unsafe { ptr::read_volatile(ptr) }, 0);

        // make sure permissions reverted correctly after the patch
        assert_eq!(region::query(ptr).unwrap().protection(), Protection::READ);

        // restore the word the same way
        unsafe { wrapper.write(ptr, 0x0002_0336).unwrap() };
        assert_eq!(unsafe { ptr::read_volatile(ptr) }, 0x0002_0336);
        assert_eq!(region::query(ptr).unwrap().protection(), Protection::READ);
    }
}
