//! # View
//!
//! Bounds-checked access to a run of instruction words in live program text

use std::mem;
use std::ptr;

/// A window of `len` instruction words starting at `base`
///
/// Reads are volatile since the words may be changed behind Rust's back (by us through a [`Patcher`](crate::patcher::Patcher),
/// or by whoever else owns the text). Every access is checked against the length of the view.
#[derive(Debug, Clone, Copy)]
pub struct TextView {
    /// First word of the view
    base: *mut u32,
    /// Number of words in the view
    len: usize,
}
impl TextView {
    /// Creates a view over `len` words starting at `base`
    ///
    /// # Safety
    ///
    /// - `base` must be 4-byte aligned and [valid](https://doc.rust-lang.org/stable/std/ptr/index.html#safety) for reads of `len` words
    ///   for as long as the view (or any copy of it) is used
    /// - nobody else may write to the viewed words while the view is in use
    pub unsafe fn from_raw(base: *mut u32, len: usize) -> Self {
        Self { base, len }
    }

    /// Creates a view over the words of `words`
    ///
    /// # Safety
    ///
    /// Writing through the returned view's pointers is only sound if `words` is not otherwise borrowed while doing so.
    pub unsafe fn from_slice(words: &mut [u32]) -> Self {
        Self::from_raw(words.as_mut_ptr(), words.len())
    }

    /// Address of the first word
    pub fn base(&self) -> usize {
        self.base as usize
    }

    /// Number of words in the view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the view holds no words
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pointer to the word at `index`, or `None` if it lies outside the view
    pub fn word_ptr(&self, index: usize) -> Option<*mut u32> {
        // Safety: `index` is within the range the creator vouched for
        (index < self.len).then(|| unsafe { self.base.add(index) })
    }

    /// Address of the word at `index`, or `None` if it lies outside the view
    pub fn address_of(&self, index: usize) -> Option<usize> {
        self.word_ptr(index).map(|p| p as usize)
    }

    /// Index of the word at `address`, or `None` if it isn't a word of this view
    pub fn index_of(&self, address: usize) -> Option<usize> {
        let offset = address.checked_sub(self.base())?;
        let index = offset / mem::size_of::<u32>();
        (offset % mem::size_of::<u32>() == 0 && index < self.len).then_some(index)
    }

    /// Reads the word at `index`, or `None` if it lies outside the view
    pub fn read(&self, index: usize) -> Option<u32> {
        // Safety: `from_raw` requires the whole view to be readable
        self.word_ptr(index).map(|p| unsafe { ptr::read_volatile(p) })
    }
}

#[cfg(test)]
mod tests {
    use super::TextView;

    #[test]
    /// Reads inside the view succeed and reads outside of it are refused
    fn test_bounds() {
        let mut words = vec![10u32, 11, 12];
        let view = unsafe { TextView::from_slice(&mut words) };

        assert_eq!(view.len(), 3);
        assert_eq!(view.read(0), Some(10));
        assert_eq!(view.read(2), Some(12));
        assert_eq!(view.read(3), None);
        assert_eq!(view.read(usize::MAX), None);
        assert_eq!(view.address_of(3), None);
    }

    #[test]
    /// Addresses and indices convert back and forth
    fn test_addresses() {
        let mut words = vec![0u32; 4];
        let view = unsafe { TextView::from_slice(&mut words) };

        let address = view.address_of(2).unwrap();
        assert_eq!(address, view.base() + 8);
        assert_eq!(view.index_of(address), Some(2));
        assert_eq!(view.index_of(address + 1), None);
        assert_eq!(view.index_of(view.base() + 16), None);
        assert_eq!(view.index_of(view.base().wrapping_sub(4)), None);
    }
}
