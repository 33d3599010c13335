//! # Descriptor
//!
//! Declarative description of a single patch site: where to search, what to look for, what to double-check and what
//! to write. Descriptors never change after construction; everything produced while patching lives in
//! [`PatchState`](crate::engine::PatchState).

use std::ops::Range;

use serde::Deserialize;

use crate::config::RawDescriptor;
use crate::pattern::Pattern;

/// Secondary check performed relative to a primary match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// Offset in instruction words from the primary match. Never zero.
    offset: usize,
    /// Pattern the word at `offset` has to match
    pattern: Pattern,
}
impl Verification {
    /// Offset in instruction words from the primary match
    pub fn offset(&self) -> usize {
        self.offset
    }
    /// Pattern the verified word has to match
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

/// One candidate patch site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDescriptor")]
pub struct PatchDescriptor {
    /// Symbol the search starts from
    symbol: String,
    /// Instruction words skipped before the first comparison
    start_offset: usize,
    /// Number of positions examined, starting at `start_offset`
    max_offset: usize,
    /// Pattern of the instruction to find
    search: Pattern,
    /// Optional secondary check
    verify: Option<Verification>,
    /// Offset in instruction words from the match to the word being replaced
    patch_offset: usize,
    /// Replacement word
    patch_value: u32,
}
impl PatchDescriptor {
    /// Creates a descriptor searching `max_offset` words from the start of `symbol` and replacing the matched word itself
    pub fn new(symbol: impl Into<String>, max_offset: usize, search: Pattern, patch_value: u32) -> Self {
        Self {
            symbol: symbol.into(),
            start_offset: 0,
            max_offset,
            search,
            verify: None,
            patch_offset: 0,
            patch_value,
        }
    }

    /// Skips `start_offset` words before the first comparison
    pub fn start_at(mut self, start_offset: usize) -> Self {
        self.start_offset = start_offset;
        self
    }

    /// Requires the word at `offset` from a match to match `pattern` as well
    ///
    /// An `offset` of zero disables verification.
    pub fn verify(mut self, offset: usize, pattern: Pattern) -> Self {
        self.verify = (offset != 0).then_some(Verification { offset, pattern });
        self
    }

    /// Replaces the word at `patch_offset` from the match instead of the match itself
    pub fn patch_at(mut self, patch_offset: usize) -> Self {
        self.patch_offset = patch_offset;
        self
    }

    /// Symbol the search starts from
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
    /// Words skipped before the first comparison
    pub fn start_offset(&self) -> usize {
        self.start_offset
    }
    /// Length of the search window in words
    pub fn max_offset(&self) -> usize {
        self.max_offset
    }
    /// Pattern of the instruction to find
    pub fn search(&self) -> &Pattern {
        &self.search
    }
    /// Secondary check, if any
    pub fn verification(&self) -> Option<&Verification> {
        self.verify.as_ref()
    }
    /// Offset from the match to the replaced word
    pub fn patch_offset(&self) -> usize {
        self.patch_offset
    }
    /// Replacement word
    pub fn patch_value(&self) -> u32 {
        self.patch_value
    }

    /// Positions (in words, relative to the symbol) at which the search pattern is compared
    pub fn window(&self) -> Range<usize> {
        self.start_offset..self.start_offset.saturating_add(self.max_offset)
    }

    /// Number of words, starting at the symbol, that a scan of this descriptor may read
    pub fn span(&self) -> usize {
        let reach = self
            .verify
            .map_or(0, |v| v.offset)
            .max(self.patch_offset);
        self.window().end.saturating_add(reach)
    }
}

#[cfg(test)]
mod tests {
    use crate::pattern::Pattern;

    use super::PatchDescriptor;

    #[test]
    /// A zero verification offset means no verification at all
    fn test_zero_verify_offset() {
        let descriptor = PatchDescriptor::new("f", 4, Pattern::exact(1), 0).verify(0, Pattern::exact(2));
        assert!(descriptor.verification().is_none());

        let descriptor = descriptor.verify(1, Pattern::exact(2));
        assert_eq!(descriptor.verification().map(|v| v.offset()), Some(1));
    }

    #[test]
    /// The span covers the window plus the furthest word read relative to a match
    fn test_span() {
        let descriptor = PatchDescriptor::new("f", 10, Pattern::exact(1), 0);
        assert_eq!(descriptor.window(), 0..10);
        assert_eq!(descriptor.span(), 10);

        let descriptor = descriptor.start_at(2).patch_at(1).verify(3, Pattern::exact(2));
        assert_eq!(descriptor.window(), 2..12);
        assert_eq!(descriptor.span(), 15);
    }
}
