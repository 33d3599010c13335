//! # Pattern
//!
//! Masked comparison of instruction words, the primitive every search and verification is built on

/// Returns whether `(word & and_mask) | or_mask` equals `expected`
///
/// Clearing bits with `and_mask` turns them into "don't care" bits, e.g. the register an instruction loads into.
/// Setting bits with `or_mask` does the same for bits that are known to be set in `expected`.
pub const fn matches(word: u32, and_mask: u32, or_mask: u32, expected: u32) -> bool {
    (word & and_mask) | or_mask == expected
}

/// A value to look for together with the masks applied to every candidate word before comparing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pattern {
    /// Expected value after masking
    pub value: u32,
    /// Mask used for the logical AND
    pub and_mask: u32,
    /// Mask used for the logical OR
    pub or_mask: u32,
}
impl Pattern {
    /// Creates a new pattern from its raw parts
    pub const fn new(value: u32, and_mask: u32, or_mask: u32) -> Self {
        Self {
            value,
            and_mask,
            or_mask,
        }
    }

    /// Pattern that only matches `value` exactly
    pub const fn exact(value: u32) -> Self {
        Self::new(value, !0, 0)
    }

    /// Pattern matching `value` while ignoring every bit set in `ignored`
    ///
    /// The ignored bits are also cleared from `value`, so `value` may be a fully encoded instruction.
    pub const fn ignoring(value: u32, ignored: u32) -> Self {
        Self::new(value & !ignored, !ignored, 0)
    }

    /// Returns whether `word` matches this pattern
    pub const fn matches(&self, word: u32) -> bool {
        matches(word, self.and_mask, self.or_mask, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::{matches, Pattern};
    use crate::code::mips;

    #[test]
    /// AND mask clears the bits we don't care about
    fn test_and_mask() {
        assert!(matches(0x8C83_0010, !mips::RT_MASK, 0, 0x8C80_0010));
        assert!(matches(0x8C82_0010, !mips::RT_MASK, 0, 0x8C80_0010));
        // different base register
        assert!(!matches(0x8C63_0010, !mips::RT_MASK, 0, 0x8C80_0010));
    }

    #[test]
    /// OR mask forces bits, so the expected value must carry them
    fn test_or_mask() {
        assert!(matches(0x0000_0000, !0, 0x0000_00FF, 0x0000_00FF));
        assert!(matches(0x0000_0012, !0, 0x0000_00FF, 0x0000_00FF));
        assert!(!matches(0x0000_0012, !0, 0x0000_00FF, 0x0000_0012));
    }

    #[test]
    /// Identity masks reduce to plain equality
    fn test_identity_masks() {
        for word in [0, 1, 0x8000_0000, u32::MAX, 0x2402_0000] {
            assert!(matches(word, !0, 0, word));
            assert!(!matches(word, !0, 0, word ^ 1));
        }
        // an all-clearing AND mask matches anything against its OR mask
        assert!(matches(u32::MAX, 0, 0x36, 0x36));
    }

    #[test]
    /// `Pattern::ignoring` strips the ignored field from the value it was given
    fn test_ignoring() {
        let pattern = Pattern::ignoring(mips::lw(mips::REG_V1, mips::REG_A0, 0x10), mips::RT_MASK);
        assert_eq!(pattern.value, mips::lw(0, mips::REG_A0, 0x10));
        assert!(pattern.matches(mips::lw(mips::REG_V0, mips::REG_A0, 0x10)));
        assert!(pattern.matches(mips::lw(31, mips::REG_A0, 0x10)));
        assert!(!pattern.matches(mips::lw(mips::REG_V0, mips::REG_A0, 0x14)));
        assert!(Pattern::exact(7).matches(7));
        assert!(!Pattern::exact(7).matches(6));
    }
}
