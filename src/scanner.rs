//! # Scanner
//!
//! Walks the search window of a [`PatchDescriptor`] looking for the instruction to patch

use log::debug;

use crate::descriptor::PatchDescriptor;
use crate::view::TextView;

/// Result of scanning a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// The search pattern (and verification, if configured) matched at this word index
    Found(usize),
    /// The word at this index already holds the replacement value
    AlreadyApplied(usize),
    /// The window was exhausted without a match
    NotFound,
}

/// Scans `view` for the site described by `descriptor`
///
/// Positions are word indices into `view`, starting at the descriptor's start offset and advancing one word at a time
/// for at most `max_offset` positions. At every position the word at `patch_offset` is checked for the replacement
/// value *before* the search pattern is compared, so a site patched by an earlier run is never patched twice.
///
/// A search match whose verification fails is a false positive: the scan carries on with the next position.
/// The first position that passes both checks wins.
///
/// Words outside of `view` are never read; a window reaching past the end of the view is cut short and reported as
/// [`ScanResult::NotFound`].
pub fn scan(view: &TextView, descriptor: &PatchDescriptor) -> ScanResult {
    for position in descriptor.window() {
        match scan_position(view, descriptor, position) {
            Some(Step::Advance) => continue,
            Some(Step::Stop(result)) => return result,
            None => {
                debug!(
                    "Search window of '{}' runs past the end of the view at word {}, stopping",
                    descriptor.symbol(),
                    position
                );
                return ScanResult::NotFound;
            }
        }
    }
    ScanResult::NotFound
}

/// What to do after examining one position
enum Step {
    /// Nothing here, look at the next position
    Advance,
    /// Scan is finished
    Stop(ScanResult),
}

/// Examines a single position. `None` if a needed word lies outside the view.
fn scan_position(view: &TextView, descriptor: &PatchDescriptor, position: usize) -> Option<Step> {
    let patch_index = position.checked_add(descriptor.patch_offset())?;
    if view.read(patch_index)? == descriptor.patch_value() {
        return Some(Step::Stop(ScanResult::AlreadyApplied(patch_index)));
    }

    if !descriptor.search().matches(view.read(position)?) {
        return Some(Step::Advance);
    }

    if let Some(verify) = descriptor.verification() {
        let verify_index = position.checked_add(verify.offset())?;
        if !verify.pattern().matches(view.read(verify_index)?) {
            return Some(Step::Advance);
        }
    }

    Some(Step::Stop(ScanResult::Found(position)))
}

#[cfg(test)]
mod tests {
    use crate::descriptor::PatchDescriptor;
    use crate::pattern::Pattern;
    use crate::view::TextView;

    use super::{scan, ScanResult};

    /// Pattern used by most tests: `0xAA??_????` in the top byte
    const SEARCH: Pattern = Pattern::new(0xAA00_0000, 0xFF00_0000, 0);

    #[test]
    /// The first masked match is reported when no verification is configured
    fn test_found() {
        let mut words = vec![1, 2, 3, 0xAA12_3456, 5, 0xAA00_0000, 7, 8, 9, 10];
        let view = unsafe { TextView::from_slice(&mut words) };
        let descriptor = PatchDescriptor::new("f", 10, SEARCH, 0xFFFF_FFFF);

        assert_eq!(scan(&view, &descriptor), ScanResult::Found(3));
    }

    #[test]
    /// An already-present replacement value stops the scan before any pattern is compared
    fn test_already_applied() {
        let mut words = vec![0, 0x1234, 2, 0xAA00_0000, 4];
        let view = unsafe { TextView::from_slice(&mut words) };
        let descriptor = PatchDescriptor::new("f", 5, SEARCH, 0x1234).patch_at(1);

        assert_eq!(scan(&view, &descriptor), ScanResult::AlreadyApplied(1));
    }

    #[test]
    /// A failed verification is skipped over and the next verified match wins
    fn test_verification_continues() {
        let mut words = vec![0, 0, 0xAA00_0001, 0xBAD, 0, 0xAA00_0002, 0x600D, 0, 0, 0];
        let view = unsafe { TextView::from_slice(&mut words) };
        let descriptor = PatchDescriptor::new("f", 8, SEARCH, 0xFFFF_0000)
            .verify(1, Pattern::exact(0x600D))
            .patch_at(1);

        assert_eq!(scan(&view, &descriptor), ScanResult::Found(5));
    }

    #[test]
    /// Exhausting the window reports `NotFound`, even if a match lies just past it
    fn test_window_bound() {
        let mut words = vec![0, 0, 0, 0xAA00_0000, 0];
        let view = unsafe { TextView::from_slice(&mut words) };

        let descriptor = PatchDescriptor::new("f", 3, SEARCH, 0xFFFF_FFFF);
        assert_eq!(scan(&view, &descriptor), ScanResult::NotFound);

        let descriptor = PatchDescriptor::new("f", 1, SEARCH, 0xFFFF_FFFF).start_at(3);
        assert_eq!(scan(&view, &descriptor), ScanResult::Found(3));

        let descriptor = PatchDescriptor::new("f", 0, SEARCH, 0xFFFF_FFFF);
        assert_eq!(scan(&view, &descriptor), ScanResult::NotFound);
    }

    #[test]
    /// A window longer than the view is cut short instead of reading past the end
    fn test_truncated_view() {
        let mut words = vec![0xAA00_0000, 0, 0];
        let view = unsafe { TextView::from_raw(words.as_mut_ptr(), 2) };

        // match at 0, but its patch word (index 2) lies outside the view
        let descriptor = PatchDescriptor::new("f", 10, SEARCH, 0xFFFF_FFFF).patch_at(2);
        assert_eq!(scan(&view, &descriptor), ScanResult::NotFound);

        // verification reaching past the end is cut short too
        let descriptor = PatchDescriptor::new("f", 10, SEARCH, 0xFFFF_FFFF).verify(5, Pattern::exact(0));
        assert_eq!(scan(&view, &descriptor), ScanResult::NotFound);
    }

    #[test]
    /// The replacement check runs before the pattern check at each position, so an earlier coincidental
    /// occurrence of the replacement value wins over a later match
    fn test_already_applied_precedes_match() {
        let mut words = vec![0x0, 0xAA00_0000, 0x0];
        let view = unsafe { TextView::from_slice(&mut words) };
        let descriptor = PatchDescriptor::new("f", 3, SEARCH, 0x0);

        assert_eq!(scan(&view, &descriptor), ScanResult::AlreadyApplied(0));
    }
}
