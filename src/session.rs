//! # Session
//!
//! Ties a set of patches to a load/unload lifecycle: everything is applied when the session is loaded and reversed
//! when it is unloaded or dropped.

use std::fmt::Debug;

use log::info;

use crate::descriptor::PatchDescriptor;
use crate::engine::{ApplyReport, PatchEngine};
use crate::patcher::Patcher;
use crate::resolver::SymbolResolver;

/// Guard for a set of applied patches
///
/// Dropping the session reverses every patch it applied.
pub struct PatchSession<R, P>
where
    R: SymbolResolver,
    P: Patcher,
    P::Error: Debug,
{
    /// Engine used for both passes
    engine: PatchEngine<R, P>,
    /// Descriptors, in processing order
    descriptors: Vec<PatchDescriptor>,
    /// States of the descriptors
    report: ApplyReport,
}
impl<R, P> PatchSession<R, P>
where
    R: SymbolResolver,
    P: Patcher,
    P::Error: Debug,
{
    /// Applies `descriptors` and returns a guard that reverses them again
    ///
    /// # Safety
    ///
    /// Same as [`PatchEngine::apply_all`]. In addition, the patched text must stay writable through the patcher until
    /// the session is dropped.
    pub unsafe fn load(engine: PatchEngine<R, P>, descriptors: Vec<PatchDescriptor>) -> Self {
        info!("Initialization started");
        let report = engine.apply_all(&descriptors);
        info!("{} patches applied", report.applied());
        Self {
            engine,
            descriptors,
            report,
        }
    }

    /// Number of patches applied on load
    pub fn applied(&self) -> usize {
        self.report.applied()
    }

    /// States of the descriptors
    pub fn report(&self) -> &ApplyReport {
        &self.report
    }

    /// Descriptors this session was loaded with
    pub fn descriptors(&self) -> &[PatchDescriptor] {
        &self.descriptors
    }

    /// Manually reverses all patches rather than letting the session go out of scope
    pub fn unload(self) {
        // Implemented in [`Drop::drop`]
    }
}
impl<R, P> Drop for PatchSession<R, P>
where
    R: SymbolResolver,
    P: Patcher,
    P::Error: Debug,
{
    fn drop(&mut self) {
        info!("Reversing applied patches");
        // Safety: `load` requires the patched text to stay writable for the lifetime of the session
        unsafe { self.engine.reverse_all(&self.descriptors, &mut self.report) };
        info!("All applied patches have been reversed");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::descriptor::PatchDescriptor;
    use crate::engine::{PatchEngine, PatchStatus};
    use crate::pattern::Pattern;
    use crate::patcher::word::WordPatcher;

    use super::PatchSession;

    #[test]
    /// Test patch on load and revert on drop
    fn test_session() {
        let mut words = vec![1u32, 0xAA00_0000, 3, 4];
        let mut symbols = HashMap::new();
        symbols.insert("f".to_owned(), words.as_mut_ptr() as usize);

        let engine = PatchEngine::new(symbols, WordPatcher::new());
        let descriptors = vec![
            PatchDescriptor::new("f", 3, Pattern::new(0xAA00_0000, 0xFF00_0000, 0), 0x5555).patch_at(1),
            PatchDescriptor::new("g", 3, Pattern::exact(1), 0),
        ];

        let session = unsafe { PatchSession::load(engine, descriptors) };

        // make sure the word was actually changed
        assert_eq!(session.applied(), 1);
        assert_eq!(session.report().states()[0].status(), PatchStatus::Patched);
        assert_eq!(session.report().states()[1].status(), PatchStatus::Unresolved);
        assert_eq!(unsafe { std::ptr::read_volatile(words.as_ptr().add(2)) }, 0x5555);

        // unload the session
        session.unload();

        // make sure the patch was restored
        assert_eq!(words, [1, 0xAA00_0000, 3, 4]);
    }
}
