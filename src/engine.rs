//! # Engine
//!
//! Drives a list of [`PatchDescriptor`]s through resolution, scanning, patching and, later on, reversal.
//!
//! Descriptors are never mutated. Everything learned while applying them is returned in an [`ApplyReport`] holding one
//! [`PatchState`] per descriptor, in the same order, which is later handed back to [`PatchEngine::reverse_all`].
//! No failure is ever escalated: a descriptor that can't be applied is logged, recorded and skipped.

use std::fmt::Debug;

use log::{info, warn};
use thiserror::Error;

use crate::descriptor::PatchDescriptor;
use crate::patcher::Patcher;
use crate::resolver::SymbolResolver;
use crate::scanner::{scan, ScanResult};
use crate::view::TextView;

/// Record of a replaced word, enough to put it back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedPatch {
    /// Address of the replaced word
    pub address: usize,
    /// Word found at `address` before patching
    pub original: u32,
    /// Word written to `address`
    pub replacement: u32,
}

/// Reasons a descriptor was not applied
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The symbol doesn't exist in the running program
    #[error("Unable to locate symbol '{0}'")]
    SymbolUnresolved(String),
    /// Nothing in the search window matched
    #[error("No instruction to patch found in function '{0}'")]
    PatternNotFound(String),
    /// The replacement is in place already
    #[error("Found patched instruction ({value:#010x}) at address {address:#010x}")]
    AlreadyApplied {
        /// Address holding the replacement value
        address: usize,
        /// The replacement value found there
        value: u32,
    },
    /// The patcher refused to write
    #[error("Unable to write to address {address:#010x}: {reason}")]
    WriteFailed {
        /// Address that should have been written
        address: usize,
        /// Error reported by the patcher
        reason: String,
    },
}

/// Where a descriptor stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchStatus {
    /// Not attempted yet
    #[default]
    Pending,
    /// Symbol could not be resolved
    Unresolved,
    /// Symbol resolved, but the search window held no match
    NotFound,
    /// Symbol resolved, and the replacement was already present
    AlreadyPatched,
    /// Patcher failed to write the replacement
    Failed,
    /// Replacement written by us and not reversed yet
    Patched,
    /// Replacement written by us and reversed since
    Restored,
}

/// Result state of one descriptor
///
/// `is_patched` holds exactly when an [`AppliedPatch`] is recorded, which is only between a successful application and
/// its reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchState {
    /// Resolved address of the descriptor's symbol
    base: Option<usize>,
    /// The word we replaced, while it's replaced
    applied: Option<AppliedPatch>,
    /// Current state
    status: PatchStatus,
}
impl PatchState {
    /// Resolved address of the symbol, `None` if unresolved, not attempted or reversed
    pub fn base(&self) -> Option<usize> {
        self.base
    }
    /// The currently applied patch, if any
    pub fn applied(&self) -> Option<&AppliedPatch> {
        self.applied.as_ref()
    }
    /// Current state
    pub fn status(&self) -> PatchStatus {
        self.status
    }
    /// Returns `true` while our replacement is in place
    pub fn is_patched(&self) -> bool {
        self.applied.is_some()
    }
}

/// Outcome of applying a list of descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// One state per descriptor, in descriptor order
    states: Vec<PatchState>,
    /// Number of patches newly applied by the run that produced this report
    applied: usize,
}
impl ApplyReport {
    /// Number of patches newly applied
    pub fn applied(&self) -> usize {
        self.applied
    }
    /// Per-descriptor states, in descriptor order
    pub fn states(&self) -> &[PatchState] {
        &self.states
    }
    /// Number of patches currently in place
    pub fn patched(&self) -> usize {
        self.states.iter().filter(|s| s.is_patched()).count()
    }
}

/// Scans `view` for `descriptor` and, on a match, replaces the word at the descriptor's patch offset
///
/// This is the complete per-site operation once the symbol has been turned into a view.
///
/// # Safety
///
/// - `view` must satisfy the requirements of [`TextView::from_raw`]
/// - the words of `view` must be writable through `patcher`, see [`Patcher::write`]
pub unsafe fn patch_view<P>(view: &TextView, descriptor: &PatchDescriptor, patcher: &P) -> Result<AppliedPatch, SkipReason>
where
    P: Patcher,
    P::Error: Debug,
{
    match scan(view, descriptor) {
        ScanResult::Found(index) => apply(view, descriptor, index, patcher),
        ScanResult::AlreadyApplied(index) => Err(SkipReason::AlreadyApplied {
            address: view.address_of(index).unwrap_or_default(),
            value: descriptor.patch_value(),
        }),
        ScanResult::NotFound => Err(SkipReason::PatternNotFound(descriptor.symbol().to_owned())),
    }
}

/// Replaces the word at `found + patch_offset` with the descriptor's patch value, recording the original
///
/// # Safety
///
/// Same as [`patch_view`]
pub unsafe fn apply<P>(
    view: &TextView,
    descriptor: &PatchDescriptor,
    found: usize,
    patcher: &P,
) -> Result<AppliedPatch, SkipReason>
where
    P: Patcher,
    P::Error: Debug,
{
    let not_found = || SkipReason::PatternNotFound(descriptor.symbol().to_owned());
    let index = found
        .checked_add(descriptor.patch_offset())
        .ok_or_else(not_found)?;
    let target = view.word_ptr(index).ok_or_else(not_found)?;
    let original = view.read(index).ok_or_else(not_found)?;

    patcher
        .write(target, descriptor.patch_value())
        .map_err(|e| SkipReason::WriteFailed {
            address: target as usize,
            reason: format!("{:?}", e),
        })?;

    Ok(AppliedPatch {
        address: target as usize,
        original,
        replacement: descriptor.patch_value(),
    })
}

/// Puts the original word back if `state` has a patch applied. Does nothing otherwise, so repeated calls are harmless.
///
/// # Safety
///
/// The recorded address must still be writable through `patcher`, see [`Patcher::write`]
pub unsafe fn reverse<P>(descriptor: &PatchDescriptor, state: &mut PatchState, patcher: &P)
where
    P: Patcher,
    P::Error: Debug,
{
    let patch = match state.applied {
        Some(patch) => patch,
        None => return,
    };

    match patcher.write(patch.address as *mut u32, patch.original) {
        Ok(()) => {
            state.applied = None;
            state.base = None;
            state.status = PatchStatus::Restored;
            info!(
                "Reversed patch in '{}' at address {:#010x} to original value {:#010x}",
                descriptor.symbol(),
                patch.address,
                patch.original
            );
        }
        Err(e) => warn!(
            "Unable to reverse patch in '{}' at address {:#010x}: {:?}",
            descriptor.symbol(),
            patch.address,
            e
        ),
    }
}

/// Applies and reverses descriptors against symbols looked up through `R`, writing through `P`
#[derive(Debug, Clone)]
pub struct PatchEngine<R, P> {
    /// Turns symbol names into addresses
    resolver: R,
    /// Writes the words
    patcher: P,
}
impl<R, P> PatchEngine<R, P>
where
    R: SymbolResolver,
    P: Patcher,
    P::Error: Debug,
{
    /// Creates a new engine
    pub fn new(resolver: R, patcher: P) -> Self {
        Self { resolver, patcher }
    }

    /// The resolver symbols are looked up with
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The patcher words are written with
    pub fn patcher(&self) -> &P {
        &self.patcher
    }

    /// Applies every descriptor once, in order
    ///
    /// Failures are recorded in the report and never stop the remaining descriptors from being processed.
    ///
    /// # Safety
    ///
    /// - for every descriptor whose symbol resolves, the [`span`](PatchDescriptor::span) words starting at the resolved
    ///   address must be readable program text, see [`TextView::from_raw`]
    /// - patched words must be writable through the patcher, see [`Patcher::write`]
    /// - nothing else may patch or reverse the same text concurrently
    pub unsafe fn apply_all(&self, descriptors: &[PatchDescriptor]) -> ApplyReport {
        let mut report = ApplyReport::default();
        for descriptor in descriptors {
            let mut state = PatchState::default();
            if self.apply_one(descriptor, &mut state).is_ok() {
                report.applied += 1;
            }
            report.states.push(state);
        }
        report
    }

    /// Applies a single descriptor, recording the outcome in `state`
    ///
    /// A `state` that already has a patch applied is left alone.
    ///
    /// # Safety
    ///
    /// Same as [`apply_all`](Self::apply_all)
    pub unsafe fn apply_one(
        &self,
        descriptor: &PatchDescriptor,
        state: &mut PatchState,
    ) -> Result<AppliedPatch, SkipReason> {
        if let Some(patch) = state.applied {
            return Err(SkipReason::AlreadyApplied {
                address: patch.address,
                value: patch.replacement,
            });
        }

        let base = match self.resolver.resolve(descriptor.symbol()) {
            Some(base) => base,
            None => {
                info!("Unable to locate symbol '{}', patch skipped", descriptor.symbol());
                state.base = None;
                state.status = PatchStatus::Unresolved;
                return Err(SkipReason::SymbolUnresolved(descriptor.symbol().to_owned()));
            }
        };
        state.base = Some(base);
        info!("Patching function '{}' at address {:#010x}", descriptor.symbol(), base);

        let view = TextView::from_raw(base as *mut u32, descriptor.span());
        let result = patch_view(&view, descriptor, &self.patcher);
        match &result {
            Ok(patch) => {
                state.applied = Some(*patch);
                state.status = PatchStatus::Patched;
                info!(
                    "Found instruction to patch ({:#010x}) at address {:#010x}, replaced it with {:#010x}",
                    patch.original,
                    patch.address,
                    view.index_of(patch.address)
                        .and_then(|i| view.read(i))
                        .unwrap_or(patch.replacement)
                );
            }
            Err(reason @ SkipReason::AlreadyApplied { .. }) => {
                state.status = PatchStatus::AlreadyPatched;
                info!("{}, looks like this patch was applied already or is not necessary", reason);
            }
            Err(reason @ SkipReason::WriteFailed { .. }) => {
                state.status = PatchStatus::Failed;
                warn!("{}, patch in '{}' skipped", reason, descriptor.symbol());
            }
            Err(reason) => {
                state.status = PatchStatus::NotFound;
                info!("{}, patch skipped", reason);
            }
        }
        result
    }

    /// Reverses every patch recorded in `report`
    ///
    /// Descriptors are paired with states by position and undone last to first, so a word patched by more than one
    /// descriptor ends up holding the value it had before the first of them. States without an applied patch are
    /// skipped, so calling this more than once is harmless.
    ///
    /// # Safety
    ///
    /// Recorded addresses must still be writable through the patcher, see [`Patcher::write`]
    pub unsafe fn reverse_all(&self, descriptors: &[PatchDescriptor], report: &mut ApplyReport) {
        for (descriptor, state) in descriptors.iter().zip(report.states.iter_mut()).rev() {
            reverse(descriptor, state, &self.patcher);
        }
    }
}
