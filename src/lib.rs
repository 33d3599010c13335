#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::missing_crate_level_docs)]
#![doc = include_str!("../README.md")]

pub mod code;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod patcher;
pub mod pattern;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod view;

pub use descriptor::{PatchDescriptor, Verification};
pub use engine::{ApplyReport, AppliedPatch, PatchEngine, PatchState, PatchStatus, SkipReason};
pub use pattern::Pattern;
pub use resolver::SymbolResolver;
pub use session::PatchSession;
pub use view::TextView;
