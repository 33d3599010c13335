//! # Code
//!
//! Instruction word encodings used to describe search patterns and replacements

pub mod mips;
