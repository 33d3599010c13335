//! # Config
//!
//! Built-in patch tables and loading of patch sets from JSON

use std::fs;
use std::io;
use std::path::Path;

use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

use crate::code::mips;
use crate::descriptor::PatchDescriptor;
use crate::pattern::Pattern;

/// Errors when loading a patch set
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error while reading the file
    #[error("Error reading patch set: {0}")]
    Io(#[from] io::Error),
    /// Error while parsing the file
    #[error("Error parsing patch set: {0}")]
    Json(#[from] serde_json::Error),
}

/// An ordered list of descriptors
///
/// ```json
/// { "patches": [ { "symbol": "ip_forward", "max_offset": 10, "look_for": "0x8c800048",
///                  "and_mask": "0xffe0ffff", "patch_value": "0x24020000" } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PatchSet {
    /// Descriptors, in processing order
    pub patches: Vec<PatchDescriptor>,
}
impl PatchSet {
    /// Parses a patch set from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a patch set from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Serialized form of a [`PatchDescriptor`], with every optional field defaulted
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDescriptor {
    /// See [`PatchDescriptor::symbol`]
    symbol: String,
    /// See [`PatchDescriptor::start_offset`]
    #[serde(default)]
    start_offset: usize,
    /// See [`PatchDescriptor::max_offset`]
    max_offset: usize,
    /// Search value
    #[serde(deserialize_with = "word")]
    look_for: u32,
    /// Search AND mask
    #[serde(default = "all_bits", deserialize_with = "word")]
    and_mask: u32,
    /// Search OR mask
    #[serde(default, deserialize_with = "word")]
    or_mask: u32,
    /// Verification offset, zero to disable
    #[serde(default)]
    verify_offset: usize,
    /// Verification value
    #[serde(default, deserialize_with = "word")]
    verify_value: u32,
    /// Verification AND mask
    #[serde(default = "all_bits", deserialize_with = "word")]
    verify_and_mask: u32,
    /// Verification OR mask
    #[serde(default, deserialize_with = "word")]
    verify_or_mask: u32,
    /// See [`PatchDescriptor::patch_offset`]
    #[serde(default)]
    patch_offset: usize,
    /// See [`PatchDescriptor::patch_value`]
    #[serde(deserialize_with = "word")]
    patch_value: u32,
}
impl From<RawDescriptor> for PatchDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        PatchDescriptor::new(
            raw.symbol,
            raw.max_offset,
            Pattern::new(raw.look_for, raw.and_mask, raw.or_mask),
            raw.patch_value,
        )
        .start_at(raw.start_offset)
        .verify(
            raw.verify_offset,
            Pattern::new(raw.verify_value, raw.verify_and_mask, raw.verify_or_mask),
        )
        .patch_at(raw.patch_offset)
    }
}

/// Default for AND masks
fn all_bits() -> u32 {
    u32::MAX
}

/// Instruction words are written either as plain numbers or as `"0x"` prefixed hex strings
fn word<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    /// Either representation of a word
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Word {
        /// `1234`
        Number(u32),
        /// `"0x04d2"`
        Text(String),
    }

    match Word::deserialize(deserializer)? {
        Word::Number(n) => Ok(n),
        Word::Text(s) => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .ok_or_else(|| <D::Error as de::Error>::custom(format!("expected a 0x prefixed word, got '{}'", s)))?;
            u32::from_str_radix(&digits.replace('_', ""), 16).map_err(de::Error::custom)
        }
    }
}

/// The vendor's traps on the `sk` member of the socket buffer, blocking TUN devices on 7490/75x0 FRITZ!OS 07.0x kernels
///
/// `sk_offset` is `offsetof(struct sk_buff, sk)` of the running kernel. Each site starts with `lw $?, sk_offset($a0)`:
///
/// - `ip_forward` loads `sk` into `$v0` for a later trap; the load becomes `addiu $v0, $zero, 0` so the trap never fires
/// - `netif_receive_skb` and `__netif_receive_skb` trap directly after the load with `tne $zero, $?, 12`; the trap becomes a `nop`
pub fn tun_device_patches(sk_offset: u16) -> Vec<PatchDescriptor> {
    let load_sk = Pattern::ignoring(mips::lw(0, mips::REG_A0, sk_offset), mips::RT_MASK);
    let trap = Pattern::ignoring(mips::tne(mips::REG_ZERO, 0, 12), mips::RT_MASK);

    vec![
        PatchDescriptor::new("ip_forward", 10, load_sk, mips::addiu(mips::REG_V0, mips::REG_ZERO, 0)),
        PatchDescriptor::new("netif_receive_skb", 10, load_sk, mips::NOP)
            .verify(1, trap)
            .patch_at(1),
        PatchDescriptor::new("__netif_receive_skb", 8, load_sk, mips::NOP)
            .verify(1, trap)
            .patch_at(1),
    ]
}
