//! # Resolver
//!
//! Symbol resolution, mapping a function name to the address its code starts at

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Default location of the kernel symbol table
pub const KALLSYMS_PATH: &str = "/proc/kallsyms";

/// Looks up runtime addresses of symbols
pub trait SymbolResolver {
    /// Returns the address of `name`, or `None` if the symbol doesn't exist
    fn resolve(&self, name: &str) -> Option<usize>;
}

impl SymbolResolver for HashMap<String, usize> {
    fn resolve(&self, name: &str) -> Option<usize> {
        self.get(name).copied()
    }
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Option<usize>,
{
    fn resolve(&self, name: &str) -> Option<usize> {
        self(name)
    }
}

/// Errors when reading a symbol table
#[derive(Debug, Error)]
pub enum KallsymsError {
    /// Error while reading the table
    #[error("Error reading symbol table: {0}")]
    Io(#[from] io::Error),
    /// A line didn't have the `<address> <type> <name>` layout
    #[error("Malformed symbol table entry on line {line}")]
    Malformed {
        /// One-based line number
        line: usize,
    },
}

/// Symbol table in the format of `/proc/kallsyms`
///
/// Each line is `<hex address> <type> <name>`, optionally followed by `\t[module]`.
/// Like the kernel's own lookup, the first definition of a name wins.
/// Addresses hidden by `kptr_restrict` show up as zero and are treated as unresolved.
#[derive(Debug, Default, Clone)]
pub struct Kallsyms {
    /// Name to address
    symbols: HashMap<String, usize>,
}
impl Kallsyms {
    /// Reads the running kernel's table from [`KALLSYMS_PATH`]
    pub fn load() -> Result<Self, KallsymsError> {
        Self::from_path(KALLSYMS_PATH)
    }

    /// Reads a table from `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, KallsymsError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses a table
    pub fn parse(text: &str) -> Result<Self, KallsymsError> {
        let mut symbols = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || KallsymsError::Malformed { line: number + 1 };

            let mut fields = line.split_whitespace();
            let address = fields
                .next()
                .and_then(|a| usize::from_str_radix(a, 16).ok())
                .ok_or_else(malformed)?;
            let _kind = fields.next().ok_or_else(malformed)?;
            let name = fields.next().ok_or_else(malformed)?;

            if let Entry::Vacant(entry) = symbols.entry(name.to_owned()) {
                entry.insert(address);
            }
        }
        Ok(Self { symbols })
    }

    /// Number of distinct names in the table
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the table holds no symbols
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
impl SymbolResolver for Kallsyms {
    fn resolve(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied().filter(|&address| address != 0)
    }
}
