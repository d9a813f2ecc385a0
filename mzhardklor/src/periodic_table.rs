//! Element symbols and monoisotopic masses used when parsing and rendering formulas
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::isotope_table::{AtomicNumber, IsotopeTable};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementEntry {
    pub atomic_number: AtomicNumber,
    pub symbol: String,
    pub mono_mass: f64,
}

#[derive(Debug, Error)]
pub enum PeriodicTableError {
    #[error("An IO error occurred while reading a periodic table: {0}")]
    Io(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Malformed periodic table line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodicTable {
    entries: Vec<Option<ElementEntry>>,
    by_symbol: HashMap<String, AtomicNumber>,
}

impl PeriodicTable {
    pub fn new(entries: impl IntoIterator<Item = ElementEntry>) -> Self {
        let mut this = Self::default();
        for entry in entries {
            this.insert(entry);
        }
        this
    }

    fn insert(&mut self, entry: ElementEntry) {
        let z = entry.atomic_number;
        if self.entries.len() <= z {
            self.entries.resize(z + 1, None);
        }
        self.by_symbol.insert(entry.symbol.clone(), z);
        self.entries[z] = Some(entry);
    }

    /// Read rows of `atomicNumber symbol monoMass`. Blank lines are skipped.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, PeriodicTableError> {
        let mut this = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };
            let malformed = || PeriodicTableError::Malformed {
                line: i + 1,
                content: line.clone(),
            };
            let atomic_number: AtomicNumber = first.parse().map_err(|_| malformed())?;
            let symbol = tokens.next().ok_or_else(malformed)?.to_string();
            let mono_mass: f64 = tokens
                .next()
                .ok_or_else(malformed)?
                .parse()
                .map_err(|_| malformed())?;
            this.insert(ElementEntry {
                atomic_number,
                symbol,
                mono_mass,
            });
        }
        Ok(this)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PeriodicTableError> {
        Self::read(BufReader::new(fs::File::open(path)?))
    }

    /// Load the table at `path`, falling back to [`PeriodicTable::builtin`]
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Self {
        match path {
            Some(path) => match Self::open(path.as_ref()) {
                Ok(table) => table,
                Err(e) => {
                    warn!(
                        "Failed to read periodic table from {}: {e}. Using the built-in table",
                        path.as_ref().display()
                    );
                    Self::builtin()
                }
            },
            None => Self::builtin(),
        }
    }

    /// Derive a periodic table from the lightest isotope of each element of `isotopes`
    pub fn from_isotopes(isotopes: &IsotopeTable) -> Self {
        Self::new(isotopes.iter().filter_map(|(z, record)| {
            record.lightest().map(|iso| ElementEntry {
                atomic_number: z,
                symbol: record.symbol.clone(),
                mono_mass: iso.mass,
            })
        }))
    }

    pub fn builtin() -> Self {
        Self::from_isotopes(&IsotopeTable::builtin())
    }

    pub fn get(&self, atomic_number: AtomicNumber) -> Option<&ElementEntry> {
        self.entries.get(atomic_number).and_then(|e| e.as_ref())
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&ElementEntry> {
        self.by_symbol.get(symbol).and_then(|z| self.get(*z))
    }

    pub fn atomic_number(&self, symbol: &str) -> Option<AtomicNumber> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn symbol(&self, atomic_number: AtomicNumber) -> Option<&str> {
        self.get(atomic_number).map(|e| e.symbol.as_str())
    }

    pub fn mono_mass(&self, atomic_number: AtomicNumber) -> Option<f64> {
        self.get(atomic_number).map(|e| e.mono_mass)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtin() {
        let table = PeriodicTable::builtin();
        assert_eq!(table.symbol(8), Some("O"));
        assert_eq!(table.atomic_number("Se"), Some(34));
        assert_eq!(table.mono_mass(6), Some(12.0));
        assert_eq!(table.by_symbol("N").map(|e| e.atomic_number), Some(7));
    }

    #[test]
    fn test_read() {
        let text = "0 X 1.0\n1 H 1.0078246\n\n6 C 12.000000\n";
        let table = PeriodicTable::read(text.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.symbol(6), Some("C"));
        assert!(table.get(2).is_none());

        let err = PeriodicTable::read("1 H".as_bytes()).unwrap_err();
        assert!(matches!(err, PeriodicTableError::Malformed { line: 1, .. }));
    }
}
