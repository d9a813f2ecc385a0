//! Averagine modification programs: explicit atom changes plus isotopic enrichments
use std::fmt::{self, Display};

use thiserror::Error;

use crate::formula::{Formula, FormulaError};
use crate::isotope_table::AtomicNumber;
pub use crate::isotope_table::Enrichment;
use crate::periodic_table::PeriodicTable;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariantError {
    #[error("Invalid atom list in variant: {0}")]
    FormulaError(
        #[from]
        #[source]
        FormulaError,
    ),
    #[error("Malformed enrichment {0:?}")]
    InvalidEnrichment(String),
}

/// A change of `count` atoms of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtomDelta {
    pub atomic_number: AtomicNumber,
    pub count: i32,
}

impl AtomDelta {
    pub fn new(atomic_number: AtomicNumber, count: i32) -> Self {
        Self {
            atomic_number,
            count,
        }
    }
}

/// A set of explicit atom deltas and enrichments applied on top of an averagine
/// formula. The default value is the identity variant.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variant {
    pub atoms: Vec<AtomDelta>,
    pub enrichments: Vec<Enrichment>,
}

impl Variant {
    pub fn new(atoms: Vec<AtomDelta>, enrichments: Vec<Enrichment>) -> Self {
        Self { atoms, enrichments }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.atoms.is_empty() && self.enrichments.is_empty()
    }

    pub fn add_atom(&mut self, atomic_number: AtomicNumber, count: i32) -> &mut Self {
        self.atoms.push(AtomDelta::new(atomic_number, count));
        self
    }

    pub fn add_enrichment(
        &mut self,
        atomic_number: AtomicNumber,
        isotope_index: usize,
        fraction: f64,
    ) -> &mut Self {
        self.enrichments
            .push(Enrichment::new(atomic_number, isotope_index, fraction));
        self
    }

    /// Apply the atom deltas to `formula`, clamping counts at zero
    pub fn apply_atoms(&self, formula: &mut Formula) {
        for delta in self.atoms.iter() {
            formula.add(delta.atomic_number, delta.count as i64);
        }
    }

    /// Parse whitespace separated tokens. A token starting with a digit or `.` is an
    /// enrichment written as `<percent><symbol><isotope index>`, like `99.0N1`. Any
    /// other token is a list of atoms to add, like `C2H3N1O1`.
    pub fn parse(text: &str, table: &PeriodicTable) -> Result<Self, VariantError> {
        let mut variant = Self::identity();
        for token in text.split_whitespace() {
            if token.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
                variant.enrichments.push(parse_enrichment(token, table)?);
            } else {
                let atoms = Formula::parse(&normalize_symbols(token), table)?;
                variant.atoms.extend(
                    atoms
                        .iter()
                        .map(|(z, count)| AtomDelta::new(z, count as i32)),
                );
            }
        }
        Ok(variant)
    }

    /// Render as the `<atoms>_<enrichments>` modification string used when reporting
    pub fn display<'a>(&'a self, table: &'a PeriodicTable) -> VariantDisplay<'a> {
        VariantDisplay {
            variant: self,
            table,
        }
    }

    pub fn render(&self, table: &PeriodicTable) -> String {
        self.display(table).to_string()
    }
}

/// Upper case the first letter of each symbol and lower case the second
fn normalize_symbols(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut letters_in_run = 0;
    for c in token.chars() {
        if c.is_ascii_alphabetic() {
            if letters_in_run == 0 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c.to_ascii_lowercase());
            }
            letters_in_run += 1;
        } else {
            letters_in_run = 0;
            out.push(c);
        }
    }
    out
}

fn parse_enrichment(token: &str, table: &PeriodicTable) -> Result<Enrichment, VariantError> {
    let invalid = || VariantError::InvalidEnrichment(token.to_string());
    let percent_end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(invalid)?;
    let (percent, rest) = token.split_at(percent_end);
    let symbol_end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (symbol, isotope) = rest.split_at(symbol_end);
    if symbol.is_empty() || symbol.len() > 2 || isotope.is_empty() {
        return Err(invalid());
    }

    let percent: f64 = percent.parse().map_err(|_| invalid())?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(invalid());
    }
    let isotope_index: usize = isotope.parse().map_err(|_| invalid())?;
    let symbol = normalize_symbols(symbol);
    let atomic_number = table
        .atomic_number(&symbol)
        .ok_or(VariantError::FormulaError(FormulaError::UnknownElement(
            symbol,
        )))?;
    Ok(Enrichment::new(atomic_number, isotope_index, percent / 100.0))
}

pub struct VariantDisplay<'a> {
    variant: &'a Variant,
    table: &'a PeriodicTable,
}

impl Display for VariantDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = |z: AtomicNumber| {
            self.table
                .symbol(z)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("[{z}]"))
        };
        for delta in self.variant.atoms.iter() {
            write!(f, "{}{}", symbol(delta.atomic_number), delta.count)?;
        }
        f.write_str("_")?;
        for e in self.variant.enrichments.iter() {
            write!(
                f,
                "{:.2}{}{}_",
                e.fraction * 100.0,
                symbol(e.atomic_number),
                e.isotope_index
            )?;
        }
        Ok(())
    }
}
