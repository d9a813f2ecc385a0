//! Molecular formulas as atomic number to atom count mappings
use std::collections::btree_map::{self, BTreeMap};
use std::fmt::{self, Display};
use std::str::FromStr;

use chemical_elements::{ChemicalComposition, ElementSpecification};
use itertools::Itertools;
use thiserror::Error;

use crate::isotope_table::AtomicNumber;
use crate::periodic_table::PeriodicTable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("The molecular formula is empty")]
    Empty,
    #[error("The character {0:?} at position {1} is invalid in a molecular formula")]
    InvalidCharacter(char, usize),
    #[error("Unknown element {0:?} in molecular formula")]
    UnknownElement(String),
    #[error("The element {0} has been entered twice in molecular formula")]
    DuplicateElement(String),
    #[error("The atom count {0:?} is not a valid count")]
    InvalidCount(String),
}

/// An elemental composition with non-negative integer atom counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Formula {
    counts: BTreeMap<AtomicNumber, u32>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, atomic_number: AtomicNumber) -> u32 {
        self.counts.get(&atomic_number).copied().unwrap_or_default()
    }

    pub fn set(&mut self, atomic_number: AtomicNumber, count: u32) {
        if count == 0 {
            self.counts.remove(&atomic_number);
        } else {
            self.counts.insert(atomic_number, count);
        }
    }

    /// Add `delta` atoms of `atomic_number`, clamping the count at zero
    pub fn add(&mut self, atomic_number: AtomicNumber, delta: i64) {
        let count = (self.get(atomic_number) as i64 + delta).max(0);
        self.set(atomic_number, count as u32);
    }

    /// Iterate over elements with a non-zero count in ascending atomic number order
    pub fn iter(&self) -> impl Iterator<Item = (AtomicNumber, u32)> + '_ {
        self.counts.iter().map(|(z, c)| (*z, *c))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total_atoms(&self) -> u64 {
        self.counts.values().map(|c| *c as u64).sum()
    }

    /// Parse a formula like `C6H12O6`.
    ///
    /// An upper case letter starts an element symbol, an optional lower case letter
    /// completes it, and an optional run of digits gives the count, which defaults to 1.
    pub fn parse(text: &str, table: &PeriodicTable) -> Result<Self, FormulaError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Err(FormulaError::Empty);
        }
        let mut formula = Formula::new();
        let mut seen: Vec<AtomicNumber> = Vec::new();
        let mut pos = 0;
        while pos < chars.len() {
            let c = chars[pos];
            if !c.is_ascii_uppercase() {
                return Err(FormulaError::InvalidCharacter(c, pos));
            }
            let mut symbol = String::from(c);
            pos += 1;
            if pos < chars.len() && chars[pos].is_ascii_lowercase() {
                symbol.push(chars[pos]);
                pos += 1;
            }
            let digits_start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < chars.len() && !chars[pos].is_ascii_uppercase() {
                return Err(FormulaError::InvalidCharacter(chars[pos], pos));
            }
            let count = if digits_start == pos {
                1
            } else {
                let digits: String = chars[digits_start..pos].iter().collect();
                digits
                    .parse::<u32>()
                    .map_err(|_| FormulaError::InvalidCount(digits))?
            };
            let z = table
                .atomic_number(&symbol)
                .ok_or_else(|| FormulaError::UnknownElement(symbol.clone()))?;
            if seen.contains(&z) {
                return Err(FormulaError::DuplicateElement(symbol));
            }
            seen.push(z);
            formula.set(z, count);
        }
        Ok(formula)
    }

    /// Render with `table`'s symbols as `symbol+count` pieces in Hill order
    pub fn display<'a>(&'a self, table: &'a PeriodicTable) -> FormulaDisplay<'a> {
        FormulaDisplay {
            formula: self,
            table,
        }
    }

    pub fn render(&self, table: &PeriodicTable) -> String {
        self.display(table).to_string()
    }

    /// The monoisotopic mass, or `None` if an element is missing from `table`
    pub fn mono_mass(&self, table: &PeriodicTable) -> Option<f64> {
        self.iter()
            .map(|(z, c)| table.mono_mass(z).map(|m| m * c as f64))
            .sum()
    }

    /// Convert to a [`ChemicalComposition`], or `None` if an element is unknown to
    /// either `table` or the `chemical_elements` periodic table
    pub fn to_composition<'a>(&self, table: &PeriodicTable) -> Option<ChemicalComposition<'a>> {
        let mut composition = ChemicalComposition::new();
        for (z, count) in self.iter() {
            let element: ElementSpecification<'a> = table.symbol(z)?.parse().ok()?;
            composition.set(element, count as i32);
        }
        Some(composition)
    }
}

impl FromIterator<(AtomicNumber, u32)> for Formula {
    fn from_iter<T: IntoIterator<Item = (AtomicNumber, u32)>>(iter: T) -> Self {
        let mut this = Self::new();
        for (z, c) in iter {
            this.set(z, c);
        }
        this
    }
}

impl<'a> IntoIterator for &'a Formula {
    type Item = (&'a AtomicNumber, &'a u32);

    type IntoIter = btree_map::Iter<'a, AtomicNumber, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

/// Parses against [`PeriodicTable::builtin`]
impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s, &PeriodicTable::builtin())
    }
}

pub struct FormulaDisplay<'a> {
    formula: &'a Formula,
    table: &'a PeriodicTable,
}

impl Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pieces: Vec<(String, u32)> = self
            .formula
            .iter()
            .map(|(z, c)| {
                let symbol = self
                    .table
                    .symbol(z)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("[{z}]"));
                (symbol, c)
            })
            .collect();
        let has_carbon = pieces.iter().any(|(s, _)| s == "C");
        pieces.sort_by(|(a, _), (b, _)| {
            hill_rank(a, has_carbon)
                .cmp(&hill_rank(b, has_carbon))
                .then_with(|| a.cmp(b))
        });
        write!(
            f,
            "{}",
            pieces.iter().map(|(s, c)| format!("{s}{c}")).join("")
        )
    }
}

fn hill_rank(symbol: &str, has_carbon: bool) -> u8 {
    match (symbol, has_carbon) {
        ("C", true) => 0,
        ("H", true) => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let table = PeriodicTable::builtin();
        let glucose = Formula::parse("C6H12O6", &table).unwrap();
        assert_eq!(glucose.get(6), 6);
        assert_eq!(glucose.get(1), 12);
        assert_eq!(glucose.get(8), 6);
        assert_eq!(glucose.len(), 3);

        let salt = Formula::parse("NaCl", &table).unwrap();
        assert_eq!(salt.get(11), 1);
        assert_eq!(salt.get(17), 1);

        let water: Formula = "H2O".parse().unwrap();
        assert_eq!(water.total_atoms(), 3);
    }

    #[test]
    fn test_parse_errors() {
        let table = PeriodicTable::builtin();
        assert_eq!(Formula::parse("", &table), Err(FormulaError::Empty));
        assert_eq!(
            Formula::parse("C6H12-O6", &table),
            Err(FormulaError::InvalidCharacter('-', 5))
        );
        assert_eq!(
            Formula::parse("6C", &table),
            Err(FormulaError::InvalidCharacter('6', 0))
        );
        assert_eq!(
            Formula::parse("C2Zq4", &table),
            Err(FormulaError::UnknownElement("Zq".to_string()))
        );
        assert_eq!(
            Formula::parse("C2H4C1", &table),
            Err(FormulaError::DuplicateElement("C".to_string()))
        );
    }

    #[test]
    fn test_render() {
        let table = PeriodicTable::builtin();
        let glucose = Formula::parse("O6H12C6", &table).unwrap();
        assert_eq!(glucose.render(&table), "C6H12O6");
        let salt = Formula::parse("NaCl", &table).unwrap();
        assert_eq!(salt.display(&table).to_string(), "Cl1Na1");
        let peptide = Formula::parse("C50H80N14O15S1", &table).unwrap();
        assert_eq!(
            Formula::parse(&peptide.render(&table), &table).unwrap(),
            peptide
        );
    }

    #[test]
    fn test_add_clamps() {
        let mut formula: Formula = "C2H6O".parse().unwrap();
        formula.add(1, -10);
        assert_eq!(formula.get(1), 0);
        assert_eq!(formula.len(), 2);
        formula.add(7, 2);
        assert_eq!(formula.get(7), 2);
    }

    #[test]
    fn test_mono_mass() {
        let table = PeriodicTable::builtin();
        let water: Formula = "H2O".parse().unwrap();
        let mass = water.mono_mass(&table).unwrap();
        assert!((mass - 18.0105633).abs() < 1e-6, "{mass}");
        let composition = water.to_composition(&table).unwrap();
        assert!((composition.mass() - mass).abs() < 1e-3);
    }
}
