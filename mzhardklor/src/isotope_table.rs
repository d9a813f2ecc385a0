/*! Per-element isotope masses and abundances.

An [`IsotopeTable`] is loaded once and never changes afterwards. Isotopic enrichment
is applied through an [`EnrichedTable`], an overlay that borrows the base table and
holds replacement abundances only for the elements it has enriched. Dropping or
[`EnrichedTable::reset`]-ing the overlay discards the enrichment, so it can never leak
into an unrelated calculation.
*/
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

/// Index of an element in an [`IsotopeTable`]. Real elements sit at their atomic
/// number, position zero is reserved for a synthetic placeholder element.
pub type AtomicNumber = usize;

/// A single isotope of an element
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Isotope {
    /// The exact mass of the isotope
    pub mass: f64,
    /// The nominal mass of the isotope, `round(mass)`
    pub int_mass: i32,
    /// The relative abundance of the isotope. Need not sum to 1 across an element.
    pub abundance: f64,
}

impl Isotope {
    pub fn new(mass: f64, abundance: f64) -> Self {
        Self {
            mass,
            int_mass: (mass + 0.5).floor() as i32,
            abundance,
        }
    }
}

/// The isotopes of a single element, in source order
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IsotopeRecord {
    pub symbol: String,
    pub isotopes: Vec<Isotope>,
}

impl IsotopeRecord {
    pub fn new(symbol: String, isotopes: Vec<Isotope>) -> Self {
        Self { symbol, isotopes }
    }

    pub fn from_pairs(symbol: &str, masses: &[f64], abundances: &[f64]) -> Self {
        let isotopes = masses
            .iter()
            .zip(abundances.iter())
            .map(|(m, a)| Isotope::new(*m, *a))
            .collect();
        Self::new(symbol.to_string(), isotopes)
    }

    pub fn len(&self) -> usize {
        self.isotopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isotopes.is_empty()
    }

    /// The lowest-mass isotope, which defines the monoisotopic mass
    pub fn lightest(&self) -> Option<&Isotope> {
        self.isotopes
            .iter()
            .min_by(|a, b| a.mass.total_cmp(&b.mass))
    }

    /// The highest-mass isotope
    pub fn heaviest(&self) -> Option<&Isotope> {
        self.isotopes
            .iter()
            .max_by(|a, b| a.mass.total_cmp(&b.mass))
    }

    pub fn abundances(&self) -> Vec<f64> {
        self.isotopes.iter().map(|i| i.abundance).collect()
    }

    /// The abundance-weighted mean mass of the element
    pub fn average_mass(&self) -> f64 {
        weighted_mass(&self.isotopes, &self.abundances())
    }
}

pub(crate) fn weighted_mass(isotopes: &[Isotope], abundances: &[f64]) -> f64 {
    let total: f64 = abundances.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    isotopes
        .iter()
        .zip(abundances.iter())
        .map(|(i, a)| i.mass * a)
        .sum::<f64>()
        / total
}

/// Force the abundance of `isotope_index` toward 1 by `fraction`.
///
/// The abundances are first renormalized to the currently most abundant isotope, then
/// every isotope is scaled by `1 - fraction` and `fraction` is added to the target.
/// An all-zero input is left unnormalized.
pub fn enrich_abundances(abundances: &[f64], isotope_index: usize, fraction: f64) -> Vec<f64> {
    let max = abundances.iter().copied().fold(0.0f64, f64::max);
    abundances
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let normalized = if max > 0.0 { *a / max } else { *a };
            if i == isotope_index {
                (1.0 - fraction) * normalized + fraction
            } else {
                (1.0 - fraction) * normalized
            }
        })
        .collect()
}

/// A request to enrich one isotope of one element
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Enrichment {
    pub atomic_number: AtomicNumber,
    pub isotope_index: usize,
    /// The enrichment fraction in `[0, 1]`
    pub fraction: f64,
}

impl Enrichment {
    pub fn new(atomic_number: AtomicNumber, isotope_index: usize, fraction: f64) -> Self {
        Self {
            atomic_number,
            isotope_index,
            fraction,
        }
    }
}

#[derive(Debug, Error)]
pub enum IsotopeTableError {
    #[error("An IO error occurred while reading an isotope table: {0}")]
    Io(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Isotope table record {record} ended before all of its isotopes were read")]
    Truncated { record: usize },
    #[error("Could not parse {token:?} as a number in isotope table record {record}")]
    InvalidNumber { record: usize, token: String },
    #[error("No element with atomic number {0} is in the isotope table")]
    UnknownAtomicNumber(AtomicNumber),
    #[error("Element {atomic_number} has no isotope at index {isotope_index}")]
    IsotopeIndexOutOfRange {
        atomic_number: AtomicNumber,
        isotope_index: usize,
    },
    #[error("Enrichment fraction {0} is outside [0, 1]")]
    InvalidFraction(f64),
}

/// The immutable base isotope table, indexed by [`AtomicNumber`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsotopeTable {
    records: Vec<Option<IsotopeRecord>>,
    by_symbol: HashMap<String, AtomicNumber>,
}

impl IsotopeTable {
    pub fn new(records: Vec<Option<IsotopeRecord>>) -> Self {
        let by_symbol = records
            .iter()
            .enumerate()
            .filter_map(|(z, r)| r.as_ref().map(|r| (r.symbol.clone(), z)))
            .collect();
        Self { records, by_symbol }
    }

    /// Read a table in the `ISOTOPE.DAT` layout: repeated records of `symbol count`
    /// followed by `count` pairs of `mass abundance`. The ordinal of a record is its
    /// atomic number.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, IsotopeTableError> {
        let mut tokens = Vec::new();
        for line in reader.lines() {
            let line = line?;
            tokens.extend(line.split_whitespace().map(|t| t.to_string()));
        }

        let mut records = Vec::new();
        let mut it = tokens.into_iter();
        while let Some(symbol) = it.next() {
            let record = records.len();
            let count_tok = it.next().ok_or(IsotopeTableError::Truncated { record })?;
            let count: usize = count_tok
                .parse()
                .map_err(|_| IsotopeTableError::InvalidNumber {
                    record,
                    token: count_tok.clone(),
                })?;
            let mut isotopes = Vec::with_capacity(count);
            for _ in 0..count {
                let mass = parse_number(it.next(), record)?;
                let abundance = parse_number(it.next(), record)?;
                isotopes.push(Isotope::new(mass, abundance));
            }
            records.push(Some(IsotopeRecord::new(symbol, isotopes)));
        }
        debug!("Read {} isotope records", records.len());
        Ok(Self::new(records))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IsotopeTableError> {
        let handle = BufReader::new(fs::File::open(path)?);
        Self::read(handle)
    }

    /// Load the table at `path`, or the built-in table if no path is given or the
    /// file cannot be read.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Self {
        match path {
            Some(path) => match Self::open(path.as_ref()) {
                Ok(table) => table,
                Err(e) => {
                    warn!(
                        "Failed to read isotope table from {}: {e}. Using the built-in table",
                        path.as_ref().display()
                    );
                    Self::builtin()
                }
            },
            None => Self::builtin(),
        }
    }

    /// A small table covering the elements common in biomolecules
    pub fn builtin() -> Self {
        let mut records: Vec<Option<IsotopeRecord>> = vec![None; 54];
        for (z, symbol, masses, abundances) in BUILTIN_ISOTOPES {
            records[*z] = Some(IsotopeRecord::from_pairs(symbol, masses, abundances));
        }
        Self::new(records)
    }

    pub fn get(&self, atomic_number: AtomicNumber) -> Option<&IsotopeRecord> {
        self.records.get(atomic_number).and_then(|r| r.as_ref())
    }

    pub fn atomic_number(&self, symbol: &str) -> Option<AtomicNumber> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomicNumber, &IsotopeRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(z, r)| r.as_ref().map(|r| (z, r)))
    }

    /// Begin a scoped set of enrichments over this table
    pub fn overlay(&self) -> EnrichedTable<'_> {
        EnrichedTable::new(self)
    }
}

fn parse_number(token: Option<String>, record: usize) -> Result<f64, IsotopeTableError> {
    let token = token.ok_or(IsotopeTableError::Truncated { record })?;
    token
        .parse()
        .map_err(|_| IsotopeTableError::InvalidNumber { record, token })
}

/// A working view of an [`IsotopeTable`] with enrichments applied.
///
/// Masses and isotope counts always come from the base table, only abundances are
/// replaced.
#[derive(Debug, Clone)]
pub struct EnrichedTable<'a> {
    base: &'a IsotopeTable,
    overrides: BTreeMap<AtomicNumber, Vec<f64>>,
}

impl<'a> EnrichedTable<'a> {
    pub fn new(base: &'a IsotopeTable) -> Self {
        Self {
            base,
            overrides: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> &'a IsotopeTable {
        self.base
    }

    /// Enrich `isotope_index` of `atomic_number` by `fraction`, on top of any enrichment
    /// already applied to that element.
    pub fn enrich(
        &mut self,
        atomic_number: AtomicNumber,
        isotope_index: usize,
        fraction: f64,
    ) -> Result<(), IsotopeTableError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(IsotopeTableError::InvalidFraction(fraction));
        }
        let record = self
            .base
            .get(atomic_number)
            .ok_or(IsotopeTableError::UnknownAtomicNumber(atomic_number))?;
        if isotope_index >= record.len() {
            return Err(IsotopeTableError::IsotopeIndexOutOfRange {
                atomic_number,
                isotope_index,
            });
        }
        let current = self
            .overrides
            .get(&atomic_number)
            .cloned()
            .unwrap_or_else(|| record.abundances());
        let enriched = enrich_abundances(&current, isotope_index, fraction);
        self.overrides.insert(atomic_number, enriched);
        Ok(())
    }

    pub fn apply(&mut self, enrichment: &Enrichment) -> Result<(), IsotopeTableError> {
        self.enrich(
            enrichment.atomic_number,
            enrichment.isotope_index,
            enrichment.fraction,
        )
    }

    /// Discard all enrichments
    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    pub fn is_enriched(&self, atomic_number: AtomicNumber) -> bool {
        self.overrides.contains_key(&atomic_number)
    }

    pub fn enriched_atoms(&self) -> impl Iterator<Item = AtomicNumber> + '_ {
        self.overrides.keys().copied()
    }

    pub fn record(&self, atomic_number: AtomicNumber) -> Option<&'a IsotopeRecord> {
        self.base.get(atomic_number)
    }

    /// The isotopes of `atomic_number` with the current abundances
    pub fn isotopes(&self, atomic_number: AtomicNumber) -> Option<Vec<Isotope>> {
        let record = self.base.get(atomic_number)?;
        match self.overrides.get(&atomic_number) {
            Some(abundances) => Some(
                record
                    .isotopes
                    .iter()
                    .zip(abundances.iter())
                    .map(|(iso, a)| Isotope {
                        abundance: *a,
                        ..*iso
                    })
                    .collect(),
            ),
            None => Some(record.isotopes.clone()),
        }
    }
}

type BuiltinRow = (AtomicNumber, &'static str, &'static [f64], &'static [f64]);

const BUILTIN_ISOTOPES: &[BuiltinRow] = &[
    (0, "X", &[1.0, 2.0], &[0.9, 0.1]),
    (1, "H", &[1.0078246, 2.0141021], &[0.999855, 0.000145]),
    (2, "He", &[3.01603, 4.00260], &[0.00000138, 0.99999862]),
    (3, "Li", &[6.015121, 7.016003], &[0.075, 0.925]),
    (4, "Be", &[9.012182], &[1.0]),
    (5, "B", &[10.012937, 11.009305], &[0.199, 0.801]),
    (6, "C", &[12.0, 13.0033554], &[0.98916, 0.01084]),
    (7, "N", &[14.0030732, 15.0001088], &[0.99633, 0.00366]),
    (
        8,
        "O",
        &[15.9949141, 16.9991322, 17.9991616],
        &[0.997576009706, 0.000378998479, 0.002044991815],
    ),
    (9, "F", &[18.9984032], &[1.0]),
    (
        10,
        "Ne",
        &[19.992435, 20.993843, 21.991383],
        &[0.9048, 0.0027, 0.0925],
    ),
    (11, "Na", &[22.989767], &[1.0]),
    (
        12,
        "Mg",
        &[23.985042, 24.985837, 25.982593],
        &[0.7899, 0.1000, 0.1101],
    ),
    (13, "Al", &[26.981539], &[1.0]),
    (
        14,
        "Si",
        &[27.976927, 28.976495, 29.973770],
        &[0.9223, 0.0467, 0.0310],
    ),
    (15, "P", &[30.973762], &[1.0]),
    (
        16,
        "S",
        &[31.972070, 32.971456, 33.967866, 35.967080],
        &[0.95021, 0.00745, 0.04221, 0.00013],
    ),
    (17, "Cl", &[34.9688531, 36.9659034], &[0.755290, 0.244710]),
    (
        18,
        "Ar",
        &[35.967545, 37.962732, 39.962384],
        &[0.00337, 0.00063, 0.99600],
    ),
    (
        19,
        "K",
        &[38.9637064, 39.9639982, 40.9618258],
        &[0.932581, 0.000117, 0.067302],
    ),
    (
        20,
        "Ca",
        &[39.9625909, 41.958618, 42.958766, 43.955482, 45.95369, 47.952534],
        &[0.96941, 0.00647, 0.00135, 0.02086, 0.00004, 0.00187],
    ),
    (
        26,
        "Fe",
        &[53.9396105, 55.9349375, 56.935394, 57.9332756],
        &[0.05845, 0.91754, 0.02119, 0.00282],
    ),
    (
        34,
        "Se",
        &[73.9224764, 75.9192136, 76.919914, 77.9173091, 79.9165213, 81.9166994],
        &[0.0089, 0.0937, 0.0763, 0.2377, 0.4961, 0.0873],
    ),
    (35, "Br", &[78.9183371, 80.9162906], &[0.5069, 0.4931]),
    (53, "I", &[126.904473], &[1.0]),
];

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
    }

    const SMALL_TABLE: &str = "X 2
1.000000 0.900000
2.000000 0.100000
H 2
1.0078246 0.999855
2.0141021 0.000145
He 2 3.01603 0.00000138 4.00260 0.99999862
";

    #[test]
    fn test_builtin() {
        let table = IsotopeTable::builtin();
        assert_eq!(table.atomic_number("C"), Some(6));
        assert_eq!(table.atomic_number("S"), Some(16));
        assert_eq!(table.atomic_number("Cl"), Some(17));
        assert_eq!(table.atomic_number("Si"), Some(14));
        assert_eq!(table.atomic_number("Zz"), None);
        let carbon = table.get(6).unwrap();
        assert_eq!(carbon.symbol, "C");
        assert_eq!(carbon.len(), 2);
        assert_eq!(carbon.isotopes[1].int_mass, 13);
        assert_is_close!(carbon.lightest().unwrap().mass, 12.0, 1e-12, "mass");
        assert!(table.get(21).is_none());
    }

    #[test]
    fn test_read() {
        let table = IsotopeTable::read(SMALL_TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.atomic_number("He"), Some(2));
        let he = table.get(2).unwrap();
        assert_eq!(he.isotopes[1].int_mass, 4);
        assert_is_close!(he.isotopes[1].abundance, 0.99999862, 1e-12, "abundance");
    }

    #[test]
    fn test_read_truncated() {
        let err = IsotopeTable::read("X 2\n1.0 0.9\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IsotopeTableError::Truncated { record: 0 }));

        let err = IsotopeTable::read("X two\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IsotopeTableError::InvalidNumber { .. }));
    }

    #[test_log::test]
    fn test_load_fallback() {
        let table = IsotopeTable::load(Some("./tests/data/does-not-exist.dat"));
        assert_eq!(table, IsotopeTable::builtin());
    }

    #[test]
    fn test_enrich_abundances() {
        let enriched = enrich_abundances(&[0.98916, 0.01084], 1, 0.5);
        assert_is_close!(enriched[0], 0.5, 1e-12, "abundance");
        assert_is_close!(enriched[1], 0.5 * 0.01084 / 0.98916 + 0.5, 1e-12, "abundance");

        let full = enrich_abundances(&[0.98916, 0.01084], 1, 1.0);
        assert_eq!(full, vec![0.0, 1.0]);

        let untouched = enrich_abundances(&[0.0, 0.0], 0, 0.0);
        assert_eq!(untouched, vec![0.0, 0.0]);
    }

    #[test]
    fn test_overlay_reset() {
        let table = IsotopeTable::builtin();
        let mut overlay = table.overlay();
        overlay.enrich(7, 1, 0.99).unwrap();
        overlay.enrich(6, 1, 0.5).unwrap();
        overlay.enrich(6, 0, 0.25).unwrap();
        assert!(overlay.is_enriched(7));
        assert_eq!(overlay.enriched_atoms().collect::<Vec<_>>(), vec![6, 7]);

        let nitrogen = overlay.isotopes(7).unwrap();
        assert!(nitrogen[1].abundance > nitrogen[0].abundance);
        assert_eq!(nitrogen[1].mass, table.get(7).unwrap().isotopes[1].mass);

        overlay.reset();
        assert!(!overlay.is_enriched(7));
        for z in [6, 7] {
            assert_eq!(overlay.isotopes(z).unwrap(), table.get(z).unwrap().isotopes);
        }
    }

    #[test]
    fn test_overlay_errors() {
        let table = IsotopeTable::builtin();
        let mut overlay = table.overlay();
        assert!(matches!(
            overlay.enrich(6, 2, 0.5),
            Err(IsotopeTableError::IsotopeIndexOutOfRange { .. })
        ));
        assert!(matches!(
            overlay.enrich(21, 0, 0.5),
            Err(IsotopeTableError::UnknownAtomicNumber(21))
        ));
        assert!(matches!(
            overlay.enrich(6, 1, 1.5),
            Err(IsotopeTableError::InvalidFraction(_))
        ));
        assert!(!overlay.is_enriched(6));
    }
}
