/*! The Mercury isotopic distribution calculator.

Mercury convolves the isotope distributions of every element of a formula by
multiplying their characteristic functions on an integer mass grid and transforming
the product back with an FFT. The grid length is chosen from the variance of the
molecular mass so that the distribution does not wrap around.

The default path assigns each nominal-mass peak a mass by linearly rescaling the
integer mass axis with the ratio of the true and integer mass standard deviations.
The accurate mass path repeats the calculation once per element with one atom removed
to recover the exact abundance-weighted mass of every peak.
*/
use std::collections::HashMap;
use std::f64::consts::PI;

use chemical_elements::PROTON as _PROTON;
use thiserror::Error;
use tracing::trace;

use crate::fft::{fft, Complex, Direction};
use crate::formula::Formula;
use crate::isotope_table::{
    AtomicNumber, EnrichedTable, Enrichment, Isotope, IsotopeTable, IsotopeTableError,
};

/// The mass of H+, a hydrogen atom minus an electron
pub const PROTON: f64 = _PROTON;

pub const ELECTRON_MASS: f64 = 0.00054858;

/// The largest half-width, in integer mass units, of the transform grid
const MAX_HALF_POINTS: usize = 1024;

#[derive(Debug, Error)]
pub enum MercuryError {
    #[error("Cannot compute an isotopic distribution for an empty formula")]
    EmptyFormula,
    #[error("Element {0} is not in the isotope table or has no isotopes")]
    UnknownElement(AtomicNumber),
    #[error(transparent)]
    IsotopeTableError(#[from] IsotopeTableError),
}

/// Tunable behavior of [`Mercury`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MercuryParams {
    /// Whether to resolve exact peak masses rather than rescaled nominal masses
    pub accurate_mass: bool,
    /// Transformed values at or below this level are treated as numerical noise. Below
    /// the average mass such points are skipped, above it the first one ends the
    /// distribution.
    pub noise_floor: f64,
}

impl Default for MercuryParams {
    fn default() -> Self {
        Self {
            accurate_mass: false,
            noise_floor: 0.0,
        }
    }
}

impl MercuryParams {
    pub fn new(accurate_mass: bool, noise_floor: f64) -> Self {
        Self {
            accurate_mass,
            noise_floor,
        }
    }
}

/// One peak of a theoretical isotopic distribution
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionPeak {
    /// The m/z of the peak, or the neutral mass when the charge is zero
    pub mz: f64,
    /// Abundance relative to the tallest peak, which is 100
    pub intensity: f64,
    /// Abundance as a fraction of the whole distribution
    pub fraction: f64,
}

/// A theoretical isotopic distribution for one formula and charge
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Distribution {
    pub peaks: Vec<DistributionPeak>,
    pub charge: i32,
    /// The exact neutral monoisotopic mass of the formula
    pub zero_mass: f64,
    /// The summed relative intensity of all peaks, in units of the tallest peak
    pub area: f64,
}

/// Convert a neutral mass to m/z, leaving it neutral for charge zero
#[inline]
pub fn mass_to_mz(mass: f64, charge: i32) -> f64 {
    if charge == 0 {
        mass
    } else {
        (mass + PROTON * charge as f64) / charge.abs() as f64
    }
}

impl Distribution {
    /// Build a distribution from raw `(m/z, abundance)` pairs, normalizing to both
    /// relative and fractional abundance
    pub fn from_abundances(points: &[(f64, f64)], charge: i32, zero_mass: f64) -> Self {
        let max = points.iter().map(|(_, p)| *p).fold(0.0f64, f64::max);
        let total: f64 = points.iter().map(|(_, p)| *p).sum();
        let peaks: Vec<DistributionPeak> = points
            .iter()
            .map(|(mz, p)| DistributionPeak {
                mz: *mz,
                intensity: if max > 0.0 { 100.0 * (p / max) } else { 0.0 },
                fraction: if total > 0.0 { p / total } else { 0.0 },
            })
            .collect();
        let area = peaks.iter().map(|p| p.intensity).sum::<f64>() / 100.0;
        Self {
            peaks,
            charge,
            zero_mass,
            area,
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DistributionPeak> {
        self.peaks.iter()
    }

    /// The m/z of the monoisotopic peak
    pub fn mono_mz(&self) -> f64 {
        mass_to_mz(self.zero_mass, self.charge)
    }

    /// The index of the tallest peak
    pub fn base_peak_index(&self) -> Option<usize> {
        self.peaks
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.intensity.total_cmp(&b.intensity))
            .map(|(i, _)| i)
    }

    pub fn base_peak(&self) -> Option<&DistributionPeak> {
        self.base_peak_index().map(|i| &self.peaks[i])
    }

    /// The m/z of the tallest peak
    pub fn max_peak_mz(&self) -> Option<f64> {
        self.base_peak().map(|p| p.mz)
    }

    /// Keep only peaks whose fractional abundance is at least `min_fraction`,
    /// recomputing the area from what remains
    pub fn retain_fraction(mut self, min_fraction: f64) -> Self {
        self.peaks.retain(|p| p.fraction >= min_fraction);
        self.area = self.peaks.iter().map(|p| p.intensity).sum::<f64>() / 100.0;
        self
    }

    pub fn total_fraction(&self) -> f64 {
        self.peaks.iter().map(|p| p.fraction).sum()
    }
}

/// The isotopes and atom count of one element of a formula
#[derive(Debug, Clone)]
struct ElementTerm {
    count: u32,
    isotopes: Vec<Isotope>,
}

impl ElementTerm {
    fn lightest(&self) -> &Isotope {
        self.isotopes
            .iter()
            .min_by(|a, b| a.mass.total_cmp(&b.mass))
            .unwrap_or(&self.isotopes[0])
    }

    fn heaviest(&self) -> &Isotope {
        self.isotopes
            .iter()
            .max_by(|a, b| a.mass.total_cmp(&b.mass))
            .unwrap_or(&self.isotopes[0])
    }
}

/// Aggregate masses of a set of [`ElementTerm`]s
#[derive(Debug, Clone, Copy, Default)]
struct Weights {
    average: f64,
    monoisotopic: f64,
    integer_average: f64,
    int_average: i64,
    int_monoisotopic: i64,
    int_maximum: i64,
    isotope_shift: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Variances {
    exact: f64,
    integer: f64,
}

impl Variances {
    fn ratio(&self) -> f64 {
        if self.integer == 0.0 {
            1.0
        } else {
            self.exact.sqrt() / self.integer.sqrt()
        }
    }
}

fn calc_weights(terms: &[ElementTerm]) -> Weights {
    let mut w = Weights::default();
    for term in terms {
        let n = term.count as f64;
        for iso in term.isotopes.iter() {
            w.average += n * iso.mass * iso.abundance;
            w.integer_average += n * iso.int_mass as f64 * iso.abundance;
        }
        let light = term.lightest();
        let heavy = term.heaviest();
        w.monoisotopic += n * light.mass;
        w.int_monoisotopic += term.count as i64 * light.int_mass as i64;
        w.int_maximum += term.count as i64 * heavy.int_mass as i64;
        w.isotope_shift = w
            .isotope_shift
            .max((heavy.int_mass - light.int_mass) as i64);
    }
    w.average -= ELECTRON_MASS;
    w.integer_average -= ELECTRON_MASS;
    w.monoisotopic -= ELECTRON_MASS;
    w.int_average = (w.integer_average + 0.5).floor() as i64;
    w
}

fn calc_variances(terms: &[ElementTerm]) -> Variances {
    let mut v = Variances::default();
    for term in terms {
        let mean: f64 = term.isotopes.iter().map(|i| i.mass * i.abundance).sum();
        let int_mean: f64 = term
            .isotopes
            .iter()
            .map(|i| i.int_mass as f64 * i.abundance)
            .sum();
        let var: f64 = term
            .isotopes
            .iter()
            .map(|i| (i.mass - mean).powi(2) * i.abundance)
            .sum();
        let int_var: f64 = term
            .isotopes
            .iter()
            .map(|i| (i.int_mass as f64 - int_mean).powi(2) * i.abundance)
            .sum();
        v.exact += term.count as f64 * var;
        v.integer += term.count as f64 * int_var;
    }
    v
}

fn zero_mass(terms: &[ElementTerm]) -> f64 {
    terms
        .iter()
        .map(|t| t.lightest().mass * t.count as f64)
        .sum()
}

/// The transform grid length, a power of two spanning roughly ten standard
/// deviations of the molecular mass with a factor of two to spare
fn calc_mass_range(variance: f64) -> usize {
    let points = (1.0 + variance).sqrt() * 10.0;
    let mut i = MAX_HALF_POINTS;
    while i > 0 {
        if (i as f64) < points {
            return i * 4;
        }
        i /= 2;
    }
    4
}

/// Frequency domain representation of the convolved distribution, shifted so that
/// index zero is the integer average mass `int_average`
fn calc_frequencies(terms: &[ElementTerm], n_points: usize, int_average: i64) -> Vec<Complex> {
    let mass_range = n_points as f64;
    let half = n_points / 2;
    let shift = -(int_average as f64);
    (0..n_points)
        .map(|i| {
            let freq = if i < half {
                i as f64 / mass_range
            } else {
                (i as f64 - n_points as f64) / mass_range
            };
            let mut r = 1.0;
            let mut theta = 0.0;
            for term in terms {
                let mut re = 0.0;
                let mut im = 0.0;
                for iso in term.isotopes.iter() {
                    let x = -2.0 * PI * iso.int_mass as f64 * freq;
                    re += iso.abundance * x.cos();
                    im += iso.abundance * x.sin();
                }
                let n = term.count as f64;
                r *= re.hypot(im).powf(n);
                theta += n * im.atan2(re);
            }
            Complex::from_polar(r, theta) * Complex::from_polar(1.0, -2.0 * PI * shift * freq)
        })
        .collect()
}

/// A transformed point: `mass` is the mass on the rescaled axis, `abundance` the
/// probability of that nominal mass
#[derive(Debug, Clone, Copy)]
struct MassPoint {
    mass: f64,
    abundance: f64,
}

/// Run the transform and return the points ordered by increasing mass
fn transform(terms: &[ElementTerm], n_points: usize) -> (Vec<MassPoint>, Weights) {
    let weights = calc_weights(terms);
    let variances = calc_variances(terms);
    let mut data = calc_frequencies(terms, n_points, weights.int_average);
    fft(&mut data, Direction::Inverse);

    let ratio = variances.ratio();
    let corrected_int_average = weights.integer_average * ratio;
    let half = n_points / 2;
    let points = (half..n_points)
        .chain(0..half)
        .map(|i| {
            let offset = if i < half {
                i as f64
            } else {
                i as f64 - n_points as f64
            };
            let mass = (offset + weights.int_average as f64) * ratio + weights.average
                - corrected_int_average;
            MassPoint {
                mass,
                abundance: data[i].re,
            }
        })
        .collect();
    (points, weights)
}

/// Round masses to integers, bumping a mass that collides with its predecessor
fn mass_to_int(points: &[MassPoint]) -> Vec<(i64, f64)> {
    let mut result: Vec<(i64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        let mut mass = (p.mass + 0.5).floor() as i64;
        if let Some((last, _)) = result.last() {
            if mass == *last {
                mass += 1;
            }
        }
        result.push((mass, p.abundance));
    }
    result
}

/// Computes theoretical isotopic distributions from an [`IsotopeTable`]
#[derive(Debug, Clone)]
pub struct Mercury {
    table: IsotopeTable,
    pub params: MercuryParams,
}

impl Default for Mercury {
    fn default() -> Self {
        Self::new(IsotopeTable::builtin())
    }
}

impl Mercury {
    pub fn new(table: IsotopeTable) -> Self {
        Self::with_params(table, MercuryParams::default())
    }

    pub fn with_params(table: IsotopeTable, params: MercuryParams) -> Self {
        Self { table, params }
    }

    pub fn table(&self) -> &IsotopeTable {
        &self.table
    }

    /// Begin a scoped enrichment of this calculator's isotope table
    pub fn overlay(&self) -> EnrichedTable<'_> {
        self.table.overlay()
    }

    /// Compute the distribution of `formula` at `charge` with natural abundances
    pub fn compute(
        &self,
        formula: &Formula,
        charge: i32,
        accurate_mass: bool,
    ) -> Result<Distribution, MercuryError> {
        self.compute_with(&self.table.overlay(), formula, charge, accurate_mass)
    }

    /// Compute the distribution of `formula` with `enrichments` applied for this call only
    pub fn compute_enriched(
        &self,
        formula: &Formula,
        charge: i32,
        enrichments: &[Enrichment],
        accurate_mass: bool,
    ) -> Result<Distribution, MercuryError> {
        let mut overlay = self.table.overlay();
        for e in enrichments {
            overlay.apply(e)?;
        }
        self.compute_with(&overlay, formula, charge, accurate_mass)
    }

    /// Compute the distribution of `formula` with the abundances of `table`
    pub fn compute_with(
        &self,
        table: &EnrichedTable<'_>,
        formula: &Formula,
        charge: i32,
        accurate_mass: bool,
    ) -> Result<Distribution, MercuryError> {
        let terms = self.element_terms(table, formula)?;
        let zero = zero_mass(&terms);
        let points = if accurate_mass {
            self.accurate_mass(&terms, charge)
        } else {
            self.nominal_mass(&terms, charge, zero)
        };
        trace!(
            "Computed {} isotopic peaks for {} elements at charge {charge}",
            points.len(),
            terms.len()
        );
        Ok(Distribution::from_abundances(&points, charge, zero))
    }

    fn element_terms(
        &self,
        table: &EnrichedTable<'_>,
        formula: &Formula,
    ) -> Result<Vec<ElementTerm>, MercuryError> {
        if formula.is_empty() {
            return Err(MercuryError::EmptyFormula);
        }
        formula
            .iter()
            .map(|(z, count)| {
                let mut isotopes = table
                    .isotopes(z)
                    .filter(|isos| !isos.is_empty())
                    .ok_or(MercuryError::UnknownElement(z))?;
                let total: f64 = isotopes.iter().map(|i| i.abundance).sum();
                if total > 0.0 {
                    isotopes.iter_mut().for_each(|i| i.abundance /= total);
                }
                Ok(ElementTerm { count, isotopes })
            })
            .collect()
    }

    fn nominal_mass(&self, terms: &[ElementTerm], charge: i32, zero: f64) -> Vec<(f64, f64)> {
        let variances = calc_variances(terms);
        let n_points = calc_mass_range(variances.exact);
        let (points, weights) = transform(terms, n_points);

        let floor = self.params.noise_floor;
        let mono_mz = mass_to_mz(zero, charge);
        let z = charge.abs().max(1) as f64;
        let half = n_points / 2;
        let mut result = Vec::new();

        // Masses below the integer average mass
        for p in points[..half].iter() {
            if ((p.mass + 0.5).floor() as i64) < weights.int_monoisotopic {
                continue;
            }
            let mz = mass_to_mz(p.mass, charge);
            if (mono_mz - mz) * z > 0.5 {
                continue;
            }
            if p.abundance <= floor {
                continue;
            }
            result.push((mz, p.abundance));
        }

        // Masses at or above the integer average mass
        for p in points[half..].iter() {
            if ((p.mass + 0.5).floor() as i64) > weights.int_maximum {
                continue;
            }
            if p.abundance <= floor {
                break;
            }
            result.push((mass_to_mz(p.mass, charge), p.abundance));
        }
        result
    }

    fn accurate_mass(&self, terms: &[ElementTerm], charge: i32) -> Vec<(f64, f64)> {
        let variances = calc_variances(terms);
        let n_points = calc_mass_range(variances.exact);
        let (points, weights) = transform(terms, n_points);

        let mut lower = (weights.monoisotopic + 0.5).floor() as i64;
        if let Some(first) = points.first() {
            if first.mass > (lower + weights.isotope_shift) as f64 {
                lower = (first.mass + 0.5).floor() as i64 + weights.isotope_shift;
            }
        }
        let parent: Vec<(i64, f64)> = mass_to_int(&points)
            .into_iter()
            .filter(|(m, _)| *m >= lower && *m <= weights.int_maximum)
            .collect();
        let Some(&(upper, _)) = parent.last() else {
            return Vec::new();
        };

        let mut exact_masses = vec![0.0; parent.len()];
        for (e, term) in terms.iter().enumerate() {
            let product_terms: Vec<ElementTerm> = terms
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let mut t = t.clone();
                    if i == e {
                        t.count -= 1;
                    }
                    t
                })
                .filter(|t| t.count > 0)
                .collect();
            let product: Vec<(i64, f64)> = if product_terms.is_empty() {
                vec![(0, 1.0)]
            } else {
                let (product_points, _) = transform(&product_terms, n_points);
                mass_to_int(&product_points)
            };

            for iso in term.isotopes.iter() {
                let shifted: HashMap<i64, f64> = product
                    .iter()
                    .map(|(m, p)| (m + iso.int_mass as i64, *p))
                    .filter(|(m, _)| *m >= lower && *m <= upper)
                    .collect();
                for ((mass, abundance), acc) in parent.iter().zip(exact_masses.iter_mut()) {
                    if *abundance == 0.0 {
                        continue;
                    }
                    if let Some(p) = shifted.get(mass) {
                        let share = p / abundance * iso.abundance * term.count as f64;
                        *acc += share * iso.mass;
                    }
                }
            }
        }

        parent
            .iter()
            .zip(exact_masses)
            .filter(|((_, abundance), _)| *abundance >= 1e-6)
            .map(|((_, abundance), mass)| (mass_to_mz(mass, charge), *abundance))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::periodic_table::PeriodicTable;

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

    // C6H12O6 from the built-in table's monoisotopic masses
    const GLUCOSE_MASS: f64 = 180.0633798;

    fn formula(text: &str) -> Formula {
        text.parse().unwrap()
    }

    fn check_invariants(dist: &Distribution) {
        assert!(!dist.is_empty());
        for pair in dist.peaks.windows(2) {
            assert!(pair[0].mz < pair[1].mz, "{:?}", pair);
        }
        assert_is_close!(dist.total_fraction(), 1.0, 1e-9, "total fraction");
        assert_is_close!(dist.base_peak().unwrap().intensity, 100.0, 1e-9, "base peak");
    }

    #[test]
    fn test_mass_range() {
        assert_eq!(calc_mass_range(0.0), 32);
        // sqrt(2.56) * 10 = 16 points is not above the 16 threshold
        assert_eq!(calc_mass_range(1.56), 32);
        assert_eq!(calc_mass_range(3.0), 64);
        assert_eq!(calc_mass_range(1e9), 4096);
    }

    #[test]
    fn test_glucose() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let dist = mercury.compute(&formula("C6H12O6"), 1, false).unwrap();
        check_invariants(&dist);
        assert_is_close!(dist.zero_mass, GLUCOSE_MASS, 1e-6, "zero mass");
        assert_is_close!(dist.peaks[0].mz, GLUCOSE_MASS + PROTON, 0.02, "mono m/z");
        assert!(dist.peaks[0].intensity > dist.peaks[1].intensity);
        // Roughly six carbons at 1.1%
        let m1 = dist.peaks[1].intensity;
        assert!(m1 > 6.0 && m1 < 8.0, "{m1}");
    }

    #[test]
    fn test_peptide_distribution() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let f = formula("C50H80N14O15S1");
        for charge in [1, 2, 3] {
            let dist = mercury.compute(&f, charge, false).unwrap();
            check_invariants(&dist);
            let spacing = dist.peaks[1].mz - dist.peaks[0].mz;
            assert_is_close!(spacing, 1.00235 / charge as f64, 0.01, "spacing");
            assert_is_close!(dist.mono_mz(), mass_to_mz(dist.zero_mass, charge), 1e-12, "mono");
        }
    }

    #[test]
    fn test_zero_mass_independent_of_accuracy() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let table = PeriodicTable::builtin();
        let f = formula("C31H50N8O12S2");
        let expected = f.mono_mass(&table).unwrap();
        let nominal = mercury.compute(&f, 2, false).unwrap();
        let accurate = mercury.compute(&f, 2, true).unwrap();
        assert_eq!(nominal.zero_mass, expected);
        assert_eq!(accurate.zero_mass, expected);
    }

    #[test]
    fn test_accurate_mass() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let f = formula("C6H12O6");
        let dist = mercury.compute(&f, 1, true).unwrap();
        check_invariants(&dist);
        assert_is_close!(dist.peaks[0].mz, GLUCOSE_MASS + PROTON, 1e-4, "mono m/z");
        // The M+1 peak of glucose is dominated by 13C
        assert_is_close!(
            dist.peaks[1].mz,
            GLUCOSE_MASS + 1.0033554 + PROTON,
            2e-3,
            "M+1 m/z"
        );
    }

    #[test]
    fn test_neutral_charge() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let dist = mercury.compute(&formula("C6H12O6"), 0, false).unwrap();
        check_invariants(&dist);
        assert_is_close!(dist.peaks[0].mz, GLUCOSE_MASS, 0.02, "neutral mass");
    }

    #[test]
    fn test_enriched_carbon() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let f = formula("C10");
        let mut overlay = mercury.overlay();
        overlay.enrich(6, 1, 1.0).unwrap();
        let dist = mercury.compute_with(&overlay, &f, 1, false).unwrap();
        let base = dist.base_peak().unwrap();
        assert_is_close!(base.fraction, 1.0, 1e-9, "fraction");
        assert_is_close!(base.mz, 10.0 * 13.0033554 + PROTON, 1e-6, "m/z");
        for p in dist.iter().filter(|p| p.mz != base.mz) {
            assert!(p.fraction < 1e-9, "{p:?}");
        }

        overlay.reset();
        let natural = mercury.compute_with(&overlay, &f, 1, false).unwrap();
        let direct = mercury.compute(&f, 1, false).unwrap();
        assert_eq!(natural, direct);
        assert_is_close!(natural.peaks[0].mz, 120.0 + PROTON, 0.01, "m/z");
    }

    #[test]
    fn test_compute_enriched_is_scoped() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let f = formula("C20H30N5O6");
        let before = mercury.compute(&f, 2, false).unwrap();
        let enriched = mercury
            .compute_enriched(&f, 2, &[Enrichment::new(7, 1, 0.99)], false)
            .unwrap();
        assert!(enriched.max_peak_mz().unwrap() > before.max_peak_mz().unwrap() + 2.0);
        let after = mercury.compute(&f, 2, false).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_errors() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        assert!(matches!(
            mercury.compute(&Formula::new(), 1, false),
            Err(MercuryError::EmptyFormula)
        ));
        let mut f = Formula::new();
        f.set(44, 2);
        assert!(matches!(
            mercury.compute(&f, 1, false),
            Err(MercuryError::UnknownElement(44))
        ));
    }

    #[test]
    fn test_retain_fraction() {
        let mercury = Mercury::new(IsotopeTable::builtin());
        let dist = mercury
            .compute(&formula("C50H80N14O15S1"), 2, false)
            .unwrap();
        let n = dist.len();
        let trimmed = dist.retain_fraction(0.01);
        assert!(trimmed.len() < n);
        assert!(trimmed.iter().all(|p| p.fraction >= 0.01));
        assert!(trimmed.area > 1.0);
    }
}
