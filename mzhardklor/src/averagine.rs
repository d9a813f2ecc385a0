/*! Estimate an elemental formula from a neutral mass.

An averagine model is a fractional "average monomer" composition. Scaling it to a
target mass and rounding gives a plausible formula for an unidentified molecule of
that mass. Hydrogen absorbs the rounding error so the estimated formula's
monoisotopic mass lands within half a hydrogen of the target.
*/
use std::collections::BTreeMap;

use tracing::warn;

use crate::formula::Formula;
use crate::isotope_table::{weighted_mass, AtomicNumber, IsotopeTable};
use crate::periodic_table::PeriodicTable;
use crate::variant::Variant;

const HYDROGEN: AtomicNumber = 1;

/// A set of named average monomer compositions for biomolecules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AveragineModel {
    #[default]
    Peptide,
    Glycan,
    Glycopeptide,
    PermethylatedGlycan,
    Heparin,
    HeparanSulfate,
}

impl AveragineModel {
    /// The fractional element counts of one average monomer
    pub fn composition(&self) -> &'static [(&'static str, f64)] {
        match self {
            AveragineModel::Peptide => &[
                ("C", 4.9384),
                ("H", 7.7583),
                ("N", 1.3577),
                ("O", 1.4773),
                ("S", 0.0417),
            ],
            AveragineModel::Glycan => &[("C", 7.0), ("H", 11.8333), ("N", 0.5), ("O", 5.16666)],
            AveragineModel::Glycopeptide => &[
                ("C", 10.93),
                ("H", 15.75),
                ("N", 1.6577),
                ("O", 6.4773),
                ("S", 0.02054),
            ],
            AveragineModel::PermethylatedGlycan => {
                &[("C", 12.0), ("H", 21.8333), ("N", 0.5), ("O", 5.16666)]
            }
            AveragineModel::Heparin => &[
                ("C", 6.0),
                ("H", 10.5),
                ("N", 0.5),
                ("O", 5.5),
                ("S", 0.5),
            ],
            AveragineModel::HeparanSulfate => &[
                ("C", 6.0),
                ("H", 10.667),
                ("N", 0.667),
                ("O", 9.0),
                ("S", 1.333),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct UnitElement {
    atomic_number: AtomicNumber,
    average_count: f64,
    mono_mass: f64,
}

/// Maps a neutral mass and a [`Variant`] to an estimated [`Formula`]
#[derive(Debug, Clone)]
pub struct Averagine {
    model: AveragineModel,
    units: Vec<UnitElement>,
    periodic_table: PeriodicTable,
    isotope_table: IsotopeTable,
}

impl Averagine {
    /// Build an estimator for `model`. Elements of the model missing from
    /// `periodic_table` are dropped with a warning.
    pub fn new(
        model: AveragineModel,
        periodic_table: PeriodicTable,
        isotope_table: IsotopeTable,
    ) -> Self {
        let units = model
            .composition()
            .iter()
            .filter_map(|(symbol, average_count)| {
                let entry = periodic_table.by_symbol(symbol);
                if entry.is_none() {
                    warn!("{symbol} is not in the periodic table, it will not be used for {model:?}");
                }
                entry.map(|e| UnitElement {
                    atomic_number: e.atomic_number,
                    average_count: *average_count,
                    mono_mass: e.mono_mass,
                })
            })
            .collect();
        Self {
            model,
            units,
            periodic_table,
            isotope_table,
        }
    }

    pub fn model(&self) -> AveragineModel {
        self.model
    }

    pub fn periodic_table(&self) -> &PeriodicTable {
        &self.periodic_table
    }

    /// The monoisotopic mass of one average monomer
    pub fn unit_mass(&self) -> f64 {
        self.units
            .iter()
            .map(|u| u.average_count * u.mono_mass)
            .sum()
    }

    /// The change in mean mass per atom that `variant`'s enrichments cause for each
    /// enriched element, relative to its monoisotopic mass
    pub fn enrichment_shifts(&self, variant: &Variant) -> BTreeMap<AtomicNumber, f64> {
        let mut overlay = self.isotope_table.overlay();
        for e in variant.enrichments.iter() {
            if let Err(err) = overlay.apply(e) {
                warn!("Ignoring enrichment {e:?} when estimating a formula: {err}");
            }
        }
        let enriched: Vec<AtomicNumber> = overlay.enriched_atoms().collect();
        enriched
            .into_iter()
            .filter_map(|z| {
                let isotopes = overlay.isotopes(z)?;
                let abundances: Vec<f64> = isotopes.iter().map(|i| i.abundance).collect();
                let mono = self
                    .periodic_table
                    .mono_mass(z)
                    .or_else(|| overlay.record(z)?.lightest().map(|i| i.mass))?;
                Some((z, weighted_mass(&isotopes, &abundances) - mono))
            })
            .collect()
    }

    /// Estimate a formula whose monoisotopic mass approximates `mass` once `variant`
    /// has been applied. Masses that are too small produce degenerate, possibly
    /// empty, formulas.
    pub fn estimate(&self, mass: f64, variant: &Variant) -> Formula {
        let shifts = self.enrichment_shifts(variant);
        let shift = |z: AtomicNumber| shifts.get(&z).copied().unwrap_or_default();
        let atom_mass = |z: AtomicNumber| self.periodic_table.mono_mass(z).unwrap_or_default() + shift(z);

        let fixed: f64 = mass
            - variant
                .atoms
                .iter()
                .map(|d| atom_mass(d.atomic_number) * d.count as f64)
                .sum::<f64>();

        let unit_mass: f64 = self
            .units
            .iter()
            .map(|u| u.average_count * (u.mono_mass + shift(u.atomic_number)))
            .sum();
        let n_units = if unit_mass > 0.0 { fixed / unit_mass } else { 0.0 };

        let mut formula = Formula::new();
        let mut remainder = fixed;
        for u in self.units.iter().filter(|u| u.atomic_number != HYDROGEN) {
            let count = (u.average_count * n_units).round().max(0.0);
            remainder -= count * (u.mono_mass + shift(u.atomic_number));
            formula.set(u.atomic_number, count as u32);
        }
        if let Some(h) = self.units.iter().find(|u| u.atomic_number == HYDROGEN) {
            let h_mass = h.mono_mass + shift(HYDROGEN);
            let count = (remainder / h_mass).round().max(0.0);
            formula.set(HYDROGEN, count as u32);
        }

        variant.apply_atoms(&mut formula);
        formula
    }
}

impl Default for Averagine {
    fn default() -> Self {
        Self::new(
            AveragineModel::Peptide,
            PeriodicTable::builtin(),
            IsotopeTable::builtin(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mercury::Mercury;

    #[test]
    fn test_unit_mass() {
        let averagine = Averagine::default();
        let unit = averagine.unit_mass();
        assert!((unit - 111.0543).abs() < 0.01, "{unit}");
    }

    #[test]
    fn test_round_trip() {
        let averagine = Averagine::default();
        let mercury = Mercury::default();
        let table = PeriodicTable::builtin();
        for mass in [500.0, 1234.5678, 2500.0, 10_000.0, 25_000.0, 50_000.0] {
            let formula = averagine.estimate(mass, &Variant::identity());
            let mono = formula.mono_mass(&table).unwrap();
            assert!((mono - mass).abs() < 1.0, "{mass} -> {mono}");
            let dist = mercury.compute(&formula, 1, false).unwrap();
            assert!((dist.zero_mass - mass).abs() < 1.0, "{mass} -> {}", dist.zero_mass);
        }
    }

    #[test]
    fn test_explicit_atoms() {
        let averagine = Averagine::default();
        let table = PeriodicTable::builtin();
        let variant = Variant::parse("Cl1", &table).unwrap();
        let formula = averagine.estimate(2000.0, &variant);
        assert_eq!(formula.get(17), 1);
        let mono = formula.mono_mass(&table).unwrap();
        assert!((mono - 2000.0).abs() < 1.0, "{mono}");
    }

    #[test]
    fn test_enrichment_shift() {
        let averagine = Averagine::default();
        let table = PeriodicTable::builtin();
        let variant = Variant::parse("99.0N1", &table).unwrap();
        let shifts = averagine.enrichment_shifts(&variant);
        let n_shift = shifts[&7];
        assert!((n_shift - 0.99 * 0.997).abs() < 0.01, "{n_shift}");

        let natural = averagine.estimate(3000.0, &Variant::identity());
        let enriched = averagine.estimate(3000.0, &variant);
        // Heavier nitrogen means fewer units fit in the same mass
        assert!(enriched.get(6) <= natural.get(6));
        let mean_mass = enriched.mono_mass(&table).unwrap() + enriched.get(7) as f64 * n_shift;
        assert!((mean_mass - 3000.0).abs() < 1.0, "{mean_mass}");
    }

    #[test]
    fn test_degenerate_mass() {
        let averagine = Averagine::default();
        assert!(averagine.estimate(-50.0, &Variant::identity()).is_empty());
        assert!(averagine.estimate(0.0, &Variant::identity()).is_empty());
    }

    #[test]
    fn test_presets() {
        for model in [
            AveragineModel::Glycan,
            AveragineModel::Glycopeptide,
            AveragineModel::PermethylatedGlycan,
            AveragineModel::Heparin,
            AveragineModel::HeparanSulfate,
        ] {
            let averagine = Averagine::new(model, PeriodicTable::builtin(), IsotopeTable::builtin());
            let formula = averagine.estimate(1800.0, &Variant::identity());
            let mono = formula.mono_mass(averagine.periodic_table()).unwrap();
            assert!((mono - 1800.0).abs() < 1.0, "{model:?} {mono}");
        }
    }
}
