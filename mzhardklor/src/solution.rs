//! Reported feature hypotheses
use mzpeaks::prelude::*;
use mzpeaks::{CoordinateLike, MZ};

use crate::mercury::mass_to_mz;
use crate::scorer::ScoreType;

/// One member of the best combination for a window, usable as a deconvoluted peak
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSolution {
    /// The monoisotopic neutral mass
    pub neutral_mass: f64,
    /// The intensity the model was scaled to
    pub intensity: f32,
    pub charge: i32,
    /// The index of the candidate within its window
    pub index: u32,
    /// The intensity scaled by the model's total area relative to its tallest peak
    pub area: f64,
    /// The m/z of the observed peak the model's tallest peak was aligned to
    pub base_mz: f64,
    /// The index of the variant in the model library
    pub variant: usize,
    /// The variant in `<Sym><count>_<percent><Sym><isotope>_` notation
    pub modification: String,
    /// The correlation of the whole combination with its window
    pub score: ScoreType,
}

impl FeatureSolution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        neutral_mass: f64,
        intensity: f32,
        charge: i32,
        index: u32,
        area: f64,
        base_mz: f64,
        variant: usize,
        modification: String,
        score: ScoreType,
    ) -> Self {
        Self {
            neutral_mass,
            intensity,
            charge,
            index,
            area,
            base_mz,
            variant,
            modification,
            score,
        }
    }

    /// The monoisotopic m/z
    pub fn mz(&self) -> f64 {
        mass_to_mz(self.neutral_mass, self.charge)
    }
}

mzpeaks::implement_deconvoluted_centroidlike!(FeatureSolution, true);

impl CoordinateLike<MZ> for FeatureSolution {
    fn coordinate(&self) -> f64 {
        self.mz()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mercury::PROTON;

    #[test]
    fn test_peak_like() {
        let solution = FeatureSolution::new(
            998.0,
            1000.0,
            2,
            0,
            1800.0,
            500.5,
            0,
            "_".to_string(),
            0.98,
        );
        assert_eq!(solution.neutral_mass(), 998.0);
        assert_eq!(solution.intensity(), 1000.0);
        assert_eq!(solution.charge(), 2);
        assert!((solution.mz() - (998.0 + 2.0 * PROTON) / 2.0).abs() < 1e-9);
        assert_eq!(CoordinateLike::<MZ>::coordinate(&solution), solution.mz());
    }
}
