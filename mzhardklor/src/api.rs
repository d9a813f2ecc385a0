//! High level APIs for searching observed windows for mixtures of isotopic features
use std::path::PathBuf;

use mzpeaks::{CentroidLike, MassPeakSetType, Tolerance};
use thiserror::Error;
use tracing::debug;

use crate::averagine::{Averagine, AveragineModel};
use crate::candidate::{CandidateBuilder, CandidateSet};
use crate::charge::{ChargeRange, ChargeStrategy};
use crate::isotope_table::{IsotopeTable, IsotopeTableError};
use crate::mercury::{Mercury, MercuryError, MercuryParams};
use crate::model_library::{ModelLibrary, ModelLibraryError, ModelLibraryParams};
use crate::periodic_table::PeriodicTable;
use crate::scorer::ScoreType;
use crate::search::{Combination, SearchAlgorithm};
use crate::solution::FeatureSolution;
use crate::variant::{Variant, VariantError};

#[derive(Debug, Error)]
pub enum HardklorError {
    #[error("An error occurred while reading the isotope table: {0}")]
    IsotopeTableError(
        #[from]
        #[source]
        IsotopeTableError,
    ),
    #[error("An error occurred while parsing a variant: {0}")]
    VariantError(
        #[from]
        #[source]
        VariantError,
    ),
    #[error("An error occurred while computing an isotopic distribution: {0}")]
    MercuryError(
        #[from]
        #[source]
        MercuryError,
    ),
    #[error("An error occurred in the model library: {0}")]
    ModelLibraryError(
        #[from]
        #[source]
        ModelLibraryError,
    ),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Everything needed to build a [`HardklorEngine`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HardklorParams {
    /// The minimum to maximum charge state to model, both at least 1
    pub charge_range: ChargeRange,
    /// Combinations scoring above this are accepted and end the search early
    pub correlation_threshold: ScoreType,
    /// The most features a single window may be explained by
    pub max_depth: usize,
    pub algorithm: SearchAlgorithm,
    /// Variant programs such as `"99.0N1"` or `"C2H3N1O1"`, see [`Variant::parse`]
    pub variants: Vec<String>,
    /// Whether to model the unmodified form alongside the listed variants
    pub include_base_variant: bool,
    pub error_tolerance_ppm: f64,
    /// The most candidate features to consider per window. Zero considers all of them.
    pub max_candidates: usize,
    pub charge_strategy: ChargeStrategy,
    pub averagine: AveragineModel,
    /// An isotope table file to use instead of the built-in table
    pub isotope_table: Option<PathBuf>,
    /// A periodic table file. When absent, it is derived from the isotope table.
    pub periodic_table: Option<PathBuf>,
    pub model_library: ModelLibraryParams,
    pub mercury: MercuryParams,
}

impl Default for HardklorParams {
    fn default() -> Self {
        Self {
            charge_range: (1, 5),
            correlation_threshold: 0.95,
            max_depth: 3,
            algorithm: SearchAlgorithm::default(),
            variants: Vec::new(),
            include_base_variant: true,
            error_tolerance_ppm: 10.0,
            max_candidates: 10,
            charge_strategy: ChargeStrategy::default(),
            averagine: AveragineModel::default(),
            isotope_table: None,
            periodic_table: None,
            model_library: ModelLibraryParams::default(),
            mercury: MercuryParams::default(),
        }
    }
}

/// The best explanation found for one observed window
#[derive(Debug, Clone, Default)]
pub struct WindowResult {
    pub combination: Combination,
    /// One reported feature per member of `combination`, in the same order
    pub hypotheses: Vec<FeatureSolution>,
    /// The number of candidate features the window produced
    pub candidates: usize,
    /// The number of correlations the search evaluated
    pub evaluations: usize,
}

impl WindowResult {
    pub fn score(&self) -> ScoreType {
        self.combination.score
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Whether the combination beat `threshold`. Callers decide what to do with
    /// best-effort results that did not.
    pub fn is_accepted(&self, threshold: ScoreType) -> bool {
        !self.is_empty() && self.combination.score > threshold
    }

    /// The hypotheses as a peak set ordered by neutral mass
    pub fn deconvoluted_peaks(&self) -> MassPeakSetType<FeatureSolution> {
        MassPeakSetType::new(self.hypotheses.clone())
    }
}

/// A single-shot search of the provided peak list.
///
/// This builds the whole model library before searching, so when analyzing many
/// windows with the same parameters create a [`HardklorEngine`] once and call
/// [`HardklorEngine::analyze_window`] instead.
pub fn analyze_window<C: CentroidLike>(
    peaks: &[C],
    params: HardklorParams,
) -> Result<WindowResult, HardklorError> {
    HardklorEngine::new(params)?.analyze_window(peaks)
}

/// Holds the tables and the model library for one parameter set so that any number
/// of windows can be searched against them
#[derive(Debug, Clone)]
pub struct HardklorEngine {
    params: HardklorParams,
    library: ModelLibrary,
}

impl HardklorEngine {
    /// Load the tables, parse the variants and build the model library
    pub fn new(params: HardklorParams) -> Result<Self, HardklorError> {
        if params.error_tolerance_ppm.is_nan() || params.error_tolerance_ppm <= 0.0 {
            return Err(HardklorError::InvalidParameter(format!(
                "error tolerance must be positive, got {}",
                params.error_tolerance_ppm
            )));
        }
        let isotopes = IsotopeTable::load(params.isotope_table.as_ref());
        let periodic_table = match params.periodic_table.as_ref() {
            Some(path) => PeriodicTable::load(Some(path)),
            None => PeriodicTable::from_isotopes(&isotopes),
        };
        let variants = params
            .variants
            .iter()
            .map(|text| Variant::parse(text, &periodic_table))
            .collect::<Result<Vec<_>, _>>()?;

        let averagine = Averagine::new(params.averagine, periodic_table, isotopes.clone());
        let mercury = Mercury::with_params(isotopes, params.mercury);
        let mut library = ModelLibrary::new(averagine, mercury, params.model_library);
        let (low, high) = params.charge_range;
        library.build(low, high, &variants, params.include_base_variant)?;
        debug!(
            "Prepared {} models for {} variants using {}",
            library.len(),
            library.variants().len(),
            params.algorithm
        );
        Ok(Self { params, library })
    }

    pub fn params(&self) -> &HardklorParams {
        &self.params
    }

    pub fn library(&self) -> &ModelLibrary {
        &self.library
    }

    /// Switch the search strategy without rebuilding the model library
    pub fn set_algorithm(&mut self, algorithm: SearchAlgorithm) {
        self.params.algorithm = algorithm;
    }

    /// Align models onto `peaks` to produce candidate features
    pub fn candidates<C: CentroidLike>(&self, peaks: &[C]) -> Result<CandidateSet, HardklorError> {
        let builder = CandidateBuilder::new(
            &self.library,
            Tolerance::PPM(self.params.error_tolerance_ppm),
        )
        .charge_range(self.params.charge_range)
        .charge_strategy(self.params.charge_strategy)
        .max_candidates(self.params.max_candidates);
        Ok(builder.build(peaks)?)
    }

    /// Find the mixture of at most `max_depth` features that best explains `peaks`
    pub fn analyze_window<C: CentroidLike>(&self, peaks: &[C]) -> Result<WindowResult, HardklorError> {
        let candidates = self.candidates(peaks)?;
        let strategy = self
            .params
            .algorithm
            .strategy(self.params.correlation_threshold);
        let outcome = strategy.search_with_stats(&candidates, self.params.max_depth);
        debug!(
            "{} scored {:.4} with {} features from {} candidates in {} evaluations",
            strategy.name(),
            outcome.combination.score,
            outcome.combination.len(),
            candidates.len(),
            outcome.evaluations
        );
        let hypotheses = self.hypotheses(&candidates, &outcome.combination);
        Ok(WindowResult {
            combination: outcome.combination,
            hypotheses,
            candidates: candidates.len(),
            evaluations: outcome.evaluations,
        })
    }

    fn hypotheses(&self, candidates: &CandidateSet, combination: &Combination) -> Vec<FeatureSolution> {
        let periodic_table = self.library.averagine().periodic_table();
        combination
            .iter()
            .map(|selection| {
                let candidate = &candidates.candidates[selection.candidate];
                let alignment = candidates.alignment(selection.candidate, selection.variant);
                let modification = self
                    .library
                    .variants()
                    .get(alignment.variant)
                    .map(|v| v.render(periodic_table))
                    .unwrap_or_default();
                FeatureSolution::new(
                    alignment.mono_mass,
                    selection.intensity as f32,
                    candidate.charge,
                    selection.candidate as u32,
                    selection.intensity * alignment.area,
                    candidate.mz,
                    alignment.variant,
                    modification,
                    combination.score,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use mzpeaks::prelude::*;
    use mzpeaks::CentroidPeak;

    use super::*;

    fn small_params() -> HardklorParams {
        HardklorParams {
            charge_range: (1, 3),
            model_library: ModelLibraryParams::new(5.0, 300, 0.01),
            ..Default::default()
        }
    }

    fn window_for(engine: &HardklorEngine, charge: i32, mz: f64, scale: f32) -> Vec<CentroidPeak> {
        let entry = engine.library().get(charge, 0, mz).unwrap();
        let base = entry.distribution.base_peak().unwrap().mz;
        entry
            .distribution
            .iter()
            .enumerate()
            .map(|(i, p)| CentroidPeak::new(p.mz - base + mz, p.intensity as f32 * scale, i as u32))
            .collect()
    }

    #[test_log::test]
    fn test_single_feature() {
        let engine = HardklorEngine::new(small_params()).unwrap();
        let peaks = window_for(&engine, 2, 700.0, 50.0);
        let result = engine.analyze_window(&peaks).unwrap();
        assert!(result.is_accepted(0.95), "{result:?}");
        assert!(result.evaluations > 0);
        let best = &result.hypotheses[0];
        assert_eq!(best.charge, 2);
        assert_eq!(best.base_mz, 700.0);
        assert_eq!(best.modification, "_");
        assert!((best.intensity - 5000.0).abs() < 1e-3);
        assert!(best.area > best.intensity as f64);

        let peak_set = result.deconvoluted_peaks();
        assert_eq!(peak_set.len(), result.hypotheses.len());
    }

    #[test]
    fn test_empty_window() {
        let engine = HardklorEngine::new(small_params()).unwrap();
        let result = engine.analyze_window::<CentroidPeak>(&[]).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.score(), 0.0);
        assert!(!result.is_accepted(0.0));
    }

    #[test]
    fn test_variants_and_errors() {
        let params = HardklorParams {
            variants: vec!["99.0N1".to_string()],
            ..small_params()
        };
        let engine = HardklorEngine::new(params).unwrap();
        assert_eq!(engine.library().variants().len(), 2);

        let params = HardklorParams {
            variants: vec!["50Qq1".to_string()],
            ..small_params()
        };
        assert!(matches!(
            HardklorEngine::new(params),
            Err(HardklorError::VariantError(_))
        ));

        let params = HardklorParams {
            charge_range: (0, 2),
            ..small_params()
        };
        assert!(matches!(
            HardklorEngine::new(params),
            Err(HardklorError::ModelLibraryError(ModelLibraryError::InvalidBounds(_)))
        ));

        let params = HardklorParams {
            error_tolerance_ppm: 0.0,
            ..small_params()
        };
        assert!(matches!(
            HardklorEngine::new(params),
            Err(HardklorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_every_algorithm_finds_feature() {
        let mut engine = HardklorEngine::new(small_params()).unwrap();
        let peaks = window_for(&engine, 1, 900.0, 10.0);
        for algorithm in SearchAlgorithm::ALL {
            engine.set_algorithm(algorithm);
            let result = engine.analyze_window(&peaks).unwrap();
            assert!(result.score() > 0.95, "{algorithm}: {}", result.score());
        }
    }
}
