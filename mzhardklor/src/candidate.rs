/*! Candidate features and their alignment onto an observed peak window.

A [`CandidateFeature`] is a putative species seeded at one observed peak and charge. For
each model variant it carries a [`VariantAlignment`]: the model distribution shifted so
its tallest peak sits on the seed peak, split into the part that lands on observed peaks
and the part that does not. The unmatched positions of every candidate share one mismatch
axis so that overlapping predictions with no observed support are counted once.
*/
use mzpeaks::prelude::*;
use mzpeaks::{CentroidPeak, Tolerance};
use tracing::{debug, trace};

use crate::charge::{ChargeRange, ChargeStrategy};
use crate::model_library::{ModelEntry, ModelLibrary, ModelLibraryError};
use crate::scorer::IntensitySums;

/// One variant's model aligned onto the observed peaks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantAlignment {
    /// The index of the variant in the model library
    pub variant: usize,
    /// Theoretical intensity landing on each observed peak, scaled so the tallest
    /// theoretical peak is 1
    pub matched: Vec<f64>,
    /// Theoretical intensity on each slot of the shared mismatch axis
    pub mismatched: Vec<f64>,
    /// The neutral monoisotopic mass of the shifted model
    pub mono_mass: f64,
    /// The summed relative intensity of the model, in units of its tallest peak
    pub area: f64,
}

impl VariantAlignment {
    pub fn new(variant: usize, matched: Vec<f64>, mismatched: Vec<f64>) -> Self {
        Self {
            variant,
            matched,
            mismatched,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFeature {
    /// The m/z of the seed peak
    pub mz: f64,
    pub charge: i32,
    /// The intensity of the seed peak
    pub intensity: f64,
    /// The index of the seed peak among the observed peaks
    pub max_peak_index: usize,
    pub variants: Vec<VariantAlignment>,
}

impl CandidateFeature {
    pub fn new(
        mz: f64,
        charge: i32,
        intensity: f64,
        max_peak_index: usize,
        variants: Vec<VariantAlignment>,
    ) -> Self {
        Self {
            mz,
            charge,
            intensity,
            max_peak_index,
            variants,
        }
    }
}

/// Everything a search strategy needs about one observed window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    pub observed_mz: Vec<f64>,
    pub observed: Vec<f64>,
    pub mismatch_len: usize,
    pub candidates: Vec<CandidateFeature>,
}

impl CandidateSet {
    pub fn new(
        observed_mz: Vec<f64>,
        observed: Vec<f64>,
        mismatch_len: usize,
        candidates: Vec<CandidateFeature>,
    ) -> Self {
        Self {
            observed_mz,
            observed,
            mismatch_len,
            candidates,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CandidateFeature> {
        self.candidates.get(index)
    }

    /// The number of variants of each candidate
    pub fn variant_counts(&self) -> Vec<usize> {
        self.candidates.iter().map(|c| c.variants.len()).collect()
    }

    pub fn empty_sums(&self) -> IntensitySums {
        IntensitySums::zeros(self.observed.len(), self.mismatch_len)
    }

    pub fn alignment(&self, candidate: usize, variant: usize) -> &VariantAlignment {
        &self.candidates[candidate].variants[variant]
    }
}

/// Seeds candidates from an observed window and aligns library models onto it
#[derive(Debug, Clone)]
pub struct CandidateBuilder<'a> {
    library: &'a ModelLibrary,
    pub error_tolerance: Tolerance,
    pub charge_range: ChargeRange,
    pub charge_strategy: ChargeStrategy,
    /// The most candidates to keep, by seed intensity. Zero keeps all of them.
    pub max_candidates: usize,
}

struct PendingMismatch {
    mz: f64,
    value: f64,
    candidate: usize,
    variant: usize,
}

impl<'a> CandidateBuilder<'a> {
    pub fn new(library: &'a ModelLibrary, error_tolerance: Tolerance) -> Self {
        Self {
            library,
            error_tolerance,
            charge_range: library.charge_range(),
            charge_strategy: ChargeStrategy::default(),
            max_candidates: 0,
        }
    }

    pub fn charge_range(mut self, charge_range: ChargeRange) -> Self {
        self.charge_range = charge_range;
        self
    }

    pub fn charge_strategy(mut self, charge_strategy: ChargeStrategy) -> Self {
        self.charge_strategy = charge_strategy;
        self
    }

    pub fn max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    fn nearest_peak(&self, observed_mz: &[f64], mz: f64) -> Option<usize> {
        let i = observed_mz.partition_point(|m| *m < mz);
        let below = i.checked_sub(1);
        let above = (i < observed_mz.len()).then_some(i);
        let best = match (below, above) {
            (Some(b), Some(a)) => {
                if (mz - observed_mz[b]).abs() <= (observed_mz[a] - mz).abs() {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };
        self.error_tolerance
            .test(observed_mz[best], mz)
            .then_some(best)
    }

    /// Shift `entry` onto `seed_mz` and split it into matched intensities and
    /// unmatched `(m/z, intensity)` positions
    fn align(
        &self,
        entry: &ModelEntry,
        variant: usize,
        seed_mz: f64,
        charge: i32,
        observed_mz: &[f64],
    ) -> (VariantAlignment, Vec<(f64, f64)>) {
        let mut alignment = VariantAlignment {
            variant,
            matched: vec![0.0; observed_mz.len()],
            area: entry.area(),
            ..Default::default()
        };
        let mut unmatched = Vec::new();
        let Some(base) = entry.distribution.base_peak() else {
            return (alignment, unmatched);
        };
        let shift = seed_mz - base.mz;
        alignment.mono_mass = entry.mono_mass() + shift * charge.abs().max(1) as f64;
        for peak in entry.distribution.iter() {
            let mz = peak.mz + shift;
            let value = peak.intensity / 100.0;
            match self.nearest_peak(observed_mz, mz) {
                Some(i) => {
                    alignment.matched[i] = alignment.matched[i].max(value);
                }
                None => unmatched.push((mz, value)),
            }
        }
        (alignment, unmatched)
    }

    /// Build the candidate set for `peaks`, which need not be sorted
    pub fn build<C: CentroidLike>(&self, peaks: &[C]) -> Result<CandidateSet, ModelLibraryError> {
        let mut sorted: Vec<CentroidPeak> = peaks
            .iter()
            .enumerate()
            .map(|(i, p)| CentroidPeak::new(p.mz(), p.intensity(), i as u32))
            .collect();
        sorted.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        let observed_mz: Vec<f64> = sorted.iter().map(|p| p.mz).collect();
        let observed: Vec<f64> = sorted.iter().map(|p| p.intensity as f64).collect();

        let mut seeds: Vec<(usize, i32)> = Vec::new();
        for (i, peak) in sorted.iter().enumerate() {
            if peak.intensity <= 0.0 {
                continue;
            }
            for charge in self
                .charge_strategy
                .for_peak(&sorted, i, self.charge_range)
            {
                seeds.push((i, charge));
            }
        }
        seeds.sort_by(|(a, _), (b, _)| observed[*b].total_cmp(&observed[*a]));

        let n_variants = self.library.variants().len();
        let mut candidates: Vec<CandidateFeature> = Vec::new();
        let mut pending: Vec<PendingMismatch> = Vec::new();
        'seeds: for (i, charge) in seeds {
            if self.max_candidates > 0 && candidates.len() >= self.max_candidates {
                break;
            }
            let seed_mz = observed_mz[i];
            let mut entries = Vec::with_capacity(n_variants);
            for v in 0..n_variants {
                match self.library.get(charge, v, seed_mz) {
                    Ok(entry) => entries.push(entry),
                    Err(ModelLibraryError::MassOutOfRange { mz }) => {
                        trace!("No model for {mz:.4} at charge {charge}, skipping seed");
                        continue 'seeds;
                    }
                    Err(e) => return Err(e),
                }
            }
            if entries.iter().all(|e| e.is_empty()) {
                continue;
            }
            let index = candidates.len();
            let variants = entries
                .into_iter()
                .enumerate()
                .map(|(v, entry)| {
                    let (alignment, unmatched) =
                        self.align(entry, v, seed_mz, charge, &observed_mz);
                    pending.extend(unmatched.into_iter().map(|(mz, value)| PendingMismatch {
                        mz,
                        value,
                        candidate: index,
                        variant: v,
                    }));
                    alignment
                })
                .collect();
            candidates.push(CandidateFeature::new(
                seed_mz,
                charge,
                observed[i],
                i,
                variants,
            ));
        }

        let mismatch_len = self.merge_mismatches(&mut candidates, pending);
        debug!(
            "Built {} candidates over {} observed peaks with {} mismatch slots",
            candidates.len(),
            observed.len(),
            mismatch_len
        );
        Ok(CandidateSet::new(
            observed_mz,
            observed,
            mismatch_len,
            candidates,
        ))
    }

    /// Merge unmatched theoretical positions within the error tolerance of one another
    /// into shared slots and fill in every alignment's mismatch array
    fn merge_mismatches(
        &self,
        candidates: &mut [CandidateFeature],
        mut pending: Vec<PendingMismatch>,
    ) -> usize {
        pending.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        let mut slots = Vec::with_capacity(pending.len());
        let mut anchor: Option<f64> = None;
        let mut n_slots = 0usize;
        for p in pending.iter() {
            match anchor {
                Some(a) if self.error_tolerance.test(p.mz, a) => {}
                _ => {
                    anchor = Some(p.mz);
                    n_slots += 1;
                }
            }
            slots.push(n_slots - 1);
        }

        for c in candidates.iter_mut() {
            for v in c.variants.iter_mut() {
                v.mismatched = vec![0.0; n_slots];
            }
        }
        for (p, slot) in pending.iter().zip(slots) {
            let cell = &mut candidates[p.candidate].variants[p.variant].mismatched[slot];
            *cell = cell.max(p.value);
        }
        n_slots
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::averagine::Averagine;
    use crate::mercury::Mercury;
    use crate::model_library::ModelLibraryParams;

    fn library() -> ModelLibrary {
        let mut library = ModelLibrary::new(
            Averagine::default(),
            Mercury::default(),
            ModelLibraryParams::new(5.0, 240, 0.01),
        );
        library.build(1, 2, &[], true).unwrap();
        library
    }

    fn window_from(entry: &ModelEntry, seed_mz: f64, scale: f32) -> Vec<CentroidPeak> {
        let base = entry.distribution.base_peak().unwrap().mz;
        entry
            .distribution
            .iter()
            .enumerate()
            .map(|(i, p)| {
                CentroidPeak::new(p.mz - base + seed_mz, p.intensity as f32 * scale, i as u32)
            })
            .collect()
    }

    #[test]
    fn test_build_from_model() {
        let library = library();
        let entry = library.get(1, 0, 800.0).unwrap();
        let peaks = window_from(entry, 800.0, 10.0);
        let builder = CandidateBuilder::new(&library, Tolerance::PPM(10.0));
        let set = builder.build(&peaks).unwrap();
        assert_eq!(set.observed.len(), peaks.len());

        let seed = set
            .candidates
            .iter()
            .find(|c| c.charge == 1 && (c.mz - 800.0).abs() < 1e-9)
            .unwrap();
        assert_eq!(seed.variants.len(), 1);
        let alignment = &seed.variants[0];
        assert_eq!(alignment.matched[seed.max_peak_index], 1.0);
        for (m, p) in alignment.matched.iter().zip(entry.distribution.iter()) {
            assert!((m - p.intensity / 100.0).abs() < 1e-12);
        }
        assert!(alignment.mismatched.iter().all(|m| *m == 0.0));
        let shift = 800.0 - entry.distribution.base_peak().unwrap().mz;
        assert!((alignment.mono_mass - (entry.mono_mass() + shift)).abs() < 1e-9);
    }

    #[test]
    fn test_mismatch_axis() {
        let library = library();
        // Two lone peaks, each seeding charge 1 candidates whose isotopes are unobserved
        let peaks = vec![
            CentroidPeak::new(600.0, 1000.0, 0),
            CentroidPeak::new(900.0, 500.0, 1),
        ];
        let builder = CandidateBuilder::new(&library, Tolerance::PPM(10.0))
            .charge_strategy(ChargeStrategy::ChargeRange);
        let set = builder.build(&peaks).unwrap();
        assert_eq!(set.len(), 4);
        assert!(set.mismatch_len > 0);
        for c in set.candidates.iter() {
            for v in c.variants.iter() {
                assert_eq!(v.mismatched.len(), set.mismatch_len);
                assert_eq!(v.matched.len(), 2);
            }
        }
        // Seeds are ordered by intensity
        assert_eq!(set.candidates[0].mz, 600.0);

        let capped = CandidateBuilder::new(&library, Tolerance::PPM(10.0))
            .charge_strategy(ChargeStrategy::ChargeRange)
            .max_candidates(1)
            .build(&peaks)
            .unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_shared_mismatch_slot() {
        let library = library();
        let entry = library.get(1, 0, 700.0).unwrap();
        let mut peaks = window_from(entry, 700.0, 10.0);
        let base_index = entry.distribution.base_peak_index().unwrap();
        // Drop the heaviest isotope so the seed predicts one peak with no support
        peaks.pop();
        let builder = CandidateBuilder::new(&library, Tolerance::PPM(10.0))
            .charge_strategy(ChargeStrategy::ChargeRange);
        let set = builder.build(&peaks).unwrap();
        let seed = set
            .candidates
            .iter()
            .find(|c| c.charge == 1 && c.max_peak_index == base_index)
            .unwrap();
        let unmatched: Vec<_> = seed.variants[0]
            .mismatched
            .iter()
            .filter(|m| **m > 0.0)
            .collect();
        assert_eq!(unmatched.len(), 1);
    }

    #[test]
    fn test_out_of_range_seed() {
        let library = library();
        let peaks = vec![CentroidPeak::new(5000.0, 1000.0, 0)];
        let set = CandidateBuilder::new(&library, Tolerance::PPM(10.0))
            .charge_strategy(ChargeStrategy::ChargeRange)
            .build(&peaks)
            .unwrap();
        assert!(set.is_empty());
        assert_eq!(set.observed, vec![1000.0]);
    }
}
