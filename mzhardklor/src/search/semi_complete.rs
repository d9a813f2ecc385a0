use tracing::trace;

use crate::candidate::CandidateSet;
use crate::scorer::{IntensitySums, ScoreType};

use super::{SearchOutcome, SearchState, SearchStrategy, Selection};

/// Level-wise depth-first search that stops descending once a level finds a good enough
/// combination.
///
/// At each node, every remaining (candidate, variant) pair is scored before any of them
/// is expanded. If the best of those, or the node itself, beats the threshold the node
/// is not expanded further. Each candidate is weighted by its seed intensity.
///
/// The fast form keeps the intensity sums computed while scoring a level and reuses
/// them for the children instead of recomputing them.
#[derive(Debug, Clone, Copy)]
pub struct SemiComplete {
    pub threshold: ScoreType,
    cache_level: bool,
}

impl SemiComplete {
    pub fn new(threshold: ScoreType) -> Self {
        Self {
            threshold,
            cache_level: false,
        }
    }

    pub fn fast(threshold: ScoreType) -> Self {
        Self {
            threshold,
            cache_level: true,
        }
    }

    pub fn is_fast(&self) -> bool {
        self.cache_level
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        state: &mut SearchState<'_>,
        sums: &IntensitySums,
        path: &mut Vec<Selection>,
        start: usize,
        depth: usize,
        max_depth: usize,
        parent_score: ScoreType,
    ) {
        let set = state.set;
        let mut level_best = parent_score;
        let mut branches: Vec<(Selection, ScoreType, Option<IntensitySums>)> = Vec::new();
        for k in start..set.len() {
            let candidate = &set.candidates[k];
            for (v, alignment) in candidate.variants.iter().enumerate() {
                let next = sums.with_added(alignment, candidate.intensity);
                let score = state.score(&next);
                let selection = Selection::new(k, v, candidate.intensity);
                path.push(selection);
                state.offer(path, score);
                path.pop();
                if score > level_best {
                    level_best = score;
                }
                branches.push((selection, score, self.cache_level.then_some(next)));
            }
        }

        if level_best > self.threshold {
            trace!("Level at depth {depth} reached {level_best:.4}, not expanding");
            return;
        }
        if depth >= max_depth {
            return;
        }
        for (selection, score, cached) in branches {
            let next = match cached {
                Some(next) => next,
                None => sums.with_added(
                    set.alignment(selection.candidate, selection.variant),
                    selection.intensity,
                ),
            };
            path.push(selection);
            self.descend(
                state,
                &next,
                path,
                selection.candidate + 1,
                depth + 1,
                max_depth,
                score,
            );
            path.pop();
        }
    }
}

impl SearchStrategy for SemiComplete {
    fn name(&self) -> &'static str {
        if self.cache_level {
            "SemiCompleteFast"
        } else {
            "SemiComplete"
        }
    }

    fn search_with_stats(&self, candidates: &CandidateSet, max_depth: usize) -> SearchOutcome {
        let mut state = SearchState::new(candidates);
        if max_depth == 0 || candidates.is_empty() {
            return state.finish();
        }
        let mut path = Vec::with_capacity(max_depth);
        self.descend(
            &mut state,
            &candidates.empty_sums(),
            &mut path,
            0,
            1,
            max_depth,
            0.0,
        );
        state.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::search::{test::mixture, Basic};

    #[test]
    fn test_fast_matches_slow() {
        let set = mixture();
        for threshold in [0.5, 0.95, 1.5] {
            for depth in 1..=3 {
                let slow = SemiComplete::new(threshold).search_with_stats(&set, depth);
                let fast = SemiComplete::fast(threshold).search_with_stats(&set, depth);
                assert_eq!(slow, fast, "threshold {threshold} depth {depth}");
            }
        }
    }

    #[test]
    fn test_threshold_stops_descent() {
        let set = mixture();
        // The first level already beats a low threshold, so nothing deeper is scored
        let outcome = SemiComplete::new(0.5).search_with_stats(&set, 3);
        assert_eq!(outcome.evaluations, 6);
        assert_eq!(outcome.combination.len(), 1);

        let outcome = SemiComplete::new(0.95).search_with_stats(&set, 3);
        assert_eq!(outcome.combination.score, 1.0);
        assert_eq!(outcome.combination.len(), 2);
    }

    #[test]
    fn test_exhaustive_without_threshold() {
        let set = mixture();
        let exhaustive = SemiComplete::new(1.5).search_with_stats(&set, 3);
        let basic = Basic::new().search_with_stats(&set, 3);
        assert_eq!(exhaustive.evaluations, basic.evaluations);
        assert_eq!(exhaustive.combination.score, basic.combination.score);
        assert!(SemiComplete::fast(0.9).is_fast());
    }
}
