use tracing::trace;

use crate::candidate::CandidateSet;
use crate::scorer::IntensitySums;

use super::{SearchOutcome, SearchState, SearchStrategy, Selection};

/// Exhaustive depth-first enumeration of every combination of up to `max_depth`
/// distinct candidates.
///
/// Candidates are visited from last to first, and each child only considers candidates
/// before its parent, so each set of candidates is visited exactly once. A candidate is
/// weighted by the part of its seed intensity the combination does not yet explain, and
/// is skipped when that part is negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Basic {}

impl Basic {
    pub fn new() -> Self {
        Self {}
    }

    fn descend(
        &self,
        state: &mut SearchState<'_>,
        sums: &IntensitySums,
        path: &mut Vec<Selection>,
        end: usize,
        depth: usize,
        max_depth: usize,
    ) {
        let set = state.set;
        for k in (0..end).rev() {
            let intensity = state.remaining_intensity(k, sums);
            if intensity < 0.0 {
                trace!("Candidate {k} is already over-explained at depth {depth}");
                continue;
            }
            for (v, alignment) in set.candidates[k].variants.iter().enumerate() {
                let next = sums.with_added(alignment, intensity);
                let score = state.score(&next);
                path.push(Selection::new(k, v, intensity));
                state.offer(path, score);
                if depth < max_depth {
                    self.descend(state, &next, path, k, depth + 1, max_depth);
                }
                path.pop();
            }
        }
    }
}

impl SearchStrategy for Basic {
    fn name(&self) -> &'static str {
        "Basic"
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
            candidates.len(),
            1,
            max_depth,
        );
        state.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::search::{expansion_width, test::mixture};

    #[test]
    fn test_visits_everything() {
        let set = mixture();
        let counts = set.variant_counts();
        for depth in 1..=3 {
            let outcome = Basic::new().search_with_stats(&set, depth);
            let expected: usize = (1..=depth).map(|d| expansion_width(&counts, d)).sum();
            assert_eq!(outcome.evaluations, expected, "depth {depth}");
        }
    }

    #[test]
    fn test_weights_by_remaining_intensity() {
        let set = mixture();
        let best = Basic::new().search(&set, 2);
        assert_eq!(best.score, 1.0);
        for s in best.iter() {
            assert_eq!(s.intensity, set.candidates[s.candidate].intensity);
        }

        let single = Basic::new().search(&set, 1);
        assert_eq!(single.len(), 1);
        assert_eq!(single.selections[0].candidate, 0);
        assert_eq!(single.selections[0].variant, 0);
    }
}
