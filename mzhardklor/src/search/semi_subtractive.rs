use tracing::trace;

use crate::candidate::CandidateSet;
use crate::scorer::ScoreType;

use super::{SearchOutcome, SearchState, SearchStrategy, Selection};

/// Greedy search that commits to the best candidate at each depth.
///
/// Each round scores every unused (candidate, variant) pair on top of the candidates
/// already committed, keeps the overall best, and commits its newest member. The search
/// ends when a round beats the threshold or fails to improve on the previous best. Each
/// candidate is weighted by its seed intensity.
#[derive(Debug, Clone, Copy)]
pub struct SemiSubtractive {
    pub threshold: ScoreType,
}

impl SemiSubtractive {
    pub fn new(threshold: ScoreType) -> Self {
        Self { threshold }
    }
}

impl SearchStrategy for SemiSubtractive {
    fn name(&self) -> &'static str {
        "SemiSubtractive"
    }

    fn search_with_stats(&self, candidates: &CandidateSet, max_depth: usize) -> SearchOutcome {
        let mut state = SearchState::new(candidates);
        let mut committed: Vec<Selection> = Vec::with_capacity(max_depth);
        let mut memory = candidates.empty_sums();

        for depth in 0..max_depth {
            let previous = state.best.score;
            for (k, candidate) in candidates.candidates.iter().enumerate() {
                if committed.iter().any(|s| s.candidate == k) {
                    continue;
                }
                for (v, alignment) in candidate.variants.iter().enumerate() {
                    let score = state.score(&memory.with_added(alignment, candidate.intensity));
                    committed.push(Selection::new(k, v, candidate.intensity));
                    state.offer(&committed, score);
                    committed.pop();
                }
            }
            if state.best.score > self.threshold {
                break;
            }
            if state.best.score <= previous {
                trace!("No improvement at depth {}", depth + 1);
                break;
            }
            let Some(newest) = state.best.selections.last().copied() else {
                break;
            };
            memory.add_scaled(
                candidates.alignment(newest.candidate, newest.variant),
                newest.intensity,
            );
            committed.push(newest);
        }
        state.finish()
    }
}
