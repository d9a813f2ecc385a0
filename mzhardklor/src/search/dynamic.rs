use crate::candidate::CandidateSet;
use crate::scorer::{IntensitySums, ScoreType};

use super::{SearchOutcome, SearchState, SearchStrategy, Selection};

/// Depth-first search that only extends combinations which improved on their parent.
///
/// Each candidate is weighted by its seed intensity. There is no score threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dynamic {}

impl Dynamic {
    pub fn new() -> Self {
        Self {}
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
        for k in start..set.len() {
            let candidate = &set.candidates[k];
            for (v, alignment) in candidate.variants.iter().enumerate() {
                let next = sums.with_added(alignment, candidate.intensity);
                let score = state.score(&next);
                path.push(Selection::new(k, v, candidate.intensity));
                state.offer(path, score);
                if depth < max_depth && score > parent_score {
                    self.descend(state, &next, path, k + 1, depth + 1, max_depth, score);
                }
                path.pop();
            }
        }
    }
}

impl SearchStrategy for Dynamic {
    fn name(&self) -> &'static str {
        "Dynamic"
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

/// [`Dynamic`] combined with the level threshold of
/// [`SemiComplete`](super::SemiComplete).
///
/// Every pair at a node is scored first. The node is not expanded when the best of them
/// beats the threshold, and otherwise only the pairs that improved on the node are.
#[derive(Debug, Clone, Copy)]
pub struct DynamicSemiComplete {
    pub threshold: ScoreType,
}

impl DynamicSemiComplete {
    pub fn new(threshold: ScoreType) -> Self {
        Self { threshold }
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
        let mut improved: Vec<(Selection, ScoreType, IntensitySums)> = Vec::new();
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
                if score > parent_score {
                    improved.push((selection, score, next));
                }
            }
        }

        if level_best > self.threshold || depth >= max_depth {
            return;
        }
        for (selection, score, next) in improved {
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

impl SearchStrategy for DynamicSemiComplete {
    fn name(&self) -> &'static str {
        "DynamicSemiComplete"
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
