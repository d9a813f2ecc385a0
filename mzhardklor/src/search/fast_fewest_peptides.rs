use std::mem;

use tracing::trace;

use crate::candidate::CandidateSet;
use crate::scorer::{IntensitySums, ScoreType};

use super::{expansion_width, Combination, SearchOutcome, SearchState, SearchStrategy, Selection};

/// Below this best score after the first level, the window is considered unexplainable
const HOPELESS_SCORE: ScoreType = 0.05;

/// Upper bound on the nodes reserved up front for one level
const MAX_RESERVED_NODES: usize = 1 << 16;

#[derive(Debug, Clone)]
struct Node {
    combination: Combination,
    sums: IntensitySums,
}

/// Breadth-first search like [`FewestPeptides`](super::FewestPeptides) that carries the
/// intensity sums of each combination to the next level instead of rebuilding them.
///
/// Levels alternate between two node buffers whose allocations are reused, and the
/// last level is scored in a scratch buffer without storing anything. Candidates with
/// no unexplained intensity left are not added. If the best single candidate scores
/// below 0.05 the search gives up after the first level.
///
/// The choice form only expands combinations that scored above half the threshold and
/// never gives up early.
#[derive(Debug, Clone, Copy)]
pub struct FastFewestPeptides {
    pub threshold: ScoreType,
    prune_weak: bool,
}

impl FastFewestPeptides {
    pub fn new(threshold: ScoreType) -> Self {
        Self {
            threshold,
            prune_weak: false,
        }
    }

    pub fn choice(threshold: ScoreType) -> Self {
        Self {
            threshold,
            prune_weak: true,
        }
    }

    pub fn is_choice(&self) -> bool {
        self.prune_weak
    }
}

impl SearchStrategy for FastFewestPeptides {
    fn name(&self) -> &'static str {
        if self.prune_weak {
            "FastFewestPeptidesChoice"
        } else {
            "FastFewestPeptides"
        }
    }

    fn search_with_stats(&self, candidates: &CandidateSet, max_depth: usize) -> SearchOutcome {
        let mut state = SearchState::new(candidates);
        let n = candidates.len();
        if max_depth == 0 || n == 0 {
            return state.finish();
        }
        let counts = candidates.variant_counts();

        let mut current = vec![Node {
            combination: Combination::default(),
            sums: candidates.empty_sums(),
        }];
        let mut current_len = 1;
        let mut next: Vec<Node> = Vec::new();
        let mut scratch = candidates.empty_sums();

        let mut depth = 0;
        while depth < max_depth && depth < n && current_len > 0 {
            let store = depth + 1 < max_depth;
            let mut next_len = 0;
            if store {
                let width = expansion_width(&counts, depth + 1).min(MAX_RESERVED_NODES);
                next.reserve(width.saturating_sub(next.len()));
            }
            for parent in current[..current_len].iter() {
                let end = parent.combination.last_candidate().unwrap_or(n);
                for j in (0..end).rev() {
                    let intensity = state.remaining_intensity(j, &parent.sums);
                    // Zero intensity is skipped here but kept by the exhaustive variant
                    if intensity <= 0.0 {
                        continue;
                    }
                    for (v, alignment) in candidates.candidates[j].variants.iter().enumerate() {
                        scratch.assign_added(&parent.sums, alignment, intensity);
                        let score = state.score(&scratch);
                        let child = parent
                            .combination
                            .extended(Selection::new(j, v, intensity), score);
                        state.offer(&child.selections, score);
                        if !store || (self.prune_weak && score <= self.threshold / 2.0) {
                            continue;
                        }
                        if let Some(slot) = next.get_mut(next_len) {
                            slot.sums.clone_from(&scratch);
                            slot.combination = child;
                        } else {
                            next.push(Node {
                                combination: child,
                                sums: scratch.clone(),
                            });
                        }
                        next_len += 1;
                    }
                }
            }
            depth += 1;
            trace!(
                "Level {depth} best {:.4}, {next_len} combinations to expand",
                state.best.score
            );
            if state.best.score > self.threshold {
                break;
            }
            if !self.prune_weak && depth == 1 && state.best.score < HOPELESS_SCORE {
                trace!("Best single candidate scored {:.4}, giving up", state.best.score);
                break;
            }
            mem::swap(&mut current, &mut next);
            current_len = next_len;
        }
        state.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::candidate::{CandidateFeature, VariantAlignment};
    use crate::search::{test::mixture, FewestPeptides};

    #[test]
    fn test_matches_fewest_peptides() {
        let set = mixture();
        for threshold in [0.8, 0.95, 1.5] {
            for depth in 1..=3 {
                let fast = FastFewestPeptides::new(threshold).search_with_stats(&set, depth);
                let slow = FewestPeptides::new(threshold).search_with_stats(&set, depth);
                assert_eq!(fast.combination.score, slow.combination.score);
                assert_eq!(fast.combination.len(), slow.combination.len());
                assert!(fast.evaluations <= slow.evaluations);

                let fast = FastFewestPeptides::choice(threshold).search_with_stats(&set, depth);
                let slow = FewestPeptides::choice(threshold).search_with_stats(&set, depth);
                assert_eq!(fast.combination.score, slow.combination.score);
            }
        }
    }

    #[test]
    fn test_gives_up_on_noise() {
        // Candidates that predict almost none of the intensity they were seeded on
        let noise = CandidateSet::new(
            vec![300.0, 300.5, 301.0],
            vec![100.0, 100.0, 100.0],
            1,
            vec![
                CandidateFeature::new(
                    300.0,
                    2,
                    100.0,
                    0,
                    vec![VariantAlignment::new(0, vec![0.01, 0.0, 0.0], vec![1.0])],
                ),
                CandidateFeature::new(
                    300.5,
                    2,
                    100.0,
                    1,
                    vec![VariantAlignment::new(0, vec![0.0, 0.01, 0.0], vec![1.0])],
                ),
            ],
        );
        let outcome = FastFewestPeptides::new(0.95).search_with_stats(&noise, 3);
        assert_eq!(outcome.evaluations, 2);
        assert!(outcome.combination.score < HOPELESS_SCORE);

        let outcome = FastFewestPeptides::choice(0.01).search_with_stats(&noise, 3);
        assert_eq!(outcome.evaluations, 3);
    }

    #[test]
    fn test_buffers_are_reused() {
        let set = mixture();
        let first = FastFewestPeptides::new(1.5).search_with_stats(&set, 3);
        let second = FastFewestPeptides::new(1.5).search_with_stats(&set, 3);
        assert_eq!(first, second);
        assert_eq!(first.combination.score, 1.0);
        assert!(FastFewestPeptides::choice(1.5).is_choice());
    }
}
