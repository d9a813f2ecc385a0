use tracing::trace;

use crate::candidate::CandidateSet;
use crate::scorer::ScoreType;

use super::{Combination, SearchOutcome, SearchState, SearchStrategy, Selection};

/// Breadth-first search that prefers explanations with fewer candidates.
///
/// Every combination of `n` candidates is scored before any combination of `n + 1`, and
/// the search ends after the first level whose best score beats the threshold. Each
/// level rebuilds the intensity sums of the combinations it expands from their members.
///
/// The choice form only expands combinations that scored above half the threshold.
#[derive(Debug, Clone, Copy)]
pub struct FewestPeptides {
    pub threshold: ScoreType,
    prune_weak: bool,
}

impl FewestPeptides {
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

impl SearchStrategy for FewestPeptides {
    fn name(&self) -> &'static str {
        if self.prune_weak {
            "FewestPeptidesChoice"
        } else {
            "FewestPeptides"
        }
    }

    fn search_with_stats(&self, candidates: &CandidateSet, max_depth: usize) -> SearchOutcome {
        let mut state = SearchState::new(candidates);
        let n = candidates.len();
        let mut frontier = vec![Combination::default()];
        let mut depth = 0;
        while depth < max_depth && depth < n && !frontier.is_empty() {
            let expand_next = depth + 1 < max_depth;
            let mut next_frontier = Vec::new();
            for parent in frontier.iter() {
                let prior = parent.sums(candidates);
                let end = parent.last_candidate().unwrap_or(n);
                for j in (0..end).rev() {
                    let intensity = state.remaining_intensity(j, &prior);
                    if intensity < 0.0 {
                        continue;
                    }
                    for (v, alignment) in candidates.candidates[j].variants.iter().enumerate() {
                        let score = state.score(&prior.with_added(alignment, intensity));
                        let child = parent.extended(Selection::new(j, v, intensity), score);
                        state.offer(&child.selections, score);
                        let keep = !self.prune_weak || score > self.threshold / 2.0;
                        if expand_next && keep {
                            next_frontier.push(child);
                        }
                    }
                }
            }
            depth += 1;
            trace!(
                "Level {depth} best {:.4}, {} combinations to expand",
                state.best.score,
                next_frontier.len()
            );
            if state.best.score > self.threshold {
                break;
            }
            frontier = next_frontier;
        }
        state.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::search::{test::mixture, Basic};

    #[test]
    fn test_stops_at_first_good_level() {
        let set = mixture();
        let outcome = FewestPeptides::new(0.8).search_with_stats(&set, 3);
        assert_eq!(outcome.evaluations, 6);
        assert_eq!(outcome.combination.len(), 1);

        let outcome = FewestPeptides::new(0.95).search_with_stats(&set, 3);
        assert_eq!(outcome.combination.score, 1.0);
        assert_eq!(outcome.combination.len(), 2);
    }

    #[test]
    fn test_matches_basic_when_exhaustive() {
        let set = mixture();
        for depth in 1..=3 {
            let bfs = FewestPeptides::new(1.5).search_with_stats(&set, depth);
            let dfs = Basic::new().search_with_stats(&set, depth);
            assert_eq!(bfs.evaluations, dfs.evaluations);
            assert_eq!(bfs.combination.score, dfs.combination.score);
        }
    }

    #[test]
    fn test_choice_prunes() {
        let set = mixture();
        let full = FewestPeptides::new(1.5).search_with_stats(&set, 3);
        let choice = FewestPeptides::choice(1.5).search_with_stats(&set, 3);
        assert!(choice.evaluations < full.evaluations);
        assert!(FewestPeptides::choice(1.5).is_choice());

        let choice = FewestPeptides::choice(0.95).search_with_stats(&set, 3);
        assert_eq!(choice.combination.score, 1.0);
    }
}
