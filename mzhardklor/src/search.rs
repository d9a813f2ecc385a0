/*! Combinatorial searches for the mixture of candidate models that best explains an
observed window.

Every strategy walks the space of [`Combination`]s of (candidate, variant) pairs, each
pair weighted by an intensity, and scores the weighted sum of their aligned models
against the observed intensities with [`correlate`](crate::scorer::correlate). They
differ in traversal order, in the weight given to each candidate, and in how they prune.

| Strategy | Order | Weight | Stops early |
|----------|-------|--------|-------------|
| [`Basic`] | depth first, descending | remaining intensity | never |
| [`SemiComplete`] | depth first, ascending | seed intensity | a level beats the threshold |
| [`Dynamic`] | depth first, ascending | seed intensity | branches that do not improve on their parent |
| [`DynamicSemiComplete`] | depth first, ascending | seed intensity | both of the above |
| [`FewestPeptides`] | breadth first, descending | remaining intensity | a level beats the threshold |
| [`FastFewestPeptides`] | breadth first, descending | remaining intensity | as above, and a hopeless first level |
| [`SemiSubtractive`] | greedy | seed intensity | a level beats the threshold or does not improve |

The remaining intensity of a candidate is its seed peak intensity minus what the
combination so far already explains at that peak.
*/
use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

use crate::candidate::CandidateSet;
use crate::scorer::{IntensitySums, ScoreType};

mod basic;
mod dynamic;
mod fast_fewest_peptides;
mod fewest_peptides;
mod semi_complete;
mod semi_subtractive;

pub use basic::Basic;
pub use dynamic::{Dynamic, DynamicSemiComplete};
pub use fast_fewest_peptides::FastFewestPeptides;
pub use fewest_peptides::FewestPeptides;
pub use semi_complete::SemiComplete;
pub use semi_subtractive::SemiSubtractive;

/// One member of a [`Combination`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    pub candidate: usize,
    pub variant: usize,
    /// The intensity the candidate's unit-scaled model was multiplied by
    pub intensity: f64,
}

impl Selection {
    pub fn new(candidate: usize, variant: usize, intensity: f64) -> Self {
        Self {
            candidate,
            variant,
            intensity,
        }
    }
}

/// An ordered set of (candidate, variant) selections and the correlation of their
/// summed contribution with the observed window
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combination {
    pub selections: Vec<Selection>,
    pub score: ScoreType,
}

impl Combination {
    pub fn new(selections: Vec<Selection>, score: ScoreType) -> Self {
        Self { selections, score }
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Selection> {
        self.selections.iter()
    }

    /// The (candidate, variant) pairs of this combination
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.selections.iter().map(|s| (s.candidate, s.variant))
    }

    pub fn contains_candidate(&self, candidate: usize) -> bool {
        self.selections.iter().any(|s| s.candidate == candidate)
    }

    pub fn last_candidate(&self) -> Option<usize> {
        self.selections.last().map(|s| s.candidate)
    }

    /// A copy of this combination with `selection` appended, scored as `score`
    pub fn extended(&self, selection: Selection, score: ScoreType) -> Self {
        let mut selections = Vec::with_capacity(self.selections.len() + 1);
        selections.extend_from_slice(&self.selections);
        selections.push(selection);
        Self { selections, score }
    }

    /// Rebuild the intensity sums of this combination over `set`
    pub fn sums(&self, set: &CandidateSet) -> IntensitySums {
        let mut sums = set.empty_sums();
        for s in self.selections.iter() {
            sums.add_scaled(set.alignment(s.candidate, s.variant), s.intensity);
        }
        sums
    }
}

/// The result of a search and the number of correlations it evaluated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub combination: Combination,
    pub evaluations: usize,
}

/// A traversal of the combination space of a [`CandidateSet`]
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    /// Find the best combination of at most `max_depth` candidates, counting the
    /// correlations evaluated along the way
    fn search_with_stats(&self, candidates: &CandidateSet, max_depth: usize) -> SearchOutcome;

    /// Find the best combination of at most `max_depth` candidates. An empty candidate
    /// set or a depth of zero gives the empty combination with a score of zero.
    fn search(&self, candidates: &CandidateSet, max_depth: usize) -> Combination {
        self.search_with_stats(candidates, max_depth).combination
    }
}

/// Bookkeeping shared by all strategies during one search
pub(crate) struct SearchState<'a> {
    pub set: &'a CandidateSet,
    pub best: Combination,
    pub evaluations: usize,
}

impl<'a> SearchState<'a> {
    pub fn new(set: &'a CandidateSet) -> Self {
        Self {
            set,
            best: Combination::default(),
            evaluations: 0,
        }
    }

    #[inline]
    pub fn score(&mut self, sums: &IntensitySums) -> ScoreType {
        self.evaluations += 1;
        sums.correlate(&self.set.observed)
    }

    /// Record `selections` as the best combination if `score` is strictly better
    #[inline]
    pub fn offer(&mut self, selections: &[Selection], score: ScoreType) -> bool {
        if score > self.best.score {
            self.best = Combination::new(selections.to_vec(), score);
            true
        } else {
            false
        }
    }

    /// The seed intensity of `candidate` not yet explained by `sums`
    #[inline]
    pub fn remaining_intensity(&self, candidate: usize, sums: &IntensitySums) -> f64 {
        let c = &self.set.candidates[candidate];
        c.intensity - sums.matched.get(c.max_peak_index).copied().unwrap_or_default()
    }

    pub fn finish(self) -> SearchOutcome {
        SearchOutcome {
            combination: self.best,
            evaluations: self.evaluations,
        }
    }
}

/// The number of ways to choose `depth` distinct candidates, one variant each, given
/// the number of variants of every candidate.
///
/// This is the elementary symmetric polynomial of degree `depth` over
/// `variant_counts`, saturating instead of overflowing.
pub fn expansion_width(variant_counts: &[usize], depth: usize) -> usize {
    let mut terms = vec![0usize; depth + 1];
    terms[0] = 1;
    for count in variant_counts.iter().copied() {
        for k in (1..=depth).rev() {
            terms[k] = terms[k].saturating_add(terms[k - 1].saturating_mul(count));
        }
    }
    terms[depth]
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown search algorithm {0:?}")]
pub struct UnknownSearchAlgorithm(pub String);

/// The selectable search strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchAlgorithm {
    Basic,
    SemiComplete,
    SemiCompleteFast,
    Dynamic,
    DynamicSemiComplete,
    FewestPeptides,
    FewestPeptidesChoice,
    #[default]
    FastFewestPeptides,
    FastFewestPeptidesChoice,
    SemiSubtractive,
}

impl SearchAlgorithm {
    pub const ALL: [SearchAlgorithm; 10] = [
        SearchAlgorithm::Basic,
        SearchAlgorithm::SemiComplete,
        SearchAlgorithm::SemiCompleteFast,
        SearchAlgorithm::Dynamic,
        SearchAlgorithm::DynamicSemiComplete,
        SearchAlgorithm::FewestPeptides,
        SearchAlgorithm::FewestPeptidesChoice,
        SearchAlgorithm::FastFewestPeptides,
        SearchAlgorithm::FastFewestPeptidesChoice,
        SearchAlgorithm::SemiSubtractive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SearchAlgorithm::Basic => "Basic",
            SearchAlgorithm::SemiComplete => "SemiComplete",
            SearchAlgorithm::SemiCompleteFast => "SemiCompleteFast",
            SearchAlgorithm::Dynamic => "Dynamic",
            SearchAlgorithm::DynamicSemiComplete => "DynamicSemiComplete",
            SearchAlgorithm::FewestPeptides => "FewestPeptides",
            SearchAlgorithm::FewestPeptidesChoice => "FewestPeptidesChoice",
            SearchAlgorithm::FastFewestPeptides => "FastFewestPeptides",
            SearchAlgorithm::FastFewestPeptidesChoice => "FastFewestPeptidesChoice",
            SearchAlgorithm::SemiSubtractive => "SemiSubtractive",
        }
    }

    /// Create the strategy, accepting combinations scoring above `threshold`
    pub fn strategy(&self, threshold: ScoreType) -> Box<dyn SearchStrategy> {
        match self {
            SearchAlgorithm::Basic => Box::new(Basic::new()),
            SearchAlgorithm::SemiComplete => Box::new(SemiComplete::new(threshold)),
            SearchAlgorithm::SemiCompleteFast => Box::new(SemiComplete::fast(threshold)),
            SearchAlgorithm::Dynamic => Box::new(Dynamic::new()),
            SearchAlgorithm::DynamicSemiComplete => Box::new(DynamicSemiComplete::new(threshold)),
            SearchAlgorithm::FewestPeptides => Box::new(FewestPeptides::new(threshold)),
            SearchAlgorithm::FewestPeptidesChoice => Box::new(FewestPeptides::choice(threshold)),
            SearchAlgorithm::FastFewestPeptides => Box::new(FastFewestPeptides::new(threshold)),
            SearchAlgorithm::FastFewestPeptidesChoice => {
                Box::new(FastFewestPeptides::choice(threshold))
            }
            SearchAlgorithm::SemiSubtractive => Box::new(SemiSubtractive::new(threshold)),
        }
    }
}

impl Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchAlgorithm {
    type Err = UnknownSearchAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.replace(['-', '_'], "");
        Self::ALL
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(&key))
            .copied()
            .ok_or_else(|| UnknownSearchAlgorithm(s.to_string()))
    }
}
