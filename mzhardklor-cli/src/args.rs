use std::fmt::Display;
use std::num::ParseIntError;
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;

use mzhardklor::averagine::AveragineModel;
use mzhardklor::charge::{ChargeRange, ChargeStrategy};
use mzhardklor::search::SearchAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArgSearchAlgorithm {
    /// Exhaustive depth-first enumeration
    Basic,
    /// Depth-first, stopping below any level that beats the threshold
    SemiComplete,
    /// SemiComplete reusing the sums computed while scoring each level
    SemiCompleteFast,
    /// Depth-first, only extending combinations that improved on their parent
    Dynamic,
    /// Dynamic with the SemiComplete level threshold
    DynamicSemiComplete,
    /// Breadth-first, preferring fewer features
    FewestPeptides,
    /// FewestPeptides expanding only combinations above half the threshold
    FewestPeptidesChoice,
    /// FewestPeptides carrying sums between levels
    FastFewestPeptides,
    /// FastFewestPeptides expanding only combinations above half the threshold
    FastFewestPeptidesChoice,
    /// Greedy, committing to the best feature at each depth
    SemiSubtractive,
}

impl From<ArgSearchAlgorithm> for SearchAlgorithm {
    fn from(value: ArgSearchAlgorithm) -> Self {
        match value {
            ArgSearchAlgorithm::Basic => SearchAlgorithm::Basic,
            ArgSearchAlgorithm::SemiComplete => SearchAlgorithm::SemiComplete,
            ArgSearchAlgorithm::SemiCompleteFast => SearchAlgorithm::SemiCompleteFast,
            ArgSearchAlgorithm::Dynamic => SearchAlgorithm::Dynamic,
            ArgSearchAlgorithm::DynamicSemiComplete => SearchAlgorithm::DynamicSemiComplete,
            ArgSearchAlgorithm::FewestPeptides => SearchAlgorithm::FewestPeptides,
            ArgSearchAlgorithm::FewestPeptidesChoice => SearchAlgorithm::FewestPeptidesChoice,
            ArgSearchAlgorithm::FastFewestPeptides => SearchAlgorithm::FastFewestPeptides,
            ArgSearchAlgorithm::FastFewestPeptidesChoice => {
                SearchAlgorithm::FastFewestPeptidesChoice
            }
            ArgSearchAlgorithm::SemiSubtractive => SearchAlgorithm::SemiSubtractive,
        }
    }
}

impl Display for ArgSearchAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ArgAveragineModel {
    Peptide,
    Glycan,
    Glycopeptide,
    PermethylatedGlycan,
    Heparin,
    HeparanSulfate,
}

impl From<ArgAveragineModel> for AveragineModel {
    fn from(value: ArgAveragineModel) -> Self {
        match value {
            ArgAveragineModel::Peptide => AveragineModel::Peptide,
            ArgAveragineModel::Glycan => AveragineModel::Glycan,
            ArgAveragineModel::Glycopeptide => AveragineModel::Glycopeptide,
            ArgAveragineModel::PermethylatedGlycan => AveragineModel::PermethylatedGlycan,
            ArgAveragineModel::Heparin => AveragineModel::Heparin,
            ArgAveragineModel::HeparanSulfate => AveragineModel::HeparanSulfate,
        }
    }
}

impl Display for ArgAveragineModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ArgChargeStrategy {
    /// Try every charge in the charge range
    ChargeRange,
    /// Try only the charges implied by neighboring peak spacing
    QuickCharge,
}

impl From<ArgChargeStrategy> for ChargeStrategy {
    fn from(value: ArgChargeStrategy) -> Self {
        match value {
            ArgChargeStrategy::ChargeRange => ChargeStrategy::ChargeRange,
            ArgChargeStrategy::QuickCharge => ChargeStrategy::QuickCharge,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChargeRangeParserError {
    #[error("Charge range cannot be empty")]
    EmptyRange,
    #[error("Failed to parse charge range start {0}")]
    InvalidStart(ParseIntError),
    #[error("Failed to parse charge range end {0}")]
    InvalidEnd(ParseIntError),
    #[error("Charge range must be positive, got {0}-{1}")]
    NotPositive(i32, i32),
}

/// A charge range denoted `(low)-(high)` or `(high)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgChargeRange(pub i32, pub i32);

impl FromStr for ArgChargeRange {
    type Err = ChargeRangeParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ChargeRangeParserError::EmptyRange);
        }
        let (low, high) = if let Some((start, end)) = s.split_once('-') {
            let low = start
                .trim()
                .parse::<i32>()
                .map_err(ChargeRangeParserError::InvalidStart)?;
            let high = end
                .trim()
                .parse::<i32>()
                .map_err(ChargeRangeParserError::InvalidEnd)?;
            (low, high)
        } else {
            let high = s.parse::<i32>().map_err(ChargeRangeParserError::InvalidEnd)?;
            (1, high)
        };
        if low < 1 || high < low {
            return Err(ChargeRangeParserError::NotPositive(low, high));
        }
        Ok(Self(low, high))
    }
}

impl Display for ArgChargeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

impl From<ArgChargeRange> for ChargeRange {
    fn from(value: ArgChargeRange) -> Self {
        (value.0, value.1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_charge_range() {
        assert_eq!("1-5".parse::<ArgChargeRange>(), Ok(ArgChargeRange(1, 5)));
        assert_eq!("4".parse::<ArgChargeRange>(), Ok(ArgChargeRange(1, 4)));
        assert_eq!(" 2 - 3 ".parse::<ArgChargeRange>(), Ok(ArgChargeRange(2, 3)));
        assert_eq!(
            "".parse::<ArgChargeRange>(),
            Err(ChargeRangeParserError::EmptyRange)
        );
        assert!(matches!(
            "a-3".parse::<ArgChargeRange>(),
            Err(ChargeRangeParserError::InvalidStart(_))
        ));
        assert_eq!(
            "3-1".parse::<ArgChargeRange>(),
            Err(ChargeRangeParserError::NotPositive(3, 1))
        );
        assert_eq!(ArgChargeRange(2, 6).to_string(), "2-6");
    }

    #[test]
    fn test_algorithm_names() {
        for arg in ArgSearchAlgorithm::value_variants() {
            let algorithm: SearchAlgorithm = (*arg).into();
            assert_eq!(arg.to_string(), algorithm.name());
        }
    }
}
