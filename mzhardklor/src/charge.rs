//! Charge state enumeration for seeding candidate features
use mzpeaks::prelude::*;
use std::cmp;

/// An inclusive `(min, max)` range of charge states
pub type ChargeRange = (i32, i32);

#[derive(Debug, Clone)]
pub struct ChargeRangeIter {
    pub min: i32,
    pub max: i32,
    pub sign: i32,
    index: usize,
    size: usize,
}

impl ChargeRangeIter {
    pub fn new(min: i32, max: i32) -> ChargeRangeIter {
        let low = cmp::min(min.abs(), max.abs());
        let high = cmp::max(min.abs(), max.abs());
        let sign = if min < 0 || max < 0 { -1 } else { 1 };
        let size = (high - low + 1) as usize;
        ChargeRangeIter {
            min: low,
            max: high,
            sign,
            index: 0,
            size,
        }
    }
}

impl Iterator for ChargeRangeIter {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.index >= self.size {
            None
        } else {
            let z = (self.min + self.index as i32) * self.sign;
            self.index += 1;
            Some(z)
        }
    }
}

impl From<ChargeRange> for ChargeRangeIter {
    fn from(pair: ChargeRange) -> ChargeRangeIter {
        ChargeRangeIter::new(pair.0, pair.1)
    }
}

/// Guess the charge states of the peak at `position` from the spacing of the peaks
/// that follow it.
///
/// Every later peak within 1.1 m/z with at least a quarter of the intensity implies a
/// charge of `1 / spacing`. Spacings that fall too far between two integer charges are
/// ignored. The implied charges within `charge_range` are returned in ascending order.
pub fn quick_charge<C: CentroidLike>(
    peaks: &[C],
    position: usize,
    charge_range: ChargeRange,
) -> Vec<i32> {
    let (min_charge, max_charge) = charge_range;
    if max_charge < 1 || position >= peaks.len() {
        return Vec::new();
    }
    let mut charges = vec![false; max_charge as usize];
    let peak = &peaks[position];
    let min_intensity = peak.intensity() / 4.0;
    for other in peaks.iter().skip(position + 1) {
        if other.intensity() < min_intensity {
            continue;
        }
        let diff = other.mz() - peak.mz();
        if diff > 1.1 {
            break;
        }
        if diff <= 0.0 {
            continue;
        }
        let raw_charge = 1.0 / diff;
        let charge = (raw_charge + 0.5) as i32;
        let remain = raw_charge - raw_charge.floor();
        if 0.2 < remain && remain < 0.8 {
            continue;
        }
        if charge < min_charge || charge > max_charge {
            continue;
        }
        charges[(charge - 1) as usize] = true;
    }

    charges
        .iter()
        .enumerate()
        .filter(|(_, hit)| **hit)
        .map(|(j, _)| (j + 1) as i32)
        .collect()
}

/// How to pick the charge states to try for a peak
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChargeStrategy {
    /// Every charge in the configured range
    ChargeRange,
    /// Only the charges implied by the spacing of neighboring peaks
    #[default]
    QuickCharge,
}

impl ChargeStrategy {
    pub fn for_peak<C: CentroidLike>(
        &self,
        peaks: &[C],
        position: usize,
        charge_range: ChargeRange,
    ) -> Vec<i32> {
        match self {
            ChargeStrategy::ChargeRange => ChargeRangeIter::from(charge_range).collect(),
            ChargeStrategy::QuickCharge => quick_charge(peaks, position, charge_range),
        }
    }
}

#[cfg(test)]
mod test {
    use mzpeaks::CentroidPeak;

    use super::*;

    fn envelope(mono_mz: f64, charge: i32, intensities: &[f32]) -> Vec<CentroidPeak> {
        intensities
            .iter()
            .enumerate()
            .map(|(i, inten)| {
                CentroidPeak::new(mono_mz + i as f64 * 1.00235 / charge as f64, *inten, i as u32)
            })
            .collect()
    }

    #[test]
    fn test_charge_range() {
        let charges: Vec<_> = ChargeRangeIter::new(1, 5).collect();
        assert_eq!(charges, vec![1, 2, 3, 4, 5]);
        let charges: Vec<_> = ChargeRangeIter::new(-1, -3).collect();
        assert_eq!(charges, vec![-1, -2, -3]);
        let charges: Vec<_> = ChargeRangeIter::from((2, 2)).collect();
        assert_eq!(charges, vec![2]);
    }

    #[test]
    fn test_quick_charge() {
        let peaks = envelope(500.0, 2, &[100.0, 80.0, 40.0]);
        assert_eq!(quick_charge(&peaks, 0, (1, 5)), vec![1, 2]);
        assert_eq!(quick_charge(&peaks, 0, (2, 5)), vec![2]);

        let peaks = envelope(800.0, 3, &[100.0, 90.0, 50.0, 20.0]);
        assert_eq!(quick_charge(&peaks, 0, (1, 5)), vec![3]);
        assert_eq!(quick_charge(&peaks, 3, (1, 5)), Vec::<i32>::new());

        // Too weak to count
        let peaks = envelope(500.0, 2, &[100.0, 10.0]);
        assert_eq!(quick_charge(&peaks, 0, (1, 5)), Vec::<i32>::new());
    }

    #[test]
    fn test_strategy() {
        let peaks = envelope(500.0, 2, &[100.0, 80.0]);
        assert_eq!(
            ChargeStrategy::ChargeRange.for_peak(&peaks, 0, (1, 3)),
            vec![1, 2, 3]
        );
        assert_eq!(ChargeStrategy::QuickCharge.for_peak(&peaks, 0, (1, 3)), vec![2]);
    }
}
