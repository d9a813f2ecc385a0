//! Correlation scoring of summed theoretical contributions against an observed window
use crate::candidate::VariantAlignment;

pub type ScoreType = f64;

/// The cosine similarity between the observed intensities and a theoretical
/// contribution.
///
/// ```math
/// \frac{\sum_i o_i t_i}{\sqrt{(\sum_i o_i^2)(\sum_i t_i^2 + \sum_j m_j^2)}}
/// ```
///
/// where $`o_i`$ is the intensity of the ith observed peak, $`t_i`$ is the theoretical
/// intensity matched to it, and $`m_j`$ is the jth positive theoretical intensity with no
/// observed counterpart, which pairs with an observed intensity of zero.
///
/// Returns zero when either vector has no magnitude or the numerator is not positive.
pub fn correlate(observed: &[f64], matched: &[f64], mismatched: &[f64]) -> ScoreType {
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (o, t) in observed.iter().zip(matched.iter()) {
        sxy += o * t;
        sxx += o * o;
        syy += t * t;
    }
    for m in mismatched.iter().filter(|m| **m > 0.0) {
        syy += m * m;
    }
    if sxy > 0.0 && sxx > 0.0 && syy > 0.0 {
        sxy / (sxx * syy).sqrt()
    } else {
        0.0
    }
}

/// Running sums of scaled theoretical contributions over the observed peaks and the
/// shared mismatch axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntensitySums {
    pub matched: Vec<f64>,
    pub mismatched: Vec<f64>,
}

impl IntensitySums {
    pub fn zeros(n_observed: usize, n_mismatch: usize) -> Self {
        Self {
            matched: vec![0.0; n_observed],
            mismatched: vec![0.0; n_mismatch],
        }
    }

    /// Add `weight` times `alignment` in place
    pub fn add_scaled(&mut self, alignment: &VariantAlignment, weight: f64) {
        self.matched
            .iter_mut()
            .zip(alignment.matched.iter())
            .for_each(|(acc, t)| *acc += t * weight);
        self.mismatched
            .iter_mut()
            .zip(alignment.mismatched.iter())
            .for_each(|(acc, t)| *acc += t * weight);
    }

    /// A copy of these sums with `weight` times `alignment` added
    pub fn with_added(&self, alignment: &VariantAlignment, weight: f64) -> Self {
        let mut dup = self.clone();
        dup.add_scaled(alignment, weight);
        dup
    }

    /// Overwrite these sums with `base` plus `weight` times `alignment`, reusing the
    /// existing buffers
    pub fn assign_added(&mut self, base: &IntensitySums, alignment: &VariantAlignment, weight: f64) {
        self.matched.clear();
        self.matched.extend_from_slice(&base.matched);
        self.mismatched.clear();
        self.mismatched.extend_from_slice(&base.mismatched);
        self.add_scaled(alignment, weight);
    }

    pub fn correlate(&self, observed: &[f64]) -> ScoreType {
        correlate(observed, &self.matched, &self.mismatched)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
    }

    #[test]
    fn test_correlate() {
        let observed = [100.0, 50.0, 10.0];
        assert_is_close!(correlate(&observed, &[1.0, 0.5, 0.1], &[]), 1.0, 1e-12, "score");
        assert_is_close!(correlate(&observed, &[2.0, 1.0, 0.2], &[0.0, 0.0]), 1.0, 1e-12, "score");

        let with_mismatch = correlate(&observed, &[1.0, 0.5, 0.1], &[0.5]);
        let expected = (100.0 + 25.0 + 1.0) / ((100.0f64.powi(2) + 2500.0 + 100.0) * 1.51f64).sqrt();
        assert_is_close!(with_mismatch, expected, 1e-12, "score");

        // Negative mismatches are ignored
        assert_is_close!(correlate(&observed, &[1.0, 0.5, 0.1], &[-5.0]), 1.0, 1e-12, "score");
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(correlate(&[], &[], &[]), 0.0);
        assert_eq!(correlate(&[0.0, 0.0], &[1.0, 1.0], &[]), 0.0);
        assert_eq!(correlate(&[1.0, 1.0], &[0.0, 0.0], &[]), 0.0);
        assert_eq!(correlate(&[1.0, 0.0], &[0.0, 1.0], &[]), 0.0);
        assert_eq!(correlate(&[1.0, 1.0], &[-1.0, -1.0], &[]), 0.0);
    }

    #[test]
    fn test_sums() {
        let alignment = VariantAlignment {
            variant: 0,
            matched: vec![1.0, 0.5],
            mismatched: vec![0.0, 0.25],
            ..Default::default()
        };
        let mut sums = IntensitySums::zeros(2, 2);
        sums.add_scaled(&alignment, 10.0);
        assert_eq!(sums.matched, vec![10.0, 5.0]);
        assert_eq!(sums.mismatched, vec![0.0, 2.5]);
        let more = sums.with_added(&alignment, 2.0);
        assert_eq!(more.matched, vec![12.0, 6.0]);
        assert_eq!(sums.matched, vec![10.0, 5.0]);

        let mut scratch = IntensitySums::default();
        scratch.assign_added(&sums, &alignment, 1.0);
        assert_eq!(scratch.matched, vec![11.0, 5.5]);
        assert_eq!(scratch.mismatched, vec![0.0, 2.75]);
        let expected = 1512.5 / (15125.0f64 * (121.0 + 30.25 + 7.5625)).sqrt();
        assert_is_close!(scratch.correlate(&[110.0, 55.0]), expected, 1e-12, "score");
    }
}
