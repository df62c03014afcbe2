//! Discrete probability distributions sampled by CDF inversion.

use rand::Rng;

use crate::error::{Result, TransportError};

/// Tabulated discrete distribution over `(value, weight)` pairs.
///
/// Weights are normalized to a CDF at construction; sampling is one uniform
/// draw and a binary search, cheap enough for per-history use.
#[derive(Debug, Clone)]
pub struct DiscreteInversion {
    values: Vec<f64>,
    cdf: Vec<f64>,
}

impl DiscreteInversion {
    pub fn new(values: Vec<f64>, weights: Vec<f64>) -> Result<Self> {
        if values.is_empty() || values.len() != weights.len() {
            return Err(TransportError::Configuration(format!(
                "discrete distribution needs matching non-empty arrays, got {} values and {} weights",
                values.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|&w| w < 0.0 || !w.is_finite()) {
            return Err(TransportError::Configuration(
                "discrete distribution weights must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(TransportError::SamplingDegeneracy(
                "discrete distribution weights sum to zero".to_string(),
            ));
        }
        let mut cdf = Vec::with_capacity(weights.len());
        let mut acc = 0.0;
        for &w in &weights {
            acc += w / total;
            cdf.push(acc);
        }
        // force the last bin to close the unit interval despite rounding
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }
        Ok(Self { values, cdf })
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        let u: f64 = rng.gen();
        let idx = self.cdf.partition_point(|&c| c <= u);
        self.values[idx.min(self.values.len() - 1)]
    }

    /// Smallest and largest values with non-zero probability.
    pub fn support(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut prev = 0.0;
        for (&v, &c) in self.values.iter().zip(self.cdf.iter()) {
            if c > prev {
                min = min.min(v);
                max = max.max(v);
            }
            prev = c;
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::HistoryRng;

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(DiscreteInversion::new(vec![], vec![]).is_err());
        assert!(DiscreteInversion::new(vec![1.0], vec![1.0, 2.0]).is_err());
        assert!(DiscreteInversion::new(vec![1.0, 2.0], vec![0.0, 0.0]).is_err());
        assert!(DiscreteInversion::new(vec![1.0, 2.0], vec![1.0, -1.0]).is_err());
    }

    #[test]
    fn test_single_value_always_sampled() {
        let dist = DiscreteInversion::new(vec![3e4], vec![1.0]).unwrap();
        let mut rng = HistoryRng::new(1);
        for _ in 0..50 {
            assert_eq!(dist.sample(&mut rng), 3e4);
        }
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let dist = DiscreteInversion::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 1.0]).unwrap();
        let mut rng = HistoryRng::new(42);
        let mut counts = [0usize; 3];
        let n = 40_000;
        for _ in 0..n {
            let v = dist.sample(&mut rng);
            counts[v as usize - 1] += 1;
        }
        let f1 = counts[1] as f64 / n as f64;
        assert!((f1 - 0.5).abs() < 0.02, "middle value frequency {f1}");
        assert!(counts[0] > 0 && counts[2] > 0);
    }

    #[test]
    fn test_support_skips_zero_weight_values() {
        let dist =
            DiscreteInversion::new(vec![1.0, 5.0, 9.0], vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(dist.support(), (5.0, 9.0));
    }
}
