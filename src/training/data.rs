//! Synthetic clipped-addition data.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::errors::TrainingError;

/// One training example: the inputs and their clipped sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub inputs: Vec<f32>,
    pub label: f32,
}

impl Sample {
    /// Labels `inputs` with their clipped sum.
    pub fn new(inputs: Vec<f32>) -> Self {
        let label = clipped_sum(&inputs);
        Self { inputs, label }
    }
}

/// Sum of `inputs`, clamped to `[-1, 1]`.
pub fn clipped_sum(inputs: &[f32]) -> f32 {
    inputs.iter().sum::<f32>().clamp(-1.0, 1.0)
}

/// Draws `count` samples of `width` inputs uniformly from `[low, high)`.
pub fn generate(
    count: usize,
    width: usize,
    (low, high): (f32, f32),
    seed: Option<u64>,
) -> Result<Vec<Sample>, TrainingError> {
    if !(low < high && low.is_finite() && high.is_finite()) {
        return Err(TrainingError::InvalidRange { low, high });
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    Ok((0..count)
        .map(|_| Sample::new((0..width).map(|_| rng.gen_range(low..high)).collect()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipped_sum() {
        assert!((clipped_sum(&[0.5, -0.6, 0.2]) - 0.1).abs() < 1e-6);
        assert_eq!(clipped_sum(&[0.9, 0.9, 0.9]), 1.0);
        assert_eq!(clipped_sum(&[-0.9, -0.9, 0.1]), -1.0);
        assert_eq!(clipped_sum(&[]), 0.0);
    }

    #[test]
    fn test_generate_respects_range_and_width() {
        let samples = generate(200, 3, (-1.0, 1.0), Some(5)).unwrap();
        assert_eq!(samples.len(), 200);
        for sample in &samples {
            assert_eq!(sample.inputs.len(), 3);
            assert!(sample.inputs.iter().all(|v| (-1.0..1.0).contains(v)));
            assert_eq!(sample.label, clipped_sum(&sample.inputs));
        }
    }

    #[test]
    fn test_generate_is_deterministic_with_seed() {
        let a = generate(10, 3, (0.0, 1.0), Some(11)).unwrap();
        let b = generate(10, 3, (0.0, 1.0), Some(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_rejects_empty_range() {
        assert!(matches!(
            generate(1, 3, (1.0, 1.0), None),
            Err(TrainingError::InvalidRange { .. })
        ));
    }
}
