//! Training configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of samples to train on, one solver step each.
    pub iterations: usize,
    /// Log the running loss every this many iterations.
    pub log_every: usize,
    /// Seed for the synthetic data. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Half-open range `[low, high)` the inputs are drawn from.
    pub input_range: (f32, f32),
    /// Copy the new memory slice onto the memory vector after every run.
    pub carry_memory: bool,
    /// Whether to log progress during training.
    pub verbose: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            log_every: 100,
            seed: None,
            input_range: (-1.0, 1.0),
            carry_memory: false,
            verbose: true,
        }
    }
}

impl TrainingConfig {
    /// Creates a new TrainingConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of iterations.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn input_range(mut self, low: f32, high: f32) -> Self {
        self.input_range = (low, high);
        self
    }

    pub fn carry_memory(mut self, carry_memory: bool) -> Self {
        self.carry_memory = carry_memory;
        self
    }

    /// Sets whether to log progress.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.iterations, 1000);
        assert_eq!(config.log_every, 100);
        assert_eq!(config.input_range, (-1.0, 1.0));
        assert!(!config.carry_memory);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = TrainingConfig::new()
            .iterations(50)
            .seed(9)
            .input_range(0.0, 1.0)
            .carry_memory(true)
            .verbose(false);

        assert_eq!(config.iterations, 50);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.input_range, (0.0, 1.0));
        assert!(config.carry_memory);
        assert!(!config.verbose);
    }
}
