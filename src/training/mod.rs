//! Training utilities for the memory network.
//!
//! This module provides:
//! - Loss functions (MSE, MAE) built into the expression graph
//! - Synthetic clipped-addition data
//! - Training configuration
//! - The training loop and single-input evaluation

mod config;
mod data;
mod loss;
mod trainer;

pub use config::TrainingConfig;
pub use data::{Sample, clipped_sum, generate};
pub use loss::Loss;
pub use trainer::{Evaluation, TrainingReport, evaluate, train, train_on};
