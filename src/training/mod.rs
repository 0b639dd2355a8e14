//! Model training module
//!
//! Provides the regression model used by the forecasting pipeline:
//! - Capability traits separating training from prediction
//! - Neural networks (MLP)

mod models;
pub mod neural_network;

pub use models::{Predictable, Trainable};
pub use neural_network::{Activation, FittedMlp, MlpConfig, MlpTrainer};
