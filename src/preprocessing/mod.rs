//! Data preprocessing module
//!
//! Provides the numeric preparation steps of the forecasting pipeline:
//! - Series normalization (standard or robust scaling) with exact inversion
//! - One-hot encoding of calendar attributes against a frozen vocabulary

mod encoder;
mod scaler;

pub use encoder::{CategoricalEncoder, CategoryVocabulary, EncodedRows};
pub use scaler::{NormalizationConstants, Normalizer, ScalerType};
