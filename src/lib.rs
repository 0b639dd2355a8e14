//! Pageview forecast - daily pageview forecasting pipeline
//!
//! This crate turns a daily `(date, value)` series into a supervised
//! regression problem and forecasts it with a small neural network:
//! - Normalization fitted on the training window only, with exact inversion
//! - Lagged-value and calendar features, one-hot encoded against a frozen vocabulary
//! - Date-based train/evaluation split, MLP training and prediction
//! - Rescaled predictions, evaluation metrics and a recursive forward forecast
//!
//! # Modules
//!
//! - [`series`] - Date-indexed series with optional values
//! - [`utils`] - CSV loading and saving
//! - [`preprocessing`] - Normalization and categorical encoding
//! - [`timeseries`] - Lag/calendar features and date splitting
//! - [`training`] - Model capability traits and the MLP regressor
//! - [`pipeline`] - End-to-end driver, configuration and reporting
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use pageview_forecast::prelude::*;
//!
//! let series = SeriesLoader::new().load_csv("pageviews.csv")?;
//! let report = ForecastPipeline::new(PipelineConfig::default()).run(&series)?;
//! for point in &report.forecast {
//!     println!("{} {:.1}", point.date, point.prediction);
//! }
//! # Ok::<(), pageview_forecast::error::ForecastError>(())
//! ```

// Core error handling
pub mod error;

// Data
pub mod series;
pub mod utils;

// Pipeline stages
pub mod preprocessing;
pub mod timeseries;
pub mod training;
pub mod pipeline;

// Interfaces
pub mod cli;

pub use error::{ForecastError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{ForecastError, Result};
    pub use crate::pipeline::{
        Driver, EvaluationMetrics, ForecastPipeline, ForecastPoint, ForecastReport, PipelineConfig,
        PredictionRecord, Rescaler,
    };
    pub use crate::preprocessing::{
        CategoricalEncoder, CategoryVocabulary, EncodedRows, NormalizationConstants, Normalizer, ScalerType,
    };
    pub use crate::series::{Observation, Series};
    pub use crate::timeseries::{CalendarAttribute, DateSplit, FeatureRow, LagFeatureBuilder, SplitRows};
    pub use crate::training::{Activation, FittedMlp, MlpConfig, MlpTrainer, Predictable, Trainable};
    pub use crate::utils::SeriesLoader;
}
