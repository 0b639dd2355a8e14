//! Rescaling and evaluation output

use crate::error::Result;
use crate::preprocessing::NormalizationConstants;
use crate::utils::DataSaver;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Maps normalized model outputs back to the original scale
pub struct Rescaler;

impl Rescaler {
    pub fn rescale(normalized: &[f64], constants: &NormalizationConstants) -> Vec<f64> {
        constants.invert_all(normalized)
    }
}

/// One evaluation-period prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: NaiveDate,
    /// Observed value on the original scale, if any
    pub actual: Option<f64>,
    pub normalized_prediction: f64,
    /// Prediction on the original scale
    pub prediction: f64,
}

impl PredictionRecord {
    pub fn error(&self) -> Option<f64> {
        self.actual.map(|a| a - self.prediction)
    }
}

/// Regression metrics on the original scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Records with an observed actual
    pub n: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error over non-zero actuals
    pub mape: Option<f64>,
}

impl EvaluationMetrics {
    /// Compute metrics; `None` when no record has an observed actual
    pub fn compute(records: &[PredictionRecord]) -> Option<Self> {
        let pairs: Vec<(f64, f64)> = records
            .iter()
            .filter_map(|r| r.actual.map(|a| (a, r.prediction)))
            .collect();
        if pairs.is_empty() {
            return None;
        }

        let n = pairs.len() as f64;
        let errors: Vec<f64> = pairs.iter().map(|(a, p)| a - p).collect();
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();

        let pct: Vec<f64> = pairs
            .iter()
            .filter(|(a, _)| *a != 0.0)
            .map(|(a, p)| ((a - p) / a).abs())
            .collect();
        let mape = if pct.is_empty() {
            None
        } else {
            Some(100.0 * pct.iter().sum::<f64>() / pct.len() as f64)
        };

        Some(Self {
            n: pairs.len(),
            mae,
            rmse,
            mape,
        })
    }
}

/// Tabulate records as `date, actual, normalized_prediction, prediction`
pub fn predictions_frame(records: &[PredictionRecord]) -> Result<DataFrame> {
    let dates: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
    let actual: Vec<Option<f64>> = records.iter().map(|r| r.actual).collect();
    let normalized: Vec<f64> = records.iter().map(|r| r.normalized_prediction).collect();
    let prediction: Vec<f64> = records.iter().map(|r| r.prediction).collect();

    Ok(DataFrame::new(vec![
        Series::new("date".into(), dates).into(),
        Series::new("actual".into(), actual).into(),
        Series::new("normalized_prediction".into(), normalized).into(),
        Series::new("prediction".into(), prediction).into(),
    ])?)
}

/// Write prediction records to CSV
pub fn write_predictions_csv(records: &[PredictionRecord], path: impl AsRef<Path>) -> Result<()> {
    let mut df = predictions_frame(records)?;
    DataSaver::save_csv(&mut df, path.as_ref())?;
    info!(path = %path.as_ref().display(), rows = records.len(), "Wrote predictions");
    Ok(())
}
