//! Series normalization
//!
//! Constants are fitted on the training window only (observations strictly
//! before the cutoff) and then applied to the whole series. The inverse maps
//! model outputs back to the original scale.

use crate::error::{ForecastError, Result};
use crate::series::Series;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    #[default]
    Standard,
    /// Robust scaling: (x - median) / MAD
    Robust,
}

impl std::str::FromStr for ScalerType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ScalerType::Standard),
            "robust" => Ok(ScalerType::Robust),
            other => Err(ForecastError::invalid_parameter(
                "scaler",
                other,
                "expected 'standard' or 'robust'",
            )),
        }
    }
}

/// Fitted centering/scaling constants. `scale` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConstants {
    center: f64,
    scale: f64,
}

impl NormalizationConstants {
    /// Build constants directly, rejecting a non-positive scale
    pub fn new(center: f64, scale: f64) -> Result<Self> {
        if !center.is_finite() || !scale.is_finite() || scale <= 0.0 {
            return Err(ForecastError::DegenerateInput(format!(
                "scale must be positive and finite (center = {}, scale = {})",
                center, scale
            )));
        }
        Ok(Self { center, scale })
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }

    #[inline]
    pub fn invert(&self, normalized: f64) -> f64 {
        normalized * self.scale + self.center
    }

    pub fn invert_all(&self, normalized: &[f64]) -> Vec<f64> {
        normalized.iter().map(|&v| self.invert(v)).collect()
    }
}

/// Series normalizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Normalizer {
    scaler_type: ScalerType,
}

impl Normalizer {
    /// Create a new normalizer
    pub fn new(scaler_type: ScalerType) -> Self {
        Self { scaler_type }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Fit constants on observed values strictly before `cutoff`
    pub fn fit(&self, series: &Series, cutoff: NaiveDate) -> Result<NormalizationConstants> {
        let values = series.observed_before(cutoff);
        if values.len() < 2 {
            return Err(ForecastError::DegenerateInput(format!(
                "need at least 2 observations before {} to fit the normalizer, found {}",
                cutoff,
                values.len()
            )));
        }

        let (center, scale) = match self.scaler_type {
            ScalerType::Standard => {
                let mean = mean(&values);
                (mean, sample_std(&values, mean))
            }
            ScalerType::Robust => {
                let center = median(&values);
                let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
                (center, median(&deviations))
            }
        };

        if scale == 0.0 {
            return Err(ForecastError::DegenerateInput(format!(
                "training window before {} has zero spread ({:?} scaler)",
                cutoff, self.scaler_type
            )));
        }

        debug!(center, scale, n = values.len(), "Fitted normalization constants");
        NormalizationConstants::new(center, scale)
    }

    /// Normalize every observed value of the series
    pub fn apply(&self, series: &Series, constants: &NormalizationConstants) -> Series {
        series.map_values(|v| constants.normalize(v))
    }

    /// Map a normalized series back to the original scale
    pub fn invert(&self, series: &Series, constants: &NormalizationConstants) -> Series {
        series.map_values(|v| constants.invert(v))
    }

    /// Fit on the training window and normalize the full series
    pub fn fit_apply(&self, series: &Series, cutoff: NaiveDate) -> Result<(NormalizationConstants, Series)> {
        let constants = self.fit(series, cutoff)?;
        Ok((constants, self.apply(series, &constants)))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
