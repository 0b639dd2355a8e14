//! Pipeline configuration

use crate::error::{ForecastError, Result};
use crate::preprocessing::ScalerType;
use crate::timeseries::CalendarAttribute;
use crate::training::MlpConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an end-to-end forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of lagged values used as predictors
    pub lags: usize,

    /// Whether to add one-hot calendar indicators
    pub include_calendar: bool,

    /// Calendar attributes to derive when `include_calendar` is set
    pub calendar_attributes: Vec<CalendarAttribute>,

    /// First evaluation date; training uses dates strictly before it.
    /// When unset, the last `holdout_days` days are held out.
    pub cutoff: Option<NaiveDate>,

    /// Days held out for evaluation when no cutoff is given
    pub holdout_days: usize,

    /// Normalization applied before feature construction
    pub scaler: ScalerType,

    /// Days to forecast past the end of the series
    pub horizon: usize,

    /// Regression model hyperparameters
    pub model: MlpConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lags: 7,
            include_calendar: true,
            calendar_attributes: CalendarAttribute::ALL.to_vec(),
            cutoff: None,
            holdout_days: 30,
            scaler: ScalerType::Standard,
            horizon: 1,
            model: MlpConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a (possibly partial) JSON configuration; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_lags(mut self, lags: usize) -> Self {
        self.lags = lags;
        self
    }

    pub fn with_calendar(mut self, include: bool) -> Self {
        self.include_calendar = include;
        self
    }

    pub fn with_calendar_attributes(mut self, attributes: Vec<CalendarAttribute>) -> Self {
        self.calendar_attributes = attributes;
        self
    }

    pub fn with_cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn with_holdout_days(mut self, days: usize) -> Self {
        self.holdout_days = days;
        self
    }

    pub fn with_scaler(mut self, scaler: ScalerType) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_model(mut self, model: MlpConfig) -> Self {
        self.model = model;
        self
    }

    /// Calendar attributes actually in use
    pub fn active_calendar(&self) -> &[CalendarAttribute] {
        if self.include_calendar {
            &self.calendar_attributes
        } else {
            &[]
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.lags == 0 {
            return Err(ForecastError::ConfigError("lags must be at least 1".to_string()));
        }
        if self.horizon == 0 {
            return Err(ForecastError::ConfigError("horizon must be at least 1".to_string()));
        }
        if self.cutoff.is_none() && self.holdout_days == 0 {
            return Err(ForecastError::ConfigError(
                "holdout_days must be at least 1 when no cutoff is given".to_string(),
            ));
        }
        if self.include_calendar && self.calendar_attributes.is_empty() {
            return Err(ForecastError::ConfigError(
                "calendar features enabled but no attributes selected".to_string(),
            ));
        }
        self.model
            .validate()
            .map_err(|e| ForecastError::ConfigError(format!("model: {}", e)))
    }
}
