//! End-to-end forecasting pipeline
//!
//! `run` wires the stages together in a fixed order:
//! resolve cutoff, fit the normalizer on pre-cutoff data, normalize, build
//! lag/calendar rows, fit the calendar vocabulary, encode, split by date,
//! train, predict the evaluation rows, rescale, score and forecast forward.

mod config;
mod report;

pub use config::PipelineConfig;
pub use report::{predictions_frame, write_predictions_csv, EvaluationMetrics, PredictionRecord, Rescaler};

use crate::error::{ForecastError, Result};
use crate::preprocessing::{CategoricalEncoder, CategoryVocabulary, EncodedRows, NormalizationConstants, Normalizer};
use crate::series::{Observation, Series};
use crate::timeseries::{DateSplit, LagFeatureBuilder};
use crate::training::{MlpTrainer, Predictable, Trainable};
use chrono::{Days, NaiveDate};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fits models on encoded rows and aligns predictions with row dates
pub struct Driver;

impl Driver {
    /// Train on rows with an observed target
    pub fn fit<T: Trainable>(trainer: &T, rows: &EncodedRows) -> Result<T::Model> {
        let observed: Vec<usize> = rows
            .targets()
            .iter()
            .enumerate()
            .filter_map(|(i, y)| y.map(|_| i))
            .collect();

        if observed.is_empty() {
            return Err(ForecastError::DataError(format!(
                "no training rows with an observed target ({} rows before the cutoff)",
                rows.len()
            )));
        }
        let skipped = rows.len() - observed.len();
        if skipped > 0 {
            warn!(skipped, "Skipping training rows with a missing target");
        }

        let x = rows.features().select(Axis(0), &observed);
        let y: Array1<f64> = observed.iter().filter_map(|&i| rows.targets()[i]).collect();
        trainer.fit(&x, &y)
    }

    /// Predict every row, paired with its date
    pub fn predict<M: Predictable>(model: &M, rows: &EncodedRows) -> Result<Vec<(NaiveDate, f64)>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if model.n_features() != rows.features().ncols() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} feature columns", model.n_features()),
                actual: format!("{} feature columns", rows.features().ncols()),
            });
        }

        let predictions = model.predict(rows.features())?;
        if predictions.len() != rows.len() {
            return Err(ForecastError::MisalignedRows {
                expected: rows.len(),
                actual: predictions.len(),
            });
        }

        Ok(rows.dates().iter().copied().zip(predictions.iter().copied()).collect())
    }
}

/// One step of the forward forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub normalized_prediction: f64,
    pub prediction: f64,
}

/// Everything a pipeline run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub cutoff: NaiveDate,
    pub constants: NormalizationConstants,
    pub vocabulary: CategoryVocabulary,
    /// Model input columns: lags then calendar indicators
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub evaluation: Vec<PredictionRecord>,
    /// `None` when no evaluation row has an observed value
    pub metrics: Option<EvaluationMetrics>,
    /// Forecast steps completed before `forecast_error`, if any
    pub forecast: Vec<ForecastPoint>,
    /// Why the forward forecast stopped early; the evaluation is still valid
    pub forecast_error: Option<String>,
}

/// Normalized, featurized and encoded view of a series
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split: DateSplit,
    pub constants: NormalizationConstants,
    pub normalized: Series,
    pub vocabulary: CategoryVocabulary,
    pub encoded: EncodedRows,
}

/// Daily pageview forecasting pipeline
#[derive(Debug, Clone, Default)]
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn feature_builder(&self) -> Result<LagFeatureBuilder> {
        Ok(LagFeatureBuilder::new(self.config.lags)?.with_calendar(self.config.active_calendar()))
    }

    /// Cutoff from the config, or `holdout_days` before the end of the series
    pub fn resolve_split(&self, series: &Series) -> Result<DateSplit> {
        match self.config.cutoff {
            Some(cutoff) => Ok(DateSplit::at(cutoff)),
            None => {
                let last = series
                    .last_date()
                    .ok_or_else(|| ForecastError::DataError("series is empty".to_string()))?;
                DateSplit::holdout(last, self.config.holdout_days)
            }
        }
    }

    /// Normalize, featurize and encode the full history
    ///
    /// The vocabulary is fitted on training and evaluation rows together, so
    /// encoding them never raises `UnknownCategory`; only forecast dates can.
    pub fn prepare(&self, series: &Series) -> Result<PreparedData> {
        self.config.validate()?;
        let split = self.resolve_split(series)?;
        let cutoff = split.cutoff();

        let (constants, normalized) = Normalizer::new(self.config.scaler).fit_apply(series, cutoff)?;

        let builder = self.feature_builder()?;
        let rows = builder.transform(&normalized);
        if rows.is_empty() {
            return Err(ForecastError::DataError(format!(
                "series of {} days yields no rows with {} complete lags",
                series.len(),
                self.config.lags
            )));
        }

        let nulls = series.null_count();
        if nulls > 0 {
            warn!(nulls, rows = rows.len(), "Missing observations; rows with an incomplete lag window were dropped");
        }

        let calendar = builder.calendar_attributes();
        if !calendar.is_empty() {
            if let Some(first) = series.first_date() {
                let train_days = (cutoff - first).num_days();
                if train_days < 365 {
                    warn!(
                        train_days,
                        "Training window is shorter than a year; calendar indicators may be poorly estimated"
                    );
                }
            }
        }

        let vocabulary = CategoricalEncoder::new(calendar).fit(&rows)?;
        let encoded = CategoricalEncoder::encode(&rows, &vocabulary)?;
        debug!(
            rows = encoded.len(),
            columns = encoded.column_names().len(),
            "Encoded feature table"
        );

        Ok(PreparedData {
            split,
            constants,
            normalized,
            vocabulary,
            encoded,
        })
    }

    /// Run the full pipeline on a raw series
    ///
    /// A failing forward forecast does not discard the evaluation: the steps
    /// completed so far are kept and the failure lands in `forecast_error`.
    pub fn run(&self, series: &Series) -> Result<ForecastReport> {
        let start = Instant::now();
        let prepared = self.prepare(series)?;
        if let Some(last) = prepared.normalized.last_date() {
            self.forecast_date(last, self.config.horizon)?;
        }
        let cutoff = prepared.split.cutoff();
        let (train, evaluation) = prepared.split.split_encoded(&prepared.encoded);
        info!(
            cutoff = %cutoff,
            train_rows = train.len(),
            evaluation_rows = evaluation.len(),
            "Split feature table"
        );

        let model = Driver::fit(&MlpTrainer::new(self.config.model.clone()), &train)?;
        let evaluation = self.evaluate(&model, &evaluation, series, &prepared.constants)?;
        let metrics = EvaluationMetrics::compute(&evaluation);
        if let Some(m) = &metrics {
            info!(n = m.n, mae = m.mae, rmse = m.rmse, "Evaluation metrics");
        }

        let mut forecast = Vec::new();
        let forecast_error = match self.forecast(&model, &prepared, &mut forecast) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, completed = forecast.len(), "Forward forecast stopped");
                Some(e.to_string())
            }
        };

        info!(elapsed = ?start.elapsed(), "Pipeline finished");
        Ok(ForecastReport {
            cutoff,
            constants: prepared.constants,
            feature_names: prepared.encoded.column_names().to_vec(),
            vocabulary: prepared.vocabulary,
            train_rows: train.len(),
            evaluation,
            metrics,
            forecast,
            forecast_error,
        })
    }

    fn evaluate<M: Predictable>(
        &self,
        model: &M,
        rows: &EncodedRows,
        original: &Series,
        constants: &NormalizationConstants,
    ) -> Result<Vec<PredictionRecord>> {
        let predictions = Driver::predict(model, rows)?;
        let normalized: Vec<f64> = predictions.iter().map(|(_, p)| *p).collect();
        let rescaled = Rescaler::rescale(&normalized, constants);

        Ok(predictions
            .iter()
            .zip(rescaled)
            .map(|(&(date, normalized_prediction), prediction)| PredictionRecord {
                date,
                actual: original.value_at(date),
                normalized_prediction,
                prediction,
            })
            .collect())
    }

    /// `step` days after `last`
    fn forecast_date(&self, last: NaiveDate, step: usize) -> Result<NaiveDate> {
        u64::try_from(step)
            .ok()
            .and_then(|days| last.checked_add_days(Days::new(days)))
            .ok_or_else(|| {
                ForecastError::invalid_parameter(
                    "horizon",
                    self.config.horizon,
                    format!("runs past the latest representable date after {}", last),
                )
            })
    }

    /// Forecast `horizon` days past the end of the series into `points`.
    ///
    /// Lags come from the observed tail; each later step feeds on the
    /// previous step's prediction.
    fn forecast<M: Predictable>(
        &self,
        model: &M,
        prepared: &PreparedData,
        points: &mut Vec<ForecastPoint>,
    ) -> Result<()> {
        let Some(last) = prepared.normalized.last_date() else {
            return Ok(());
        };
        let builder = self.feature_builder()?;
        let mut extended = prepared.normalized.clone();

        for step in 1..=self.config.horizon {
            let date = self.forecast_date(last, step)?;
            let row = builder.forecast_row(&extended, date)?;
            let encoded = CategoricalEncoder::encode(std::slice::from_ref(&row), &prepared.vocabulary)?;
            let predicted = Driver::predict(model, &encoded)?;
            let Some(&(_, normalized_prediction)) = predicted.first() else {
                return Err(ForecastError::MisalignedRows { expected: 1, actual: 0 });
            };

            extended.push(Observation::observed(date, normalized_prediction))?;
            points.push(ForecastPoint {
                date,
                normalized_prediction,
                prediction: prepared.constants.invert(normalized_prediction),
            });
        }

        debug!(steps = points.len(), "Forecast complete");
        Ok(())
    }
}
