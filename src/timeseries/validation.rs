//! Chronological train/evaluation splitting

use crate::error::{ForecastError, Result};
use crate::preprocessing::EncodedRows;
use crate::timeseries::FeatureRow;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Rows partitioned around a cutoff date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRows {
    /// Rows dated strictly before the cutoff
    pub train: Vec<FeatureRow>,
    /// Rows dated on or after the cutoff
    pub evaluation: Vec<FeatureRow>,
}

/// Splits rows by date: `date < cutoff` trains, `date >= cutoff` evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSplit {
    cutoff: NaiveDate,
}

impl DateSplit {
    /// Split at an explicit cutoff date
    pub fn at(cutoff: NaiveDate) -> Self {
        Self { cutoff }
    }

    /// Hold out the last `holdout_days` calendar days ending at `last_date`
    pub fn holdout(last_date: NaiveDate, holdout_days: usize) -> Result<Self> {
        if holdout_days == 0 {
            return Err(ForecastError::invalid_parameter(
                "holdout_days",
                holdout_days,
                "at least one day must be held out",
            ));
        }
        let cutoff = u64::try_from(holdout_days - 1)
            .ok()
            .and_then(|back| last_date.checked_sub_days(Days::new(back)))
            .ok_or_else(|| {
                ForecastError::invalid_parameter(
                    "holdout_days",
                    holdout_days,
                    "reaches before the earliest representable date",
                )
            })?;
        Ok(Self::at(cutoff))
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    /// Whether `date` belongs to the training side
    #[inline]
    pub fn is_train(&self, date: NaiveDate) -> bool {
        date < self.cutoff
    }

    /// Partition feature rows, preserving their order
    pub fn split(&self, rows: &[FeatureRow]) -> SplitRows {
        let (train, evaluation) = rows.iter().cloned().partition(|row| self.is_train(row.date));
        SplitRows { train, evaluation }
    }

    /// Partition an encoded table into `(train, evaluation)`
    pub fn split_encoded(&self, rows: &EncodedRows) -> (EncodedRows, EncodedRows) {
        let dates = rows.dates();
        let train = rows.select(|i| self.is_train(dates[i]));
        let evaluation = rows.select(|i| !self.is_train(dates[i]));
        (train, evaluation)
    }
}
