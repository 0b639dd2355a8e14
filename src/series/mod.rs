//! Date-indexed daily series
//!
//! A [`Series`] is the raw input of the pipeline: one [`Observation`] per
//! calendar day, strictly ascending, with optional (missing) values. Gaps in
//! the calendar are allowed; the feature builder drops rows whose lag window
//! crosses one.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single dated observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }

    pub fn observed(date: NaiveDate, value: f64) -> Self {
        Self { date, value: Some(value) }
    }
}

/// Ordered daily series, one record per date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    /// Create a series, validating that dates are strictly ascending
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ForecastError::DataError(format!(
                    "dates must be strictly ascending: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }

        if let Some(bad) = observations
            .iter()
            .find(|o| o.value.map_or(false, |v| !v.is_finite()))
        {
            return Err(ForecastError::DataError(format!(
                "non-finite value on {}",
                bad.date
            )));
        }

        Ok(Self { observations })
    }

    /// Consecutive daily values starting at `start`
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::observed(start + Duration::days(i as i64), v))
            .collect();
        Self::new(observations)
    }

    /// Consecutive daily values starting at `start`, some of which may be missing
    pub fn from_optional_values(start: NaiveDate, values: &[Option<f64>]) -> Result<Self> {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::new(start + Duration::days(i as i64), v))
            .collect();
        Self::new(observations)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Look up the record for a date
    pub fn get(&self, date: NaiveDate) -> Option<&Observation> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|idx| &self.observations[idx])
    }

    /// Observed value at a date (`None` if the date is absent or unobserved)
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.get(date).and_then(|o| o.value)
    }

    /// Observed values strictly before `cutoff`, in date order
    pub fn observed_before(&self, cutoff: NaiveDate) -> Vec<f64> {
        self.observations
            .iter()
            .take_while(|o| o.date < cutoff)
            .filter_map(|o| o.value)
            .collect()
    }

    /// Number of dates with a missing value
    pub fn null_count(&self) -> usize {
        self.observations.iter().filter(|o| o.value.is_none()).count()
    }

    /// Number of calendar days between first and last date, inclusive
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days() + 1,
            _ => 0,
        }
    }

    /// Number of calendar days missing from the span
    pub fn gap_count(&self) -> usize {
        (self.span_days() as usize).saturating_sub(self.len())
    }

    pub fn has_gaps(&self) -> bool {
        self.gap_count() > 0
    }

    /// Append a record after the current last date
    pub fn push(&mut self, observation: Observation) -> Result<()> {
        if let Some(last) = self.last_date() {
            if observation.date <= last {
                return Err(ForecastError::DataError(format!(
                    "cannot append {} after {}",
                    observation.date, last
                )));
            }
        }
        self.observations.push(observation);
        Ok(())
    }

    /// Apply `f` to every observed value, keeping dates and missing values
    pub fn map_values<F>(&self, f: F) -> Series
    where
        F: Fn(f64) -> f64,
    {
        Series {
            observations: self
                .observations
                .iter()
                .map(|o| Observation::new(o.date, o.value.map(&f)))
                .collect(),
        }
    }
}
