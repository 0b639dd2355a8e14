//! Lag and calendar feature construction
//!
//! Turns a (normalized) daily series into supervised-learning rows: the value
//! at date `d` is the target, the values at `d-1 .. d-p` are the predictors.
//! Rows without a complete, observed lag window are dropped, never padded.
//!
//! Calendar convention: `weekday` is the ISO weekday number (Monday = 1 ..
//! Sunday = 7), `month` is 1..=12, `monthday` is 1..=31 and `week` is the ISO
//! 8601 week number 1..=53 (so 2021-01-01 falls in week 53).

use crate::error::{ForecastError, Result};
use crate::series::Series;
use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Categorical attribute derived from a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarAttribute {
    Weekday,
    Month,
    Monthday,
    Week,
}

impl CalendarAttribute {
    pub const ALL: [CalendarAttribute; 4] = [
        CalendarAttribute::Weekday,
        CalendarAttribute::Month,
        CalendarAttribute::Monthday,
        CalendarAttribute::Week,
    ];

    /// Column prefix used for this attribute
    pub fn name(&self) -> &'static str {
        match self {
            CalendarAttribute::Weekday => "weekday",
            CalendarAttribute::Month => "month",
            CalendarAttribute::Monthday => "monthday",
            CalendarAttribute::Week => "week",
        }
    }

    /// Value of this attribute for `date`
    pub fn value_for(&self, date: NaiveDate) -> u32 {
        match self {
            CalendarAttribute::Weekday => date.weekday().number_from_monday(),
            CalendarAttribute::Month => date.month(),
            CalendarAttribute::Monthday => date.day(),
            CalendarAttribute::Week => date.iso_week().week(),
        }
    }

    /// Largest number of distinct values the attribute can take
    pub fn max_cardinality(&self) -> usize {
        match self {
            CalendarAttribute::Weekday => 7,
            CalendarAttribute::Month => 12,
            CalendarAttribute::Monthday => 31,
            CalendarAttribute::Week => 53,
        }
    }
}

impl fmt::Display for CalendarAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for CalendarAttribute {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        CalendarAttribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s.trim().to_lowercase())
            .ok_or_else(|| {
                ForecastError::invalid_parameter(
                    "calendar_attribute",
                    s,
                    "expected one of weekday, month, monthday, week",
                )
            })
    }
}

/// One supervised-learning example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Date of the target observation
    pub date: NaiveDate,
    /// Value at `date`; `None` when unobserved (e.g. a forecast row)
    pub y: Option<f64>,
    /// `lags[k - 1]` is the value at `date - k`
    pub lags: Vec<f64>,
    pub calendar: Vec<(CalendarAttribute, u32)>,
}

impl FeatureRow {
    pub fn calendar_value(&self, attribute: CalendarAttribute) -> Option<u32> {
        self.calendar
            .iter()
            .find(|(attr, _)| *attr == attribute)
            .map(|&(_, value)| value)
    }
}

/// Builds lagged/calendar feature rows from a daily series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagFeatureBuilder {
    lags: usize,
    calendar: Vec<CalendarAttribute>,
}

impl LagFeatureBuilder {
    /// Create a builder with `lags` lagged predictors and no calendar attributes
    pub fn new(lags: usize) -> Result<Self> {
        if lags == 0 {
            return Err(ForecastError::invalid_parameter(
                "lags",
                lags,
                "at least one lag is required",
            ));
        }
        Ok(Self {
            lags,
            calendar: Vec::new(),
        })
    }

    /// Derive the given calendar attributes for every row
    pub fn with_calendar(mut self, attributes: &[CalendarAttribute]) -> Self {
        self.calendar.clear();
        for attr in attributes {
            if !self.calendar.contains(attr) {
                self.calendar.push(*attr);
            }
        }
        self
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    pub fn calendar_attributes(&self) -> &[CalendarAttribute] {
        &self.calendar
    }

    /// `lag_1 .. lag_p` followed by the calendar attribute names
    pub fn feature_names(&self) -> Vec<String> {
        (1..=self.lags)
            .map(|k| format!("lag_{}", k))
            .chain(self.calendar.iter().map(|a| a.name().to_string()))
            .collect()
    }

    /// Build one row per date with a complete, observed lag window
    pub fn transform(&self, series: &Series) -> Vec<FeatureRow> {
        let obs = series.observations();
        let p = self.lags;
        let mut rows = Vec::with_capacity(obs.len().saturating_sub(p));

        for idx in p..obs.len() {
            let date = obs[idx].date;
            // Dates are strictly ascending, so matching the p-th predecessor
            // means the whole window is gap-free.
            if obs[idx - p].date != date - Duration::days(p as i64) {
                continue;
            }

            let lags: Option<Vec<f64>> = (1..=p).map(|k| obs[idx - k].value).collect();
            let Some(lags) = lags else {
                continue;
            };

            rows.push(self.make_row(date, obs[idx].value, lags));
        }

        debug!(
            rows = rows.len(),
            dropped = obs.len() - rows.len(),
            lags = p,
            "Built lag feature rows"
        );
        rows
    }

    /// Build the row for `target_date` from the `p` days immediately before it.
    ///
    /// `target_date` may lie beyond the end of the series; `y` is then `None`.
    pub fn forecast_row(&self, series: &Series, target_date: NaiveDate) -> Result<FeatureRow> {
        let mut lags = Vec::with_capacity(self.lags.min(series.len()));
        for k in 1..=self.lags {
            let value = u64::try_from(k)
                .ok()
                .and_then(|k| target_date.checked_sub_days(Days::new(k)))
                .and_then(|date| series.value_at(date));
            match value {
                Some(v) => lags.push(v),
                None => {
                    return Err(ForecastError::InsufficientHistory {
                        date: target_date,
                        required: self.lags,
                        available: lags.len(),
                    })
                }
            }
        }

        Ok(self.make_row(target_date, series.value_at(target_date), lags))
    }

    fn make_row(&self, date: NaiveDate, y: Option<f64>, lags: Vec<f64>) -> FeatureRow {
        FeatureRow {
            date,
            y,
            lags,
            calendar: self
                .calendar
                .iter()
                .map(|attr| (*attr, attr.value_for(date)))
                .collect(),
        }
    }
}
