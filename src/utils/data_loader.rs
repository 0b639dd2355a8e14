//! Data loading utilities

use crate::error::{ForecastError, Result};
use crate::series::{Observation, Series};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Default `(date, value)` column names
pub const DEFAULT_DATE_COLUMN: &str = "date";
pub const DEFAULT_VALUE_COLUMN: &str = "value";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Loads a daily `(date, value)` table from CSV into a [`Series`]
#[derive(Debug, Clone)]
pub struct SeriesLoader {
    date_column: String,
    value_column: String,
    date_format: String,
    delimiter: u8,
}

impl Default for SeriesLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesLoader {
    /// Create a loader for `date,value` CSV files
    pub fn new() -> Self {
        Self {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            delimiter: b',',
        }
    }

    /// Set the date column name
    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into();
        self
    }

    /// Set the value column name
    pub fn with_value_column(mut self, name: impl Into<String>) -> Self {
        self.value_column = name.into();
        self
    }

    /// Set the chrono format string used to parse dates
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file into a validated series
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Series> {
        let path = path.as_ref();
        let start = Instant::now();

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let series = self.from_frame(&df)?;
        info!(
            path = %path.display(),
            rows = series.len(),
            nulls = series.null_count(),
            elapsed = ?start.elapsed(),
            "Loaded series"
        );
        Ok(series)
    }

    /// Convert an in-memory frame with the configured columns into a series
    pub fn from_frame(&self, df: &DataFrame) -> Result<Series> {
        let date_col = df
            .column(&self.date_column)
            .map_err(|_| ForecastError::DataError(format!("missing column '{}'", self.date_column)))?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let value_col = df
            .column(&self.value_column)
            .map_err(|_| ForecastError::DataError(format!("missing column '{}'", self.value_column)))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        let dates = date_col.str()?;
        let values = value_col.f64()?;

        let mut observations = Vec::with_capacity(df.height());
        for (row, (date, value)) in dates.into_iter().zip(values.into_iter()).enumerate() {
            let raw = date.ok_or_else(|| {
                ForecastError::DataError(format!("row {}: missing date", row))
            })?;
            let date = NaiveDate::parse_from_str(raw.trim(), &self.date_format)?;
            observations.push(Observation::new(date, value));
        }

        observations.sort_by_key(|o| o.date);
        if let Some(dup) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ForecastError::DataError(format!("duplicate date {}", dup[0].date)));
        }
        debug!(rows = observations.len(), "Parsed observations");

        Series::new(observations)
    }
}

/// Save DataFrame to CSV
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| ForecastError::DataError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frame_parses_and_sorts() {
        let df = df!(
            "date" => &["2024-01-03", "2024-01-01", "2024-01-02"],
            "value" => &[Some(3.0), Some(1.0), None],
        )
        .unwrap();

        let series = SeriesLoader::new().from_frame(&df).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(series.null_count(), 1);
    }

    #[test]
    fn test_from_frame_custom_columns() {
        let df = df!(
            "day" => &["01/02/2024", "02/02/2024"],
            "views" => &[10i64, 12],
        )
        .unwrap();

        let series = SeriesLoader::new()
            .with_date_column("day")
            .with_value_column("views")
            .with_date_format("%d/%m/%Y")
            .from_frame(&df)
            .unwrap();
        assert_eq!(series.value_at(NaiveDate::from_ymd_opt(2024, 2, 2).unwrap()), Some(12.0));
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let df = df!(
            "date" => &["2024-01-01", "2024-01-01"],
            "value" => &[1.0, 2.0],
        )
        .unwrap();

        let err = SeriesLoader::new().from_frame(&df).unwrap_err();
        assert!(matches!(err, ForecastError::DataError(_)));
    }

    #[test]
    fn test_missing_column() {
        let df = df!("date" => &["2024-01-01"]).unwrap();
        assert!(SeriesLoader::new().from_frame(&df).is_err());
    }
}
