//! One-hot encoding of calendar attributes
//!
//! The vocabulary is learned once from the historical feature table and then
//! frozen. Later encodings (evaluation or forecast rows) reuse it verbatim, so
//! the indicator column layout never changes and an unseen category is an
//! error rather than a silent new column.

use crate::error::{ForecastError, Result};
use crate::timeseries::{CalendarAttribute, FeatureRow};
use chrono::NaiveDate;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Frozen, ordered category set per calendar attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    // Attribute order is the fit order; categories are ascending.
    entries: Vec<(CalendarAttribute, Vec<u32>)>,
}

impl CategoryVocabulary {
    pub fn attributes(&self) -> impl Iterator<Item = CalendarAttribute> + '_ {
        self.entries.iter().map(|(attr, _)| *attr)
    }

    pub fn categories(&self, attribute: CalendarAttribute) -> Option<&[u32]> {
        self.entries
            .iter()
            .find(|(attr, _)| *attr == attribute)
            .map(|(_, cats)| cats.as_slice())
    }

    /// Indicator column index of `value` within `attribute`'s block
    pub fn index_of(&self, attribute: CalendarAttribute, value: u32) -> Result<usize> {
        let categories = self.categories(attribute).ok_or_else(|| {
            ForecastError::DataError(format!("attribute '{}' is not part of the vocabulary", attribute))
        })?;
        categories
            .binary_search(&value)
            .map_err(|_| ForecastError::UnknownCategory {
                attribute: attribute.name().to_string(),
                value,
            })
    }

    /// Number of indicator columns for one attribute
    pub fn width(&self, attribute: CalendarAttribute) -> usize {
        self.categories(attribute).map_or(0, <[u32]>::len)
    }

    /// Number of indicator columns across all attributes
    pub fn total_width(&self) -> usize {
        self.entries.iter().map(|(_, cats)| cats.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indicator column names, e.g. `weekday_1`, in column order
    pub fn column_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|(attr, cats)| cats.iter().map(move |c| format!("{}_{}", attr.name(), c)))
            .collect()
    }
}

/// Learns a [`CategoryVocabulary`] and encodes rows against it
#[derive(Debug, Clone, Default)]
pub struct CategoricalEncoder {
    attributes: Vec<CalendarAttribute>,
}

impl CategoricalEncoder {
    /// Create an encoder for the given attributes
    pub fn new(attributes: &[CalendarAttribute]) -> Self {
        let mut unique = Vec::with_capacity(attributes.len());
        for attr in attributes {
            if !unique.contains(attr) {
                unique.push(*attr);
            }
        }
        Self { attributes: unique }
    }

    /// Collect the distinct values of each attribute in one scan
    pub fn fit(&self, rows: &[FeatureRow]) -> Result<CategoryVocabulary> {
        let mut seen: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); self.attributes.len()];

        for row in rows {
            for (slot, attr) in self.attributes.iter().enumerate() {
                let value = row.calendar_value(*attr).ok_or_else(|| {
                    ForecastError::DataError(format!(
                        "row {} has no '{}' attribute",
                        row.date, attr
                    ))
                })?;
                seen[slot].insert(value);
            }
        }

        let entries = self
            .attributes
            .iter()
            .zip(seen)
            .map(|(attr, values)| (*attr, values.into_iter().collect()))
            .collect();

        Ok(CategoryVocabulary { entries })
    }

    /// Encode rows as `[lags.., indicators..]` against a frozen vocabulary.
    ///
    /// Every row is validated before any output is produced.
    pub fn encode(rows: &[FeatureRow], vocabulary: &CategoryVocabulary) -> Result<EncodedRows> {
        let n_lags = rows.first().map_or(0, |r| r.lags.len());
        let block_offsets: Vec<usize> = vocabulary
            .entries
            .iter()
            .scan(n_lags, |offset, (_, cats)| {
                let start = *offset;
                *offset += cats.len();
                Some(start)
            })
            .collect();

        let mut hot: Vec<Vec<usize>> = Vec::with_capacity(rows.len());
        for row in rows {
            if row.lags.len() != n_lags {
                return Err(ForecastError::ShapeError {
                    expected: format!("{} lags", n_lags),
                    actual: format!("{} lags on {}", row.lags.len(), row.date),
                });
            }

            let mut columns = Vec::with_capacity(block_offsets.len());
            for ((attr, _), offset) in vocabulary.entries.iter().zip(&block_offsets) {
                let value = row.calendar_value(*attr).ok_or_else(|| {
                    ForecastError::DataError(format!("row {} has no '{}' attribute", row.date, attr))
                })?;
                columns.push(offset + vocabulary.index_of(*attr, value)?);
            }
            hot.push(columns);
        }

        let width = n_lags + vocabulary.total_width();
        let mut features = Array2::zeros((rows.len(), width));
        for (i, (row, columns)) in rows.iter().zip(&hot).enumerate() {
            for (k, lag) in row.lags.iter().enumerate() {
                features[[i, k]] = *lag;
            }
            for &col in columns {
                features[[i, col]] = 1.0;
            }
        }

        let column_names = (1..=n_lags)
            .map(|k| format!("lag_{}", k))
            .chain(vocabulary.column_names())
            .collect();

        Ok(EncodedRows {
            dates: rows.iter().map(|r| r.date).collect(),
            targets: rows.iter().map(|r| r.y).collect(),
            features,
            column_names,
            n_lags,
        })
    }
}

/// Numeric feature table ready for the model
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRows {
    dates: Vec<NaiveDate>,
    targets: Vec<Option<f64>>,
    features: Array2<f64>,
    column_names: Vec<String>,
    n_lags: usize,
}

impl EncodedRows {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn targets(&self) -> &[Option<f64>] {
        &self.targets
    }

    /// Model inputs: lags followed by indicator columns (no date, no target)
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_lags(&self) -> usize {
        self.n_lags
    }

    /// Keep only the rows whose index satisfies `keep`, preserving order
    pub fn select<F>(&self, keep: F) -> EncodedRows
    where
        F: Fn(usize) -> bool,
    {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        EncodedRows {
            dates: idx.iter().map(|&i| self.dates[i]).collect(),
            targets: idx.iter().map(|&i| self.targets[i]).collect(),
            features: self.features.select(ndarray::Axis(0), &idx),
            column_names: self.column_names.clone(),
            n_lags: self.n_lags,
        }
    }

    /// Render as a frame: `date`, `y`, then one column per feature
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.column_names.len() + 2);
        let dates: Vec<String> = self.dates.iter().map(|d| d.to_string()).collect();
        columns.push(Series::new("date".into(), dates).into());
        columns.push(Series::new("y".into(), self.targets.clone()).into());

        for (j, name) in self.column_names.iter().enumerate() {
            let values: Vec<f64> = self.features.column(j).to_vec();
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(date: NaiveDate, lags: Vec<f64>) -> FeatureRow {
        FeatureRow {
            date,
            y: Some(0.5),
            lags,
            calendar: CalendarAttribute::ALL.iter().map(|a| (*a, a.value_for(date))).collect(),
        }
    }

    fn week_of_rows() -> Vec<FeatureRow> {
        (1..=7).map(|d| row(ymd(2024, 1, d), vec![d as f64])).collect()
    }

    #[test]
    fn test_fit_collects_sorted_categories() {
        let rows: Vec<FeatureRow> = [3u32, 1, 2, 1].iter().map(|&d| row(ymd(2024, 1, d), vec![0.0])).collect();
        let vocab = CategoricalEncoder::new(&[CalendarAttribute::Monthday]).fit(&rows).unwrap();

        assert_eq!(vocab.categories(CalendarAttribute::Monthday), Some(&[1u32, 2, 3][..]));
        assert_eq!(vocab.column_names(), vec!["monthday_1", "monthday_2", "monthday_3"]);
    }

    #[test]
    fn test_one_hot_layout() {
        let rows = week_of_rows();
        let encoder = CategoricalEncoder::new(&[CalendarAttribute::Weekday, CalendarAttribute::Month]);
        let vocab = encoder.fit(&rows).unwrap();
        let encoded = CategoricalEncoder::encode(&rows, &vocab).unwrap();

        // 1 lag + 7 weekdays + 1 month
        assert_eq!(encoded.features().ncols(), 9);
        for i in 0..rows.len() {
            let weekday_block = encoded.features().slice(ndarray::s![i, 1..8]);
            assert_eq!(weekday_block.sum(), 1.0);
            assert_eq!(encoded.features()[[i, 8]], 1.0);
        }
        // 2024-01-01 is a Monday
        assert_eq!(encoded.features()[[0, 1]], 1.0);
        assert_eq!(encoded.features()[[0, 0]], 1.0);
    }

    #[test]
    fn test_vocabulary_is_stable_for_later_encodings() {
        let train = week_of_rows();
        let vocab = CategoricalEncoder::new(&[CalendarAttribute::Weekday]).fit(&train).unwrap();
        let before = vocab.index_of(CalendarAttribute::Weekday, 3).unwrap();

        // Encoding disjoint future rows does not touch the vocabulary
        let future: Vec<FeatureRow> = (8..=14).map(|d| row(ymd(2024, 1, d), vec![0.0])).collect();
        let encoded = CategoricalEncoder::encode(&future, &vocab).unwrap();
        assert_eq!(encoded.features().ncols(), 1 + 7);
        assert_eq!(vocab.index_of(CalendarAttribute::Weekday, 3).unwrap(), before);

        // 2024-01-10 is a Wednesday (weekday 3)
        assert_eq!(encoded.features()[[2, 1 + before]], 1.0);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let train = week_of_rows();
        let vocab = CategoricalEncoder::new(&[CalendarAttribute::Month]).fit(&train).unwrap();

        let february = vec![row(ymd(2024, 2, 1), vec![0.0])];
        let err = CategoricalEncoder::encode(&february, &vocab).unwrap_err();
        match err {
            ForecastError::UnknownCategory { attribute, value } => {
                assert_eq!(attribute, "month");
                assert_eq!(value, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mismatched_lag_count_rejected() {
        let rows = vec![row(ymd(2024, 1, 1), vec![1.0, 2.0]), row(ymd(2024, 1, 2), vec![1.0])];
        let vocab = CategoryVocabulary::default();
        assert!(matches!(
            CategoricalEncoder::encode(&rows, &vocab),
            Err(ForecastError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_empty_vocabulary_passes_lags_through() {
        let rows = week_of_rows();
        let encoded = CategoricalEncoder::encode(&rows, &CategoryVocabulary::default()).unwrap();
        assert_eq!(encoded.features().ncols(), 1);
        assert_eq!(encoded.column_names(), &["lag_1".to_string()]);
    }

    #[test]
    fn test_select_preserves_order() {
        let rows = week_of_rows();
        let encoded = CategoricalEncoder::encode(&rows, &CategoryVocabulary::default()).unwrap();
        let odd = encoded.select(|i| i % 2 == 1);
        assert_eq!(odd.len(), 3);
        assert_eq!(odd.dates()[0], ymd(2024, 1, 2));
        assert_eq!(odd.features()[[2, 0]], 6.0);
    }

    #[test]
    fn test_to_frame() {
        let rows = week_of_rows();
        let vocab = CategoricalEncoder::new(&[CalendarAttribute::Weekday]).fit(&rows).unwrap();
        let frame = CategoricalEncoder::encode(&rows, &vocab).unwrap().to_frame().unwrap();
        assert_eq!(frame.height(), 7);
        assert_eq!(frame.width(), 2 + 1 + 7);
    }
}
