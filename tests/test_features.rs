//! Integration test: feature construction, encoding and splitting

use chrono::{Duration, NaiveDate};
use pageview_forecast::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn integers(n: usize) -> Series {
    let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
    Series::from_values(start(), &values).unwrap()
}

#[test]
fn test_lags_on_consecutive_integers() {
    let rows = LagFeatureBuilder::new(3).unwrap().transform(&integers(12));

    for row in &rows {
        let i = (row.date - start()).num_days() as f64;
        assert_eq!(row.y, Some(i));
        assert_eq!(row.lags, vec![i - 1.0, i - 2.0, i - 3.0]);
    }
}

#[test]
fn test_row_count_is_len_minus_lags() {
    for (n, p) in [(10, 1), (10, 3), (30, 7), (8, 8)] {
        let rows = LagFeatureBuilder::new(p).unwrap().transform(&integers(n));
        assert_eq!(rows.len(), n - p, "n = {}, p = {}", n, p);
    }
}

#[test]
fn test_vocabulary_frozen_across_encodings() {
    let builder = LagFeatureBuilder::new(2)
        .unwrap()
        .with_calendar(&[CalendarAttribute::Weekday, CalendarAttribute::Month]);
    let rows = builder.transform(&integers(40));

    let vocab = CategoricalEncoder::new(builder.calendar_attributes()).fit(&rows).unwrap();
    let snapshot = vocab.clone();

    let first = CategoricalEncoder::encode(&rows[..10], &vocab).unwrap();
    let second = CategoricalEncoder::encode(&rows[20..], &vocab).unwrap();

    assert_eq!(vocab, snapshot);
    assert_eq!(first.column_names(), second.column_names());
    assert_eq!(first.features().ncols(), 2 + 7 + 2);
    assert_eq!(
        &first.column_names()[..4],
        &["lag_1", "lag_2", "weekday_1", "weekday_2"].map(String::from)
    );
}

#[test]
fn test_unknown_category_rejected_without_output() {
    let builder = LagFeatureBuilder::new(1).unwrap().with_calendar(&[CalendarAttribute::Month]);
    // March only
    let march = builder.transform(&integers(31));
    let vocab = CategoricalEncoder::new(&[CalendarAttribute::Month]).fit(&march).unwrap();

    let with_april = builder.transform(&integers(35));
    let result = CategoricalEncoder::encode(&with_april, &vocab);
    assert!(matches!(
        result,
        Err(ForecastError::UnknownCategory { value: 4, .. })
    ));
}

#[test]
fn test_split_completeness() {
    let rows = LagFeatureBuilder::new(3).unwrap().transform(&integers(25));
    let cutoff = start() + Duration::days(15);
    let split = DateSplit::at(cutoff).split(&rows);

    assert_eq!(split.train.len() + split.evaluation.len(), rows.len());
    assert!(split.train.iter().all(|r| r.date < cutoff));
    assert!(split.evaluation.iter().all(|r| r.date >= cutoff));
    assert_eq!(split.train.len(), 12);
}

#[test]
fn test_normalize_invert_round_trip() {
    let values: Vec<f64> = (0..50).map(|i| 1000.0 + 37.0 * ((i * 13) % 17) as f64).collect();
    let series = Series::from_values(start(), &values).unwrap();

    for scaler in [ScalerType::Standard, ScalerType::Robust] {
        let normalizer = Normalizer::new(scaler);
        let (constants, normalized) = normalizer.fit_apply(&series, start() + Duration::days(40)).unwrap();
        let restored = normalizer.invert(&normalized, &constants);

        for (orig, back) in series.iter().zip(restored.iter()) {
            let (a, b) = (orig.value.unwrap(), back.value.unwrap());
            assert!((a - b).abs() <= 1e-9 * a.abs(), "{:?}: {} vs {}", scaler, a, b);
        }
    }
}
