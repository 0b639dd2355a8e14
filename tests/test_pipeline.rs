//! Integration test: full pipeline (normalize → features → encode → split → train → predict → rescale)

use chrono::{Duration, NaiveDate};
use pageview_forecast::prelude::*;

fn day(d: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(d)
}

/// v_d = 100 + d for d = 0..29
fn linear_series() -> Series {
    let values: Vec<f64> = (0..30).map(|d| 100.0 + d as f64).collect();
    Series::from_values(day(0), &values).unwrap()
}

fn scenario_config() -> PipelineConfig {
    PipelineConfig::new()
        .with_lags(7)
        .with_calendar(false)
        .with_cutoff(day(23))
        .with_model(MlpConfig::default().with_max_epochs(50))
}

#[test]
fn test_end_to_end_scenario() {
    let series = linear_series();
    let pipeline = ForecastPipeline::new(scenario_config());
    let report = pipeline.run(&series).unwrap();

    // mean and sample std of 100..=122
    assert!((report.constants.center() - 111.0).abs() < 1e-9);
    assert!((report.constants.scale() - 46f64.sqrt()).abs() < 1e-9);

    // rows exist for d = 7..29, training covers d = 7..22
    assert_eq!(report.train_rows, 16);
    assert_eq!(report.evaluation.len(), 7);
    for (k, record) in report.evaluation.iter().enumerate() {
        let d = 23 + k as i64;
        assert_eq!(record.date, day(d));
        assert_eq!(record.actual, Some(100.0 + d as f64));
        assert!(record.prediction.is_finite());
        assert!(
            (record.prediction - report.constants.invert(record.normalized_prediction)).abs() < 1e-9
        );
    }

    let metrics = report.metrics.unwrap();
    assert_eq!(metrics.n, 7);
    assert!(metrics.rmse >= metrics.mae);

    assert_eq!(report.forecast.len(), 1);
    assert_eq!(report.forecast[0].date, day(30));
    assert_eq!(report.forecast_error, None);
}

#[test]
fn test_rescaled_targets_reproduce_original_values() {
    let series = linear_series();
    let prepared = ForecastPipeline::new(scenario_config()).prepare(&series).unwrap();
    let (_, evaluation) = prepared.split.split_encoded(&prepared.encoded);

    let targets: Vec<f64> = evaluation.targets().iter().map(|t| t.unwrap()).collect();
    let restored = Rescaler::rescale(&targets, &prepared.constants);

    for (date, value) in evaluation.dates().iter().zip(restored) {
        let expected = series.value_at(*date).unwrap();
        assert!((value - expected).abs() < 1e-9, "{}: {} vs {}", date, value, expected);
    }
    assert_eq!(evaluation.dates().first(), Some(&day(23)));
    assert_eq!(evaluation.len(), 7);
}

#[test]
fn test_driver_with_custom_trainer() {
    // y = lag_1 exactly, learned by a model that copies the first column
    struct CopyLag;
    struct CopyLagModel(usize);

    impl Trainable for CopyLag {
        type Model = CopyLagModel;
        fn fit(&self, x: &ndarray::Array2<f64>, _y: &ndarray::Array1<f64>) -> Result<CopyLagModel> {
            Ok(CopyLagModel(x.ncols()))
        }
    }

    impl Predictable for CopyLagModel {
        fn predict(&self, x: &ndarray::Array2<f64>) -> Result<ndarray::Array1<f64>> {
            Ok(x.column(0).to_owned())
        }
        fn n_features(&self) -> usize {
            self.0
        }
    }

    let prepared = ForecastPipeline::new(scenario_config()).prepare(&linear_series()).unwrap();
    let (train, evaluation) = prepared.split.split_encoded(&prepared.encoded);
    let model = Driver::fit(&CopyLag, &train).unwrap();
    let predictions = Driver::predict(&model, &evaluation).unwrap();

    let restored = Rescaler::rescale(
        &predictions.iter().map(|(_, p)| *p).collect::<Vec<_>>(),
        &prepared.constants,
    );
    // yesterday's value
    assert_eq!(predictions[0].0, day(23));
    assert!((restored[0] - 122.0).abs() < 1e-9);
}

#[test]
fn test_recursive_multi_step_forecast() {
    let values: Vec<f64> = (0..60)
        .map(|d| 200.0 + 20.0 * ((d % 7) as f64 - 3.0).abs())
        .collect();
    let series = Series::from_values(day(0), &values).unwrap();
    let config = PipelineConfig::new()
        .with_lags(7)
        .with_calendar(false)
        .with_holdout_days(10)
        .with_horizon(5)
        .with_model(MlpConfig::default().with_max_epochs(40));

    let report = ForecastPipeline::new(config).run(&series).unwrap();
    let dates: Vec<NaiveDate> = report.forecast.iter().map(|p| p.date).collect();
    assert_eq!(dates, (60..65).map(day).collect::<Vec<_>>());
    for point in &report.forecast {
        assert!((point.prediction - report.constants.invert(point.normalized_prediction)).abs() < 1e-9);
    }
}

#[test]
fn test_calendar_pipeline_over_two_years() {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let values: Vec<f64> = (0..730)
        .map(|d| {
            let date = start + Duration::days(d);
            let weekend = matches!(date.format("%u").to_string().as_str(), "6" | "7");
            1000.0 + d as f64 * 0.5 + if weekend { -150.0 } else { 0.0 }
        })
        .collect();
    let series = Series::from_values(start, &values).unwrap();

    let config = PipelineConfig::new()
        .with_holdout_days(30)
        .with_horizon(7)
        .with_model(MlpConfig::default().with_max_epochs(20));
    let report = ForecastPipeline::new(config).run(&series).unwrap();

    assert_eq!(report.vocabulary.width(CalendarAttribute::Weekday), 7);
    assert_eq!(report.vocabulary.width(CalendarAttribute::Month), 12);
    assert_eq!(report.vocabulary.width(CalendarAttribute::Monthday), 31);
    assert_eq!(report.feature_names.len(), 7 + report.vocabulary.total_width());
    assert_eq!(report.evaluation.len(), 30);
    assert_eq!(report.forecast.len(), 7);
    assert_eq!(report.forecast[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let pipeline = ForecastPipeline::new(scenario_config());
    let a = pipeline.run(&linear_series()).unwrap();
    let b = pipeline.run(&linear_series()).unwrap();
    assert_eq!(a.evaluation, b.evaluation);
    assert_eq!(a.forecast, b.forecast);
}
