use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pageview_forecast::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

fn create_series(n_days: usize) -> Series {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let values: Vec<f64> = (0..n_days)
        .map(|d| {
            let weekly = ((d % 7) as f64 / 7.0 * std::f64::consts::TAU).sin() * 50.0;
            1000.0 + d as f64 * 0.3 + weekly + rng.gen::<f64>() * 20.0
        })
        .collect();
    Series::from_values(start, &values).unwrap()
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");

    for n_days in [365, 1460].iter() {
        let series = create_series(*n_days);
        let builder = LagFeatureBuilder::new(7).unwrap().with_calendar(&CalendarAttribute::ALL);

        group.bench_with_input(BenchmarkId::new("transform_encode", n_days), &series, |b, series| {
            b.iter(|| {
                let rows = builder.transform(black_box(series));
                let vocab = CategoricalEncoder::new(builder.calendar_attributes()).fit(&rows).unwrap();
                CategoricalEncoder::encode(&rows, &vocab).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_days in [365, 730].iter() {
        let series = create_series(*n_days);
        let config = PipelineConfig::new()
            .with_holdout_days(30)
            .with_model(MlpConfig::default().with_max_epochs(50));
        let pipeline = ForecastPipeline::new(config);

        group.bench_with_input(BenchmarkId::new("run", n_days), &series, |b, series| {
            b.iter(|| pipeline.run(black_box(series)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_features, bench_pipeline);
criterion_main!(benches);
