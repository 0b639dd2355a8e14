//! Pageview forecast CLI module
//!
//! Command-line interface for running the pipeline, exporting feature tables
//! and inspecting input series.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::pipeline::{write_predictions_csv, ForecastPipeline, ForecastReport, PipelineConfig};
use crate::preprocessing::ScalerType;
use crate::series::Series;
use crate::utils::{DataSaver, SeriesLoader, DEFAULT_DATE_COLUMN, DEFAULT_DATE_FORMAT, DEFAULT_VALUE_COLUMN};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pageview-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily pageview forecasting with lagged features and an MLP regressor")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train, evaluate on the held-out tail and forecast forward
    Run(RunArgs),

    /// Write the encoded feature table to CSV
    Features {
        #[command(flatten)]
        data: DataArgs,

        /// Number of lagged values
        #[arg(long)]
        lags: Option<usize>,

        /// Disable calendar indicator columns
        #[arg(long)]
        no_calendar: bool,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show series information
    Info {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Print the default configuration as JSON
    Config,
}

/// Input series options
#[derive(Args, Clone)]
pub struct DataArgs {
    /// Input CSV file with a date and a value column
    #[arg(short, long)]
    pub data: PathBuf,

    /// Date column name
    #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    /// Value column name
    #[arg(long, default_value = DEFAULT_VALUE_COLUMN)]
    pub value_column: String,

    /// Date format (chrono syntax)
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,
}

impl DataArgs {
    fn load(&self) -> anyhow::Result<Series> {
        SeriesLoader::new()
            .with_date_column(&self.date_column)
            .with_value_column(&self.value_column)
            .with_date_format(&self.date_format)
            .load_csv(&self.data)
            .with_context(|| format!("loading {}", self.data.display()))
    }
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of lagged values
    #[arg(long)]
    pub lags: Option<usize>,

    /// First evaluation date (YYYY-MM-DD)
    #[arg(long)]
    pub cutoff: Option<NaiveDate>,

    /// Days held out for evaluation when no cutoff is given
    #[arg(long)]
    pub holdout_days: Option<usize>,

    /// Days to forecast past the end of the series
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Hidden layer sizes, e.g. 10,5
    #[arg(long, value_delimiter = ',')]
    pub hidden: Option<Vec<usize>>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable calendar indicator columns
    #[arg(long)]
    pub no_calendar: bool,

    /// Scaler (standard, robust)
    #[arg(long)]
    pub scaler: Option<ScalerType>,

    /// Write evaluation predictions to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// Config file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(lags) = self.lags {
            config.lags = lags;
        }
        if let Some(cutoff) = self.cutoff {
            config.cutoff = Some(cutoff);
        }
        if let Some(days) = self.holdout_days {
            config.holdout_days = days;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(hidden) = &self.hidden {
            config.model.hidden_layers = hidden.clone();
        }
        if let Some(seed) = self.seed {
            config.model.random_state = Some(seed);
        }
        if self.no_calendar {
            config.include_calendar = false;
        }
        if let Some(scaler) = self.scaler {
            config.scaler = scaler;
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;

    println!();
    line_box_top();
    line_box(&format!("{}", "Pageview Forecast".white().bold()));
    line_box(&kv("Lags     ", &config.lags.to_string()));
    line_box(&kv("Calendar ", &if config.include_calendar {
        config.calendar_attributes.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
    } else {
        "off".to_string()
    }));
    line_box(&kv("Scaler   ", &format!("{:?}", config.scaler).to_lowercase()));
    line_box(&kv("Hidden   ", &format!("{:?}", config.model.hidden_layers)));
    line_box_bottom();

    section("Run");
    step_run("Loading series");
    let start = Instant::now();
    let series = args.data.load()?;
    step_done(&format!("{} days in {:?}", series.len(), start.elapsed()));

    step_run("Training and evaluating");
    let start = Instant::now();
    let report = ForecastPipeline::new(config).run(&series)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&report);

    if let Some(path) = &args.output {
        step_run(&format!("Saving → {}", path.display()));
        write_predictions_csv(&report.evaluation, path)?;
        step_done(&format!("{} rows", report.evaluation.len()));
    }

    println!();
    Ok(())
}

fn print_report(report: &ForecastReport) {
    section("Evaluation");
    println!("  {:<14} {}", muted("Cutoff"), report.cutoff);
    println!("  {:<14} {}", muted("Train rows"), report.train_rows);
    println!("  {:<14} {}", muted("Features"), report.feature_names.len());
    println!(
        "  {:<14} center {:.3}, scale {:.3}",
        muted("Normalization"),
        report.constants.center(),
        report.constants.scale()
    );
    println!();

    println!("  {:<12} {:>12} {:>12} {:>10}", muted("Date"), muted("Actual"), muted("Predicted"), muted("Error"));
    println!("  {}", dim(&"─".repeat(50)));
    for record in &report.evaluation {
        println!(
            "  {:<12} {:>12} {:>12.2} {:>10}",
            record.date.to_string(),
            fmt_opt(record.actual),
            record.prediction,
            fmt_opt(record.error())
        );
    }

    match &report.metrics {
        Some(m) => {
            println!();
            println!("  {:<14} {}", muted("MAE"), format!("{:.4}", m.mae).white().bold());
            println!("  {:<14} {}", muted("RMSE"), format!("{:.4}", m.rmse).white().bold());
            println!("  {:<14} {}", muted("MAPE"), m.mape.map_or("-".to_string(), |v| format!("{:.2}%", v)).white());
            println!("  {:<14} {}", muted("Scored rows"), m.n);
        }
        None => println!("  {}", "No observed values in the evaluation period".yellow()),
    }

    section("Forecast");
    for point in &report.forecast {
        println!("  {:<12} {:>12.2}", point.date.to_string(), point.prediction);
    }
    if let Some(reason) = &report.forecast_error {
        println!("  {} {}", "Forecast stopped:".yellow(), reason);
    }
}

pub fn cmd_features(data: &DataArgs, lags: Option<usize>, no_calendar: bool, output: &Path) -> anyhow::Result<()> {
    section("Features");

    let mut config = PipelineConfig::default();
    if let Some(lags) = lags {
        config.lags = lags;
    }
    config.include_calendar = !no_calendar;

    step_run("Loading series");
    let series = data.load()?;
    step_done(&format!("{} days", series.len()));

    step_run("Building features");
    let start = Instant::now();
    let prepared = ForecastPipeline::new(config).prepare(&series)?;
    let mut frame = prepared.encoded.to_frame()?;
    step_done(&format!("{} rows × {} cols in {:?}", frame.height(), frame.width(), start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    DataSaver::save_csv(&mut frame, output)?;
    step_done("");

    println!();
    Ok(())
}

pub fn cmd_info(data: &DataArgs) -> anyhow::Result<()> {
    section("Series Info");

    let series = data.load()?;
    let span = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => format!("{} → {}", first, last),
        _ => "-".to_string(),
    };
    let observed: Vec<f64> = series.iter().filter_map(|o| o.value).collect();
    let mean = if observed.is_empty() {
        None
    } else {
        Some(observed.iter().sum::<f64>() / observed.len() as f64)
    };

    println!("  {:<12} {}", muted("File"), data.data.display());
    println!("  {:<12} {}", muted("Days"), series.len());
    println!("  {:<12} {}", muted("Span"), span);
    println!("  {:<12} {}", muted("Nulls"), series.null_count());
    println!("  {:<12} {}", muted("Gaps"), series.gap_count());
    println!("  {:<12} {}", muted("Mean"), fmt_opt(mean));
    println!(
        "  {:<12} {}",
        muted("Range"),
        match (
            observed.iter().copied().reduce(f64::min),
            observed.iter().copied().reduce(f64::max),
        ) {
            (Some(lo), Some(hi)) => format!("{:.2} .. {:.2}", lo, hi),
            _ => "-".to_string(),
        }
    );
    println!();
    Ok(())
}

pub fn cmd_config() -> anyhow::Result<()> {
    println!("{}", PipelineConfig::default().to_json_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "pageview-forecast",
            "run",
            "--data",
            "views.csv",
            "--lags",
            "3",
            "--hidden",
            "8,4,2",
            "--no-calendar",
            "--scaler",
            "robust",
            "--cutoff",
            "2024-02-01",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.lags, 3);
        assert_eq!(config.model.hidden_layers, vec![8, 4, 2]);
        assert!(!config.include_calendar);
        assert_eq!(config.scaler, ScalerType::Robust);
        assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::try_parse_from(["pageview-forecast", "run", "--data", "v.csv", "--lags", "0"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }
}
