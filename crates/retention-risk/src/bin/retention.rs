//! Command-line entry point.
//!
//! ```bash
//! retention train --config retention.toml --input snapshots.csv --model-out model.rrsk
//! retention score --model model.rrsk --field department=Art --field level=Junior ...
//! retention generate --rows 1000 --seed 42 --out snapshots.csv
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use retention_risk::data::write_snapshots_csv;
use retention_risk::persist::{load_model, save_model, save_report_json};
use retention_risk::testing::synthetic_population;
use retention_risk::{
    ConfigError, DataError, InputError, Result, RetentionConfig, ScoringRecord, TrainingPipeline,
};

#[derive(Parser)]
#[command(name = "retention", version, about = "Leakage-aware retention-risk estimation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train, cross-validate and evaluate a model on a snapshot CSV
    Train(TrainArgs),
    /// Score one what-if record with a saved model
    Score(ScoreArgs),
    /// Write a synthetic demo population as CSV
    ///
    /// Employee ids are prefixed `SYN-`; training on the file reports it as
    /// demo data.
    Generate(GenerateArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// TOML configuration file
    #[arg(long)]
    config: PathBuf,
    /// Input CSV, overriding `data.input_path`
    #[arg(long)]
    input: Option<PathBuf>,
    /// Model output path, overriding `output.model_path`
    #[arg(long)]
    model_out: Option<PathBuf>,
    /// Report output path, overriding `output.report_path`
    #[arg(long)]
    report_out: Option<PathBuf>,
}

#[derive(Args)]
struct ScoreArgs {
    /// Saved model file
    #[arg(long)]
    model: PathBuf,
    /// Record as a JSON object
    #[arg(long, conflicts_with = "field")]
    record: Option<String>,
    /// One `key=value` feature; repeat for each field
    #[arg(long, value_name = "KEY=VALUE")]
    field: Vec<String>,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value_t = 1000)]
    rows: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = "2022-01-01")]
    start: NaiveDate,
    #[arg(long, default_value = "2023-12-31")]
    end: NaiveDate,
    /// Output CSV path
    #[arg(long)]
    out: PathBuf,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Train(args) => train(args),
        Command::Score(args) => score(args),
        Command::Generate(args) => generate(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn train(args: TrainArgs) -> Result<()> {
    let config = RetentionConfig::from_file(&args.config)?;
    let input = args
        .input
        .or_else(|| config.data.input_path.clone())
        .ok_or_else(|| ConfigError::Invalid {
            field: "data.input_path",
            reason: "no input CSV given".into(),
        })?;
    let model_path = args.model_out.or_else(|| config.output.model_path.clone());
    let report_path = args.report_out.or_else(|| config.output.report_path.clone());
    let min_auc = config.evaluation.min_deploy_auc;

    let run = TrainingPipeline::new(config).run_from_csv(&input)?;
    println!("{}", run.report);
    println!("deployable: {}", run.report.is_deployable(min_auc));

    if let Some(path) = model_path {
        save_model(&run.model, &path)?;
        info!(path = %path.display(), "model written");
    }
    if let Some(path) = report_path {
        save_report_json(&run.report, &path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn score(args: ScoreArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let record = match args.record {
        Some(json) => serde_json::from_str::<ScoringRecord>(&json)
            .map_err(|e| InputError::Malformed(format!("record JSON: {e}")))?,
        None => {
            let mut record = ScoringRecord::default();
            for pair in &args.field {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    InputError::Malformed(format!("expected KEY=VALUE, got {pair:?}"))
                })?;
                record.set_field(key.trim(), value.trim())?;
            }
            record
        }
    };
    println!("{}", model.score(&record)?);
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<()> {
    let snapshots = synthetic_population(args.rows, args.start, args.end, args.seed);
    let file = File::create(&args.out).map_err(|source| DataError::Io {
        path: args.out.clone(),
        source,
    })?;
    write_snapshots_csv(BufWriter::new(file), &snapshots)?;
    info!(rows = snapshots.len(), path = %args.out.display(), "synthetic population written");
    Ok(())
}
