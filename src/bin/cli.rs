//! F1 Predict CLI - Command-line interface for the feature pipeline and race predictions

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use f1_predict::data::{FeatureStore, RaceLedger};
use f1_predict::evaluation::evaluate;
use f1_predict::models::RosterEntry;
use f1_predict::predictor::{HeuristicClassifier, OnnxClassifier, PredictionService, WinClassifier};

/// Default paths (relative to project root)
const DEFAULT_RAW_DIR: &str = "data/raw";
const DEFAULT_LEDGER: &str = "data/processed/race_data.csv";
const DEFAULT_STORE_DIR: &str = "data/store";
const DEFAULT_MODEL: &str = "data/models/f1_win_model.onnx";

#[derive(Parser)]
#[command(name = "f1-predict")]
#[command(author, version, about = "F1 race win prediction CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the Feature Store directory
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Classifier selection shared by predict and evaluate
#[derive(clap::Args)]
struct ClassifierArgs {
    /// Path to the ONNX model
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: PathBuf,

    /// Optional model metadata (feat_list, in_dim)
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Use the heuristic classifier instead of a model
    #[arg(long)]
    heuristic: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Catalog {
    Drivers,
    Constructors,
    Locations,
}

#[derive(Subcommand)]
enum Commands {
    /// Join raw schedule and results into the processed race ledger
    Process {
        /// Directory containing races.csv and results.csv
        #[arg(long, default_value = DEFAULT_RAW_DIR)]
        raw_dir: PathBuf,

        /// Output ledger CSV
        #[arg(short, long, default_value = DEFAULT_LEDGER)]
        output: PathBuf,
    },

    /// Build the Feature Store from the race ledger
    Build {
        /// Processed ledger CSV
        #[arg(long, default_value = DEFAULT_LEDGER)]
        ledger: PathBuf,
    },

    /// Rank an upcoming-race roster by win probability
    Predict {
        /// Roster JSON file: [{driverId, constructorId, grid, location}, ...]
        #[arg(short, long)]
        roster: PathBuf,

        #[command(flatten)]
        classifier: ClassifierArgs,

        /// Number of drivers to show
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// List drivers, constructors or locations known to the Feature Store
    List {
        #[arg(value_enum)]
        what: Catalog,
    },

    /// Evaluate a classifier on one held-out season
    Evaluate {
        /// Test season
        #[arg(short, long)]
        year: i32,

        #[command(flatten)]
        classifier: ClassifierArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    println!("{}", format!("F1 Predict CLI v{}", env!("CARGO_PKG_VERSION")).cyan().bold());
    println!();

    match cli.command {
        Commands::Process { raw_dir, output } => run_process(&raw_dir, &output)?,
        Commands::Build { ledger } => run_build(&ledger, &cli.store_dir)?,
        Commands::Predict {
            roster,
            classifier,
            top,
        } => run_predict(&cli.store_dir, &roster, &classifier, top)?,
        Commands::List { what } => run_list(&cli.store_dir, what)?,
        Commands::Evaluate { year, classifier } => {
            run_evaluate(&cli.store_dir, year, &classifier)?
        }
    }

    Ok(())
}

fn load_classifier(args: &ClassifierArgs) -> Result<Box<dyn WinClassifier>> {
    if args.heuristic {
        println!("{}", "Using heuristic classifier (no model)".yellow());
        return Ok(Box::new(HeuristicClassifier::new()));
    }
    let classifier = OnnxClassifier::load(&args.model, args.meta.as_deref())
        .with_context(|| format!("Failed to load model {:?}", args.model))?;
    Ok(Box::new(classifier))
}

fn load_store(store_dir: &Path) -> Result<FeatureStore> {
    FeatureStore::load(store_dir)
        .with_context(|| format!("Failed to load feature store from {:?}", store_dir))
}

fn run_process(raw_dir: &Path, output: &Path) -> Result<()> {
    println!("{}", "Processing raw data...".green());

    let ledger = RaceLedger::from_raw(raw_dir.join("races.csv"), raw_dir.join("results.csv"))
        .with_context(|| format!("Failed to process raw data in {:?}", raw_dir))?;
    if ledger.is_empty() {
        bail!("No usable result rows in {:?}", raw_dir);
    }
    ledger
        .write_csv(output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "Wrote {} rows ({} races) to {:?}",
        ledger.len(),
        ledger.race_count(),
        output
    );
    Ok(())
}

fn run_build(ledger_path: &Path, store_dir: &Path) -> Result<()> {
    println!("{}", "Building feature store...".green());

    let ledger = RaceLedger::load(ledger_path)
        .with_context(|| format!("Failed to load ledger {:?}", ledger_path))?;
    let store = FeatureStore::build(&ledger).context("Failed to build feature store")?;
    store
        .write(store_dir)
        .with_context(|| format!("Failed to write feature store to {:?}", store_dir))?;

    let encodings = store.encodings();
    println!("Rows:         {}", store.len());
    println!("Races:        {}", store.race_count());
    println!("Drivers:      {}", encodings.driver.len());
    println!("Constructors: {}", encodings.constructor.len());
    println!("Locations:    {}", encodings.location.len());
    println!("{} {:?}", "→".green(), store_dir);
    Ok(())
}

fn run_predict(
    store_dir: &Path,
    roster_path: &Path,
    classifier: &ClassifierArgs,
    top: usize,
) -> Result<()> {
    let roster: Vec<RosterEntry> = serde_json::from_str(
        &fs::read_to_string(roster_path)
            .with_context(|| format!("Failed to read roster {:?}", roster_path))?,
    )
    .with_context(|| format!("Invalid roster JSON in {:?}", roster_path))?;

    let store = load_store(store_dir)?;
    let service = PredictionService::new(Arc::new(store), load_classifier(classifier)?);
    let results = service.predict(&roster).context("Prediction failed")?;

    let known = service.list_known_drivers();
    let location = roster.first().map(|e| e.location.trim()).unwrap_or("-");
    println!("{} ({} entries)", location.yellow().bold(), roster.len());
    println!("{:>4} {:>14} {:>10}", "Rank", "Driver", "Win %");
    println!("{}", "-".repeat(30));

    for (i, result) in results.iter().take(top).enumerate() {
        let driver = if known.binary_search(&result.driver_id).is_ok() {
            result.driver_id.normal()
        } else {
            // no stored history: default features
            format!("{}*", result.driver_id).dimmed()
        };
        let pct = format!("{:.2}%", result.win_probability * 100.0);
        let pct = if i == 0 { pct.green().bold() } else { pct.normal() };
        println!("{:>4} {:>14} {:>10}", i + 1, driver, pct);
    }
    println!();

    if results.iter().any(|r| known.binary_search(&r.driver_id).is_err()) {
        println!("{}", "* no history in the feature store".dimmed());
    }
    Ok(())
}

fn run_list(store_dir: &Path, what: Catalog) -> Result<()> {
    let store = load_store(store_dir)?;
    let (title, values) = match what {
        Catalog::Drivers => ("Drivers", store.known_drivers()),
        Catalog::Constructors => ("Constructors", store.known_constructors()),
        Catalog::Locations => ("Locations", store.known_locations()),
    };

    println!("{} ({})", title.yellow().bold(), values.len());
    for value in &values {
        println!("  {}", value);
    }
    Ok(())
}

fn run_evaluate(store_dir: &Path, year: i32, classifier: &ClassifierArgs) -> Result<()> {
    println!("{}", format!("Evaluating on {} season...", year).green());

    let store = load_store(store_dir)?;
    let classifier = load_classifier(classifier)?;
    let report = evaluate(&store, classifier.as_ref(), year)
        .with_context(|| format!("Evaluation on {} failed", year))?;

    println!("Train rows (< {}): {}", year, report.train_rows);
    println!("Test rows:          {}", report.rows);
    println!("Test races:         {}", report.races);
    println!();
    println!("{}", "Metrics:".yellow().bold());
    println!("  Accuracy:         {:.4}", report.accuracy);
    println!("  Log loss:         {:.4}", report.log_loss);
    println!("  Winner precision: {:.4}", report.precision);
    println!("  Winner recall:    {:.4}", report.recall);
    println!(
        "  Top-pick hits:    {:.1}%",
        report.top_pick_hit_rate * 100.0
    );
    Ok(())
}
