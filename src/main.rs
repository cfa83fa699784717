//! airq - Air-quality time-series forecasting CLI
//!
//! # Usage
//!
//! ```bash
//! # Generate and store a sample dataset
//! airq sample --city london
//!
//! # Or load your own records (JSON array of objects with a `date` field)
//! airq load data/readings.json
//!
//! # Train on the stored series and save the model
//! airq train --target pm25 --window 7 --epochs 50
//!
//! # Predict
//! airq predict historical --steps 10
//! airq predict future --steps 7
//! airq predict custom pm10=80 no2=35 o3=0.04
//! ```
//!
//! # Environment Variables
//!
//! - `AIRQ_CONFIG`: Path to a TOML config file (default: ./airq.toml)
//! - `AIRQ_STORE`: sled directory for stored data and model
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use airq::config::{self, AirqConfig};
use airq::persistence::{self, SeriesSnapshot};
use airq::pipeline::default_features;
use airq::sample;
use airq::types::{feature_unit, parse_date, AqiCategory, Architecture, Observation, PredictionResult};
use airq::{
    KeyValueStore, NeuralForecaster, PipelineState, PredictionRequest, Series, SledStore,
    TrainingRequest,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "airq")]
#[command(about = "Air-quality time-series forecasting")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (default: $AIRQ_CONFIG, then ./airq.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the sled store directory from the config
    #[arg(long, global = true, env = "AIRQ_STORE", value_name = "DIR")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Generate a synthetic city dataset and store it
    Sample {
        /// beijing, london, delhi (anything else: generic sample city)
        #[arg(long)]
        city: Option<String>,
        /// Number of daily observations
        #[arg(long)]
        days: Option<usize>,
        /// Seed for repeatable data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Load observations from a JSON array of records and store them
    Load {
        /// Path to the JSON file
        path: PathBuf,
    },

    /// Train a model on the stored series and save it
    Train {
        /// Feature to predict (default: pm25, then aqi)
        #[arg(long)]
        target: Option<String>,
        /// Comma-separated input features (default: every other feature)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,
        /// Observations per input window
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
        /// dense, linear or recurrent
        #[arg(long)]
        architecture: Option<Architecture>,
    },

    /// Predict with the saved model
    Predict {
        #[command(subcommand)]
        mode: PredictCommand,
    },

    /// Show the stored series and model
    Status,

    /// Delete the stored model (and, unless --model-only, the series)
    Reset {
        #[arg(long)]
        model_only: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum PredictCommand {
    /// Replay the last N observations against their actual values
    Historical {
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Forecast N days past the end of the series
    Future {
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Predict from one set of feature values
    Custom {
        /// Date of the reading (default: day after the stored series)
        #[arg(long)]
        date: Option<String>,
        /// feature=value pairs
        #[arg(value_parser = parse_feature_value, required = true)]
        values: Vec<(String, f64)>,
    },
}

fn parse_feature_value(raw: &str) -> std::result::Result<(String, f64), String> {
    let (feature, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected feature=value, got '{raw}'"))?;
    let feature = feature.trim();
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok((feature.to_string(), v)),
        _ => Err(format!("Invalid value for {feature}")),
    }
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_sample(
    store: &dyn KeyValueStore,
    cfg: &AirqConfig,
    city: Option<String>,
    days: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let profile = sample::city_profile(city.as_deref().unwrap_or(&cfg.data.sample_city));
    let days = days.unwrap_or(cfg.data.sample_days);
    let mut rng = match seed.or(cfg.data.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let series = sample::city_series(&profile, days, &mut rng);
    let snapshot = SeriesSnapshot::new(format!("sample:{}", profile.key), series);
    persistence::save_series(store, &snapshot)?;

    println!("{}", profile.title);
    print_series_summary(&snapshot);
    Ok(())
}

fn run_load(store: &dyn KeyValueStore, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
    let series = Series::from_records(&records)?;
    if series.is_empty() {
        bail!("{} contains no records", path.display());
    }

    let snapshot = SeriesSnapshot::new(path.display().to_string(), series);
    persistence::save_series(store, &snapshot)?;
    print_series_summary(&snapshot);
    Ok(())
}

struct TrainOverrides {
    target: Option<String>,
    features: Vec<String>,
    window: Option<usize>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    architecture: Option<Architecture>,
}

async fn run_train(store: &dyn KeyValueStore, cfg: &AirqConfig, args: TrainOverrides) -> Result<()> {
    let snapshot = persistence::load_series(store)?
        .context("No stored data: run `airq sample` or `airq load` first")?;
    let series = snapshot.data;

    let target = args
        .target
        .or_else(|| cfg.training.target.clone())
        .or_else(|| series.default_target())
        .context("Stored series has no features")?;
    let features = if !args.features.is_empty() {
        args.features
    } else if !cfg.training.features.is_empty() {
        cfg.training.features.clone()
    } else {
        default_features(&series, &target)
    };

    let mut forecaster_config = cfg.training.forecaster_config();
    if let Some(epochs) = args.epochs {
        forecaster_config.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        forecaster_config.batch_size = batch_size;
    }
    if let Some(lr) = args.learning_rate {
        forecaster_config.learning_rate = lr;
    }
    if let Some(architecture) = args.architecture {
        forecaster_config.architecture = architecture;
    }
    let epochs = forecaster_config.epochs;

    let request = TrainingRequest::new(
        features,
        target,
        args.window.unwrap_or(cfg.training.window_size),
    )
    .with_config(forecaster_config);

    let mut state = PipelineState::new();
    state.load_series(series);
    let mut session = state
        .start_training(&NeuralForecaster::new(), request)
        .context("Failed to start training")?;

    // Ctrl+C stops training between epochs
    let cancel_token = session.cancellation_token();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        warn!("Received Ctrl+C, cancelling training...");
        cancel_token.cancel();
    });

    while let Some(progress) = session.next_progress().await {
        info!(
            epoch = progress.epoch + 1,
            epochs,
            loss = format_args!("{:.4}", progress.training_loss),
            val_loss = ?progress.validation_loss,
            "Training"
        );
    }

    let trained = session.finish().await.context("Training failed")?;
    persistence::save_pipeline(store, &trained)?;

    println!("Model trained and saved");
    println!("  target:       {}", trained.target);
    println!("  features:     {}", trained.features.join(", "));
    println!("  window:       {}", trained.window_size);
    println!("  architecture: {}", trained.config.architecture);
    if let Some(loss) = trained.final_loss() {
        println!("  final loss:   {loss:.4}");
    }
    if let Some(eval) = &trained.evaluation {
        println!(
            "  held-out:     MSE {:.4}  MAE {:.4}  RMSE {:.4}  ({} samples)",
            eval.mse, eval.mae, eval.rmse, eval.samples
        );
        println!(
            "  MAE in {}:   {:.2} {}",
            trained.target,
            eval.denormalized_mae,
            feature_unit(&trained.target)
        );
    }
    Ok(())
}

fn run_predict(store: &dyn KeyValueStore, cfg: &AirqConfig, mode: PredictCommand) -> Result<()> {
    let trained = persistence::load_pipeline(store)?
        .context("No saved model: run `airq train` first")?;
    let series = persistence::load_series(store)?
        .map(|s| s.data)
        .unwrap_or_default();

    let horizon = cfg.prediction.horizon_days;
    let request = match mode {
        PredictCommand::Historical { steps } => PredictionRequest::Historical {
            steps: steps.unwrap_or(horizon),
        },
        PredictCommand::Future { steps } => PredictionRequest::Future {
            steps: steps.unwrap_or(horizon),
        },
        PredictCommand::Custom { date, values } => {
            let date = match date {
                Some(raw) => parse_date(&raw).with_context(|| format!("Invalid date '{raw}'"))?,
                None => series
                    .last_date()
                    .and_then(|d| d.succ_opt())
                    .unwrap_or_else(|| chrono::Utc::now().date_naive()),
            };
            let input = values
                .into_iter()
                .fold(Observation::new(date), |obs, (feature, value)| obs.with(&feature, value));
            PredictionRequest::Custom { input }
        }
    };

    let result = trained.predict(&series, &request)?;
    print_prediction(&result)
}

fn run_status(store: &dyn KeyValueStore) -> Result<()> {
    println!("Store: {}", store.backend_name());
    match persistence::load_series(store)? {
        Some(snapshot) => print_series_summary(&snapshot),
        None => println!("No stored data"),
    }

    match persistence::load_pipeline(store)? {
        Some(trained) => {
            println!("Model:");
            println!("  target:       {}", trained.target);
            println!("  features:     {}", trained.features.join(", "));
            println!("  window:       {}", trained.window_size);
            println!("  architecture: {}", trained.model.architecture());
            println!("  epochs:       {}", trained.history.len());
            if let Some(loss) = trained.final_loss() {
                println!("  final loss:   {loss:.4}");
            }
            if let Some(eval) = &trained.evaluation {
                println!("  held-out MAE: {:.2} {}", eval.denormalized_mae, feature_unit(&trained.target));
            }
            println!("  trained at:   {}", trained.trained_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => println!("No saved model"),
    }
    Ok(())
}

fn run_reset(store: &dyn KeyValueStore, model_only: bool) -> Result<()> {
    if model_only {
        persistence::clear_pipeline(store)?;
        println!("Saved model deleted");
    } else {
        persistence::clear_all(store)?;
        println!("Stored data and model deleted");
    }
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_series_summary(snapshot: &SeriesSnapshot) {
    let series = &snapshot.data;
    println!("Data: {} ({} observations)", snapshot.source, series.len());
    if let (Some(first), Some(last)) = (series.observations().first(), series.last()) {
        println!("  range:    {} .. {}", first.date, last.date);
    }
    println!("  features: {}", series.available_features().join(", "));
}

fn print_prediction(result: &PredictionResult) -> Result<()> {
    let unit = feature_unit(&result.target);
    let show_category = result.target == "aqi";

    println!("{} ({})", result.mode.title(), result.target);
    if result.is_empty() {
        println!("  (no points)");
        return Ok(());
    }

    println!("  {:<12} {:>12} {:>12}", "date", "predicted", "actual");
    for point in &result.points {
        let actual = point
            .actual
            .map_or_else(|| "-".to_string(), |a| format!("{a:.2}"));
        let category = if show_category {
            format!("  {}", AqiCategory::from_aqi(point.predicted))
        } else {
            String::new()
        };
        println!(
            "  {:<12} {:>12.2} {:>12}{category}",
            point.date.to_string(),
            point.predicted,
            actual
        );
    }

    if let Some(metrics) = result.score() {
        let metrics = metrics?;
        println!(
            "  MSE {:.3}  MAE {:.3}  RMSE {:.3} {unit}",
            metrics.mse, metrics.mae, metrics.rmse
        );
    }
    if let Some(summary) = result.summary() {
        println!(
            "  avg {:.2}  min {:.2}  max {:.2} {unit}",
            summary.mean, summary.min, summary.max
        );
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let airq_config = match &args.config {
        Some(path) => AirqConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AirqConfig::load(),
    };
    config::init(airq_config);
    let cfg = config::get();

    let store_path = args.store.clone().unwrap_or_else(|| cfg.data.store_path.clone());
    let store = SledStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

    match args.command {
        SubCommand::Sample { city, days, seed } => run_sample(&store, cfg, city, days, seed),
        SubCommand::Load { path } => run_load(&store, &path),
        SubCommand::Train {
            target,
            features,
            window,
            epochs,
            batch_size,
            learning_rate,
            architecture,
        } => {
            let overrides = TrainOverrides {
                target,
                features,
                window,
                epochs,
                batch_size,
                learning_rate,
                architecture,
            };
            run_train(&store, cfg, overrides).await
        }
        SubCommand::Predict { mode } => run_predict(&store, cfg, mode),
        SubCommand::Status => run_status(&store),
        SubCommand::Reset { model_only } => run_reset(&store, model_only),
    }
}
