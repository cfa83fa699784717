//! Window demo: train on a synthetic PM2.5 series and forecast one day ahead
//!
//! ```bash
//! cargo run --release --bin window-demo -- --points 600 --window 12
//! ```
//!
//! Prints the predicted next value and the window of actual readings it was
//! predicted from.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use airq::sample;
use airq::{
    Architecture, ForecasterConfig, NeuralForecaster, PipelineState, PredictionRequest, Series,
    TrainingRequest,
};

const FEATURE: &str = "pm25";

#[derive(Parser, Debug)]
#[command(name = "window-demo", about = "Sliding-window PM2.5 forecasting demo")]
struct CliArgs {
    /// Length of the synthetic series
    #[arg(long, default_value_t = 600)]
    points: usize,

    /// Observations per input window
    #[arg(long, default_value_t = 12)]
    window: usize,

    #[arg(long, default_value_t = 40)]
    epochs: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let values = sample::synthetic_pm(args.points, &mut rng);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let series = Series::from_values(FEATURE, start, &values);
    info!(points = series.len(), window = args.window, "Generated synthetic series");

    let config = ForecasterConfig {
        architecture: Architecture::Dense,
        epochs: args.epochs,
        batch_size: 32,
        learning_rate: 0.01,
        seed: args.seed,
        ..ForecasterConfig::default()
    };
    let request = TrainingRequest::new(vec![FEATURE.to_string()], FEATURE, args.window)
        .with_config(config);

    let mut state = PipelineState::new();
    state.load_series(series);
    let mut session = state.start_training(&NeuralForecaster::new(), request)?;
    while let Some(progress) = session.next_progress().await {
        if (progress.epoch + 1) % 10 == 0 {
            info!(
                epoch = progress.epoch + 1,
                loss = format_args!("{:.4}", progress.training_loss),
                "Training"
            );
        }
    }
    state.install(session.finish().await?);

    let result = state.predict(&PredictionRequest::Future { steps: 1 })?;
    let point = result.points.first().context("forecast returned no points")?;

    let input: Vec<String> = values
        .iter()
        .skip(values.len().saturating_sub(args.window))
        .map(|v| format!("{v:.1}"))
        .collect();
    println!("Input window ({} days): [{}]", args.window, input.join(", "));
    println!("Predicted {FEATURE} for {}: {:.2}", point.date, point.predicted);
    Ok(())
}
