#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line tools for the accident risk model.
//!
//! Trains a model from labelled accident CSV data, runs batch predictions
//! over a query file, inspects a saved model, loads known locations into the
//! locations database and starts the API server.

mod locations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use accident_risk_features::dataset::{QueryTable, TrainingSet};
use accident_risk_model::{BoosterConfig, Classifier, PredictionSession};
use clap::{Parser, Subcommand};

/// Feature importances printed after training.
const TOP_FEATURES: usize = 10;

#[derive(Parser)]
#[command(name = "accident_risk", about = "Accident risk model tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model on labelled accident data and save it
    Train {
        /// Training CSV with a `Target` column
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "model.json")]
        model: PathBuf,
        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        holdout: f64,
        #[arg(long)]
        n_estimators: Option<usize>,
        #[arg(long)]
        max_depth: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
    },
    /// Predict every row of a query CSV and write the results as CSV
    Predict {
        #[arg(long, default_value = "model.json")]
        model: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print a saved model's features and size
    Inspect {
        #[arg(long, default_value = "model.json")]
        model: PathBuf,
    },
    /// Load known locations from CSV into the locations database
    LoadLocations {
        #[arg(long)]
        input: PathBuf,
        /// Defaults to `LOCATIONS_DB`, then `locations.db`
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Start the API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            model,
            holdout,
            n_estimators,
            max_depth,
            learning_rate,
        } => {
            let defaults = BoosterConfig::default();
            let config = BoosterConfig {
                n_estimators: n_estimators.unwrap_or(defaults.n_estimators),
                max_depth: max_depth.unwrap_or(defaults.max_depth),
                learning_rate: learning_rate.unwrap_or(defaults.learning_rate),
                ..defaults
            };
            train(&data, &model, holdout, config)?;
        }
        Commands::Predict {
            model,
            input,
            output,
        } => predict(&model, &input, &output)?,
        Commands::Inspect { model } => inspect(&model)?,
        Commands::LoadLocations { input, db } => {
            let db = db.unwrap_or_else(accident_risk_database::db::path_from_env);
            load_locations(&input, &db).await?;
        }
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(accident_risk_server::run_server())
            })
            .await??;
        }
    }

    Ok(())
}

fn train(
    data: &Path,
    model: &Path,
    holdout: f64,
    config: BoosterConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Loading training data from {}...", data.display());
    let set = TrainingSet::from_path(data)?;
    log::info!(
        "Encoded {} rows ({} positive)",
        set.len(),
        set.positives()
    );

    let (train_set, holdout_set) = set.split(holdout)?;

    let mut classifier = Classifier::new(config);
    classifier.fit_set(&train_set)?;

    if holdout_set.is_empty() {
        log::info!("No hold-out rows, skipping evaluation");
    } else {
        let accuracy = classifier.evaluate(&holdout_set)?;
        log::info!(
            "Hold-out accuracy: {:.2}% on {} rows",
            accuracy * 100.0,
            holdout_set.len()
        );
    }

    let mut importances = classifier.feature_importances();
    importances.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (feature, importance) in importances.iter().take(TOP_FEATURES) {
        log::info!("  {feature}: {importance:.4}");
    }

    classifier.save_model(model)?;
    log::info!("Saved model to {}", model.display());
    Ok(())
}

fn predict(model: &Path, input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let session = PredictionSession::new(Arc::new(Classifier::load_model(model)?));

    let (index, features) = QueryTable::from_path(input)?.into_parts();
    session.predict(&features, &index, "list")?;
    session.to_csv(output)?;

    if let Some(table) = session.last_prediction() {
        log::info!(
            "{} of {} rows predicted as accidents",
            table.positives(),
            table.len()
        );
    }
    Ok(())
}

fn inspect(model: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Classifier::load_model(model)?;
    let config = classifier.config();

    println!("Model: {}", model.display());
    println!(
        "Trees: {} (depth {}, learning rate {})",
        classifier.n_trees(),
        config.max_depth,
        config.learning_rate
    );
    println!("Features:");
    for (name, (_, importance)) in classifier
        .feature_names()
        .iter()
        .zip(classifier.feature_importances())
    {
        println!("  {name:<20} {importance:.4}");
    }
    Ok(())
}

async fn load_locations(input: &Path, db_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = locations::read_locations(input)?;
    if file.skipped > 0 {
        log::warn!("Skipped {} rows without valid coordinates", file.skipped);
    }

    let db = accident_risk_database::create(db_path).await?;
    let inserted =
        accident_risk_database::queries::insert_locations(db.as_ref(), &file.locations).await?;
    let zips =
        accident_risk_database::queries::insert_zip_codes(db.as_ref(), &file.zip_codes).await?;

    log::info!(
        "Loaded {inserted} locations and {zips} new zip codes into {}",
        db_path.display()
    );
    Ok(())
}
