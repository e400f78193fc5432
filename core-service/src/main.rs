//! Threat Fusion - Main Entry Point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use threat_fusion_core::constants;
use threat_fusion_core::logic::dataset::{load_records, read_values};
use threat_fusion_core::{DetectionService, EngineConfig, FusionResult};

#[derive(Parser)]
#[command(name = "threat-fusion")]
#[command(version, about = "Multi-model anomaly detection for security events")]
struct Cli {
    /// Data directory (models, alert database, reports)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train all models from a labeled dataset and save them
    Train {
        /// JSON array, JSON object or JSON Lines file
        dataset: PathBuf,
    },

    /// Score records and store alerts for the anomalous ones
    Detect {
        /// Records to score
        input: PathBuf,

        /// Train from this dataset if no saved models exist
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Show the most recent alerts
    Alerts {
        #[arg(short, long, default_value_t = constants::DEFAULT_ALERT_LIMIT)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> FusionResult<()> {
    let mut config = EngineConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = EngineConfig {
            thresholds: config.thresholds,
            training: config.training,
            ..EngineConfig::with_data_dir(dir)
        };
    }

    log::info!("Starting {} v{} (data dir {:?})", constants::APP_NAME, constants::APP_VERSION, config.data_dir);
    let service = DetectionService::open(config)?;

    match cli.command {
        Commands::Train { dataset } => {
            let records = load_records(&dataset)?;
            let summary = service.train(&records)?;
            print!("{}", summary.render());
        }
        Commands::Detect { input, dataset } => {
            match dataset {
                Some(path) => service.load_or_train(|| load_records(&path))?,
                None => service.load_models()?,
            };
            let values = read_values(&input)?;
            print_json(&service.detect(&values)?)?;
        }
        Commands::Alerts { limit } => {
            print_json(&service.recent_alerts(limit)?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> FusionResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
