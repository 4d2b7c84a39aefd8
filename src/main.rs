//! healthcast - weather-driven health risk intelligence
//!
//! Scores disease risk from weather, trains the scenario networks and
//! compares them against rule-based estimates. Every command prints a JSON
//! `Outcome` envelope on stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Rule-based disease risk for a warm, wet day
//! healthcast score --temperature 27 --humidity 82 --rainfall 12
//!
//! # Train a scenario (synthetic data unless --input is given)
//! healthcast train admission --epochs 100
//!
//! # Predict with a trained scenario
//! healthcast predict disease --temperature 31 --humidity 88 --rainfall 25
//!
//! # Validate ML vs rule-based doctor estimates
//! healthcast validate --records 50
//! ```
//!
//! # Environment Variables
//!
//! - `HEALTHCAST_CONFIG`: path to a TOML config file
//! - `RUST_LOG`: logging level (default: info)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use healthcast::config::{self, EngineConfig};
use healthcast::nn::checkpoint;
use healthcast::scenarios::features::DayContext;
use healthcast::scenarios::Scenario;
use healthcast::synthetic::is_fixed_holiday;
use healthcast::types::dew_point_celsius;
use healthcast::{
    AdmissionForecaster, DiseaseRiskForecaster, EngineError, GovernmentValidator,
    HistoricalRecord, ModelRegistry, ModelStore, Outcome, ReferenceRecord, RiskFormulaLibrary,
    SyntheticLabelGenerator, TrainedModel, TrainingEvent, TrainingHandle, WeatherReading,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "healthcast")]
#[command(about = "Weather-driven disease risk scoring and hospital demand forecasting")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "HEALTHCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Override the model database directory
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rule-based disease risk for one weather reading
    Score {
        #[command(flatten)]
        weather: WeatherArgs,

        /// Include diseases at or below the inclusion threshold
        #[arg(long)]
        all: bool,
    },

    /// Train a scenario model and persist it
    Train {
        scenario: ScenarioArg,

        /// JSON training data (records for admission/government, [reading, labels] pairs for disease)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Override the configured epoch count
        #[arg(long)]
        epochs: Option<usize>,

        /// Synthetic records to generate when no --input is given
        #[arg(long, default_value = "120")]
        records: usize,

        /// Also write the trained model as a JSON checkpoint file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Predict with a trained scenario model
    Predict {
        scenario: ScenarioArg,

        #[command(flatten)]
        weather: WeatherArgs,

        /// Admission history JSON (admission scenario)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Forecast date, YYYY-MM-DD (admission scenario, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Treat the forecast date as a public holiday
        #[arg(long)]
        holiday: bool,

        /// Population served (government scenario)
        #[arg(long, default_value = "100000")]
        population: u64,
    },

    /// Compare ML and rule-based doctor estimates against reference data
    Validate {
        /// Reference records JSON; synthetic records when absent
        #[arg(long)]
        input: Option<PathBuf>,

        /// Synthetic reference records to generate
        #[arg(long, default_value = "50")]
        records: usize,

        #[arg(long, default_value = "7")]
        seed: u64,
    },

    /// Model state for every scenario
    Status,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScenarioArg {
    Admission,
    Disease,
    Government,
}

#[derive(Args, Debug)]
struct WeatherArgs {
    #[arg(long, default_value = "")]
    city: String,
    /// Air temperature (°C)
    #[arg(long, default_value = "22")]
    temperature: f64,
    /// Relative humidity (%)
    #[arg(long, default_value = "60")]
    humidity: f64,
    /// Precipitation (mm)
    #[arg(long, default_value = "0")]
    rainfall: f64,
    /// Wind speed (km/h)
    #[arg(long, default_value = "10")]
    wind_speed: f64,
    #[arg(long, default_value = "5")]
    uv_index: f64,
    /// Surface pressure (hPa)
    #[arg(long, default_value = "1013")]
    pressure: f64,
    /// Dew point (°C); derived from temperature and humidity when absent
    #[arg(long)]
    dew_point: Option<f64>,
    /// WMO weather code
    #[arg(long, default_value = "1")]
    weather_code: u16,
}

impl WeatherArgs {
    fn reading(&self) -> WeatherReading {
        WeatherReading {
            city: self.city.clone(),
            temperature: self.temperature,
            humidity: self.humidity,
            rainfall: self.rainfall,
            wind_speed: self.wind_speed,
            uv_index: self.uv_index,
            pressure: self.pressure,
            dew_point: self
                .dew_point
                .unwrap_or_else(|| dew_point_celsius(self.temperature, self.humidity)),
            weather_code: self.weather_code,
            recorded_at: Utc::now(),
        }
    }
}

// ============================================================================
// Engine wiring
// ============================================================================

struct Engine {
    config: EngineConfig,
    registry: Arc<ModelRegistry>,
}

impl Engine {
    fn open(config: EngineConfig, db: Option<PathBuf>) -> Result<Self> {
        let path = db.unwrap_or_else(|| config.storage.model_db_path.clone());
        let store = ModelStore::open(&path)
            .with_context(|| format!("Failed to open model store at {}", path.display()))?;
        Ok(Self {
            config,
            registry: Arc::new(ModelRegistry::with_store(Arc::new(store))),
        })
    }

    fn admission(&self) -> AdmissionForecaster {
        AdmissionForecaster::from_config(Arc::clone(&self.registry), &self.config)
    }

    fn disease(&self) -> DiseaseRiskForecaster {
        DiseaseRiskForecaster::from_config(Arc::clone(&self.registry), &self.config)
    }

    fn government(&self) -> GovernmentValidator {
        GovernmentValidator::from_config(Arc::clone(&self.registry), &self.config)
    }

    /// Restore the persisted model; missing models are the normal state
    /// before first training.
    fn restore(&self, scenario: &dyn Scenario) -> Result<()> {
        if !scenario.restore()? {
            warn!(scenario = scenario.name(), "No persisted model found");
        }
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(EngineConfig::load()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_outcome<T: Serialize>(result: Result<T, EngineError>) -> Result<()> {
    let outcome = Outcome::from_result(result);
    if let Outcome::Failure { kind, message } = &outcome {
        warn!(kind = %kind, "{}", message);
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_score(weather: &WeatherArgs, all: bool) -> Result<()> {
    let library = RiskFormulaLibrary::from_config(&config::get().risk);
    let reading = weather.reading();
    let result = if all {
        library.score_all(&reading)
    } else {
        library.predict(&reading)
    };
    print_outcome(result)
}

/// Run a training job, logging progress events as they arrive.
async fn drive_training(handle: TrainingHandle) -> Result<Arc<TrainedModel>, EngineError> {
    handle
        .wait_with_progress(|event| match event {
            TrainingEvent::Started { scenario, total_epochs, samples } => {
                info!(%scenario, total_epochs, samples, "Training started");
            }
            TrainingEvent::Epoch { epoch, total_epochs, percent, loss, mae, .. } => {
                if epoch % 10 == 0 || epoch == total_epochs {
                    info!(epoch, percent, loss, mae, "Training progress");
                }
            }
            TrainingEvent::Finished(metrics) => {
                info!(
                    final_loss = metrics.final_loss,
                    validation_mae = ?metrics.validation_mae,
                    seconds = metrics.training_seconds,
                    "Training finished"
                );
            }
        })
        .await
}

async fn run_train(
    engine: &Engine,
    scenario: ScenarioArg,
    input: Option<&Path>,
    records: usize,
    export: Option<&Path>,
) -> Result<()> {
    let seed = engine.config.training.seed;
    let job = match scenario {
        ScenarioArg::Admission => {
            let history: Vec<HistoricalRecord> = match input {
                Some(p) => read_json(p)?,
                None => {
                    let start = Utc::now().date_naive() - Duration::days(records as i64);
                    SyntheticLabelGenerator::new(seed).admission_history(start, records)
                }
            };
            engine.admission().train_job(&history)
        }
        ScenarioArg::Disease => {
            let labeled: Vec<(WeatherReading, Vec<f64>)> = match input {
                Some(p) => read_json(p)?,
                None => Vec::new(),
            };
            engine.disease().train_job(&labeled)
        }
        ScenarioArg::Government => {
            let validator = engine.government();
            let reference: Vec<ReferenceRecord> = match input {
                Some(p) => read_json(p)?,
                None => validator.synthetic_records(records, seed),
            };
            validator.train_job(&reference)
        }
    };

    let result = match job {
        Ok(handle) => drive_training(handle).await,
        Err(e) => Err(e),
    };
    if let (Ok(model), Some(path)) = (&result, export) {
        checkpoint::save_to_disk(model, path)
            .with_context(|| format!("Failed to write checkpoint {}", path.display()))?;
        info!(path = %path.display(), "Checkpoint written");
    }
    print_outcome(result.map(|model| model.metrics().clone()))
}

fn run_predict(
    engine: &Engine,
    scenario: ScenarioArg,
    weather: &WeatherArgs,
    history: Option<&Path>,
    date: Option<NaiveDate>,
    holiday: bool,
    population: u64,
) -> Result<()> {
    match scenario {
        ScenarioArg::Admission => {
            let forecaster = engine.admission();
            engine.restore(&forecaster)?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let records: Vec<HistoricalRecord> = match history {
                Some(p) => read_json(p)?,
                None => {
                    let seed = engine.config.training.seed;
                    SyntheticLabelGenerator::new(seed).admission_history(date - Duration::days(60), 60)
                }
            };
            let day = DayContext::new(date, holiday || is_fixed_holiday(date), Some(weather.temperature));
            print_outcome(forecaster.forecast(&records, day))
        }
        ScenarioArg::Disease => {
            let forecaster = engine.disease();
            engine.restore(&forecaster)?;
            print_outcome(forecaster.predict(&weather.reading()))
        }
        ScenarioArg::Government => {
            let validator = engine.government();
            engine.restore(&validator)?;
            let record = ReferenceRecord {
                location: weather.city.clone(),
                weather_snapshot: weather.reading(),
                actual_disease_case_counts: Default::default(),
                population,
            };
            print_outcome(validator.predict_doctors(&record))
        }
    }
}

fn run_validate(engine: &Engine, input: Option<&Path>, records: usize, seed: u64) -> Result<()> {
    let validator = engine.government();
    engine.restore(&validator)?;
    let reference: Vec<ReferenceRecord> = match input {
        Some(p) => read_json(p)?,
        None => validator.synthetic_records(records, seed),
    };
    print_outcome(validator.validate(&reference))
}

fn run_status(engine: &Engine) -> Result<()> {
    let admission = engine.admission();
    let disease = engine.disease();
    let government = engine.government();
    let scenarios: [&dyn Scenario; 3] = [&admission, &disease, &government];

    let mut status = serde_json::Map::new();
    for s in scenarios {
        engine.restore(s)?;
        status.insert(s.name().to_string(), serde_json::to_value(s.status())?);
    }
    print_outcome(Ok(status))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let engine_config = load_config(args.config.as_deref())?;
    config::init(engine_config.clone());

    match args.command {
        Command::Score { weather, all } => run_score(&weather, all),
        Command::Train { scenario, input, epochs, records, export } => {
            let mut engine_config = engine_config;
            if let Some(epochs) = epochs {
                engine_config.training.epochs = epochs;
            }
            let engine = Engine::open(engine_config, args.db)?;
            run_train(&engine, scenario, input.as_deref(), records, export.as_deref()).await
        }
        Command::Predict { scenario, weather, history, date, holiday, population } => {
            let engine = Engine::open(engine_config, args.db)?;
            run_predict(&engine, scenario, &weather, history.as_deref(), date, holiday, population)
        }
        Command::Validate { input, records, seed } => {
            let engine = Engine::open(engine_config, args.db)?;
            run_validate(&engine, input.as_deref(), records, seed)
        }
        Command::Status => {
            let engine = Engine::open(engine_config, args.db)?;
            run_status(&engine)
        }
    }
}
