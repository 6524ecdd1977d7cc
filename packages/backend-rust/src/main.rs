use std::process::ExitCode;

use recall_backend::config::Config;
use recall_backend::dataset::{
    load_memory_items, load_speech_samples, synthetic_items, synthetic_speech,
};
use recall_backend::logging::init_tracing;
use recall_backend::persistence::{ModelStore, REPORT_FILE};
use recall_backend::report::ClinicianReport;
use recall_backend::simulation::{simulate_sessions, SimulationOptions};
use recall_backend::{RecallEngine, ServiceResult};

const SYNTHETIC_SPEECH_SAMPLES: usize = 500;
const SYNTHETIC_ITEMS: usize = 30;
const DEFAULT_DATA_SEED: u64 = 42;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "training run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> ServiceResult<()> {
    let engine = RecallEngine::new(config.scheduler.clone(), config.ridge_lambda)?;
    let data_seed = config.scheduler.seed.unwrap_or(DEFAULT_DATA_SEED);

    let samples = match &config.speech_data {
        Some(path) => load_speech_samples(path)?,
        None => synthetic_speech(SYNTHETIC_SPEECH_SAMPLES, data_seed),
    };
    let metrics = engine.train_speech_model(&samples)?;

    let items = match &config.items_data {
        Some(path) => load_memory_items(path)?,
        None => synthetic_items(SYNTHETIC_ITEMS, data_seed),
    };
    let options = SimulationOptions {
        sessions: config.sim_sessions,
        items_per_session: config.sim_items_per_session,
        seed: config.scheduler.seed,
    };
    let summaries = simulate_sessions(&engine, &items, &options)?;

    let store = ModelStore::new(&config.model_dir);
    store.save_engine(&engine)?;

    let report = ClinicianReport::build(
        &summaries,
        Some(&metrics),
        chrono::Local::now().date_naive(),
    );
    let report_path = store.write_json(REPORT_FILE, &report)?;

    let diagnostics = engine.diagnose();
    tracing::info!(
        sessions = report.total_sessions,
        accuracy = report.overall_accuracy,
        latency = report.overall_latency,
        trend = ?report.performance_trend,
        visited_entries = diagnostics.visited_entries,
        report = %report_path.display(),
        "training and simulation complete"
    );
    Ok(())
}
