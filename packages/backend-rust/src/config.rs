use std::path::PathBuf;

use recall_algo::{SchedulerConfig, DEFAULT_RIDGE_LAMBDA};

pub const DEFAULT_MODEL_DIR: &str = "./outputs";
pub const DEFAULT_SIM_SESSIONS: usize = 40;
pub const DEFAULT_SIM_ITEMS_PER_SESSION: usize = 12;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub model_dir: PathBuf,
    /// Labelled speech samples (JSON array or JSON Lines); synthetic data when absent
    pub speech_data: Option<PathBuf>,
    /// Memory items (JSON array or JSON Lines); synthetic items when absent
    pub items_data: Option<PathBuf>,
    pub scheduler: SchedulerConfig,
    pub ridge_lambda: f64,
    pub sim_sessions: usize,
    pub sim_items_per_session: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_f64 = |key: &str, default: f64| {
            lookup(key)
                .and_then(|value| value.trim().parse::<f64>().ok())
                .unwrap_or(default)
        };
        let parse_usize = |key: &str, default: usize| {
            lookup(key)
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };
        let path = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            learning_rate: parse_f64("RECALL_LEARNING_RATE", defaults.learning_rate),
            discount_factor: parse_f64("RECALL_DISCOUNT_FACTOR", defaults.discount_factor),
            epsilon: parse_f64("RECALL_EPSILON", defaults.epsilon),
            max_streak: lookup("RECALL_MAX_STREAK")
                .and_then(|value| value.trim().parse::<u8>().ok())
                .unwrap_or(defaults.max_streak),
            seed: lookup("RECALL_SEED").and_then(|value| value.trim().parse::<u64>().ok()),
            ..defaults
        };

        Self {
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            model_dir: path("RECALL_MODEL_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            speech_data: path("RECALL_SPEECH_DATA"),
            items_data: path("RECALL_ITEMS_DATA"),
            scheduler,
            ridge_lambda: parse_f64("RECALL_RIDGE_LAMBDA", DEFAULT_RIDGE_LAMBDA),
            sim_sessions: parse_usize("RECALL_SIM_SESSIONS", DEFAULT_SIM_SESSIONS),
            sim_items_per_session: parse_usize(
                "RECALL_SIM_ITEMS_PER_SESSION",
                DEFAULT_SIM_ITEMS_PER_SESSION,
            ),
        }
    }
}
