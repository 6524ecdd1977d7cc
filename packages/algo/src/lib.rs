//! # recall-algo - Spaced-Retrieval Core Algorithms
//!
//! Pure Rust algorithms for memory-training sessions:
//!
//! - **Q-Learning Scheduler** - tabular reinforcement learner that picks the
//!   review interval for each memory item
//! - **Speech Load Model** - closed-form ridge regression mapping speech
//!   biomarkers to a cognitive-load band
//!
//! ## Module Structure
//!
//! - [`qlearning`] - scheduler, value table, reward shaping, snapshots
//! - [`speech`] - speech features and the load-band model
//! - [`ridge`] - generic closed-form ridge regression
//! - [`matrix`] - Cholesky factorisation and dense helpers
//! - [`sanitize`] - finite checks, neutral arithmetic, table diagnostics
//! - [`types`] - shared state types and constants
//! - [`error`] - error taxonomy
//!
//! No module performs I/O; persistence and locking belong to the host.
//!
//! ## Example
//!
//! ```rust
//! use recall_algo::{Difficulty, LoadBand, QLearningScheduler, SchedulerConfig};
//!
//! let mut scheduler = QLearningScheduler::new(SchedulerConfig::default().with_seed(1)).unwrap();
//! let interval = scheduler.get_next_interval(42, Difficulty::Hard, LoadBand::Moderate);
//! assert!([30, 60, 120].contains(&interval));
//!
//! scheduler.record_result(42, false, 7.0, LoadBand::Moderate, 0).unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod error;
pub mod matrix;
pub mod qlearning;
pub mod ridge;
pub mod sanitize;
pub mod speech;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{AlgoError, AlgoResult};

pub use types::*;

pub use qlearning::{
    apply_safety_overrides, calculate_reward, IntervalDecision, QLearningScheduler, QTable,
    SchedulerConfig, SchedulerSnapshot, SNAPSHOT_VERSION,
};

pub use ridge::{FitMetrics, RidgeRegression};

pub use speech::{
    RegressionRecord, SpeechFeatures, SpeechLoadModel, SpeechSample, DEFAULT_RIDGE_LAMBDA,
    SPEECH_FEATURE_NAMES,
};
