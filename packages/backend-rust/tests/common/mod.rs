#![allow(dead_code)]

use recall_algo::SchedulerConfig;
use recall_backend::dataset::synthetic_speech;
use recall_backend::RecallEngine;

pub const TEST_SEED: u64 = 2024;

pub fn test_engine(epsilon: f64) -> RecallEngine {
    let config = SchedulerConfig::default()
        .with_seed(TEST_SEED)
        .with_epsilon(epsilon);
    RecallEngine::new(config, 0.01).expect("valid test configuration")
}

pub fn trained_engine(epsilon: f64) -> RecallEngine {
    let engine = test_engine(epsilon);
    engine
        .train_speech_model(&synthetic_speech(300, TEST_SEED))
        .expect("synthetic speech data is well conditioned");
    engine
}
