use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use recall_algo::{RegressionRecord, SchedulerSnapshot};

use crate::engine::RecallEngine;
use crate::error::{ServiceError, ServiceResult};

pub const SCHEDULER_FILE: &str = "qlearning_model.json";
pub const SPEECH_MODEL_FILE: &str = "speech_model.json";
pub const REPORT_FILE: &str = "clinician_summary.json";

/// JSON model files under one directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn save_scheduler(&self, snapshot: &SchedulerSnapshot) -> ServiceResult<PathBuf> {
        self.write_json(SCHEDULER_FILE, snapshot)
    }

    pub fn load_scheduler(&self) -> ServiceResult<SchedulerSnapshot> {
        self.read_json(SCHEDULER_FILE)
    }

    pub fn save_speech_model(&self, record: &RegressionRecord) -> ServiceResult<PathBuf> {
        self.write_json(SPEECH_MODEL_FILE, record)
    }

    pub fn load_speech_model(&self) -> ServiceResult<RegressionRecord> {
        self.read_json(SPEECH_MODEL_FILE)
    }

    /// Persist both models. Snapshots are taken under the engine locks; the
    /// files are written after the locks are released.
    pub fn save_engine(&self, engine: &RecallEngine) -> ServiceResult<()> {
        let snapshot = engine.scheduler_snapshot();
        let speech = engine.speech_record()?;

        let path = self.save_scheduler(&snapshot)?;
        tracing::info!(path = %path.display(), items = snapshot.items.len(), "scheduler saved");

        match speech {
            Some(record) => {
                let path = self.save_speech_model(&record)?;
                tracing::info!(path = %path.display(), "speech model saved");
            }
            None => tracing::debug!("speech model not trained, skipping save"),
        }
        Ok(())
    }

    /// Load both models into `engine`. The scheduler file is required; a
    /// missing speech model file leaves the engine's load model untouched.
    /// Nothing is installed unless every file present loads and validates.
    pub fn restore_engine(&self, engine: &RecallEngine) -> ServiceResult<()> {
        let snapshot = self.load_scheduler()?;
        let speech = match self.load_speech_model() {
            Ok(record) => Some(record),
            Err(ServiceError::NotFound(path)) => {
                tracing::info!(path = %path, "no saved speech model");
                None
            }
            Err(err) => return Err(err),
        };
        engine.restore_models(snapshot, speech)
    }

    pub fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> ServiceResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(file_name);
        let tmp_path = self.path_for(&format!("{file_name}.tmp"));

        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    pub fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> ServiceResult<T> {
        let path = self.path_for(file_name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(path.display().to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_algo::{AlgoError, Difficulty, ItemId, LoadBand, SchedulerConfig};

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(matches!(store.load_scheduler(), Err(ServiceError::NotFound(_))));
        assert!(matches!(store.load_speech_model(), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn creates_directory_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("nested").join("models"));
        let engine = RecallEngine::new(SchedulerConfig::default().with_seed(3), 0.01).unwrap();

        store.save_engine(&engine).unwrap();

        assert!(store.path_for(SCHEDULER_FILE).exists());
        assert!(!store.path_for(&format!("{SCHEDULER_FILE}.tmp")).exists());
        // Untrained load model is not written
        assert!(!store.path_for(SPEECH_MODEL_FILE).exists());
    }

    fn engine_with_history() -> RecallEngine {
        let engine = RecallEngine::new(SchedulerConfig::default().with_seed(5), 0.01).unwrap();
        engine.get_next_interval("c", Difficulty::Easy, LoadBand::Low);
        engine
            .record_result("c", true, 1.0, Difficulty::Easy, LoadBand::Low)
            .unwrap();
        engine
    }

    #[test]
    fn unreadable_speech_model_leaves_engine_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.save_engine(&engine_with_history()).unwrap();
        fs::write(store.path_for(SPEECH_MODEL_FILE), b"{not json").unwrap();

        let target = RecallEngine::new(SchedulerConfig::default().with_seed(6), 0.01).unwrap();
        let before = target.scheduler_snapshot();
        assert!(matches!(
            store.restore_engine(&target),
            Err(ServiceError::Serialization(_))
        ));
        assert_eq!(target.scheduler_snapshot(), before);
        assert!(!target.has_speech_model());
    }

    #[test]
    fn invalid_speech_model_leaves_engine_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.save_engine(&engine_with_history()).unwrap();
        let wrong_names = RegressionRecord {
            coefficients: vec![0.0, 1.0],
            feature_names: vec!["loudness".to_string()],
            regularization: 0.01,
        };
        store.save_speech_model(&wrong_names).unwrap();

        let target = RecallEngine::new(SchedulerConfig::default().with_seed(6), 0.01).unwrap();
        assert!(matches!(
            store.restore_engine(&target),
            Err(ServiceError::Algo(AlgoError::Validation(_)))
        ));
        assert!(target.item_state(&ItemId::from("c")).is_none());
        assert!(!target.has_speech_model());
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        fs::write(store.path_for(SCHEDULER_FILE), b"{not json").unwrap();
        assert!(matches!(
            store.load_scheduler(),
            Err(ServiceError::Serialization(_))
        ));
    }
}
