//! Thread-safe host for the scheduler and the speech load model.
//!
//! All items share one value table, so a single mutex serialises every
//! decision and update. The load model is read-mostly and sits behind a
//! read-write lock; retraining builds the new model before taking the write
//! lock.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use recall_algo::{
    AlgoError, Difficulty, FitMetrics, IntervalDecision, ItemId, ItemRecord, ItemStatistics,
    LoadBand, QLearningScheduler, RegressionRecord, SchedulerConfig, SchedulerSnapshot,
    SessionRecord, SpeechFeatures, SpeechLoadModel, SpeechSample, TableDiagnostics,
};

use crate::error::ServiceResult;

pub struct RecallEngine {
    scheduler: Mutex<QLearningScheduler>,
    speech_model: RwLock<Option<SpeechLoadModel>>,
    ridge_lambda: f64,
}

impl RecallEngine {
    pub fn new(config: SchedulerConfig, ridge_lambda: f64) -> ServiceResult<Self> {
        // Reject a bad lambda up front rather than on first training
        SpeechLoadModel::new(ridge_lambda)?;
        let scheduler = QLearningScheduler::new(config)?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            speech_model: RwLock::new(None),
            ridge_lambda,
        })
    }

    // ==================== Scheduling ====================

    pub fn decide(
        &self,
        item_id: impl Into<ItemId>,
        difficulty: Difficulty,
        load_band: LoadBand,
    ) -> IntervalDecision {
        let decision = self
            .scheduler
            .lock()
            .select_action(item_id, difficulty, load_band, false);
        debug!(
            item_id = %decision.item_id,
            action = decision.action,
            interval_secs = decision.interval_secs,
            explored = decision.explored,
            overridden = decision.overridden,
            load_band = %load_band,
            "scheduling decision"
        );
        decision
    }

    pub fn get_next_interval(
        &self,
        item_id: impl Into<ItemId>,
        difficulty: Difficulty,
        load_band: LoadBand,
    ) -> u32 {
        self.decide(item_id, difficulty, load_band).interval_secs
    }

    /// Entry point for callers holding raw values: a 1-based difficulty level
    /// and a band label.
    pub fn get_next_interval_raw(
        &self,
        item_id: impl Into<ItemId>,
        difficulty_level: u32,
        load_band: &str,
    ) -> ServiceResult<u32> {
        let band = parse_band(load_band)?;
        Ok(self.get_next_interval(item_id, Difficulty::from_level(difficulty_level), band))
    }

    /// Record the outcome of the last decision for `item_id`.
    ///
    /// The stored difficulty is authoritative; a different `difficulty`
    /// argument is ignored.
    pub fn record_result(
        &self,
        item_id: impl Into<ItemId>,
        correct: bool,
        latency_sec: f64,
        difficulty: Difficulty,
        load_band: LoadBand,
    ) -> ServiceResult<SessionRecord> {
        let item_id = item_id.into();
        let recorded_at = chrono::Utc::now().timestamp_millis();

        let result = {
            let mut scheduler = self.scheduler.lock();
            if let Some(record) = scheduler.item_state(&item_id) {
                if record.state.difficulty != difficulty {
                    debug!(
                        item_id = %item_id,
                        stored = ?record.state.difficulty,
                        supplied = ?difficulty,
                        "ignoring supplied difficulty"
                    );
                }
            }
            scheduler.record_result(item_id.clone(), correct, latency_sec, load_band, recorded_at)
        };

        match result {
            Ok(session) => {
                debug!(
                    item_id = %item_id,
                    correct,
                    latency_sec,
                    reward = session.reward,
                    streak = session.new_state.streak,
                    "result recorded"
                );
                Ok(session)
            }
            Err(err) => {
                match &err {
                    AlgoError::UnknownItem(_) => {
                        warn!(item_id = %item_id, "result for unscheduled item")
                    }
                    other => warn!(item_id = %item_id, error = %other, "rejected result"),
                }
                Err(err.into())
            }
        }
    }

    pub fn record_result_raw(
        &self,
        item_id: impl Into<ItemId>,
        correct: bool,
        latency_sec: f64,
        difficulty_level: u32,
        load_band: &str,
    ) -> ServiceResult<SessionRecord> {
        let band = parse_band(load_band)?;
        self.record_result(
            item_id,
            correct,
            latency_sec,
            Difficulty::from_level(difficulty_level),
            band,
        )
    }

    pub fn get_item_statistics(&self, item_id: &ItemId) -> Option<ItemStatistics> {
        self.scheduler.lock().get_item_statistics(item_id)
    }

    pub fn item_state(&self, item_id: &ItemId) -> Option<ItemRecord> {
        self.scheduler.lock().item_state(item_id).cloned()
    }

    pub fn diagnose(&self) -> TableDiagnostics {
        self.scheduler.lock().diagnose()
    }

    pub fn reset_scheduler(&self) {
        self.scheduler.lock().reset();
        info!("scheduler reset");
    }

    /// Copy of the scheduler state; the lock is released on return.
    pub fn scheduler_snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.lock().snapshot()
    }

    /// Install a scheduler snapshot and, when given, a load model record.
    /// Both are validated first; on error the engine is left as it was.
    pub fn restore_models(
        &self,
        snapshot: SchedulerSnapshot,
        speech: Option<RegressionRecord>,
    ) -> ServiceResult<()> {
        let scheduler = QLearningScheduler::from_snapshot(snapshot)?;
        let speech_model = speech.map(SpeechLoadModel::from_record).transpose()?;

        let items = scheduler.item_count();
        let has_speech_model = speech_model.is_some();
        *self.scheduler.lock() = scheduler;
        if let Some(model) = speech_model {
            *self.speech_model.write() = Some(model);
        }
        info!(items, has_speech_model, "engine restored");
        Ok(())
    }

    // ==================== Load Model ====================

    pub fn train_speech_model(&self, samples: &[SpeechSample]) -> ServiceResult<FitMetrics> {
        let mut model = SpeechLoadModel::new(self.ridge_lambda)?;
        let metrics = model.fit(samples)?;
        *self.speech_model.write() = Some(model);
        info!(
            samples = metrics.samples,
            mse = metrics.mse,
            r2 = metrics.r2,
            "speech model fitted"
        );
        Ok(metrics)
    }

    pub fn predict_load_band(&self, features: &HashMap<String, f64>) -> ServiceResult<LoadBand> {
        let guard = self.speech_model.read();
        let model = guard.as_ref().ok_or(AlgoError::UnfittedModel)?;
        model.predict_load_band_from_map(features).map_err(|err| {
            warn!(error = %err, "load band prediction rejected");
            err.into()
        })
    }

    pub fn predict_load_bands(&self, batch: &[SpeechFeatures]) -> ServiceResult<Vec<LoadBand>> {
        let guard = self.speech_model.read();
        let model = guard.as_ref().ok_or(AlgoError::UnfittedModel)?;
        Ok(model.predict_batch(batch)?)
    }

    pub fn has_speech_model(&self) -> bool {
        self.speech_model.read().is_some()
    }

    /// Persistable form of the load model, `None` before training.
    pub fn speech_record(&self) -> ServiceResult<Option<RegressionRecord>> {
        match self.speech_model.read().as_ref() {
            Some(model) => Ok(Some(model.to_record()?)),
            None => Ok(None),
        }
    }
}

fn parse_band(label: &str) -> ServiceResult<LoadBand> {
    label.parse::<LoadBand>().map_err(|err| {
        warn!(label, "invalid load band label");
        err.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    fn engine() -> RecallEngine {
        RecallEngine::new(SchedulerConfig::default().with_seed(11), 0.01).unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let bad = SchedulerConfig {
            epsilon: 2.0,
            ..SchedulerConfig::default()
        };
        assert!(RecallEngine::new(bad, 0.01).is_err());
        assert!(RecallEngine::new(SchedulerConfig::default(), -1.0).is_err());
    }

    #[test]
    fn raw_entry_points_parse_labels() {
        let engine = engine();
        let interval = engine.get_next_interval_raw(42, 3, "moderate").unwrap();
        assert!([30, 60, 120].contains(&interval));

        assert!(matches!(
            engine.get_next_interval_raw(42, 3, "extreme"),
            Err(ServiceError::Algo(AlgoError::Validation(_)))
        ));

        let session = engine.record_result_raw(42, false, 7.0, 3, "Moderate").unwrap();
        assert_eq!(session.new_state.streak, 0);
    }

    #[test]
    fn unknown_item_is_reported() {
        let engine = engine();
        let err = engine
            .record_result("nobody", true, 1.0, Difficulty::Easy, LoadBand::Low)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Algo(AlgoError::UnknownItem(_))));
    }

    #[test]
    fn repeated_result_without_decision_is_rejected() {
        let engine = engine();
        engine.get_next_interval("b", Difficulty::Medium, LoadBand::Moderate);
        engine
            .record_result("b", true, 2.0, Difficulty::Medium, LoadBand::Moderate)
            .unwrap();
        assert!(matches!(
            engine.record_result("b", true, 2.0, Difficulty::Medium, LoadBand::Moderate),
            Err(ServiceError::Algo(AlgoError::Validation(_)))
        ));
        let stats = engine.get_item_statistics(&ItemId::from("b")).unwrap();
        assert_eq!(stats.total_sessions, 1);
    }

    #[test]
    fn predict_requires_training() {
        let engine = engine();
        assert!(!engine.has_speech_model());
        assert!(matches!(
            engine.predict_load_band(&HashMap::new()),
            Err(ServiceError::Algo(AlgoError::UnfittedModel))
        ));
        assert!(engine.speech_record().unwrap().is_none());
    }

    #[test]
    fn reset_forgets_items() {
        let engine = engine();
        engine.get_next_interval("a", Difficulty::Easy, LoadBand::Low);
        engine
            .record_result("a", true, 1.0, Difficulty::Easy, LoadBand::Low)
            .unwrap();
        assert!(engine.diagnose().visited_entries > 0);

        engine.reset_scheduler();
        assert!(engine.item_state(&ItemId::from("a")).is_none());
        assert_eq!(engine.diagnose().visited_entries, 0);
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RecallEngine>();
    }
}
