//! Q-Learning Review Scheduler
//!
//! Tabular one-step Q-learning over the discrete review state
//! `(difficulty, streak, latency_bin, load_band)`. Each action is one of a
//! fixed, ordered set of review intervals.
//!
//! Core principles:
//! - Epsilon-greedy selection, ties broken by the lowest action index
//! - Safety overrides applied after selection so no exploration can schedule
//!   a hard or high-load item at the longest interval
//! - The update credits the action actually chosen by the preceding decision
//!   for that item, tracked per item
//!
//! The scheduler is a plain owned value. Hosting code decides how to share it.

pub mod reward;
pub mod table;

use std::collections::BTreeMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AlgoError, AlgoResult};
use crate::sanitize::{diagnose_table, ensure_all_finite, ensure_finite, mean};
use crate::types::{
    Difficulty, ItemId, ItemRecord, ItemStatistics, LatencyBin, LoadBand, ReviewState,
    SessionRecord, TableDiagnostics, DEFAULT_INTERVALS, DEFAULT_MAX_STREAK,
};

pub use reward::{calculate_reward, MAX_REWARD, MIN_REWARD};
pub use table::QTable;

// ==================== Constants ====================

/// Version tag written into every [`SchedulerSnapshot`]
pub const SNAPSHOT_VERSION: u32 = 1;

/// Highest action index allowed for hard items or under high load
pub const SAFE_MAX_ACTION: usize = 2;

/// Lowest action index allowed for mastered easy items
pub const MASTERED_MIN_ACTION: usize = 1;

/// Streak from which an easy item counts as mastered
pub const MASTERED_STREAK: u8 = 2;

// ==================== Configuration ====================

/// Scheduler hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// α, in (0, 1]
    pub learning_rate: f64,
    /// γ, in [0, 1)
    pub discount_factor: f64,
    /// Exploration probability, in [0, 1]
    pub epsilon: f64,
    pub max_streak: u8,
    /// Candidate intervals in seconds, strictly increasing
    pub intervals: Vec<u32>,
    /// RNG seed; the system clock is used when absent
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            epsilon: 0.1,
            max_streak: DEFAULT_MAX_STREAK,
            intervals: DEFAULT_INTERVALS.to_vec(),
            seed: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn validate(&self) -> AlgoResult<()> {
        let alpha = ensure_finite("learning_rate", self.learning_rate)?;
        if alpha <= 0.0 || alpha > 1.0 {
            return Err(AlgoError::validation(format!(
                "learning_rate must be in (0, 1], got {alpha}"
            )));
        }
        let gamma = ensure_finite("discount_factor", self.discount_factor)?;
        if !(0.0..1.0).contains(&gamma) {
            return Err(AlgoError::validation(format!(
                "discount_factor must be in [0, 1), got {gamma}"
            )));
        }
        let epsilon = ensure_finite("epsilon", self.epsilon)?;
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(AlgoError::validation(format!(
                "epsilon must be in [0, 1], got {epsilon}"
            )));
        }
        if self.max_streak == 0 {
            return Err(AlgoError::validation("max_streak must be at least 1"));
        }
        if self.intervals.len() <= SAFE_MAX_ACTION {
            return Err(AlgoError::validation(format!(
                "at least {} intervals are required, got {}",
                SAFE_MAX_ACTION + 1,
                self.intervals.len()
            )));
        }
        if self.intervals.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AlgoError::validation(format!(
                "intervals must be strictly increasing, got {:?}",
                self.intervals
            )));
        }
        Ok(())
    }
}

// ==================== Decisions ====================

/// Outcome of one scheduling decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalDecision {
    pub item_id: ItemId,
    pub state: ReviewState,
    pub action: usize,
    pub interval_secs: u32,
    /// The action came from the random branch
    pub explored: bool,
    /// A safety override changed the selected action
    pub overridden: bool,
}

/// Clamp an action index according to the safety rules, in order:
/// hard items and high load never get an index above [`SAFE_MAX_ACTION`];
/// mastered easy items under low or moderate load never get an index below
/// [`MASTERED_MIN_ACTION`].
pub fn apply_safety_overrides(action: usize, state: &ReviewState) -> usize {
    let mut action = action;
    if state.difficulty.is_hardest() || state.load_band == LoadBand::High {
        action = action.min(SAFE_MAX_ACTION);
    }
    if state.difficulty.is_easiest()
        && state.streak >= MASTERED_STREAK
        && state.load_band != LoadBand::High
    {
        action = action.max(MASTERED_MIN_ACTION);
    }
    action
}

// ==================== Persistence Layout ====================

/// Serializable scheduler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub version: u32,
    pub config: SchedulerConfig,
    /// `[difficulty, streak, latency_bin, load_band, action]`
    pub dims: Vec<usize>,
    /// Row-major over `dims`
    pub q_values: Vec<f64>,
    pub items: BTreeMap<ItemId, ItemRecord>,
    pub sessions: BTreeMap<ItemId, Vec<SessionRecord>>,
}

// ==================== Scheduler ====================

#[derive(Debug, Clone)]
pub struct QLearningScheduler {
    config: SchedulerConfig,
    table: QTable,
    items: BTreeMap<ItemId, ItemRecord>,
    sessions: BTreeMap<ItemId, Vec<SessionRecord>>,
    rng: ChaCha8Rng,
}

impl QLearningScheduler {
    pub fn new(config: SchedulerConfig) -> AlgoResult<Self> {
        config.validate()?;
        let table = QTable::new(config.max_streak, config.intervals.len());
        let rng = Self::make_rng(config.seed);
        Ok(Self {
            config,
            table,
            items: BTreeMap::new(),
            sessions: BTreeMap::new(),
            rng,
        })
    }

    fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        ChaCha8Rng::seed_from_u64(seed)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn intervals(&self) -> &[u32] {
        &self.config.intervals
    }

    /// Choose an action for `item_id`, creating the item on first sight.
    ///
    /// The supplied load band replaces the item's stored band before the
    /// choice is made. `force_exploit` skips the random branch entirely and
    /// leaves the RNG untouched.
    pub fn select_action(
        &mut self,
        item_id: impl Into<ItemId>,
        difficulty: Difficulty,
        load_band: LoadBand,
        force_exploit: bool,
    ) -> IntervalDecision {
        let item_id = item_id.into();
        let record = self
            .items
            .entry(item_id.clone())
            .or_insert_with(|| ItemRecord {
                state: ReviewState::initial(difficulty, load_band),
                last_action: None,
            });
        record.state.load_band = load_band;
        let state = record.state;

        let n_actions = self.table.n_actions();
        let explored = !force_exploit && self.rng.gen::<f64>() < self.config.epsilon;
        let selected = if explored {
            self.rng.gen_range(0..n_actions)
        } else {
            self.table.best_action(&state)
        };
        let action = apply_safety_overrides(selected, &state);
        record.last_action = Some(action);

        IntervalDecision {
            item_id,
            state,
            action,
            interval_secs: self.config.intervals[action],
            explored,
            overridden: action != selected,
        }
    }

    /// Epsilon-greedy interval for the item, in seconds.
    pub fn get_next_interval(
        &mut self,
        item_id: impl Into<ItemId>,
        difficulty: Difficulty,
        load_band: LoadBand,
    ) -> u32 {
        self.select_action(item_id, difficulty, load_band, false)
            .interval_secs
    }

    /// Greedy interval for the item, in seconds (ε treated as 0).
    pub fn get_next_interval_exploit(
        &mut self,
        item_id: impl Into<ItemId>,
        difficulty: Difficulty,
        load_band: LoadBand,
    ) -> u32 {
        self.select_action(item_id, difficulty, load_band, true)
            .interval_secs
    }

    /// Interval the greedy policy would pick in `state`, without touching any item.
    pub fn greedy_interval(&self, state: &ReviewState) -> u32 {
        let action = apply_safety_overrides(self.table.best_action(state), state);
        self.config.intervals[action]
    }

    /// One-step Q-learning update. Returns the new value of `Q(state, action)`.
    pub fn update(
        &mut self,
        state: &ReviewState,
        action: usize,
        reward: f64,
        next_state: &ReviewState,
    ) -> AlgoResult<f64> {
        if action >= self.table.n_actions() {
            return Err(AlgoError::validation(format!(
                "action {action} out of range for {} actions",
                self.table.n_actions()
            )));
        }
        let reward = ensure_finite("reward", reward)?;

        let current = self.table.get(state, action);
        let target = reward + self.config.discount_factor * self.table.max_value(next_state);
        let updated = current + self.config.learning_rate * (target - current);
        self.table.set(state, action, updated);
        Ok(updated)
    }

    /// Apply the observed outcome of the last decision for `item_id`.
    ///
    /// Fails with [`AlgoError::UnknownItem`] when the item was never scheduled
    /// and with [`AlgoError::Validation`] for a negative or non-finite latency
    /// or when the last decision was already recorded. No state changes on
    /// failure.
    pub fn record_result(
        &mut self,
        item_id: impl Into<ItemId>,
        correct: bool,
        latency_sec: f64,
        load_band: LoadBand,
        recorded_at: i64,
    ) -> AlgoResult<SessionRecord> {
        let item_id = item_id.into();
        let latency_sec = ensure_finite("latency_sec", latency_sec)?;
        if latency_sec < 0.0 {
            return Err(AlgoError::validation(format!(
                "latency_sec must be non-negative, got {latency_sec}"
            )));
        }

        let record = self
            .items
            .get(&item_id)
            .ok_or_else(|| AlgoError::UnknownItem(item_id.clone()))?;
        let action = record.last_action.ok_or_else(|| {
            AlgoError::validation(format!("item {item_id} has no pending scheduling decision"))
        })?;
        let prior_state = record.state;

        let reward = calculate_reward(correct, latency_sec, prior_state.difficulty, load_band);
        let streak = if correct {
            prior_state.streak.saturating_add(1).min(self.config.max_streak)
        } else {
            0
        };
        let new_state = ReviewState {
            difficulty: prior_state.difficulty,
            streak,
            latency_bin: LatencyBin::from_latency(latency_sec),
            load_band,
        };

        self.update(&prior_state, action, reward, &new_state)?;

        // Each decision is credited at most once
        if let Some(record) = self.items.get_mut(&item_id) {
            record.state = new_state;
            record.last_action = None;
        }
        let session = SessionRecord {
            item_id: item_id.clone(),
            correct,
            latency_sec,
            reward,
            action,
            interval_secs: self.config.intervals[action],
            prior_state,
            new_state,
            recorded_at,
        };
        self.sessions
            .entry(item_id)
            .or_default()
            .push(session.clone());
        Ok(session)
    }

    /// Aggregate over the item's recorded reviews; `None` if it has none.
    pub fn get_item_statistics(&self, item_id: &ItemId) -> Option<ItemStatistics> {
        let sessions = self.sessions.get(item_id).filter(|s| !s.is_empty())?;
        let correct: Vec<f64> = sessions
            .iter()
            .map(|s| if s.correct { 1.0 } else { 0.0 })
            .collect();
        let latencies: Vec<f64> = sessions.iter().map(|s| s.latency_sec).collect();
        let rewards: Vec<f64> = sessions.iter().map(|s| s.reward).collect();

        Some(ItemStatistics {
            total_sessions: sessions.len(),
            accuracy: mean(&correct),
            avg_latency: mean(&latencies),
            avg_reward: mean(&rewards),
            current_streak: self
                .items
                .get(item_id)
                .map(|r| r.state.streak)
                .unwrap_or(0),
        })
    }

    pub fn item_state(&self, item_id: &ItemId) -> Option<&ItemRecord> {
        self.items.get(item_id)
    }

    pub fn sessions(&self, item_id: &ItemId) -> &[SessionRecord] {
        self.sessions.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Row of action values for `state`
    pub fn q_values(&self, state: &ReviewState) -> &[f64] {
        self.table.row(state)
    }

    pub fn diagnose(&self) -> TableDiagnostics {
        diagnose_table(self.table.values())
    }

    /// Zero the table and forget every item. The RNG keeps its position.
    pub fn reset(&mut self) {
        self.table.clear();
        self.items.clear();
        self.sessions.clear();
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            dims: self.table.dims().to_vec(),
            q_values: self.table.values().to_vec(),
            items: self.items.clone(),
            sessions: self.sessions.clone(),
        }
    }

    /// Restore from a snapshot. The RNG is reseeded from the stored config.
    pub fn from_snapshot(snapshot: SchedulerSnapshot) -> AlgoResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AlgoError::validation(format!(
                "unsupported snapshot version {}, expected {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        let config = snapshot.config;
        config.validate()?;

        let n_actions = config.intervals.len();
        let expected = QTable::new(config.max_streak, n_actions).dims();
        if snapshot.dims != expected {
            return Err(AlgoError::validation(format!(
                "snapshot dims {:?} do not match configuration {:?}",
                snapshot.dims, expected
            )));
        }
        ensure_all_finite("q_values", &snapshot.q_values)?;
        let value_count = snapshot.q_values.len();
        let table = QTable::from_values(config.max_streak, n_actions, snapshot.q_values)
            .ok_or_else(|| {
                AlgoError::validation(format!(
                    "snapshot holds {value_count} values, expected {}",
                    expected.iter().product::<usize>()
                ))
            })?;

        for (id, record) in &snapshot.items {
            if record.last_action.is_some_and(|a| a >= n_actions) {
                return Err(AlgoError::validation(format!(
                    "item {id} has out-of-range last action {:?}",
                    record.last_action
                )));
            }
            if record.state.streak > config.max_streak {
                return Err(AlgoError::validation(format!(
                    "item {id} has streak {} above max_streak {}",
                    record.state.streak, config.max_streak
                )));
            }
        }
        for (id, sessions) in &snapshot.sessions {
            if !snapshot.items.contains_key(id) {
                return Err(AlgoError::validation(format!(
                    "sessions recorded for unknown item {id}"
                )));
            }
            if sessions.iter().any(|s| s.action >= n_actions) {
                return Err(AlgoError::validation(format!(
                    "item {id} has a session with an out-of-range action"
                )));
            }
        }

        let rng = Self::make_rng(config.seed);
        Ok(Self {
            config,
            table,
            items: snapshot.items,
            sessions: snapshot.sessions,
            rng,
        })
    }
}
