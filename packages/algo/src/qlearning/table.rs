//! Dense state-action value table.

use crate::types::{ReviewState, DIFFICULTY_LEVELS, LATENCY_BINS, LOAD_BANDS};

/// Flat row-major table over `difficulty × streak × latency_bin × load_band × action`.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    streak_values: usize,
    n_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    /// Zero-initialised table. `max_streak` is inclusive, so the streak axis has
    /// `max_streak + 1` entries.
    pub fn new(max_streak: u8, n_actions: usize) -> Self {
        let streak_values = max_streak as usize + 1;
        let len = Self::state_count_for(streak_values) * n_actions;
        Self {
            streak_values,
            n_actions,
            values: vec![0.0; len],
        }
    }

    /// Rebuild from a flat vector; returns `None` when the length does not
    /// match the shape.
    pub fn from_values(max_streak: u8, n_actions: usize, values: Vec<f64>) -> Option<Self> {
        let streak_values = max_streak as usize + 1;
        if values.len() != Self::state_count_for(streak_values) * n_actions {
            return None;
        }
        Some(Self {
            streak_values,
            n_actions,
            values,
        })
    }

    fn state_count_for(streak_values: usize) -> usize {
        DIFFICULTY_LEVELS * streak_values * LATENCY_BINS * LOAD_BANDS
    }

    /// Axis sizes `[difficulty, streak, latency_bin, load_band, action]`
    pub fn dims(&self) -> [usize; 5] {
        [
            DIFFICULTY_LEVELS,
            self.streak_values,
            LATENCY_BINS,
            LOAD_BANDS,
            self.n_actions,
        ]
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Offset of the first action of `state`. The streak is clamped to the axis.
    fn row_offset(&self, state: &ReviewState) -> usize {
        let streak = (state.streak as usize).min(self.streak_values - 1);
        let state_index = ((state.difficulty.index() * self.streak_values + streak) * LATENCY_BINS
            + state.latency_bin.index())
            * LOAD_BANDS
            + state.load_band.index();
        state_index * self.n_actions
    }

    pub fn row(&self, state: &ReviewState) -> &[f64] {
        let start = self.row_offset(state);
        &self.values[start..start + self.n_actions]
    }

    pub fn get(&self, state: &ReviewState, action: usize) -> f64 {
        self.row(state)[action]
    }

    pub fn set(&mut self, state: &ReviewState, action: usize, value: f64) {
        let start = self.row_offset(state);
        self.values[start + action] = value;
    }

    /// Highest value in the row of `state`
    pub fn max_value(&self, state: &ReviewState) -> f64 {
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Index of the highest value; ties go to the lowest index.
    pub fn best_action(&self, state: &ReviewState) -> usize {
        let row = self.row(state);
        let mut best = 0;
        for (i, &v) in row.iter().enumerate().skip(1) {
            if v > row[best] {
                best = i;
            }
        }
        best
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}
