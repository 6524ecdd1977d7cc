//! Common Types and Constants
//!
//! Shared data structures used by the scheduler and the load model. Every
//! discrete state dimension is an enum so that out-of-range states cannot be
//! constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AlgoError, AlgoResult};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Candidate review intervals in seconds, shortest first
pub const DEFAULT_INTERVALS: [u32; 4] = [30, 60, 120, 240];

/// Saturation point of the success streak
pub const DEFAULT_MAX_STREAK: u8 = 3;

pub const DIFFICULTY_LEVELS: usize = 3;
pub const LATENCY_BINS: usize = 3;
pub const LOAD_BANDS: usize = 3;

/// Latency (seconds) at or below which a response counts as fast
pub const FAST_LATENCY_MAX: f64 = 2.0;
/// Latency (seconds) at or below which a response counts as medium
pub const MEDIUM_LATENCY_MAX: f64 = 5.0;

/// Range the predicted cognitive load is clipped to
pub const LOAD_SCORE_MIN: f64 = 0.0;
pub const LOAD_SCORE_MAX: f64 = 5.0;

/// Inclusive upper bound of the "low" band
pub const LOW_BAND_MAX: f64 = 1.5;
/// Inclusive upper bound of the "moderate" band
pub const MODERATE_BAND_MAX: f64 = 2.5;

// ==================== Item Identity ====================

/// Stable identifier of a memory item.
///
/// Integer and string identifiers are both accepted and stored as text.
/// Serialized as a plain string; deserialization also accepts JSON integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

macro_rules! item_id_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ItemId {
            fn from(value: $t) -> Self {
                Self(value.to_string())
            }
        })*
    };
}

item_id_from_int!(u8, u32, u64, i32, i64, usize);

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ItemIdVisitor;

        impl serde::de::Visitor<'_> for ItemIdVisitor {
            type Value = ItemId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer item id")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ItemId, E> {
                Ok(ItemId::from(v))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<ItemId, E> {
                Ok(ItemId(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ItemId, E> {
                Ok(ItemId::from(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ItemId, E> {
                Ok(ItemId::from(v))
            }
        }

        deserializer.deserialize_any(ItemIdVisitor)
    }
}

// ==================== State Dimensions ====================

/// Item difficulty, fixed when the item is first scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Build from a 1-based level. Levels above 3 saturate at `Hard`, 0 maps to `Easy`.
    pub fn from_level(level: u32) -> Self {
        match level {
            0 | 1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    /// 1-based level (1..=3)
    pub fn level(&self) -> u32 {
        self.index() as u32 + 1
    }

    pub fn index(&self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    pub fn is_easiest(&self) -> bool {
        *self == Difficulty::Easy
    }

    pub fn is_hardest(&self) -> bool {
        *self == Difficulty::Hard
    }
}

/// Cognitive-load band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBand {
    Low,
    Moderate,
    High,
}

impl LoadBand {
    pub const ALL: [LoadBand; LOAD_BANDS] = [LoadBand::Low, LoadBand::Moderate, LoadBand::High];

    /// Map a load score to a band. Both thresholds are inclusive on the low side,
    /// so exactly 1.5 is `Low` and exactly 2.5 is `Moderate`.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            return LoadBand::Moderate;
        }
        let clipped = score.clamp(LOAD_SCORE_MIN, LOAD_SCORE_MAX);
        if clipped <= LOW_BAND_MAX {
            LoadBand::Low
        } else if clipped <= MODERATE_BAND_MAX {
            LoadBand::Moderate
        } else {
            LoadBand::High
        }
    }

    pub fn index(&self) -> usize {
        match self {
            LoadBand::Low => 0,
            LoadBand::Moderate => 1,
            LoadBand::High => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBand::Low => "low",
            LoadBand::Moderate => "moderate",
            LoadBand::High => "high",
        }
    }
}

impl FromStr for LoadBand {
    type Err = AlgoError;

    fn from_str(s: &str) -> AlgoResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(LoadBand::Low),
            "moderate" => Ok(LoadBand::Moderate),
            "high" => Ok(LoadBand::High),
            other => Err(AlgoError::validation(format!(
                "invalid load band label '{other}', expected low|moderate|high"
            ))),
        }
    }
}

impl fmt::Display for LoadBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discretised response latency of the most recent review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyBin {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl LatencyBin {
    pub fn from_latency(latency_sec: f64) -> Self {
        if latency_sec <= FAST_LATENCY_MAX {
            LatencyBin::Fast
        } else if latency_sec <= MEDIUM_LATENCY_MAX {
            LatencyBin::Medium
        } else {
            LatencyBin::Slow
        }
    }

    pub fn index(&self) -> usize {
        match self {
            LatencyBin::Fast => 0,
            LatencyBin::Medium => 1,
            LatencyBin::Slow => 2,
        }
    }
}

// ==================== Scheduler State ====================

/// Discrete state the scheduler acts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewState {
    pub difficulty: Difficulty,
    pub streak: u8,
    pub latency_bin: LatencyBin,
    pub load_band: LoadBand,
}

impl ReviewState {
    /// State of an item that has never been reviewed.
    pub fn initial(difficulty: Difficulty, load_band: LoadBand) -> Self {
        Self {
            difficulty,
            streak: 0,
            latency_bin: LatencyBin::Medium,
            load_band,
        }
    }
}

/// Per-item record owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub state: ReviewState,
    /// Action index chosen by the most recent scheduling decision
    pub last_action: Option<usize>,
}

/// Audit entry appended on every recorded review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub item_id: ItemId,
    pub correct: bool,
    pub latency_sec: f64,
    pub reward: f64,
    pub action: usize,
    pub interval_secs: u32,
    pub prior_state: ReviewState,
    pub new_state: ReviewState,
    /// UTC milliseconds, supplied by the caller
    pub recorded_at: i64,
}

/// Aggregate over an item's audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStatistics {
    pub total_sessions: usize,
    pub accuracy: f64,
    pub avg_latency: f64,
    pub avg_reward: f64,
    pub current_streak: u8,
}

/// Value-table health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDiagnostics {
    pub is_healthy: bool,
    pub nan_count: usize,
    pub inf_count: usize,
    pub min_value: f64,
    pub max_value: f64,
    /// Entries that moved away from their zero initialisation
    pub visited_entries: usize,
    pub total_entries: usize,
    pub message: String,
}
