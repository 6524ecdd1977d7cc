//! Simulated quiz sessions driving the engine end to end.
//!
//! Each session draws one load band (low 0.4, moderate 0.4, high 0.2), quizzes
//! a random subset of items, and feeds synthetic outcomes back. Harder items
//! and high load lower accuracy and raise latency.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use recall_algo::{AlgoError, LoadBand, EPSILON};

use crate::dataset::MemoryItem;
use crate::engine::RecallEngine;
use crate::error::ServiceResult;

/// Cumulative band probabilities for low and moderate; the rest is high
const BAND_CUMULATIVE: [f64; 2] = [0.4, 0.8];

const BASE_ACCURACY: f64 = 0.9;
const ACCURACY_DROP_PER_LEVEL: f64 = 0.15;
const HIGH_LOAD_ACCURACY_DROP: f64 = 0.1;
const ACCURACY_NOISE: f64 = 0.1;
const ACCURACY_RANGE: (f64, f64) = (0.3, 0.95);

const BASE_LATENCY: f64 = 2.0;
const LATENCY_PER_LEVEL: f64 = 1.5;
const HIGH_LOAD_LATENCY: f64 = 1.0;
const LATENCY_NOISE: f64 = 0.5;
const MIN_LATENCY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    pub sessions: usize,
    pub items_per_session: usize,
    pub seed: Option<u64>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            sessions: 40,
            items_per_session: 12,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// 1-based
    pub session: usize,
    pub accuracy: f64,
    pub avg_latency: f64,
    pub load_band: LoadBand,
    pub n_items: usize,
}

/// Sample from standard normal distribution using Box-Muller transform
pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(EPSILON);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn draw_band<R: Rng + ?Sized>(rng: &mut R) -> LoadBand {
    let u: f64 = rng.gen();
    if u < BAND_CUMULATIVE[0] {
        LoadBand::Low
    } else if u < BAND_CUMULATIVE[1] {
        LoadBand::Moderate
    } else {
        LoadBand::High
    }
}

/// Probability of a correct answer for an item of `level` under `band`.
pub fn response_accuracy(level: u32, band: LoadBand, noise: f64) -> f64 {
    let high = if band == LoadBand::High { 1.0 } else { 0.0 };
    let base = BASE_ACCURACY
        - ACCURACY_DROP_PER_LEVEL * (level as f64 - 1.0)
        - HIGH_LOAD_ACCURACY_DROP * high;
    (base + ACCURACY_NOISE * noise).clamp(ACCURACY_RANGE.0, ACCURACY_RANGE.1)
}

/// Response latency in seconds for an item of `level` under `band`.
pub fn response_latency(level: u32, band: LoadBand, noise: f64) -> f64 {
    let high = if band == LoadBand::High { 1.0 } else { 0.0 };
    let base = BASE_LATENCY + LATENCY_PER_LEVEL * (level as f64 - 1.0) + HIGH_LOAD_LATENCY * high;
    (base + LATENCY_NOISE * noise).max(MIN_LATENCY)
}

pub fn simulate_sessions(
    engine: &RecallEngine,
    items: &[MemoryItem],
    options: &SimulationOptions,
) -> ServiceResult<Vec<SessionSummary>> {
    if items.is_empty() {
        return Err(AlgoError::validation("simulation needs at least one item").into());
    }
    if options.items_per_session == 0 {
        return Err(AlgoError::validation("items_per_session must be positive").into());
    }

    let mut rng = match options.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let n_items = options.items_per_session.min(items.len());
    let mut summaries = Vec::with_capacity(options.sessions);

    for session in 1..=options.sessions {
        let band = draw_band(&mut rng);
        let mut correct_count = 0usize;
        let mut total_latency = 0.0;

        let chosen: Vec<&MemoryItem> = items.choose_multiple(&mut rng, n_items).collect();
        for item in chosen {
            let level = item.difficulty.level();
            engine.get_next_interval(item.item_id.clone(), item.difficulty, band);

            let accuracy = response_accuracy(level, band, sample_standard_normal(&mut rng));
            let correct = rng.gen::<f64>() < accuracy;
            let latency = response_latency(level, band, sample_standard_normal(&mut rng));

            engine.record_result(item.item_id.clone(), correct, latency, item.difficulty, band)?;

            if correct {
                correct_count += 1;
            }
            total_latency += latency;
        }

        let summary = SessionSummary {
            session,
            accuracy: correct_count as f64 / n_items as f64,
            avg_latency: total_latency / n_items as f64,
            load_band: band,
            n_items,
        };
        tracing::debug!(
            session,
            accuracy = summary.accuracy,
            avg_latency = summary.avg_latency,
            load_band = %band,
            "session simulated"
        );
        summaries.push(summary);
    }

    if let Some(last) = summaries.last() {
        tracing::info!(
            sessions = summaries.len(),
            final_accuracy = last.accuracy,
            final_latency = last.avg_latency,
            "simulation complete"
        );
    }
    Ok(summaries)
}
