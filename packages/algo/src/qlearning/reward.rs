//! Reward shaping for a single review outcome.

use crate::types::{Difficulty, LoadBand};

pub const CORRECT_BASE_REWARD: f64 = 1.0;
pub const INCORRECT_BASE_PENALTY: f64 = -0.5;
/// Extra penalty for failing the easiest items
pub const EASY_FAILURE_PENALTY: f64 = -0.3;
pub const HARD_ITEM_BONUS: f64 = 0.2;
/// Bonus for recalling under high cognitive load
pub const HIGH_LOAD_BONUS: f64 = 0.2;

/// Smallest value [`calculate_reward`] can return
pub const MIN_REWARD: f64 = INCORRECT_BASE_PENALTY + EASY_FAILURE_PENALTY;
/// Largest value [`calculate_reward`] can return
pub const MAX_REWARD: f64 = CORRECT_BASE_REWARD + 0.5 + HARD_ITEM_BONUS + HIGH_LOAD_BONUS;

/// Speed bonus tiers: (latency upper bound in seconds, bonus)
const SPEED_BONUS: [(f64, f64); 3] = [(2.0, 0.5), (5.0, 0.3), (10.0, 0.1)];

fn speed_bonus(latency_sec: f64) -> f64 {
    SPEED_BONUS
        .iter()
        .find(|(limit, _)| latency_sec <= *limit)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0.0)
}

/// Deterministic reward for one review.
pub fn calculate_reward(
    correct: bool,
    latency_sec: f64,
    difficulty: Difficulty,
    load_band: LoadBand,
) -> f64 {
    if correct {
        let mut reward = CORRECT_BASE_REWARD + speed_bonus(latency_sec);
        if difficulty.is_hardest() {
            reward += HARD_ITEM_BONUS;
        }
        if load_band == LoadBand::High {
            reward += HIGH_LOAD_BONUS;
        }
        reward
    } else {
        let mut reward = INCORRECT_BASE_PENALTY;
        if difficulty.is_easiest() {
            reward += EASY_FAILURE_PENALTY;
        }
        reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_correct_speed_tiers() {
        let r = |lat| calculate_reward(true, lat, Difficulty::Medium, LoadBand::Low);
        assert!(approx(r(1.0), 1.5));
        assert!(approx(r(2.0), 1.5));
        assert!(approx(r(4.0), 1.3));
        assert!(approx(r(10.0), 1.1));
        assert!(approx(r(12.0), 1.0));
    }

    #[test]
    fn test_hard_and_high_load_bonuses() {
        assert!(approx(
            calculate_reward(true, 1.0, Difficulty::Hard, LoadBand::High),
            MAX_REWARD
        ));
        assert!(approx(
            calculate_reward(true, 30.0, Difficulty::Hard, LoadBand::Moderate),
            1.2
        ));
    }

    #[test]
    fn test_incorrect_penalties() {
        assert!(approx(
            calculate_reward(false, 1.0, Difficulty::Easy, LoadBand::High),
            MIN_REWARD
        ));
        assert!(approx(
            calculate_reward(false, 1.0, Difficulty::Hard, LoadBand::High),
            -0.5
        ));
    }

    #[test]
    fn test_bounds() {
        assert!(approx(MIN_REWARD, -0.8));
        assert!(approx(MAX_REWARD, 1.9));
    }
}
