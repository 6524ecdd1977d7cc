//! Training and simulation inputs.
//!
//! Files are either a JSON array or JSON Lines (`.jsonl` / `.ndjson`), one
//! record per line.

use std::fs;
use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use recall_algo::{AlgoError, Difficulty, ItemId, SpeechFeatures};

pub use recall_algo::SpeechSample;

use crate::error::{ServiceError, ServiceResult};
use crate::simulation::sample_standard_normal;

/// A quiz item as listed in the items file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub item_id: ItemId,
    /// Stored as the 1-based level
    #[serde(with = "difficulty_level")]
    pub difficulty: Difficulty,
}

mod difficulty_level {
    use recall_algo::Difficulty;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(difficulty: &Difficulty, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(difficulty.level())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Difficulty, D::Error> {
        u32::deserialize(d).map(Difficulty::from_level)
    }
}

pub fn load_records<T: DeserializeOwned>(path: &Path) -> ServiceResult<Vec<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServiceError::NotFound(path.display().to_string()))
        }
        Err(err) => return Err(err.into()),
    };

    let is_lines = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jsonl") | Some("ndjson")
    );
    if !is_lines {
        return Ok(serde_json::from_str(&text)?);
    }

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ServiceError::from))
        .collect()
}

pub fn load_speech_samples(path: &Path) -> ServiceResult<Vec<SpeechSample>> {
    let samples: Vec<SpeechSample> = load_records(path)?;
    tracing::info!(path = %path.display(), samples = samples.len(), "speech samples loaded");
    Ok(samples)
}

pub fn load_memory_items(path: &Path) -> ServiceResult<Vec<MemoryItem>> {
    let items: Vec<MemoryItem> = load_records(path)?;
    if items.is_empty() {
        return Err(AlgoError::validation(format!("{} contains no items", path.display())).into());
    }
    tracing::info!(path = %path.display(), items = items.len(), "memory items loaded");
    Ok(items)
}

// ==================== Synthetic Data ====================

/// Ground-truth load used for synthetic samples, before noise and clipping
pub fn synthetic_load(f: &SpeechFeatures) -> f64 {
    2.5 - 0.012 * (f.wpm - 130.0) + 2.0 * (f.pause_rate - 0.3) - 1.5 * (f.ttr - 0.55)
        + 20.0 * (f.jitter - 0.02)
        - 0.3 * (f.articulation_rate - 4.5)
}

/// `n` labelled samples with features drawn uniformly from plausible ranges
/// and a load of [`synthetic_load`] plus N(0, 0.1) noise, clipped to `[0, 5]`.
pub fn synthetic_speech(n: usize, seed: u64) -> Vec<SpeechSample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let features = SpeechFeatures {
                wpm: rng.gen_range(80.0..180.0),
                pause_rate: rng.gen_range(0.05..0.6),
                ttr: rng.gen_range(0.3..0.8),
                jitter: rng.gen_range(0.005..0.05),
                articulation_rate: rng.gen_range(3.0..6.0),
            };
            let noise = 0.1 * sample_standard_normal(&mut rng);
            SpeechSample {
                cognitive_load: (synthetic_load(&features) + noise).clamp(0.0, 5.0),
                features,
            }
        })
        .collect()
}

/// Items `1..=n` with uniformly drawn difficulty.
pub fn synthetic_items(n: usize, seed: u64) -> Vec<MemoryItem> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (1..=n)
        .map(|id| MemoryItem {
            item_id: ItemId::from(id),
            difficulty: Difficulty::from_level(rng.gen_range(1..=3)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_json_array_and_lines() {
        let dir = tempfile::tempdir().unwrap();

        let array = dir.path().join("items.json");
        fs::write(&array, r#"[{"item_id": 1, "difficulty": 3}, {"item_id": "b", "difficulty": 1}]"#)
            .unwrap();
        let items = load_memory_items(&array).unwrap();
        assert_eq!(items[0].item_id, ItemId::from(1));
        assert_eq!(items[0].difficulty, Difficulty::Hard);
        assert_eq!(items[1].difficulty, Difficulty::Easy);

        let lines = dir.path().join("speech.jsonl");
        fs::write(
            &lines,
            "{\"wpm\":120,\"pause_rate\":0.2,\"ttr\":0.5,\"jitter\":0.02,\"articulation_rate\":4.0,\"cognitive_load\":2.1}\n\n\
             {\"wpm\":95,\"pause_rate\":0.4,\"ttr\":0.4,\"jitter\":0.03,\"artic_rate\":3.5,\"cog_load_true\":3.2}\n",
        )
        .unwrap();
        let samples = load_speech_samples(&lines).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].cognitive_load, 3.2);
    }

    #[test]
    fn missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_speech_samples(&dir.path().join("absent.json")),
            Err(ServiceError::NotFound(_))
        ));

        let empty = dir.path().join("items.json");
        fs::write(&empty, "[]").unwrap();
        assert!(load_memory_items(&empty).is_err());
    }

    #[test]
    fn synthetic_data_is_seeded() {
        assert_eq!(synthetic_speech(20, 5), synthetic_speech(20, 5));
        assert_ne!(synthetic_speech(20, 5), synthetic_speech(20, 6));

        let items = synthetic_items(30, 1);
        assert_eq!(items.len(), 30);
        assert_eq!(items[0].item_id, ItemId::from(1usize));
        assert!(synthetic_speech(200, 9)
            .iter()
            .all(|s| (0.0..=5.0).contains(&s.cognitive_load)));
    }

    #[test]
    fn memory_item_serializes_level() {
        let item = MemoryItem {
            item_id: ItemId::from("x"),
            difficulty: Difficulty::Medium,
        };
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"item_id":"x","difficulty":2}"#
        );
    }
}
