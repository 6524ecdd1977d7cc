//! Speech-derived cognitive-load model.
//!
//! A ridge regression over five speech biomarkers whose clipped output is
//! bucketed into a [`LoadBand`] for the scheduler.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AlgoError, AlgoResult};
use crate::ridge::{FitMetrics, RidgeRegression, INTERCEPT_NAME};
use crate::sanitize::ensure_finite;
use crate::types::{LoadBand, LOAD_SCORE_MAX, LOAD_SCORE_MIN};

/// Default L2 penalty
pub const DEFAULT_RIDGE_LAMBDA: f64 = 0.01;

/// Feature order used by the design matrix
pub const SPEECH_FEATURE_NAMES: [&str; 5] =
    ["wpm", "pause_rate", "ttr", "jitter", "articulation_rate"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechFeatures {
    /// Words per minute
    pub wpm: f64,
    pub pause_rate: f64,
    /// Type-token ratio
    pub ttr: f64,
    pub jitter: f64,
    #[serde(alias = "artic_rate")]
    pub articulation_rate: f64,
}

impl SpeechFeatures {
    pub fn to_row(&self) -> Vec<f64> {
        vec![
            self.wpm,
            self.pause_rate,
            self.ttr,
            self.jitter,
            self.articulation_rate,
        ]
    }

    /// Build from named values. Every feature is required; unknown keys are ignored.
    pub fn from_map(values: &HashMap<String, f64>) -> AlgoResult<Self> {
        let get = |name: &str| -> AlgoResult<f64> {
            let value = values
                .get(name)
                .copied()
                .ok_or_else(|| AlgoError::validation(format!("missing speech feature '{name}'")))?;
            ensure_finite(name, value)
        };

        Ok(Self {
            wpm: get("wpm")?,
            pause_rate: get("pause_rate")?,
            ttr: get("ttr")?,
            jitter: get("jitter")?,
            articulation_rate: get("articulation_rate")?,
        })
    }
}

/// One labelled training sample, serialized as a flat record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SampleRow", into = "SampleRow")]
pub struct SpeechSample {
    pub features: SpeechFeatures,
    /// Ground-truth cognitive load, nominally 0 to 5
    pub cognitive_load: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct SampleRow {
    wpm: f64,
    pause_rate: f64,
    ttr: f64,
    jitter: f64,
    #[serde(alias = "artic_rate")]
    articulation_rate: f64,
    #[serde(alias = "cog_load_true")]
    cognitive_load: f64,
}

impl From<SampleRow> for SpeechSample {
    fn from(row: SampleRow) -> Self {
        Self {
            features: SpeechFeatures {
                wpm: row.wpm,
                pause_rate: row.pause_rate,
                ttr: row.ttr,
                jitter: row.jitter,
                articulation_rate: row.articulation_rate,
            },
            cognitive_load: row.cognitive_load,
        }
    }
}

impl From<SpeechSample> for SampleRow {
    fn from(sample: SpeechSample) -> Self {
        let f = sample.features;
        Self {
            wpm: f.wpm,
            pause_rate: f.pause_rate,
            ttr: f.ttr,
            jitter: f.jitter,
            articulation_rate: f.articulation_rate,
            cognitive_load: sample.cognitive_load,
        }
    }
}

/// Persisted form of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRecord {
    pub coefficients: Vec<f64>,
    pub feature_names: Vec<String>,
    pub regularization: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechLoadModel {
    regression: RidgeRegression,
}

impl SpeechLoadModel {
    pub fn new(regularization: f64) -> AlgoResult<Self> {
        Ok(Self {
            regression: RidgeRegression::new(feature_names(), regularization)?,
        })
    }

    pub fn fit(&mut self, samples: &[SpeechSample]) -> AlgoResult<FitMetrics> {
        let rows: Vec<Vec<f64>> = samples.iter().map(|s| s.features.to_row()).collect();
        let targets: Vec<f64> = samples.iter().map(|s| s.cognitive_load).collect();
        self.regression.fit(&rows, &targets)
    }

    /// Predicted load clipped to `[0, 5]`
    pub fn predict_score(&self, features: &SpeechFeatures) -> AlgoResult<f64> {
        let raw = self.regression.predict_row(&features.to_row())?;
        Ok(raw.clamp(LOAD_SCORE_MIN, LOAD_SCORE_MAX))
    }

    pub fn predict_load_band(&self, features: &SpeechFeatures) -> AlgoResult<LoadBand> {
        self.predict_score(features).map(LoadBand::from_score)
    }

    pub fn predict_load_band_from_map(&self, values: &HashMap<String, f64>) -> AlgoResult<LoadBand> {
        if !self.is_fitted() {
            return Err(AlgoError::UnfittedModel);
        }
        let features = SpeechFeatures::from_map(values)?;
        self.predict_load_band(&features)
    }

    /// Band every feature set; fails on the first invalid entry.
    pub fn predict_batch(&self, batch: &[SpeechFeatures]) -> AlgoResult<Vec<LoadBand>> {
        batch
            .par_iter()
            .map(|features| self.predict_load_band(features))
            .collect()
    }

    /// `(name, weight)` pairs, intercept first
    pub fn coefficients_by_name(&self) -> Option<Vec<(String, f64)>> {
        let coefficients = self.regression.coefficients()?;
        let names = std::iter::once(INTERCEPT_NAME.to_string()).chain(feature_names());
        Some(names.zip(coefficients.iter().copied()).collect())
    }

    pub fn is_fitted(&self) -> bool {
        self.regression.is_fitted()
    }

    pub fn regularization(&self) -> f64 {
        self.regression.regularization()
    }

    pub fn to_record(&self) -> AlgoResult<RegressionRecord> {
        let coefficients = self
            .regression
            .coefficients()
            .ok_or(AlgoError::UnfittedModel)?
            .to_vec();
        Ok(RegressionRecord {
            coefficients,
            feature_names: self.regression.feature_names().to_vec(),
            regularization: self.regression.regularization(),
        })
    }

    pub fn from_record(record: RegressionRecord) -> AlgoResult<Self> {
        if record.feature_names != feature_names() {
            return Err(AlgoError::validation(format!(
                "unexpected feature names {:?}, expected {:?}",
                record.feature_names, SPEECH_FEATURE_NAMES
            )));
        }
        Ok(Self {
            regression: RidgeRegression::from_parts(
                record.feature_names,
                record.regularization,
                record.coefficients,
            )?,
        })
    }
}

impl Default for SpeechLoadModel {
    fn default() -> Self {
        Self {
            regression: RidgeRegression::with_trusted_parts(feature_names(), DEFAULT_RIDGE_LAMBDA),
        }
    }
}

fn feature_names() -> Vec<String> {
    SPEECH_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// load = 0.5 + 0.01·wpm + 1.5·pause_rate − 1.0·ttr + 2.0·jitter − 0.1·articulation_rate
    fn true_load(f: &SpeechFeatures) -> f64 {
        0.5 + 0.01 * f.wpm + 1.5 * f.pause_rate - 1.0 * f.ttr + 2.0 * f.jitter
            - 0.1 * f.articulation_rate
    }

    fn samples(n: usize) -> Vec<SpeechSample> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                let features = SpeechFeatures {
                    wpm: 90.0 + 7.0 * t,
                    pause_rate: 0.1 + 0.05 * ((i * 7) % 11) as f64,
                    ttr: 0.4 + 0.03 * ((i * 3) % 7) as f64,
                    jitter: 0.01 + 0.02 * ((i * 5) % 13) as f64,
                    articulation_rate: 3.0 + 0.2 * ((i * 11) % 17) as f64,
                };
                SpeechSample {
                    cognitive_load: true_load(&features),
                    features,
                }
            })
            .collect()
    }

    fn feature_map(f: &SpeechFeatures) -> HashMap<String, f64> {
        SPEECH_FEATURE_NAMES
            .iter()
            .map(|s| s.to_string())
            .zip(f.to_row())
            .collect()
    }

    #[test]
    fn test_fit_reproduces_targets() {
        let data = samples(30);
        let mut model = SpeechLoadModel::new(1e-6).unwrap();
        let metrics = model.fit(&data).unwrap();
        assert!(metrics.r2 > 0.999);

        for sample in &data {
            let raw = model.regression.predict_row(&sample.features.to_row()).unwrap();
            assert!(
                (raw - sample.cognitive_load).abs() < 0.05,
                "prediction {raw} too far from {}",
                sample.cognitive_load
            );
        }
    }

    #[test]
    fn test_predict_requires_fit() {
        let model = SpeechLoadModel::default();
        let f = samples(1)[0].features;
        assert_eq!(model.predict_load_band(&f), Err(AlgoError::UnfittedModel));
        assert_eq!(
            model.predict_load_band_from_map(&feature_map(&f)),
            Err(AlgoError::UnfittedModel)
        );
        assert_eq!(model.to_record(), Err(AlgoError::UnfittedModel));
    }

    #[test]
    fn test_missing_feature_is_rejected() {
        let mut model = SpeechLoadModel::default();
        model.fit(&samples(20)).unwrap();

        let mut values = feature_map(&samples(1)[0].features);
        values.remove("jitter");
        let err = model.predict_load_band_from_map(&values).unwrap_err();
        assert!(matches!(err, AlgoError::Validation(ref msg) if msg.contains("jitter")));
    }

    #[test]
    fn test_score_exactly_on_low_threshold_is_low() {
        // Intercept-only model producing exactly 1.5
        let record = RegressionRecord {
            coefficients: vec![1.5, 0.0, 0.0, 0.0, 0.0, 0.0],
            feature_names: feature_names(),
            regularization: DEFAULT_RIDGE_LAMBDA,
        };
        let model = SpeechLoadModel::from_record(record).unwrap();
        let f = samples(1)[0].features;
        assert_eq!(model.predict_score(&f).unwrap(), 1.5);
        assert_eq!(model.predict_load_band(&f).unwrap(), LoadBand::Low);
    }

    #[test]
    fn test_score_is_clipped() {
        let record = RegressionRecord {
            coefficients: vec![-3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            feature_names: feature_names(),
            regularization: DEFAULT_RIDGE_LAMBDA,
        };
        let model = SpeechLoadModel::from_record(record).unwrap();
        assert_eq!(model.predict_score(&samples(1)[0].features).unwrap(), 0.0);
    }

    #[test]
    fn test_predict_batch_matches_single() {
        let data = samples(25);
        let mut model = SpeechLoadModel::default();
        model.fit(&data).unwrap();

        let batch: Vec<SpeechFeatures> = data.iter().map(|s| s.features).collect();
        let bands = model.predict_batch(&batch).unwrap();
        for (features, band) in batch.iter().zip(bands) {
            assert_eq!(model.predict_load_band(features).unwrap(), band);
        }
    }

    #[test]
    fn test_record_round_trip() {
        let mut model = SpeechLoadModel::default();
        model.fit(&samples(20)).unwrap();

        let json = serde_json::to_string(&model.to_record().unwrap()).unwrap();
        let restored =
            SpeechLoadModel::from_record(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, model);
    }

    #[test]
    fn test_record_with_wrong_names_is_rejected() {
        let record = RegressionRecord {
            coefficients: vec![0.0; 6],
            feature_names: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            regularization: 0.01,
        };
        assert!(matches!(
            SpeechLoadModel::from_record(record),
            Err(AlgoError::Validation(_))
        ));
    }

    #[test]
    fn test_sample_accepts_alternate_column_names() {
        let json = r#"{"wpm":120,"pause_rate":0.2,"ttr":0.5,"jitter":0.02,"artic_rate":4.1,"cog_load_true":2.2}"#;
        let sample: SpeechSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.features.articulation_rate, 4.1);
        assert_eq!(sample.cognitive_load, 2.2);
    }

    #[test]
    fn test_coefficients_by_name() {
        let mut model = SpeechLoadModel::default();
        assert!(model.coefficients_by_name().is_none());
        model.fit(&samples(20)).unwrap();
        let named = model.coefficients_by_name().unwrap();
        assert_eq!(named.len(), 6);
        assert_eq!(named[0].0, INTERCEPT_NAME);
        assert_eq!(named[5].0, "articulation_rate");
    }
}
