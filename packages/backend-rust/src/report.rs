//! Clinician-facing summary of simulated or recorded sessions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use recall_algo::sanitize::mean;
use recall_algo::{FitMetrics, LoadBand};

use crate::simulation::SessionSummary;

/// Sessions compared at each end of the history for the trend
pub const TREND_WINDOW: usize = 10;
/// Accuracy change beyond which the trend is improving; a drop of this size
/// or more is declining
pub const TREND_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTrend {
    Improving,
    Stable,
    Declining,
}

impl PerformanceTrend {
    pub fn from_improvement(improvement: f64) -> Self {
        if improvement > TREND_THRESHOLD {
            PerformanceTrend::Improving
        } else if improvement <= -TREND_THRESHOLD {
            PerformanceTrend::Declining
        } else {
            PerformanceTrend::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReportRow {
    pub session: usize,
    pub date: NaiveDate,
    pub accuracy: f64,
    pub avg_latency: f64,
    pub load_band: LoadBand,
    pub support_needed_score: f64,
    pub n_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechModelMetrics {
    pub mse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicianReport {
    pub assessment_date: NaiveDate,
    pub total_sessions: usize,
    pub overall_accuracy: f64,
    pub overall_latency: f64,
    pub performance_trend: PerformanceTrend,
    /// Mean accuracy of the last sessions minus that of the first sessions
    pub improvement_score: f64,
    pub load_band_distribution: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
    pub speech_model_metrics: Option<SpeechModelMetrics>,
    pub sessions: Vec<SessionReportRow>,
}

/// Higher means the session needed more support.
pub fn support_needed_score(summary: &SessionSummary) -> f64 {
    let load = match summary.load_band {
        LoadBand::High => 0.2,
        LoadBand::Moderate => 0.1,
        LoadBand::Low => 0.0,
    };
    (1.0 - summary.accuracy).max(0.0) + summary.avg_latency / 10.0 + load
}

pub fn recommendations(accuracy: f64, latency: f64, improvement: f64) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();

    if accuracy < 0.6 {
        out.push("Consider memory training exercises and cognitive stimulation activities");
        out.push("Evaluate for potential cognitive decline and consider medical consultation");
    } else if accuracy < 0.8 {
        out.push("Continue with current memory exercises and consider increasing difficulty");
        out.push("Monitor progress closely and adjust intervention as needed");
    } else {
        out.push("Excellent memory performance - maintain current activities");
        out.push("Consider advanced cognitive challenges to maintain engagement");
    }

    if latency > 8.0 {
        out.push("Processing speed may benefit from timed exercises and brain training");
        out.push("Consider activities that require quick decision-making");
    } else if latency < 3.0 {
        out.push("Excellent processing speed - consider more complex memory tasks");
    }

    if improvement > 0.1 {
        out.push("Positive improvement trend - continue current intervention strategy");
    } else if improvement < -0.1 {
        out.push("Declining performance - consider adjusting intervention approach");
        out.push("Monitor for signs of cognitive changes and consult healthcare provider");
    }

    out.into_iter().map(String::from).collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl ClinicianReport {
    pub fn build(
        summaries: &[SessionSummary],
        speech_metrics: Option<&FitMetrics>,
        today: NaiveDate,
    ) -> Self {
        let accuracies: Vec<f64> = summaries.iter().map(|s| s.accuracy).collect();
        let latencies: Vec<f64> = summaries.iter().map(|s| s.avg_latency).collect();

        let overall_accuracy = mean(&accuracies);
        let overall_latency = mean(&latencies);

        let window = TREND_WINDOW.min(accuracies.len());
        let early = mean(&accuracies[..window]);
        let late = mean(&accuracies[accuracies.len() - window..]);
        let improvement = late - early;

        let mut load_band_distribution = BTreeMap::new();
        for summary in summaries {
            *load_band_distribution
                .entry(summary.load_band.as_str().to_string())
                .or_insert(0) += 1;
        }

        let sessions = summaries
            .iter()
            .map(|s| SessionReportRow {
                session: s.session,
                date: today,
                accuracy: round_to(s.accuracy, 3),
                avg_latency: round_to(s.avg_latency, 2),
                load_band: s.load_band,
                support_needed_score: round_to(support_needed_score(s), 3),
                n_items: s.n_items,
            })
            .collect();

        Self {
            assessment_date: today,
            total_sessions: summaries.len(),
            overall_accuracy: round_to(overall_accuracy, 3),
            overall_latency: round_to(overall_latency, 2),
            performance_trend: PerformanceTrend::from_improvement(improvement),
            improvement_score: round_to(improvement, 3),
            load_band_distribution,
            recommendations: if summaries.is_empty() {
                Vec::new()
            } else {
                recommendations(overall_accuracy, overall_latency, improvement)
            },
            speech_model_metrics: speech_metrics.map(|m| SpeechModelMetrics {
                mse: round_to(m.mse, 4),
                r2: round_to(m.r2, 4),
            }),
            sessions,
        }
    }
}
