//! Scoring outputs: rule check, AI judgment and the aggregated assessment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::alert::OverallRisk;

/// Explanation used when neither signal produced any text
pub const NO_RISK_FACTORS: &str = "No specific risk factors identified.";

/// Clamp a score into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Output of the rule-based risk scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlCheckResult {
    /// Preliminary risk score (0.0 - 1.0, two decimals)
    pub preliminary_risk_score: f64,
    /// Fired rule reasons joined by a single space
    pub reason: String,
}

/// Fraud assessment returned by the generative model.
///
/// `fraudulent` and `fraud_probability` are supplied independently by the
/// model and are not assumed to agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudJudgment {
    pub fraudulent: bool,
    pub fraud_probability: f64,
    pub explanation: String,
}

/// Aggregated result that is persisted and shown to reviewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub is_fraudulent: bool,
    pub fraud_probability: f64,
    pub overall_risk: OverallRisk,
    pub explanation: String,
    /// True when the assessment was made without the AI judgment
    pub degraded: bool,
}

/// Full record of both signals, stored alongside the receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub ml_check: MlCheckResult,
    pub ai_detection: Option<FraudJudgment>,
    pub overall_risk: OverallRisk,
    pub analysis_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub degraded: bool,
}
