//! Risk aggregation of the rule score and the AI judgment

use crate::types::alert::{OverallRisk, RiskThresholds};
use crate::types::assessment::{
    clamp_unit, FraudJudgment, MlCheckResult, RiskAssessment, NO_RISK_FACTORS,
};

/// Explanation prefix for assessments made without the AI judgment
pub const AI_UNAVAILABLE_NOTE: &str =
    "AI assessment unavailable; risk based on rule-based check only.";

/// Combines the two upstream signals into the final risk shown to reviewers.
///
/// The more alarming signal always wins; scores are never averaged.
#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    thresholds: RiskThresholds,
}

impl RiskAggregator {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Overall risk tier.
    ///
    /// HIGH when the judge says fraudulent or either score reaches the high
    /// threshold, MEDIUM when either score reaches the medium threshold,
    /// LOW otherwise.
    pub fn aggregate(&self, ml: &MlCheckResult, judgment: &FraudJudgment) -> OverallRisk {
        if judgment.fraudulent {
            return OverallRisk::High;
        }
        OverallRisk::from_score(combined_score(ml, judgment), &self.thresholds)
    }

    /// Full assessment for persistence.
    pub fn assess(&self, ml: &MlCheckResult, judgment: &FraudJudgment) -> RiskAssessment {
        let overall_risk = self.aggregate(ml, judgment);

        RiskAssessment {
            is_fraudulent: overall_risk.is_flagged(),
            fraud_probability: combined_score(ml, judgment),
            overall_risk,
            explanation: join_explanations(&[&judgment.explanation, &ml.reason]),
            degraded: false,
        }
    }

    /// Degraded assessment when no judgment could be obtained.
    pub fn assess_rules_only(&self, ml: &MlCheckResult) -> RiskAssessment {
        let score = clamp_unit(ml.preliminary_risk_score);
        let overall_risk = OverallRisk::from_score(score, &self.thresholds);

        RiskAssessment {
            is_fraudulent: overall_risk.is_flagged(),
            fraud_probability: score,
            overall_risk,
            explanation: join_explanations(&[AI_UNAVAILABLE_NOTE, &ml.reason]),
            degraded: true,
        }
    }
}

fn combined_score(ml: &MlCheckResult, judgment: &FraudJudgment) -> f64 {
    clamp_unit(judgment.fraud_probability).max(clamp_unit(ml.preliminary_risk_score))
}

fn join_explanations(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.is_empty() {
        NO_RISK_FACTORS.to_string()
    } else {
        joined
    }
}
