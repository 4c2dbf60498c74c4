//! Risk tiers and review alert data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::receipt::ProcessedReceipt;

/// Overall risk classification shown to reviewers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallRisk {
    Low,
    Medium,
    High,
}

impl OverallRisk {
    /// Determine risk tier from a score and thresholds
    pub fn from_score(score: f64, thresholds: &RiskThresholds) -> Self {
        if score >= thresholds.high {
            OverallRisk::High
        } else if score >= thresholds.medium {
            OverallRisk::Medium
        } else {
            OverallRisk::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallRisk::Low => "LOW",
            OverallRisk::Medium => "MEDIUM",
            OverallRisk::High => "HIGH",
        }
    }

    /// Anything above LOW goes to manager review
    pub fn is_flagged(&self) -> bool {
        *self != OverallRisk::Low
    }
}

impl std::fmt::Display for OverallRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configurable risk tier thresholds (inclusive lower bounds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.4,
            high: 0.7,
        }
    }
}

impl RiskThresholds {
    /// `0 <= medium <= high <= 1`, so every tier is reachable from a score
    pub fn is_ordered(&self) -> bool {
        0.0 <= self.medium && self.medium <= self.high && self.high <= 1.0
    }
}

/// Alert published when a processed receipt needs manager review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Flagged receipt
    pub receipt_id: String,

    /// Employee who uploaded the receipt
    pub uploaded_by: String,

    /// Manager responsible for the review, if known
    pub supervisor_id: Option<String>,

    pub overall_risk: OverallRisk,

    /// Final fraud probability (0.0 - 1.0)
    pub fraud_probability: f64,

    /// Explanation lines from both signals
    pub reasons: Vec<String>,

    /// Set when the AI judgment was unavailable
    pub degraded: bool,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl ReviewAlert {
    /// Build an alert for a receipt
    pub fn for_receipt(receipt: &ProcessedReceipt) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            receipt_id: receipt.id.clone(),
            uploaded_by: receipt.uploaded_by.clone(),
            supervisor_id: receipt.supervisor_id.clone(),
            overall_risk: receipt.fraud_analysis.overall_risk,
            fraud_probability: receipt.fraud_probability,
            reasons: receipt
                .explanation
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            degraded: receipt.fraud_analysis.degraded,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_ordering() {
        assert!(RiskThresholds::default().is_ordered());
        assert!(RiskThresholds { medium: 0.5, high: 0.5 }.is_ordered());
        assert!(!RiskThresholds { medium: 0.4, high: 1.5 }.is_ordered());
        assert!(!RiskThresholds { medium: 0.8, high: 0.7 }.is_ordered());
        assert!(!RiskThresholds { medium: -0.1, high: 0.7 }.is_ordered());
        assert!(!RiskThresholds { medium: f64::NAN, high: 0.7 }.is_ordered());
    }

    #[test]
    fn test_risk_from_score() {
        let thresholds = RiskThresholds::default();

        assert_eq!(OverallRisk::from_score(0.1, &thresholds), OverallRisk::Low);
        assert_eq!(OverallRisk::from_score(0.39, &thresholds), OverallRisk::Low);
        assert_eq!(OverallRisk::from_score(0.4, &thresholds), OverallRisk::Medium);
        assert_eq!(OverallRisk::from_score(0.69, &thresholds), OverallRisk::Medium);
        assert_eq!(OverallRisk::from_score(0.7, &thresholds), OverallRisk::High);
        assert_eq!(OverallRisk::from_score(1.0, &thresholds), OverallRisk::High);
    }

    #[test]
    fn test_risk_ordering_and_wire_format() {
        assert!(OverallRisk::Low < OverallRisk::Medium);
        assert!(OverallRisk::Medium < OverallRisk::High);
        assert_eq!(serde_json::to_string(&OverallRisk::Medium).unwrap(), "\"MEDIUM\"");
        assert_eq!(
            serde_json::from_str::<OverallRisk>("\"HIGH\"").unwrap(),
            OverallRisk::High
        );
        assert!(!OverallRisk::Low.is_flagged());
        assert!(OverallRisk::Medium.is_flagged());
    }
}
