//! Rule-based preliminary risk scoring for extracted receipt fields.
//!
//! Fixed additive rules over the field list, saturating at 1.0. The scorer
//! is pure and never fails: a rule that cannot find or parse its input
//! simply does not fire.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::assessment::MlCheckResult;
use crate::types::field::{find_by_label, ReceiptField};

const BASELINE_SCORE: f64 = 0.1;

const HIGH_AMOUNT: f64 = 1000.0;
const HIGH_AMOUNT_WEIGHT: f64 = 0.5;
const SIGNIFICANT_AMOUNT: f64 = 500.0;
const SIGNIFICANT_AMOUNT_WEIGHT: f64 = 0.3;
const VENDOR_CATEGORY_WEIGHT: f64 = 0.4;
const MISSING_FIELDS_WEIGHT: f64 = 0.5;

pub const BASELINE_REASON: &str = "Baseline check passed.";
pub const HIGH_AMOUNT_REASON: &str = "High transaction amount (>$1000).";
pub const SIGNIFICANT_AMOUNT_REASON: &str = "Significant transaction amount (>$500).";
pub const VENDOR_CATEGORY_REASON: &str =
    "Vendor category (e.g., bar, club) often corresponds to non-reimbursable expenses like alcohol.";
pub const MISSING_FIELDS_REASON: &str =
    "Missing one or more critical fields (Vendor, Date, Total).";

/// Vendor name fragments that suggest non-reimbursable spending
const SUSPICIOUS_VENDOR_TERMS: [&str; 3] = ["bar", "club", "lounge"];

/// Label fragments that must each have a usable value
const CRITICAL_LABELS: [&str; 3] = ["vendor", "date", "total"];

/// First run of digits and dots. Thousands separators end the run, so
/// "$1,234.56" reads as 1.
static AMOUNT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9.]+").expect("valid amount pattern"));

/// Longest leading decimal number inside a run ("1.2.3" -> "1.2")
static DECIMAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*(?:\.[0-9]*)?").expect("valid decimal pattern"));

/// Deterministic rule scorer producing a preliminary risk score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleScorer;

impl RuleScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a receipt's fields.
    pub fn score(&self, fields: &[ReceiptField]) -> MlCheckResult {
        let mut risk = BASELINE_SCORE;
        let mut reasons: Vec<&'static str> = Vec::new();

        // Amount: at most one of the two tiers fires
        if let Some(amount) = find_by_label(fields, "total amount").and_then(|f| parse_amount(&f.value)) {
            if amount > HIGH_AMOUNT {
                risk = saturate(risk + HIGH_AMOUNT_WEIGHT);
                reasons.push(HIGH_AMOUNT_REASON);
            } else if amount > SIGNIFICANT_AMOUNT {
                risk = saturate(risk + SIGNIFICANT_AMOUNT_WEIGHT);
                reasons.push(SIGNIFICANT_AMOUNT_REASON);
            }
        }

        if let Some(vendor) = find_by_label(fields, "vendor") {
            let vendor = vendor.value.to_lowercase();
            if SUSPICIOUS_VENDOR_TERMS.iter().any(|term| vendor.contains(term)) {
                risk = saturate(risk + VENDOR_CATEGORY_WEIGHT);
                reasons.push(VENDOR_CATEGORY_REASON);
            }
        }

        if !has_critical_fields(fields) {
            risk = saturate(risk + MISSING_FIELDS_WEIGHT);
            reasons.push(MISSING_FIELDS_REASON);
        }

        let reason = if reasons.is_empty() {
            BASELINE_REASON.to_string()
        } else {
            reasons.join(" ")
        };

        MlCheckResult {
            preliminary_risk_score: round_2dp(risk),
            reason,
        }
    }
}

/// Parse the first numeric-looking run of a value. `None` when nothing
/// parses; the caller treats that as the rule not firing.
pub fn parse_amount(value: &str) -> Option<f64> {
    let run = AMOUNT_RUN.find(value)?.as_str();
    let prefix = DECIMAL_PREFIX.find(run)?.as_str();

    if !prefix.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut normalized = prefix.trim_end_matches('.').to_string();
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }
    normalized.parse::<f64>().ok()
}

fn has_critical_fields(fields: &[ReceiptField]) -> bool {
    CRITICAL_LABELS.iter().all(|needle| {
        fields
            .iter()
            .any(|field| field.label_contains(needle) && field.has_usable_value())
    })
}

fn saturate(score: f64) -> f64 {
    score.min(1.0)
}

fn round_2dp(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<ReceiptField> {
        pairs
            .iter()
            .map(|(label, value)| ReceiptField::new(*label, *value))
            .collect()
    }

    #[test]
    fn test_bar_with_high_amount_saturates() {
        let result = RuleScorer::new().score(&fields(&[
            ("Total Amount", "$1200"),
            ("Vendor", "Joe's Bar"),
            ("Date", "2024-01-01"),
        ]));

        assert_eq!(result.preliminary_risk_score, 1.0);
        assert_eq!(
            result.reason,
            format!("{} {}", HIGH_AMOUNT_REASON, VENDOR_CATEGORY_REASON)
        );
    }

    #[test]
    fn test_empty_fields_missing_critical() {
        let result = RuleScorer::new().score(&[]);

        assert_eq!(result.preliminary_risk_score, 0.6);
        assert_eq!(result.reason, MISSING_FIELDS_REASON);
    }

    #[test]
    fn test_significant_amount() {
        let result = RuleScorer::new().score(&fields(&[
            ("Total Amount", "$600"),
            ("Vendor", "Acme Corp"),
            ("Date", "2024-01-01"),
        ]));

        assert_eq!(result.preliminary_risk_score, 0.4);
        assert_eq!(result.reason, SIGNIFICANT_AMOUNT_REASON);
    }

    #[test]
    fn test_clean_receipt_keeps_baseline() {
        let result = RuleScorer::new().score(&fields(&[
            ("Vendor", "Office Depot"),
            ("Date", "2024-03-02"),
            ("Total Amount", "$42.10"),
        ]));

        assert_eq!(result.preliminary_risk_score, 0.1);
        assert_eq!(result.reason, BASELINE_REASON);
    }

    #[test]
    fn test_amount_boundaries_are_exclusive() {
        let scorer = RuleScorer::new();
        let at = |amount: &str| {
            scorer
                .score(&fields(&[
                    ("Total Amount", amount),
                    ("Vendor", "Acme"),
                    ("Date", "2024-01-01"),
                ]))
                .preliminary_risk_score
        };

        assert_eq!(at("500"), 0.1);
        assert_eq!(at("500.01"), 0.4);
        assert_eq!(at("1000"), 0.4);
        assert_eq!(at("1000.01"), 0.6);
    }

    #[test]
    fn test_unparsable_amount_does_not_fire() {
        let result = RuleScorer::new().score(&fields(&[
            ("Total Amount", "twelve hundred"),
            ("Vendor", "Acme"),
            ("Date", "2024-01-01"),
        ]));

        assert_eq!(result.preliminary_risk_score, 0.1);
        assert_eq!(result.reason, BASELINE_REASON);
    }

    #[test]
    fn test_thousands_separator_reads_leading_digits() {
        // "$1,234.56" stops at the comma
        assert_eq!(parse_amount("$1,234.56"), Some(1.0));

        let result = RuleScorer::new().score(&fields(&[
            ("Total Amount", "$1,234.56"),
            ("Vendor", "Acme"),
            ("Date", "2024-01-01"),
        ]));
        assert_eq!(result.preliminary_risk_score, 0.1);
    }

    #[test]
    fn test_parse_amount_prefixes() {
        assert_eq!(parse_amount("USD 99.95"), Some(99.95));
        assert_eq!(parse_amount("1.2.3"), Some(1.2));
        assert_eq!(parse_amount(".75"), Some(0.75));
        assert_eq!(parse_amount("12."), Some(12.0));
        assert_eq!(parse_amount("..."), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_only_first_total_amount_is_used() {
        let result = RuleScorer::new().score(&fields(&[
            ("Total Amount", "$20"),
            ("Total Amount (USD)", "$5000"),
            ("Vendor", "Acme"),
            ("Date", "2024-01-01"),
        ]));

        assert_eq!(result.preliminary_risk_score, 0.1);
    }

    #[test]
    fn test_vendor_terms_match_substrings() {
        let scorer = RuleScorer::new();
        for vendor in ["Skyline LOUNGE", "Golf Club", "Barnes & Noble"] {
            let result = scorer.score(&fields(&[
                ("Vendor", vendor),
                ("Date", "2024-01-01"),
                ("Total", "$10"),
            ]));
            assert_eq!(result.preliminary_risk_score, 0.5, "vendor {vendor}");
            assert_eq!(result.reason, VENDOR_CATEGORY_REASON);
        }
    }

    #[test]
    fn test_not_found_values_count_as_missing() {
        let result = RuleScorer::new().score(&fields(&[
            ("Vendor", "Acme"),
            ("Date", "Date not found"),
            ("Total Amount", "$15"),
        ]));

        assert_eq!(result.preliminary_risk_score, 0.6);
        assert_eq!(result.reason, MISSING_FIELDS_REASON);
    }

    #[test]
    fn test_completeness_uses_broad_total_label() {
        // "Subtotal" satisfies "total" for completeness but not the amount rule
        let result = RuleScorer::new().score(&fields(&[
            ("Vendor", "Acme"),
            ("Transaction Date", "2024-01-01"),
            ("Subtotal", "$2500"),
        ]));

        assert_eq!(result.preliminary_risk_score, 0.1);
    }

    #[test]
    fn test_every_rule_fires_and_saturates() {
        let result = RuleScorer::new().score(&fields(&[
            ("Total Amount", "$5000"),
            ("Vendor", "Velvet Lounge"),
        ]));

        assert_eq!(result.preliminary_risk_score, 1.0);
        assert_eq!(
            result.reason,
            [HIGH_AMOUNT_REASON, VENDOR_CATEGORY_REASON, MISSING_FIELDS_REASON].join(" ")
        );
    }

    #[test]
    fn test_scoring_is_repeatable() {
        let scorer = RuleScorer::new();
        let input = fields(&[("Total Amount", "$750"), ("Vendor", "Club 9")]);

        assert_eq!(scorer.score(&input), scorer.score(&input));
    }
}
