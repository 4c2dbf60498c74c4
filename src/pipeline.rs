//! Receipt fraud pipeline: rule score, AI judgment, aggregation

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, FallbackPolicy};
use crate::metrics::PipelineMetrics;
use crate::models::aggregator::RiskAggregator;
use crate::models::judge::{FraudJudge, JudgeError, JudgeRequest};
use crate::rule_scorer::RuleScorer;
use crate::types::assessment::{FraudAnalysis, FraudJudgment, MlCheckResult, RiskAssessment};
use crate::types::image::ReceiptImage;
use crate::types::receipt::{ProcessedReceipt, ReceiptStatus, ReceiptSubmission};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Judge(#[from] JudgeError),
    #[error("invalid submission: {0}")]
    InvalidInput(String),
    #[error("processing cancelled")]
    Cancelled,
}

/// Runtime knobs for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on a single judge attempt
    pub judge_timeout: Duration,
    /// Extra attempts after a model-unavailable failure
    pub judge_max_retries: u32,
    pub fallback: FallbackPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            judge_timeout: Duration::from_secs(30),
            judge_max_retries: 0,
            fallback: FallbackPolicy::RulesOnly,
        }
    }
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            judge_timeout: config.pipeline.judge_timeout(),
            judge_max_retries: config.pipeline.judge_max_retries,
            fallback: config.pipeline.fallback,
        }
    }
}

/// Stateless per-receipt scoring pipeline.
///
/// Persistence and alerting stay with the caller; `process` only builds the
/// record.
pub struct FraudPipeline<J> {
    scorer: RuleScorer,
    judge: J,
    aggregator: RiskAggregator,
    options: PipelineOptions,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl<J: FraudJudge> FraudPipeline<J> {
    pub fn new(judge: J, aggregator: RiskAggregator, options: PipelineOptions) -> Self {
        Self {
            scorer: RuleScorer::new(),
            judge,
            aggregator,
            options,
            metrics: None,
        }
    }

    /// Build from application config
    pub fn from_config(judge: J, config: &AppConfig) -> Self {
        Self::new(
            judge,
            RiskAggregator::new(config.risk.clone()),
            PipelineOptions::from(config),
        )
    }

    /// Record judge latency and failures
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process a submission with no external cancellation.
    pub async fn process(
        &self,
        submission: &ReceiptSubmission,
    ) -> Result<ProcessedReceipt, PipelineError> {
        self.process_with_cancel(submission, std::future::pending::<()>())
            .await
    }

    /// Process a submission, aborting without a result if `cancel` resolves
    /// before the judge answers.
    pub async fn process_with_cancel<C>(
        &self,
        submission: &ReceiptSubmission,
        cancel: C,
    ) -> Result<ProcessedReceipt, PipelineError>
    where
        C: Future<Output = ()> + Send,
    {
        let ml_check = self.scorer.score(&submission.fields);
        debug!(
            score = ml_check.preliminary_risk_score,
            reason = %ml_check.reason,
            "rule check complete"
        );

        let image = submission
            .image
            .as_deref()
            .map(ReceiptImage::from_data_uri)
            .transpose()
            .map_err(|e| PipelineError::InvalidInput(format!("receipt image: {e}")))?;

        let request = JudgeRequest::new(submission.fields.clone())
            .with_transaction_history(submission.transaction_history.clone())
            .with_image(image);
        request.validate()?;

        let outcome = tokio::select! {
            _ = cancel => {
                info!(file_name = %submission.file_name, "receipt processing cancelled");
                return Err(PipelineError::Cancelled);
            }
            outcome = self.judge_with_retry(&request) => outcome,
        };

        let (assessment, ai_detection) = match outcome {
            Ok(judgment) => (self.aggregator.assess(&ml_check, &judgment), Some(judgment)),
            Err(err @ JudgeError::InvalidInput(_)) => return Err(err.into()),
            Err(err) => match self.options.fallback {
                FallbackPolicy::Reject => return Err(err.into()),
                FallbackPolicy::RulesOnly => {
                    warn!(
                        provider = self.judge.provider(),
                        error = %err,
                        "fraud judge unavailable, using rule-based assessment"
                    );
                    (self.aggregator.assess_rules_only(&ml_check), None)
                }
            },
        };

        Ok(self.build_receipt(submission, ml_check, ai_detection, assessment))
    }

    async fn judge_with_retry(&self, request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result =
                match tokio::time::timeout(self.options.judge_timeout, self.judge.judge(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(JudgeError::unavailable("timeout")),
                };

            if let Some(metrics) = &self.metrics {
                metrics.record_judge_call(self.judge.provider(), started.elapsed(), result.is_ok());
            }

            match result {
                Err(err) if err.is_retryable() && attempt < self.options.judge_max_retries => {
                    attempt += 1;
                    warn!(
                        provider = self.judge.provider(),
                        attempt = attempt,
                        error = %err,
                        "retrying fraud judge"
                    );
                }
                other => return other,
            }
        }
    }

    fn build_receipt(
        &self,
        submission: &ReceiptSubmission,
        ml_check: MlCheckResult,
        ai_detection: Option<FraudJudgment>,
        assessment: RiskAssessment,
    ) -> ProcessedReceipt {
        let id = submission
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        ProcessedReceipt {
            id,
            file_name: submission.file_name.clone(),
            image_reference: submission.image_reference.clone(),
            extracted_fields: submission.fields.clone(),
            is_fraudulent: assessment.is_fraudulent,
            fraud_probability: assessment.fraud_probability,
            explanation: assessment.explanation,
            fraud_analysis: FraudAnalysis {
                ml_check,
                ai_detection,
                overall_risk: assessment.overall_risk,
                analysis_timestamp: Utc::now(),
                degraded: assessment.degraded,
            },
            uploaded_at: submission.submitted_at,
            uploaded_by: submission.uploaded_by.clone(),
            supervisor_id: submission.supervisor_id.clone(),
            status: ReceiptStatus::PendingApproval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JudgeProvider;
    use crate::models::aggregator::AI_UNAVAILABLE_NOTE;
    use crate::models::build_judge;
    use crate::models::judge::StaticFraudJudge;
    use crate::types::alert::OverallRisk;
    use crate::types::field::ReceiptField;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn submission(fields: &[(&str, &str)]) -> ReceiptSubmission {
        ReceiptSubmission::new(
            "receipt.jpg",
            "receipts/receipt.jpg",
            fields
                .iter()
                .map(|(l, v)| ReceiptField::new(*l, *v))
                .collect(),
            "employee@example.com",
        )
    }

    fn clean_submission() -> ReceiptSubmission {
        submission(&[
            ("Vendor", "Acme Corp"),
            ("Date", "2024-01-01"),
            ("Total Amount", "$25.00"),
        ])
    }

    fn pipeline<J: FraudJudge>(judge: J, options: PipelineOptions) -> FraudPipeline<J> {
        FraudPipeline::new(judge, RiskAggregator::default(), options)
    }

    /// Fails a fixed number of times, then answers low risk
    struct FlakyJudge {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl FraudJudge for FlakyJudge {
        fn provider(&self) -> &'static str {
            "flaky"
        }

        async fn judge(&self, _request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(JudgeError::unavailable("503 Service Unavailable"))
            } else {
                Ok(FraudJudgment {
                    fraudulent: false,
                    fraud_probability: 0.05,
                    explanation: "Consistent receipt.".to_string(),
                })
            }
        }
    }

    struct SlowJudge(Duration);

    #[async_trait]
    impl FraudJudge for SlowJudge {
        fn provider(&self) -> &'static str {
            "slow"
        }

        async fn judge(&self, _request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
            tokio::time::sleep(self.0).await;
            Ok(FraudJudgment {
                fraudulent: false,
                fraud_probability: 0.0,
                explanation: "Too late.".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_clean_receipt_is_low_risk() {
        let p = pipeline(StaticFraudJudge::low_risk(), PipelineOptions::default());
        let receipt = p.process(&clean_submission()).await.unwrap();

        assert!(!receipt.is_fraudulent);
        assert_eq!(receipt.fraud_probability, 0.1);
        assert_eq!(receipt.fraud_analysis.overall_risk, OverallRisk::Low);
        assert_eq!(receipt.status, ReceiptStatus::PendingApproval);
        assert!(receipt.fraud_analysis.ai_detection.is_some());
        assert!(!receipt.explanation.is_empty());
        assert!(!receipt.id.is_empty());
    }

    #[tokio::test]
    async fn test_rule_signal_overrides_lenient_judge() {
        let p = pipeline(StaticFraudJudge::low_risk(), PipelineOptions::default());
        let receipt = p
            .process(&submission(&[
                ("Total Amount", "$1200"),
                ("Vendor", "Joe's Bar"),
                ("Date", "2024-01-01"),
            ]))
            .await
            .unwrap();

        assert!(receipt.is_fraudulent);
        assert_eq!(receipt.fraud_probability, 1.0);
        assert_eq!(receipt.fraud_analysis.overall_risk, OverallRisk::High);
        assert_eq!(receipt.fraud_analysis.ml_check.preliminary_risk_score, 1.0);
    }

    #[tokio::test]
    async fn test_submission_id_is_kept() {
        let mut input = clean_submission();
        input.id = Some("rcpt-42".to_string());

        let p = pipeline(StaticFraudJudge::low_risk(), PipelineOptions::default());
        let receipt = p.process(&input).await.unwrap();
        assert_eq!(receipt.id, "rcpt-42");
        assert_eq!(receipt.uploaded_at, input.submitted_at);
    }

    #[tokio::test]
    async fn test_unavailable_judge_falls_back_to_rules() {
        let p = pipeline(
            StaticFraudJudge::failing(JudgeError::unavailable("model is overloaded")),
            PipelineOptions::default(),
        );
        let receipt = p.process(&clean_submission()).await.unwrap();

        assert!(receipt.fraud_analysis.degraded);
        assert!(receipt.fraud_analysis.ai_detection.is_none());
        assert!(receipt.explanation.starts_with(AI_UNAVAILABLE_NOTE));
        assert_eq!(receipt.fraud_probability, 0.1);
        assert!(!receipt.is_fraudulent);
    }

    #[tokio::test]
    async fn test_disabled_judge_scores_by_rules_only() {
        let mut config = AppConfig::default();
        config.judge.provider = JudgeProvider::Static;

        let judge = build_judge(&config.judge).unwrap();
        let p = FraudPipeline::from_config(judge, &config);
        let receipt = p.process(&clean_submission()).await.unwrap();

        assert!(receipt.fraud_analysis.degraded);
        assert!(receipt.fraud_analysis.ai_detection.is_none());
        assert!(receipt.explanation.starts_with(AI_UNAVAILABLE_NOTE));
        assert_eq!(receipt.fraud_analysis.overall_risk, OverallRisk::Low);

        config.pipeline.fallback = FallbackPolicy::Reject;
        let judge = build_judge(&config.judge).unwrap();
        let p = FraudPipeline::from_config(judge, &config);
        assert!(matches!(
            p.process(&clean_submission()).await,
            Err(PipelineError::Judge(JudgeError::ModelUnavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reject_policy_surfaces_error() {
        let p = pipeline(
            StaticFraudJudge::failing(JudgeError::unavailable("503")),
            PipelineOptions {
                fallback: FallbackPolicy::Reject,
                ..PipelineOptions::default()
            },
        );

        assert_eq!(
            p.process(&clean_submission()).await.unwrap_err(),
            PipelineError::Judge(JudgeError::unavailable("503"))
        );
    }

    #[tokio::test]
    async fn test_empty_submission_is_invalid() {
        let p = pipeline(StaticFraudJudge::low_risk(), PipelineOptions::default());

        assert!(matches!(
            p.process(&submission(&[])).await,
            Err(PipelineError::Judge(JudgeError::InvalidInput(_)))
        ));
    }

    #[tokio::test]
    async fn test_bad_image_uri_is_invalid() {
        let mut input = clean_submission();
        input.image = Some("not-a-data-uri".to_string());

        let p = pipeline(StaticFraudJudge::low_risk(), PipelineOptions::default());
        assert!(matches!(
            p.process(&input).await,
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_retries_until_judge_recovers() {
        let judge = FlakyJudge {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let p = pipeline(
            judge,
            PipelineOptions {
                judge_max_retries: 2,
                ..PipelineOptions::default()
            },
        );

        let receipt = p.process(&clean_submission()).await.unwrap();
        assert!(!receipt.fraud_analysis.degraded);
        assert_eq!(p.judge.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let judge = FlakyJudge {
            failures: 5,
            calls: AtomicU32::new(0),
        };
        let p = pipeline(
            judge,
            PipelineOptions {
                judge_max_retries: 1,
                ..PipelineOptions::default()
            },
        );

        let receipt = p.process(&clean_submission()).await.unwrap();
        assert!(receipt.fraud_analysis.degraded);
        assert_eq!(p.judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_judge_timeout_is_unavailable() {
        let p = pipeline(
            SlowJudge(Duration::from_millis(200)),
            PipelineOptions {
                judge_timeout: Duration::from_millis(10),
                fallback: FallbackPolicy::Reject,
                ..PipelineOptions::default()
            },
        );

        assert_eq!(
            p.process(&clean_submission()).await.unwrap_err(),
            PipelineError::Judge(JudgeError::unavailable("timeout"))
        );
    }

    #[tokio::test]
    async fn test_cancellation_aborts() {
        let p = pipeline(SlowJudge(Duration::from_secs(5)), PipelineOptions::default());
        let cancel = tokio::time::sleep(Duration::from_millis(10));

        assert_eq!(
            p.process_with_cancel(&clean_submission(), cancel)
                .await
                .unwrap_err(),
            PipelineError::Cancelled
        );
    }

    #[tokio::test]
    async fn test_metrics_record_judge_calls() {
        let metrics = Arc::new(PipelineMetrics::new());
        let p = pipeline(
            StaticFraudJudge::failing(JudgeError::unavailable("503")),
            PipelineOptions::default(),
        )
        .with_metrics(metrics.clone());

        p.process(&clean_submission()).await.unwrap();
        assert_eq!(metrics.judge_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_judge_stats()["static"].calls, 1);
    }
}
