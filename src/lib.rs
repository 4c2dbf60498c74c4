//! Receipt Fraud Pipeline Library
//!
//! Scores expense receipts for fraud risk by combining a deterministic
//! rule-based check with a generative-model judgment, and routes flagged
//! receipts to manager review.

pub mod config;
pub mod consumer;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod rule_scorer;
pub mod store;
pub mod types;
pub mod worker;

pub use config::AppConfig;
pub use consumer::SubmissionConsumer;
pub use models::{FraudJudge, GeminiFraudJudge, JudgeError, RiskAggregator, StaticFraudJudge};
pub use pipeline::{FraudPipeline, PipelineError};
pub use producer::AlertProducer;
pub use rule_scorer::RuleScorer;
pub use store::{InMemoryReceiptRepository, ReceiptRepository};
pub use types::{
    FraudJudgment, MlCheckResult, OverallRisk, ProcessedReceipt, ReceiptField, ReceiptSubmission,
    ReviewAlert,
};
