//! Type definitions for the receipt fraud pipeline

pub mod alert;
pub mod assessment;
pub mod field;
pub mod image;
pub mod receipt;

pub use alert::{OverallRisk, ReviewAlert, RiskThresholds};
pub use assessment::{FraudAnalysis, FraudJudgment, MlCheckResult, RiskAssessment};
pub use field::ReceiptField;
pub use image::{ImageError, ReceiptImage};
pub use receipt::{ProcessedReceipt, ReceiptStatus, ReceiptSubmission};
