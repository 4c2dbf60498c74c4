//! Receipt submissions and processed receipt records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::assessment::FraudAnalysis;
use crate::types::field::ReceiptField;

/// Manager workflow status of a stored receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    #[default]
    PendingApproval,
    Approved,
    Rejected,
    Draft,
}

/// Receipt upload event handed to the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSubmission {
    /// Receipt identifier; generated when absent
    #[serde(default)]
    pub id: Option<String>,

    pub file_name: String,

    /// Location of the stored image (storage path or URL)
    pub image_reference: String,

    /// Inline image as a `data:<mime>;base64,...` URI, forwarded to the judge
    #[serde(default)]
    pub image: Option<String>,

    /// Extracted fields in document order
    #[serde(default)]
    pub fields: Vec<ReceiptField>,

    /// Free-text transaction history for the judge
    #[serde(default)]
    pub transaction_history: Option<String>,

    /// Uploading employee (email)
    pub uploaded_by: String,

    #[serde(default)]
    pub supervisor_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl ReceiptSubmission {
    /// Create a submission with only the required fields
    pub fn new(
        file_name: impl Into<String>,
        image_reference: impl Into<String>,
        fields: Vec<ReceiptField>,
        uploaded_by: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            file_name: file_name.into(),
            image_reference: image_reference.into(),
            image: None,
            fields,
            transaction_history: None,
            uploaded_by: uploaded_by.into(),
            supervisor_id: None,
            submitted_at: Utc::now(),
        }
    }
}

/// Persisted receipt. Fraud fields are written once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedReceipt {
    pub id: String,
    pub file_name: String,
    pub image_reference: String,
    pub extracted_fields: Vec<ReceiptField>,

    pub is_fraudulent: bool,
    /// max(judge probability, rule score), clamped to [0, 1]
    pub fraud_probability: f64,
    /// Never empty
    pub explanation: String,

    pub fraud_analysis: FraudAnalysis,

    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub status: ReceiptStatus,
}

impl ProcessedReceipt {
    /// Flagged and still awaiting a manager decision
    pub fn awaits_review(&self) -> bool {
        self.is_fraudulent && self.status == ReceiptStatus::PendingApproval
    }
}
