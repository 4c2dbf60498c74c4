//! AI fraud judge capability

use async_trait::async_trait;
use thiserror::Error;

use crate::types::assessment::FraudJudgment;
use crate::types::field::{render_fields, ReceiptField};
use crate::types::image::ReceiptImage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JudgeError {
    /// Network failure, timeout, or a response that failed validation
    #[error("fraud model unavailable: {reason}")]
    ModelUnavailable { reason: String },
    /// Nothing usable to describe the receipt
    #[error("invalid judge input: {0}")]
    InvalidInput(String),
}

impl JudgeError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        JudgeError::ModelUnavailable {
            reason: reason.into(),
        }
    }

    /// Only model availability failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, JudgeError::ModelUnavailable { .. })
    }
}

/// Everything the judge sees about one receipt
#[derive(Debug, Clone, Default)]
pub struct JudgeRequest {
    pub fields: Vec<ReceiptField>,
    pub transaction_history: Option<String>,
    pub image: Option<ReceiptImage>,
}

impl JudgeRequest {
    pub fn new(fields: Vec<ReceiptField>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_transaction_history(mut self, history: Option<String>) -> Self {
        self.transaction_history = history.filter(|h| !h.trim().is_empty());
        self
    }

    pub fn with_image(mut self, image: Option<ReceiptImage>) -> Self {
        self.image = image;
        self
    }

    /// Reject requests that give the model nothing to look at
    pub fn validate(&self) -> Result<(), JudgeError> {
        if self.fields.is_empty() && self.image.is_none() {
            return Err(JudgeError::InvalidInput(
                "receipt has no extracted fields and no image".to_string(),
            ));
        }
        Ok(())
    }

    /// Stable text form of the extracted fields
    pub fn receipt_text(&self) -> String {
        render_fields(&self.fields)
    }
}

/// Generative fraud assessment for a single receipt.
///
/// Implementations must not invent a decision on failure: errors are
/// returned so the caller can pick a fallback.
#[async_trait]
pub trait FraudJudge: Send + Sync {
    /// Short provider name for logs and metrics
    fn provider(&self) -> &'static str;

    async fn judge(&self, request: &JudgeRequest) -> Result<FraudJudgment, JudgeError>;
}

#[async_trait]
impl<J: FraudJudge + ?Sized> FraudJudge for std::sync::Arc<J> {
    fn provider(&self) -> &'static str {
        (**self).provider()
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
        (**self).judge(request).await
    }
}

#[async_trait]
impl<J: FraudJudge + ?Sized> FraudJudge for Box<J> {
    fn provider(&self) -> &'static str {
        (**self).provider()
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
        (**self).judge(request).await
    }
}

/// Check a model judgment against the output contract.
pub fn validate_judgment(judgment: FraudJudgment) -> Result<FraudJudgment, JudgeError> {
    let p = judgment.fraud_probability;
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(JudgeError::unavailable(format!(
            "fraudProbability {p} outside [0, 1]"
        )));
    }
    if judgment.explanation.trim().is_empty() {
        return Err(JudgeError::unavailable("empty explanation"));
    }
    Ok(judgment)
}

/// Judge that always answers the same way. Used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct StaticFraudJudge {
    outcome: Result<FraudJudgment, JudgeError>,
}

impl StaticFraudJudge {
    pub fn new(judgment: FraudJudgment) -> Self {
        Self {
            outcome: Ok(judgment),
        }
    }

    pub fn failing(error: JudgeError) -> Self {
        Self {
            outcome: Err(error),
        }
    }

    /// Judge for runs without a model. Every call is unavailable, so the
    /// pipeline's fallback policy decides the outcome.
    pub fn disabled() -> Self {
        Self::failing(JudgeError::unavailable("AI judge disabled"))
    }

    #[cfg(test)]
    pub(crate) fn low_risk() -> Self {
        Self::new(FraudJudgment {
            fraudulent: false,
            fraud_probability: 0.1,
            explanation: "Static judge: no AI assessment performed.".to_string(),
        })
    }
}

#[async_trait]
impl FraudJudge for StaticFraudJudge {
    fn provider(&self) -> &'static str {
        "static"
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
        request.validate()?;
        self.outcome.clone()
    }
}
