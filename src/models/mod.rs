//! Fraud signal components: AI judge and risk aggregation

pub mod aggregator;
pub mod gemini;
pub mod judge;
pub mod prompt;

pub use aggregator::RiskAggregator;
pub use gemini::GeminiFraudJudge;
pub use judge::{FraudJudge, JudgeError, JudgeRequest, StaticFraudJudge};

use std::sync::Arc;

use tracing::warn;

use crate::config::{JudgeConfig, JudgeProvider};

/// Build the judge selected by `[judge].provider`
pub fn build_judge(config: &JudgeConfig) -> anyhow::Result<Arc<dyn FraudJudge>> {
    let judge: Arc<dyn FraudJudge> = match config.provider {
        JudgeProvider::Gemini => Arc::new(GeminiFraudJudge::new(config)?),
        JudgeProvider::Static => {
            warn!("AI judge disabled; receipts are scored by rules only");
            Arc::new(StaticFraudJudge::disabled())
        }
    };
    Ok(judge)
}
