//! Per-message handling for the submission worker

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tracing::{debug, info};

use crate::consumer::decode_submission;
use crate::metrics::PipelineMetrics;
use crate::models::judge::FraudJudge;
use crate::pipeline::{FraudPipeline, PipelineError};
use crate::store::{ReceiptRepository, RepositoryError};
use crate::types::alert::ReviewAlert;
use crate::types::receipt::ProcessedReceipt;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("failed to decode submission: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of one handled submission
#[derive(Debug)]
pub struct Handled {
    pub receipt: ProcessedReceipt,
    /// Present when the receipt needs manager review
    pub alert: Option<ReviewAlert>,
}

/// Decode, score and persist one submission message.
///
/// Nothing is persisted when scoring fails. Publishing the alert is left
/// to the caller.
pub async fn handle_submission<J, R>(
    payload: &[u8],
    pipeline: &FraudPipeline<J>,
    repository: &R,
    metrics: &PipelineMetrics,
) -> Result<Handled, WorkerError>
where
    J: FraudJudge,
    R: ReceiptRepository + ?Sized,
{
    let started = Instant::now();
    let result = score_and_store(payload, pipeline, repository).await;

    match &result {
        Ok(handled) => {
            let receipt = &handled.receipt;
            let elapsed = started.elapsed();
            metrics.record_receipt(
                elapsed,
                receipt.fraud_probability,
                receipt.fraud_analysis.degraded,
            );

            if let Some(alert) = &handled.alert {
                metrics.record_flagged(alert.overall_risk);
                info!(
                    receipt_id = %receipt.id,
                    overall_risk = %alert.overall_risk,
                    fraud_probability = receipt.fraud_probability,
                    degraded = alert.degraded,
                    processing_time_us = elapsed.as_micros(),
                    "Receipt flagged for review"
                );
            } else {
                debug!(
                    receipt_id = %receipt.id,
                    fraud_probability = receipt.fraud_probability,
                    processing_time_us = elapsed.as_micros(),
                    "Receipt processed (low risk)"
                );
            }
        }
        Err(_) => metrics.record_pipeline_error(),
    }

    result
}

async fn score_and_store<J, R>(
    payload: &[u8],
    pipeline: &FraudPipeline<J>,
    repository: &R,
) -> Result<Handled, WorkerError>
where
    J: FraudJudge,
    R: ReceiptRepository + ?Sized,
{
    let submission = decode_submission(payload)?;
    let receipt = pipeline.process(&submission).await?;

    let alert = receipt
        .is_fraudulent
        .then(|| ReviewAlert::for_receipt(&receipt));

    repository.save(receipt.clone()).await?;

    Ok(Handled { receipt, alert })
}

/// Bounded set of detached message tasks.
///
/// `spawn` waits for a free slot; `shutdown` waits until every spawned task
/// has finished.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: u32,
}

impl WorkerPool {
    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size as usize)),
            size,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub async fn spawn<F>(&self, task: F) -> Result<(), AcquireError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self.semaphore.clone().acquire_owned().await?;
        tokio::spawn(async move {
            task.await;
            drop(permit);
        });
        Ok(())
    }

    /// Wait for in-flight tasks, then refuse new ones
    pub async fn shutdown(&self) -> Result<(), AcquireError> {
        let _all = self.semaphore.acquire_many(self.size).await?;
        self.semaphore.close();
        Ok(())
    }
}
