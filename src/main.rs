//! Receipt Fraud Pipeline - Main Entry Point
//!
//! Consumes receipt submissions from NATS, scores them, stores the results
//! and publishes review alerts for flagged receipts.

use anyhow::{Context, Result};
use futures::StreamExt;
use receipt_fraud_pipeline::{
    config::{AppConfig, LoggingConfig},
    consumer::SubmissionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    models::{build_judge, FraudJudge},
    pipeline::FraudPipeline,
    producer::AlertProducer,
    store::{InMemoryReceiptRepository, ReceiptRepository},
    worker::{handle_submission, WorkerPool},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("receipt_fraud_pipeline={}", logging.level)))
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());
    let config = AppConfig::load_from_path(&config_path)?;

    init_logging(&config.logging)?;
    info!(config = %config_path, "Starting Receipt Fraud Pipeline");
    info!(
        medium = config.risk.medium,
        high = config.risk.high,
        fallback = ?config.pipeline.fallback,
        judge_timeout_ms = config.pipeline.judge_timeout_ms,
        "Risk policy loaded"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let judge = build_judge(&config.judge)?;
    info!(provider = judge.provider(), model = %config.judge.model, "Fraud judge initialized");

    let pipeline =
        Arc::new(FraudPipeline::from_config(judge, &config).with_metrics(metrics.clone()));
    let repository: Arc<dyn ReceiptRepository> = Arc::new(InMemoryReceiptRepository::new());
    info!(backend = repository.backend_tag(), "Receipt repository ready");

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = SubmissionConsumer::new(client.clone(), &config.nats.submission_subject);
    let producer = Arc::new(AlertProducer::new(client.clone(), &config.nats.alert_subject));
    info!(
        submissions = consumer.subject(),
        alerts = producer.subject(),
        workers = config.pipeline.workers,
        "Starting receipt processing loop"
    );

    // Periodic metrics summary
    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let workers = u32::try_from(config.pipeline.workers).context("Worker count exceeds u32")?;
    let pool = WorkerPool::new(workers);
    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let pipeline = pipeline.clone();
        let repository = repository.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        pool.spawn(async move {
            let outcome = handle_submission(
                &message.payload,
                pipeline.as_ref(),
                repository.as_ref(),
                metrics.as_ref(),
            )
            .await;

            match outcome {
                Ok(handled) => {
                    if let Some(alert) = handled.alert {
                        if let Err(e) = producer.publish(&alert).await {
                            error!(
                                receipt_id = %alert.receipt_id,
                                error = %e,
                                "Failed to publish review alert"
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Receipt submission not processed");
                }
            }
        })
        .await
        .context("Worker pool closed")?;
    }

    info!("Pipeline shutting down, waiting for in-flight receipts...");
    pool.shutdown().await.context("Worker pool closed")?;
    metrics.print_summary();

    Ok(())
}
