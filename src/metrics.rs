//! Throughput, latency and outcome tracking for the receipt fraud pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

use crate::types::alert::OverallRisk;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Receipts that produced a record
    pub receipts_processed: AtomicU64,
    /// Records flagged for manager review
    pub receipts_flagged: AtomicU64,
    /// Records assessed without the AI judgment
    pub degraded_assessments: AtomicU64,
    /// Judge calls that returned an error or timed out
    pub judge_failures: AtomicU64,
    /// Submissions that produced no record
    pub pipeline_errors: AtomicU64,
    flagged_by_risk: RwLock<HashMap<OverallRisk, u64>>,
    /// End-to-end processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Judge call times per provider (in microseconds)
    judge_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Final fraud probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            receipts_processed: AtomicU64::new(0),
            receipts_flagged: AtomicU64::new(0),
            degraded_assessments: AtomicU64::new(0),
            judge_failures: AtomicU64::new(0),
            pipeline_errors: AtomicU64::new(0),
            flagged_by_risk: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            judge_times: RwLock::new(HashMap::new()),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a processed receipt
    pub fn record_receipt(&self, processing_time: Duration, fraud_probability: f64, degraded: bool) {
        self.receipts_processed.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_assessments.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (fraud_probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a receipt sent to manager review
    pub fn record_flagged(&self, risk: OverallRisk) {
        self.receipts_flagged.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_risk) = self.flagged_by_risk.write() {
            *by_risk.entry(risk).or_insert(0) += 1;
        }
    }

    /// Record one judge attempt
    pub fn record_judge_call(&self, provider: &str, duration: Duration, success: bool) {
        if !success {
            self.judge_failures.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.judge_times.write() {
            let provider_times = times.entry(provider.to_string()).or_default();
            provider_times.push(duration.as_micros() as u64);
            if provider_times.len() > 1000 {
                provider_times.drain(0..500);
            }
        }
    }

    pub fn record_pipeline_error(&self) {
        self.pipeline_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self
            .processing_times
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[percentile_index(count, 0.95)],
            p99_us: sorted[percentile_index(count, 0.99)],
            max_us: sorted[count - 1],
        }
    }

    /// Judge latency per provider
    pub fn get_judge_stats(&self) -> HashMap<String, JudgeStats> {
        let times = self.judge_times.read().unwrap_or_else(PoisonError::into_inner);
        let mut stats = HashMap::new();

        for (provider, provider_times) in times.iter() {
            if provider_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = provider_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                provider.clone(),
                JudgeStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[percentile_index(count, 0.99)],
                },
            );
        }

        stats
    }

    /// Receipts per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.receipts_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self.score_buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_flagged_by_risk(&self) -> HashMap<OverallRisk, u64> {
        self.flagged_by_risk
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let processed = self.receipts_processed.load(Ordering::Relaxed);
        let flagged = self.receipts_flagged.load(Ordering::Relaxed);
        let degraded = self.degraded_assessments.load(Ordering::Relaxed);
        let judge_failures = self.judge_failures.load(Ordering::Relaxed);
        let errors = self.pipeline_errors.load(Ordering::Relaxed);
        let flag_rate = if processed > 0 {
            (flagged as f64 / processed as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let by_risk = self.get_flagged_by_risk();

        info!(
            processed = processed,
            flagged = flagged,
            flag_rate = format!("{:.1}%", flag_rate),
            degraded = degraded,
            judge_failures = judge_failures,
            errors = errors,
            throughput = format!("{:.2} receipts/s", self.get_throughput()),
            "Pipeline summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );

        for risk in [OverallRisk::Medium, OverallRisk::High] {
            let count = by_risk.get(&risk).copied().unwrap_or(0);
            info!(risk = %risk, count = count, "Flagged receipts by risk");
        }

        let distribution = self.get_score_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = (count as f64 / total as f64) * 100.0;
            info!(
                "  fraud probability {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }

        for (provider, stats) in &self.get_judge_stats() {
            info!(
                provider = %provider,
                calls = stats.calls,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "Judge latency"
            );
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile_index(count: usize, quantile: f64) -> usize {
    ((count as f64 * quantile) as usize).min(count - 1)
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Judge call statistics
#[derive(Debug)]
pub struct JudgeStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Run the reporting loop forever
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
