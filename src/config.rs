//! Configuration management for the receipt fraud pipeline

use crate::types::alert::RiskThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// What to do when the AI judge cannot produce a judgment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Store the receipt with a degraded, rule-score-only assessment
    #[default]
    RulesOnly,
    /// Fail the submission; nothing is stored
    Reject,
}

/// Which judge implementation to run
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JudgeProvider {
    /// Gemini `generateContent` endpoint
    #[default]
    Gemini,
    /// No model; every receipt takes the fallback path
    Static,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub judge: JudgeConfig,
    #[serde(default)]
    pub risk: RiskThresholds,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming receipt submissions
    pub submission_subject: String,
    /// Subject for outgoing review alerts
    pub alert_subject: String,
}

/// Generative model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    #[serde(default)]
    pub provider: JudgeProvider,
    /// API base URL, without trailing slash
    #[serde(default = "default_judge_base_url")]
    pub base_url: String,
    #[serde(default = "default_judge_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// HTTP request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_judge_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_judge_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_request_timeout_ms() -> u64 {
    20_000
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of receipts processed concurrently
    pub workers: usize,
    /// Upper bound on one judge call, retries excluded
    pub judge_timeout_ms: u64,
    /// Extra attempts after a model-unavailable failure
    #[serde(default)]
    pub judge_max_retries: u32,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    30
}

impl PipelineConfig {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_millis(self.judge_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `RECEIPT_FRAUD__*`
    /// environment overrides (e.g. `RECEIPT_FRAUD__NATS__URL`).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("RECEIPT_FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.risk.is_ordered(),
            "risk thresholds must satisfy 0 <= medium <= high <= 1 (medium = {}, high = {})",
            self.risk.medium,
            self.risk.high
        );
        anyhow::ensure!(self.pipeline.workers > 0, "pipeline.workers must be at least 1");
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                submission_subject: "receipts.submitted".to_string(),
                alert_subject: "receipts.flagged".to_string(),
            },
            judge: JudgeConfig {
                provider: JudgeProvider::Gemini,
                base_url: default_judge_base_url(),
                model: default_judge_model(),
                api_key_env: default_api_key_env(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            risk: RiskThresholds::default(),
            pipeline: PipelineConfig {
                workers: 4,
                judge_timeout_ms: 30_000,
                judge_max_retries: 0,
                fallback: FallbackPolicy::RulesOnly,
                metrics_interval_secs: default_metrics_interval_secs(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
