//! Gemini `generateContent` fraud judge

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::JudgeConfig;
use crate::models::judge::{validate_judgment, FraudJudge, JudgeError, JudgeRequest};
use crate::models::prompt::{render_prompt, response_schema};
use crate::types::assessment::FraudJudgment;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Fraud judge backed by a Gemini model over HTTP.
pub struct GeminiFraudJudge {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiFraudJudge {
    /// Build a judge from configuration, reading the API key from the
    /// configured environment variable.
    pub fn new(config: &JudgeConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} is not set", config.api_key_env))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &JudgeConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(request: &JudgeRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: render_prompt(request),
        }];
        if let Some(image) = &request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.media_type.clone(),
                    data: image.to_base64(),
                },
            });
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }
}

#[async_trait]
impl FraudJudge for GeminiFraudJudge {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<FraudJudgment, JudgeError> {
        request.validate()?;

        let body = Self::build_request(request);
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    JudgeError::unavailable("timeout")
                } else {
                    JudgeError::unavailable(format!("request failed: {e}"))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| JudgeError::unavailable(format!("reading response failed: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "fraud model returned an error status");
            return Err(JudgeError::unavailable(format!(
                "server returned {}: {}",
                status.as_u16(),
                truncate(&text, 200)
            )));
        }

        let judgment = parse_response(&text)?;
        debug!(
            fraudulent = judgment.fraudulent,
            fraud_probability = judgment.fraud_probability,
            "fraud model judgment received"
        );
        Ok(judgment)
    }
}

/// Decode and validate a `generateContent` response body.
pub fn parse_response(body: &str) -> Result<FraudJudgment, JudgeError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| JudgeError::unavailable(format!("malformed response: {e}")))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| JudgeError::unavailable("response has no candidate text"))?;

    let judgment: FraudJudgment = serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| JudgeError::unavailable(format!("output failed schema: {e}")))?;

    validate_judgment(judgment)
}

/// Models sometimes wrap JSON in a markdown fence despite the mime type
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
