//! OpenAI-compatible reasoning adapter with `response_format: json_schema`.
//!
//! API key: `OPENAI_API_KEY`. Base URL and model come from [`CoreConfig`].

use super::{Oracle, ReasoningRequest};
use crate::config::{env_secret, CoreConfig, ENV_OPENAI_API_KEY};
use crate::error::OracleError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaSpec<'a>,
}

#[derive(Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiOracle {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
    timeout_secs: u64,
    max_retries: u32,
    backoff: Duration,
}

impl OpenAiOracle {
    /// Oracle using `OPENAI_API_KEY`; fails when the key is unset or blank.
    pub fn from_config(config: &CoreConfig) -> Result<Self, OracleError> {
        let key = env_secret(ENV_OPENAI_API_KEY)
            .ok_or(OracleError::MissingCredentials(ENV_OPENAI_API_KEY))?;
        Ok(Self::new(key, config))
    }

    pub fn new(api_key: String, config: &CoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.oracle_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            timeout_secs: config.oracle_timeout_secs,
            max_retries: config.oracle_max_retries,
            backoff: Duration::from_millis(config.oracle_backoff_ms),
        }
    }

    async fn call_once(&self, request: &ReasoningRequest) -> Result<String, OracleError> {
        let body = chat_body(request);

        let res = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout_secs)
                } else {
                    OracleError::from(e)
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| OracleError::InvalidJson(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)
    }
}

fn chat_body(request: &ReasoningRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: request
            .turns
            .iter()
            .map(|t| ChatMessage {
                role: t.role.as_str(),
                content: &t.content,
            })
            .collect(),
        response_format: request.schema.as_ref().map(|s| ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaSpec {
                name: &s.name,
                // strict mode requires additionalProperties: false throughout
                strict: false,
                schema: &s.schema,
            },
        }),
    }
}

/// Transport failures, timeouts, 429 and 5xx are worth another attempt.
fn is_retryable(err: &OracleError) -> bool {
    match err {
        OracleError::Transport(_) | OracleError::Timeout(_) => true,
        OracleError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait::async_trait]
impl Oracle for OpenAiOracle {
    fn name(&self) -> &str {
        "openai"
    }

    async fn reason(&self, request: &ReasoningRequest) -> Result<serde_json::Value, OracleError> {
        let mut attempt = 0u32;
        let content = loop {
            match self.call_once(request).await {
                Ok(content) => break content,
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        schema = request.schema_name(),
                        "oracle call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, schema = request.schema_name(), "oracle call failed");
                    return Err(e);
                }
            }
        };

        tracing::debug!(schema = request.schema_name(), bytes = content.len(), "oracle responded");

        if request.schema.is_none() {
            return Ok(serde_json::Value::String(content));
        }
        serde_json::from_str(&content).map_err(|e| OracleError::InvalidJson(e.to_string()))
    }
}
