//! Oracle client: structured reasoning and raw web search behind two small traits.
//!
//! The session loop only talks to [`Oracle`] and [`SearchProvider`]. Live adapters speak
//! OpenAI-compatible chat completions and Tavily search; mock adapters answer offline.

mod mock;
mod openai;
mod tavily;

pub use mock::{MockOracle, MockSearch};
pub use openai::OpenAiOracle;
pub use tavily::TavilySearch;

use crate::config::{CoreConfig, LlmMode};
use crate::error::{OracleError, SearchError};
use crate::transcript::Turn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Named JSON schema the oracle must answer with (exactly one JSON object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Immutable request payload for one reasoning call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub turns: Vec<Turn>,
    pub schema: Option<OutputSchema>,
    pub model: String,
}

impl ReasoningRequest {
    pub fn new(turns: Vec<Turn>, schema: Option<OutputSchema>, model: impl Into<String>) -> Self {
        Self {
            turns,
            schema,
            model: model.into(),
        }
    }

    pub fn schema_name(&self) -> &str {
        self.schema.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }
}

/// Structured reasoning capability.
///
/// With a schema attached the response is the parsed JSON object; without one it is the
/// raw text wrapped in `Value::String`. Errors, timeouts and empty/unparseable content all
/// fail with [`OracleError`].
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str {
        "oracle"
    }

    async fn reason(&self, request: &ReasoningRequest) -> Result<serde_json::Value, OracleError>;
}

/// Web search capability. Returns the provider's raw text, even for zero matches.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str {
        "search"
    }

    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

/// Build the oracle and search providers selected by `llm_mode`.
pub fn providers_from_config(
    config: &CoreConfig,
) -> Result<(Arc<dyn Oracle>, Arc<dyn SearchProvider>), OracleError> {
    match config.llm_mode {
        LlmMode::Mock => Ok((Arc::new(MockOracle::new()), Arc::new(MockSearch))),
        LlmMode::Live => {
            let oracle = OpenAiOracle::from_config(config)?;
            let search = TavilySearch::from_config(config)
                .map_err(|_| OracleError::MissingCredentials(crate::config::ENV_TAVILY_API_KEY))?;
            Ok((Arc::new(oracle), Arc::new(search)))
        }
    }
}
