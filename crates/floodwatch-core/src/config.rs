//! Runtime configuration: file + `FLOODWATCH__*` environment, secrets from plain env vars.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_TAVILY_API_KEY: &str = "TAVILY_API_KEY";

/// Which oracle/search providers the runtime wires in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    /// Deterministic offline providers.
    #[default]
    Mock,
    /// OpenAI-compatible reasoning + Tavily search.
    Live,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

/// Core configuration.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | llm_mode | mock | `mock` or `live` |
/// | api_base | https://api.openai.com/v1 | OpenAI-compatible base URL |
/// | reasoning_model | o4-mini-2025-04-16 | Model id sent with every reasoning request |
/// | oracle_timeout_secs | 120 | Per-request timeout |
/// | oracle_max_retries | 2 | Retries after transport/status failures |
/// | oracle_backoff_ms | 500 | First backoff delay, doubled per retry |
/// | search_url | https://api.tavily.com/search | Search endpoint |
/// | max_search_queries | 6 | Queries executed per search step |
/// | max_planning_rounds | 10 | Oracle calls before the scene loop gives up |
/// | transcript_window | 0 | Trailing turns sent per analysis request (0 = all) |
/// | storage | memory | `memory` or `sled` |
/// | storage_path | ./data/sessions | sled directory |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub llm_mode: LlmMode,
    pub api_base: String,
    pub reasoning_model: String,
    pub oracle_timeout_secs: u64,
    pub oracle_max_retries: u32,
    pub oracle_backoff_ms: u64,
    pub search_url: String,
    pub max_search_queries: usize,
    pub max_planning_rounds: u32,
    #[serde(default)]
    pub transcript_window: usize,
    pub storage: StorageBackend,
    pub storage_path: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            llm_mode: LlmMode::Mock,
            api_base: "https://api.openai.com/v1".to_string(),
            reasoning_model: "o4-mini-2025-04-16".to_string(),
            oracle_timeout_secs: 120,
            oracle_max_retries: 2,
            oracle_backoff_ms: 500,
            search_url: "https://api.tavily.com/search".to_string(),
            max_search_queries: 6,
            max_planning_rounds: 10,
            transcript_window: 0,
            storage: StorageBackend::Memory,
            storage_path: "./data/sessions".to_string(),
        }
    }
}

impl CoreConfig {
    /// Load config from file and environment.
    /// Precedence: `FLOODWATCH__*` env > file at `FLOODWATCH_CONFIG` (default `config/floodwatch`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("FLOODWATCH_CONFIG").unwrap_or_else(|_| "config/floodwatch".to_string());
        let d = CoreConfig::default();
        let builder = config::Config::builder()
            .set_default("llm_mode", "mock")?
            .set_default("api_base", d.api_base)?
            .set_default("reasoning_model", d.reasoning_model)?
            .set_default("oracle_timeout_secs", d.oracle_timeout_secs as i64)?
            .set_default("oracle_max_retries", i64::from(d.oracle_max_retries))?
            .set_default("oracle_backoff_ms", d.oracle_backoff_ms as i64)?
            .set_default("search_url", d.search_url)?
            .set_default("max_search_queries", d.max_search_queries as i64)?
            .set_default("max_planning_rounds", i64::from(d.max_planning_rounds))?
            .set_default("transcript_window", d.transcript_window as i64)?
            .set_default("storage", "memory")?
            .set_default("storage_path", d.storage_path)?;

        let builder = if Path::new(&config_path).exists()
            || Path::new(&format!("{config_path}.toml")).exists()
        {
            builder.add_source(config::File::with_name(&config_path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("FLOODWATCH").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}

/// Secret from the environment; unset or blank => `None`.
pub fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_offline() {
        let c = CoreConfig::default();
        assert_eq!(c.llm_mode, LlmMode::Mock);
        assert_eq!(c.storage, StorageBackend::Memory);
        assert_eq!(c.max_search_queries, 6);
        assert_eq!(c.max_planning_rounds, 10);
    }

    #[test]
    fn modes_parse_lowercase() {
        let m: LlmMode = serde_json::from_str("\"live\"").unwrap();
        assert_eq!(m, LlmMode::Live);
        let s: StorageBackend = serde_json::from_str("\"sled\"").unwrap();
        assert_eq!(s, StorageBackend::Sled);
    }
}
