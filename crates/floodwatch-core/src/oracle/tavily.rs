//! Tavily web search. The response body is returned untouched as opaque context.

use super::SearchProvider;
use crate::config::{env_secret, CoreConfig, ENV_TAVILY_API_KEY};
use crate::error::SearchError;
use serde::Serialize;
use std::time::Duration;

/// Fixed search parameters sent with every query.
#[derive(Debug, Serialize)]
struct SearchPayload<'a> {
    query: &'a str,
    topic: &'static str,
    search_depth: &'static str,
    chunks_per_source: u32,
    max_results: u32,
    days: u32,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
}

impl<'a> SearchPayload<'a> {
    fn for_query(query: &'a str) -> Self {
        Self {
            query,
            topic: "general",
            search_depth: "advanced",
            chunks_per_source: 3,
            max_results: 5,
            days: 7,
            include_answer: true,
            include_raw_content: false,
            include_images: false,
        }
    }
}

pub struct TavilySearch {
    api_key: String,
    url: String,
    client: reqwest::Client,
}

impl TavilySearch {
    pub fn from_config(config: &CoreConfig) -> Result<Self, SearchError> {
        let key =
            env_secret(ENV_TAVILY_API_KEY).ok_or(SearchError::MissingCredentials(ENV_TAVILY_API_KEY))?;
        Ok(Self::new(key, &config.search_url))
    }

    pub fn new(api_key: String, url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            url: url.to_string(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&SearchPayload::for_query(query))
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}
