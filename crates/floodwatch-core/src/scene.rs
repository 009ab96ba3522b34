//! Scene generator: plan → search → re-plan until a complete seven-day outlook exists.

use crate::error::SceneError;
use crate::forecast::ThreatForecast;
use crate::oracle::{Oracle, ReasoningRequest, SearchProvider};
use crate::prompts;
use crate::transcript::Transcript;
use futures_util::future::join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Planner output. Fields the oracle leaves out read as "no search, no answer".
#[derive(Debug, Default, Deserialize)]
struct PlanStep {
    #[serde(default)]
    use_internet: bool,
    #[serde(default)]
    search_queries: Vec<String>,
    #[serde(default)]
    final_answer: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SceneOutcome {
    pub forecast: ThreatForecast,
    pub transcript: Transcript,
}

pub struct SceneGenerator {
    oracle: Arc<dyn Oracle>,
    search: Arc<dyn SearchProvider>,
    model: String,
    max_search_queries: usize,
    max_planning_rounds: u32,
}

impl SceneGenerator {
    pub fn new(oracle: Arc<dyn Oracle>, search: Arc<dyn SearchProvider>, model: impl Into<String>) -> Self {
        Self {
            oracle,
            search,
            model: model.into(),
            max_search_queries: 6,
            max_planning_rounds: 10,
        }
    }

    pub fn with_limits(mut self, max_search_queries: usize, max_planning_rounds: u32) -> Self {
        self.max_search_queries = max_search_queries;
        self.max_planning_rounds = max_planning_rounds;
        self
    }

    /// Run the planning loop for `location`. Each iteration is one oracle call; after
    /// `max_planning_rounds` calls without a valid outlook the run fails with `NoProgress`.
    pub async fn generate(&self, location: &str) -> Result<SceneOutcome, SceneError> {
        let mut transcript = Transcript::seeded(prompts::scene_directive(location));
        let schema = prompts::scene_schema();

        for round in 1..=self.max_planning_rounds {
            let request = ReasoningRequest::new(
                transcript.turns().to_vec(),
                Some(schema.clone()),
                self.model.clone(),
            );
            let response = self.oracle.reason(&request).await?;
            let step: PlanStep = serde_json::from_value(response).unwrap_or_else(|e| {
                tracing::warn!(round, error = %e, "planner response malformed; treating as empty step");
                PlanStep::default()
            });

            if step.use_internet {
                let queries: Vec<String> = step
                    .search_queries
                    .into_iter()
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .take(self.max_search_queries)
                    .collect();
                tracing::info!(location, round, queries = queries.len(), "planner requested searches");
                let results = self.run_searches(&queries).await;
                transcript.push_user(prompts::search_results_turn(&results));
                continue;
            }

            match ThreatForecast::from_final_answer(&step.final_answer) {
                Ok(forecast) => {
                    transcript.push_user(prompts::most_potential_threat_turn(
                        &forecast.most_potential_threat,
                    ));
                    tracing::info!(
                        location,
                        round,
                        threat = %forecast.most_potential_threat.name,
                        "scene generated"
                    );
                    return Ok(SceneOutcome { forecast, transcript });
                }
                Err(defect) => {
                    tracing::warn!(location, round, %defect, "incomplete forecast; re-planning");
                    transcript.push_user(prompts::incomplete_forecast_turn(&defect.to_string()));
                }
            }
        }

        tracing::error!(location, rounds = self.max_planning_rounds, "scene generation made no progress");
        Err(SceneError::NoProgress {
            rounds: self.max_planning_rounds,
        })
    }

    /// Fan out every query and wait for all of them. Failures are kept in the mapping
    /// with a marker so the planner sees which queries came back empty-handed.
    async fn run_searches(&self, queries: &[String]) -> BTreeMap<String, String> {
        let calls = queries.iter().map(|q| {
            let search = Arc::clone(&self.search);
            async move { (q.clone(), search.search(q).await) }
        });
        join_all(calls)
            .await
            .into_iter()
            .map(|(query, outcome)| {
                let text = match outcome {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(query = %query, error = %e, "search failed");
                        format!("[search failed: {e}]")
                    }
                };
                (query, text)
            })
            .collect()
    }
}
