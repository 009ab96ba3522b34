//! Offline adapters for `llm_mode = mock`: deterministic answers keyed on the schema name.

use super::{Oracle, ReasoningRequest, SearchProvider};
use crate::error::{OracleError, SearchError};
use crate::ledger::{ResourceLedger, LEDGER_SCHEMA};
use crate::prompts::{
    ANALYSIS_SCHEMA_NAME, FOLLOW_UP_PREFIX, INGESTION_SCHEMA_NAME, SCENE_SCHEMA_NAME,
    SEARCH_RESULTS_PREFIX,
};
use crate::transcript::Turn;
use serde_json::{json, Value};

const ROUND_SUMMARY_MARKER: &str = " and here is the feedback: ";

/// Scripted reasoning without network access.
///
/// Scene requests ask for two searches first and answer with a full outlook once search
/// results are in the conversation. Analysis severity starts at 8 and drops by 3 per
/// completed round. One follow-up threat is offered until it has been chained, so a
/// session resolves on its fourth proposal.
#[derive(Debug, Default, Clone)]
pub struct MockOracle;

impl MockOracle {
    pub fn new() -> Self {
        Self
    }

    fn scene(turns: &[Turn]) -> Value {
        let searched = turns.iter().any(|t| t.content.starts_with(SEARCH_RESULTS_PREFIX));
        if !searched {
            return json!({
                "use_internet": true,
                "search_queries": ["flood water levels this week", "flood shelter capacity"],
                "final_answer": {}
            });
        }
        let days: Vec<Value> = (1..=7)
            .map(|day| {
                json!({
                    "day": day,
                    "critical_infrastructure_problems": [format!("[Mock] Road closures on day {day}")],
                    "public_health_risks": ["[Mock] Contaminated drinking water"],
                    "economic_disruptions": ["[Mock] Closed local businesses"],
                    "environmental_concerns": ["[Mock] Debris in waterways"]
                })
            })
            .collect();
        json!({
            "use_internet": false,
            "search_queries": [],
            "final_answer": {
                "time_horizon": "1 week",
                "daily_threats": days,
                "most_potential_threat": {
                    "name": "[Mock] Levee breach",
                    "threat_description": "The eastern levee may fail under sustained rainfall, flooding low-lying districts.",
                    "threat_score": 8
                }
            }
        })
    }

    fn analysis(turns: &[Turn]) -> Value {
        let round = turns
            .iter()
            .filter(|t| t.content.contains(ROUND_SUMMARY_MARKER))
            .count() as i64
            + 1;
        let severity = (8 - 3 * (round - 1)).clamp(0, 10);
        let scores = json!({
            "medical_relevance": 6,
            "logistical_feasibility": 5,
            "ethical_considerations": 7,
            "context_relevance": 6,
            "overall_effectiveness": 5
        });
        let mut ledger = ResourceLedger::default();
        for (category, items) in LEDGER_SCHEMA {
            for (item, qty) in *items {
                let _ = ledger.set(category, item, qty.saturating_sub(round as u32));
            }
        }
        let mut response = json!({
            "short_response": "[Mock] Partially. The plan covers evacuation but not water supply.",
            "feedback": "[Mock] Add water purification and coordinate with neighbouring districts.",
            "updated_resources": ledger.to_value(),
            "response_analysis": scores,
            "updated_severity_score": {
                "severity_score": severity,
                "severity_description": format!("[Mock] Severity after round {round}")
            },
            "alternative_solutions": {
                "solution": "[Mock] Stage boats upstream and open school shelters.",
                "alternative_result": "[Mock] Faster evacuation of isolated areas.",
                "resources_needed": ResourceLedger::zeroed().to_value(),
                "feedback": "[Mock] Requires volunteer coordination.",
                "response_analysis": scores,
                "updated_severity_score": {"severity_score": (severity - 1).max(0), "severity_description": "[Mock] Slightly better"}
            }
        });
        let chained = turns.iter().any(|t| t.content.starts_with(FOLLOW_UP_PREFIX));
        if !chained {
            response["follow_up_threat"] = json!({
                "name": "[Mock] Waterborne disease",
                "threat_description": "Stagnant water in shelters raises the risk of cholera within days.",
                "threat_score": 6
            });
        }
        response
    }

    fn ingestion() -> Value {
        json!({"resources": [ResourceLedger::default().to_value()]})
    }
}

#[async_trait::async_trait]
impl Oracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn reason(&self, request: &ReasoningRequest) -> Result<Value, OracleError> {
        let value = match request.schema_name() {
            SCENE_SCHEMA_NAME => Self::scene(&request.turns),
            ANALYSIS_SCHEMA_NAME => Self::analysis(&request.turns),
            INGESTION_SCHEMA_NAME => Self::ingestion(),
            _ => {
                let last = request.turns.last().map(|t| t.content.as_str()).unwrap_or("");
                let preview: String = last.chars().take(80).collect();
                Value::String(format!("[Mock] {preview}"))
            }
        };
        tracing::debug!(schema = request.schema_name(), "mock oracle answered");
        Ok(value)
    }
}

/// Canned search results.
#[derive(Debug, Default, Clone)]
pub struct MockSearch;

#[async_trait::async_trait]
impl SearchProvider for MockSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str) -> Result<String, SearchError> {
        Ok(json!({
            "query": query,
            "answer": format!("[Mock] No live results for '{query}'."),
            "results": []
        })
        .to_string())
    }
}
