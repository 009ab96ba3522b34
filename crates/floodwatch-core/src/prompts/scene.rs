//! Scene generation: the plan → search → synthesize directive and its schema.

use crate::forecast::ThreatRecord;
use crate::oracle::OutputSchema;
use serde_json::json;
use std::collections::BTreeMap;

pub const SCENE_SCHEMA_NAME: &str = "generate_insights";

/// Prefix of the user turn that carries search results back to the planner.
pub const SEARCH_RESULTS_PREFIX: &str = "here are the results of my searches: ";

/// Directive template. Placeholder: `{location}`.
pub const SCENE_DIRECTIVE_TEMPLATE: &str = r#"You are a subject-matter researcher analysing the cascading CONSEQUENCES
of a specified flooding event, including links to economic, societal,
environmental, infrastructure and policy-related knock-on effects **in {location}**.

**Step 1 – Plan**
Think step-by-step about what you already know and what fresh facts
you still need.

**Step 2 – Draft search queries**
List up to 6 focussed web-search strings (≤ 200 chars) that will close
those knowledge gaps.

**Step 3 – Follow-ups**
If more searches are clearly required, create follow-up questions. Do not create
more than 10 follow-up questions.

**Step 4 – Synthesis**
Produce a one-week outlook: exactly 7 daily entries (days 1 to 7, each once), each
listing critical infrastructure problems, public health risks, economic disruptions
and environmental concerns, plus the single most potential threat with a 0-10 score.

**Output – return ONE JSON object with this shape:**
{
  "use_internet": <true|false>,
  "search_queries": ["query 1", "query 2", ...],
  "final_answer": { "time_horizon": "1 week", "daily_threats": [...], "most_potential_threat": {...} }
}
If "use_internet" is true, "search_queries" lists the queries and "final_answer" is an empty object.
If "use_internet" is false, "search_queries" is empty and "final_answer" holds the full outlook."#;

pub fn scene_directive(location: &str) -> String {
    super::fill(SCENE_DIRECTIVE_TEMPLATE, &[("location", location)])
}

pub fn scene_schema() -> OutputSchema {
    let string_list = |description: &str| {
        json!({"type": "array", "items": {"type": "string"}, "description": description})
    };
    let schema = json!({
        "type": "object",
        "properties": {
            "use_internet": {
                "type": "boolean",
                "description": "True if at least one web search is required."
            },
            "search_queries": {
                "type": "array",
                "description": "Focused search strings; empty if use_internet is false.",
                "items": {"type": "string"},
                "maxItems": 6
            },
            "final_answer": {
                "type": "object",
                "description": "Structured one-week outlook of potential threats.",
                "properties": {
                    "time_horizon": {"type": "string", "enum": ["1 week"]},
                    "daily_threats": {
                        "type": "array",
                        "minItems": 7,
                        "maxItems": 7,
                        "items": {
                            "type": "object",
                            "properties": {
                                "day": {"type": "integer", "minimum": 1, "maximum": 7},
                                "critical_infrastructure_problems": string_list("Infrastructure problems for the day: location, type and impact."),
                                "public_health_risks": string_list("Public health risks for the day: disease type and impact."),
                                "economic_disruptions": string_list("Economic disruptions for the day: type and impact."),
                                "environmental_concerns": string_list("Environmental concerns for the day: type and impact.")
                            },
                            "required": [
                                "day",
                                "critical_infrastructure_problems",
                                "public_health_risks",
                                "economic_disruptions",
                                "environmental_concerns"
                            ]
                        }
                    },
                    "most_potential_threat": threat_schema("most potential threat")
                },
                "required": ["time_horizon", "daily_threats", "most_potential_threat"]
            }
        },
        "required": ["use_internet", "search_queries", "final_answer"]
    });
    OutputSchema::new(SCENE_SCHEMA_NAME, schema)
}

pub(crate) fn threat_schema(label: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": format!("Name of the {label}.")},
            "threat_description": {
                "type": "string",
                "description": format!("Description of the {label}: location, type and impact, in 2-3 sentences.")
            },
            "threat_score": {
                "type": "integer",
                "minimum": 0,
                "maximum": 10,
                "description": "0 means no threat and 10 means very high threat."
            }
        },
        "required": ["name", "threat_description", "threat_score"]
    })
}

/// One user turn carrying every query's raw result as a single JSON mapping.
pub fn search_results_turn(results: &BTreeMap<String, String>) -> String {
    let body = serde_json::to_string(results).unwrap_or_else(|_| "{}".to_string());
    format!("{SEARCH_RESULTS_PREFIX}{body}")
}

pub fn most_potential_threat_turn(threat: &ThreatRecord) -> String {
    let body = serde_json::to_string(threat).unwrap_or_else(|_| "{}".to_string());
    format!("here is the most potential threat: {body}")
}

/// Nudge after a synthesis that did not yield a usable 7-day outlook.
pub fn incomplete_forecast_turn(defect: &str) -> String {
    format!(
        "the final answer is not usable yet ({defect}). Return the complete outlook with exactly 7 daily_threats entries, days 1 to 7 each once."
    )
}
