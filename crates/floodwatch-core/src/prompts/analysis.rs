//! Solution analysis: directive, schema and the turns that carry round history.

use super::{fill, ledger_schema, ledger_shape_hint, scene::threat_schema};
use crate::analysis::{ResponseAnalysis, SeverityAssessment};
use crate::forecast::ThreatRecord;
use crate::ledger::ResourceLedger;
use crate::oracle::OutputSchema;
use crate::transcript::Transcript;
use serde_json::json;

pub const ANALYSIS_SCHEMA_NAME: &str = "analyze_insights";

/// Prefix of the user turn that proposes a solution on rounds after the first.
pub const PROPOSAL_PREFIX: &str = "here is how I proposed to solve the problem: ";

/// Prefix of the user turn that opens a new chapter with a follow-up threat.
pub const FOLLOW_UP_PREFIX: &str = "here is the follow up threat to be treated: ";

/// Placeholders: `{solution}`, `{conversation}`, `{resources}`, `{ledger_shape}`.
pub const ANALYSIS_DIRECTIVE_TEMPLATE: &str = r#"You are an expert disaster-response analyst. You have been given:

  • A proposed way of handling the disaster:
    {solution}

  • Contextual information about the disaster:
    {conversation}

  • The initial resources available in the area:
    {resources}

––––– Your task –––––
1. Assess whether this solution adequately addresses the situation.
2. Describe likely outcomes and possible unintended consequences.
3. Update the list of resources:
   – What additional resources would be needed?
   – Which existing resources might be depleted or redirected?

Be realistic when evaluating the solution.

The user will keep proposing solutions with the given resources until the severity score
drops below 5. Always provide a follow-up threat that the proposed solution could create:
location, type and impact of the problem, in 2-3 sentences.

––––– Output –––––
Return **one** JSON object (no extra text) with:
  "short_response": Yes/No + why in one sentence,
  "feedback": detailed feedback on risks, consequences and improvements,
  "updated_resources": the full resource table after this solution, shaped as
{ledger_shape},
  "response_analysis": 0-10 scores for medical_relevance, logistical_feasibility,
    ethical_considerations, context_relevance, overall_effectiveness,
  "updated_severity_score": {"severity_score": 0-10, "severity_description": "..."},
  "alternative_solutions": {"solution", "alternative_result", "resources_needed" (same shape
    as updated_resources), "feedback", "response_analysis", "updated_severity_score"},
  "follow_up_threat": {"name", "threat_description", "threat_score"}"#;

pub fn analysis_directive(solution: &str, transcript: &Transcript, resources: &ResourceLedger) -> String {
    let resources_json = serde_json::to_string(resources).unwrap_or_else(|_| "{}".to_string());
    let conversation = transcript.to_json_string();
    let ledger_shape = ledger_shape_hint();
    fill(
        ANALYSIS_DIRECTIVE_TEMPLATE,
        &[
            ("solution", solution),
            ("conversation", conversation.as_str()),
            ("resources", resources_json.as_str()),
            ("ledger_shape", ledger_shape.as_str()),
        ],
    )
}

fn scores_schema() -> serde_json::Value {
    let score = json!({"type": "number", "minimum": 0, "maximum": 10});
    json!({
        "type": "object",
        "description": "Numeric scores (0-10) evaluating different dimensions of the proposed solution.",
        "properties": {
            "medical_relevance": score,
            "logistical_feasibility": score,
            "ethical_considerations": score,
            "context_relevance": score,
            "overall_effectiveness": score
        },
        "required": [
            "medical_relevance",
            "logistical_feasibility",
            "ethical_considerations",
            "context_relevance",
            "overall_effectiveness"
        ]
    })
}

fn severity_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "severity_score": {
                "type": "integer",
                "minimum": 0,
                "maximum": 10,
                "description": "State of the situation after applying the solution. 0 means no threat and 10 means very high threat."
            },
            "severity_description": {"type": "string"}
        },
        "required": ["severity_score", "severity_description"]
    })
}

pub fn analysis_schema() -> OutputSchema {
    let schema = json!({
        "type": "object",
        "properties": {
            "short_response": {
                "type": "string",
                "description": "Does the solution solve the situation or not?"
            },
            "feedback": {
                "type": "string",
                "description": "Possible consequences of this solution and what could be done better."
            },
            "updated_resources": ledger_schema(),
            "response_analysis": scores_schema(),
            "updated_severity_score": severity_schema(),
            "alternative_solutions": {
                "type": "object",
                "properties": {
                    "solution": {"type": "string", "description": "The alternative solution with its concrete steps."},
                    "alternative_result": {"type": "string"},
                    "resources_needed": ledger_schema(),
                    "feedback": {"type": "string"},
                    "response_analysis": scores_schema(),
                    "updated_severity_score": severity_schema()
                },
                "required": ["solution", "alternative_result", "resources_needed", "feedback", "response_analysis", "updated_severity_score"]
            },
            "follow_up_threat": threat_schema("follow-up threat created by the proposed solution")
        },
        "required": [
            "short_response",
            "feedback",
            "updated_resources",
            "response_analysis",
            "updated_severity_score",
            "alternative_solutions",
            "follow_up_threat"
        ]
    });
    OutputSchema::new(ANALYSIS_SCHEMA_NAME, schema)
}

pub fn proposal_turn(solution: &str) -> String {
    format!("{PROPOSAL_PREFIX}{solution}")
}

/// History turn appended after each analysis: solution, feedback, scores, new severity.
pub fn round_summary_turn(
    solution: &str,
    feedback: &str,
    scores: &ResponseAnalysis,
    severity: &SeverityAssessment,
) -> String {
    let scores = serde_json::to_string(scores).unwrap_or_else(|_| "{}".to_string());
    let severity = serde_json::to_string(severity).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{PROPOSAL_PREFIX}{solution} and here is the feedback: {feedback} and here is the analysis: {scores} so new severity score is: {severity}"
    )
}

pub fn follow_up_turn(threat: &ThreatRecord) -> String {
    format!(
        "{FOLLOW_UP_PREFIX}{} with following description: {}",
        threat.name, threat.description
    )
}
