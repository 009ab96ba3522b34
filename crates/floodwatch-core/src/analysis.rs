//! Solution analyzer: one oracle round that scores a proposed mitigation.
//!
//! Produces effectiveness scores, a full replacement ledger, the new severity, an
//! alternative solution and the follow-up threat. The only field the round cannot do
//! without is the new severity score; every other field falls back to a stated default.

use crate::error::AnalysisError;
use crate::forecast::ThreatRecord;
use crate::ledger::ResourceLedger;
use crate::lenient;
use crate::oracle::{Oracle, OutputSchema, ReasoningRequest};
use crate::prompts;
use crate::transcript::{Role, Transcript, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Five 0–10 dimensions. Missing or malformed scores read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    #[serde(default, deserialize_with = "lenient::score")]
    pub medical_relevance: u8,
    #[serde(default, deserialize_with = "lenient::score")]
    pub logistical_feasibility: u8,
    #[serde(default, deserialize_with = "lenient::score")]
    pub ethical_considerations: u8,
    #[serde(default, deserialize_with = "lenient::score")]
    pub context_relevance: u8,
    #[serde(default, deserialize_with = "lenient::score")]
    pub overall_effectiveness: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    #[serde(rename = "severity_score", default, deserialize_with = "lenient::score")]
    pub score: u8,
    #[serde(rename = "severity_description", default, deserialize_with = "lenient::string")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSolution {
    pub solution: String,
    pub alternative_result: String,
    pub resources_needed: ResourceLedger,
    pub feedback: String,
    pub response_analysis: ResponseAnalysis,
    #[serde(rename = "updated_severity_score")]
    pub updated_severity: SeverityAssessment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub short_response: String,
    pub feedback: String,
    pub response_analysis: ResponseAnalysis,
    pub updated_resources: ResourceLedger,
    #[serde(rename = "updated_severity_score")]
    pub updated_severity: SeverityAssessment,
    #[serde(rename = "alternative_solutions")]
    pub alternative_solution: AlternativeSolution,
    pub follow_up_threat: Option<ThreatRecord>,
}

impl AnalysisResult {
    /// Parse one oracle response.
    ///
    /// `updated_severity_score.severity_score` is required. Defaults elsewhere: strings
    /// `""`, scores `0`, `updated_resources` item-by-item from `previous`,
    /// `resources_needed` zeroed, `follow_up_threat` absent. Returns the parsed result
    /// and the fields that were defaulted.
    pub fn from_response(
        value: &Value,
        previous: &ResourceLedger,
    ) -> Result<(Self, Vec<String>), AnalysisError> {
        let mut defaulted = Vec::new();

        let severity_value = field(value, &["updated_severity_score", "updated_severty_score"])
            .ok_or(AnalysisError::SchemaViolation("updated_severity_score"))?;
        let score = severity_value
            .get("severity_score")
            .and_then(lenient::severity_from_value)
            .ok_or(AnalysisError::SchemaViolation("updated_severity_score.severity_score"))?;
        let updated_severity = SeverityAssessment {
            score,
            description: text(severity_value, "severity_description", "updated_severity_score", &mut defaulted),
        };

        let (updated_resources, missing_items) = match value.get("updated_resources") {
            Some(v) => ResourceLedger::from_value_lenient(v, previous),
            None => (previous.clone(), vec!["*".to_string()]),
        };
        defaulted.extend(missing_items.into_iter().map(|m| format!("updated_resources/{m}")));

        let alternative_value = field(value, &["alternative_solutions", "alternative_solution"]);
        if alternative_value.is_none() {
            defaulted.push("alternative_solutions".to_string());
        }
        let alt = alternative_value.unwrap_or(&Value::Null);
        let alternative_solution = AlternativeSolution {
            solution: text(alt, "solution", "alternative_solutions", &mut defaulted),
            alternative_result: text(alt, "alternative_result", "alternative_solutions", &mut defaulted),
            resources_needed: alt
                .get("resources_needed")
                .map(|v| ResourceLedger::from_value_lenient(v, &ResourceLedger::zeroed()).0)
                .unwrap_or_else(ResourceLedger::zeroed),
            feedback: text(alt, "feedback", "alternative_solutions", &mut defaulted),
            response_analysis: typed(alt, "response_analysis", "alternative_solutions", &mut defaulted),
            updated_severity: alt
                .get("updated_severity_score")
                .or_else(|| alt.get("updated_severty_score"))
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
        };

        let follow_up_threat = match value.get("follow_up_threat") {
            Some(v) if v.is_object() => serde_json::from_value::<ThreatRecord>(v.clone()).ok(),
            _ => None,
        };
        if follow_up_threat.is_none() {
            defaulted.push("follow_up_threat".to_string());
        }

        let result = AnalysisResult {
            short_response: text(value, "short_response", "", &mut defaulted),
            feedback: text(value, "feedback", "", &mut defaulted),
            response_analysis: typed(value, "response_analysis", "", &mut defaulted),
            updated_resources,
            updated_severity,
            alternative_solution,
            follow_up_threat,
        };
        Ok((result, defaulted))
    }

    /// The follow-up threat when it carries a non-blank name.
    pub fn named_follow_up(&self) -> Option<&ThreatRecord> {
        self.follow_up_threat.as_ref().filter(|t| t.is_named())
    }
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value.get(*k)).filter(|v| !v.is_null())
}

fn path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

fn text(value: &Value, key: &str, parent: &str, defaulted: &mut Vec<String>) -> String {
    match value.get(key).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => {
            defaulted.push(path(parent, key));
            String::new()
        }
    }
}

fn typed<T: Default + serde::de::DeserializeOwned>(
    value: &Value,
    key: &str,
    parent: &str,
    defaulted: &mut Vec<String>,
) -> T {
    match value.get(key).map(|v| serde_json::from_value::<T>(v.clone())) {
        Some(Ok(parsed)) => parsed,
        _ => {
            defaulted.push(path(parent, key));
            T::default()
        }
    }
}

/// Directive and schema established on the first analysis round and re-attached to
/// every later request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveContract {
    pub directive: String,
    pub schema: OutputSchema,
}

impl ActiveContract {
    pub fn for_first_round(solution: &str, transcript: &Transcript, ledger: &ResourceLedger) -> Self {
        Self {
            directive: prompts::analysis_directive(solution, transcript, ledger),
            schema: prompts::analysis_schema(),
        }
    }

    /// Request turns: the trailing `window` turns, led by the directive when the window
    /// does not already contain it.
    pub fn attach(&self, transcript: &Transcript, window: usize) -> Vec<Turn> {
        let turns = transcript.window(window);
        let present = turns
            .iter()
            .any(|t| t.role == Role::System && t.content == self.directive);
        let mut out = Vec::with_capacity(turns.len() + 1);
        if !present {
            out.push(Turn::system(self.directive.clone()));
        }
        out.extend_from_slice(turns);
        out
    }
}

/// Result of one analyzer round: the parsed result, the extended transcript and the
/// contract to carry into the next round.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub transcript: Transcript,
    pub contract: ActiveContract,
}

pub struct SolutionAnalyzer {
    oracle: Arc<dyn Oracle>,
    model: String,
    transcript_window: usize,
}

impl SolutionAnalyzer {
    pub fn new(oracle: Arc<dyn Oracle>, model: impl Into<String>) -> Self {
        Self {
            oracle,
            model: model.into(),
            transcript_window: 0,
        }
    }

    /// Send only the trailing `turns` turns per request (0 sends everything).
    pub fn with_transcript_window(mut self, turns: usize) -> Self {
        self.transcript_window = turns;
        self
    }

    /// Analyze one proposed solution. The ledger is read, never written; the caller
    /// decides what to do with `result.updated_resources`.
    pub async fn analyze(
        &self,
        solution: &str,
        ledger: &ResourceLedger,
        mut transcript: Transcript,
        is_first: bool,
        contract: Option<&ActiveContract>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let contract = match contract {
            Some(c) if !is_first => {
                transcript.push_user(prompts::proposal_turn(solution));
                c.clone()
            }
            _ => {
                let c = ActiveContract::for_first_round(solution, &transcript, ledger);
                transcript.push_system(c.directive.clone());
                c
            }
        };

        let request = ReasoningRequest::new(
            contract.attach(&transcript, self.transcript_window),
            Some(contract.schema.clone()),
            self.model.clone(),
        );
        let response = self.oracle.reason(&request).await?;

        let (result, defaulted) = AnalysisResult::from_response(&response, ledger)?;
        if !defaulted.is_empty() {
            tracing::warn!(
                fields = ?defaulted,
                "analysis response missing fields; defaults substituted"
            );
        }

        transcript.push_user(prompts::round_summary_turn(
            solution,
            &result.feedback,
            &result.response_analysis,
            &result.updated_severity,
        ));

        tracing::info!(
            severity = result.updated_severity.score,
            follow_up = result.named_follow_up().map(|t| t.name.as_str()).unwrap_or(""),
            "solution analyzed"
        );

        Ok(AnalysisOutcome {
            result,
            transcript,
            contract,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LOGISTICS_SUPPORT, MEDICAL_RESOURCES};
    use serde_json::json;

    #[test]
    fn missing_severity_is_a_schema_violation() {
        let err = AnalysisResult::from_response(&json!({"feedback": "ok"}), &ResourceLedger::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::SchemaViolation(_)));

        let err = AnalysisResult::from_response(
            &json!({"updated_severity_score": {"severity_description": "x"}}),
            &ResourceLedger::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::SchemaViolation("updated_severity_score.severity_score")
        ));
    }

    #[test]
    fn partial_response_is_defaulted() {
        let mut previous = ResourceLedger::default();
        previous.set(MEDICAL_RESOURCES, "Doctors", 3).unwrap();
        let response = json!({
            "updated_severty_score": {"severity_score": 6},
            "updated_resources": {"Medical Resources": {"Ambulances": 2}}
        });
        let (result, defaulted) = AnalysisResult::from_response(&response, &previous).unwrap();
        assert_eq!(result.updated_severity.score, 6);
        assert_eq!(result.updated_resources.get(MEDICAL_RESOURCES, "Ambulances"), Some(2));
        assert_eq!(result.updated_resources.get(MEDICAL_RESOURCES, "Doctors"), Some(3));
        assert_eq!(result.updated_resources.get(LOGISTICS_SUPPORT, "Rescue Boats"), Some(10));
        assert_eq!(result.updated_resources.entries().count(), 10);
        assert_eq!(result.short_response, "");
        assert_eq!(result.response_analysis, ResponseAnalysis::default());
        assert!(result.follow_up_threat.is_none());
        assert!(defaulted.contains(&"follow_up_threat".to_string()));
        assert!(defaulted.contains(&"alternative_solutions".to_string()));
    }

    #[test]
    fn non_finite_severity_is_a_schema_violation() {
        for bad in [json!("nan"), json!("NaN"), json!("inf"), json!("infinity"), json!("severe")] {
            let response = json!({"updated_severity_score": {"severity_score": bad}});
            let err = AnalysisResult::from_response(&response, &ResourceLedger::default()).unwrap_err();
            assert!(
                matches!(err, AnalysisError::SchemaViolation("updated_severity_score.severity_score")),
                "{bad}"
            );
        }
    }

    #[test]
    fn fractional_severity_truncates_at_threshold() {
        let severity = |v: Value| {
            let response = json!({"updated_severity_score": {"severity_score": v}});
            AnalysisResult::from_response(&response, &ResourceLedger::default())
                .unwrap()
                .0
                .updated_severity
                .score
        };
        assert_eq!(severity(json!(4.6)), 4);
        assert_eq!(severity(json!("4.5")), 4);
        assert_eq!(severity(json!(5.0)), 5);
    }

    #[test]
    fn blank_follow_up_name_is_not_named() {
        let response = json!({
            "updated_severity_score": {"severity_score": 2, "severity_description": "low"},
            "follow_up_threat": {"name": "  ", "threat_description": "", "threat_score": 1}
        });
        let (result, _) = AnalysisResult::from_response(&response, &ResourceLedger::default()).unwrap();
        assert!(result.follow_up_threat.is_some());
        assert!(result.named_follow_up().is_none());
    }

    #[test]
    fn contract_reattaches_directive_outside_window() {
        let contract = ActiveContract {
            directive: "analyze".into(),
            schema: prompts::analysis_schema(),
        };
        let mut t = Transcript::seeded("scene");
        t.push_system("analyze");
        t.push_user("a");
        t.push_user("b");

        let all = contract.attach(&t, 0);
        assert_eq!(all.len(), 4);

        let windowed = contract.attach(&t, 2);
        assert_eq!(windowed.len(), 3);
        assert_eq!(windowed[0], Turn::system("analyze"));
        assert_eq!(windowed[2].content, "b");
    }
}
