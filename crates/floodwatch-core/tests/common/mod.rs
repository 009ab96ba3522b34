//! Scripted oracle and search doubles shared by the integration tests.

#![allow(dead_code)]

use floodwatch_core::{
    Oracle, OracleError, ReasoningRequest, SceneGenerator, SearchError, SearchProvider,
    SessionController, SessionStore, SolutionAnalyzer,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers reasoning calls from a queue, in call order, and records every request.
/// An exhausted queue answers with `EmptyResponse`.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<ReasoningRequest>>,
    analysis_delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// Delay every analysis call (used to cancel mid-flight).
    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = Some(delay);
        self
    }

    pub fn push(&self, response: Value) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Oracle for ScriptedOracle {
    async fn reason(&self, request: &ReasoningRequest) -> Result<Value, OracleError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.analysis_delay {
            if request.schema_name() == floodwatch_core::prompts::ANALYSIS_SCHEMA_NAME {
                tokio::time::sleep(delay).await;
            }
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.ok_or(OracleError::EmptyResponse)
    }
}

/// Search double: canned text per query, failures for the listed queries.
#[derive(Default)]
pub struct ScriptedSearch {
    failing: Vec<String>,
    queries: Mutex<Vec<String>>,
    latency: HashMap<String, Duration>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    pub fn slow(mut self, query: &str, latency: Duration) -> Self {
        self.latency.insert(query.to_string(), latency);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(latency) = self.latency.get(query) {
            tokio::time::sleep(*latency).await;
        }
        if self.failing.iter().any(|q| q == query) {
            return Err(SearchError::Status {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        Ok(format!("results for {query}"))
    }
}

pub fn day(n: u8) -> Value {
    json!({
        "day": n,
        "critical_infrastructure_problems": [format!("bridge closed on day {n}")],
        "public_health_risks": ["contaminated wells"],
        "economic_disruptions": ["markets closed"],
        "environmental_concerns": ["sewage overflow"]
    })
}

pub fn scene_answer(days: &[u8]) -> Value {
    let daily: Vec<Value> = days.iter().map(|d| day(*d)).collect();
    json!({
        "use_internet": false,
        "search_queries": [],
        "final_answer": {
            "time_horizon": "1 week",
            "daily_threats": daily,
            "most_potential_threat": {
                "name": "River overflow",
                "threat_description": "The river breaches its banks near the old town.",
                "threat_score": 9
            }
        }
    })
}

pub fn scene_final() -> Value {
    scene_answer(&[1, 2, 3, 4, 5, 6, 7])
}

pub fn search_step(queries: &[&str]) -> Value {
    json!({"use_internet": true, "search_queries": queries, "final_answer": {}})
}

/// A complete analysis response with the given severity and optional follow-up (name, description).
pub fn analysis(severity: u8, follow_up: Option<(&str, &str)>) -> Value {
    let scores = json!({
        "medical_relevance": 7,
        "logistical_feasibility": 6,
        "ethical_considerations": 8,
        "context_relevance": 7,
        "overall_effectiveness": 6
    });
    let resources = json!({
        "Medical Resources": {"Ambulances": 8, "Doctors": 20, "Nurses": 35, "Medical Kits": 90, "Generators": 12},
        "Logistics & Support": {"Rescue Boats": 7, "Fuel Reserves": 80, "Comm Radios": 25, "Water Units": 40, "Shelter Tents": 15}
    });
    let mut value = json!({
        "short_response": "Yes, mostly.",
        "feedback": format!("feedback at severity {severity}"),
        "updated_resources": resources,
        "response_analysis": scores,
        "updated_severity_score": {"severity_score": severity, "severity_description": "updated"},
        "alternative_solutions": {
            "solution": "alternative",
            "alternative_result": "better",
            "resources_needed": resources,
            "feedback": "ok",
            "response_analysis": scores,
            "updated_severity_score": {"severity_score": severity, "severity_description": "alt"}
        }
    });
    if let Some((name, description)) = follow_up {
        value["follow_up_threat"] = json!({
            "name": name,
            "threat_description": description,
            "threat_score": 6
        });
    }
    value
}

pub fn controller(
    oracle: Arc<ScriptedOracle>,
    search: Arc<ScriptedSearch>,
    store: Arc<dyn SessionStore>,
) -> SessionController {
    controller_with_window(oracle, search, store, 0)
}

pub fn controller_with_window(
    oracle: Arc<ScriptedOracle>,
    search: Arc<ScriptedSearch>,
    store: Arc<dyn SessionStore>,
    window: usize,
) -> SessionController {
    let scene = SceneGenerator::new(oracle.clone(), search, "test-model");
    let analyzer = SolutionAnalyzer::new(oracle, "test-model").with_transcript_window(window);
    SessionController::new(store, scene, analyzer)
}
