//! Integration test: scene generation planning loop and search fan-out.

mod common;

use common::{scene_answer, scene_final, search_step, ScriptedOracle, ScriptedSearch};
use floodwatch_core::{prompts, Role, SceneError, SceneGenerator};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn search_results_of(turn: &str) -> BTreeMap<String, String> {
    let json = turn
        .strip_prefix(prompts::SEARCH_RESULTS_PREFIX)
        .expect("search results turn");
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn all_queries_fan_in_before_next_call_and_failures_are_marked() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        search_step(&["water levels", "shelter capacity", "road closures"]),
        scene_final(),
    ]));
    let search = Arc::new(
        ScriptedSearch::new()
            .failing("shelter capacity")
            .slow("road closures", Duration::from_millis(30)),
    );
    let generator = SceneGenerator::new(oracle.clone(), search.clone(), "m");
    let outcome = generator.generate("Cologne, Germany").await.unwrap();

    assert_eq!(search.queries().len(), 3);
    let requests = oracle.requests();
    assert_eq!(requests.len(), 2);
    let last = requests[1].turns.last().unwrap();
    assert_eq!(last.role, Role::User);
    let results = search_results_of(&last.content);
    assert_eq!(results.len(), 3);
    assert_eq!(results["water levels"], "results for water levels");
    assert_eq!(results["road closures"], "results for road closures");
    assert!(results["shelter capacity"].starts_with("[search failed"));

    assert_eq!(outcome.forecast.daily_threats.len(), 7);
}

#[tokio::test]
async fn queries_are_capped() {
    let queries = ["q1", "q2", "q3", "q4", "q5", "q6", "q7", "q8"];
    let oracle = Arc::new(ScriptedOracle::new(vec![search_step(&queries), scene_final()]));
    let search = Arc::new(ScriptedSearch::new());
    let generator = SceneGenerator::new(oracle, search.clone(), "m");
    generator.generate("Lima").await.unwrap();

    let mut seen = search.queries();
    seen.sort();
    assert_eq!(seen, vec!["q1", "q2", "q3", "q4", "q5", "q6"]);
}

#[tokio::test]
async fn incomplete_outlook_is_replanned_and_days_sorted() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        scene_answer(&[1, 2, 3, 4, 5, 6]),
        scene_answer(&[1, 1, 2, 3, 4, 5, 6]),
        scene_answer(&[7, 6, 5, 4, 3, 2, 1]),
    ]));
    let generator = SceneGenerator::new(oracle.clone(), Arc::new(ScriptedSearch::new()), "m");
    let outcome = generator.generate("Accra").await.unwrap();

    let days: Vec<u8> = outcome.forecast.daily_threats.iter().map(|d| d.day).collect();
    assert_eq!(days, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(oracle.calls(), 3);

    // directive, two nudges, most potential threat summary
    assert_eq!(outcome.transcript.len(), 4);
    assert!(outcome.transcript.turns()[1].content.contains("not usable yet"));
    assert!(outcome
        .transcript
        .last()
        .unwrap()
        .content
        .contains("River overflow"));
}

#[tokio::test]
async fn planner_that_never_converges_hits_the_cap() {
    let responses = (0..3).map(|_| search_step(&["again"])).collect();
    let oracle = Arc::new(ScriptedOracle::new(responses));
    let generator =
        SceneGenerator::new(oracle.clone(), Arc::new(ScriptedSearch::new()), "m").with_limits(6, 3);
    let err = generator.generate("Nowhere").await.unwrap_err();
    assert!(matches!(err, SceneError::NoProgress { rounds: 3 }));
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn oracle_failure_aborts_generation() {
    let oracle = Arc::new(ScriptedOracle::new(vec![]));
    let generator = SceneGenerator::new(oracle, Arc::new(ScriptedSearch::new()), "m");
    let err = generator.generate("Nowhere").await.unwrap_err();
    assert!(matches!(err, SceneError::Oracle(_)));
}

#[tokio::test]
async fn directive_names_the_location() {
    let oracle = Arc::new(ScriptedOracle::new(vec![scene_final()]));
    let generator = SceneGenerator::new(oracle.clone(), Arc::new(ScriptedSearch::new()), "m");
    generator.generate("Chennai, India").await.unwrap();

    let first = &oracle.requests()[0];
    assert_eq!(first.schema_name(), prompts::SCENE_SCHEMA_NAME);
    assert_eq!(first.turns.len(), 1);
    assert!(first.turns[0].content.contains("Chennai, India"));
}
