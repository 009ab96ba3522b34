//! Prompt templates and output schemas.
//!
//! Every builder here is a pure function of its arguments: templates are constants,
//! placeholders are filled in one pass by [`fill`], schemas are built fresh per call.

pub mod analysis;
pub mod ingestion;
pub mod scene;

pub use analysis::{
    analysis_directive, analysis_schema, follow_up_turn, proposal_turn, round_summary_turn,
    ANALYSIS_SCHEMA_NAME, FOLLOW_UP_PREFIX, PROPOSAL_PREFIX,
};
pub use ingestion::{ingestion_directive, ingestion_schema, INGESTION_SCHEMA_NAME};
pub use scene::{
    incomplete_forecast_turn, most_potential_threat_turn, scene_directive, scene_schema,
    search_results_turn, SCENE_SCHEMA_NAME, SEARCH_RESULTS_PREFIX,
};

use crate::ledger::LEDGER_SCHEMA;
use serde_json::{json, Map, Value};

/// Substitute `{name}` placeholders in a single left-to-right pass. Substituted text is
/// never rescanned, so values may themselves contain placeholder-like braces.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = values.iter().find_map(|(name, value)| {
            let token_len = name.len() + 2;
            let matches = tail.len() >= token_len
                && tail[1..].starts_with(name)
                && tail[1 + name.len()..].starts_with('}');
            matches.then_some((token_len, *value))
        });
        match hit {
            Some((token_len, value)) => {
                out.push_str(value);
                rest = &tail[token_len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// JSON schema of a full resource ledger (both categories, every item required).
pub fn ledger_schema() -> Value {
    let mut properties = Map::new();
    for (category, items) in LEDGER_SCHEMA {
        let mut item_props = Map::new();
        for (item, _) in *items {
            item_props.insert(
                item.to_string(),
                json!({"type": "integer", "minimum": 0, "description": format!("Number of {} available.", item.to_lowercase())}),
            );
        }
        let required: Vec<&str> = items.iter().map(|(i, _)| *i).collect();
        properties.insert(
            category.to_string(),
            json!({"type": "object", "properties": item_props, "required": required}),
        );
    }
    let required: Vec<&str> = LEDGER_SCHEMA.iter().map(|(c, _)| *c).collect();
    json!({"type": "object", "properties": properties, "required": required})
}

/// Ledger shape as it appears inside a directive, e.g. `"Ambulances": <number>`.
pub(crate) fn ledger_shape_hint() -> String {
    let mut out = String::from("{\n");
    for (ci, (category, items)) in LEDGER_SCHEMA.iter().enumerate() {
        out.push_str(&format!("  \"{}\": {{\n", category));
        for (ii, (item, _)) in items.iter().enumerate() {
            let comma = if ii + 1 < items.len() { "," } else { "" };
            out.push_str(&format!("    \"{}\": <number>{}\n", item, comma));
        }
        let comma = if ci + 1 < LEDGER_SCHEMA.len() { "," } else { "" };
        out.push_str(&format!("  }}{}\n", comma));
    }
    out.push('}');
    out
}
