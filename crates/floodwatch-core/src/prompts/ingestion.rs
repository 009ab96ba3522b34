//! Resource document extraction: tabular text → ledger entries.

use super::{fill, ledger_schema, ledger_shape_hint};
use crate::oracle::OutputSchema;
use serde_json::json;

pub const INGESTION_SCHEMA_NAME: &str = "excel_analysis";

/// Placeholders: `{text}`, `{ledger_shape}`.
pub const INGESTION_DIRECTIVE_TEMPLATE: &str = r#"You are provided with text exported from a spreadsheet describing the available
response resources. Map every row you can onto the resource table below and return it
as JSON. Use 0 for items the document does not mention. Do not invent items.

Here is the text to analyze:
{text}

Return {"resources": [ <table>, ... ]} where each table has this shape:
{ledger_shape}"#;

pub fn ingestion_directive(text: &str) -> String {
    let ledger_shape = ledger_shape_hint();
    fill(
        INGESTION_DIRECTIVE_TEMPLATE,
        &[("text", text), ("ledger_shape", ledger_shape.as_str())],
    )
}

pub fn ingestion_schema() -> OutputSchema {
    OutputSchema::new(
        INGESTION_SCHEMA_NAME,
        json!({
            "type": "object",
            "properties": {
                "resources": {"type": "array", "items": ledger_schema()}
            },
            "required": ["resources"]
        }),
    )
}
