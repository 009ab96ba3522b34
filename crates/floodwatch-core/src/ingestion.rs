//! Resource document ingestion: tabular text exported from a spreadsheet → ledger.

use crate::error::IngestionError;
use crate::ledger::ResourceLedger;
use crate::oracle::{Oracle, ReasoningRequest};
use crate::prompts;
use crate::transcript::Turn;
use std::sync::Arc;

const CELL_SEPARATORS: &[char] = &['\t', ',', ';', '|'];

/// True when at least one line has two or more non-empty cells.
pub fn looks_tabular(text: &str) -> bool {
    text.lines().any(|line| {
        line.split(CELL_SEPARATORS)
            .filter(|cell| !cell.trim().is_empty())
            .count()
            >= 2
    })
}

fn check_format(text: &str) -> Result<(), IngestionError> {
    if text.trim().is_empty() {
        return Err(IngestionError::Format("document is empty".into()));
    }
    if text.contains('\0') {
        return Err(IngestionError::Format("document is binary".into()));
    }
    if !looks_tabular(text) {
        return Err(IngestionError::Format("document has no tabular rows".into()));
    }
    Ok(())
}

pub struct ResourceIngestor {
    oracle: Arc<dyn Oracle>,
    model: String,
}

impl ResourceIngestor {
    pub fn new(oracle: Arc<dyn Oracle>, model: impl Into<String>) -> Self {
        Self {
            oracle,
            model: model.into(),
        }
    }

    /// Best-effort extraction. Every `resources` entry the oracle returns is merged in
    /// order over a zeroed ledger; items it never mentions stay 0.
    pub async fn ingest(&self, text: &str) -> Result<ResourceLedger, IngestionError> {
        check_format(text)?;

        let request = ReasoningRequest::new(
            vec![Turn::system(prompts::ingestion_directive(text))],
            Some(prompts::ingestion_schema()),
            self.model.clone(),
        );
        let response = self.oracle.reason(&request).await?;

        let mut ledger = ResourceLedger::zeroed();
        let entries = response
            .get("resources")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();
        if entries.is_empty() {
            tracing::warn!("ingestion response has no resource entries; returning zeroed ledger");
        }
        for entry in &entries {
            let (parsed, defaulted) = ResourceLedger::from_value_lenient(entry, &ledger);
            if !defaulted.is_empty() {
                tracing::debug!(fields = ?defaulted, "ingestion entry incomplete");
            }
            ledger.merge(&parsed);
        }
        tracing::info!(entries = entries.len(), "resource document ingested");
        Ok(ledger)
    }
}
