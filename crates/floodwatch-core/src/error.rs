//! Error types for the advisory loop.
//!
//! Transport failures (oracle, store) abort the current round and reach the caller.
//! Partial-conformance problems in oracle output are recovered locally by defaulting,
//! except for the few fields the state machine cannot run without.

use thiserror::Error;

/// Reasoning capability failures. Fatal to the current round.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(String),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle timed out after {0}s")]
    Timeout(u64),

    #[error("oracle returned an empty response")]
    EmptyResponse,

    #[error("oracle response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Transport(err.to_string())
    }
}

/// Search capability failures. Logged per query; never aborts a planning round.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(String),

    #[error("search returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Transport(err.to_string())
    }
}

/// Closed-schema violations on a resource ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("malformed resource ledger: {0}")]
    Malformed(String),

    #[error("unknown resource category: {0}")]
    UnknownCategory(String),

    #[error("unknown item '{item}' in category '{category}'")]
    UnknownItem { category: String, item: String },

    #[error("missing item '{item}' in category '{category}'")]
    MissingItem { category: String, item: String },

    #[error("negative quantity {quantity} for '{item}' in '{category}'")]
    Negative {
        category: String,
        item: String,
        quantity: i64,
    },
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("no complete forecast after {rounds} planning rounds")]
    NoProgress { rounds: u32 },
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("schema violation: required field '{0}' missing or malformed")]
    SchemaViolation(&'static str),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("session serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session {0} is resolved; no further solutions are accepted")]
    Resolved(String),

    #[error("session {0} has already analyzed a solution; resources can no longer be replaced")]
    AlreadyStarted(String),

    #[error("solve cancelled for session {0}")]
    Cancelled(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("unsupported resource document: {0}")]
    Format(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}
