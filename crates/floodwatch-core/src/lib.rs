//! floodwatch-core: disaster-response advisory loop.
//!
//! A session starts with a generated seven-day threat scene for a location, then scores
//! each proposed mitigation, replaces the resource ledger and chains follow-up threats
//! until severity drops below the threshold with nothing left to treat.

mod analysis;
mod config;
mod error;
mod forecast;
mod ingestion;
mod ledger;
mod lenient;
mod scene;
mod transcript;
pub mod oracle;
pub mod prompts;
pub mod session;

// Configuration
pub use config::{env_secret, CoreConfig, LlmMode, StorageBackend, ENV_OPENAI_API_KEY, ENV_TAVILY_API_KEY};

// Errors
pub use error::{
    AnalysisError, IngestionError, LedgerError, OracleError, SceneError, SearchError, SessionError,
    StoreError,
};

// Domain types
pub use forecast::{check_days, DailyThreat, ForecastDefect, ThreatForecast, ThreatRecord, FORECAST_DAYS};
pub use ledger::{ResourceLedger, LEDGER_SCHEMA, LOGISTICS_SUPPORT, MEDICAL_RESOURCES};
pub use transcript::{Role, Transcript, Turn};

// Loop components
pub use analysis::{
    ActiveContract, AlternativeSolution, AnalysisOutcome, AnalysisResult, ResponseAnalysis,
    SeverityAssessment, SolutionAnalyzer,
};
pub use ingestion::{looks_tabular, ResourceIngestor};
pub use oracle::{
    providers_from_config, MockOracle, MockSearch, OpenAiOracle, Oracle, OutputSchema,
    ReasoningRequest, SearchProvider, TavilySearch,
};
pub use scene::{SceneGenerator, SceneOutcome};
pub use session::{
    InMemorySessionStore, Session, SessionController, SessionPhase, SessionStore, SledSessionStore,
    SolveOutcome, StartOutcome, SEVERITY_THRESHOLD,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
