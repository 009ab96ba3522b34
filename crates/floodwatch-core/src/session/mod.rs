//! Advisory sessions: per-session state, persistence and the severity-driven loop.

mod controller;
mod store;

pub use controller::{SessionController, SolveOutcome, StartOutcome};
pub use store::{InMemorySessionStore, SessionStore, SledSessionStore};

use crate::analysis::ActiveContract;
use crate::ledger::ResourceLedger;
use crate::transcript::Transcript;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity at or above this is "high": the user must keep proposing solutions.
pub const SEVERITY_THRESHOLD: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    AwaitingSolution,
    Terminal,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::AwaitingSolution => "AWAITING_SOLUTION",
            SessionPhase::Terminal => "TERMINAL",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub location: String,
    pub transcript: Transcript,
    pub ledger: ResourceLedger,
    pub is_first: bool,
    #[serde(default)]
    pub contract: Option<ActiveContract>,
    pub phase: SessionPhase,
    #[serde(default)]
    pub rounds: u32,
    #[serde(default)]
    pub last_severity: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(location: impl Into<String>, transcript: Transcript, ledger: ResourceLedger) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            location: location.into(),
            transcript,
            ledger,
            is_first: true,
            contract: None,
            phase: SessionPhase::AwaitingSolution,
            rounds: 0,
            last_severity: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == SessionPhase::Terminal
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
