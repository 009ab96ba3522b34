//! Session controller: seeds sessions from a generated scene and runs the solve loop.

use super::{
    InMemorySessionStore, Session, SessionPhase, SessionStore, SledSessionStore, SEVERITY_THRESHOLD,
};
use crate::analysis::{AnalysisResult, SolutionAnalyzer};
use crate::config::{CoreConfig, StorageBackend};
use crate::error::SessionError;
use crate::forecast::{ThreatForecast, ThreatRecord};
use crate::ledger::ResourceLedger;
use crate::oracle::{Oracle, SearchProvider};
use crate::prompts;
use crate::scene::SceneGenerator;
use crate::transcript::Transcript;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub forecast: ThreatForecast,
    pub transcript: Transcript,
}

/// Result of one solve round.
///
/// `follow_up_threat` is only set when severity dropped below the threshold and the
/// analyzer named a follow-up, i.e. when the next round is about that threat.
#[derive(Debug, Clone, Serialize)]
pub struct SolveOutcome {
    pub session_id: String,
    pub round: u32,
    pub severity_score: u8,
    pub updated_resources: ResourceLedger,
    pub follow_up_threat: Option<ThreatRecord>,
    pub analysis: AnalysisResult,
    pub phase: SessionPhase,
}

pub struct SessionController {
    store: Arc<dyn SessionStore>,
    scene: SceneGenerator,
    analyzer: SolutionAnalyzer,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionController {
    pub fn new(store: Arc<dyn SessionStore>, scene: SceneGenerator, analyzer: SolutionAnalyzer) -> Self {
        Self {
            store,
            scene,
            analyzer,
            locks: DashMap::new(),
        }
    }

    /// Wire a controller from config: storage backend, model id and loop limits.
    pub fn from_config(
        config: &CoreConfig,
        oracle: Arc<dyn Oracle>,
        search: Arc<dyn SearchProvider>,
    ) -> Result<Self, SessionError> {
        let store: Arc<dyn SessionStore> = match config.storage {
            StorageBackend::Memory => Arc::new(InMemorySessionStore::new()),
            StorageBackend::Sled => Arc::new(SledSessionStore::open(&config.storage_path)?),
        };
        let scene = SceneGenerator::new(Arc::clone(&oracle), search, config.reasoning_model.clone())
            .with_limits(config.max_search_queries, config.max_planning_rounds);
        let analyzer = SolutionAnalyzer::new(oracle, config.reasoning_model.clone())
            .with_transcript_window(config.transcript_window);
        Ok(Self::new(store, scene, analyzer))
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry of a session that will never be written again. Callers still
    /// holding the old lock only observe the final stored state.
    fn release(&self, id: &str) {
        self.locks.remove(id);
    }

    async fn load(&self, id: &str) -> Result<Session, SessionError> {
        match self.store.get(id).await? {
            Some(session) => Ok(session),
            None => {
                self.release(id);
                Err(SessionError::NotFound(id.to_string()))
            }
        }
    }

    /// Sessions with a live lock entry (awaiting a solution or mid-round).
    pub fn tracked_sessions(&self) -> usize {
        self.locks.len()
    }

    /// Generate the scene for `location` and store a new session seeded with it.
    /// Without `resources` the session starts from the default ledger.
    pub async fn start(
        &self,
        location: &str,
        resources: Option<ResourceLedger>,
    ) -> Result<StartOutcome, SessionError> {
        let outcome = self.scene.generate(location).await?;
        let session = Session::new(
            location,
            outcome.transcript.clone(),
            resources.unwrap_or_default(),
        );
        self.store.put(&session).await?;
        tracing::info!(session_id = %session.id, location, "session started");
        Ok(StartOutcome {
            session_id: session.id,
            forecast: outcome.forecast,
            transcript: outcome.transcript,
        })
    }

    pub async fn solve(&self, id: &str, solution: &str) -> Result<SolveOutcome, SessionError> {
        self.solve_with_cancel(id, solution, CancellationToken::new()).await
    }

    /// One solve round. The stored session is only written after the analysis fully
    /// succeeds, so an error or a fired `cancel` leaves it as it was.
    pub async fn solve_with_cancel(
        &self,
        id: &str,
        solution: &str,
        cancel: CancellationToken,
    ) -> Result<SolveOutcome, SessionError> {
        let lock = self.lock_for(id);
        let _guard = tokio::select! {
            guard = lock.lock() => guard,
            _ = cancel.cancelled() => return Err(SessionError::Cancelled(id.to_string())),
        };

        let mut session = self.load(id).await?;
        if session.is_terminal() {
            self.release(id);
            return Err(SessionError::Resolved(id.to_string()));
        }

        let round = session.rounds + 1;
        let analysis = self.analyzer.analyze(
            solution,
            &session.ledger,
            session.transcript.clone(),
            session.is_first,
            session.contract.as_ref(),
        );
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(session_id = %id, round, "solve cancelled; session unchanged");
                return Err(SessionError::Cancelled(id.to_string()));
            }
            result = analysis => result?,
        };

        let result = outcome.result;
        let severity = result.updated_severity.score;
        session.ledger = result.updated_resources.clone();
        session.transcript = outcome.transcript;
        session.contract = Some(outcome.contract);
        session.is_first = false;
        session.rounds = round;
        session.last_severity = Some(severity);

        let mut follow_up_threat = None;
        session.phase = if severity >= SEVERITY_THRESHOLD {
            SessionPhase::AwaitingSolution
        } else if let Some(threat) = result.named_follow_up() {
            session.transcript.push_user(prompts::follow_up_turn(threat));
            follow_up_threat = Some(threat.clone());
            SessionPhase::AwaitingSolution
        } else {
            SessionPhase::Terminal
        };
        session.touch();
        self.store.put(&session).await?;
        if session.is_terminal() {
            self.release(id);
        }

        tracing::info!(
            session_id = %id,
            round,
            severity,
            phase = %session.phase,
            follow_up = follow_up_threat.as_ref().map(|t| t.name.as_str()).unwrap_or(""),
            "solve round complete"
        );

        Ok(SolveOutcome {
            session_id: session.id,
            round,
            severity_score: severity,
            updated_resources: result.updated_resources.clone(),
            follow_up_threat,
            analysis: result,
            phase: session.phase,
        })
    }

    /// Current state of a stored session.
    pub async fn session(&self, id: &str) -> Result<Session, SessionError> {
        self.load(id).await
    }

    /// Remove a session from the store along with its lock entry.
    pub async fn delete(&self, id: &str) -> Result<(), SessionError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.store.delete(id).await?;
        self.release(id);
        tracing::info!(session_id = %id, "session deleted");
        Ok(())
    }

    /// Replace a session's starting ledger, e.g. with an ingested resource document.
    /// Only allowed before the first solution has been analyzed.
    pub async fn with_resources(&self, id: &str, ledger: ResourceLedger) -> Result<Session, SessionError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut session = self.load(id).await?;
        if session.is_terminal() {
            self.release(id);
            return Err(SessionError::Resolved(id.to_string()));
        }
        if !session.is_first {
            return Err(SessionError::AlreadyStarted(id.to_string()));
        }
        session.ledger = ledger;
        session.touch();
        self.store.put(&session).await?;
        tracing::info!(session_id = %id, "session resources replaced");
        Ok(session)
    }
}
