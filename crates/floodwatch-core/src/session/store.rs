//! Session persistence behind an async trait: in-memory (dashmap) or on-disk (sled).

use super::Session;
use crate::error::StoreError;
use dashmap::DashMap;
use std::path::Path;

const SESSIONS_TREE: &str = "sessions";

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Insert or replace the whole session.
    async fn put(&self, session: &Session) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(id).map(|s| s.value().clone()))
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.sessions.remove(id);
        Ok(())
    }
}

/// Sessions as JSON values in the `sessions` tree, keyed by session id.
pub struct SledSessionStore {
    tree: sled::Tree,
}

impl SledSessionStore {
    /// Opens (or creates) the store at `path`, e.g. `./data/sessions`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(SESSIONS_TREE)?;
        tracing::info!(path = %path.as_ref().display(), sessions = tree.len(), "session store opened");
        Ok(Self { tree })
    }
}

#[async_trait::async_trait]
impl SessionStore for SledSessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let Some(bytes) = self.tree.get(id.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(session)?;
        self.tree.insert(session.id.as_bytes(), bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.tree.remove(id.as_bytes())?;
        Ok(())
    }
}
