//! Server-side sessions keyed by an opaque identifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub rol: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.rol == Role::Admin
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: Option<SessionUser>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed session {id}: {reason}")]
    Malformed { id: String, reason: String },
    #[error("session store is full ({max} sessions)")]
    Full { max: usize },
}

#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, id: &str) -> Result<Option<SessionData>, SessionError>;

    /// Stores `data` under `id` and restarts its expiry clock.
    async fn set(&self, id: &str, data: SessionData) -> Result<(), SessionError>;

    async fn destroy(&self, id: &str) -> Result<(), SessionError>;

    /// Drops expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, SessionError> {
        Ok(0)
    }
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Session id -> (JSON-encoded data, expires_at).
///
/// Writes go through `admission` so the capacity check and the insert are one step;
/// the store never holds more than `max_sessions` entries.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, (String, Instant)>>,
    admission: Arc<Mutex<()>>,
    ttl: Duration,
    max_sessions: usize,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            admission: Arc::new(Mutex::new(())),
            ttl,
            max_sessions,
        }
    }

    fn remove_expired(&self, now: Instant) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, (_, expires)| *expires > now);
        before.saturating_sub(self.inner.len())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<SessionData>, SessionError> {
        let Some(entry) = self.inner.get(id) else {
            return Ok(None);
        };
        if entry.1 <= Instant::now() {
            drop(entry);
            self.inner.remove(id);
            return Ok(None);
        }

        serde_json::from_str(&entry.0)
            .map(Some)
            .map_err(|err| SessionError::Malformed {
                id: id.to_string(),
                reason: err.to_string(),
            })
    }

    async fn set(&self, id: &str, data: SessionData) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(&data).map_err(|err| SessionError::Malformed {
            id: id.to_string(),
            reason: err.to_string(),
        })?;

        let _admitted = self.admission.lock().await;
        let now = Instant::now();
        if !self.inner.contains_key(id) && self.inner.len() >= self.max_sessions {
            self.remove_expired(now);
            if self.inner.len() >= self.max_sessions {
                return Err(SessionError::Full {
                    max: self.max_sessions,
                });
            }
        }

        self.inner.insert(id.to_string(), (encoded, now + self.ttl));
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        self.inner.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, SessionError> {
        Ok(self.remove_expired(Instant::now()))
    }
}
