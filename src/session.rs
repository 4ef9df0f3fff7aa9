use chrono::{DateTime, Utc};
use rand::RngExt;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::report::ResultTable;

pub type SessionId = u64;

/// Sessions kept when no capacity is configured
pub const DEFAULT_SESSION_CAPACITY: usize = 32;

/// Handle to one finished conversion, passed from processing to rendering
#[derive(Debug, Clone, Serialize)]
pub struct ReportSession {
    pub id: SessionId,
    pub source_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub table: Arc<ResultTable>,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<SessionId, ReportSession>,
    /// Ids in insertion order, oldest first
    order: VecDeque<SessionId>,
}

/// In-memory store of conversion results keyed by session id
///
/// Every conversion gets its own entry under a random id, so concurrent
/// uploads never overwrite each other and ids cannot be guessed from one
/// another. The oldest sessions are evicted once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<Sessions>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY)
    }
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            capacity: capacity.max(1),
        }
    }

    /// Store a result and return its session handle
    pub async fn insert(&self, source_name: Option<String>, table: ResultTable) -> ReportSession {
        let mut sessions = self.sessions.write().await;

        let id = {
            let mut rng = rand::rng();
            loop {
                let candidate: SessionId = rng.random();
                if !sessions.by_id.contains_key(&candidate) {
                    break candidate;
                }
            }
        };

        let session = ReportSession {
            id,
            source_name,
            created_at: Utc::now(),
            table: Arc::new(table),
        };
        sessions.by_id.insert(id, session.clone());
        sessions.order.push_back(id);

        while sessions.by_id.len() > self.capacity {
            let Some(evicted) = sessions.order.pop_front() else {
                break;
            };
            if sessions.by_id.remove(&evicted).is_some() {
                debug!("Evicted session {}", evicted);
            }
        }

        session
    }

    pub async fn get(&self, id: SessionId) -> Option<ReportSession> {
        self.sessions.read().await.by_id.get(&id).cloned()
    }

    pub async fn remove(&self, id: SessionId) -> Option<ReportSession> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.by_id.remove(&id)?;
        sessions.order.retain(|other| *other != id);
        Some(removed)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.by_id.is_empty()
    }
}
