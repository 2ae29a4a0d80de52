//! Per-session conversation state
//!
//! Sessions are created lazily on first access, keyed by an opaque id handed
//! to the browser, and discarded after sitting idle. Each session sits behind
//! its own mutex, so submissions within one session run one at a time while
//! different sessions never contend.

use crate::conversation::Conversation;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// State owned by one browser session
#[derive(Debug)]
pub struct Session {
    id: String,
    pub conversation: Conversation,
    flash_error: Option<String>,
}

impl Session {
    fn new(id: String) -> Self {
        let mut conversation = Conversation::new();
        conversation.initialize();
        Self {
            id,
            conversation,
            flash_error: None,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remember an error to show on the next render
    pub fn set_flash_error(&mut self, message: impl Into<String>) {
        self.flash_error = Some(message.into());
    }

    /// Take the pending error, if any. It is shown once.
    pub fn take_flash_error(&mut self) -> Option<String> {
        self.flash_error.take()
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// A session resolved for one request
pub struct SessionLookup {
    pub id: String,
    pub handle: SessionHandle,
    /// True when the id was minted for this request
    pub created: bool,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    idle_timeout: chrono::Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: chrono::Duration::from_std(idle_timeout)
                .unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Resolve `id` to a live session, creating a fresh one (with a new id)
    /// when it is absent, unknown, or expired.
    pub async fn get_or_create(&self, id: Option<&str>) -> SessionLookup {
        self.get_or_create_at(id, Utc::now()).await
    }

    pub async fn get_or_create_at(&self, id: Option<&str>, now: DateTime<Utc>) -> SessionLookup {
        let mut sessions = self.sessions.write().await;
        self.retain_live(&mut sessions, now);

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(id) {
                entry.last_seen = now;
                return SessionLookup {
                    id: id.to_string(),
                    handle: entry.handle.clone(),
                    created: false,
                };
            }
        }

        let id = Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(Session::new(id.clone())));
        sessions.insert(
            id.clone(),
            Entry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        tracing::info!(session = %id, active = sessions.len(), "Session created");

        SessionLookup {
            id,
            handle,
            created: true,
        }
    }

    /// Drop sessions idle for longer than the timeout. Returns how many went.
    pub async fn prune_idle(&self) -> usize {
        self.prune_idle_at(Utc::now()).await
    }

    pub async fn prune_idle_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        self.retain_live(&mut sessions, now)
    }

    fn retain_live(&self, sessions: &mut HashMap<String, Entry>, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_seen <= self.idle_timeout);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, active = sessions.len(), "Pruned idle sessions");
        }
        removed
    }

    #[allow(dead_code)] // Used in tests
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically prune idle sessions for the life of the process
pub fn spawn_sweeper(store: Arc<SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            store.prune_idle().await;
        }
    })
}
