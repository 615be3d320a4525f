// src/services/session_store.rs
use crate::errors::StyleError;
use crate::flows::{AdvisorController, TryOnController};
use crate::models::{SessionSummary, Tab};
use crate::services::StyleService;
use chrono::{DateTime, Utc};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// How long an untouched session lives, and how many may exist at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: DEFAULT_SESSION_IDLE_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// One browser session: both flows plus the selected tab. In memory only.
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub try_on: TryOnController,
    pub advisor: AdvisorController,
    active_tab: Mutex<Tab>,
    last_active: Mutex<Instant>,
}

impl Session {
    fn new(service: Arc<dyn StyleService>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            try_on: TryOnController::new(service.clone()),
            advisor: AdvisorController::new(service),
            active_tab: Mutex::new(Tab::default()),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub async fn active_tab(&self) -> Tab {
        *self.active_tab.lock().await
    }

    pub async fn set_active_tab(&self, tab: Tab) {
        *self.active_tab.lock().await = tab;
    }

    pub async fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            active_tab: self.active_tab().await,
            created_at: self.created_at,
        }
    }

    async fn touch(&self) {
        *self.last_active.lock().await = Instant::now();
    }

    async fn last_active(&self) -> Instant {
        *self.last_active.lock().await
    }

    async fn shutdown(&self) {
        self.try_on.shutdown().await;
        self.advisor.shutdown().await;
    }
}

/// Live sessions keyed by id. Sessions idle past the TTL are dropped, and when
/// the cap is reached the least recently used one makes room for a new one.
pub struct SessionStore {
    service: Arc<dyn StyleService>,
    limits: SessionLimits,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionStore {
    pub fn new(service: Arc<dyn StyleService>) -> Self {
        Self::with_limits(service, SessionLimits::default())
    }

    pub fn with_limits(service: Arc<dyn StyleService>, limits: SessionLimits) -> Self {
        Self {
            service,
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(self.service.clone()));

        let evicted = {
            let mut sessions = self.sessions.write().await;
            let mut evicted = self.take_expired(&mut sessions).await;

            let cap = self.limits.max_sessions.max(1);
            if sessions.len() >= cap {
                let mut by_age = Vec::with_capacity(sessions.len());
                for (id, existing) in sessions.iter() {
                    by_age.push((existing.last_active().await, *id));
                }
                by_age.sort();
                let excess = sessions.len() + 1 - cap;
                for (_, id) in by_age.into_iter().take(excess) {
                    if let Some(old) = sessions.remove(&id) {
                        evicted.push(old);
                    }
                }
            }

            sessions.insert(session.id, session.clone());
            evicted
        };

        for old in evicted {
            old.shutdown().await;
            info!("Evicted session {}", old.id);
        }
        info!("Created session {} ({})", session.id, self.service.name());
        session
    }

    /// Looks a session up and marks it as active.
    pub async fn get(&self, id: &Uuid) -> Result<Arc<Session>, StyleError> {
        let session = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StyleError::SessionNotFound(*id))?;
        session.touch().await;
        Ok(session)
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Removes the session and tears down its flows.
    pub async fn remove(&self, id: &Uuid) -> Result<(), StyleError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or(StyleError::SessionNotFound(*id))?;
        session.shutdown().await;
        info!("Closed session {}", id);
        Ok(())
    }

    /// Drops every session idle past the TTL. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let expired = {
            let mut sessions = self.sessions.write().await;
            self.take_expired(&mut sessions).await
        };
        for session in &expired {
            session.shutdown().await;
            info!("Expired session {}", session.id);
        }
        expired.len()
    }

    async fn take_expired(
        &self,
        sessions: &mut HashMap<Uuid, Arc<Session>>,
    ) -> Vec<Arc<Session>> {
        let now = Instant::now();
        let mut expired_ids = Vec::new();
        for (id, session) in sessions.iter() {
            if now.duration_since(session.last_active().await) > self.limits.idle_ttl {
                expired_ids.push(*id);
            }
        }
        expired_ids
            .into_iter()
            .filter_map(|id| sessions.remove(&id))
            .collect()
    }
}
