//! Per-credential sessions.
//!
//! A session is keyed by the credential namespace (hex SHA-256 of
//! `client_id:secret`) and owns the vault, disclosure preferences and
//! pending approvals for that namespace. Upstream clients are not part of
//! the session; one is built for every request from the credentials that
//! request carried.
//!
//! Vault and disclosure data live in storage, so evicting an idle session
//! only drops in-memory handles. Sessions with pending approvals are kept.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use vaultgate_config::UpstreamConfig;
use vaultgate_hooks::{HookEvent, HookRegistry};
use vaultgate_storage::{DisclosureRegistry, KvStore, Vault};
use vaultgate_tools::{ApprovalGate, ToolContext, ToolPolicy, ToolRouter};
use vaultgate_upstream::{Credentials, PlaidHttpClient, UpstreamClient, UpstreamError};

/// Builds the upstream client for one request.
pub type UpstreamFactory =
    Arc<dyn Fn(Credentials) -> Result<Arc<dyn UpstreamClient>, UpstreamError> + Send + Sync>;

/// Factory for the real HTTP client, sharing one connection pool.
pub fn http_upstream(config: UpstreamConfig) -> UpstreamFactory {
    let client = reqwest::Client::new();
    Arc::new(move |credentials| {
        let upstream = PlaidHttpClient::with_client(&config, credentials, client.clone())?;
        Ok(Arc::new(upstream) as Arc<dyn UpstreamClient>)
    })
}

/// State held for one credential namespace.
pub struct Session {
    pub namespace: String,
    pub vault: Vault,
    pub disclosure: DisclosureRegistry,
    pub approvals: Arc<ApprovalGate>,
    last_active_at: Mutex<Instant>,
}

impl Session {
    fn touch(&self) {
        *self.last_active_at.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_active_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

/// Summary of a live session, safe to log or return.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub namespace_prefix: String,
    pub pending_approvals: usize,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    store: KvStore,
    hooks: Arc<HookRegistry>,
    policy: Arc<ToolPolicy>,
    approval_timeout: Duration,
    upstream: UpstreamFactory,
}

impl SessionManager {
    pub fn new(
        store: KvStore,
        hooks: Arc<HookRegistry>,
        policy: Arc<ToolPolicy>,
        approval_timeout: Duration,
        upstream: UpstreamFactory,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            hooks,
            policy,
            approval_timeout,
            upstream,
        }
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// The session for these credentials, created on first use.
    pub async fn session(&self, credentials: &Credentials) -> Arc<Session> {
        let namespace = credentials.namespace();

        if let Some(session) = self.sessions.read().await.get(&namespace) {
            session.touch();
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have created it while we waited
        if let Some(session) = sessions.get(&namespace) {
            session.touch();
            return session.clone();
        }

        let ns = self.store.namespace(namespace.clone());
        let session = Arc::new(Session {
            namespace: namespace.clone(),
            vault: Vault::new(ns.clone()),
            disclosure: DisclosureRegistry::new(ns),
            approvals: Arc::new(ApprovalGate::new(self.approval_timeout)),
            last_active_at: Mutex::new(Instant::now()),
        });
        sessions.insert(namespace.clone(), session.clone());
        drop(sessions);

        self.hooks.emit(HookEvent::SessionStart { namespace }).await;
        session
    }

    /// A router for one request: session state plus a fresh upstream client.
    pub async fn router(&self, credentials: Credentials) -> Result<ToolRouter, UpstreamError> {
        let session = self.session(&credentials).await;
        let upstream = (self.upstream)(credentials)?;
        let ctx = ToolContext::new(session.vault.clone(), session.disclosure.clone(), upstream);
        Ok(ToolRouter::new(
            ctx,
            session.approvals.clone(),
            self.hooks.clone(),
            self.policy.clone(),
        ))
    }

    /// Drop sessions idle for at least `max_idle` that have nothing pending.
    /// Returns how many were removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let candidates: Vec<(String, Arc<Session>)> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.idle_for() >= max_idle)
            .map(|(ns, s)| (ns.clone(), s.clone()))
            .collect();

        let mut idle = Vec::new();
        for (namespace, session) in candidates {
            if session.approvals.pending_count().await == 0 {
                idle.push(namespace);
            }
        }
        if idle.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let mut removed = 0;
        for namespace in idle {
            // Recheck: a request may have touched it since the scan
            let still_idle = sessions
                .get(&namespace)
                .is_some_and(|s| s.idle_for() >= max_idle);
            if still_idle && sessions.remove(&namespace).is_some() {
                removed += 1;
            }
        }
        tracing::debug!(removed, remaining = sessions.len(), "Evicted idle sessions");
        removed
    }

    /// Periodically evict idle sessions until the manager is dropped.
    pub fn spawn_idle_sweeper(self: &Arc<Self>, max_idle: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.evict_idle(max_idle).await;
            }
        })
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(SessionInfo {
                namespace_prefix: session.namespace.chars().take(12).collect(),
                pending_approvals: session.approvals.pending_count().await,
            });
        }
        infos
    }
}
