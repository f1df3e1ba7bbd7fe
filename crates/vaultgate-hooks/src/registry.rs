//! Hook registry: subscriptions by event kind, dispatched in order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::{EventKind, HookEvent};

/// Async hook handler function type.
pub type HookHandler =
    Arc<dyn Fn(HookEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct Subscription {
    /// `None` receives every event.
    kind: Option<EventKind>,
    handler: HookHandler,
}

/// Dispatches gateway events to subscribed handlers.
///
/// Handlers run one after another in registration order and `emit` returns
/// once all of them have finished, so an audit trail sees events in the
/// order the gateway produced them.
pub struct HookRegistry {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to one kind of event.
    pub async fn on(&self, kind: EventKind, handler: HookHandler) {
        self.subscriptions.write().await.push(Subscription {
            kind: Some(kind),
            handler,
        });
    }

    /// Subscribe to every event.
    pub async fn on_all(&self, handler: HookHandler) {
        self.subscriptions
            .write()
            .await
            .push(Subscription { kind: None, handler });
    }

    pub async fn emit(&self, event: HookEvent) {
        let kind = event.kind();
        // Handlers run without the lock held
        let handlers: Vec<HookHandler> = self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.kind.is_none_or(|k| k == kind))
            .map(|s| s.handler.clone())
            .collect();

        for handler in handlers {
            handler(event.clone()).await;
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
