//! Test support: a canned upstream and an in-memory session manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use vaultgate_hooks::HookRegistry;
use vaultgate_storage::KvStore;
use vaultgate_tools::ToolPolicy;
use vaultgate_upstream::{ApiError, UpstreamClient, UpstreamError};

use crate::session_manager::{SessionManager, UpstreamFactory};

/// Responds from a fixed endpoint table and records every request.
#[derive(Clone, Default)]
pub(crate) struct StubUpstream {
    pub responses: Arc<HashMap<String, Value>>,
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl StubUpstream {
    pub(crate) fn with_responses(responses: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            responses: Arc::new(
                responses
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl UpstreamClient for StubUpstream {
    async fn request(&self, endpoint: &str, body: Value) -> Result<Value, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body));
        self.responses.get(endpoint).cloned().ok_or_else(|| {
            UpstreamError::Api(ApiError {
                error_type: "STUB".into(),
                error_code: "UNMOCKED_ENDPOINT".into(),
                error_message: endpoint.to_string(),
                ..Default::default()
            })
        })
    }
}

/// Session manager over in-memory storage, every tool allowed.
pub(crate) fn manager(stub: StubUpstream) -> SessionManager {
    let factory: UpstreamFactory = Arc::new(move |_credentials| {
        Ok(Arc::new(stub.clone()) as Arc<dyn UpstreamClient>)
    });
    SessionManager::new(
        KvStore::open_in_memory().unwrap(),
        Arc::new(HookRegistry::new()),
        Arc::new(ToolPolicy::allow_all()),
        Duration::from_secs(300),
        factory,
    )
}
