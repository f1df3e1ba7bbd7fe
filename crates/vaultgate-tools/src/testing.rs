//! Test support: a recording upstream and an in-memory session context.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use vaultgate_storage::{DisclosureRegistry, KvStore, Vault};
use vaultgate_upstream::{ApiError, UpstreamClient, UpstreamError};

use crate::context::ToolContext;

/// Canned responses per endpoint; every request is recorded.
#[derive(Default)]
pub(crate) struct MockUpstream {
    responses: Mutex<HashMap<String, Result<Value, ApiError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockUpstream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_response(self, endpoint: &str, body: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Ok(body));
        self
    }

    pub(crate) fn with_error(self, endpoint: &str, code: &str) -> Self {
        let error = ApiError {
            error_type: "INVALID_INPUT".into(),
            error_code: code.into(),
            error_message: format!("mock failure for {endpoint}"),
            display_message: None,
            request_id: Some("req-mock".into()),
        };
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Err(error));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn request(&self, endpoint: &str, body: Value) -> Result<Value, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body));
        match self.responses.lock().unwrap().get(endpoint) {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(e)) => Err(UpstreamError::Api(e.clone())),
            None => Err(UpstreamError::Api(ApiError {
                error_type: "MOCK".into(),
                error_code: "UNMOCKED_ENDPOINT".into(),
                error_message: endpoint.to_string(),
                ..Default::default()
            })),
        }
    }
}

/// Fresh in-memory session wired to `upstream`.
pub(crate) fn context(upstream: MockUpstream) -> (ToolContext, Arc<MockUpstream>) {
    let store = KvStore::open_in_memory().unwrap();
    let ns = store.namespace("test-session");
    let upstream = Arc::new(upstream);
    let ctx = ToolContext::new(
        Vault::new(ns.clone()),
        DisclosureRegistry::new(ns),
        upstream.clone(),
    );
    (ctx, upstream)
}
