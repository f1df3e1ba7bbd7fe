//! vaultgate-gateway: HTTP JSON-RPC server in front of the tool router.
//!
//! Provides:
//! - `POST /mcp`: JSON-RPC 2.0 with Basic authentication
//! - `GET /health`: unauthenticated health check
//! - Per-credential sessions (vault, disclosure, pending approvals)
//! - Audit logging through the hook registry

pub mod auth;
pub mod handlers;
pub mod jsonrpc;
pub mod session_manager;

#[cfg(test)]
pub(crate) mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::Value;
use tracing::info;

use vaultgate_config::VaultGateConfig;
use vaultgate_hooks::{HookEvent, HookRegistry};
use vaultgate_storage::KvStore;
use vaultgate_tools::{ToolPolicy, registry};

use jsonrpc::{INTERNAL_ERROR, INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use session_manager::{SessionManager, http_upstream};

/// Shared gateway state.
pub struct GatewayState {
    pub sessions: Arc<SessionManager>,
}

/// Routes for the gateway. Split out so tests can drive it without a socket.
pub fn build_app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .with_state(state)
}

/// Start the Gateway server.
///
/// Opens storage, resolves the tool policy, binds and serves until the
/// process exits.
pub async fn start_gateway(
    config: VaultGateConfig,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = port_override.unwrap_or(config.gateway.port);
    let host = config.gateway.host.clone();

    let db_path = config.storage_path()?;
    let store = KvStore::open(&db_path)?;

    let hooks = Arc::new(HookRegistry::new());
    vaultgate_hooks::audit::register_audit_log(&hooks).await;

    let policy = Arc::new(ToolPolicy::new(&config.tools, registry().descriptors()));
    info!(
        "Tool policy: {} of {} tools enabled (profile {:?})",
        policy.len(),
        registry().len(),
        config.tools.profile
    );

    let sessions = Arc::new(SessionManager::new(
        store,
        hooks.clone(),
        policy,
        Duration::from_secs(config.approval.timeout_secs),
        http_upstream(config.upstream.clone()),
    ));
    sessions.spawn_idle_sweeper(Duration::from_secs(config.gateway.session_idle_secs));
    let app = build_app(Arc::new(GatewayState { sessions }));

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on {addr}");
    info!("  MCP:      http://{addr}/mcp");
    info!("  Health:   http://{addr}/health");
    info!("  Upstream: {}", config.upstream.resolved_base_url());
    info!("  Storage:  {}", db_path.display());

    hooks
        .emit(HookEvent::GatewayStartup {
            addr: addr.to_string(),
        })
        .await;

    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /health: simple HTTP health check.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /mcp: authenticate, then dispatch one JSON-RPC request.
async fn mcp_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let credentials = match auth::parse_basic_auth(&headers) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("MCP authentication failed: {e}");
            return auth::unauthorized();
        }
    };

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => {
            return rpc_reply(JsonRpcResponse::error(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {e}"),
            ));
        }
    };

    if request.jsonrpc != "2.0" {
        return rpc_reply(JsonRpcResponse::error(
            request.id,
            INVALID_REQUEST,
            "Invalid JSON-RPC version, expected '2.0'",
        ));
    }

    let router = match state.sessions.router(credentials).await {
        Ok(router) => router,
        Err(e) => {
            tracing::error!("Failed to build upstream client: {e}");
            return rpc_reply(JsonRpcResponse::error(request.id, INTERNAL_ERROR, e.to_string()));
        }
    };

    tracing::debug!(method = %request.method, "MCP request");
    let response =
        handlers::handle_rpc(&request.method, request.params, request.id, &router).await;
    rpc_reply(response)
}

fn rpc_reply(response: JsonRpcResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}
