use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use vaultgate_tools::audience;
use vaultgate_types::{ContentBlock, ToolResult};

/// JSON-RPC client for a running gateway's `/mcp` endpoint.
pub struct GatewayClient {
    base_url: String,
    client_id: String,
    secret: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: String, client_id: String, secret: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            secret,
            http: reqwest::Client::new(),
        }
    }

    /// Send one JSON-RPC request and return its `result`.
    pub async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(format!("{}/mcp", self.base_url))
            .basic_auth(&self.client_id, Some(&self.secret))
            .json(&request)
            .send()
            .await
            .context("Failed to reach gateway")?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            bail!("Gateway rejected the credentials (401)");
        }

        let response: Value = resp.json().await.context("Failed to parse response")?;
        if let Some(error) = response.get("error") {
            bail!(
                "{} ({})",
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Unknown error"),
                error.get("code").and_then(|c| c.as_i64()).unwrap_or_default()
            );
        }
        response
            .get("result")
            .cloned()
            .context("Response has neither result nor error")
    }

    pub async fn health(&self) -> Result<Value> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to reach gateway")?;
        Ok(resp.json().await?)
    }
}

/// `tools`: print every exposed tool.
pub async fn run_tools(client: &GatewayClient) -> Result<()> {
    let result = client.rpc("tools/list", json!({})).await?;
    let tools = result
        .get("tools")
        .and_then(|t| t.as_array())
        .context("tools/list returned no tools array")?;

    for tool in tools {
        let name = tool["name"].as_str().unwrap_or("?");
        let gated = if tool["needsApproval"].as_bool().unwrap_or(false) {
            " [approval]"
        } else {
            ""
        };
        let read_only = if tool["annotations"]["readOnlyHint"].as_bool().unwrap_or(false) {
            " [read-only]"
        } else {
            ""
        };
        println!("{name}{gated}{read_only}");
        if let Some(desc) = tool["description"].as_str() {
            println!("    {desc}");
        }
    }
    eprintln!("({} tools)", tools.len());
    Ok(())
}

/// `call`: invoke a tool and print the model and user views separately.
pub async fn run_call(
    client: &GatewayClient,
    name: String,
    arguments: Option<String>,
    approve: bool,
    deny: Option<String>,
) -> Result<()> {
    let arguments = parse_arguments(arguments.as_deref())?;
    let mut params = json!({"name": name, "arguments": arguments});
    if approve {
        params["approval"] = json!({"approved": true});
    } else if let Some(reason) = deny {
        params["approval"] = json!({"approved": false, "reason": reason});
    }

    let result = client.rpc("tools/call", params).await?;
    let state = result
        .get("state")
        .and_then(|s| s.as_str())
        .unwrap_or("unknown")
        .to_string();
    let (model, user) = render_views(result)?;

    println!("== model view ==");
    println!("{model}");
    println!();
    println!("== user view ==");
    println!("{user}");
    eprintln!("(state: {state})");
    Ok(())
}

/// `approvals list`: pending approvals for these credentials.
pub async fn run_approvals_list(client: &GatewayClient) -> Result<()> {
    let result = client.rpc("approvals/list", json!({})).await?;
    let approvals = result
        .get("approvals")
        .and_then(|a| a.as_array())
        .context("approvals/list returned no approvals array")?;

    for approval in approvals {
        println!("{}", format_approval(approval));
    }
    eprintln!("({} pending)", approvals.len());
    Ok(())
}

/// `approvals respond`: approve or deny a pending request.
pub async fn run_approvals_respond(
    client: &GatewayClient,
    id: String,
    approved: bool,
    reason: Option<String>,
) -> Result<()> {
    let result = client
        .rpc("approvals/respond", respond_params(&id, approved, reason))
        .await?;
    let approval = result.get("approval").context("approvals/respond returned no approval")?;
    println!("{}", format_approval(approval));
    Ok(())
}

pub fn respond_params(id: &str, approved: bool, reason: Option<String>) -> Value {
    let mut params = json!({"id": id, "approved": approved});
    if let Some(reason) = reason {
        params["reason"] = json!(reason);
    }
    params
}

/// One line per approval: id, tool, call id, state, then the decision if any.
pub fn format_approval(approval: &Value) -> String {
    let field = |name: &str| approval[name].as_str().unwrap_or("?").to_string();
    let mut line = format!(
        "{}  {}  call={}  {}",
        field("id"),
        field("tool_name"),
        field("tool_call_id"),
        field("state")
    );
    match approval["approved"].as_bool() {
        Some(true) => line.push_str("  approved"),
        Some(false) => {
            line.push_str("  denied");
            if let Some(reason) = approval["reason"].as_str() {
                line.push_str(&format!(": {reason}"));
            }
        }
        None => {}
    }
    line
}

/// Tool arguments from a JSON string; absent means `{}`.
pub fn parse_arguments(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(json!({})),
        Some(s) => {
            let value: Value = serde_json::from_str(s).context("--args must be valid JSON")?;
            if !value.is_object() {
                bail!("--args must be a JSON object");
            }
            Ok(value)
        }
    }
}

/// Split a `tools/call` result into what a model and a human would see.
pub fn render_views(result: Value) -> Result<(String, String)> {
    let result: ToolResult =
        serde_json::from_value(result).context("tools/call result is not a tool result")?;
    let model = join(&audience::to_model_output(&result));
    let user = join(&audience::to_user_output(&result));
    Ok((model, user))
}

fn join(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .map(ContentBlock::as_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}
