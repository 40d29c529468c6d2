//! HTTP debug bridge.
//!
//! Optional facade over a running Veld runtime. Configured entirely from
//! the environment; when unconfigured, every bridge command degrades to a
//! method-specific error instead of crashing.

use serde_json::{json, Value};
use std::time::Duration;
use veld_lsp_protocol::{error_codes, JsonRpcError};

/// Environment variable carrying the HTTP debug endpoint base URL.
pub const BRIDGE_URL_VAR: &str = "VELD_DEBUG_HTTP_URL";
/// Environment variable carrying the remote-serial-protocol address.
pub const RSP_ADDR_VAR: &str = "VELD_RSP_ADDR";

/// Failure classes for bridge commands.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge not configured")]
    NotConfigured,
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("eval requires an expression")]
    MissingExpression,
    #[error("bridge request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("bridge returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
}

impl From<BridgeError> for JsonRpcError {
    fn from(error: BridgeError) -> Self {
        let code = match error {
            BridgeError::UnknownCommand(_) | BridgeError::MissingExpression => {
                error_codes::INVALID_PARAMS
            }
            _ => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError::new(code, error.to_string())
    }
}

/// Facade over the runtime's HTTP debug endpoints.
pub struct DebugBridge {
    base_url: Option<String>,
    rsp_addr: Option<String>,
    client: reqwest::blocking::Client,
}

impl DebugBridge {
    /// Configure from the environment. Absent variables disable the bridge.
    pub fn from_env() -> Self {
        Self::with_config(
            std::env::var(BRIDGE_URL_VAR).ok().filter(|s| !s.is_empty()),
            std::env::var(RSP_ADDR_VAR).ok().filter(|s| !s.is_empty()),
        )
    }

    /// Explicit configuration, used by tests.
    pub fn with_config(base_url: Option<String>, rsp_addr: Option<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { base_url, rsp_addr, client }
    }

    /// Whether an HTTP endpoint is configured.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Execute one `veld.bridge.*` command.
    pub fn execute(&self, command: &str, arguments: &[Value]) -> Result<Value, JsonRpcError> {
        self.execute_inner(command, arguments).map_err(JsonRpcError::from)
    }

    fn execute_inner(&self, command: &str, arguments: &[Value]) -> Result<Value, BridgeError> {
        let Some(base) = &self.base_url else {
            return Err(BridgeError::NotConfigured);
        };
        match command {
            "veld.bridge.status" => self.post(base, "status", json!({ "rsp": self.rsp_addr })),
            "veld.bridge.pause" => self.post(base, "pause", json!({})),
            "veld.bridge.resume" => self.post(base, "resume", json!({})),
            "veld.bridge.eval" => {
                let expr = arguments
                    .first()
                    .and_then(|a| a.as_str())
                    .ok_or(BridgeError::MissingExpression)?;
                self.post(base, "eval", json!({ "expression": expr }))
            }
            _ => Err(BridgeError::UnknownCommand(command.to_string())),
        }
    }

    fn post(&self, base: &str, path: &str, body: Value) -> Result<Value, BridgeError> {
        let url = format!("{}/{}", base.trim_end_matches('/'), path);
        let response = self.client.post(&url).json(&body).send()?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(BridgeError::Status { status, body });
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
