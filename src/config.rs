use anyhow::{bail, Context, Result};
use axum::http::HeaderValue;
use clap::Args;
use std::net::SocketAddr;

pub const DEFAULT_REST_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_JSONRPC_ADDR: &str = "127.0.0.1:4000";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, Args)]
pub struct RestConfig {
    /// Address the REST endpoint listens on
    #[arg(long, env = "CALC_REST_ADDR", default_value = DEFAULT_REST_ADDR)]
    pub rest_addr: SocketAddr,

    /// The single origin allowed to call the REST endpoint from a browser
    #[arg(long, env = "CALC_ALLOWED_ORIGIN", default_value = DEFAULT_ALLOWED_ORIGIN)]
    pub allowed_origin: String,
}

impl RestConfig {
    pub fn origin_header(&self) -> Result<HeaderValue> {
        // credentials を許可するので "*" は指定できない
        if self.allowed_origin.trim() == "*" {
            bail!("allowed origin must be a single concrete origin, not \"*\"");
        }
        HeaderValue::from_str(&self.allowed_origin)
            .with_context(|| format!("invalid allowed origin: {:?}", self.allowed_origin))
    }
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct JsonRpcConfig {
    /// Address the JSON-RPC endpoint listens on
    #[arg(long, env = "CALC_JSONRPC_ADDR", default_value = DEFAULT_JSONRPC_ADDR)]
    pub jsonrpc_addr: SocketAddr,
}

impl Default for JsonRpcConfig {
    fn default() -> Self {
        Self {
            jsonrpc_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
        }
    }
}
