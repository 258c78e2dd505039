//! MCP (Model Context Protocol) server for link conversion.
//!
//! Exposes the conversion engine as JSON-RPC 2.0 tools. The `mcp-server`
//! binary serves it over stdio, one request per line:
//!
//! ```bash
//! echo '{"jsonrpc":"2.0","id":1,"method":"convert_link","params":["123456"]}' \
//!     | cargo run --bin mcp-server
//! ```

use crate::application::{LinkComposer, LinkConverter, PatternRegistry};
use crate::domain::{ConversionError, Platform};
use jsonrpc_core::{BoxFuture, Error, ErrorCode, IoHandler, Result, Value};
use jsonrpc_derive::rpc;
use serde_json::json;
use std::sync::Arc;

/// JSON-RPC error code for links the engine could not convert.
pub const CONVERSION_ERROR_CODE: i64 = -32010;

/// MCP server implementation.
#[derive(Clone)]
pub struct McpServer {
    converter: Arc<LinkConverter>,
}

impl McpServer {
    pub fn new(converter: Arc<LinkConverter>) -> Self {
        Self { converter }
    }

    /// JSON-RPC handler with every tool registered.
    pub fn into_handler(self) -> IoHandler {
        let mut io = IoHandler::new();
        io.extend_with(self.to_delegate());
        io
    }
}

fn conversion_error(err: &ConversionError) -> Error {
    Error {
        code: ErrorCode::ServerError(CONVERSION_ERROR_CODE),
        message: err.to_string(),
        data: serde_json::to_value(err).ok(),
    }
}

fn internal_error(err: serde_json::Error) -> Error {
    Error {
        code: ErrorCode::InternalError,
        message: err.to_string(),
        data: None,
    }
}

#[rpc(server)]
pub trait McpRpc {
    /// Convert a marketplace, agent, or short link (or bare numeric id).
    #[rpc(name = "convert_link")]
    fn convert_link(&self, link: String) -> BoxFuture<Result<Value>>;

    /// List supported marketplaces with their codes and link templates.
    #[rpc(name = "list_platforms")]
    fn list_platforms(&self) -> Result<Value>;

    /// Resolve a platform token; unknown tokens default to TAOBAO.
    #[rpc(name = "normalize_platform")]
    fn normalize_platform(&self, token: String) -> Result<Value>;
}

impl McpRpc for McpServer {
    fn convert_link(&self, link: String) -> BoxFuture<Result<Value>> {
        let converter = self.converter.clone();
        Box::pin(async move {
            match converter.convert(&link).await {
                Ok(result) => serde_json::to_value(result).map_err(internal_error),
                Err(e) => Err(conversion_error(&e)),
            }
        })
    }

    fn list_platforms(&self) -> Result<Value> {
        let platforms: Vec<Value> = PatternRegistry::global()
            .supported_platforms()
            .into_iter()
            .map(|platform| {
                json!({
                    "code": platform.code(),
                    "name": platform.long_name(),
                    "template": LinkComposer::original_template(platform),
                })
            })
            .collect();
        let count = platforms.len();
        Ok(json!({ "platforms": platforms, "count": count }))
    }

    fn normalize_platform(&self, token: String) -> Result<Value> {
        let resolution = Platform::resolve(&token);
        Ok(json!({
            "token": token,
            "platform": resolution.platform.long_name(),
            "code": resolution.platform.code(),
            "defaulted": resolution.defaulted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::StaticShortLinkExpander;

    fn handler() -> IoHandler {
        let converter = LinkConverter::new(
            Arc::new(StaticShortLinkExpander::new()),
            LinkComposer::new("MCP1"),
        );
        McpServer::new(Arc::new(converter)).into_handler()
    }

    async fn call(request: Value) -> Value {
        let io = handler();
        let response = io.handle_request(&request.to_string()).await.unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_convert_link() {
        let response = call(json!({
            "jsonrpc": "2.0", "id": 1, "method": "convert_link",
            "params": ["https://item.jd.com/100.html"]
        }))
        .await;
        assert_eq!(response["result"]["itemId"], "100");
        assert_eq!(response["result"]["platform"], "JD");
        assert!(response["result"]["targetUrl"]
            .as_str()
            .unwrap()
            .ends_with("ref=MCP1"));
    }

    #[tokio::test]
    async fn test_convert_link_error_carries_kind() {
        let response = call(json!({
            "jsonrpc": "2.0", "id": 2, "method": "convert_link",
            "params": ["not a url at all"]
        }))
        .await;
        assert_eq!(response["error"]["code"], CONVERSION_ERROR_CODE);
        assert_eq!(response["error"]["data"]["kind"], "unrecognized_link");
    }

    #[tokio::test]
    async fn test_list_platforms() {
        let response = call(json!({"jsonrpc": "2.0", "id": 3, "method": "list_platforms"})).await;
        assert_eq!(response["result"]["count"], 5);
        assert_eq!(response["result"]["platforms"][0]["code"], "TB");
    }

    #[tokio::test]
    async fn test_normalize_platform() {
        let response = call(json!({
            "jsonrpc": "2.0", "id": 4, "method": "normalize_platform", "params": ["wd"]
        }))
        .await;
        assert_eq!(response["result"]["platform"], "WEIDIAN");
        assert_eq!(response["result"]["defaulted"], false);

        let response = call(json!({
            "jsonrpc": "2.0", "id": 5, "method": "normalize_platform", "params": ["amazon"]
        }))
        .await;
        assert_eq!(response["result"]["platform"], "TAOBAO");
        assert_eq!(response["result"]["defaulted"], true);
    }
}
