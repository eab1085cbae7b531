//! JSON-RPC 2.0 transport over HTTP
//!
//! One POST per request, no batching. Errors returned by the node keep their
//! code and message; anything that prevents getting an answer at all is a
//! transport error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::{Error, Result};

/// Error object of a failed JSON-RPC call
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// HTTP JSON-RPC client for a single endpoint
pub struct RpcTransport {
    http: reqwest::Client,
    url: String,
    /// Request id counter
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport {
                method: "<client>".to_string(),
                source: e,
            })?;

        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and deserialize its result
    ///
    /// A `null` result deserializes into `T` as-is, so use `Option<T>` for
    /// methods that legitimately return nothing (pending receipts).
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!("RPC >>> {}", body);

        let transport_error = |e: reqwest::Error| Error::Transport {
            method: method.to_string(),
            source: e,
        };

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?
            .json()
            .await
            .map_err(transport_error)?;

        if let Some(error) = response.error {
            tracing::debug!("RPC <<< {} error {}: {}", method, error.code, error.message);
            return Err(Error::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        let result = response.result.unwrap_or(Value::Null);
        tracing::debug!("RPC <<< {}", result);
        Ok(serde_json::from_value(result)?)
    }
}
