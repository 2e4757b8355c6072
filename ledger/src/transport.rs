//! JSON-RPC transport.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::abi::decode_revert_reason;
use crate::error::LedgerError;
use crate::hexutil::decode_hex;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A single JSON-RPC endpoint. One provider serves every query, so reads
/// observe a consistent view.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue `method` with `params` and return the `result` member, which may
    /// be `null`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError>;
}

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Transport(format!("{method} timed out: {e}"))
                } else if e.is_connect() {
                    LedgerError::Transport(format!("connection failed: {e}"))
                } else {
                    LedgerError::Transport(format!("{method} failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: node returned HTTP {}",
                response.status()
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("invalid JSON-RPC response: {e}")))?;

        parse_response(json)
    }
}

/// Split a JSON-RPC response into its result or a typed error.
pub fn parse_response(mut json: Value) -> Result<Value, LedgerError> {
    if let Some(error) = json.get("error") {
        return Err(rpc_error(error));
    }
    match json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(LedgerError::Decode("response has neither result nor error".into())),
    }
}

/// Classify a JSON-RPC error object. Reverts are recognised from an
/// `Error(string)` payload in `data` (possibly nested one level, as some
/// development nodes do) or from the message text.
pub fn rpc_error(error: &Value) -> LedgerError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    let revert_data = match error.get("data") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(o)) => o.get("data").and_then(Value::as_str),
        _ => None,
    };
    if let Some(reason) = revert_data
        .and_then(|d| decode_hex(d).ok())
        .and_then(|bytes| decode_revert_reason(&bytes))
    {
        return LedgerError::Revert { reason };
    }

    if code == 3 || message.to_ascii_lowercase().contains("revert") {
        let reason = message
            .strip_prefix("execution reverted: ")
            .unwrap_or(&message)
            .to_string();
        return LedgerError::Revert { reason };
    }

    LedgerError::Rpc { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{encode_args, Token, ERROR_SELECTOR};
    use crate::hexutil::encode_hex;
    use serde_json::json;

    fn revert_payload(reason: &str) -> String {
        let mut data = ERROR_SELECTOR.to_vec();
        data.extend(encode_args(&[Token::String(reason.into())]));
        encode_hex(&data)
    }

    #[test]
    fn result_is_extracted() {
        let value = parse_response(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"})).unwrap();
        assert_eq!(value, json!("0x1"));
    }

    #[test]
    fn null_result_is_preserved() {
        let value = parse_response(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn revert_reason_from_data_string() {
        let err = rpc_error(&json!({
            "code": 3,
            "message": "execution reverted: Request not found",
            "data": revert_payload("Request not found"),
        }));
        match err {
            LedgerError::Revert { reason } => assert_eq!(reason, "Request not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn revert_reason_from_nested_data() {
        let err = rpc_error(&json!({
            "code": -32603,
            "message": "Internal error",
            "data": {"message": "reverted", "data": revert_payload("Land already claimed")},
        }));
        assert!(matches!(err, LedgerError::Revert { reason } if reason == "Land already claimed"));
    }

    #[test]
    fn revert_without_payload_uses_message() {
        let err = rpc_error(&json!({"code": -32000, "message": "execution reverted"}));
        assert!(matches!(err, LedgerError::Revert { .. }));
    }

    #[test]
    fn other_errors_keep_code_and_message() {
        let err = rpc_error(&json!({"code": -32601, "message": "method not found"}));
        match err {
            LedgerError::Rpc { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "method not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
