//! Nullable JSON-RPC transport: scripted replies, recorded calls.

use async_trait::async_trait;
use landgrab_ledger::{LedgerError, RpcTransport};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::lock;

#[derive(Default)]
struct RpcState {
    queued: HashMap<String, VecDeque<Result<Value, LedgerError>>>,
    defaults: HashMap<String, Value>,
    calls: Vec<(String, Value)>,
}

/// Queued replies are used first, then the method's default. Unscripted
/// methods fail with `-32601`.
#[derive(Default)]
pub struct NullRpc {
    state: Mutex<RpcState>,
}

impl NullRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to every call of `method` with `result`.
    pub fn respond(&self, method: &str, result: Value) -> &Self {
        lock(&self.state).defaults.insert(method.to_string(), result);
        self
    }

    /// Reply once, ahead of the default.
    pub fn enqueue(&self, method: &str, reply: Result<Value, LedgerError>) -> &Self {
        lock(&self.state)
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.state).calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        lock(&self.state).calls.iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        lock(&self.state).calls.iter().filter(|(m, _)| m == method).count()
    }
}

#[async_trait]
impl RpcTransport for NullRpc {
    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let mut state = lock(&self.state);
        state.calls.push((method.to_string(), params));
        if let Some(reply) = state.queued.get_mut(method).and_then(VecDeque::pop_front) {
            return reply;
        }
        state.defaults.get(method).cloned().ok_or_else(|| LedgerError::Rpc {
            code: -32601,
            message: format!("method {method} not scripted"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn queued_replies_precede_default() {
        let rpc = NullRpc::new();
        rpc.respond("eth_chainId", json!("0x1"))
            .enqueue("eth_chainId", Err(LedgerError::Transport("reset".into())));

        assert!(rpc.request("eth_chainId", json!([])).await.is_err());
        assert_eq!(rpc.request("eth_chainId", json!([])).await.unwrap(), json!("0x1"));
        assert_eq!(rpc.count("eth_chainId"), 2);
    }

    #[tokio::test]
    async fn unscripted_method_fails() {
        let rpc = NullRpc::new();
        let err = rpc.request("eth_gasPrice", json!([])).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { code: -32601, .. }));
        assert_eq!(rpc.methods(), vec!["eth_gasPrice"]);
    }
}
