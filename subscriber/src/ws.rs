//! `eth_subscribe("logs")` over a websocket.

use async_trait::async_trait;
use futures_util::{stream, SinkExt, StreamExt};
use landgrab_ledger::{LogFilter, RawLog};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::error::SubscriberError;
use crate::transport::{EventTransport, LogStream};

const SUBSCRIBE_ID: u64 = 1;

pub struct WsTransport {
    url: String,
    handshake_timeout: Duration,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventTransport for WsTransport {
    async fn open(&self, filter: &LogFilter) -> Result<LogStream, SubscriberError> {
        let (mut ws, _) = tokio::time::timeout(self.handshake_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| SubscriberError::Connect(format!("{} timed out", self.url)))?
            .map_err(|e| SubscriberError::Connect(e.to_string()))?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": SUBSCRIBE_ID,
            "method": "eth_subscribe",
            "params": ["logs", filter.to_json()],
        });
        ws.send(Message::Text(request.to_string()))
            .await
            .map_err(|e| SubscriberError::Connect(e.to_string()))?;

        // Notifications cannot arrive before the subscription id is returned.
        let subscription = loop {
            let message = tokio::time::timeout(self.handshake_timeout, ws.next())
                .await
                .map_err(|_| SubscriberError::Connect("no reply to eth_subscribe".into()))?;
            match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(id) = parse_subscribe_reply(&text)? {
                        break id;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Err(SubscriberError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SubscriberError::Connect(e.to_string())),
            }
        };
        debug!(url = %self.url, %subscription, "log subscription registered");

        let logs = stream::unfold(Some(ws), move |state| {
            let subscription = subscription.clone();
            async move {
                let mut ws = state?;
                loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => match parse_notification(&text, &subscription) {
                            Ok(Some(log)) => return Some((Ok(log), Some(ws))),
                            Ok(None) => continue,
                            Err(e) => return Some((Err(e), Some(ws))),
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            return Some((Err(SubscriberError::Closed), None))
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Some((Err(SubscriberError::Transport(e.to_string())), None)),
                    }
                }
            }
        });
        Ok(logs.boxed())
    }
}

/// The subscription id from the reply to our `eth_subscribe`, or `None`
/// for unrelated messages.
pub(crate) fn parse_subscribe_reply(text: &str) -> Result<Option<String>, SubscriberError> {
    let value: Value = serde_json::from_str(text).map_err(|e| SubscriberError::Protocol(e.to_string()))?;
    if value.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_ID) {
        return Ok(None);
    }
    if let Some(error) = value.get("error") {
        return Err(SubscriberError::Connect(format!("eth_subscribe rejected: {error}")));
    }
    value
        .get("result")
        .and_then(Value::as_str)
        .map(|id| Some(id.to_string()))
        .ok_or_else(|| SubscriberError::Protocol(format!("eth_subscribe reply without id: {text}")))
}

/// The log carried by an `eth_subscription` notification for `subscription`.
pub(crate) fn parse_notification(text: &str, subscription: &str) -> Result<Option<RawLog>, SubscriberError> {
    let value: Value = serde_json::from_str(text).map_err(|e| SubscriberError::Protocol(e.to_string()))?;
    if value.get("method").and_then(Value::as_str) != Some("eth_subscription") {
        return Ok(None);
    }
    let params = value
        .get("params")
        .ok_or_else(|| SubscriberError::Protocol("notification without params".into()))?;
    if params.get("subscription").and_then(Value::as_str) != Some(subscription) {
        return Ok(None);
    }
    let result = params
        .get("result")
        .cloned()
        .ok_or_else(|| SubscriberError::Protocol("notification without result".into()))?;
    serde_json::from_value(result)
        .map(Some)
        .map_err(|e| SubscriberError::Protocol(format!("malformed log: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_json(log_index: &str) -> Value {
        json!({
            "address": format!("0x{}", "01".repeat(20)),
            "topics": [format!("0x{}", "aa".repeat(32))],
            "data": "0x",
            "blockNumber": "0x5",
            "transactionHash": format!("0x{}", "bb".repeat(32)),
            "logIndex": log_index,
            "removed": false
        })
    }

    #[test]
    fn subscribe_reply_yields_id() {
        let reply = r#"{"jsonrpc":"2.0","id":1,"result":"0xcd0c3e8af590364c09d0fa6a1210faf5"}"#;
        assert_eq!(
            parse_subscribe_reply(reply).unwrap().as_deref(),
            Some("0xcd0c3e8af590364c09d0fa6a1210faf5")
        );
    }

    #[test]
    fn subscribe_error_is_connect_failure() {
        let reply = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"notifications not supported"}}"#;
        assert!(matches!(parse_subscribe_reply(reply), Err(SubscriberError::Connect(_))));
    }

    #[test]
    fn unrelated_reply_is_ignored() {
        let reply = r#"{"jsonrpc":"2.0","id":9,"result":"0x1"}"#;
        assert_eq!(parse_subscribe_reply(reply).unwrap(), None);
    }

    #[test]
    fn notification_yields_log() {
        let text = json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": "0xabc", "result": log_json("0x3")}
        })
        .to_string();
        let log = parse_notification(&text, "0xabc").unwrap().unwrap();
        assert_eq!(log.log_index, 3);
        assert_eq!(log.block_number, Some(5));
    }

    #[test]
    fn foreign_subscription_is_ignored() {
        let text = json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": "0xother", "result": log_json("0x3")}
        })
        .to_string();
        assert_eq!(parse_notification(&text, "0xabc").unwrap(), None);
    }

    #[test]
    fn malformed_log_is_protocol_error() {
        let text = json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": "0xabc", "result": {"address": "nope"}}
        })
        .to_string();
        let err = parse_notification(&text, "0xabc").unwrap_err();
        assert!(!err.is_fatal());
    }
}
