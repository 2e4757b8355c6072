//! Raw event logs and subscription filters.

use landgrab_types::{Address, EventId, TxHash};
use serde::{Deserialize, Serialize};

use crate::hexutil::{encode_hex, serde_hex};

/// A log entry as returned by `eth_getLogs`, receipts and `logs` subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    #[serde(with = "serde_hex::words")]
    pub topics: Vec<[u8; 32]>,
    #[serde(with = "serde_hex::bytes")]
    pub data: Vec<u8>,
    #[serde(default, with = "serde_hex::opt_quantity")]
    pub block_number: Option<u64>,
    pub transaction_hash: TxHash,
    #[serde(with = "serde_hex::quantity")]
    pub log_index: u64,
    /// Set when a reorg drops the log from the canonical chain.
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    pub fn id(&self) -> EventId {
        EventId {
            tx_hash: self.transaction_hash,
            log_index: self.log_index,
        }
    }
}

/// Address and topic filter for `eth_subscribe("logs")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<Address>,
    /// Accepted values for topic 0.
    pub topic0: Vec<[u8; 32]>,
}

impl LogFilter {
    pub fn to_json(&self) -> serde_json::Value {
        let addresses: Vec<String> = self.addresses.iter().map(|a| a.to_string()).collect();
        let topics: Vec<String> = self.topic0.iter().map(|t| encode_hex(t)).collect();
        serde_json::json!({
            "address": addresses,
            "topics": [topics],
        })
    }
}
