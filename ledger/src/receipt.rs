//! Transaction handles and receipts.

use landgrab_types::{ChainEvent, TxHash};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contracts::decode_log;
use crate::hexutil::serde_hex;
use crate::log::RawLog;

/// A broadcast transaction whose outcome is not yet known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub tx_hash: TxHash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default, with = "serde_hex::opt_quantity")]
    pub block_number: Option<u64>,
    /// `0x1` on success, `0x0` on revert.
    #[serde(with = "serde_hex::quantity")]
    pub status: u64,
    #[serde(default, with = "serde_hex::quantity")]
    pub gas_used: u64,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }

    /// Domain events emitted by the transaction. Foreign or malformed logs
    /// are skipped.
    pub fn events(&self) -> Vec<ChainEvent> {
        self.logs
            .iter()
            .filter_map(|log| match decode_log(log) {
                Ok(event) => event,
                Err(e) => {
                    debug!(tx_hash = %self.transaction_hash, error = %e, "skipping undecodable receipt log");
                    None
                }
            })
            .collect()
    }
}
