//! Ledger gateway for LandGrab.
//!
//! The ledger is an opaque smart-contract platform reached over JSON-RPC.
//! Three contracts matter: the parcel token registry, the claim market and
//! the swap market. This crate provides:
//!
//! - an ABI codec for the handful of call and event shapes those contracts use
//! - [`RpcTransport`], a JSON-RPC seam with an HTTP implementation
//! - [`ParcelLedger`], typed queries and writes, implemented by [`LedgerGateway`]
//! - decoding of raw logs into [`landgrab_types::DomainEvent`]s
//!
//! Writes are always signed by the configured verifier key, simulated with
//! `eth_call` first and only broadcast when the simulation succeeds.

pub mod abi;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod hexutil;
pub mod log;
pub mod parcel_ledger;
pub mod receipt;
pub mod transport;

pub use contracts::{decode_log, encode_log, log_filter, ContractAddresses};
pub use error::LedgerError;
pub use gateway::{GatewayConfig, LedgerGateway};
pub use log::{LogFilter, RawLog};
pub use parcel_ledger::{ClaimSettlement, ParcelLedger, PendingRequest, SwapOrder};
pub use receipt::{PendingTx, TransactionReceipt};
pub use transport::{HttpTransport, RpcTransport};
