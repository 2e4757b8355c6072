//! JSON-RPC implementation of [`ParcelLedger`].

use async_trait::async_trait;
use landgrab_crypto::{selector, LegacyTransaction, VerifierKey};
use landgrab_types::{Address, GeoCode, RequestId, TokenId, TxHash};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::abi::{self, Token};
use crate::contracts::{functions, ContractAddresses};
use crate::error::LedgerError;
use crate::hexutil::{decode_hex, decode_quantity, encode_hex};
use crate::parcel_ledger::{ClaimSettlement, ParcelLedger, PendingRequest, SwapOrder};
use crate::receipt::{PendingTx, TransactionReceipt};
use crate::transport::RpcTransport;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Extra attempts for reads and simulations that fail at the transport.
    pub read_retries: u32,
    pub read_retry_delay: Duration,
    pub gas_limit: u64,
    pub receipt_poll_interval: Duration,
    pub receipt_max_polls: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            read_retries: 3,
            read_retry_delay: Duration::from_millis(500),
            gas_limit: 500_000,
            receipt_poll_interval: Duration::from_secs(4),
            receipt_max_polls: 30,
        }
    }
}

/// Contract bindings over one RPC provider, signing writes with the
/// verifier key.
pub struct LedgerGateway {
    transport: Arc<dyn RpcTransport>,
    contracts: ContractAddresses,
    signer: Option<VerifierKey>,
    config: GatewayConfig,
    chain_id: OnceCell<u64>,
    /// Held from nonce lookup to broadcast so writes keep their order.
    write_lock: Mutex<()>,
}

impl LedgerGateway {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        contracts: ContractAddresses,
        signer: Option<VerifierKey>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            transport,
            contracts,
            signer,
            config,
            chain_id: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn verifier(&self) -> Option<Address> {
        self.signer.as_ref().map(VerifierKey::address)
    }

    /// A read, retried on transport failure only.
    async fn read(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.transport.request(method, params.clone()).await {
                Err(e) if e.is_transport() && attempt <= self.config.read_retries => {
                    warn!(method, attempt, error = %e, "ledger read failed, retrying");
                    tokio::time::sleep(self.config.read_retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn call(&self, to: Address, data: Vec<u8>, from: Option<Address>) -> Result<Vec<u8>, LedgerError> {
        let mut tx = json!({ "to": to.to_string(), "data": encode_hex(&data) });
        if let Some(from) = from {
            tx["from"] = json!(from.to_string());
        }
        let result = self.read("eth_call", json!([tx, "latest"])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("eth_call returned {result}")))?;
        decode_hex(raw)
    }

    async fn view(&self, to: Address, signature: &str, args: &[Token]) -> Result<Vec<u8>, LedgerError> {
        self.call(to, abi::encode_call(selector(signature), args), None).await
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, LedgerError> {
        let result = self.read(method, params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("{method} returned {result}")))?;
        decode_quantity(raw)
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.quantity("eth_chainId", json!([])).await?;
                u64::try_from(id).map_err(|_| LedgerError::Decode(format!("chain id {id} too large")))
            })
            .await
            .copied()
    }

    /// Simulate, then sign and broadcast. Nothing after the broadcast is retried.
    async fn write(&self, to: Address, data: Vec<u8>, label: &'static str) -> Result<PendingTx, LedgerError> {
        let signer = self.signer.as_ref().ok_or(LedgerError::MissingSigner)?;
        let from = signer.address();

        self.call(to, data.clone(), Some(from)).await.map_err(|e| {
            if let LedgerError::Revert { reason } = &e {
                warn!(call = label, %reason, "simulation reverted, not sending");
            }
            e
        })?;

        let _guard = self.write_lock.lock().await;
        let chain_id = self.chain_id().await?;
        let nonce = self
            .quantity("eth_getTransactionCount", json!([from.to_string(), "pending"]))
            .await?;
        let nonce = u64::try_from(nonce).map_err(|_| LedgerError::Decode("nonce too large".into()))?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.config.gas_limit,
            to,
            value: 0,
            data,
            chain_id,
        };
        let (raw, local_hash) = tx
            .sign(signer)
            .map_err(|e| LedgerError::NotConfigured(format!("verifier key cannot sign: {e}")))?;

        let result = self
            .transport
            .request("eth_sendRawTransaction", json!([encode_hex(&raw)]))
            .await?;
        let tx_hash = match result.as_str().map(TxHash::parse) {
            Some(Ok(hash)) => hash,
            _ => local_hash,
        };
        info!(call = label, %tx_hash, nonce, "transaction sent");
        Ok(PendingTx { tx_hash })
    }
}

#[async_trait]
impl ParcelLedger for LedgerGateway {
    async fn is_claimed(&self, code: &GeoCode) -> Result<bool, LedgerError> {
        let out = self
            .view(self.contracts.land_token, functions::IS_LAND_CLAIMED, &[Token::String(code.to_string())])
            .await?;
        abi::decode_bool(&out, 0)
    }

    async fn token_id_for(&self, code: &GeoCode) -> Result<TokenId, LedgerError> {
        let out = self
            .view(self.contracts.land_token, functions::GET_TOKEN_ID, &[Token::String(code.to_string())])
            .await?;
        abi::decode_token_id(&out, 0)
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address, LedgerError> {
        let out = self
            .view(self.contracts.land_token, functions::OWNER_OF, &[Token::Uint(token_id.value())])
            .await?;
        abi::decode_address(&out, 0)
    }

    async fn get_code(&self, token_id: TokenId) -> Result<String, LedgerError> {
        let out = self
            .view(self.contracts.land_token, functions::GET_WHAT3WORDS, &[Token::Uint(token_id.value())])
            .await?;
        abi::decode_string(&out, 0)
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<String, LedgerError> {
        let out = self
            .view(self.contracts.land_token, functions::TOKEN_URI, &[Token::Uint(token_id.value())])
            .await?;
        abi::decode_string(&out, 0)
    }

    async fn balance_of(&self, owner: Address) -> Result<u64, LedgerError> {
        let out = self
            .view(self.contracts.land_token, functions::BALANCE_OF, &[Token::Address(owner)])
            .await?;
        abi::decode_u64(&out, 0)
    }

    async fn token_of_owner_by_index(&self, owner: Address, index: u64) -> Result<TokenId, LedgerError> {
        let out = self
            .view(
                self.contracts.land_token,
                functions::TOKEN_OF_OWNER_BY_INDEX,
                &[Token::Address(owner), Token::Uint(u128::from(index))],
            )
            .await?;
        abi::decode_token_id(&out, 0)
    }

    async fn pending_request(&self, request_id: RequestId) -> Result<Option<PendingRequest>, LedgerError> {
        let out = self
            .view(
                self.contracts.land_market,
                functions::VERIFICATION_REQUESTS,
                &[Token::FixedBytes(*request_id.as_bytes())],
            )
            .await?;
        let user = abi::decode_address(&out, 0)?;
        if user.is_zero() {
            return Ok(None);
        }
        let code = abi::decode_string(&out, 1)?;
        Ok(Some(PendingRequest { user, code }))
    }

    async fn submit_claim_settlement(&self, claim: &ClaimSettlement) -> Result<PendingTx, LedgerError> {
        let data = abi::encode_call(
            selector(functions::CLAIM_AFTER_VERIFICATION),
            &[
                Token::FixedBytes(*claim.request_id.as_bytes()),
                Token::String(claim.code.to_string()),
                Token::String(claim.coordinates.lat.to_string()),
                Token::String(claim.coordinates.lng.to_string()),
                Token::Address(claim.user),
            ],
        );
        debug!(request_id = %claim.request_id, code = %claim.code, user = %claim.user, "settling claim");
        self.write(self.contracts.land_market, data, "claimLandAfterVerification")
            .await
    }

    async fn submit_release(&self, code: &GeoCode) -> Result<PendingTx, LedgerError> {
        let data = abi::encode_call(selector(functions::RELEASE_LAND), &[Token::String(code.to_string())]);
        self.write(self.contracts.land_market, data, "releaseLand").await
    }

    async fn submit_swap_proposal(&self, order: &SwapOrder) -> Result<PendingTx, LedgerError> {
        let data = abi::encode_call(
            selector(functions::PROPOSE_SWAP),
            &[
                Token::String(order.proposer_code.to_string()),
                Token::Address(order.receiver),
                Token::String(order.receiver_code.to_string()),
            ],
        );
        self.write(self.contracts.land_swap, data, "proposeSwap").await
    }

    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<TransactionReceipt, LedgerError> {
        for poll in 1..=self.config.receipt_max_polls {
            let result = self
                .read("eth_getTransactionReceipt", json!([tx.tx_hash.to_string()]))
                .await?;
            if !result.is_null() {
                let receipt: TransactionReceipt = serde_json::from_value(result)
                    .map_err(|e| LedgerError::Decode(format!("invalid receipt: {e}")))?;
                if !receipt.succeeded() {
                    return Err(LedgerError::Revert {
                        reason: format!("transaction {} reverted on chain", tx.tx_hash),
                    });
                }
                debug!(tx_hash = %tx.tx_hash, poll, gas_used = receipt.gas_used, "transaction mined");
                return Ok(receipt);
            }
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
        Err(LedgerError::ReceiptTimeout {
            tx_hash: tx.tx_hash,
            polls: self.config.receipt_max_polls,
        })
    }
}
