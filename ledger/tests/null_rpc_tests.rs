//! Gateway behaviour over a scripted in-process transport.

use landgrab_ledger::abi::{encode_args, Token};
use landgrab_ledger::hexutil::encode_hex;
use landgrab_ledger::{ContractAddresses, GatewayConfig, LedgerError, LedgerGateway, ParcelLedger, PendingTx};
use landgrab_nullables::NullRpc;
use landgrab_types::{Address, GeoCode, RequestId, TxHash};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn contracts() -> ContractAddresses {
    ContractAddresses {
        land_token: Address::new([0x10; 20]),
        land_market: Address::new([0x20; 20]),
        land_swap: Address::new([0x30; 20]),
    }
}

fn gateway(rpc: &Arc<NullRpc>) -> LedgerGateway {
    let config = GatewayConfig {
        read_retries: 2,
        read_retry_delay: Duration::ZERO,
        receipt_poll_interval: Duration::ZERO,
        receipt_max_polls: 5,
        ..GatewayConfig::default()
    };
    LedgerGateway::new(rpc.clone(), contracts(), None, config)
}

fn returns(tokens: &[Token]) -> Value {
    json!(encode_hex(&encode_args(tokens)))
}

#[tokio::test]
async fn claimed_flag_is_read_from_the_token_contract() {
    let rpc = Arc::new(NullRpc::new());
    rpc.respond("eth_call", returns(&[Token::Bool(true)]));
    let code = GeoCode::parse("filled.count.soap").unwrap();

    assert!(gateway(&rpc).is_claimed(&code).await.unwrap());
    let (_, params) = &rpc.calls()[0];
    assert_eq!(params[0]["to"], contracts().land_token.to_string());
}

#[tokio::test]
async fn transport_errors_are_retried_but_rpc_errors_are_not() {
    let rpc = Arc::new(NullRpc::new());
    rpc.enqueue("eth_call", Err(LedgerError::Transport("reset".into())))
        .respond("eth_call", returns(&[Token::Address(Address::ZERO), Token::String(String::new())]));
    let gw = gateway(&rpc);

    assert_eq!(gw.pending_request(RequestId::new([1; 32])).await.unwrap(), None);
    assert_eq!(rpc.count("eth_call"), 2);

    // Nothing scripted for receipts: the -32601 reply is final.
    let err = gw
        .wait_for_receipt(&PendingTx {
            tx_hash: TxHash::new([9; 32]),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rpc { code: -32601, .. }));
    assert_eq!(rpc.count("eth_getTransactionReceipt"), 1);
}

#[tokio::test]
async fn writes_need_a_signer() {
    let rpc = Arc::new(NullRpc::new());
    let code = GeoCode::parse("filled.count.soap").unwrap();
    let err = gateway(&rpc).submit_release(&code).await.unwrap_err();
    assert!(matches!(err, LedgerError::MissingSigner));
    assert!(rpc.calls().is_empty());
}

#[tokio::test]
async fn receipt_polling_waits_for_the_transaction() {
    let rpc = Arc::new(NullRpc::new());
    let tx_hash = TxHash::new([7; 32]);
    rpc.enqueue("eth_getTransactionReceipt", Ok(Value::Null))
        .enqueue("eth_getTransactionReceipt", Ok(Value::Null))
        .respond(
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": tx_hash.to_string(),
                "blockNumber": "0x2",
                "status": "0x1",
                "gasUsed": "0x5208",
                "logs": []
            }),
        );

    let receipt = gateway(&rpc).wait_for_receipt(&PendingTx { tx_hash }).await.unwrap();
    assert!(receipt.succeeded());
    assert_eq!(rpc.count("eth_getTransactionReceipt"), 3);
}
