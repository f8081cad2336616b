//! JSON-RPC wallet and contract client against a local axum server.

use alloy::primitives::{Address, B256, U256};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use punctual_contract::{
    Chain, ContractError, JsonRpcWallet, PerpContract, TransactionError, Wallet,
    DEFAULT_CONTRACT_ADDRESS,
};
use punctual_core::{Direction, OpenOrder};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

const ACCOUNT: &str = "0x00000000000000000000000000000000000000a1";
const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

#[derive(Clone, Default)]
struct MockWallet {
    requests: Arc<Mutex<Vec<Value>>>,
    reject_transactions: bool,
}

fn word(value: u128) -> String {
    format!("{value:064x}")
}

fn position_return() -> String {
    let words = [
        word(10_000_000_000_000), // entry 100000.0
        word(5),
        word(1_700_000_000),
        word(1_000_000_000_000_000_000),
        word(5_000_000_000_000_000_000),
        word(1),
        word(50_000_000_000_000),
    ];
    format!("0x{}", words.concat())
}

async fn rpc(State(mock): State<MockWallet>, Json(request): Json<Value>) -> Json<Value> {
    mock.requests.lock().push(request.clone());
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();

    let outcome = match method {
        "eth_requestAccounts" => Ok(json!([ACCOUNT])),
        "eth_chainId" => Ok(json!("0x5")),
        "wallet_switchEthereumChain" => Ok(Value::Null),
        "eth_call" => Ok(json!(position_return())),
        "eth_sendTransaction" if mock.reject_transactions => {
            Err((4001, "User rejected the request."))
        }
        "eth_sendTransaction" => Ok(json!(TX_HASH)),
        _ => Err((-32601, "Method not found")),
    };

    Json(match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        }
    })
}

async fn start_server(mock: MockWallet) -> SocketAddr {
    let app = Router::new().route("/", post(rpc)).with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn methods(mock: &MockWallet) -> Vec<String> {
    mock.requests
        .lock()
        .iter()
        .map(|r| r["method"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_connect_and_chain() {
    let mock = MockWallet::default();
    let addr = start_server(mock.clone()).await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}")).unwrap();

    let account = assert_ok!(wallet.connect().await);
    assert_eq!(account, ACCOUNT.parse::<Address>().unwrap());
    assert_eq!(wallet.account(), Some(account));

    let chain_id = wallet.chain_id().await.unwrap();
    assert_eq!(chain_id, 5);
    assert!(Chain::is_supported(chain_id));

    wallet.switch_chain(Chain::Sepolia).await.unwrap();
    let requests = mock.requests.lock().clone();
    assert_eq!(requests[2]["params"][0]["chainId"], "0xaa36a7");

    wallet.disconnect();
    assert!(wallet.account().is_none());
    assert_eq!(
        methods(&mock),
        ["eth_requestAccounts", "eth_chainId", "wallet_switchEthereumChain"]
    );
}

#[tokio::test]
async fn test_read_position() {
    let mock = MockWallet::default();
    let addr = start_server(mock.clone()).await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}")).unwrap();
    let contract = PerpContract::new(wallet, DEFAULT_CONTRACT_ADDRESS);

    let user: Address = ACCOUNT.parse().unwrap();
    let position = contract.get_user_position(user).await.unwrap();

    assert!(position.is_open());
    assert_eq!(position.entry_price, dec!(100000));
    assert_eq!(position.leverage, 5);
    assert_eq!(position.margin, dec!(1));
    assert_eq!(position.size, dec!(5));
    assert_eq!(position.direction, Direction::Long);

    let pnl = position.unrealized_pnl(110_000.0);
    assert!((pnl.pnl - 0.5).abs() < 1e-9);
    assert!((pnl.pnl_percent - 50.0).abs() < 1e-9);

    let requests = mock.requests.lock().clone();
    assert_eq!(requests[0]["params"][1], "latest");
    let data = requests[0]["params"][0]["data"].as_str().unwrap();
    assert!(data.starts_with("0x"));
    assert!(data.ends_with(&ACCOUNT[2..]));
}

#[tokio::test]
async fn test_open_position_sends_margin_as_value() {
    let mock = MockWallet::default();
    let addr = start_server(mock.clone()).await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}")).unwrap();
    wallet.connect().await.unwrap();
    let contract = PerpContract::new(wallet, DEFAULT_CONTRACT_ADDRESS);

    let order = OpenOrder::new(dec!(1), 3, Direction::Long).unwrap();
    let hash = contract.open_position(&order, 100_000.0).await.unwrap();
    assert_eq!(hash, TX_HASH.parse::<B256>().unwrap());

    let requests = mock.requests.lock().clone();
    let tx = &requests[1]["params"][0];
    assert_eq!(requests[1]["method"], "eth_sendTransaction");
    assert_eq!(tx["value"], format!("0x{:x}", U256::from(10u128.pow(18))));
    assert!(tx["to"]
        .as_str()
        .unwrap()
        .eq_ignore_ascii_case("0xFD5091a4c78849904F939b8d11fB36Bc62e9E2ae"));
}

#[tokio::test]
async fn test_rejected_transaction_is_classified() {
    let mock = MockWallet {
        reject_transactions: true,
        ..Default::default()
    };
    let addr = start_server(mock.clone()).await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}")).unwrap();
    wallet.connect().await.unwrap();
    let contract = PerpContract::new(wallet, DEFAULT_CONTRACT_ADDRESS);

    let err = assert_err!(contract.close_position(100_000.0).await);
    assert!(matches!(err, ContractError::Rpc { code: 4001, .. }));
    let classified = TransactionError::classify(&err);
    assert_eq!(classified, TransactionError::RejectedByUser);
    assert_eq!(classified.to_string(), "Transaction rejected by user");
}

#[tokio::test]
async fn test_transport_and_account_failures() {
    let mock = MockWallet::default();
    let addr = start_server(mock.clone()).await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}")).unwrap();

    let offline = JsonRpcWallet::new("http://127.0.0.1:1").unwrap();
    assert!(matches!(
        offline.chain_id().await,
        Err(ContractError::Transport(_))
    ));

    assert!(wallet.account().is_none());
    let contract = PerpContract::new(wallet, DEFAULT_CONTRACT_ADDRESS);
    let err = contract.close_position(1.0).await.unwrap_err();
    assert_eq!(
        TransactionError::classify(&err),
        TransactionError::Failed("Wallet not connected".to_string())
    );
}
