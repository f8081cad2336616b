//! Mock exchange: REST ticker price and wallet JSON-RPC on one axum server.

#![allow(dead_code)]

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use punctual_terminal::AppConfig;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

pub const ACCOUNT: &str = "0x00000000000000000000000000000000000000a1";
pub const TX_HASH: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

#[derive(Default)]
struct Inner {
    requests: Vec<Value>,
    position_open: bool,
    chain_id: u64,
}

#[derive(Clone)]
pub struct MockExchange {
    inner: Arc<Mutex<Inner>>,
    pub addr: SocketAddr,
}

fn word(value: u128) -> String {
    format!("{value:064x}")
}

fn position_words(open: bool) -> String {
    if !open {
        return format!("0x{}", "0".repeat(64 * 7));
    }
    let words = [
        word(10_000_000_000_000), // entry 100000
        word(2),
        word(1_700_000_000),
        word(1_000_000_000_000_000_000),
        word(2_000_000_000_000_000_000),
        word(1),
        word(20_000_000_000_000),
    ];
    format!("0x{}", words.concat())
}

async fn ticker_price() -> Json<Value> {
    Json(json!({"symbol": "BTCUSDT", "price": "110000.00000000"}))
}

async fn rpc(State(mock): State<MockExchange>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let mut inner = mock.inner.lock();
    inner.requests.push(request.clone());

    let result = match method.as_str() {
        "eth_requestAccounts" => json!([ACCOUNT]),
        "eth_chainId" => json!(format!("{:#x}", inner.chain_id)),
        "wallet_switchEthereumChain" => {
            let hex = request["params"][0]["chainId"].as_str().unwrap_or("0x0");
            inner.chain_id = u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap();
            Value::Null
        }
        "eth_call" => json!(position_words(inner.position_open)),
        "eth_sendTransaction" => {
            let data = request["params"][0]["data"].as_str().unwrap_or_default();
            // closePosition(uint256) carries a single argument word.
            if data.len() == 2 + 8 + 64 {
                inner.position_open = false;
            } else {
                inner.position_open = true;
            }
            json!(TX_HASH)
        }
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "Method not found"}
            }))
        }
    };
    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

impl MockExchange {
    pub async fn start(position_open: bool, chain_id: u64) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mock = Self {
            inner: Arc::new(Mutex::new(Inner {
                requests: Vec::new(),
                position_open,
                chain_id,
            })),
            addr,
        };

        let app = Router::new()
            .route("/", post(rpc))
            .route("/api/v3/ticker/price", get(ticker_price))
            .with_state(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        mock
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.rest_url = self.url();
        config.contract.rpc_url = self.url();
        config.position.close_recheck_delay_ms = 10;
        config
    }

    pub fn methods(&self) -> Vec<String> {
        self.inner
            .lock()
            .requests
            .iter()
            .map(|r| r["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.inner.lock().requests.clone()
    }

    pub fn position_open(&self) -> bool {
        self.inner.lock().position_open
    }

    pub fn chain_id(&self) -> u64 {
        self.inner.lock().chain_id
    }
}
