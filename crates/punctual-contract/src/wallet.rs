//! Wallet access.
//!
//! The terminal never holds keys. Accounts, chain switching and signing
//! belong to the wallet; this module only forwards requests to it.

use alloy::primitives::hex;
use alloy::primitives::{Address, Bytes, B256, U256};
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::chain::Chain;
use crate::error::{ContractError, ContractResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A transaction for the wallet to sign and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    /// Native value in wei.
    pub value: U256,
}

impl TransactionRequest {
    fn to_json(&self) -> Value {
        let mut tx = json!({
            "from": self.from.to_string(),
            "to": self.to.to_string(),
            "data": hex::encode_prefixed(&self.data),
        });
        if !self.value.is_zero() {
            tx["value"] = Value::String(format!("0x{:x}", self.value));
        }
        tx
    }
}

/// The wallet surface the terminal depends on.
pub trait Wallet: Send + Sync + 'static {
    /// Request account access; returns the active account.
    fn connect(&self) -> impl Future<Output = ContractResult<Address>> + Send;

    /// Forget the active account locally.
    fn disconnect(&self);

    fn account(&self) -> Option<Address>;

    fn chain_id(&self) -> impl Future<Output = ContractResult<u64>> + Send;

    fn switch_chain(&self, chain: Chain) -> impl Future<Output = ContractResult<()>> + Send;

    /// Read-only call against the latest block.
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = ContractResult<Bytes>> + Send;

    /// Returns the transaction hash once the wallet has broadcast it.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = ContractResult<B256>> + Send;
}

#[derive(Debug, Deserialize)]
struct RpcErrorWire {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponseWire {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorWire>,
}

/// Wallet reached over JSON-RPC (a local signer or wallet bridge).
pub struct JsonRpcWallet {
    client: Client,
    url: String,
    next_id: AtomicU64,
    preset_account: Option<Address>,
    account: RwLock<Option<Address>>,
}

impl JsonRpcWallet {
    pub fn new(url: impl Into<String>) -> ContractResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ContractError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
            preset_account: None,
            account: RwLock::new(None),
        })
    }

    /// Use `account` instead of the first account the wallet reports.
    pub fn with_account(mut self, account: Address) -> Self {
        self.preset_account = Some(account);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> ContractResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "Wallet request");

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ContractError::Transport(format!("HTTP {status}: {text}")));
        }

        let bytes = response.bytes().await?;
        let wire: RpcResponseWire = serde_json::from_slice(&bytes)?;
        if let Some(err) = wire.error {
            return Err(ContractError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        wire.result
            .ok_or_else(|| ContractError::InvalidResponse(format!("{method}: missing result")))
    }

    async fn request_str(&self, method: &str, params: Value) -> ContractResult<String> {
        match self.request(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(ContractError::InvalidResponse(format!(
                "{method}: expected string, got {other}"
            ))),
        }
    }
}

fn parse_address(s: &str) -> ContractResult<Address> {
    s.parse()
        .map_err(|_| ContractError::InvalidAddress(s.to_string()))
}

fn parse_quantity(s: &str) -> ContractResult<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ContractError::InvalidResponse(format!("quantity {s:?}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| ContractError::InvalidResponse(format!("quantity {s:?}")))
}

impl Wallet for JsonRpcWallet {
    async fn connect(&self) -> ContractResult<Address> {
        let accounts = self.request("eth_requestAccounts", json!([])).await?;
        let accounts: Vec<String> = serde_json::from_value(accounts)?;
        let reported = accounts
            .iter()
            .map(|a| parse_address(a))
            .collect::<ContractResult<Vec<_>>>()?;

        let account = match self.preset_account {
            Some(preset) if reported.is_empty() || reported.contains(&preset) => preset,
            Some(preset) => {
                return Err(ContractError::InvalidAddress(format!(
                    "{preset} is not managed by the wallet"
                )))
            }
            None => *reported.first().ok_or_else(|| {
                ContractError::InvalidResponse("wallet returned no accounts".to_string())
            })?,
        };

        *self.account.write() = Some(account);
        info!(%account, "Wallet connected");
        Ok(account)
    }

    fn disconnect(&self) {
        if let Some(account) = self.account.write().take() {
            info!(%account, "Wallet disconnected");
        }
    }

    fn account(&self) -> Option<Address> {
        *self.account.read()
    }

    async fn chain_id(&self) -> ContractResult<u64> {
        let raw = self.request_str("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn switch_chain(&self, chain: Chain) -> ContractResult<()> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain.hex_id() }]),
        )
        .await?;
        info!(%chain, "Switched chain");
        Ok(())
    }

    async fn call(&self, to: Address, data: Bytes) -> ContractResult<Bytes> {
        let raw = self
            .request_str(
                "eth_call",
                json!([{ "to": to.to_string(), "data": hex::encode_prefixed(&data) }, "latest"]),
            )
            .await?;
        let bytes = hex::decode(&raw).map_err(|e| ContractError::Decode(format!("{raw:?}: {e}")))?;
        Ok(bytes.into())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> ContractResult<B256> {
        let raw = self
            .request_str("eth_sendTransaction", json!([tx.to_json()]))
            .await?;
        raw.parse()
            .map_err(|_| ContractError::InvalidResponse(format!("transaction hash {raw:?}")))
    }
}
