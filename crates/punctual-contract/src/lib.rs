//! Perp exchange contract access for the punctual terminal.
//!
//! - `abi`: the three contract functions the terminal uses, via `sol!`
//! - `Wallet`: the wallet surface (accounts, chain, calls, transactions)
//!   with `JsonRpcWallet` speaking EIP-1193 style JSON-RPC over HTTP
//! - `PerpContract`: typed reads and writes with fixed-point scaling
//! - `TransactionError`: user-facing classification of wallet failures

pub mod abi;
pub mod chain;
pub mod client;
pub mod error;
pub mod wallet;

pub use alloy::primitives::{Address, Bytes, B256, U256};
pub use chain::{Chain, DEFAULT_SWITCH_TARGET, SUPPORTED_CHAINS};
pub use client::{PerpContract, DEFAULT_CONTRACT_ADDRESS};
pub use error::{ContractError, ContractResult, TransactionError};
pub use wallet::{JsonRpcWallet, TransactionRequest, Wallet};
