//! Chains the terminal knows how to talk to.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Mainnet,
    Goerli,
    Sepolia,
}

pub const SUPPORTED_CHAINS: [Chain; 3] = [Chain::Mainnet, Chain::Goerli, Chain::Sepolia];

/// Chain requested when the wallet is on an unsupported one. The exchange
/// contract is deployed on Sepolia.
pub const DEFAULT_SWITCH_TARGET: Chain = Chain::Sepolia;

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Goerli => 5,
            Self::Sepolia => 11_155_111,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mainnet => "Ethereum",
            Self::Goerli => "Goerli",
            Self::Sepolia => "Sepolia",
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        SUPPORTED_CHAINS.into_iter().find(|c| c.id() == id)
    }

    pub fn is_supported(id: u64) -> bool {
        Self::from_id(id).is_some()
    }

    /// `0x`-prefixed hex id as used by `wallet_switchEthereumChain`.
    pub fn hex_id(&self) -> String {
        format!("{:#x}", self.id())
    }
}

impl Default for Chain {
    fn default() -> Self {
        DEFAULT_SWITCH_TARGET
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}
