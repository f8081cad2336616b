//! ABI for the perp exchange contract.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use punctual_core::RawPosition;

use crate::error::{ContractError, ContractResult};

sol! {
    interface IPerpExchange {
        function getUserPosition(address user) external view returns (
            uint256 entryPrice,
            uint256 leverage,
            uint256 timestamp,
            uint256 margin,
            uint256 size,
            bool isLong,
            uint256 quantity
        );

        function openPosition(uint256 leverage, bool isLong, uint256 price) external payable;

        function closePosition(uint256 price) external;
    }
}

pub use IPerpExchange::{closePositionCall, getUserPositionCall, openPositionCall};

pub fn encode_get_user_position(user: Address) -> Bytes {
    getUserPositionCall { user }.abi_encode().into()
}

/// `price` is the raw 8-decimal price.
pub fn encode_open_position(leverage: u32, is_long: bool, price: u128) -> Bytes {
    openPositionCall {
        leverage: U256::from(leverage),
        isLong: is_long,
        price: U256::from(price),
    }
    .abi_encode()
    .into()
}

pub fn encode_close_position(price: u128) -> Bytes {
    closePositionCall {
        price: U256::from(price),
    }
    .abi_encode()
    .into()
}

/// Decode the `getUserPosition` return tuple.
pub fn decode_user_position(data: &[u8]) -> ContractResult<RawPosition> {
    let ret = getUserPositionCall::abi_decode_returns(data, true)?;

    Ok(RawPosition {
        entry_price: to_u128("entryPrice", ret.entryPrice)?,
        leverage: to_u64("leverage", ret.leverage)?,
        timestamp: to_u64("timestamp", ret.timestamp)?,
        margin: to_u128("margin", ret.margin)?,
        size: to_u128("size", ret.size)?,
        is_long: ret.isLong,
        quantity: to_u128("quantity", ret.quantity)?,
    })
}

fn to_u128(field: &str, value: U256) -> ContractResult<u128> {
    u128::try_from(value).map_err(|_| ContractError::Decode(format!("{field} {value} exceeds u128")))
}

fn to_u64(field: &str, value: U256) -> ContractResult<u64> {
    u64::try_from(value).map_err(|_| ContractError::Decode(format!("{field} {value} exceeds u64")))
}
