//! Typed access to the perp exchange contract.

use alloy::primitives::{address, Address, B256, U256};
use punctual_core::{OpenOrder, Position, Scale, ValidationError};
use tracing::{debug, info};

use crate::abi;
use crate::error::ContractResult;
use crate::wallet::{TransactionRequest, Wallet};

/// Exchange deployment the terminal targets unless configured otherwise.
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("FD5091a4c78849904F939b8d11fB36Bc62e9E2ae");

/// The perp exchange contract, reached through a wallet.
pub struct PerpContract<W> {
    wallet: W,
    address: Address,
}

impl<W: Wallet> PerpContract<W> {
    pub fn new(wallet: W, address: Address) -> Self {
        Self { wallet, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    fn require_account(&self) -> ContractResult<Address> {
        Ok(self
            .wallet
            .account()
            .ok_or(ValidationError::WalletNotConnected)?)
    }

    /// Read `user`'s position. A zero-size position means none is open.
    pub async fn get_user_position(&self, user: Address) -> ContractResult<Position> {
        let data = abi::encode_get_user_position(user);
        let ret = self.wallet.call(self.address, data).await?;
        let raw = abi::decode_user_position(&ret)?;
        debug!(%user, size = raw.size, "Fetched position");
        Ok(Position::from_raw(raw)?)
    }

    /// Open a position at `price`, sending the order margin as value.
    pub async fn open_position(&self, order: &OpenOrder, price: f64) -> ContractResult<B256> {
        order.validate()?;
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::PriceUnavailable.into());
        }
        let from = self.require_account()?;

        let raw_price = Scale::Price.from_f64(price)?;
        let value = Scale::Amount.from_decimal(order.margin)?;
        let tx = TransactionRequest {
            from,
            to: self.address,
            data: abi::encode_open_position(order.leverage, order.direction.is_long(), raw_price),
            value: U256::from(value),
        };

        let hash = self.wallet.send_transaction(tx).await?;
        info!(
            %hash,
            direction = %order.direction,
            leverage = order.leverage,
            margin = %order.margin,
            price,
            "Open position sent"
        );
        Ok(hash)
    }

    /// Close the caller's position at `price`.
    pub async fn close_position(&self, price: f64) -> ContractResult<B256> {
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::PriceUnavailable.into());
        }
        let from = self.require_account()?;

        let raw_price = Scale::Price.from_f64(price)?;
        let tx = TransactionRequest {
            from,
            to: self.address,
            data: abi::encode_close_position(raw_price),
            value: U256::ZERO,
        };

        let hash = self.wallet.send_transaction(tx).await?;
        info!(%hash, price, "Close position sent");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::error::ContractError;
    use alloy::primitives::Bytes;
    use parking_lot::Mutex;
    use punctual_core::Direction;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct RecordingWallet {
        account: Option<Address>,
        call_result: Vec<u8>,
        sent: Mutex<Vec<TransactionRequest>>,
    }

    impl Wallet for RecordingWallet {
        async fn connect(&self) -> ContractResult<Address> {
            self.account
                .ok_or_else(|| ContractError::InvalidResponse("no account".to_string()))
        }

        fn disconnect(&self) {}

        fn account(&self) -> Option<Address> {
            self.account
        }

        async fn chain_id(&self) -> ContractResult<u64> {
            Ok(Chain::Sepolia.id())
        }

        async fn switch_chain(&self, _chain: Chain) -> ContractResult<()> {
            Ok(())
        }

        async fn call(&self, _to: Address, _data: Bytes) -> ContractResult<Bytes> {
            Ok(Bytes::from(self.call_result.clone()))
        }

        async fn send_transaction(&self, tx: TransactionRequest) -> ContractResult<B256> {
            self.sent.lock().push(tx);
            Ok(B256::repeat_byte(0xaa))
        }
    }

    fn connected() -> RecordingWallet {
        RecordingWallet {
            account: Some(Address::repeat_byte(0x42)),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_address() {
        assert_eq!(
            DEFAULT_CONTRACT_ADDRESS.to_string().to_lowercase(),
            "0xfd5091a4c78849904f939b8d11fb36bc62e9e2ae"
        );
    }

    #[tokio::test]
    async fn test_open_position_scales_price_and_margin() {
        let contract = PerpContract::new(connected(), DEFAULT_CONTRACT_ADDRESS);
        let order = OpenOrder::new(dec!(0.25), 5, Direction::Short).unwrap();

        let hash = contract.open_position(&order, 107_123.5).await.unwrap();
        assert_eq!(hash, B256::repeat_byte(0xaa));

        let sent = contract.wallet().sent.lock();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(tx.from, Address::repeat_byte(0x42));
        assert_eq!(tx.to, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(tx.value, U256::from(250_000_000_000_000_000u128));
        assert_eq!(
            tx.data,
            abi::encode_open_position(5, false, 10_712_350_000_000)
        );
    }

    #[tokio::test]
    async fn test_open_requires_wallet() {
        let contract = PerpContract::new(RecordingWallet::default(), DEFAULT_CONTRACT_ADDRESS);
        let order = OpenOrder::new(dec!(1), 2, Direction::Long).unwrap();

        let err = contract.open_position(&order, 100.0).await.unwrap_err();
        assert!(matches!(
            err,
            ContractError::Validation(ValidationError::WalletNotConnected)
        ));
        assert!(contract.wallet().sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_open_requires_price() {
        let contract = PerpContract::new(connected(), DEFAULT_CONTRACT_ADDRESS);
        let order = OpenOrder::new(dec!(1), 2, Direction::Long).unwrap();

        let err = contract.open_position(&order, 0.0).await.unwrap_err();
        assert!(matches!(
            err,
            ContractError::Validation(ValidationError::PriceUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_close_position_sends_no_value() {
        let contract = PerpContract::new(connected(), DEFAULT_CONTRACT_ADDRESS);

        contract.close_position(99_000.0).await.unwrap();

        let sent = contract.wallet().sent.lock();
        assert_eq!(sent[0].value, U256::ZERO);
        assert_eq!(sent[0].data, abi::encode_close_position(9_900_000_000_000));
    }

    #[tokio::test]
    async fn test_get_user_position_decodes_empty_position() {
        let wallet = RecordingWallet {
            call_result: vec![0u8; 7 * 32],
            ..connected()
        };
        let contract = PerpContract::new(wallet, DEFAULT_CONTRACT_ADDRESS);

        let position = contract
            .get_user_position(Address::repeat_byte(0x42))
            .await
            .unwrap();
        assert!(!position.is_open());
        assert_eq!(position.direction, Direction::Short);
    }
}
