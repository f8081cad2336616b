//! Periodic position reads for one account.

use punctual_contract::{Address, PerpContract, Wallet};
use punctual_core::Position;
use punctual_feed::ScheduledTask;
use punctual_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct Reader<W> {
    contract: Arc<PerpContract<W>>,
    account: Address,
    position_tx: watch::Sender<Option<Position>>,
}

impl<W: Wallet> Reader<W> {
    /// Read once and publish. `None` means no open position; read errors
    /// keep the last published value.
    async fn refresh(&self) {
        match self.contract.get_user_position(self.account).await {
            Ok(position) if position.is_open() => {
                debug!(account = %self.account, direction = %position.direction, "Position refreshed");
                self.position_tx.send_replace(Some(position));
            }
            Ok(_) => {
                self.position_tx.send_replace(None);
            }
            Err(e) => warn!(account = %self.account, error = %e, "Failed to read position"),
        }
    }
}

/// Keeps the latest position of `account` on a watch channel.
pub struct PositionMonitor<W> {
    reader: Arc<Reader<W>>,
    token: CancellationToken,
    _poller: ScheduledTask,
}

impl<W: Wallet> PositionMonitor<W> {
    /// Start polling every `interval` under a child of `parent`.
    pub fn spawn(
        contract: Arc<PerpContract<W>>,
        account: Address,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let (position_tx, _) = watch::channel(None);
        let reader = Arc::new(Reader {
            contract,
            account,
            position_tx,
        });

        let job_reader = Arc::clone(&reader);
        let poller = ScheduledTask::spawn_periodic("position-monitor", interval, &token, move || {
            let reader = Arc::clone(&job_reader);
            async move { reader.refresh().await }
        });

        Self {
            reader,
            token,
            _poller: poller,
        }
    }

    pub fn account(&self) -> Address {
        self.reader.account
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Position>> {
        self.reader.position_tx.subscribe()
    }

    pub fn current(&self) -> Option<Position> {
        self.reader.position_tx.borrow().clone()
    }

    /// Read immediately, outside the polling schedule.
    pub async fn refresh_now(&self) {
        self.reader.refresh().await;
    }

    /// Read once more after `delay`, e.g. to pick up a close once it is mined.
    pub fn refresh_after(&self, delay: Duration) {
        let reader = Arc::clone(&self.reader);
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => reader.refresh().await,
            }
        });
    }

    /// Publish PnL at `current_price` to metrics and return it.
    pub fn record_pnl(&self, current_price: f64) -> Option<punctual_core::Pnl> {
        let pnl = self.current()?.unrealized_pnl(current_price);
        Metrics::position_pnl(pnl.pnl, pnl.pnl_percent);
        Some(pnl)
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl<W> Drop for PositionMonitor<W> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
