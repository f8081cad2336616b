//! Application orchestration.
//!
//! `watch` runs the live feed until Ctrl-C; the other commands are one-shot
//! wallet/contract interactions.

use crate::config::{AppConfig, ChartConfig};
use crate::display;
use crate::error::AppResult;
use crate::monitor::PositionMonitor;
use crate::trade::{Notification, TradeDesk};
use chrono::Utc;
use punctual_chart::{draw, render, SvgCanvas};
use punctual_contract::{Address, Chain, JsonRpcWallet, PerpContract, Wallet};
use punctual_core::{Direction, OpenOrder, PricePoint};
use punctual_feed::{FeedSnapshot, PriceFeed, RestPriceClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Render `points` as an SVG document.
pub fn render_svg(points: &[PricePoint], chart: &ChartConfig) -> AppResult<String> {
    let viewport = punctual_chart::Viewport::new(chart.width, chart.height)?;
    let commands = render(points, viewport);
    let mut canvas = SvgCanvas::new(viewport).with_background(chart.style.background.clone());
    draw(&commands, &chart.style, &mut canvas);
    Ok(canvas.finish())
}

/// Wallet chain and whether the terminal supports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStatus {
    pub chain_id: u64,
    pub chain: Option<Chain>,
    /// Set when a switch was requested.
    pub switched_to: Option<Chain>,
}

impl ChainStatus {
    pub fn is_supported(&self) -> bool {
        self.chain.is_some()
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn wallet(&self) -> AppResult<JsonRpcWallet> {
        let wallet = JsonRpcWallet::new(&self.config.contract.rpc_url)?;
        Ok(match self.config.account()? {
            Some(account) => wallet.with_account(account),
            None => wallet,
        })
    }

    fn contract(&self) -> AppResult<Arc<PerpContract<JsonRpcWallet>>> {
        Ok(Arc::new(PerpContract::new(
            self.wallet()?,
            self.config.contract_address()?,
        )))
    }

    /// Connect the wallet and warn when it is on an unsupported chain.
    async fn connect<W: Wallet>(&self, contract: &PerpContract<W>) -> AppResult<Address> {
        let account = contract.wallet().connect().await?;
        match contract.wallet().chain_id().await {
            Ok(id) if Chain::is_supported(id) => debug!(chain_id = id, "Wallet chain supported"),
            Ok(id) => warn!(
                chain_id = id,
                target = %self.config.contract.chain,
                "Unsupported chain, run `chain --switch`"
            ),
            Err(e) => warn!(error = %e, "Failed to read wallet chain"),
        }
        Ok(account)
    }

    /// Current spot price from a REST snapshot, `None` when unavailable.
    async fn current_price(&self) -> Option<f64> {
        let client = match RestPriceClient::new(&self.config.rest_url) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to create price client");
                return None;
            }
        };
        match client.fetch_snapshot(&self.config.symbol).await {
            Ok(snapshot) => Some(snapshot.price),
            Err(e) => {
                warn!(error = %e, "Price snapshot failed");
                None
            }
        }
    }

    /// Run the live feed until Ctrl-C.
    pub async fn run_watch(&self, svg: Option<PathBuf>, address: Option<Address>) -> AppResult<()> {
        let token = CancellationToken::new();
        let client = RestPriceClient::new(&self.config.rest_url)?;
        let handle = PriceFeed::new(self.config.feed_config(), client)
            .with_stream(self.config.connection_config())
            .spawn(&token);
        let mut snapshots = handle.subscribe();

        let monitor = match address {
            Some(account) => Some(PositionMonitor::spawn(
                self.contract()?,
                account,
                self.config.position.refresh_interval(),
                &token,
            )),
            None => None,
        };

        let svg_period = Duration::from_millis(self.config.chart.svg_interval_ms.max(100));
        let mut svg_interval = tokio::time::interval(svg_period);
        svg_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            symbol = %self.config.symbol,
            timeframe = %self.config.timeframe,
            svg = ?svg,
            "Watching price feed (Ctrl-C to stop)"
        );

        loop {
            tokio::select! {
                biased;

                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    info!("Shutdown requested");
                    break;
                }

                changed = snapshots.changed() => {
                    if changed.is_err() {
                        warn!("Feed stopped");
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.report(&snapshot, monitor.as_ref());
                }

                _ = svg_interval.tick(), if svg.is_some() => {
                    if let Some(path) = &svg {
                        let points = snapshots.borrow().points.clone();
                        self.write_svg(path, &points).await;
                    }
                }
            }
        }

        token.cancel();
        handle.shutdown().await;
        Ok(())
    }

    fn report<W: Wallet>(&self, snapshot: &FeedSnapshot, monitor: Option<&PositionMonitor<W>>) {
        let Some(latest) = snapshot.latest() else {
            return;
        };
        info!(
            spot = %display::format_price(latest.spot_price),
            perp = %display::format_price(latest.perp_price),
            change = %display::format_change(&snapshot.change),
            source = ?snapshot.last_source,
            connection = %snapshot.connection,
            points = snapshot.points.len(),
            "Price"
        );

        if let Some(pnl) = monitor.and_then(|m| m.record_pnl(latest.spot_price)) {
            info!(pnl = %display::format_pnl(&pnl), "Position");
        }
    }

    async fn write_svg(&self, path: &Path, points: &[PricePoint]) {
        let result = match render_svg(points, &self.config.chart) {
            Ok(svg) => tokio::fs::write(path, svg).await.map_err(Into::into),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!(path = %path.display(), points = points.len(), "Chart written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write chart"),
        }
    }

    /// Position summary for `address`, or the wallet's account.
    pub async fn position_report(&self, address: Option<Address>) -> AppResult<String> {
        let contract = self.contract()?;
        let account = match address {
            Some(account) => account,
            None => self.connect(&*contract).await?,
        };

        let position = contract.get_user_position(account).await?;
        let price = self.current_price().await;
        Ok(format!(
            "{account}\n{}",
            display::position_summary(&position, price, Utc::now())
        ))
    }

    /// Size and liquidation estimate for an order at the current price.
    pub async fn preview(
        &self,
        margin: &str,
        leverage: u32,
        direction: Direction,
    ) -> AppResult<String> {
        let order = OpenOrder::parse(margin, leverage, direction)?;
        let price = self.current_price().await;
        let preview = display::order_preview(&order, price);
        info!(
            size = %order.position_size(),
            price = ?price,
            "Order preview"
        );
        Ok(preview)
    }

    pub async fn open(
        &self,
        margin: &str,
        leverage: u32,
        direction: Direction,
    ) -> AppResult<Notification> {
        let contract = self.contract()?;
        if let Err(e) = self.connect(&*contract).await {
            warn!(error = %e, "Wallet connection failed");
        }
        let price = self.current_price().await;

        let desk = TradeDesk::new(contract);
        Ok(desk.open(margin, leverage, direction, price).await)
    }

    /// Close the wallet account's position, then re-read it once the
    /// close has had time to land.
    pub async fn close(&self) -> AppResult<(Notification, Option<String>)> {
        let contract = self.contract()?;
        let account = match self.connect(&*contract).await {
            Ok(account) => Some(account),
            Err(e) => {
                warn!(error = %e, "Wallet connection failed");
                None
            }
        };

        let position = match account {
            Some(account) => Some(contract.get_user_position(account).await?),
            None => None,
        };
        let price = self.current_price().await;

        let desk = TradeDesk::new(Arc::clone(&contract));
        let notification = desk.close(position.as_ref(), price).await;

        let follow_up = match account {
            Some(account) if notification.is_success() => {
                tokio::time::sleep(self.config.position.close_recheck_delay()).await;
                let after = contract.get_user_position(account).await?;
                Some(display::position_summary(&after, price, Utc::now()))
            }
            _ => None,
        };
        Ok((notification, follow_up))
    }

    /// Report the wallet chain; with `switch`, request the configured chain
    /// when the wallet is elsewhere.
    pub async fn chain(&self, switch: bool) -> AppResult<ChainStatus> {
        let wallet = self.wallet()?;
        let chain_id = wallet.chain_id().await?;
        let chain = Chain::from_id(chain_id);
        let target = self.config.contract.chain;

        let switched_to = if switch && chain != Some(target) {
            wallet.switch_chain(target).await?;
            Some(target)
        } else {
            None
        };

        Ok(ChainStatus {
            chain_id,
            chain,
            switched_to,
        })
    }
}
