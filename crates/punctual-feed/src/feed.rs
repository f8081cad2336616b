//! Single-owner price feed loop.
//!
//! Producers (stream forwarder, snapshot poller) only send `PriceUpdate`s.
//! One task owns the `FeedState`, applies updates in arrival order, runs
//! the fallback timer and publishes a `FeedSnapshot` after every change.

use crate::error::FeedResult;
use crate::perp::PerpPricer;
use crate::rest::PriceSnapshot;
use crate::scheduler::ScheduledTask;
use crate::series::{PriceSeries, DEFAULT_SERIES_CAPACITY};
use crate::source::SnapshotSource;
use crate::synthetic::{FallbackConfig, FallbackGate, FallbackMode, SyntheticGenerator};
use crate::timeframe::Timeframe;
use punctual_core::{now_ms, PriceChange, PricePoint};
use punctual_telemetry::Metrics;
use punctual_ws::{ConnectionConfig, ConnectionManager, ConnectionState, StreamTick};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where a price update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickSource {
    Stream,
    Snapshot,
    Synthetic,
}

impl TickSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Snapshot => "snapshot",
            Self::Synthetic => "synthetic",
        }
    }

    /// Market data, as opposed to generated.
    pub fn is_real(&self) -> bool {
        !matches!(self, Self::Synthetic)
    }
}

impl fmt::Display for TickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source-tagged price observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceUpdate {
    pub source: TickSource,
    pub spot: f64,
    /// Filled in by the feed loop from the perp model when absent.
    pub perp: Option<f64>,
    pub volume: f64,
    pub timestamp_ms: i64,
}

impl PriceUpdate {
    pub fn stream(tick: &StreamTick) -> Self {
        Self {
            source: TickSource::Stream,
            spot: tick.price,
            perp: None,
            volume: tick.volume,
            timestamp_ms: tick.event_time_ms,
        }
    }

    pub fn snapshot(snapshot: &PriceSnapshot) -> Self {
        Self {
            source: TickSource::Snapshot,
            spot: snapshot.price,
            perp: None,
            volume: 0.0,
            timestamp_ms: snapshot.fetched_at_ms,
        }
    }

    pub fn synthetic(point: &PricePoint) -> Self {
        Self {
            source: TickSource::Synthetic,
            spot: point.spot_price,
            perp: Some(point.perp_price),
            volume: point.volume,
            timestamp_ms: point.timestamp,
        }
    }

    fn to_point(self) -> PricePoint {
        PricePoint::new(
            self.timestamp_ms,
            self.spot,
            self.perp.unwrap_or(self.spot),
            self.volume,
        )
    }
}

/// Result of applying one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Accepted,
    /// Spot price identical to the newest point.
    Duplicate,
    /// Non-finite or non-positive price.
    Rejected,
}

/// Accepted updates per source plus skipped duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub stream: u64,
    pub snapshot: u64,
    pub synthetic: u64,
    pub duplicates: u64,
}

impl SourceCounts {
    fn record(&mut self, source: TickSource) {
        match source {
            TickSource::Stream => self.stream += 1,
            TickSource::Snapshot => self.snapshot += 1,
            TickSource::Synthetic => self.synthetic += 1,
        }
    }
}

/// Everything the feed loop owns.
#[derive(Debug, Clone)]
pub struct FeedState {
    series: PriceSeries,
    change: PriceChange,
    last_source: Option<TickSource>,
    last_real_tick: Option<Instant>,
    counts: SourceCounts,
}

impl FeedState {
    pub fn new(capacity: usize) -> Self {
        Self {
            series: PriceSeries::new(capacity),
            change: PriceChange::default(),
            last_source: None,
            last_real_tick: None,
            counts: SourceCounts::default(),
        }
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn change(&self) -> PriceChange {
        self.change
    }

    /// Latest `(spot, perp)`.
    pub fn last_prices(&self) -> Option<(f64, f64)> {
        self.series
            .latest()
            .map(|p| (p.spot_price, p.perp_price))
    }

    /// When market data (stream or snapshot) last arrived, duplicates included.
    pub fn last_real_tick(&self) -> Option<Instant> {
        self.last_real_tick
    }

    pub fn counts(&self) -> SourceCounts {
        self.counts
    }

    /// Apply `update`, received at `now`, and return the new state.
    pub fn apply(mut self, update: PriceUpdate, now: Instant) -> (Self, ApplyOutcome) {
        if update.source.is_real() {
            self.last_real_tick = Some(now);
        }

        let perp = update.perp.unwrap_or(update.spot);
        if !(update.spot.is_finite() && update.spot > 0.0 && perp.is_finite() && perp > 0.0) {
            return (self, ApplyOutcome::Rejected);
        }

        if !self.series.push(update.to_point()) {
            self.counts.duplicates += 1;
            return (self, ApplyOutcome::Duplicate);
        }

        self.change = self.series.price_change();
        self.last_source = Some(update.source);
        self.counts.record(update.source);
        (self, ApplyOutcome::Accepted)
    }

    /// Replace the series with kline history.
    pub fn bootstrap(mut self, history: Vec<PricePoint>) -> Self {
        self.series.bootstrap(history);
        self.change = self.series.price_change();
        self
    }

    pub fn snapshot(&self, connection: ConnectionState) -> FeedSnapshot {
        FeedSnapshot {
            points: self.series.to_vec(),
            change: self.change,
            last_source: self.last_source,
            connection,
            counts: self.counts,
            published_at_ms: now_ms(),
        }
    }
}

/// What consumers see after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub points: Vec<PricePoint>,
    pub change: PriceChange,
    pub last_source: Option<TickSource>,
    pub connection: ConnectionState,
    pub counts: SourceCounts,
    pub published_at_ms: i64,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            change: PriceChange::default(),
            last_source: None,
            connection: ConnectionState::Disconnected,
            counts: SourceCounts::default(),
            published_at_ms: 0,
        }
    }
}

impl FeedSnapshot {
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn spot_price(&self) -> Option<f64> {
        self.latest().map(|p| p.spot_price)
    }

    pub fn perp_price(&self) -> Option<f64> {
        self.latest().map(|p| p.perp_price)
    }
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_series_capacity() -> usize {
    DEFAULT_SERIES_CAPACITY
}

fn default_snapshot_interval_ms() -> u64 {
    5_000
}

fn default_bootstrap_history() -> bool {
    true
}

fn default_update_buffer() -> usize {
    256
}

/// Feed loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default = "default_series_capacity")]
    pub series_capacity: usize,
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    /// Seed the series from kline history on start.
    #[serde(default = "default_bootstrap_history")]
    pub bootstrap_history: bool,
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub perp: PerpPricer,
    /// Fixed RNG seed for synthetic and simulated prices.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl FeedConfig {
    pub fn validate(&self) -> FeedResult<()> {
        self.fallback.validate()?;
        self.perp.validate()
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            timeframe: Timeframe::default(),
            series_capacity: default_series_capacity(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            bootstrap_history: default_bootstrap_history(),
            update_buffer: default_update_buffer(),
            fallback: FallbackConfig::default(),
            perp: PerpPricer::default(),
            rng_seed: None,
        }
    }
}

/// Builder for the running feed.
pub struct PriceFeed<S: SnapshotSource> {
    config: FeedConfig,
    source: Arc<S>,
    stream: Option<ConnectionConfig>,
}

impl<S: SnapshotSource> PriceFeed<S> {
    pub fn new(config: FeedConfig, source: S) -> Self {
        Self {
            config,
            source: Arc::new(source),
            stream: None,
        }
    }

    /// Also consume the ticker stream described by `stream`.
    pub fn with_stream(mut self, stream: ConnectionConfig) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Start every task under a child of `parent`.
    pub fn spawn(self, parent: &CancellationToken) -> FeedHandle {
        let token = parent.child_token();
        let (update_tx, update_rx) = mpsc::channel(self.config.update_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(FeedSnapshot::default());
        let mut tasks = Vec::new();

        let (manager, state_rx) = match self.stream {
            Some(stream_config) => {
                let (tick_tx, tick_rx) = mpsc::channel(self.config.update_buffer.max(1));
                let manager = Arc::new(ConnectionManager::with_token(
                    stream_config,
                    tick_tx,
                    token.child_token(),
                ));
                let state_rx = manager.subscribe_state();

                let runner = manager.clone();
                tasks.push(tokio::spawn(async move {
                    if let Err(e) = runner.connect().await {
                        error!(error = %e, "Ticker stream stopped");
                    }
                }));
                tasks.push(tokio::spawn(forward_ticks(
                    tick_rx,
                    update_tx.clone(),
                    token.clone(),
                )));
                (Some(manager), Some(state_rx))
            }
            None => (None, None),
        };

        let poller = spawn_snapshot_poller(&self.config, self.source.clone(), update_tx, &token);

        let owner = FeedLoop {
            state: FeedState::new(self.config.series_capacity),
            config: self.config,
            source: self.source,
            update_rx,
            state_rx,
            snapshot_tx,
            token: token.clone(),
        };
        tasks.push(tokio::spawn(owner.run(poller)));

        FeedHandle {
            snapshot_rx,
            token,
            manager,
            tasks,
        }
    }
}

fn spawn_snapshot_poller<S: SnapshotSource>(
    config: &FeedConfig,
    source: Arc<S>,
    update_tx: mpsc::Sender<PriceUpdate>,
    token: &CancellationToken,
) -> ScheduledTask {
    let symbol = config.symbol.clone();
    ScheduledTask::spawn_periodic(
        "snapshot_poll",
        Duration::from_millis(config.snapshot_interval_ms.max(1)),
        token,
        move || {
            let source = source.clone();
            let update_tx = update_tx.clone();
            let symbol = symbol.clone();
            async move {
                match source.fetch_snapshot(&symbol).await {
                    Ok(snapshot) => {
                        if update_tx.send(PriceUpdate::snapshot(&snapshot)).await.is_err() {
                            debug!("Feed loop gone, dropping snapshot");
                        }
                    }
                    Err(e) => {
                        Metrics::snapshot_poll_failed();
                        warn!(error = %e, %symbol, "Snapshot poll failed");
                    }
                }
            }
        },
    )
}

async fn forward_ticks(
    mut tick_rx: mpsc::Receiver<StreamTick>,
    update_tx: mpsc::Sender<PriceUpdate>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            tick = tick_rx.recv() => {
                let Some(tick) = tick else { break };
                if update_tx.send(PriceUpdate::stream(&tick)).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Tick forwarder stopped");
}

struct FeedLoop<S: SnapshotSource> {
    state: FeedState,
    config: FeedConfig,
    source: Arc<S>,
    update_rx: mpsc::Receiver<PriceUpdate>,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    snapshot_tx: watch::Sender<FeedSnapshot>,
    token: CancellationToken,
}

impl<S: SnapshotSource> FeedLoop<S> {
    async fn run(mut self, _poller: ScheduledTask) {
        let mut rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut generator = match self.config.rng_seed {
            Some(seed) => SyntheticGenerator::seeded(&self.config.fallback, seed.wrapping_add(1)),
            None => SyntheticGenerator::new(&self.config.fallback),
        };
        let gate = FallbackGate::from_config(&self.config.fallback);

        if self.config.bootstrap_history {
            self.bootstrap(&mut rng).await;
        }

        let fallback_period = Duration::from_millis(self.config.fallback.interval_ms.max(1));
        let mut fallback = tokio::time::interval_at(Instant::now() + fallback_period, fallback_period);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let fallback_enabled = gate.mode() != FallbackMode::Disabled;

        let mut connection = ConnectionState::Disconnected;
        info!(
            symbol = %self.config.symbol,
            fallback = ?gate.mode(),
            simulated_perp = self.config.perp.is_simulated(),
            "Price feed started"
        );

        loop {
            tokio::select! {
                biased;

                () = self.token.cancelled() => break,

                update = self.update_rx.recv() => {
                    let Some(mut update) = update else { break };
                    if update.perp.is_none() {
                        update.perp = Some(self.config.perp.price(update.spot, update.timestamp_ms, &mut rng));
                    }
                    self.apply(update, connection);
                }

                changed = changed_state(&mut self.state_rx) => {
                    match changed {
                        Some(state) => {
                            record_connection_state(connection, state);
                            connection = state;
                            self.publish(connection);
                        }
                        None => self.state_rx = None,
                    }
                }

                _ = fallback.tick(), if fallback_enabled => {
                    if gate.should_emit(self.state.last_real_tick(), Instant::now()) {
                        let point = generator.next_point(self.state.last_prices(), now_ms());
                        self.apply(PriceUpdate::synthetic(&point), connection);
                    }
                }
            }
        }

        info!("Price feed stopped");
    }

    async fn bootstrap(&mut self, rng: &mut StdRng) {
        let limit = u16::try_from(self.config.series_capacity).unwrap_or(u16::MAX);
        match self
            .source
            .fetch_klines(&self.config.symbol, self.config.timeframe, limit)
            .await
        {
            Ok(klines) => {
                let history: Vec<PricePoint> = klines
                    .iter()
                    .map(|k| k.to_point(self.config.perp.price(k.close, k.open_time_ms, rng)))
                    .collect();
                info!(count = history.len(), timeframe = %self.config.timeframe, "Series bootstrapped");
                let state = std::mem::replace(&mut self.state, FeedState::new(0));
                self.state = state.bootstrap(history);
                self.publish(ConnectionState::Disconnected);
            }
            Err(e) => warn!(error = %e, "Kline bootstrap failed, starting empty"),
        }
    }

    fn apply(&mut self, update: PriceUpdate, connection: ConnectionState) {
        let state = std::mem::replace(&mut self.state, FeedState::new(0));
        let (state, outcome) = state.apply(update, Instant::now());
        self.state = state;

        match outcome {
            ApplyOutcome::Accepted => {
                Metrics::feed_tick(update.source.as_str());
                Metrics::feed_latency(update.source.as_str(), (now_ms() - update.timestamp_ms) as f64);
                if let Some((spot, perp)) = self.state.last_prices() {
                    Metrics::last_prices(spot, perp);
                }
                debug!(source = %update.source, spot = update.spot, "Price update accepted");
                self.publish(connection);
            }
            ApplyOutcome::Duplicate => Metrics::feed_duplicate(),
            ApplyOutcome::Rejected => {
                warn!(source = %update.source, spot = update.spot, "Rejected invalid price update");
            }
        }
    }

    fn publish(&self, connection: ConnectionState) {
        self.snapshot_tx.send_replace(self.state.snapshot(connection));
    }
}

/// Next connection state, or `None` once the stream side is gone. Pends
/// forever when there is no stream.
async fn changed_state(
    rx: &mut Option<watch::Receiver<ConnectionState>>,
) -> Option<ConnectionState> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

fn record_connection_state(from: ConnectionState, to: ConnectionState) {
    Metrics::ws_state_set(to.as_str());
    if to == ConnectionState::Connected {
        Metrics::ws_connected();
    } else {
        Metrics::ws_disconnected();
    }
    if to == ConnectionState::Reconnecting {
        Metrics::ws_reconnect("stream_lost");
    }
    debug!(%from, %to, "Feed observed connection state");
}

/// Handle to a running feed.
pub struct FeedHandle {
    snapshot_rx: watch::Receiver<FeedSnapshot>,
    token: CancellationToken,
    manager: Option<Arc<ConnectionManager>>,
    tasks: Vec<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager
            .as_ref()
            .map_or(ConnectionState::Disconnected, |m| m.state())
    }

    /// Stop every task: the stream sends a Close frame, timers stop.
    pub async fn shutdown(mut self) {
        if let Some(manager) = &self.manager {
            manager.shutdown();
        }
        self.token.cancel();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
