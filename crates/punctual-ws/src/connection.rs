//! Ticker stream connection manager.
//!
//! Owns one socket at a time. Every lifecycle change goes through
//! `ConnectionFsm`; the current state is published on a `watch` channel so
//! the feed and the terminal can observe it without locking.

use crate::activity::ActivityMonitor;
use crate::error::{WsError, WsResult};
use crate::fsm::{ConnectionEvent, ConnectionFsm, ConnectionState};
use crate::message::{parse_ticker, StreamTick};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Stream URL, including the `<symbol>@ticker` path.
    pub url: String,
    /// Fixed delay before a reconnect attempt.
    pub reconnect_delay_ms: u64,
    /// Maximum consecutive failed attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Silence after which the socket is considered lost (0 = never).
    pub activity_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_delay_ms: 3000,
            max_reconnect_attempts: 0, // Infinite
            activity_timeout_ms: 30000,
        }
    }
}

/// Streaming ticker connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    fsm: Mutex<ConnectionFsm>,
    state_tx: watch::Sender<ConnectionState>,
    activity: ActivityMonitor,
    tick_tx: mpsc::Sender<StreamTick>,
    reconnect_count: RwLock<u32>,
    running: AtomicBool,
    shutdown_token: CancellationToken,
}

/// Clears the single-runner flag when `connect` returns.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig, tick_tx: mpsc::Sender<StreamTick>) -> Self {
        Self::with_token(config, tick_tx, CancellationToken::new())
    }

    /// Create a manager that also stops when `shutdown_token` is cancelled.
    pub fn with_token(
        config: ConnectionConfig,
        tick_tx: mpsc::Sender<StreamTick>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            activity: ActivityMonitor::new(config.activity_timeout_ms),
            config,
            fsm: Mutex::new(ConnectionFsm::new()),
            state_tx,
            tick_tx,
            reconnect_count: RwLock::new(0),
            running: AtomicBool::new(false),
            shutdown_token,
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.fsm.lock().state()
    }

    /// Subscribe to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Signal graceful shutdown.
    ///
    /// The message loop sends a Close frame and both loops exit promptly.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    fn apply(&self, event: ConnectionEvent) -> Option<ConnectionState> {
        let mut fsm = self.fsm.lock();
        let from = fsm.state();
        let next = fsm.handle(event);
        match next {
            Some(to) => {
                debug!(%from, %to, ?event, "Connection state transition");
                self.state_tx.send_replace(to);
            }
            None => debug!(state = %from, ?event, "Ignored connection event"),
        }
        next
    }

    /// Connect and keep the stream alive until shutdown.
    ///
    /// Returns `AlreadyRunning` when another `connect` owns this manager,
    /// and an error when `max_reconnect_attempts` is exhausted.
    pub async fn connect(&self) -> WsResult<()> {
        if self.is_shutdown() {
            self.apply(ConnectionEvent::Shutdown);
            return Ok(());
        }
        if self.running.swap(true, Ordering::AcqRel) {
            warn!(state = %self.state(), "Connect called while already running");
            return Err(WsError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        if self.apply(ConnectionEvent::Start).is_none() {
            // Only a shut-down machine refuses Start once `running` is held.
            return Ok(());
        }

        loop {
            match self.try_connect().await {
                Ok(()) => info!("Ticker stream closed"),
                Err(e) => warn!(error = %e, "Ticker stream error"),
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                self.apply(ConnectionEvent::Shutdown);
                return Ok(());
            }

            let attempt = {
                let mut count = self.reconnect_count.write();
                *count += 1;
                *count
            };
            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                self.apply(ConnectionEvent::Shutdown);
                return Err(WsError::MaxReconnectAttempts(attempt));
            }

            // The delay is waited out even when the retry was not armed.
            let armed = self.apply(ConnectionEvent::RetryArmed).is_some();
            let delay = Duration::from_millis(self.config.reconnect_delay_ms);
            warn!(attempt, armed, delay_ms = self.config.reconnect_delay_ms, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay, exiting");
                    self.apply(ConnectionEvent::Shutdown);
                    return Ok(());
                }
            }

            if armed {
                self.apply(ConnectionEvent::RetryElapsed);
            } else {
                self.apply(ConnectionEvent::Start);
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to ticker stream");

        let handshake = tokio::select! {
            result = connect_async_tls_with_config(&self.config.url, None, true, None) => result,
            () = self.shutdown_token.cancelled() => return Ok(()),
        };
        let ws_stream = match handshake {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                self.apply(ConnectionEvent::HandshakeFailed);
                return Err(WsError::ConnectionFailed(e.to_string()));
            }
        };
        let (mut write, mut read) = ws_stream.split();

        self.apply(ConnectionEvent::HandshakeOk);
        *self.reconnect_count.write() = 0;
        self.activity.reset();
        info!("Ticker stream connected");

        let result = loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    break Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.activity.record_message();
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.activity.record_message();
                            debug!("Received ping, sending pong");
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                break Err(e.into());
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Ticker stream closed by server");
                            break Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Ticker stream read error");
                            break Err(e.into());
                        }
                        None => {
                            warn!("Ticker stream ended");
                            break Ok(());
                        }
                        Some(Ok(_)) => self.activity.record_message(),
                    }
                }

                () = self.activity.wait_for_check() => {
                    if self.activity.is_stale() {
                        error!(
                            timeout_ms = self.config.activity_timeout_ms,
                            "Ticker stream inactive"
                        );
                        break Err(WsError::ActivityTimeout(self.config.activity_timeout_ms));
                    }
                }
            }
        };

        self.apply(ConnectionEvent::StreamLost);
        result
    }

    /// Malformed frames are logged and skipped; they never drop the socket.
    async fn handle_text_message(&self, text: &str) {
        match parse_ticker(text) {
            Ok(tick) => {
                if self.tick_tx.send(tick).await.is_err() {
                    warn!("Tick receiver dropped");
                }
            }
            Err(e) => warn!(error = %e, "Ignoring unparsable ticker message"),
        }
    }
}
