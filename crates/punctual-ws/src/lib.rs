//! Streaming ticker connection for the punctual terminal.
//!
//! Provides the push half of the price source:
//! - Connection lifecycle driven by an explicit state machine
//! - Fixed-delay reconnection, at most one attempt in flight
//! - Stream activity monitoring (quiet sockets are treated as lost)
//! - Ticker message parsing into `StreamTick`s sent over an mpsc channel

pub mod activity;
pub mod connection;
pub mod error;
pub mod fsm;
pub mod message;

pub use activity::ActivityMonitor;
pub use connection::{ConnectionConfig, ConnectionManager};
pub use error::{WsError, WsResult};
pub use fsm::{ConnectionEvent, ConnectionFsm, ConnectionState};
pub use message::{parse_ticker, ticker_stream_url, StreamTick, TickerMessage};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
