//! Stream activity monitoring.
//!
//! The ticker stream pushes continuously, so a socket that stays silent
//! longer than the timeout is treated as lost even if TCP never reports it.

use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub struct ActivityMonitor {
    timeout: Duration,
    last_message: RwLock<Instant>,
    message_count: RwLock<u64>,
}

impl ActivityMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            last_message: RwLock::new(Instant::now()),
            message_count: RwLock::new(0),
        }
    }

    /// Reset on every new connection.
    pub fn reset(&self) {
        *self.last_message.write() = Instant::now();
        *self.message_count.write() = 0;
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Instant::now();
        *self.message_count.write() += 1;
    }

    pub fn time_since_last_message(&self) -> Duration {
        self.last_message.read().elapsed()
    }

    pub fn message_count(&self) -> u64 {
        *self.message_count.read()
    }

    /// A zero timeout disables the check.
    pub fn is_stale(&self) -> bool {
        if self.timeout.is_zero() {
            return false;
        }
        let idle = self.time_since_last_message();
        if idle > self.timeout {
            debug!(idle_ms = idle.as_millis() as u64, "Stream is stale");
            return true;
        }
        false
    }

    /// Wait for the next staleness check.
    pub async fn wait_for_check(&self) {
        let period = if self.timeout.is_zero() {
            Duration::from_secs(3600)
        } else {
            self.timeout / 2
        };
        tokio::time::sleep(period).await;
    }
}
