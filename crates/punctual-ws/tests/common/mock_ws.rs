//! Mock ticker stream server for integration tests.
//!
//! Every accepted connection receives the scripted frames, then either
//! stays open or is closed by the server.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    KeepOpen,
    Close,
}

#[derive(Default)]
struct Stats {
    connections: u32,
    client_close_frames: u32,
}

pub struct MockTickerServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    stats: Arc<Mutex<Stats>>,
}

impl MockTickerServer {
    /// Start a server on an available port.
    pub async fn start(script: Vec<String>, after: AfterScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats: Arc<Mutex<Stats>> = Arc::new(Mutex::new(Stats::default()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let stats_clone = stats.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            script.clone(),
                            after,
                            stats_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            stats,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws/btcusdt@ticker", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        self.stats.lock().await.connections
    }

    pub async fn client_close_frames(&self) -> u32 {
        self.stats.lock().await.client_close_frames
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

pub fn ticker_frame(price: &str, event_time: i64) -> String {
    serde_json::json!({
        "e": "24hrTicker",
        "E": event_time,
        "s": "BTCUSDT",
        "c": price,
        "v": "10.0"
    })
    .to_string()
}

async fn handle_connection(
    stream: TcpStream,
    script: Vec<String>,
    after: AfterScript,
    stats: Arc<Mutex<Stats>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    stats.lock().await.connections += 1;

    let (mut write, mut read) = ws_stream.split();

    for frame in script {
        if write.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    if after == AfterScript::Close {
        let _ = write.send(Message::Close(None)).await;
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => {
                stats.lock().await.client_close_frames += 1;
                break;
            }
            Err(_) => break,
            _ => {}
        }
    }
}
