// tests/common/mod.rs
//! A fake LED controller: an axum WebSocket server that records
//! every text frame it receives and pushes whatever the test tells it to.
#![allow(dead_code)]

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Push {
    Frame(String),
    Drop,
}

#[derive(Clone)]
struct SimState {
    received: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    greeting: Option<String>,
    push: broadcast::Sender<Push>,
}

pub struct DeviceSimulator {
    pub addr: SocketAddr,
    state: SimState,
    server: JoinHandle<()>,
}

impl DeviceSimulator {
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap(), None).await
    }

    /// Sends `greeting` to every client right after the handshake.
    pub async fn with_greeting(greeting: impl Into<String>) -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap(), Some(greeting.into())).await
    }

    pub async fn start_on(addr: SocketAddr, greeting: Option<String>) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (push, _) = broadcast::channel(32);
        let state = SimState {
            received: Arc::new(Mutex::new(Vec::new())),
            accepted: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            greeting,
            push,
        };

        // any path upgrades, so one simulator can stand in for many controllers
        let app = Router::new()
            .route("/{*path}", get(upgrade))
            .with_state(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().unwrap().clone()
    }

    /// Sockets accepted over the simulator's lifetime.
    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// Sockets currently able to receive pushes.
    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.state.push.send(Push::Frame(frame.into()));
    }

    pub fn drop_connections(&self) {
        let _ = self.state.push.send(Push::Drop);
    }
}

impl Drop for DeviceSimulator {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<SimState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle(socket, state))
}

async fn handle(socket: WebSocket, state: SimState) {
    state.accepted.fetch_add(1, Ordering::SeqCst);
    let mut pushes = state.push.subscribe();
    let (mut sender, mut receiver) = socket.split();

    if let Some(greeting) = &state.greeting {
        if sender
            .send(Message::Text(greeting.clone().into()))
            .await
            .is_err()
        {
            return;
        }
    }
    state.live.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    state.received.lock().unwrap().push(text.as_str().to_string());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            push = pushes.recv() => match push {
                Ok(Push::Frame(text)) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Drop) | Err(_) => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    state.live.fetch_sub(1, Ordering::SeqCst);
}

/// Poll `check` until it holds, panicking after five seconds.
pub async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// An address nothing is listening on (yet).
pub fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn state_update(device_address: &str, state: serde_json::Value) -> String {
    serde_json::json!({
        "type": "state_update",
        "device_address": device_address,
        "state": state,
    })
    .to_string()
}
