// connection/mod.rs
//! Connection registry: one socket per resolved URL, reconnected forever.
//!
//! Every connection runs on its own task (see `socket.rs`). The registry only
//! holds an id, the lifecycle state and the outbound queue for each URL. A
//! close removes the entry (guarded by the id, so a late close can't evict a
//! newer connection) and arms a single-shot reconnect timer unless one is
//! already pending for that URL. Timers are never cancelled;
//! `ensure_connected` is a no-op while an entry exists.

mod socket;

use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    devices::DeviceEndpoint,
    error::AppError,
    events::{ConnectionEvent, EventBus},
    metrics as names,
    models::InboundMessage,
    store::StateStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

#[derive(Debug)]
struct Connection {
    id: Uuid,
    state: ConnectionState,
    outbound: mpsc::UnboundedSender<Message>,
}

#[derive(Debug)]
struct Inner {
    connections: DashMap<String, Connection>,
    endpoints: DashMap<String, DeviceEndpoint>,
    /// URLs with an armed reconnect timer.
    pending_reconnects: DashMap<String, ()>,
    store: Arc<StateStore>,
    events: Arc<EventBus>,
    shut_down: AtomicBool,
}

/// Cheap to clone; all clones share one registry.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(store: Arc<StateStore>, events: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connections: DashMap::new(),
                endpoints: DashMap::new(),
                pending_reconnects: DashMap::new(),
                store,
                events,
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Make the endpoint known to the dispatcher and the frame handler
    /// without opening a socket.
    pub fn register(&self, endpoint: &DeviceEndpoint) {
        self.inner
            .endpoints
            .insert(endpoint.device_address.clone(), endpoint.clone());
    }

    pub fn endpoint(&self, device_address: &str) -> Option<DeviceEndpoint> {
        self.inner
            .endpoints
            .get(device_address)
            .map(|entry| entry.value().clone())
    }

    pub fn connection_state(&self, url: &str) -> ConnectionState {
        self.inner
            .connections
            .get(url)
            .map(|conn| conn.state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Registers the endpoint and opens its socket unless one is already
    /// connecting or open. Must be called from within a tokio runtime.
    pub fn ensure_connected(&self, endpoint: &DeviceEndpoint) {
        self.register(endpoint);
        if self.is_shut_down() {
            debug!(device_address = %endpoint.device_address, "Manager shut down, not connecting");
            return;
        }

        let url = endpoint.socket_url();
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        match self.inner.connections.entry(url.clone()) {
            Entry::Occupied(existing) => {
                debug!(%url, state = ?existing.get().state, "Connection already active");
                return;
            }
            // under the shard lock: shutdown's walk either sees this entry or
            // we see its flag
            Entry::Vacant(_) if self.is_shut_down() => {
                debug!(%url, "Manager shut down, not connecting");
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(Connection {
                    id,
                    state: ConnectionState::Connecting,
                    outbound: tx,
                });
            }
        }

        info!(%url, device_address = %endpoint.device_address, "Connecting");
        tokio::spawn(socket::run(self.clone(), endpoint.clone(), url, id, rx));
    }

    /// Queue a text frame on an open connection.
    pub fn send_text(&self, url: &str, text: String) -> Result<(), AppError> {
        let not_open = |reason: &str| AppError::Connection {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let conn = self
            .inner
            .connections
            .get(url)
            .ok_or_else(|| not_open("not connected"))?;
        if conn.state != ConnectionState::Open {
            return Err(not_open("connection not open yet"));
        }
        conn.outbound
            .send(Message::Text(text))
            .map_err(|_| not_open("connection task has exited"))
    }

    /// Parse one inbound frame and route it. Never fails: bad frames are
    /// logged and dropped, the connection stays up.
    pub fn handle_inbound_frame(&self, raw: &str) {
        ::metrics::counter!(names::FRAMES_RECEIVED).increment(1);

        match InboundMessage::parse(raw) {
            Ok(InboundMessage::StateUpdate {
                device_address,
                delta,
            }) => {
                if !self.inner.endpoints.contains_key(&device_address) {
                    debug!(%device_address, "State update for unregistered device, ignoring");
                    return;
                }
                let state = self.inner.store.merge(&device_address, &delta);
                ::metrics::counter!(names::STATE_UPDATES).increment(1);
                debug!(%device_address, power = state.power, brightness = state.brightness, "State updated");
                self.inner.events.publish_device_update(&device_address, &state);
            }
            Ok(InboundMessage::Response(response)) => match response.status.as_str() {
                "success" => debug!(message = ?response.message, "Command acknowledged"),
                status => warn!(%status, message = ?response.message, "Device reported a command problem"),
            },
            Ok(InboundMessage::Ignored(reason)) => debug!(%reason, "Ignoring frame"),
            Err(e) => {
                ::metrics::counter!(names::FRAMES_DROPPED).increment(1);
                warn!(error = %e, "Dropping malformed frame");
            }
        }
    }

    /// Stop reconnecting and close every socket. Registered endpoints and
    /// cached state stay readable.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(connections = self.inner.connections.len(), "Shutting down connections");
        for conn in self.inner.connections.iter() {
            let _ = conn.outbound.send(Message::Close(None));
        }
    }

    fn mark_open(&self, url: &str, id: Uuid) {
        let opened = match self.inner.connections.get_mut(url) {
            Some(mut conn) if conn.id == id => {
                conn.state = ConnectionState::Open;
                true
            }
            _ => false,
        };
        if opened {
            ::metrics::gauge!(names::OPEN_CONNECTIONS).increment(1.0);
            info!(%url, "Connected");
            self.inner
                .events
                .publish_connection_event(ConnectionEvent::Connected {
                    url: url.to_string(),
                });
        }
    }

    fn report_error(&self, url: &str, err: &AppError) {
        error!(%url, error = %err, "Connection error");
        self.inner
            .events
            .publish_connection_event(ConnectionEvent::Error {
                url: url.to_string(),
                reason: err.to_string(),
            });
    }

    fn handle_close(&self, endpoint: &DeviceEndpoint, url: &str, id: Uuid) {
        let removed = self
            .inner
            .connections
            .remove_if(url, |_, conn| conn.id == id);
        if let Some((_, conn)) = removed {
            if conn.state == ConnectionState::Open {
                ::metrics::gauge!(names::OPEN_CONNECTIONS).decrement(1.0);
            }
        }

        self.inner
            .events
            .publish_connection_event(ConnectionEvent::Disconnected {
                url: url.to_string(),
            });

        if self.is_shut_down() {
            info!(%url, "Disconnected");
            return;
        }

        if self
            .inner
            .pending_reconnects
            .insert(url.to_string(), ())
            .is_some()
        {
            debug!(%url, "Disconnected, reconnect already pending");
            return;
        }

        let interval = endpoint.reconnect_interval();
        info!(%url, retry_in_ms = interval.as_millis() as u64, "Disconnected, scheduling reconnect");
        ::metrics::counter!(names::RECONNECTS_SCHEDULED).increment(1);

        let manager = self.clone();
        let endpoint = endpoint.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            manager.inner.pending_reconnects.remove(&url);
            manager.ensure_connected(&endpoint);
        });
    }
}
