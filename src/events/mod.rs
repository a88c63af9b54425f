// events/mod.rs
use dashmap::DashMap;
use std::sync::Arc;

use crate::models::DeviceState;

pub type UpdateCallback = Arc<dyn Fn(&DeviceState) + Send + Sync>;
pub type ConnectionCallback = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { url: String },
    Disconnected { url: String },
    Error { url: String, reason: String },
}

/// One update callback per device address and one lifecycle callback per
/// socket URL. Registering again replaces the previous callback.
#[derive(Default)]
pub struct EventBus {
    device_callbacks: DashMap<String, UpdateCallback>,
    connection_callbacks: DashMap<String, ConnectionCallback>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("device_callbacks", &self.device_callbacks.len())
            .field("connection_callbacks", &self.connection_callbacks.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_device_update<F: Fn(&DeviceState) + Send + Sync + 'static>(
        &self,
        device_address: &str,
        callback: F,
    ) {
        self.device_callbacks
            .insert(device_address.to_string(), Arc::new(callback));
    }

    pub fn on_connection_event<F: Fn(&ConnectionEvent) + Send + Sync + 'static>(
        &self,
        url: &str,
        callback: F,
    ) {
        self.connection_callbacks
            .insert(url.to_string(), Arc::new(callback));
    }

    pub fn publish_device_update(&self, device_address: &str, state: &DeviceState) {
        // Clone out of the map so a callback may re-register without deadlocking.
        let callback = self
            .device_callbacks
            .get(device_address)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(callback) = callback {
            (callback)(state);
        }
    }

    pub fn publish_connection_event(&self, event: ConnectionEvent) {
        let url = match &event {
            ConnectionEvent::Connected { url }
            | ConnectionEvent::Disconnected { url }
            | ConnectionEvent::Error { url, .. } => url,
        };
        let callback = self
            .connection_callbacks
            .get(url.as_str())
            .map(|entry| Arc::clone(entry.value()));
        if let Some(callback) = callback {
            (callback)(&event);
        }
    }
}
