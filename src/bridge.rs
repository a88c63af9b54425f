// bridge.rs
//! The surface the accessory layer talks to.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    commands::{Command, CommandDispatcher, DEFAULT_RETRY_DELAY, SendOutcome},
    connection::{ConnectionManager, ConnectionState},
    devices::DeviceEndpoint,
    events::{ConnectionEvent, EventBus},
    models::DeviceState,
    store::StateStore,
};

#[derive(Debug)]
pub struct Bridge {
    manager: ConnectionManager,
    dispatcher: CommandDispatcher<ConnectionManager>,
    store: Arc<StateStore>,
    events: Arc<EventBus>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl Bridge {
    pub fn new(retry_delay: Duration) -> Self {
        let store = Arc::new(StateStore::new());
        let events = Arc::new(EventBus::new());
        let manager = ConnectionManager::new(Arc::clone(&store), Arc::clone(&events));
        let dispatcher = CommandDispatcher::with_retry_delay(manager.clone(), retry_delay);
        Self {
            manager,
            dispatcher,
            store,
            events,
        }
    }

    pub fn register_device_update_callback<F>(&self, device_address: &str, callback: F)
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        self.events.on_device_update(device_address, callback);
    }

    pub fn register_connection_callback<F>(&self, endpoint: &DeviceEndpoint, callback: F)
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.events
            .on_connection_event(&endpoint.socket_url(), callback);
    }

    /// Must be called from within a tokio runtime: a command for a device
    /// that is not connected spawns its reconnect and retry.
    pub fn send_command(&self, device_address: &str, command: &Command) -> SendOutcome {
        self.dispatcher.send(device_address, command)
    }

    pub fn get_device_state(&self, device_address: &str) -> Option<DeviceState> {
        self.store.get(device_address)
    }

    /// Spawns the socket task, so it must be called from within a tokio
    /// runtime.
    pub fn ensure_connected(&self, endpoint: &DeviceEndpoint) {
        self.manager.ensure_connected(endpoint);
    }

    pub fn connection_state(&self, endpoint: &DeviceEndpoint) -> ConnectionState {
        self.manager.connection_state(&endpoint.socket_url())
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}
