// store.rs
use chrono::Utc;
use dashmap::DashMap;

use crate::models::{DeviceState, StateDelta};

/// Latest known state per device address. Entries are created on the first
/// inbound update and live as long as the store.
#[derive(Debug, Default)]
pub struct StateStore {
    states: DashMap<String, DeviceState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means no update has been seen for this device yet.
    pub fn get(&self, device_address: &str) -> Option<DeviceState> {
        self.states.get(device_address).map(|entry| entry.value().clone())
    }

    /// Overwrite only the fields present in `delta` and return the result.
    pub fn merge(&self, device_address: &str, delta: &StateDelta) -> DeviceState {
        let mut entry = self.states.entry(device_address.to_string()).or_default();
        delta.apply_to(&mut entry);
        entry.received_at = Utc::now();
        entry.clone()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
