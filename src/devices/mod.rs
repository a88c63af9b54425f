// devices/mod.rs
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

use crate::utils;

pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5000;

/// A configured LED strip controller. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct DeviceEndpoint {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub device_address: String,
    #[validate(url)]
    pub api_url: String,
    #[validate(range(min = 100))]
    #[serde(default)]
    pub reconnect_interval_ms: Option<u64>,
    #[serde(default)]
    pub enable_music_mode: bool,
    #[serde(default)]
    pub enable_mic_controls: bool,
}

impl DeviceEndpoint {
    pub fn new(device_address: impl Into<String>, api_url: impl Into<String>) -> Self {
        let device_address = device_address.into();
        Self {
            name: device_address.clone(),
            device_address,
            api_url: api_url.into(),
            reconnect_interval_ms: None,
            enable_music_mode: false,
            enable_mic_controls: false,
        }
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn with_music_mode(mut self) -> Self {
        self.enable_music_mode = true;
        self
    }

    pub fn with_mic_controls(mut self) -> Self {
        self.enable_mic_controls = true;
        self
    }

    /// The registry key: one connection per socket URL.
    pub fn socket_url(&self) -> String {
        utils::socket_url(&self.api_url)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(
            self.reconnect_interval_ms
                .unwrap_or(DEFAULT_RECONNECT_INTERVAL_MS),
        )
    }
}
