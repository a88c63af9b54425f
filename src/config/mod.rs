// config/mod.rs
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use validator::Validate;

use crate::{commands::DEFAULT_RETRY_DELAY, devices::DeviceEndpoint, error::AppError};

#[derive(Debug, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub devices: Vec<DeviceEndpoint>,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub retry_delay_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
        }
    }
}

impl DispatchSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// `config/config.*` (optional) overlaid by `LEDSTRIP__*` variables.
    pub fn new() -> Result<Self, AppError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/config").required(false))
            .add_source(
                Environment::with_prefix("LEDSTRIP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::checked(settings)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, AppError> {
        let settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;

        Self::checked(settings)
    }

    fn checked(settings: Config) -> Result<Self, AppError> {
        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;

        let mut seen = HashSet::new();
        for device in &settings.devices {
            if !seen.insert(device.device_address.as_str()) {
                return Err(AppError::Validation(format!(
                    "device_address {} is configured more than once",
                    device.device_address
                )));
            }
        }
        Ok(settings)
    }
}
