// commands/mod.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::{
    color::{self, Rgb},
    connection::ConnectionManager,
    devices::DeviceEndpoint,
    error::AppError,
    metrics as names,
};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BrightnessCommand {
    pub brightness: u8,
    #[validate(range(max = 15))]
    pub intensity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MusicModeCommand {
    /// 0 turns music mode off, 1..=4 select classic, vocal, pop, rock.
    #[validate(range(max = 4))]
    pub mode: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MicSensitivityCommand {
    #[validate(range(min = 41, max = 255))]
    pub sensitivity: u16,
    #[validate(range(max = 15))]
    pub scaling: u8,
}

/// Outbound intent. Serializes to the wire shape minus `device_address`,
/// which the dispatcher adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Power { state: PowerState },
    Brightness(BrightnessCommand),
    Color(Rgb),
    MusicMode(MusicModeCommand),
    MicSensitivity(MicSensitivityCommand),
}

impl Command {
    pub fn power(on: bool) -> Self {
        Command::Power {
            state: if on { PowerState::On } else { PowerState::Off },
        }
    }

    /// Host brightness in percent to the device's 0..=255 brightness and
    /// 0..=15 intensity.
    pub fn brightness_percent(percent: f64) -> Self {
        let percent = percent.clamp(0.0, 100.0);
        Command::Brightness(BrightnessCommand {
            brightness: (percent * 2.55).round().min(255.0) as u8,
            intensity: (percent / 6.67).round().min(15.0) as u8,
        })
    }

    pub fn color_hsv(hue: f64, saturation: f64, brightness: f64) -> Self {
        Command::Color(color::hsv_to_rgb(hue, saturation, brightness))
    }

    pub fn color_rgb(red: u8, green: u8, blue: u8) -> Self {
        Command::Color(Rgb::new(red, green, blue))
    }

    pub fn music_mode(mode: u8) -> Self {
        Command::MusicMode(MusicModeCommand { mode })
    }

    pub fn mic_sensitivity(sensitivity: u16, scaling: u8) -> Self {
        Command::MicSensitivity(MicSensitivityCommand {
            sensitivity,
            scaling,
        })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::Power { .. } => "power",
            Command::Brightness(_) => "brightness",
            Command::Color(_) => "color",
            Command::MusicMode(_) => "music_mode",
            Command::MicSensitivity(_) => "mic_sensitivity",
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Command::Power { .. } | Command::Color(_) => Ok(()),
            Command::Brightness(cmd) => Ok(cmd.validate()?),
            Command::MusicMode(cmd) => Ok(cmd.validate()?),
            Command::MicSensitivity(cmd) => Ok(cmd.validate()?),
        }
    }

    /// Music and mic commands are only sent to endpoints that enable them.
    pub fn check_supported(&self, endpoint: &DeviceEndpoint) -> Result<(), AppError> {
        let enabled = match self {
            Command::MusicMode(_) => endpoint.enable_music_mode,
            Command::MicSensitivity(_) => endpoint.enable_mic_controls,
            _ => true,
        };
        if enabled {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "{} is not enabled for {}",
                self.action(),
                endpoint.device_address
            )))
        }
    }

    /// `{...command, "device_address": ...}` as a JSON text frame.
    pub fn to_frame(&self, device_address: &str) -> Result<String, AppError> {
        let mut value = serde_json::to_value(self)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| AppError::Protocol("command did not serialize to an object".into()))?;
        object.insert(
            "device_address".into(),
            serde_json::Value::String(device_address.to_string()),
        );
        Ok(serde_json::to_string(&value)?)
    }
}

/// What the dispatcher needs from the connection layer.
pub trait Transport: Clone + Send + Sync + 'static {
    fn endpoint(&self, device_address: &str) -> Option<DeviceEndpoint>;
    fn ensure_connected(&self, endpoint: &DeviceEndpoint);
    fn send_text(&self, url: &str, text: String) -> Result<(), AppError>;
}

impl Transport for ConnectionManager {
    fn endpoint(&self, device_address: &str) -> Option<DeviceEndpoint> {
        ConnectionManager::endpoint(self, device_address)
    }

    fn ensure_connected(&self, endpoint: &DeviceEndpoint) {
        ConnectionManager::ensure_connected(self, endpoint)
    }

    fn send_text(&self, url: &str, text: String) -> Result<(), AppError> {
        ConnectionManager::send_text(self, url, text)
    }
}

#[derive(Debug)]
pub enum SendOutcome {
    Sent,
    /// Not connected: a reconnect was requested and one retry is pending.
    /// The handle resolves once the retry has either sent or dropped it.
    RetryScheduled(JoinHandle<Result<(), AppError>>),
    Dropped(AppError),
}

/// Fire-and-forget command sender with a single delayed retry.
#[derive(Debug, Clone)]
pub struct CommandDispatcher<T: Transport> {
    transport: T,
    retry_delay: Duration,
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self::with_retry_delay(transport, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry_delay(transport: T, retry_delay: Duration) -> Self {
        Self {
            transport,
            retry_delay,
        }
    }

    /// Never blocks and never raises: failures are logged and reported in
    /// the returned outcome only. Spawns the retry, so it must be called
    /// from within a tokio runtime.
    pub fn send(&self, device_address: &str, command: &Command) -> SendOutcome {
        let Some(endpoint) = self.transport.endpoint(device_address) else {
            return dropped(AppError::DeviceNotFound(device_address.to_string()));
        };

        if let Err(e) = command
            .validate()
            .and_then(|()| command.check_supported(&endpoint))
        {
            return dropped(e);
        }

        let frame = match command.to_frame(device_address) {
            Ok(frame) => frame,
            Err(e) => return dropped(e),
        };

        let url = endpoint.socket_url();
        let action = command.action();

        match self.transport.send_text(&url, frame.clone()) {
            Ok(()) => {
                ::metrics::counter!(names::COMMANDS_SENT).increment(1);
                debug!(%device_address, action, "Command sent");
                return SendOutcome::Sent;
            }
            Err(e) => {
                warn!(
                    %device_address,
                    action,
                    reason = %e,
                    retry_in_ms = self.retry_delay.as_millis() as u64,
                    "Not connected, reconnecting before retry"
                );
            }
        }

        self.transport.ensure_connected(&endpoint);

        let transport = self.transport.clone();
        let delay = self.retry_delay;
        let device_address = device_address.to_string();
        SendOutcome::RetryScheduled(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match transport.send_text(&url, frame) {
                Ok(()) => {
                    ::metrics::counter!(names::COMMANDS_SENT).increment(1);
                    info!(%device_address, action, "Command sent after reconnect");
                    Ok(())
                }
                Err(e) => {
                    let failure = AppError::DeliveryFailure {
                        device_address,
                        reason: e.to_string(),
                    };
                    ::metrics::counter!(names::COMMANDS_DROPPED).increment(1);
                    error!(error = %failure, action, "Dropping command");
                    Err(failure)
                }
            }
        }))
    }
}

fn dropped(err: AppError) -> SendOutcome {
    ::metrics::counter!(names::COMMANDS_DROPPED).increment(1);
    error!(error = %err, "Dropping command");
    SendOutcome::Dropped(err)
}
