// models.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{color::Rgb, error::AppError};

/// Last known telemetry for one device.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceState {
    pub power: bool,
    pub brightness: u8,
    pub intensity: u8,
    pub color: Rgb,
    /// 0 means music mode is off.
    pub music_mode: u8,
    pub mic_sensitivity: u16,
    pub mic_scaling: u8,
    pub connected: bool,
    /// Device-reported timestamp, seconds since the epoch.
    pub last_updated: f64,
    /// When the bridge merged the latest update.
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ColorDelta {
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>,
}

/// Partial state carried by a `state_update` frame. Missing or `null`
/// fields leave the cached value alone.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StateDelta {
    pub power: Option<bool>,
    pub brightness: Option<u8>,
    pub intensity: Option<u8>,
    pub color: Option<ColorDelta>,
    pub music_mode: Option<u8>,
    pub mic_sensitivity: Option<u16>,
    pub mic_scaling: Option<u8>,
    pub connected: Option<bool>,
    pub last_updated: Option<f64>,
}

impl StateDelta {
    pub fn apply_to(&self, state: &mut DeviceState) {
        if let Some(power) = self.power {
            state.power = power;
        }
        if let Some(brightness) = self.brightness {
            state.brightness = brightness;
        }
        if let Some(intensity) = self.intensity {
            state.intensity = intensity;
        }
        if let Some(color) = &self.color {
            if let Some(red) = color.red {
                state.color.red = red;
            }
            if let Some(green) = color.green {
                state.color.green = green;
            }
            if let Some(blue) = color.blue {
                state.color.blue = blue;
            }
        }
        if let Some(mode) = self.music_mode {
            state.music_mode = mode;
        }
        if let Some(sensitivity) = self.mic_sensitivity {
            state.mic_sensitivity = sensitivity;
        }
        if let Some(scaling) = self.mic_scaling {
            state.mic_scaling = scaling;
        }
        if let Some(connected) = self.connected {
            state.connected = connected;
        }
        if let Some(last_updated) = self.last_updated {
            state.last_updated = last_updated;
        }
    }
}

/// Reply the device sends back for each command it executes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StateUpdateFrame {
    device_address: Option<String>,
    state: Option<StateDelta>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    StateUpdate {
        device_address: String,
        delta: StateDelta,
    },
    Response(CommandResponse),
    /// Well-formed but not actionable; carries the reason for the log line.
    Ignored(String),
}

impl InboundMessage {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(AppError::Protocol("frame is not a JSON object".into()));
        }

        match value.get("type").and_then(Value::as_str) {
            Some("state_update") => {
                let frame: StateUpdateFrame = serde_json::from_value(value)?;
                match (frame.device_address, frame.state) {
                    (Some(device_address), Some(delta)) => Ok(InboundMessage::StateUpdate {
                        device_address,
                        delta,
                    }),
                    _ => Ok(InboundMessage::Ignored(
                        "state_update without device_address or state".into(),
                    )),
                }
            }
            Some(other) => Ok(InboundMessage::Ignored(format!("message type {other}"))),
            None if value.get("status").is_some() => {
                Ok(InboundMessage::Response(serde_json::from_value(value)?))
            }
            None => Ok(InboundMessage::Ignored("untyped message".into())),
        }
    }
}
