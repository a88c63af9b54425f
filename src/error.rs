// error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Connection error for {url}: {reason}")]
    Connection { url: String, reason: String },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Command for {device_address} not delivered: {reason}")]
    DeliveryFailure {
        device_address: String,
        reason: String,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Protocol(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
