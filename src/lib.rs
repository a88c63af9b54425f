// lib.rs
//! Connectivity layer between a smart-home host and networked LED strip
//! controllers: one WebSocket per controller, reconnected forever, JSON
//! commands out, partial state updates in.

pub mod bridge;
pub mod color;
pub mod commands;
pub mod config;
pub mod connection;
pub mod devices;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod store;
pub mod utils;

pub use bridge::Bridge;
pub use color::{HueSaturation, Rgb, hsv_to_rgb, rgb_to_hsv};
pub use commands::{Command, CommandDispatcher, SendOutcome};
pub use connection::{ConnectionManager, ConnectionState};
pub use devices::DeviceEndpoint;
pub use error::AppError;
pub use models::DeviceState;
