// metrics/mod.rs
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::error::AppError;

pub const FRAMES_RECEIVED: &str = "ledstrip_frames_received_total";
pub const FRAMES_DROPPED: &str = "ledstrip_frames_dropped_total";
pub const STATE_UPDATES: &str = "ledstrip_state_updates_total";
pub const COMMANDS_SENT: &str = "ledstrip_commands_sent_total";
pub const COMMANDS_DROPPED: &str = "ledstrip_commands_dropped_total";
pub const RECONNECTS_SCHEDULED: &str = "ledstrip_reconnects_scheduled_total";
pub const OPEN_CONNECTIONS: &str = "ledstrip_open_connections";

pub fn setup_metrics(port: u16) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to setup metrics: {}", e))?;
    describe();
    Ok(())
}

fn describe() {
    ::metrics::describe_counter!(FRAMES_RECEIVED, "Inbound frames read from device sockets");
    ::metrics::describe_counter!(FRAMES_DROPPED, "Inbound frames that failed to parse");
    ::metrics::describe_counter!(STATE_UPDATES, "State updates merged into the store");
    ::metrics::describe_counter!(COMMANDS_SENT, "Commands written to a device socket");
    ::metrics::describe_counter!(COMMANDS_DROPPED, "Commands dropped without delivery");
    ::metrics::describe_counter!(RECONNECTS_SCHEDULED, "Reconnect timers started after a close");
    ::metrics::describe_gauge!(OPEN_CONNECTIONS, "Device sockets currently open");
}
