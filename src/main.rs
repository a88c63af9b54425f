// main.rs
use ledstrip_bridge::{Bridge, config, metrics};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port)?;
        info!("Metrics exporter listening on port {}", settings.metrics.port);
    }

    let bridge = Bridge::new(settings.dispatch.retry_delay());

    for device in &settings.devices {
        let name = device.name.clone();
        bridge.register_device_update_callback(&device.device_address, move |state| {
            info!(
                device = %name,
                power = state.power,
                brightness = state.brightness,
                red = state.color.red,
                green = state.color.green,
                blue = state.color.blue,
                music_mode = state.music_mode,
                "Device state updated"
            );
        });
        bridge.ensure_connected(device);
    }

    info!("Bridge started with {} device(s)", settings.devices.len());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to listen for shutdown signal: {}", e))?;

    bridge.shutdown();
    info!("Bridge stopped");

    Ok(())
}
