mod command;
mod config;
mod sensor;
mod telemetry;
mod transport;

use anyhow::Result;
use command::CommandRegistry;
use config::{StationConfig, TransportKind};
use sensor::SimulatedSensor;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use stream_station_shared::DeviceFlags;
use telemetry::Station;
use transport::{LoopbackTransport, TcpTransport, Transport};

use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match config_path() {
        Some(path) => {
            info!("Loading config from {}", path.display());
            config::load_config(&path)?
        }
        None => StationConfig::default(),
    };

    let registry = Arc::new(CommandRegistry::with_default_handlers());
    let record = config
        .device
        .to_record(|| registry.supported_commands_metadata());
    let flags = Arc::new(DeviceFlags::new());

    info!("Stream station starting: {}", record.device_id());
    info!("  Commands: {}", registry.names().join(", "));

    let drain_poll = config.sampling.drain_poll();
    match config.transport.kind {
        TransportKind::Loopback => {
            let transport = Arc::new(LoopbackTransport::new());
            let station = Station::new(record, flags, registry, transport, drain_poll);
            run(station, &config, shutdown_signal()).await;
        }
        TransportKind::Tcp => {
            let transport = Arc::new(
                TcpTransport::connect(
                    &config.transport.address,
                    config.transport.connect_timeout(),
                    config.transport.confirm_timeout(),
                )
                .await?,
            );
            info!("  Hub: {}", transport.address());
            let station = Station::new(record, flags, registry, transport, drain_poll);
            run(station, &config, shutdown_signal()).await;
        }
    }

    Ok(())
}

/// Config file from the first argument, falling back to `STATION_CONFIG`
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("STATION_CONFIG"))
        .map(PathBuf::from)
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
    }
}

/// Sample, announce and report until `shutdown` resolves. Returns the
/// number of completed cycles.
async fn run<T: Transport>(
    mut station: Station<T>,
    config: &StationConfig,
    shutdown: impl Future<Output = ()>,
) -> u64 {
    let sensor = SimulatedSensor::new(
        config.sampling.air_baseline,
        config.sampling.water_baseline,
    );
    let mut ticker = tokio::time::interval(config.sampling.interval());

    // Polled across iterations so a signal raised mid-cycle is not lost
    tokio::pin!(shutdown);
    let mut cycles = 0u64;

    info!(
        "Sampling {} every {:?}",
        station.record().device_id(),
        config.sampling.interval()
    );

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutting down after {} cycles", cycles);
                break;
            }
            _ = ticker.tick() => {
                let reading = sensor.sample();
                let report = station.run_cycle(&reading).await;
                cycles += 1;
                debug!(
                    "Cycle {} done: announcement={:?} (sent={}) telemetry={:?}",
                    cycles,
                    report.announcement,
                    station.announcement().is_sent(),
                    report.telemetry
                );
            }
        }
    }

    cycles
}
