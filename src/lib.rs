pub mod channels;
pub mod config;
pub mod options;
pub mod prelude;
pub mod protocol;
pub mod publisher;
pub mod scheduler;
pub mod utils;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::protocol::inverter::Inverter;
use std::io::Write;

pub async fn app(mut shutdown_rx: broadcast::Receiver<()>, config: Config) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.loglevel()))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();

    info!("solar-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();

    let inverter = Inverter::new(&config, channels.clone());
    let scheduler = Scheduler::new(config.clone(), channels.clone());
    let publisher = Publisher::new(config.clone(), channels.clone());

    let inverter_clone = inverter.clone();
    let inverter_handle = tokio::spawn(async move {
        if let Err(e) = inverter_clone.start().await {
            error!("inverter task failed: {}", e);
        }
    });

    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("scheduler task failed: {}", e);
        }
    });

    let publisher_clone = publisher.clone();
    let publisher_handle = tokio::spawn(async move {
        if let Err(e) = publisher_clone.start().await {
            error!("publisher task failed: {}", e);
        }
    });

    let _ = shutdown_rx.recv().await;

    info!("shutdown signal received, stopping components...");
    inverter.stop(); // the scheduler listens on the same channel
    publisher.stop();

    for handle in [inverter_handle, scheduler_handle, publisher_handle] {
        if let Err(e) = handle.await {
            error!("error waiting for task: {}", e);
        }
    }

    info!("shutdown complete");
    Ok(())
}

pub async fn run(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl+c: {}", e);
        }
        let _ = shutdown_tx_clone.send(());
    });

    app(shutdown_rx, config).await
}
