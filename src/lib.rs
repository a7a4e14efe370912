pub mod client;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod renderer;
pub mod scene;
pub mod scheduler;
pub mod store;

use crate::client::{MessageHandler, StreamListener, TelemetryClient, WarehouseFeed};
use crate::config::AppConfig;
use crate::renderer::fonts::Fonts;
use crate::scene::SceneContext;
use crate::scheduler::FrameLoop;
use crate::store::TelemetryStore;
use anyhow::Context;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting application");

    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Application completed successfully"),
                Err(e) => {
                    error!("Application error: {e:#}");
                    // Print chain of error causes
                    let mut source = e.source();
                    while let Some(e) = source {
                        error!("Caused by: {e}");
                        source = e.source();
                    }
                    return Err(e).context("Application failed to run");
                }
            }
        }
    }

    Ok(())
}

async fn main_loop(config: AppConfig) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let policy = config.reconnect.policy();

    let store = Arc::new(TelemetryStore::new(
        &config.channels,
        config.history.capacity,
        config.history.eviction,
    ));
    let feed = Arc::new(WarehouseFeed::new());
    debug!(
        "Tracking {} series, capacity {}, {} eviction",
        store.state().history.len(),
        config.history.capacity,
        config.history.eviction
    );

    let mut tasks = JoinSet::new();

    // Warehouse lookup table over WebSocket
    let sensor = StreamListener::new("sensor", &config.stream.sensor_url, policy.clone(), feed.clone());
    let rx = shutdown_rx.clone();
    tasks.spawn(async move { sensor.run(rx).await });

    // Optional telemetry push, same store as the poller
    if config.stream.telemetry_url.is_empty() {
        debug!("Telemetry stream disabled");
    } else {
        let handler: Arc<dyn MessageHandler> = store.clone();
        let telemetry = StreamListener::new("telemetry", &config.stream.telemetry_url, policy, handler);
        let rx = shutdown_rx.clone();
        tasks.spawn(async move { telemetry.run(rx).await });
    }

    // Telemetry pull
    let client = TelemetryClient::new(&config.server.base_url, config.server.timeout())
        .context("Failed to create HTTP client")?;
    info!("Polling {} every {} ms", client.latest_url(&config.server.device_id), config.server.poll_interval_ms);
    let poller = scheduler::poll_latest(
        store.clone(),
        client,
        config.server.device_id.clone(),
        config.server.poll_interval(),
        shutdown_rx.clone(),
    );
    tasks.spawn(async move {
        poller.await;
    });

    // Scene and dashboard frames
    let fonts = Fonts::load_or_empty(&config.dashboard.font);
    let scene = SceneContext::new(&config.scene, feed.subscribe());
    let frames = FrameLoop::new(&config, scene, store.subscribe(), fonts);

    // Pointer and resize input, one event per stdin line
    let events = frames.events();
    std::thread::Builder::new()
        .name("scene-input".to_string())
        .spawn(move || scheduler::read_events(std::io::stdin().lock(), events))
        .context("Failed to start scene input thread")?;
    let frame_task = tokio::spawn(frames.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Shutdown requested");
    shutdown_tx.send(true).context("Failed to signal shutdown")?;

    let scene = frame_task.await.context("Frame loop panicked")?;
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            warn!("Background task failed: {}", e);
        }
    }

    info!(
        "Stopped after {} frames, telemetry version {}",
        scene.frames(),
        store.version()
    );
    Ok(())
}
