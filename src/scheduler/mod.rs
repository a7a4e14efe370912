use image::DynamicImage;
use log::{debug, error, info, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::client::LatestFetcher;
use crate::config::{AppConfig, DashboardConfig};
use crate::dashboard;
use crate::renderer::fonts::Fonts;
use crate::scene::{Frame, SceneContext, SceneEvent};
use crate::store::{StoreState, TelemetryStore};

const EVENT_QUEUE: usize = 64;

/// Drives `SceneContext::tick` at the configured frame rate and renders a
/// dashboard frame every `render_every` ticks. Input events queued through
/// `events()` are applied between ticks.
pub struct FrameLoop {
    scene: SceneContext,
    events_tx: mpsc::Sender<SceneEvent>,
    events: mpsc::Receiver<SceneEvent>,
    store: watch::Receiver<StoreState>,
    interval: Duration,
    dashboard: DashboardConfig,
    fonts: Fonts,
    latest: Option<DynamicImage>,
}

impl FrameLoop {
    pub fn new(config: &AppConfig, scene: SceneContext, store: watch::Receiver<StoreState>, fonts: Fonts) -> Self {
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE);
        Self {
            scene,
            events_tx,
            events,
            store,
            interval: config.scene.frame_interval(),
            dashboard: config.dashboard.clone(),
            fonts,
            latest: None,
        }
    }

    pub fn events(&self) -> mpsc::Sender<SceneEvent> {
        self.events_tx.clone()
    }

    pub fn scene(&self) -> &SceneContext {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneContext {
        &mut self.scene
    }

    /// Most recently rendered dashboard frame.
    pub fn latest_image(&self) -> Option<&DynamicImage> {
        self.latest.as_ref()
    }

    pub fn step(&mut self) -> Frame {
        let frame = self.scene.tick();
        if self.render_due(frame.index) {
            self.render();
        }
        frame
    }

    fn render_due(&self, index: u64) -> bool {
        self.dashboard.enabled && index % u64::from(self.dashboard.render_every.max(1)) == 0
    }

    fn render(&mut self) {
        // Clone so the sender is not held off for the whole render
        let state = self.store.borrow().clone();
        let image = dashboard::create_image(&self.dashboard, &self.scene, &state, &self.fonts);

        if self.dashboard.save_to_file {
            match dashboard::save_image(&self.dashboard, &image) {
                Ok(()) => debug!("Dashboard saved to {}", self.dashboard.file),
                Err(e) => error!("{:#}", e),
            }
        }
        self.latest = Some(image);
    }

    /// Runs until shutdown, then tears the scene down and hands it back.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SceneContext {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Frame loop started at {} ms per frame", self.interval.as_millis());

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    self.step();
                }
                Some(event) = self.events.recv() => {
                    if let Some(name) = self.scene.apply(event) {
                        debug!("Click selected {}", name);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        self.scene.teardown();
        self.scene
    }
}

/// Forwards one `SceneEvent` per input line until the input ends or the
/// frame loop is gone. Unparseable lines are skipped. Blocks, so it runs on
/// its own thread.
pub fn read_events<R: BufRead>(reader: R, events: mpsc::Sender<SceneEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read scene input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<SceneEvent>() {
            Ok(event) => {
                if events.blocking_send(event).is_err() {
                    break;
                }
            }
            Err(e) => warn!("Ignoring input: {}", e),
        }
    }

    debug!("Scene input closed");
}

/// Refreshes the store from the HTTP endpoint every `period` until shutdown.
/// Returns how many refreshes were applied.
pub async fn poll_latest<F: LatestFetcher>(
    store: Arc<TelemetryStore>,
    fetcher: F,
    device_id: String,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut applied = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = interval.tick() => {
                if store.refresh(&fetcher, &device_id).await {
                    applied += 1;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    debug!("Poller for {} stopped after {} updates", device_id, applied);
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FetchError;
    use crate::models::WarehouseTable;
    use crate::store::EvictionPolicy;
    use indexmap::IndexMap;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn config(render_every: u32) -> AppConfig {
        let mut config = AppConfig::default();
        config.scene.frame_rate = 200;
        config.dashboard.render_every = render_every;
        config.dashboard.panel_width = 120;
        config
    }

    fn frame_loop(config: &AppConfig) -> (FrameLoop, Arc<TelemetryStore>) {
        let store = Arc::new(TelemetryStore::new(&config.channels, 5, EvictionPolicy::Lockstep));
        let (_tx, table) = watch::channel(WarehouseTable::default());
        let scene = SceneContext::new(&config.scene, table);
        let frames = FrameLoop::new(config, scene, store.subscribe(), Fonts::default());
        (frames, store)
    }

    struct CountingFetcher;

    impl LatestFetcher for CountingFetcher {
        async fn fetch_latest(&self, _device_id: &str) -> Result<Value, FetchError> {
            Ok(json!({"temperature": 21.5, "pressure": 1.2}))
        }
    }

    struct FailingFetcher;

    impl LatestFetcher for FailingFetcher {
        async fn fetch_latest(&self, _device_id: &str) -> Result<Value, FetchError> {
            Err(FetchError::Status(500))
        }
    }

    #[test]
    fn test_renders_every_nth_tick() {
        let (mut frames, _store) = frame_loop(&config(3));

        frames.step();
        frames.step();
        assert!(frames.latest_image().is_none());

        let frame = frames.step();
        assert_eq!(frame.index, 3);
        assert_eq!(frames.latest_image().unwrap().width(), 560 + 120);
    }

    #[test]
    fn test_disabled_dashboard_never_renders() {
        let mut config = config(1);
        config.dashboard.enabled = false;
        let (mut frames, _store) = frame_loop(&config);

        for _ in 0..5 {
            frames.step();
        }
        assert!(frames.latest_image().is_none());
        assert_eq!(frames.scene().frames(), 5);
    }

    #[test]
    fn test_saves_frames_when_configured() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut config = config(1);
        config.dashboard.save_to_file = true;
        config.dashboard.file = path.to_str().unwrap().to_string();
        let (mut frames, _store) = frame_loop(&config);

        frames.step();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_frame_loop_ticks_until_shutdown() {
        let (mut frames, _store) = frame_loop(&config(1000));
        frames.scene_mut().pointer_move(10.0, 10.0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(frames.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();

        let scene = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("frame loop should observe shutdown")
            .unwrap();
        assert!(scene.frames() > 0);
        assert!(!scene.is_hovering());
        assert!(!scene.control().is_dragging());
    }

    #[tokio::test]
    async fn test_click_event_fills_panel_while_running() {
        let config = config(1000);
        let store = Arc::new(TelemetryStore::new(&config.channels, 5, EvictionPolicy::Lockstep));
        let (table_tx, table) = watch::channel(WarehouseTable::default());
        table_tx.send_modify(|table| {
            let records = WarehouseTable::parse_records(&json!({
                "warehouseData": {"2号仓": {"status": "正常", "temperature": 18.0}}
            }))
            .unwrap();
            table.replace(records);
        });

        let scene = SceneContext::new(&config.scene, table);
        let center = scene.scene().find("2号仓").unwrap().bounds.center();
        let (x, y) = scene.screen_position(&center).unwrap();
        let frames = FrameLoop::new(&config, scene, store.subscribe(), Fonts::default());
        let events = frames.events();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(frames.run(shutdown_rx));
        events.send(SceneEvent::Click { x, y }).await.unwrap();
        events.send(SceneEvent::Resize { width: 400, height: 300 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let scene = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("frame loop should observe shutdown")
            .unwrap();
        assert_eq!(scene.panel().name, "2号仓");
        assert_eq!(scene.panel().status, "正常");
        assert_eq!(scene.panel().temperature, "18°C");
        assert_eq!(scene.selected().unwrap().name, "2号仓");
        assert_eq!(scene.viewport().width, 400);
    }

    #[tokio::test]
    async fn test_frame_loop_runs_above_one_thousand_fps() {
        let mut config = config(1000);
        config.scene.frame_rate = 2000;
        let (frames, _store) = frame_loop(&config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(frames.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();

        let scene = handle.await.unwrap();
        assert!(scene.frames() > 0);
    }

    #[test]
    fn test_read_events_stops_when_loop_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        read_events(&b"up\nup\n"[..], tx);
    }

    #[test]
    fn test_read_events_forwards_parsed_lines() {
        let input: &[u8] = b"down 10 20\nbogus\n\nmove 15 20\nup\nclick 3 4\n";
        let (tx, mut rx) = mpsc::channel(8);

        read_events(input, tx);

        let mut received = Vec::new();
        while let Some(event) = rx.blocking_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                SceneEvent::PointerDown { x: 10.0, y: 20.0 },
                SceneEvent::PointerMove { x: 15.0, y: 20.0 },
                SceneEvent::PointerUp,
                SceneEvent::Click { x: 3.0, y: 4.0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_poller_feeds_store_until_shutdown() {
        let mut channels = IndexMap::new();
        channels.insert("temperature".to_string(), "temperature".to_string());
        let store = Arc::new(TelemetryStore::new(&channels, 10, EvictionPolicy::Lockstep));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(poll_latest(
            store.clone(),
            CountingFetcher,
            "mock-boiler".to_string(),
            Duration::from_millis(10),
            shutdown_rx,
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();

        let applied = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller should observe shutdown")
            .unwrap();
        assert!(applied > 0);
        assert_eq!(store.version(), applied);
        assert_eq!(store.snapshot().get("temperature"), Some(&21.5));
        assert_eq!(store.series("temperature").unwrap().latest().unwrap().value, 21.5);
    }

    #[tokio::test]
    async fn test_poller_survives_failures() {
        let store = Arc::new(TelemetryStore::new(&AppConfig::default().channels, 10, EvictionPolicy::Lockstep));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(poll_latest(
            store.clone(),
            FailingFetcher,
            "mock-boiler".to_string(),
            Duration::from_millis(10),
            shutdown_rx,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), 0);
        assert_eq!(store.version(), 0);
    }
}
