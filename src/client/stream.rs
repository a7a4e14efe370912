use futures_util::StreamExt;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::models::WarehouseTable;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Receiver of decoded inbound stream messages.
pub trait MessageHandler: Send + Sync {
    fn handle_message(&self, message: &Value);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// `None` retries forever; `Some(0)` never reconnects.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn never() -> Self {
        Self {
            max_attempts: Some(0),
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

/// Geometric delay sequence capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    /// Delay before the next reconnect, or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }

        let factor = self.policy.multiplier.max(1.0).powi(self.attempt.min(i32::MAX as u32) as i32);
        let secs = (self.policy.initial_delay.as_secs_f64() * factor).min(self.policy.max_delay.as_secs_f64());
        self.attempt = self.attempt.saturating_add(1);
        Some(Duration::from_secs_f64(secs))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

/// Inbound-only WebSocket client that reconnects per its policy.
pub struct StreamListener {
    name: String,
    url: String,
    policy: ReconnectPolicy,
    handler: Arc<dyn MessageHandler>,
}

impl StreamListener {
    pub fn new(name: &str, url: &str, policy: ReconnectPolicy, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            policy,
            handler,
        }
    }

    /// Runs until the shutdown flag flips or the policy gives up.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = self.policy.backoff();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let result = tokio::select! {
                result = self.session(&mut backoff) => result,
                _ = shutdown.changed() => break,
            };

            match result {
                Ok(()) => info!("[{}] WebSocket connection closed", self.name),
                Err(e) => error!("[{}] WebSocket error: {}", self.name, e),
            }

            let Some(delay) = backoff.next_delay() else {
                warn!(
                    "[{}] Giving up on {} after {} reconnect attempts",
                    self.name,
                    self.url,
                    backoff.attempts()
                );
                break;
            };

            info!("[{}] Reconnecting in {} ms", self.name, delay.as_millis());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        debug!("[{}] listener stopped", self.name);
    }

    async fn session(&self, backoff: &mut Backoff) -> Result<(), StreamError> {
        let (mut ws_stream, _) = connect_async(self.url.as_str()).await?;
        info!("[{}] WebSocket connection opened: {}", self.name, self.url);
        backoff.reset();

        while let Some(item) = ws_stream.next().await {
            match item? {
                Message::Text(text) => self.dispatch(&text),
                Message::Close(frame) => {
                    debug!("[{}] close frame: {:?}", self.name, frame);
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => {
                debug!("[{}] received: {}", self.name, message);
                self.handler.handle_message(&message);
            }
            Err(e) => warn!("[{}] Ignoring undecodable message: {}", self.name, e),
        }
    }
}

/// Handler that swaps the warehouse lookup table on every message carrying
/// `warehouseData`.
pub struct WarehouseFeed {
    table: watch::Sender<WarehouseTable>,
}

impl Default for WarehouseFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl WarehouseFeed {
    pub fn new() -> Self {
        let (table, _) = watch::channel(WarehouseTable::default());
        Self { table }
    }

    pub fn subscribe(&self) -> watch::Receiver<WarehouseTable> {
        self.table.subscribe()
    }

    pub fn table(&self) -> WarehouseTable {
        self.table.borrow().clone()
    }
}

impl MessageHandler for WarehouseFeed {
    fn handle_message(&self, message: &Value) {
        match WarehouseTable::parse_records(message) {
            Some(records) => {
                debug!("Warehouse table replaced with {} records", records.len());
                self.table.send_modify(|table| table.replace(records));
            }
            None => debug!("Message without warehouse data ignored"),
        }
    }
}
