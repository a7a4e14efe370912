use indexmap::IndexMap;
use log::{debug, error, warn};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tokio::sync::watch;

use crate::client::http::{FetchError, LatestFetcher};
use crate::client::stream::MessageHandler;
use crate::models::{HistorySeries, TelemetrySnapshot};

pub mod payload;

/// How the history buffers are trimmed once one of them overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Drop the oldest sample of every tracked series together.
    Lockstep,
    /// Drop only from the series that overflowed.
    Independent,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lockstep" => Ok(EvictionPolicy::Lockstep),
            "independent" => Ok(EvictionPolicy::Independent),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lockstep => write!(f, "lockstep"),
            EvictionPolicy::Independent => write!(f, "independent"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub version: u64,
    pub snapshot: TelemetrySnapshot,
    pub history: IndexMap<String, HistorySeries>,
}

#[derive(Debug, Clone)]
struct TrackedSeries {
    name: String,
    aliases: Vec<String>,
}

/// Latest readings plus bounded history, observable through a watch channel.
pub struct TelemetryStore {
    tracked: Vec<TrackedSeries>,
    eviction: EvictionPolicy,
    state: watch::Sender<StoreState>,
}

fn now_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

impl TelemetryStore {
    /// `channels` maps payload field aliases to series names. Series keep the
    /// order in which they first appear.
    pub fn new(channels: &IndexMap<String, String>, capacity: usize, eviction: EvictionPolicy) -> Self {
        let mut tracked: Vec<TrackedSeries> = Vec::new();
        for (alias, series) in channels {
            match tracked.iter_mut().find(|t| &t.name == series) {
                Some(t) => t.aliases.push(alias.clone()),
                None => tracked.push(TrackedSeries {
                    name: series.clone(),
                    aliases: vec![alias.clone()],
                }),
            }
        }

        let history = tracked
            .iter()
            .map(|t| (t.name.clone(), HistorySeries::new(capacity)))
            .collect();

        let (state, _) = watch::channel(StoreState {
            version: 0,
            snapshot: TelemetrySnapshot::new(),
            history,
        });

        Self {
            tracked,
            eviction,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn series(&self, name: &str) -> Option<HistorySeries> {
        self.state.borrow().history.get(name).cloned()
    }

    /// Push variant: apply a decoded message, labelled with the local time.
    pub fn update(&self, payload: &Value) {
        self.update_with_label(payload, &now_label());
    }

    pub fn update_with_label(&self, payload: &Value, label: &str) {
        let snapshot = payload::snapshot_from(payload);
        if snapshot.is_empty() {
            debug!("Payload carried no numeric readings");
        }

        self.state.send_modify(|state| {
            for tracked in &self.tracked {
                let reading = tracked
                    .aliases
                    .iter()
                    .find_map(|alias| snapshot.get(alias).copied());
                if let (Some(value), Some(series)) = (reading, state.history.get_mut(&tracked.name)) {
                    series.push(label, value);
                }
            }
            evict(&mut state.history, self.eviction);
            state.snapshot = snapshot;
            state.version += 1;
        });
    }

    /// Pull variant: fetch the latest reading for `device_id`.
    ///
    /// Any failure is logged and leaves the current state as it was. Returns
    /// whether the store was updated.
    pub async fn refresh<F: LatestFetcher>(&self, fetcher: &F, device_id: &str) -> bool {
        let start = Instant::now();
        let result = fetcher.fetch_latest(device_id).await;
        debug!("fetch_latest took: {} ms", start.elapsed().as_millis());

        match result {
            Ok(body) => {
                self.update(&payload::normalize_response(body));
                true
            }
            Err(FetchError::Status(status)) => {
                warn!("No data for {}: server answered {}", device_id, status);
                false
            }
            Err(e) => {
                error!("Failed to fetch latest data for {}: {}", device_id, e);
                false
            }
        }
    }
}

impl MessageHandler for TelemetryStore {
    fn handle_message(&self, message: &Value) {
        self.update(message);
    }
}

fn evict(history: &mut IndexMap<String, HistorySeries>, policy: EvictionPolicy) {
    match policy {
        EvictionPolicy::Lockstep => {
            while history.values().any(HistorySeries::is_over_capacity) {
                for series in history.values_mut() {
                    series.pop_oldest();
                }
            }
        }
        EvictionPolicy::Independent => {
            for series in history.values_mut() {
                while series.is_over_capacity() {
                    series.pop_oldest();
                }
            }
        }
    }
}
