use anyhow::{Context, Result};
use config::{Config, File};
use indexmap::IndexMap;
use log::{debug, info, LevelFilter};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::client::stream::ReconnectPolicy;
use crate::store::EvictionPolicy;

fn deserialize_eviction<'de, D>(deserializer: D) -> Result<EvictionPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

// INI has no null, so an empty value means "unset"
fn deserialize_optional_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<u32>().map(Some).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub device_id: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            device_id: "mock-boiler".to_string(),
            poll_interval_ms: 1000,
            timeout_ms: 2000,
        }
    }
}

impl ServerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub sensor_url: String,
    pub telemetry_url: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sensor_url: "ws://localhost/ws/sensor".to_string(),
            telemetry_url: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    #[serde(deserialize_with = "deserialize_optional_u32")]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    #[serde(deserialize_with = "deserialize_eviction")]
    pub eviction: EvictionPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 60,
            eviction: EvictionPolicy::Lockstep,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    pub radius: f64,
    pub fov: f64,
    pub frame_rate: u32,
    pub drag_sensitivity: f64,
    /// Starting camera elevation, degrees.
    pub initial_elevation: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 560,
            height: 480,
            radius: 150.0,
            fov: 60.0,
            frame_rate: 30,
            drag_sensitivity: 0.01,
            initial_elevation: 45.0,
        }
    }
}

impl SceneConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis((1000 / u64::from(self.frame_rate.max(1))).max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub file: String,
    pub enabled: bool,
    pub save_to_file: bool,
    pub render_every: u32,
    pub panel_width: u32,
    pub font: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            file: "dashboard.png".to_string(),
            enabled: true,
            save_to_file: false,
            render_every: 30,
            panel_width: 280,
            font: "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channels() -> IndexMap<String, String> {
    let mut channels = IndexMap::new();
    channels.insert("温度".to_string(), "temperature".to_string());
    channels.insert("压力".to_string(), "pressure".to_string());
    channels.insert("temperature".to_string(), "temperature".to_string());
    channels.insert("pressure".to_string(), "pressure".to_string());
    channels
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Payload field alias -> history series name.
    #[serde(default = "default_channels")]
    pub channels: IndexMap<String, String>,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            stream: StreamConfig::default(),
            reconnect: ReconnectConfig::default(),
            history: HistoryConfig::default(),
            channels: default_channels(),
            scene: SceneConfig::default(),
            dashboard: DashboardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::from_file("config.ini")
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(File::from(config_path).format(config::FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();

        let mut config_str = String::new();

        config_str.push_str(&format!(
            "[server]\nbase_url = {}\ndevice_id = {}\npoll_interval_ms = {}\ntimeout_ms = {}\n\n",
            self.server.base_url,
            self.server.device_id,
            self.server.poll_interval_ms,
            self.server.timeout_ms
        ));

        config_str.push_str(&format!(
            "[stream]\nsensor_url = {}\ntelemetry_url = {}\n\n",
            self.stream.sensor_url, self.stream.telemetry_url
        ));

        config_str.push_str(&format!(
            "[reconnect]\ninitial_delay_ms = {}\nmax_delay_ms = {}\nmultiplier = {:?}\nmax_attempts = {}\n\n",
            self.reconnect.initial_delay_ms,
            self.reconnect.max_delay_ms,
            self.reconnect.multiplier,
            self.reconnect
                .max_attempts
                .map(|n| n.to_string())
                .unwrap_or_default()
        ));

        config_str.push_str(&format!(
            "[history]\ncapacity = {}\neviction = {}\n\n",
            self.history.capacity, self.history.eviction
        ));

        if !self.channels.is_empty() {
            config_str.push_str("[channels]\n");
            for (alias, series) in &self.channels {
                config_str.push_str(&format!("{} = {}\n", alias, series));
            }
            config_str.push('\n');
        }

        config_str.push_str(&format!(
            "[scene]\nwidth = {}\nheight = {}\nradius = {:?}\nfov = {:?}\nframe_rate = {}\ndrag_sensitivity = {:?}\ninitial_elevation = {:?}\n\n",
            self.scene.width,
            self.scene.height,
            self.scene.radius,
            self.scene.fov,
            self.scene.frame_rate,
            self.scene.drag_sensitivity,
            self.scene.initial_elevation
        ));

        config_str.push_str(&format!(
            "[dashboard]\nfile = {}\nenabled = {}\nsave_to_file = {}\nrender_every = {}\npanel_width = {}\nfont = {}\n\n",
            self.dashboard.file,
            self.dashboard.enabled,
            self.dashboard.save_to_file,
            self.dashboard.render_every,
            self.dashboard.panel_width,
            self.dashboard.font
        ));

        config_str.push_str(&format!("[logging]\nlevel = {}\n", self.logging.level));

        fs::write(config_path, config_str)
            .context(format!("Failed to save config to {}", config_path.display()))?;

        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.server.device_id, "mock-boiler");
        assert_eq!(config.stream.sensor_url, "ws://localhost/ws/sensor");
        assert!(config.stream.telemetry_url.is_empty());
        assert_eq!(config.history.capacity, 60);
        assert_eq!(config.history.eviction, EvictionPolicy::Lockstep);
        assert_eq!(config.scene.radius, 150.0);
        assert_eq!(config.scene.fov, 60.0);
        assert_eq!(config.reconnect.max_attempts, None);
        assert_eq!(config.channels.get("温度").map(String::as_str), Some("temperature"));
        assert_eq!(config.channels.get("压力").map(String::as_str), Some("pressure"));
    }

    #[test]
    fn test_from_file() {
        let temp_file = write_config(
            "[server]\nbase_url = http://plant:9000\ndevice_id = boiler-7\npoll_interval_ms = 250\n\n\
             [history]\ncapacity = 10\neviction = independent\n\n\
             [reconnect]\ninitial_delay_ms = 100\nmax_attempts = 3\n\n\
             [scene]\nwidth = 800\nheight = 600\n",
        );

        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.base_url, "http://plant:9000");
        assert_eq!(config.server.device_id, "boiler-7");
        assert_eq!(config.server.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.server.timeout_ms, 2000);
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.history.eviction, EvictionPolicy::Independent);
        assert_eq!(config.reconnect.initial_delay_ms, 100);
        assert_eq!(config.reconnect.max_attempts, Some(3));
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
        assert_eq!(config.scene.width, 800);
        assert_eq!(config.scene.height, 600);
        assert_eq!(config.scene.radius, 150.0);
        assert_eq!(config.dashboard.render_every, 30);
    }

    #[test]
    fn test_invalid_eviction_is_rejected() {
        let temp_file = write_config("[history]\neviction = sometimes\n");
        assert!(AppConfig::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_save_config() {
        let mut config = AppConfig::default();
        config.server.device_id = "press-2".to_string();
        config.server.poll_interval_ms = 5000;
        config.stream.telemetry_url = "ws://localhost/ws/data/press-2".to_string();
        config.reconnect.max_attempts = Some(0);
        config.reconnect.multiplier = 1.5;
        config.history.capacity = 120;
        config.history.eviction = EvictionPolicy::Independent;
        config.scene.frame_rate = 10;
        config.scene.initial_elevation = 30.0;
        config.dashboard.save_to_file = true;
        config.logging.level = "debug".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        let config_path = temp_file.path();

        config.save(config_path).unwrap();

        let loaded = AppConfig::from_file(config_path).unwrap();

        assert_eq!(loaded.server.device_id, "press-2");
        assert_eq!(loaded.server.poll_interval_ms, 5000);
        assert_eq!(loaded.stream.telemetry_url, "ws://localhost/ws/data/press-2");
        assert_eq!(loaded.reconnect.max_attempts, Some(0));
        assert_eq!(loaded.reconnect.multiplier, 1.5);
        assert_eq!(loaded.history.capacity, 120);
        assert_eq!(loaded.history.eviction, EvictionPolicy::Independent);
        assert_eq!(loaded.scene.frame_rate, 10);
        assert_eq!(loaded.scene.initial_elevation, 30.0);
        assert!(loaded.dashboard.save_to_file);
        assert_eq!(loaded.get_log_level(), LevelFilter::Debug);
        assert_eq!(loaded.channels.len(), config.channels.len());
        assert_eq!(loaded.channels.get("压力").map(String::as_str), Some("pressure"));
    }

    #[test]
    fn test_frame_interval_is_never_zero() {
        let mut scene = SceneConfig::default();
        assert_eq!(scene.frame_interval(), Duration::from_millis(33));

        scene.frame_rate = 2000;
        assert_eq!(scene.frame_interval(), Duration::from_millis(1));

        scene.frame_rate = 0;
        assert_eq!(scene.frame_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_log_level_falls_back_to_info() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert_eq!(config.get_log_level(), LevelFilter::Info);
    }
}
