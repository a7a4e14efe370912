pub mod telemetry;
pub mod warehouse;

pub use telemetry::{HistorySeries, Sample, TelemetrySnapshot};
pub use warehouse::{InfoPanel, WarehouseRecord, WarehouseTable};
