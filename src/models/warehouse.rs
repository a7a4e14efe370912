use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub grain_type: Option<String>,
}

/// Name-keyed side data pushed by the sensor stream.
///
/// The whole table is swapped on every message that carries one; records are
/// never merged field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarehouseTable {
    pub records: IndexMap<String, WarehouseRecord>,
    pub version: u64,
}

impl WarehouseTable {
    pub fn get(&self, name: &str) -> Option<&WarehouseRecord> {
        self.records.get(name)
    }

    pub fn replace(&mut self, records: IndexMap<String, WarehouseRecord>) {
        self.records = records;
        self.version += 1;
    }

    /// Decode the `warehouseData` object of a stream message.
    ///
    /// Returns `None` when the message has no such field or it is not an
    /// object. Entries that fail to decode are skipped.
    pub fn parse_records(message: &Value) -> Option<IndexMap<String, WarehouseRecord>> {
        let data = message.get("warehouseData")?.as_object()?;
        let mut records = IndexMap::with_capacity(data.len());
        for (name, raw) in data {
            match WarehouseRecord::deserialize(raw) {
                Ok(record) => {
                    records.insert(name.clone(), record);
                }
                Err(e) => debug!("Skipping warehouse entry {}: {}", name, e),
            }
        }
        Some(records)
    }
}

/// Display fields of the side panel.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoPanel {
    pub name: String,
    pub temperature: String,
    pub humidity: String,
    pub status: String,
    pub grain_type: String,
}

impl Default for InfoPanel {
    fn default() -> Self {
        Self {
            name: PLACEHOLDER.to_string(),
            temperature: format!("{}°C", PLACEHOLDER),
            humidity: format!("{}%", PLACEHOLDER),
            status: PLACEHOLDER.to_string(),
            grain_type: PLACEHOLDER.to_string(),
        }
    }
}

impl InfoPanel {
    pub fn for_warehouse(name: &str, record: Option<&WarehouseRecord>) -> Self {
        let record = record.cloned().unwrap_or_default();
        Self {
            name: name.to_string(),
            temperature: match record.temperature {
                Some(t) => format!("{}°C", t),
                None => format!("{}°C", PLACEHOLDER),
            },
            humidity: match record.humidity {
                Some(h) => format!("{}%", h),
                None => format!("{}%", PLACEHOLDER),
            },
            status: record.status.unwrap_or_else(|| PLACEHOLDER.to_string()),
            grain_type: record.grain_type.unwrap_or_else(|| PLACEHOLDER.to_string()),
        }
    }

    pub fn lines(&self) -> [(&'static str, &str); 5] {
        [
            ("Name", self.name.as_str()),
            ("Temp", self.temperature.as_str()),
            ("Humidity", self.humidity.as_str()),
            ("Status", self.status.as_str()),
            ("Grain", self.grain_type.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_records() {
        let message = json!({
            "warehouseData": {
                "1号仓": {"name": "1号仓", "status": "正常", "grainType": "小麦", "temperature": 18.5, "humidity": 55.0},
                "2号仓": {"name": "2号仓", "grainType": "玉米"},
                "3号仓": {"temperature": "hot"}
            }
        });

        let records = WarehouseTable::parse_records(&message).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["1号仓"].grain_type.as_deref(), Some("小麦"));
        assert_eq!(records["1号仓"].temperature, Some(18.5));
        assert_eq!(records["2号仓"].humidity, None);
        assert!(!records.contains_key("3号仓"));
    }

    #[test]
    fn test_parse_records_without_field() {
        assert!(WarehouseTable::parse_records(&json!({"values": {}})).is_none());
        assert!(WarehouseTable::parse_records(&json!({"warehouseData": 3})).is_none());
    }

    #[test]
    fn test_replace_bumps_version_and_drops_old_entries() {
        let mut table = WarehouseTable::default();
        let mut first = IndexMap::new();
        first.insert("1号仓".to_string(), WarehouseRecord::default());
        table.replace(first);

        let mut second = IndexMap::new();
        second.insert("2号仓".to_string(), WarehouseRecord::default());
        table.replace(second);

        assert_eq!(table.version, 2);
        assert!(table.get("1号仓").is_none());
        assert!(table.get("2号仓").is_some());
    }

    #[test]
    fn test_panel_for_full_record() {
        let record = WarehouseRecord {
            name: Some("1号仓".to_string()),
            temperature: Some(22.5),
            humidity: Some(60.0),
            status: Some("正常".to_string()),
            grain_type: Some("小麦".to_string()),
        };
        let panel = InfoPanel::for_warehouse("1号仓", Some(&record));
        assert_eq!(panel.name, "1号仓");
        assert_eq!(panel.temperature, "22.5°C");
        assert_eq!(panel.humidity, "60%");
        assert_eq!(panel.status, "正常");
        assert_eq!(panel.grain_type, "小麦");
    }

    #[test]
    fn test_panel_placeholders_without_record() {
        let panel = InfoPanel::for_warehouse("5号仓", None);
        assert_eq!(panel.name, "5号仓");
        assert_eq!(panel.temperature, "--°C");
        assert_eq!(panel.humidity, "--%");
        assert_eq!(panel.status, "--");
        assert_eq!(panel.grain_type, "--");
    }

    #[test]
    fn test_panel_placeholders_for_missing_fields() {
        let record = WarehouseRecord {
            humidity: Some(48.25),
            ..Default::default()
        };
        let panel = InfoPanel::for_warehouse("3号仓", Some(&record));
        assert_eq!(panel.temperature, "--°C");
        assert_eq!(panel.humidity, "48.25%");
        assert_eq!(panel.status, "--");
    }
}
