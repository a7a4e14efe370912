use serde_json::{Map, Value};

use crate::models::TelemetrySnapshot;

/// Keys that may carry the reading object of a payload.
const VALUE_KEYS: [&str; 2] = ["values", "值"];

fn values_object(payload: &Value) -> Option<&Map<String, Value>> {
    VALUE_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_object))
}

/// Numeric fields of the payload's reading object; anything else is dropped.
pub fn snapshot_from(payload: &Value) -> TelemetrySnapshot {
    values_object(payload)
        .map(|values| {
            values
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

/// Top-level fields of a flat body that describe the reading, not a channel.
const METADATA_KEYS: [&str; 5] = ["timestamp", "time", "ts", "deviceId", "device_id"];

/// Fold a flat response body (`{"temperature": .., "pressure": ..}`) into the
/// `{"values": {..}}` shape. Bodies that already carry a reading object are
/// returned untouched.
pub fn normalize_response(body: Value) -> Value {
    if values_object(&body).is_some() {
        return body;
    }
    let values: Map<String, Value> = match body.as_object() {
        Some(fields) => fields
            .iter()
            .filter(|(k, v)| v.is_number() && !METADATA_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        None => Map::new(),
    };
    let mut wrapped = Map::new();
    wrapped.insert("values".to_string(), Value::Object(values));
    Value::Object(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_from_values() {
        let snapshot = snapshot_from(&json!({"values": {"温度": 22.5, "压力": 101.3, "status": "ok"}}));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["温度"], 22.5);
        assert_eq!(snapshot["压力"], 101.3);
    }

    #[test]
    fn test_snapshot_from_chinese_key() {
        let snapshot = snapshot_from(&json!({"值": {"温度": 20}}));
        assert_eq!(snapshot["温度"], 20.0);
    }

    #[test]
    fn test_malformed_payloads_yield_empty_snapshot() {
        assert!(snapshot_from(&json!(null)).is_empty());
        assert!(snapshot_from(&json!([1, 2, 3])).is_empty());
        assert!(snapshot_from(&json!({"values": "nope"})).is_empty());
        assert!(snapshot_from(&json!({"other": {"温度": 1}})).is_empty());
    }

    #[test]
    fn test_normalize_flat_body() {
        let body = json!({"temperature": 55.2, "pressure": 0.8, "deviceId": "mock-boiler", "timestamp": 1700000000000u64});
        let normalized = normalize_response(body);
        let snapshot = snapshot_from(&normalized);
        assert_eq!(snapshot["temperature"], 55.2);
        assert_eq!(snapshot["pressure"], 0.8);
        assert!(!snapshot.contains_key("deviceId"));
        assert!(!snapshot.contains_key("timestamp"));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_normalize_skips_numeric_metadata() {
        let body = json!({"deviceId": 7, "ts": 1700000000, "time": 12.0, "flow": 3.5});
        let snapshot = snapshot_from(&normalize_response(body));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["flow"], 3.5);
    }

    #[test]
    fn test_normalize_keeps_wrapped_body() {
        let body = json!({"values": {"温度": 1.0}, "temperature": 99.0});
        assert_eq!(normalize_response(body.clone()), body);
    }
}
