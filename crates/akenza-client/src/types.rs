//! Wire types of the Akenza REST API.
use serde::{Deserialize, Serialize};

/// A page of results from a listing endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The items on this page.
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Total number of matching items, when reported.
    #[serde(default)]
    pub total_elements: Option<u64>,
}

/// An Akenza organization. Only the fields requested with `minimal=true` are kept.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Organization {
    /// Organization id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// The workspaces an API key may read assets from.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct WorkspaceAccess {
    /// Whether the key can access every workspace of the organization.
    pub all: bool,
    /// The accessible workspaces, when `all` is false.
    #[serde(default)]
    pub ids: Vec<String>,
}

/// A device, projected to the fields the plugin uses.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Device {
    /// Device id.
    pub id: String,
    /// Display name, empty when the device has none.
    #[serde(default)]
    pub name: String,
}

/// One record returned by the device query endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Device the record belongs to.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Time the record was received.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Topic the record was published on.
    #[serde(default)]
    pub topic: Option<String>,
    /// The record payload, usually an object of data keys.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A single `(value, timestamp)` sample.
///
/// Serialized as the two-element array `[value, "<iso timestamp>"]`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TimeSeriesPoint(pub f64, pub String);

impl TimeSeriesPoint {
    /// The sampled value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// The ISO 8601 timestamp of the sample.
    pub fn timestamp(&self) -> &str {
        &self.1
    }
}

/// The response of the time-series endpoint.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesData {
    /// The samples, in chronological order.
    #[serde(default)]
    pub data_points: Vec<TimeSeriesPoint>,
    /// The data key the samples belong to.
    #[serde(default)]
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_series_points_are_pairs() {
        let data: TimeSeriesData = serde_json::from_str(
            r#"{"dataPoints":[[10,"2024-01-01T00:00:00Z"],[20.5,"2024-01-01T00:01:00Z"]],"key":"temperature"}"#,
        )
        .unwrap();
        assert_eq!(data.data_points.len(), 2);
        assert_eq!(data.data_points[0].value(), 10.0);
        assert_eq!(data.data_points[1].timestamp(), "2024-01-01T00:01:00Z");
        assert_eq!(data.key.as_deref(), Some("temperature"));
    }

    #[test]
    fn pages_tolerate_missing_content() {
        let page: Page<Device> = serde_json::from_str("{}").unwrap();
        assert!(page.content.is_empty());
    }

    #[test]
    fn unnamed_devices_are_listed() {
        let page: Page<Device> =
            serde_json::from_str(r#"{"content":[{"id":"d1","name":"Sensor A"},{"id":"d2"}]}"#)
                .unwrap();
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[1].id, "d2");
        assert_eq!(page.content[1].name, "");
    }
}
