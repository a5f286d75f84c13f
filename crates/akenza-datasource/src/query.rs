//! The panel query model.
use akenza_client::Device;
use serde::{Deserialize, Serialize};

/// A panel query target, as saved in the dashboard JSON.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AkenzaQuery {
    /// Selected device id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Denormalised copy of the selected device, kept for its name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    /// Selected topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Selected data key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    /// Whether the query is hidden in the panel.
    #[serde(default, alias = "hidden")]
    pub hide: bool,
}

/// An option of a query editor dropdown.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SelectOption<T> {
    /// Text shown to the user.
    pub label: String,
    /// The value saved in the query.
    pub value: String,
    /// The entity the option stands for.
    pub entity: T,
}

impl SelectOption<Device> {
    /// An option for a device, labelled with its name (or id when unnamed).
    pub fn device(device: Device) -> Self {
        let label = if device.name.is_empty() {
            device.id.clone()
        } else {
            device.name.clone()
        };
        Self {
            label,
            value: device.id.clone(),
            entity: device,
        }
    }
}

impl SelectOption<String> {
    /// An option for a plain string such as a topic or data key.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value: value.clone(),
            entity: value,
        }
    }
}

/// The parts of a query that has everything needed to fetch data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target<'a> {
    /// Device id.
    pub device_id: &'a str,
    /// Name shown in the series name.
    pub device_name: &'a str,
    /// Topic.
    pub topic: &'a str,
    /// Data key.
    pub data_key: &'a str,
}

fn set(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl AkenzaQuery {
    /// The fetchable target, if the query is complete and not hidden.
    pub fn target(&self) -> Option<Target<'_>> {
        if self.hide {
            return None;
        }
        let device_id = set(&self.device_id)?;
        let device_name = self
            .device
            .as_ref()
            .map(|d| d.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(device_id);
        Some(Target {
            device_id,
            device_name,
            topic: set(&self.topic)?,
            data_key: set(&self.data_key)?,
        })
    }
}
