use serde::{Deserialize, Serialize};

/// Stable identity of one browser/device instance for a venue.
///
/// Injected explicitly wherever it is needed instead of being read from
/// ambient storage, so two sessions in one process stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: String,
    /// Operator-facing label ("bar kiosk", "back-office admin")
    pub label: Option<String>,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: None,
        }
    }

    pub fn with_label(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: Some(label.into()),
        }
    }
}
