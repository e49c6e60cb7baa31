// MySmartBike response types
//
// `DeviceRecord` is the stable shape handed to callers. The `Raw*` structs
// mirror the vendor's `objects/me` payload and only exist for mapping.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Public record ────────────────────────────────────────────────────

/// One bike, rebuilt from scratch on every successful list call.
///
/// Identity is `serial` only; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub serial: String,
    /// Cumulative distance as reported by the vendor.
    pub odometry: f64,
    pub brand: String,
    pub model: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub last_position_timestamp: NaiveDateTime,
    /// Battery state of charge in percent.
    pub state_of_charge: Option<i64>,
    pub remaining_capacity: Option<i64>,
}

impl DeviceRecord {
    /// `"brand model"`, for display.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    /// `(latitude, longitude)` when both are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

// ── Wire types ───────────────────────────────────────────────────────

/// A device entry in the `data` array of `GET /api/v1/objects/me`.
///
/// Required fields are non-optional so a missing one fails the mapping.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDevice {
    pub serial: String,
    pub odometry: f64,
    pub object_model: RawObjectModel,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    pub last_position_date: String,
    /// Heterogeneous nodes; telemetry is located by key presence.
    pub object_tree: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawObjectModel {
    pub brand: RawBrand,
    pub model_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBrand {
    pub alias: String,
}
