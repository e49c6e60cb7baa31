// Device mapping
//
// Pure translation of one `objects/me` payload into serial -> record.
// Any malformed entry fails the whole payload; there are no partial results.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Error;
use crate::models::{DeviceRecord, RawDevice};

/// Format of `last_position_date`, e.g. `2024-01-01 10:00:00`.
pub const POSITION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Map a list payload (`{ "status": 200, "data": [...] }`) to records keyed by serial.
///
/// A serial that appears twice keeps the later entry.
pub fn map_devices(payload: &Value) -> Result<HashMap<String, DeviceRecord>, Error> {
    let entries = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Deserialization {
            message: "payload has no `data` array".into(),
            body: payload.to_string(),
        })?;

    let mut devices = HashMap::with_capacity(entries.len());
    for entry in entries {
        let record = map_device(entry)?;
        trace!(serial = %record.serial, "mapped device");
        devices.insert(record.serial.clone(), record);
    }
    Ok(devices)
}

fn map_device(entry: &Value) -> Result<DeviceRecord, Error> {
    let raw = RawDevice::deserialize(entry).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: entry.to_string(),
    })?;

    let mut state_of_charge = None;
    let mut remaining_capacity = None;
    for node in &raw.object_tree {
        if let Some(value) = node.get("state_of_charge") {
            apply_integer(&raw.serial, "state_of_charge", value, &mut state_of_charge);
        }
        if let Some(value) = node.get("remaining_capacity") {
            apply_integer(&raw.serial, "remaining_capacity", value, &mut remaining_capacity);
        }
    }

    let last_position_timestamp =
        NaiveDateTime::parse_from_str(&raw.last_position_date, POSITION_DATE_FORMAT).map_err(
            |source| Error::InvalidTimestamp {
                value: raw.last_position_date.clone(),
                source,
            },
        )?;

    Ok(DeviceRecord {
        serial: raw.serial,
        odometry: raw.odometry,
        brand: raw.object_model.brand.alias,
        model: raw.object_model.model_name,
        longitude: raw.longitude,
        latitude: raw.latitude,
        last_position_timestamp,
        state_of_charge,
        remaining_capacity,
    })
}

/// Fold one telemetry node into `slot`.
///
/// Integers and whole floats (`80.0`) overwrite, `null` clears. Anything
/// else is skipped so an earlier valid value survives.
fn apply_integer(serial: &str, key: &str, value: &Value, slot: &mut Option<i64>) {
    if value.is_null() {
        *slot = None;
        return;
    }
    match as_integer(value) {
        Some(v) => *slot = Some(v),
        None => debug!(serial, key, %value, "ignoring non-integer telemetry value"),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}
