//! Bike command handlers.

use std::collections::HashMap;

use owo_colors::OwoColorize;
use tabled::Tabled;

use mysmartbike_api::DeviceRecord;

use crate::cli::{BikesArgs, BikesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Session;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BikeRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Bike")]
    name: String,
    #[tabled(rename = "Odometer")]
    odometry: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl From<&DeviceRecord> for BikeRow {
    fn from(b: &DeviceRecord) -> Self {
        Self {
            serial: b.serial.clone(),
            name: b.display_name(),
            odometry: format!("{:.1}", b.odometry),
            battery: b
                .state_of_charge
                .map_or_else(|| "-".into(), |v| format!("{v}%")),
            capacity: b
                .remaining_capacity
                .map_or_else(|| "-".into(), |v| v.to_string()),
            last_seen: b.last_position_timestamp.to_string(),
        }
    }
}

fn battery(b: &DeviceRecord, color: bool) -> String {
    let Some(soc) = b.state_of_charge else {
        return "-".into();
    };
    let text = format!("{soc}%");
    if !color {
        return text;
    }
    match soc {
        ..=15 => text.red().to_string(),
        16..=40 => text.yellow().to_string(),
        _ => text.green().to_string(),
    }
}

fn detail(b: &DeviceRecord, color: bool) -> String {
    [
        format!("Serial:    {}", b.serial),
        format!("Brand:     {}", b.brand),
        format!("Model:     {}", b.model),
        format!("Odometer:  {:.1}", b.odometry),
        format!("Battery:   {}", battery(b, color)),
        format!(
            "Capacity:  {}",
            b.remaining_capacity
                .map_or_else(|| "-".into(), |v| v.to_string())
        ),
        format!(
            "Position:  {}",
            b.position()
                .map_or_else(|| "-".into(), |(lat, lon)| format!("{lat:.5}, {lon:.5}"))
        ),
        format!("Last Seen: {}", b.last_position_timestamp),
    ]
    .join("\n")
}

/// Stable, serial-sorted view of the mapping.
fn sorted(devices: HashMap<String, DeviceRecord>) -> Vec<DeviceRecord> {
    let mut bikes: Vec<DeviceRecord> = devices.into_values().collect();
    bikes.sort_by(|a, b| a.serial.cmp(&b.serial));
    bikes
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: BikesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.authenticate().await?;

    let devices = session
        .client
        .get_device_list_with(session.cancel.clone())
        .await
        .map_err(|e| CliError::from_api(e, &session.profile_name))?;

    match args.command {
        BikesCommand::List => {
            let bikes = sorted(devices);
            let out = output::render_list(
                &global.output,
                &bikes,
                |b| BikeRow::from(b),
                |b| b.serial.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BikesCommand::Get { serial } => {
            let bike = devices
                .get(&serial)
                .ok_or_else(|| CliError::NotFound { serial: serial.clone() })?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                bike,
                |b| detail(b, color),
                |b| b.serial.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
