//! Flight data loading from JSON files.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use uav_core::{Mission, OtherTrajectory};

/// Load the primary mission and the simulated traffic.
pub fn load_flight_data(
    primary_file: &Path,
    simulated_file: &Path,
) -> Result<(Mission, Vec<OtherTrajectory>)> {
    let primary = fs::read_to_string(primary_file)
        .with_context(|| format!("failed to read {}", primary_file.display()))?;
    let simulated = fs::read_to_string(simulated_file)
        .with_context(|| format!("failed to read {}", simulated_file.display()))?;

    let mission = parse_primary(&primary)
        .with_context(|| format!("invalid primary mission in {}", primary_file.display()))?;
    let others = parse_simulated(&simulated)
        .with_context(|| format!("invalid simulated drones in {}", simulated_file.display()))?;

    tracing::info!(
        primary_waypoints = mission.current().len(),
        simulated_drones = others.len(),
        "flight data loaded"
    );
    Ok((mission, others))
}

/// Parse `{ "waypoints": [[x, y, z], ...], "times": [...] }` with an
/// optional `"id"`.
pub fn parse_primary(json: &str) -> Result<Mission> {
    let mut value: Value = serde_json::from_str(json)?;
    stringify_id(&mut value);
    Ok(serde_json::from_value(value)?)
}

/// Parse an array of `{ "id", "waypoints", "times" }` entries. Numeric ids
/// are accepted and kept as their decimal text.
pub fn parse_simulated(json: &str) -> Result<Vec<OtherTrajectory>> {
    let mut value: Value = serde_json::from_str(json)?;
    let entries = value
        .as_array_mut()
        .context("simulated drones must be a JSON array")?;
    for entry in entries.iter_mut() {
        stringify_id(entry);
    }
    Ok(serde_json::from_value(value)?)
}

fn stringify_id(entry: &mut Value) {
    if let Some(id) = entry.get_mut("id") {
        if id.is_number() {
            *id = Value::String(id.to_string());
        }
    }
}
