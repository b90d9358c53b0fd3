//! Side panels: per-vehicle sensor cards and the transient alert list.
//!
//! Both panels are plain display state. Rendering is a pure function of
//! the snapshot handed in - re-rendering the same input produces the
//! same panel contents, never an accumulation.

use crate::telemetry::{sorted_entries, Snapshot};
use serde::Serialize;
use tracing::warn;

/// Label substituted for a sensor reading that is absent this cycle.
pub const VALUE_PLACEHOLDER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleCard {
    pub vehicle_id: String,
    pub fuel: String,
    pub temperature: String,
    pub position: String,
}

/// Panel showing sensor readings, either for the whole fleet (periodic
/// refresh) or for one vehicle (marker click). Same rule either way.
#[derive(Default)]
pub struct SensorPanel {
    cards: Vec<VehicleCard>,
}

impl SensorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &Snapshot) {
        self.cards.clear();
        for (id, state) in sorted_entries(snapshot) {
            let Some((latitude, longitude)) = state.position() else {
                warn!("no gps fix for vehicle {id}, skipping sensor card");
                continue;
            };
            self.cards.push(VehicleCard {
                vehicle_id: id.clone(),
                fuel: state
                    .fuel_level
                    .map(|v| format!("{v}%"))
                    .unwrap_or_else(|| VALUE_PLACEHOLDER.into()),
                temperature: state
                    .temperature
                    .map(|v| format!("{v} °C"))
                    .unwrap_or_else(|| VALUE_PLACEHOLDER.into()),
                position: format!("lat {latitude}, lon {longitude}"),
            });
        }
    }

    pub fn cards(&self) -> &[VehicleCard] {
        &self.cards
    }
}

/// Transient alert lines for the current cycle only; the durable record
/// lives in the alert history, not here.
#[derive(Default)]
pub struct AlertsPanel {
    lines: Vec<String>,
}

impl AlertsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn push_line(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
