//! Marker reconciliation: make the displayed marker set match the
//! latest snapshot, nothing more and nothing less.
//!
//! The whole marker set is torn down and rebuilt every cycle. At a 1 s
//! poll interval marker continuity doesn't matter, and rebuilding keeps
//! the reconciler free of any cross-cycle marker identity. A keyed
//! add/update/remove diff would be a drop-in replacement if smoother
//! popups ever matter.

use crate::dashboard::{Shared, SharedMap};
use crate::map::Marker;
use crate::panels::SensorPanel;
use crate::telemetry::{sorted_entries, Snapshot};
use tracing::{debug, warn};

pub const TRUCK_ICON_URL: &str = "https://img.icons8.com/ios-filled/50/000000/truck.png";

pub struct MarkerReconciler {
    icon_url: String,
}

impl Default for MarkerReconciler {
    fn default() -> Self {
        Self {
            icon_url: TRUCK_ICON_URL.to_string(),
        }
    }
}

impl MarkerReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// After this returns, the map shows exactly one marker per vehicle
    /// in `snapshot` with a usable fix. Clicking a marker renders that
    /// vehicle alone into the sensor panel.
    pub fn reconcile(
        &self,
        map: &SharedMap,
        sensor_panel: &Shared<SensorPanel>,
        snapshot: &Snapshot,
    ) {
        let mut map = map.lock();
        if !map.is_ready() {
            // reconciliation before the map exists is a defined idle
            // state, not a fault
            debug!("map not initialized, skipping reconciliation");
            return;
        }

        map.remove_markers();

        for (id, state) in sorted_entries(snapshot) {
            let Some((latitude, longitude)) = state.position() else {
                warn!("no gps fix for vehicle {id}, marker skipped");
                continue;
            };

            let panel = sensor_panel.clone();
            let selection: Snapshot =
                std::iter::once((id.clone(), state.clone())).collect();
            let marker = Marker::new(
                id.clone(),
                latitude,
                longitude,
                self.icon_url.clone(),
                format!("Truck {id}"),
            )
            .with_click_handler(Box::new(move || {
                panel.lock().render(&selection);
            }));

            map.add_marker(marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::shared;
    use crate::map::{MapSurface, MapView};
    use crate::telemetry::parse_snapshot;

    fn ready_map() -> SharedMap {
        let mut map = MapView::new();
        map.init((4.0, -74.0), 8);
        shared(Box::new(map) as Box<dyn MapSurface>)
    }

    #[test]
    fn test_marker_per_vehicle_with_fix() {
        let map = ready_map();
        let panel = shared(SensorPanel::new());
        let snapshot = parse_snapshot(
            r#"{"v1":{"gasolina":80,"temperatura":22,"gps":{"latitud":4.6,"longitud":-74.1},"alertas":[]}}"#,
        )
        .unwrap();

        MarkerReconciler::new().reconcile(&map, &panel, &snapshot);

        let markers = map.lock().marker_positions();
        assert_eq!(markers, vec![("v1".to_string(), (4.6, -74.1))]);
    }

    #[test]
    fn test_vehicles_without_fix_get_no_marker() {
        let map = ready_map();
        let panel = shared(SensorPanel::new());
        let snapshot =
            parse_snapshot(r#"{"v1":{"gps":null,"alertas":["overheat"]}}"#).unwrap();

        MarkerReconciler::new().reconcile(&map, &panel, &snapshot);
        assert!(map.lock().marker_positions().is_empty());
    }

    #[test]
    fn test_mixed_snapshot_renders_only_valid_vehicle() {
        let map = ready_map();
        let panel = shared(SensorPanel::new());
        let snapshot = parse_snapshot(
            r#"{"good":{"gps":{"latitud":1.0,"longitud":2.0}},"bad":{"gps":{"latitud":null,"longitud":2.0}}}"#,
        )
        .unwrap();

        MarkerReconciler::new().reconcile(&map, &panel, &snapshot);

        let markers = map.lock().marker_positions();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].0, "good");
    }

    #[test]
    fn test_stale_markers_are_removed_on_next_cycle() {
        let map = ready_map();
        let panel = shared(SensorPanel::new());
        let reconciler = MarkerReconciler::new();

        let first = parse_snapshot(
            r#"{"v1":{"gps":{"latitud":1.0,"longitud":2.0}},"v2":{"gps":{"latitud":3.0,"longitud":4.0}}}"#,
        )
        .unwrap();
        reconciler.reconcile(&map, &panel, &first);
        assert_eq!(map.lock().marker_positions().len(), 2);

        let second =
            parse_snapshot(r#"{"v2":{"gps":{"latitud":3.5,"longitud":4.5}}}"#).unwrap();
        reconciler.reconcile(&map, &panel, &second);

        let markers = map.lock().marker_positions();
        assert_eq!(markers, vec![("v2".to_string(), (3.5, 4.5))]);
    }

    #[test]
    fn test_reconcile_before_init_is_noop() {
        let map = shared(Box::new(MapView::new()) as Box<dyn MapSurface>);
        let panel = shared(SensorPanel::new());
        let snapshot =
            parse_snapshot(r#"{"v1":{"gps":{"latitud":1.0,"longitud":2.0}}}"#).unwrap();

        MarkerReconciler::new().reconcile(&map, &panel, &snapshot);
        assert!(map.lock().marker_positions().is_empty());
    }

    #[test]
    fn test_marker_click_renders_single_vehicle() {
        let map = ready_map();
        let panel = shared(SensorPanel::new());
        let snapshot = parse_snapshot(
            r#"{"v1":{"gasolina":80,"gps":{"latitud":1.0,"longitud":2.0}},
                "v2":{"gasolina":60,"gps":{"latitud":3.0,"longitud":4.0}}}"#,
        )
        .unwrap();

        MarkerReconciler::new().reconcile(&map, &panel, &snapshot);
        assert!(map.lock().click_marker("v2"));

        let panel = panel.lock();
        assert_eq!(panel.cards().len(), 1);
        assert_eq!(panel.cards()[0].vehicle_id, "v2");
        assert_eq!(panel.cards()[0].fuel, "60%");
    }
}
