//! Alert accumulation: transient rendering plus a durable, append-only
//! event history.
//!
//! The history only ever grows. Every alert code occurrence in a
//! snapshot yields exactly one event that cycle - there is no dedup
//! across cycles, so a sustained condition keeps appending one event per
//! poll. That is the shipped behavior and tests pin it down.

use crate::panels::AlertsPanel;
use crate::store::KeyValueStore;
use crate::telemetry::{sorted_entries, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const ALERT_HISTORY_KEY: &str = "alert_history";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub vehicle_id: String,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

pub struct AlertAccumulator {
    store: Arc<dyn KeyValueStore>,
    history: Vec<AlertEvent>,
}

impl AlertAccumulator {
    /// Loads the persisted history once. An absent or corrupt store
    /// entry degrades to an empty history; it never fails the start.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let history = match store.read(ALERT_HISTORY_KEY) {
            None => Vec::new(),
            Some(txt) => serde_json::from_str(&txt).unwrap_or_else(|e| {
                warn!("alert history unreadable, starting empty: {e}");
                Vec::new()
            }),
        };
        info!("alert history loaded ({} events)", history.len());
        Self { store, history }
    }

    /// One cycle: redraw the transient panel and append one event per
    /// alert occurrence, then persist the whole history as one write.
    pub fn process_alerts(&mut self, snapshot: &Snapshot, panel: &mut AlertsPanel) {
        panel.clear();
        let now = Utc::now();
        for (id, state) in sorted_entries(snapshot) {
            for code in &state.alerts {
                panel.push_line(format!("{id}: {code}"));
                self.history.push(AlertEvent {
                    vehicle_id: id.clone(),
                    code: code.clone(),
                    occurred_at: now,
                });
            }
        }
        self.persist();
    }

    /// A failed write is logged and absorbed: the transient render
    /// stands, the in-memory history is kept, and the next cycle's
    /// persist attempt is independent.
    fn persist(&self) {
        let txt = match serde_json::to_string(&self.history) {
            Ok(txt) => txt,
            Err(e) => {
                error!("alert history serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = self.store.write(ALERT_HISTORY_KEY, &txt) {
            error!("alert history persist failed, keeping it in memory: {e}");
        }
    }

    pub fn history(&self) -> &[AlertEvent] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use crate::telemetry::parse_snapshot;

    fn accumulator_with(store: Arc<MemoryStore>) -> AlertAccumulator {
        AlertAccumulator::load(store)
    }

    #[test]
    fn test_event_count_matches_alert_count() {
        let store = Arc::new(MemoryStore::new());
        let mut acc = accumulator_with(store);
        let mut panel = AlertsPanel::new();
        let snapshot = parse_snapshot(
            r#"{"v1":{"alertas":["overheat","fuel_critical"]},"v2":{"alertas":["overheat"]},"v3":{}}"#,
        )
        .unwrap();

        acc.process_alerts(&snapshot, &mut panel);
        assert_eq!(acc.history().len(), 3);
        assert_eq!(panel.lines().len(), 3);
    }

    #[test]
    fn test_no_dedup_across_cycles() {
        // deliberate policy: the same snapshot processed twice doubles
        // the history
        let store = Arc::new(MemoryStore::new());
        let mut acc = accumulator_with(store);
        let mut panel = AlertsPanel::new();
        let snapshot =
            parse_snapshot(r#"{"v1":{"alertas":["overheat","overheat"]}}"#).unwrap();

        acc.process_alerts(&snapshot, &mut panel);
        assert_eq!(acc.history().len(), 2); // in-cycle duplicates kept too
        acc.process_alerts(&snapshot, &mut panel);
        assert_eq!(acc.history().len(), 4);
        // panel stays transient: one cycle's worth only
        assert_eq!(panel.lines().len(), 2);
    }

    #[test]
    fn test_history_roundtrips_through_store() {
        let store = Arc::new(MemoryStore::new());
        let mut acc = accumulator_with(store.clone());
        let mut panel = AlertsPanel::new();
        let snapshot = parse_snapshot(r#"{"v1":{"alertas":["overheat"]}}"#).unwrap();
        acc.process_alerts(&snapshot, &mut panel);
        let written = acc.history().to_vec();

        let reloaded = accumulator_with(store);
        assert_eq!(reloaded.history(), written.as_slice());
    }

    #[test]
    fn test_corrupt_history_degrades_to_empty() {
        let store = Arc::new(MemoryStore::new());
        store.insert(ALERT_HISTORY_KEY, "not json at all");
        let acc = accumulator_with(store);
        assert!(acc.history().is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_memory_and_render() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let mut acc = accumulator_with(store.clone());
        let mut panel = AlertsPanel::new();
        let snapshot = parse_snapshot(r#"{"v1":{"alertas":["overheat"]}}"#).unwrap();

        acc.process_alerts(&snapshot, &mut panel);
        assert_eq!(acc.history().len(), 1);
        assert_eq!(panel.lines(), ["v1: overheat"]);

        // next cycle's persist attempt is independent
        store.set_fail_writes(false);
        acc.process_alerts(&snapshot, &mut panel);
        assert_eq!(acc.history().len(), 2);
        let reloaded = accumulator_with(store);
        assert_eq!(reloaded.history().len(), 2);
    }

    #[test]
    fn test_events_keep_per_vehicle_wire_order() {
        let store = Arc::new(MemoryStore::new());
        let mut acc = accumulator_with(store);
        let mut panel = AlertsPanel::new();
        let snapshot =
            parse_snapshot(r#"{"v1":{"alertas":["b_second","a_first"]}}"#).unwrap();
        acc.process_alerts(&snapshot, &mut panel);
        let codes: Vec<_> = acc.history().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, ["b_second", "a_first"]);
    }
}
