//! Poll loop driver and the dashboard context.
//!
//! The context object owns everything the original page kept in
//! globals: the map handle, both panels, the alert accumulator, the
//! signed-in user and the last good snapshot. It is created when the
//! dashboard activates and dropped at teardown.

use crate::alerts::AlertAccumulator;
use crate::map::{MapSurface, TileLayer};
use crate::panels::{AlertsPanel, SensorPanel};
use crate::reconcile::MarkerReconciler;
use crate::store::KeyValueStore;
use crate::telemetry::{Snapshot, SnapshotSource};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

pub type Shared<T> = Arc<Mutex<T>>;
pub type SharedMap = Shared<Box<dyn MapSurface>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const MAP_CENTER: (f64, f64) = (4.0, -74.0);
pub const MAP_ZOOM: u8 = 8;
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "© OpenStreetMap";
pub const TILE_MAX_ZOOM: u8 = 18;

pub struct DashboardContext {
    pub map: SharedMap,
    pub sensor_panel: Shared<SensorPanel>,
    pub alerts_panel: Shared<AlertsPanel>,
    pub accumulator: Shared<AlertAccumulator>,
    pub current_user: Option<String>,
    pub last_snapshot: Option<Snapshot>,
}

impl DashboardContext {
    pub fn new(
        map: Box<dyn MapSurface>,
        store: Arc<dyn KeyValueStore>,
        current_user: Option<String>,
    ) -> Self {
        Self {
            map: shared(map),
            sensor_panel: shared(SensorPanel::new()),
            alerts_panel: shared(AlertsPanel::new()),
            accumulator: shared(AlertAccumulator::load(store)),
            current_user,
            last_snapshot: None,
        }
    }
}

pub struct Dashboard<S: SnapshotSource> {
    source: S,
    ctx: DashboardContext,
    reconciler: MarkerReconciler,
    poll_interval: Duration,
}

impl<S: SnapshotSource> Dashboard<S> {
    pub fn new(source: S, ctx: DashboardContext) -> Self {
        Self {
            source,
            ctx,
            reconciler: MarkerReconciler::new(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn context(&self) -> &DashboardContext {
        &self.ctx
    }

    /// One-time map setup: container, tile layer, initial view.
    pub fn activate(&self) {
        let mut map = self.ctx.map.lock();
        map.init(MAP_CENTER, MAP_ZOOM);
        map.add_tile_layer(TileLayer {
            url_template: TILE_URL.to_string(),
            attribution: TILE_ATTRIBUTION.to_string(),
            max_zoom: TILE_MAX_ZOOM,
        });
        info!(
            "map initialized at ({}, {}) zoom {}",
            MAP_CENTER.0, MAP_CENTER.1, MAP_ZOOM
        );
    }

    /// One poll tick: fetch, then fan the snapshot out to the marker
    /// reconciler, the sensor panel and the alert accumulator, in that
    /// order. A failed fetch skips all three sinks - the panels keep
    /// showing the last good data.
    pub async fn tick(&mut self) {
        match self.source.fetch_snapshot().await {
            Ok(snapshot) => {
                self.reconciler
                    .reconcile(&self.ctx.map, &self.ctx.sensor_panel, &snapshot);
                self.ctx.sensor_panel.lock().render(&snapshot);
                self.ctx
                    .accumulator
                    .lock()
                    .process_alerts(&snapshot, &mut self.ctx.alerts_panel.lock());
                self.ctx.last_snapshot = Some(snapshot);
            }
            Err(e) => warn!("telemetry fetch failed, keeping last good state: {e}"),
        }
    }

    /// Runs until the shutdown signal flips. Ticks never overlap: the
    /// fetch is awaited inline and missed ticks are skipped rather than
    /// bursted after a slow cycle.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.activate();

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("poll loop started ({:?} interval)", self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.changed() => break,
            }
        }

        let vehicles = self
            .ctx
            .last_snapshot
            .as_ref()
            .map(|s| s.len())
            .unwrap_or(0);
        info!(
            "dashboard deactivated (user: {}, {} vehicles in last snapshot)",
            self.ctx.current_user.as_deref().unwrap_or("-"),
            vehicles
        );
    }
}
