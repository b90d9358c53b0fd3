//! Map surface boundary.
//!
//! The dashboard needs a small capability set from whatever ultimately
//! draws the map: create the map on a container, add a tile layer, add
//! and remove point markers carrying an icon, a popup and a click
//! handler, and enumerate what is currently displayed. `MapView` is the
//! in-process implementation behind that seam; a GUI embedding would
//! provide its own.

use std::fmt;

pub type ClickHandler = Box<dyn Fn() + Send + Sync>;

pub struct Marker {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub icon_url: String,
    pub popup: String,
    on_click: Option<ClickHandler>,
}

impl Marker {
    pub fn new(
        vehicle_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        icon_url: impl Into<String>,
        popup: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            latitude,
            longitude,
            icon_url: icon_url.into(),
            popup: popup.into(),
            on_click: None,
        }
    }

    pub fn with_click_handler(mut self, handler: ClickHandler) -> Self {
        self.on_click = Some(handler);
        self
    }

    pub fn click(&self) {
        if let Some(handler) = &self.on_click {
            handler();
        }
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("vehicle_id", &self.vehicle_id)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("popup", &self.popup)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

pub trait MapSurface: Send {
    /// Creates the map once; reconciliation before this is a no-op.
    fn init(&mut self, center: (f64, f64), zoom: u8);
    fn is_ready(&self) -> bool;
    fn add_tile_layer(&mut self, layer: TileLayer);
    fn add_marker(&mut self, marker: Marker);
    /// Removes every vehicle marker; tile layers stay.
    fn remove_markers(&mut self);
    /// Currently displayed markers as (vehicle id, position).
    fn marker_positions(&self) -> Vec<(String, (f64, f64))>;
    /// Simulates a user click on a vehicle's marker. Returns false when
    /// no such marker is displayed.
    fn click_marker(&self, vehicle_id: &str) -> bool;
}

/// Headless map model: tracks layers and markers exactly as a map
/// library would hold them, without drawing anything.
#[derive(Default)]
pub struct MapView {
    ready: bool,
    center: (f64, f64),
    zoom: u8,
    tile_layers: Vec<TileLayer>,
    markers: Vec<Marker>,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_layer_count(&self) -> usize {
        self.tile_layers.len()
    }
}

impl MapSurface for MapView {
    fn init(&mut self, center: (f64, f64), zoom: u8) {
        self.center = center;
        self.zoom = zoom;
        self.ready = true;
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn add_tile_layer(&mut self, layer: TileLayer) {
        self.tile_layers.push(layer);
    }

    fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    fn remove_markers(&mut self) {
        self.markers.clear();
    }

    fn marker_positions(&self) -> Vec<(String, (f64, f64))> {
        self.markers
            .iter()
            .map(|m| (m.vehicle_id.clone(), (m.latitude, m.longitude)))
            .collect()
    }

    fn click_marker(&self, vehicle_id: &str) -> bool {
        match self.markers.iter().find(|m| m.vehicle_id == vehicle_id) {
            Some(marker) => {
                marker.click();
                true
            }
            None => false,
        }
    }
}
