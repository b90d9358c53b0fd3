use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// État applicatif partagé entre handlers HTTP et simulation.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

// Types "wire" du endpoint /sensores : les clés JSON sont celles
// qu'attendent les clients (gasolina, temperatura, gps, alertas).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleOut {
    pub gasolina: f64,
    pub temperatura: f64,
    pub gps: GpsOut,
    pub alertas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsOut {
    pub latitud: f64,
    pub longitud: f64,
    pub velocidad: f64,
}

pub type FleetOut = HashMap<String, VehicleOut>;

/// Seuils d'alerte, persistés et modifiables via /configuracion.
/// Les noms de champs suivent le format du fichier d'origine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    pub gasolina_baja: f64,
    pub temperatura_alta: f64,
    pub temperatura_baja: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            gasolina_baja: 10.0,
            temperatura_alta: 35.0,
            temperatura_baja: 15.0,
        }
    }
}

/// Alerte enregistrée côté serveur (fichier alertas.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub vehicle_id: String,
    pub code: String,
    pub timestamp: String, // RFC3339
}

/// Point de passage du recorrido d'un véhicule (fichier historial.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitud: f64,
    pub longitud: f64,
    pub velocidad: f64,
    pub timestamp: String, // RFC3339
}

pub type RouteHistory = HashMap<String, Vec<RoutePoint>>;
