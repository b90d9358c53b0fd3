/**
 * FLEET MANAGER - Simulation et suivi de la flotte de camions
 *
 * RÔLE : Source de vérité de la télémétrie servie par /sensores.
 * Chaque requête fait avancer la simulation d'un pas : consommation de
 * carburant, oscillation de température, déplacement GPS le long d'un cap.
 *
 * ARCHITECTURE : Registry en mémoire + persistance JSON (alertas.json,
 * historial.json, thresholds.json) + évaluation de seuils à chaque pas.
 * UTILITÉ : Permet de faire tourner le dashboard sans véhicules réels.
 */

use crate::models::{AlertRecord, FleetOut, GpsOut, RouteHistory, RoutePoint, Thresholds, VehicleOut};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

pub const ALERT_FUEL_CRITICAL: &str = "fuel_critical";
pub const ALERT_TEMPERATURE_HIGH: &str = "temperature_high";
pub const ALERT_TEMPERATURE_LOW: &str = "temperature_low";

const THRESHOLDS_FILE: &str = "thresholds.json";
const ALERTS_FILE: &str = "alertas.json";
const HISTORY_FILE: &str = "historial.json";

// Un degré de latitude ~= 111 km ; suffisant pour une simulation.
const KM_PER_DEGREE: f64 = 111.0;

/// État interne d'un camion simulé.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSim {
    pub fuel: f64,        // pourcentage restant
    pub temperature: f64, // °C
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,     // km/h
    pub heading: f64,   // radians
    pub phase: u64,     // déphasage des oscillations, propre au véhicule
    pub tick: u64,      // pas de simulation écoulés
    pub alerts: Vec<String>,
}

impl VehicleSim {
    fn spawn(index: u64) -> Self {
        Self {
            fuel: 50.0,
            temperature: 25.0,
            latitude: 4.0 + 0.01 * index as f64,
            longitude: -74.0 - 0.01 * index as f64,
            speed: 0.0,
            heading: (index as f64 * 73.0).to_radians(),
            phase: index * 7,
            tick: 0,
            alerts: Vec::new(),
        }
    }

    /// Avance la simulation d'un pas (~1 seconde de route).
    fn advance(&mut self) {
        self.tick += 1;
        let t = (self.tick + self.phase) as f64;

        self.fuel = (self.fuel - 0.02).max(0.0);
        self.temperature = 25.0 + 12.0 * (t / 20.0).sin();
        self.speed = 30.0 + 15.0 * (t / 13.0).sin();

        let step_deg = self.speed / 3600.0 / KM_PER_DEGREE;
        self.latitude += step_deg * self.heading.cos();
        self.longitude += step_deg * self.heading.sin();
    }
}

/// Évalue les seuils et reconstruit la liste d'alertes du véhicule.
/// La liste est recalculée à chaque pas, jamais cumulée.
pub fn evaluate_thresholds(vehicle: &VehicleSim, thresholds: &Thresholds) -> Vec<String> {
    let mut alerts = Vec::new();
    if vehicle.fuel <= thresholds.gasolina_baja {
        alerts.push(ALERT_FUEL_CRITICAL.to_string());
    }
    if vehicle.temperature > thresholds.temperatura_alta {
        alerts.push(ALERT_TEMPERATURE_HIGH.to_string());
    }
    if vehicle.temperature < thresholds.temperatura_baja {
        alerts.push(ALERT_TEMPERATURE_LOW.to_string());
    }
    alerts
}

pub struct Fleet {
    vehicles: HashMap<String, VehicleSim>,
    thresholds: Thresholds,
    alert_log: Vec<AlertRecord>,
    routes: RouteHistory,
    data_dir: PathBuf,
}

impl Fleet {
    pub fn new(data_dir: &Path, size: usize) -> Self {
        let mut vehicles = HashMap::new();
        for index in 1..=size as u64 {
            vehicles.insert(index.to_string(), VehicleSim::spawn(index));
        }
        Self {
            vehicles,
            thresholds: Thresholds::default(),
            alert_log: Vec::new(),
            routes: HashMap::new(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Recharge seuils, journal d'alertes et historique depuis le dossier
    /// de données. Fichier absent ou corrompu = valeur par défaut.
    pub async fn load(&mut self) {
        self.thresholds = read_json(&self.data_dir.join(THRESHOLDS_FILE))
            .await
            .unwrap_or_default();
        self.alert_log = read_json(&self.data_dir.join(ALERTS_FILE))
            .await
            .unwrap_or_default();
        self.routes = read_json(&self.data_dir.join(HISTORY_FILE))
            .await
            .unwrap_or_default();
        println!(
            "[fleet] loaded {} alert records, {} route trails",
            self.alert_log.len(),
            self.routes.len()
        );
    }

    /// Un pas de simulation pour toute la flotte : déplacement, seuils,
    /// journalisation des alertes et du recorrido.
    pub fn advance(&mut self) {
        let now = now_rfc3339();
        let mut ids: Vec<String> = self.vehicles.keys().cloned().collect();
        ids.sort();

        for id in ids {
            let vehicle = self.vehicles.get_mut(&id).expect("id vient du registre");
            vehicle.advance();
            vehicle.alerts = evaluate_thresholds(vehicle, &self.thresholds);

            for code in vehicle.alerts.clone() {
                self.alert_log.push(AlertRecord {
                    id: Uuid::new_v4().to_string(),
                    vehicle_id: id.clone(),
                    code,
                    timestamp: now.clone(),
                });
            }

            self.routes.entry(id.clone()).or_default().push(RoutePoint {
                latitud: vehicle.latitude,
                longitud: vehicle.longitude,
                velocidad: vehicle.speed,
                timestamp: now.clone(),
            });
        }
    }

    pub fn snapshot(&self) -> FleetOut {
        self.vehicles
            .iter()
            .map(|(id, v)| (id.clone(), to_out(v)))
            .collect()
    }

    pub fn vehicle(&self, id: &str) -> Option<VehicleOut> {
        self.vehicles.get(id).map(to_out)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds.clone()
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    pub fn alert_log(&self) -> &[AlertRecord] {
        &self.alert_log
    }

    pub fn routes(&self) -> &RouteHistory {
        &self.routes
    }

    /// Sérialise l'état persistant ; l'écriture se fait hors verrou.
    pub fn persist_blobs(&self) -> Vec<(PathBuf, String)> {
        let mut blobs = Vec::new();
        if let Ok(txt) = serde_json::to_string_pretty(&self.thresholds) {
            blobs.push((self.data_dir.join(THRESHOLDS_FILE), txt));
        }
        if let Ok(txt) = serde_json::to_string_pretty(&self.alert_log) {
            blobs.push((self.data_dir.join(ALERTS_FILE), txt));
        }
        if let Ok(txt) = serde_json::to_string_pretty(&self.routes) {
            blobs.push((self.data_dir.join(HISTORY_FILE), txt));
        }
        blobs
    }
}

fn to_out(vehicle: &VehicleSim) -> VehicleOut {
    VehicleOut {
        gasolina: vehicle.fuel,
        temperatura: vehicle.temperature,
        gps: GpsOut {
            latitud: vehicle.latitude,
            longitud: vehicle.longitude,
            velocidad: vehicle.speed,
        },
        alertas: vehicle.alerts.clone(),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let txt = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&txt) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("[fleet] fichier {path:?} illisible: {e}");
            None
        }
    }
}

/// Écrit les blobs persistants ; une erreur est loggée, jamais propagée.
pub async fn write_blobs(blobs: Vec<(PathBuf, String)>) {
    for (path, txt) in blobs {
        if let Err(e) = tokio::fs::write(&path, txt).await {
            eprintln!("[fleet] failed to persist {path:?}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_fleet() -> Fleet {
        Fleet::new(Path::new("/tmp/safetrack-test"), 3)
    }

    #[test]
    fn test_fleet_spawns_requested_size() {
        let fleet = test_fleet();
        let snapshot = fleet.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains_key("1"));
        assert!(snapshot.contains_key("3"));
    }

    #[test]
    fn test_advance_burns_fuel_and_moves() {
        let mut fleet = test_fleet();
        let before = fleet.vehicle("1").unwrap();
        fleet.advance();
        let after = fleet.vehicle("1").unwrap();
        assert!(after.gasolina < before.gasolina);
        assert!(
            after.gps.latitud != before.gps.latitud
                || after.gps.longitud != before.gps.longitud
        );
    }

    #[test]
    fn test_threshold_evaluation() {
        let thresholds = Thresholds::default();
        let mut vehicle = VehicleSim::spawn(1);

        vehicle.fuel = 5.0;
        vehicle.temperature = 40.0;
        let alerts = evaluate_thresholds(&vehicle, &thresholds);
        assert_eq!(alerts, vec![ALERT_FUEL_CRITICAL, ALERT_TEMPERATURE_HIGH]);

        vehicle.fuel = 50.0;
        vehicle.temperature = 10.0;
        let alerts = evaluate_thresholds(&vehicle, &thresholds);
        assert_eq!(alerts, vec![ALERT_TEMPERATURE_LOW]);

        vehicle.temperature = 25.0;
        assert!(evaluate_thresholds(&vehicle, &thresholds).is_empty());
    }

    #[test]
    fn test_alert_log_grows_on_crossing() {
        let mut fleet = test_fleet();
        // seuil absurde pour forcer l'alerte dès le premier pas
        fleet.set_thresholds(Thresholds {
            gasolina_baja: 100.0,
            ..Thresholds::default()
        });
        fleet.advance();
        assert!(fleet.alert_log().len() >= 3); // un record par véhicule
        assert!(fleet
            .alert_log()
            .iter()
            .all(|r| r.code == ALERT_FUEL_CRITICAL));
    }

    #[test]
    fn test_route_history_grows_per_step() {
        let mut fleet = test_fleet();
        fleet.advance();
        fleet.advance();
        let routes = fleet.routes();
        assert_eq!(routes.get("1").map(Vec::len), Some(2));
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let mut fleet = test_fleet();
        fleet.advance();
        let value = serde_json::to_value(fleet.snapshot()).unwrap();
        let truck = &value["1"];
        assert!(truck["gasolina"].is_number());
        assert!(truck["temperatura"].is_number());
        assert!(truck["gps"]["latitud"].is_number());
        assert!(truck["gps"]["longitud"].is_number());
        assert!(truck["alertas"].is_array());
    }
}
