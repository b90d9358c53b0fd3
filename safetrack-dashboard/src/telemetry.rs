//! Telemetry wire model and snapshot fetcher.
//!
//! One poll returns a JSON object keyed by vehicle id; values carry the
//! endpoint's field names (gasolina, temperatura, gps, alertas). Numbers
//! may arrive as JSON numbers or numeric strings, and any of them may be
//! absent - the model keeps every field optional and lets each consumer
//! decide how to degrade.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

pub type VehicleId = String;

/// One polling cycle's full telemetry. Replaces, never merges with, the
/// previous cycle's snapshot.
pub type Snapshot = HashMap<VehicleId, VehicleState>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleState {
    #[serde(
        default,
        rename = "gasolina",
        deserialize_with = "flexible_number"
    )]
    pub fuel_level: Option<f64>,
    #[serde(
        default,
        rename = "temperatura",
        deserialize_with = "flexible_number"
    )]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub gps: Option<GpsFix>,
    #[serde(default, rename = "alertas")]
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpsFix {
    #[serde(default, rename = "latitud")]
    pub latitude: Option<f64>,
    #[serde(default, rename = "longitud")]
    pub longitude: Option<f64>,
    #[serde(default, rename = "velocidad")]
    pub speed: Option<f64>,
}

impl VehicleState {
    /// Coordinates usable for rendering, or None when the vehicle has no
    /// fix this cycle (absent gps or either coordinate null).
    pub fn position(&self) -> Option<(f64, f64)> {
        let gps = self.gps.as_ref()?;
        Some((gps.latitude?, gps.longitude?))
    }
}

/// Snapshot entries sorted by vehicle id, so panel contents and alert
/// history order do not depend on HashMap iteration order.
pub fn sorted_entries(snapshot: &Snapshot) -> Vec<(&VehicleId, &VehicleState)> {
    let mut entries: Vec<_> = snapshot.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Accepts a JSON number, a numeric string, or null. An unparsable
/// string degrades to None (rendered as the placeholder label).
fn flexible_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Where snapshots come from. The poll loop only depends on this seam,
/// so tests can script successes and failures.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError>;
}

/// Production source: one GET against the fixed telemetry endpoint.
pub struct TelemetryClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl TelemetryClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/sensores", base_url.trim_end_matches('/')),
            api_key,
        }
    }
}

impl SnapshotSource for TelemetryClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let mut request = self.http.get(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let body = request
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_snapshot(&body)
    }
}

/// A snapshot is only valid if the payload is a non-null JSON object
/// with at least one vehicle. Anything else is "no update this tick".
pub fn parse_snapshot(body: &str) -> Result<Snapshot, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| FetchError::Malformed("payload is not an object".into()))?;
    if object.is_empty() {
        return Err(FetchError::Malformed("payload is an empty object".into()));
    }
    serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_vehicle() {
        let snapshot = parse_snapshot(
            r#"{"v1":{"gasolina":80,"temperatura":22,"gps":{"latitud":4.6,"longitud":-74.1,"velocidad":35.0},"alertas":[]}}"#,
        )
        .unwrap();
        let v1 = &snapshot["v1"];
        assert_eq!(v1.fuel_level, Some(80.0));
        assert_eq!(v1.temperature, Some(22.0));
        assert_eq!(v1.position(), Some((4.6, -74.1)));
        assert!(v1.alerts.is_empty());
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let snapshot = parse_snapshot(
            r#"{"v1":{"gasolina":"80","temperatura":"21.5","gps":{"latitud":4.6,"longitud":-74.1}}}"#,
        )
        .unwrap();
        assert_eq!(snapshot["v1"].fuel_level, Some(80.0));
        assert_eq!(snapshot["v1"].temperature, Some(21.5));
    }

    #[test]
    fn test_unparsable_string_degrades_to_none() {
        let snapshot =
            parse_snapshot(r#"{"v1":{"gasolina":"low","gps":{"latitud":1.0,"longitud":2.0}}}"#)
                .unwrap();
        assert_eq!(snapshot["v1"].fuel_level, None);
    }

    #[test]
    fn test_null_or_missing_gps_means_no_position() {
        let snapshot = parse_snapshot(
            r#"{"a":{"gps":null},"b":{},"c":{"gps":{"latitud":null,"longitud":-74.0}}}"#,
        )
        .unwrap();
        assert_eq!(snapshot["a"].position(), None);
        assert_eq!(snapshot["b"].position(), None);
        assert_eq!(snapshot["c"].position(), None);
    }

    #[test]
    fn test_empty_object_is_malformed() {
        assert!(matches!(
            parse_snapshot("{}"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_object_payloads_are_malformed() {
        for body in ["null", "[]", "42", "\"hi\"", "not json"] {
            assert!(
                matches!(parse_snapshot(body), Err(FetchError::Malformed(_))),
                "payload {body:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sorted_entries_orders_by_id() {
        let snapshot =
            parse_snapshot(r#"{"b":{},"a":{},"c":{}}"#).unwrap();
        let ids: Vec<_> = sorted_entries(&snapshot)
            .into_iter()
            .map(|(id, _)| id.clone())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
