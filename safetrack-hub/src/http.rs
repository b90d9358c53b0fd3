/**
 * API REST SAFETRACK - Serveur HTTP du hub de télémétrie
 *
 * RÔLE :
 * Expose la télémétrie de la flotte au dashboard et les opérations de
 * compte (liste de credentials, récupération de mot de passe).
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, routes /sensores, /configuracion, /alertas, /historial,
 *   /auth, /update, /health
 * - GET /sensores fait avancer la simulation d'un pas puis répond ;
 *   la persistance (alertes, recorrido, seuils) est écrite hors verrou
 * - Sérialisation JSON automatique, erreurs HTTP standardisées
 *
 * SÉCURITÉ :
 * - Header x-api-key exigé seulement si SAFETRACK_API_KEY est défini
 *   (le endpoint de télémétrie reste ouvert par défaut) ; /health
 *   toujours accessible
 */

use crate::accounts::{AccountError, AccountStore};
use crate::fleet::{write_blobs, Fleet};
use crate::models::{AlertRecord, FleetOut, RouteHistory, Shared, Thresholds, VehicleOut};
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone)]
pub struct AppState {
    pub fleet: Shared<Fleet>,
    pub accounts: Arc<AsyncMutex<AccountStore>>,
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    if req.uri().path().starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("SAFETRACK_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        // pas de clé configurée = API ouverte (déploiement local)
        return Ok(next.run(req).await);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sensores", get(get_fleet))
        .route("/sensores/{id}", get(get_vehicle))
        .route("/configuracion", get(get_thresholds).post(set_thresholds))
        .route("/alertas", get(get_alert_log))
        .route("/historial", get(get_route_history))
        .route("/auth", get(get_accounts))
        .route("/update", post(update_password))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

// GET /sensores (flotte complète, avance la simulation)
async fn get_fleet(State(app): State<AppState>) -> Json<FleetOut> {
    let (snapshot, blobs) = {
        let mut fleet = app.fleet.lock();
        fleet.advance();
        (fleet.snapshot(), fleet.persist_blobs())
    };
    write_blobs(blobs).await;
    Json(snapshot)
}

// GET /sensores/{id} (détail d'un camion)
async fn get_vehicle(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleOut>, StatusCode> {
    let (vehicle, blobs) = {
        let mut fleet = app.fleet.lock();
        fleet.advance();
        (fleet.vehicle(&id), fleet.persist_blobs())
    };
    write_blobs(blobs).await;
    let Some(vehicle) = vehicle else {
        return Err(StatusCode::NOT_FOUND);
    };
    Ok(Json(vehicle))
}

// GET /configuracion (seuils courants)
async fn get_thresholds(State(app): State<AppState>) -> Json<Thresholds> {
    Json(app.fleet.lock().thresholds())
}

// POST /configuracion (remplace les seuils)
async fn set_thresholds(
    State(app): State<AppState>,
    Json(thresholds): Json<Thresholds>,
) -> Json<serde_json::Value> {
    let blobs = {
        let mut fleet = app.fleet.lock();
        fleet.set_thresholds(thresholds);
        fleet.persist_blobs()
    };
    write_blobs(blobs).await;
    Json(serde_json::json!({ "message": "thresholds updated" }))
}

// GET /alertas (journal serveur complet)
async fn get_alert_log(State(app): State<AppState>) -> Json<Vec<AlertRecord>> {
    Json(app.fleet.lock().alert_log().to_vec())
}

// GET /historial (recorrido de tous les véhicules)
async fn get_route_history(State(app): State<AppState>) -> Json<RouteHistory> {
    Json(app.fleet.lock().routes().clone())
}

// GET /auth (liste de credentials pour le login du dashboard)
async fn get_accounts(State(app): State<AppState>) -> Json<serde_json::Value> {
    let accounts = app.accounts.lock().await;
    Json(serde_json::to_value(accounts.list()).unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct RecoveryIn {
    #[serde(rename = "recoveryCode")]
    recovery_code: String,
    #[serde(rename = "newPassword")]
    new_password: String,
}

// POST /update (mot de passe par code de récupération)
async fn update_password(
    State(app): State<AppState>,
    Json(body): Json<RecoveryIn>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut accounts = app.accounts.lock().await;
    match accounts
        .update_password(&body.recovery_code, &body.new_password)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "password updated" })),
        ),
        Err(AccountError::UnknownRecoveryCode) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "invalid recovery code" })),
        ),
        Err(e) => {
            eprintln!("[http] password update failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "update failed" })),
            )
        }
    }
}
