/**
 * SAFETRACK HUB - Point d'entrée du serveur de télémétrie
 *
 * RÔLE : Orchestration des modules : config, flotte simulée, comptes, HTTP.
 * Bootstrap complet avec gestion d'erreurs et logging.
 *
 * ARCHITECTURE : API REST Axum + registry flotte en mémoire + persistance
 * JSON dans le dossier de données.
 * UTILITÉ : Fournit le endpoint /sensores que le dashboard interroge
 * chaque seconde.
 */

mod accounts;
mod config;
mod fleet;
mod http;
mod models;

use crate::accounts::AccountStore;
use crate::config::load_config;
use crate::fleet::Fleet;
use crate::http::AppState;
use crate::models::new_state;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    let cfg = load_config().await;

    let data_dir = Path::new(&cfg.data_dir);
    std::fs::create_dir_all(data_dir).unwrap_or_else(|e| {
        eprintln!("[hub] warning: failed to create data dir: {e}");
    });

    // flotte simulée + état persistant rechargé
    let mut fleet = Fleet::new(data_dir, cfg.fleet_size);
    fleet.load().await;
    println!("[hub] fleet ready ({} vehicles)", cfg.fleet_size);

    // comptes utilisateurs (auth.json, seedé au premier lancement)
    let accounts = AccountStore::load(data_dir).await;

    let app_state = AppState {
        fleet: new_state(fleet),
        accounts: Arc::new(AsyncMutex::new(accounts)),
    };

    let app = http::build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", cfg.bind_host, cfg.bind_port)
        .parse()
        .unwrap_or_else(|e| {
            eprintln!("[hub] invalid bind address: {e}");
            std::process::exit(1);
        });
    println!("[hub] listening on http://{addr}");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
