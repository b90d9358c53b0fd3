//! Safetrack Dashboard - live vehicle telemetry client
//!
//! Signs the user in against the hub's credential list, then polls the
//! telemetry endpoint every second and fans each snapshot out to the
//! map markers, the sensor panel and the alert accumulator. Alert
//! history survives restarts through the durable store.
//!
//! Usage:
//!   safetrack-dashboard            # sign in (or restore) and run
//!   safetrack-dashboard recover    # reset a password by recovery code

mod alerts;
mod config;
mod dashboard;
mod map;
mod panels;
mod reconcile;
mod session;
mod store;
mod telemetry;

use anyhow::{Context, Result};
use config::DashboardConfig;
use dashboard::{Dashboard, DashboardContext};
use map::MapView;
use session::SessionManager;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use store::FileStore;
use telemetry::TelemetryClient;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let config = DashboardConfig::load()
        .await
        .context("Failed to load dashboard configuration")?;

    if std::env::args().nth(1).as_deref() == Some("recover") {
        return run_recovery(&config).await;
    }

    info!("Safetrack Dashboard starting (hub: {})", config.hub.base_url);

    let store = Arc::new(
        FileStore::new(config.store_dir().context("No usable data directory")?)
            .context("Failed to open durable store")?,
    );

    let http = reqwest::Client::new();
    let credentials = match session::fetch_credentials(
        &http,
        &config.hub.base_url,
        config.hub.api_key.as_deref(),
    )
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("could not fetch credential list from hub: {e}");
            Vec::new()
        }
    };

    let sessions = SessionManager::new(store.clone(), credentials);
    let Some(user) = sign_in(&sessions)? else {
        warn!("no session established, exiting");
        return Ok(());
    };

    // dashboard activation: context replaces the page's globals
    let ctx = DashboardContext::new(Box::new(MapView::new()), store, Some(user));
    let source = TelemetryClient::new(&config.hub.base_url, config.hub.api_key.clone());
    let mut dashboard = Dashboard::new(source, ctx)
        .with_poll_interval(Duration::from_millis(config.poll_interval_ms));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    dashboard.run(shutdown_rx).await;
    Ok(())
}

/// Restores the stored session, or prompts for credentials. Three bad
/// attempts give up rather than loop forever.
fn sign_in(sessions: &SessionManager) -> Result<Option<String>> {
    if let Some(user) = sessions.restore() {
        return Ok(Some(user));
    }

    for _ in 0..3 {
        let username = prompt("Username")?;
        let password = prompt("Password")?;
        if sessions.login(&username, &password) {
            return Ok(Some(username));
        }
        println!("Invalid credentials.");
    }
    Ok(None)
}

async fn run_recovery(config: &DashboardConfig) -> Result<()> {
    let recovery_code = prompt("Recovery code")?;
    let new_password = prompt("New password")?;

    let http = reqwest::Client::new();
    let ok = session::request_password_reset(
        &http,
        &config.hub.base_url,
        &recovery_code,
        &new_password,
    )
    .await
    .context("Could not reach the hub")?;

    if ok {
        println!("Password reset. Sign in with the new password.");
    } else {
        println!("Password reset failed: unknown recovery code.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
