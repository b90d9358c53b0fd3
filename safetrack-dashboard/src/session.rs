//! Login, session persistence and password recovery.
//!
//! Credentials are a plain list fetched from the hub and compared in
//! cleartext - that is the existing contract, not a security model. The
//! signed-in user is remembered in the durable store so a restart lands
//! straight on the dashboard.

use crate::store::KeyValueStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const SESSION_USER_KEY: &str = "current_user";
pub const SESSION_ID_KEY: &str = "session_id";

#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    #[serde(rename = "usr")]
    pub username: String,
    #[serde(rename = "pwd")]
    pub password: String,
    #[serde(default, rename = "recoveryCode")]
    pub recovery_code: Option<String>,
    #[serde(default)]
    pub status: u8,
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    credentials: Vec<Credential>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, credentials: Vec<Credential>) -> Self {
        Self { store, credentials }
    }

    pub fn validate_login(&self, username: &str, password: &str) -> bool {
        self.credentials
            .iter()
            .any(|c| c.username == username && c.password == password)
    }

    /// Validates and, on success, persists the session marker so the
    /// next start skips the login form.
    pub fn login(&self, username: &str, password: &str) -> bool {
        if !self.validate_login(username, password) {
            return false;
        }
        if let Err(e) = self.store.write(SESSION_USER_KEY, username) {
            warn!("session marker not persisted: {e}");
        }
        let session_id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.store.write(SESSION_ID_KEY, &session_id) {
            warn!("session id not persisted: {e}");
        }
        info!("user {username} signed in");
        true
    }

    /// A stored user is only honored if it still exists in the
    /// credential list.
    pub fn restore(&self) -> Option<String> {
        let username = self.store.read(SESSION_USER_KEY)?;
        if self.credentials.iter().any(|c| c.username == username) {
            info!("restored session for {username}");
            Some(username)
        } else {
            warn!("stored session user {username} unknown, discarding");
            self.store.remove(SESSION_USER_KEY);
            self.store.remove(SESSION_ID_KEY);
            None
        }
    }

    pub fn logout(&self) {
        self.store.remove(SESSION_USER_KEY);
        self.store.remove(SESSION_ID_KEY);
        info!("session cleared");
    }
}

/// Fetches the credential list the hub exposes for the login form. A
/// failure degrades to an empty list (nobody can sign in, but the
/// binary still reports why).
pub async fn fetch_credentials(
    http: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
) -> anyhow::Result<Vec<Credential>> {
    let url = format!("{}/auth", base_url.trim_end_matches('/'));
    let mut request = http.get(&url);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    let credentials = request
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<Credential>>()
        .await?;
    Ok(credentials)
}

/// Asks the hub to replace the password matching a recovery code.
/// Returns false when the code is unknown.
pub async fn request_password_reset(
    http: &reqwest::Client,
    base_url: &str,
    recovery_code: &str,
    new_password: &str,
) -> anyhow::Result<bool> {
    let url = format!("{}/update", base_url.trim_end_matches('/'));
    let response = http
        .post(&url)
        .json(&serde_json::json!({
            "recoveryCode": recovery_code,
            "newPassword": new_password,
        }))
        .send()
        .await?;
    Ok(response.status().is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;

    fn manager_with(store: Arc<MemoryStore>) -> SessionManager {
        let credentials: Vec<Credential> = serde_json::from_str(
            r#"[{"usr":"maria","pwd":"secreto","recoveryCode":"1234","status":0}]"#,
        )
        .unwrap();
        SessionManager::new(store, credentials)
    }

    #[test]
    fn test_wire_field_names() {
        let c: Credential =
            serde_json::from_str(r#"{"usr":"a","pwd":"b","recoveryCode":"c","status":1}"#)
                .unwrap();
        assert_eq!(c.username, "a");
        assert_eq!(c.password, "b");
        assert_eq!(c.recovery_code.as_deref(), Some("c"));
    }

    #[test]
    fn test_login_and_restore() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());

        assert!(!manager.login("maria", "wrong"));
        assert_eq!(manager.restore(), None);

        assert!(manager.login("maria", "secreto"));
        assert_eq!(store.read(SESSION_USER_KEY).as_deref(), Some("maria"));
        assert!(store.read(SESSION_ID_KEY).is_some());
        assert_eq!(manager.restore().as_deref(), Some("maria"));
    }

    #[test]
    fn test_logout_removes_session_keys() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        assert!(manager.login("maria", "secreto"));
        manager.logout();
        assert_eq!(store.read(SESSION_USER_KEY), None);
        assert_eq!(store.read(SESSION_ID_KEY), None);
    }

    #[test]
    fn test_restore_discards_unknown_user() {
        let store = Arc::new(MemoryStore::new());
        store.insert(SESSION_USER_KEY, "ghost");
        let manager = manager_with(store.clone());
        assert_eq!(manager.restore(), None);
        assert_eq!(store.read(SESSION_USER_KEY), None);
    }
}
