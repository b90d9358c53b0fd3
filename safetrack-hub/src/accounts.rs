/**
 * ACCOUNTS - Comptes utilisateurs du dashboard
 *
 * RÔLE : Persistance de la liste de credentials (auth.json) et mise à
 * jour du mot de passe par code de récupération (POST /update).
 *
 * Les champs usr/pwd/recoveryCode/status sont le format attendu par le
 * client ; la comparaison est en clair, assumée (pas un modèle de
 * sécurité, juste le contrat existant).
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ACCOUNTS_FILE: &str = "auth.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub usr: String,
    pub pwd: String,
    #[serde(rename = "recoveryCode")]
    pub recovery_code: String,
    #[serde(default)]
    pub status: u8, // 1 = session active
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("unknown recovery code")]
    UnknownRecoveryCode,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct AccountStore {
    accounts: Vec<Account>,
    path: PathBuf,
}

impl AccountStore {
    /// Charge auth.json, ou crée le fichier avec un compte par défaut
    /// pour que le système soit utilisable dès le premier lancement.
    pub async fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(ACCOUNTS_FILE);
        let accounts = match tokio::fs::read_to_string(&path).await {
            Ok(txt) => serde_json::from_str(&txt).unwrap_or_else(|e| {
                eprintln!("[accounts] auth.json invalide: {e}");
                Vec::new()
            }),
            Err(_) => {
                println!("[accounts] no auth.json, seeding default account");
                vec![Account {
                    usr: "admin".into(),
                    pwd: "admin".into(),
                    recovery_code: "0000".into(),
                    status: 0,
                }]
            }
        };
        let store = Self { accounts, path };
        if let Err(e) = store.save().await {
            eprintln!("[accounts] failed to persist auth.json: {e}");
        }
        store
    }

    pub fn list(&self) -> &[Account] {
        &self.accounts
    }

    /// Remplace le mot de passe du compte correspondant au code de
    /// récupération et persiste le fichier.
    pub async fn update_password(
        &mut self,
        recovery_code: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.recovery_code == recovery_code)
            .ok_or(AccountError::UnknownRecoveryCode)?;
        account.pwd = new_password.to_string();
        self.save().await
    }

    async fn save(&self) -> Result<(), AccountError> {
        let txt = serde_json::to_string_pretty(&self.accounts)?;
        tokio::fs::write(&self.path, txt).await?;
        Ok(())
    }
}
