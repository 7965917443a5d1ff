use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::crypto::{self, KdfCost};
use crate::models::History;

const VAULT_FILE: &str = "history.vault";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
}

impl StorageError {
    pub fn is_wrong_passphrase(&self) -> bool {
        matches!(self, Self::Crypto(crypto::CryptoError::WrongPassphrase))
    }
}

/// Default data directory: `<data_local_dir>/cyclecalc`.
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    Ok(dirs::data_local_dir()
        .ok_or(StorageError::NoDataDir)?
        .join("cyclecalc"))
}

/// Encrypted history file inside a data directory.
#[derive(Debug, Clone)]
pub struct Vault {
    dir: PathBuf,
    cost: KdfCost,
}

impl Vault {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cost: KdfCost::default(),
        }
    }

    pub fn with_cost(mut self, cost: KdfCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(VAULT_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    pub fn save(&self, passphrase: &str, history: &History) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec(history)?;
        let sealed = crypto::seal(passphrase, &json, self.cost)?;

        // Write then rename so a crash never leaves a half-written vault.
        let tmp = self.dir.join(format!("{VAULT_FILE}.tmp"));
        fs::write(&tmp, sealed)?;
        fs::rename(&tmp, self.path())?;
        debug!(records = history.records.len(), "vault saved");
        Ok(())
    }

    pub fn load(&self, passphrase: &str) -> Result<History, StorageError> {
        let sealed = fs::read(self.path())?;
        let json = crypto::open(passphrase, &sealed, self.cost)?;
        let history: History = serde_json::from_slice(&json)?;
        debug!(records = history.records.len(), "vault loaded");
        Ok(history)
    }

    /// Delete the vault permanently. Missing files are not an error.
    pub fn wipe(&self) -> Result<(), StorageError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)?;
            info!(path = %path.display(), "vault wiped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cheap_vault(dir: &TempDir) -> Vault {
        Vault::new(dir.path().join("data")).with_cost(KdfCost {
            memory_kib: 1024,
            iterations: 1,
        })
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let vault = cheap_vault(&dir);
        assert!(!vault.exists());

        let mut history = History::default();
        history.next_id = 7;
        vault.save("pass", &history).unwrap();

        assert!(vault.exists());
        assert_eq!(vault.load("pass").unwrap(), history);
    }

    #[test]
    fn load_with_wrong_passphrase() {
        let dir = TempDir::new().unwrap();
        let vault = cheap_vault(&dir);
        vault.save("pass", &History::default()).unwrap();

        let err = vault.load("nope").unwrap_err();
        assert!(err.is_wrong_passphrase());
    }

    #[test]
    fn truncated_vault_is_not_a_wrong_passphrase() {
        let dir = TempDir::new().unwrap();
        let vault = cheap_vault(&dir);
        vault.save("pass", &History::default()).unwrap();
        fs::write(vault.path(), [0u8; 8]).unwrap();

        let err = vault.load("pass").unwrap_err();
        assert!(matches!(
            err,
            StorageError::Crypto(crypto::CryptoError::Truncated(8))
        ));
        assert!(!err.is_wrong_passphrase());
    }

    #[test]
    fn wipe_removes_file_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let vault = cheap_vault(&dir);
        vault.save("pass", &History::default()).unwrap();

        vault.wipe().unwrap();
        assert!(!vault.exists());
        vault.wipe().unwrap();
    }
}
