//! Ledger state persistence
//!
//! Save/load of the local ledger state as a JSON file.

use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

use super::local::LedgerState;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".msig_data"),
            state_file: "contract.json".to_string(),
        }
    }
}

/// Ledger state storage manager
#[derive(Debug, Clone)]
pub struct LedgerStorage {
    config: StorageConfig,
}

impl LedgerStorage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    /// Save the ledger state to disk
    pub fn save(&self, state: &LedgerState) -> Result<(), StorageError> {
        let path = self.state_path();

        // Write to temporary file first
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.state_file));
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!("Ledger state saved to {:?}", path);
        Ok(())
    }

    /// Load the ledger state from disk
    pub fn load(&self) -> Result<LedgerState, StorageError> {
        let path = self.state_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Ledger state file not found".to_string(),
            ));
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Check if a saved state exists
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Delete the saved state
    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.state_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = LedgerStorage::new(config).unwrap();
        assert!(!storage.exists());
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));

        let mut state = LedgerState::default();
        state.processed.insert("ab".repeat(32), 1_700_000_060);

        storage.save(&state).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.processed, state.processed);
        assert!(!loaded.contract.is_deployed());

        storage.delete().unwrap();
        assert!(!storage.exists());
    }

    #[test]
    fn test_save_writes_complete_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LedgerStorage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        // Larger than one write buffer
        let mut state = LedgerState::default();
        for i in 0..500u32 {
            state.processed.insert(format!("{:064x}", i), 1_700_000_000 + i);
        }

        storage.save(&state).unwrap();
        assert_eq!(storage.load().unwrap().processed, state.processed);
        assert!(!temp_dir.path().join("contract.json.tmp").exists());
    }

    #[test]
    fn test_save_reports_write_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("ledger");
        let storage = LedgerStorage::new(StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        })
        .unwrap();

        fs::remove_dir_all(&data_dir).unwrap();
        assert!(matches!(
            storage.save(&LedgerState::default()),
            Err(StorageError::IoError(_))
        ));
        assert!(!storage.exists());
    }
}
