// # File Config Store
//
// File-based implementation of ConfigStore with crash recovery.
//
// ## Purpose
//
// Keeps declared state across daemon restarts and crashes so the startup
// replayer can reassert it.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of the previous generation
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "buckets": {
//     "address": {
//       "sequence": 2,
//       "entries": [
//         { "key": "1", "value": { "schema_version": 1, "domain": "address", ... } },
//         { "key": "lan", "value": { ... } }
//       ]
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::Buckets;
use crate::Error;
use crate::records::Domain;
use crate::traits::ConfigStore;

/// Store file format version
/// Used for future migration if format changes
const STORE_FILE_VERSION: &str = "1.0";

/// File-based config store with crash recovery
///
/// Every mutation is written through to disk before it becomes visible. A
/// write that fails leaves the in-memory view untouched, so memory and disk
/// never diverge.
///
/// # Crash Recovery
///
/// - **Atomic writes**: New state written to temporary file, then renamed
/// - **Backup**: Previous generation kept in `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Automatic recovery**: Falls back to backup if main file corrupted
///
/// # Example
///
/// ```rust,no_run
/// use tentacool_core::records::Domain;
/// use tentacool_core::store::FileConfigStore;
/// use tentacool_core::traits::ConfigStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileConfigStore::new("/var/lib/tentacool/db").await?;
///
///     store.put(Domain::Dns, "dns", serde_json::json!({"servers": ["1.1.1.1"]})).await?;
///     assert!(store.get(Domain::Dns, "dns").await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    // Held across mutate + write so writers are serialized end to end
    state: Mutex<Buckets>,
    closed: AtomicBool,
}

/// Serializable store file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    #[serde(default)]
    buckets: Buckets,
}

/// Why a load attempt failed
enum LoadFailure {
    /// The file could not be read at all
    Unreadable(Error),
    /// The file was read but is not a valid store document
    Corrupt(Error),
}

impl FileConfigStore {
    /// Create or load a file config store
    ///
    /// This will:
    /// 1. Try to load existing store file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::persistence(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let buckets = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Mutex::new(buckets),
            closed: AtomicBool::new(false),
        })
    }

    /// Load state from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main store file
    /// 2. If it is corrupt, try loading backup
    /// 3. If backup also fails, start with empty state
    async fn load_state_with_recovery(path: &Path) -> Result<Buckets, Error> {
        let error = match Self::load_state(path).await {
            Ok(buckets) => {
                tracing::debug!("Loaded config store: {} records", buckets.len());
                return Ok(buckets);
            }
            Err(LoadFailure::Unreadable(e)) => return Err(e),
            Err(LoadFailure::Corrupt(e)) => e,
        };

        tracing::warn!(
            "Config store appears corrupted: {}. Attempting recovery from backup.",
            error
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty config store.");
            return Ok(Buckets::default());
        }

        match Self::load_state(&backup_path).await {
            Ok(buckets) => {
                tracing::info!("Recovered config store from backup: {} records", buckets.len());

                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!("Failed to restore store file from backup: {}", restore_err);
                }

                Ok(buckets)
            }
            Err(LoadFailure::Unreadable(backup_err)) | Err(LoadFailure::Corrupt(backup_err)) => {
                tracing::error!(
                    "Backup also unusable: {}. Starting with empty config store.",
                    backup_err
                );
                Ok(Buckets::default())
            }
        }
    }

    /// Load state from file
    async fn load_state(path: &Path) -> Result<Buckets, LoadFailure> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(Buckets::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadFailure::Unreadable(Error::persistence(format!(
                "Failed to read store file {}: {}",
                path.display(),
                e
            )))
        })?;

        let store_file: StoreFileFormat = serde_json::from_str(&content).map_err(|e| {
            LoadFailure::Corrupt(Error::persistence(format!(
                "Failed to parse store file {}: {}",
                path.display(),
                e
            )))
        })?;

        if store_file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STORE_FILE_VERSION,
                store_file.version
            );
        }

        Ok(store_file.buckets)
    }

    /// Write a snapshot to file atomically
    async fn write_state(&self, buckets: &Buckets) -> Result<(), Error> {
        let store_file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            buckets: buckets.clone(),
        };

        let json = serde_json::to_string_pretty(&store_file)
            .map_err(|e| Error::persistence(format!("Failed to serialize config store: {}", e)))?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Config store written to {}", self.path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the state, write it, then commit it
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Buckets) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.ensure_open()?;

        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let output = change(&mut next)?;
        self.write_state(&next).await?;
        *guard = next;

        Ok(output)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::persistence(format!(
                "config store {} is closed",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Restore store file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored store file from backup");
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        temp.into()
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf().into_os_string();
        backup.push(".backup");
        backup.into()
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn get(&self, domain: Domain, key: &str) -> Result<Option<serde_json::Value>, Error> {
        let guard = self.state.lock().await;
        Ok(guard.get(domain, key))
    }

    async fn list(&self, domain: Domain) -> Result<Vec<(String, serde_json::Value)>, Error> {
        let guard = self.state.lock().await;
        Ok(guard.list(domain))
    }

    async fn put(&self, domain: Domain, key: &str, value: serde_json::Value) -> Result<(), Error> {
        self.mutate(|buckets| {
            buckets.put(domain, key, value);
            Ok(())
        })
        .await
    }

    async fn insert(
        &self,
        domain: Domain,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), Error> {
        self.mutate(|buckets| buckets.insert(domain, key, value)).await
    }

    async fn delete(&self, domain: Domain, key: &str) -> Result<(), Error> {
        self.mutate(|buckets| buckets.delete(domain, key)).await
    }

    async fn next_sequence(&self, domain: Domain) -> Result<u64, Error> {
        self.mutate(|buckets| buckets.next_sequence(domain)).await
    }

    async fn flush(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let guard = self.state.lock().await;
        self.write_state(&guard).await
    }

    async fn close(&self) -> Result<(), Error> {
        self.flush().await?;
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("Config store {} closed", self.path.display());
        Ok(())
    }
}
