//! File-backed settings store shared by the monitoring loop and the control
//! surface.
//!
//! [`SettingsStore`] is a cheaply cloneable handle. Readers get an
//! `Arc<Settings>` snapshot of the whole record; writers replace the whole
//! record. A replace writes the new text to a sibling temporary file,
//! syncs it and renames it over the original, so neither the file nor the
//! in-memory snapshot is ever observed half-written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use airwatch_core::error::CoreError;
use airwatch_core::settings::Settings;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Suffix appended to the settings path for the staging file.
const TEMP_SUFFIX: &str = ".tmp";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the settings file failed.
    #[error("Settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings content is missing keys or holds malformed values.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

struct Inner {
    path: PathBuf,
    current: RwLock<Arc<Settings>>,
    /// Serializes writers so two replaces never share the staging file.
    write_lock: Mutex<()>,
}

/// Shared handle to the settings file and its parsed snapshot.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Inner>,
}

impl SettingsStore {
    /// Load and validate the settings file at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let settings = read_settings(&path).await?;
        tracing::info!(path = %path.display(), location = %settings.location_name, "Settings loaded");

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                current: RwLock::new(Arc::new(settings)),
                write_lock: Mutex::new(()),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The current settings record.
    pub async fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&*self.inner.current.read().await)
    }

    /// Persist `settings` and make them the current snapshot.
    ///
    /// On error neither the file nor the snapshot changes.
    pub async fn replace(&self, settings: Settings) -> Result<Arc<Settings>, StoreError> {
        let _guard = self.inner.write_lock.lock().await;

        let text = settings
            .render()
            .map_err(|e| StoreError::io(&self.inner.path, e))?;
        write_atomically(&self.inner.path, &text).await?;

        let settings = Arc::new(settings);
        *self.inner.current.write().await = Arc::clone(&settings);
        tracing::info!(path = %self.inner.path.display(), "Settings replaced");
        Ok(settings)
    }

    /// Merge string updates into the current snapshot and persist the
    /// result. Validation failures leave everything untouched.
    pub async fn update(
        &self,
        updates: &BTreeMap<String, String>,
    ) -> Result<Arc<Settings>, StoreError> {
        let merged = self.snapshot().await.apply_updates(updates)?;
        self.replace(merged).await
    }

    /// Re-read the file from disk, picking up edits made outside the
    /// process. An invalid file leaves the current snapshot in place.
    pub async fn reload(&self) -> Result<Arc<Settings>, StoreError> {
        let settings = Arc::new(read_settings(&self.inner.path).await?);
        *self.inner.current.write().await = Arc::clone(&settings);
        tracing::info!(path = %self.inner.path.display(), "Settings reloaded from disk");
        Ok(settings)
    }
}

async fn read_settings(path: &Path) -> Result<Settings, StoreError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(Settings::parse(&text)?)
}

/// Write `contents` to a sibling staging file, sync, then rename over `path`.
async fn write_atomically(path: &Path, contents: &str) -> Result<(), StoreError> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(TEMP_SUFFIX);
    let staging = PathBuf::from(staging);

    let result = async {
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staging, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
