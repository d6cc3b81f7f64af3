use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::warn;

use crate::{
    error::{AppError, Result},
    models::AppCyclerConfig,
    platform::Platform,
};

pub const CONFIG_FILE: &str = "app_cycler_config.json";

/// Key-value persistence for the single config record.
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<AppCyclerConfig>>;

    fn save(&self, config: &AppCyclerConfig) -> Result<()>;

    /// Discards the persisted record.
    fn clear(&self) -> Result<()>;
}

/// Stores the record as pretty-printed JSON in one file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in the host's app config directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Option<AppCyclerConfig>> {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, config: &AppCyclerConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Keeps the serialized record in memory; the raw text is exposed so tests can corrupt it.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    raw: Mutex<Option<String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Option<AppCyclerConfig>> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, config: &AppCyclerConfig) -> Result<()> {
        let raw = serde_json::to_string(config)?;
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Local store that also mirrors every write to the platform's own config path.
///
/// Reads prefer the local record and only consult the platform copy when the
/// local one is absent. Platform failures never fail the operation.
pub struct MirroredConfigStore<S> {
    local: S,
    platform: Platform,
}

impl<S: ConfigStore> MirroredConfigStore<S> {
    pub fn new(local: S, platform: Platform) -> Self {
        Self { local, platform }
    }
}

impl<S: ConfigStore> ConfigStore for MirroredConfigStore<S> {
    fn load(&self) -> Result<Option<AppCyclerConfig>> {
        if let Some(config) = self.local.load()? {
            return Ok(Some(config));
        }
        let Some(bridge) = self.platform.bridge() else {
            return Ok(None);
        };
        match bridge.get_config() {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!("failed to read platform config copy: {err}");
                Ok(None)
            }
        }
    }

    fn save(&self, config: &AppCyclerConfig) -> Result<()> {
        self.local.save(config)?;
        if let Some(bridge) = self.platform.bridge() {
            if let Err(err) = bridge.save_config(config) {
                warn!("failed to mirror config to platform: {err}");
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.local.clear()?;
        if let Some(bridge) = self.platform.bridge() {
            if let Err(err) = bridge.save_config(&AppCyclerConfig::default()) {
                warn!("failed to reset platform config copy: {err}");
            }
        }
        Ok(())
    }
}

/// Resolves the config file for a host that may not expose a config directory.
pub fn store_in(dir: Option<PathBuf>) -> Result<FileConfigStore> {
    dir.map(FileConfigStore::in_dir).ok_or(AppError::ConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::AppInfo, platform::fake};
    use tempfile::TempDir;

    fn sample() -> AppCyclerConfig {
        let mut maps = AppInfo::new("Google Maps", "com.google.android.apps.maps");
        maps.icon = Some("data:image/png;base64,AAAA".into());
        AppCyclerConfig {
            apps: vec![maps, AppInfo::new("Spotify", "com.spotify.music")],
            service_enabled: true,
            auto_start_on_boot: false,
        }
    }

    #[test]
    fn file_store_round_trips_across_instances() {
        let dir = TempDir::new().unwrap();
        FileConfigStore::in_dir(dir.path()).save(&sample()).unwrap();

        let reopened = FileConfigStore::in_dir(dir.path());
        assert_eq!(reopened.load().unwrap(), Some(sample()));
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::in_dir(dir.path().join("nested"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::in_dir(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(AppError::Parse(_))));
    }

    #[test]
    fn file_store_clear_removes_record() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::in_dir(dir.path());
        store.save(&sample()).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn store_in_requires_a_directory() {
        assert!(matches!(store_in(None), Err(AppError::ConfigDir)));
    }

    #[test]
    fn mirrored_store_writes_both_and_falls_back_to_platform() {
        let (bridge, platform) = fake::platform();
        let store = MirroredConfigStore::new(MemoryConfigStore::new(), platform.clone());
        store.save(&sample()).unwrap();
        assert_eq!(bridge.stored_config.lock().unwrap().clone(), Some(sample()));

        let fresh = MirroredConfigStore::new(MemoryConfigStore::new(), platform);
        assert_eq!(fresh.load().unwrap(), Some(sample()));
    }

    #[test]
    fn mirrored_store_without_platform_is_local_only() {
        let store = MirroredConfigStore::new(MemoryConfigStore::new(), Platform::Unavailable);
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }
}
