//! File-backed progress storage.
//!
//! The record is written as a flat JSON object using the same keys the game
//! has always stored (`CurrentLevel`, `GameCompleted`, `EnergyKey_0`, ...).
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous save intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use wattwise_logic::progress::{PersistError, ProgressBackend, ProgressRecord};

/// File name used when only a directory is given.
pub const SAVE_FILE_NAME: &str = "wattwise_progress.json";

/// Stores one [`ProgressRecord`] in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend for `dir/wattwise_progress.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SAVE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| SAVE_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProgressBackend for JsonFileBackend {
    fn load(&mut self) -> Result<Option<ProgressRecord>, PersistError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        ProgressRecord::from_json(&json).map(Some)
    }

    fn save(&mut self, record: &ProgressRecord) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, record.to_json()?)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!("Progress saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattwise_logic::progress::{ProgressStore, VolumeChannel};

    #[test]
    fn test_missing_file_is_first_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::in_dir(dir.path());
        assert!(backend.load().unwrap().is_none());
        assert!(backend.clear().is_ok());
    }

    #[test]
    fn test_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = ProgressStore::open(Box::new(JsonFileBackend::in_dir(dir.path())));
        store.collect_key(0);
        store.collect_key(2);
        store.complete_level(2);
        store.set_volume(VolumeChannel::Music, 0.25);

        let reopened = ProgressStore::open(Box::new(JsonFileBackend::in_dir(dir.path())));
        assert_eq!(reopened.record(), store.record());
        assert_eq!(reopened.current_level(), 3);
        assert!(reopened.keys().is_collected(2));
        assert!(!reopened.keys().is_collected(1));
    }

    #[test]
    fn test_file_uses_flat_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::in_dir(dir.path());
        let path = backend.path().to_path_buf();

        let mut store = ProgressStore::open(Box::new(backend));
        store.collect_key(1);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw["CurrentLevel"], 1);
        assert_eq!(raw["EnergyKey_1"], true);
        assert_eq!(raw["EnergyKey_0"], false);
        assert_eq!(raw["GameCompleted"], false);
        assert!(raw.get("SFXVolume").is_some());
    }

    #[test]
    fn test_nested_directory_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path().join("saves/slot1/progress.json"));
        backend.save(&ProgressRecord::default()).unwrap();
        assert!(backend.load().unwrap().is_some());
        assert!(!backend.temp_path().exists());
    }

    #[test]
    fn test_reset_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::in_dir(dir.path());
        let path = backend.path().to_path_buf();

        let mut store = ProgressStore::open(Box::new(backend));
        store.collect_key(0);
        assert!(path.exists());

        store.reset_progress();
        assert!(!path.exists());
        assert_eq!(store.keys_collected(), 0);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::in_dir(dir.path());
        fs::write(backend.path(), "{ broken").unwrap();

        let mut probe = backend.clone();
        assert!(matches!(probe.load(), Err(PersistError::Json(_))));

        let store = ProgressStore::open(Box::new(backend));
        assert_eq!(store.current_level(), 1);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::in_dir(dir.path());
        fs::write(backend.path(), r#"{ "CurrentLevel": 0 }"#).unwrap();
        assert!(matches!(
            backend.load(),
            Err(PersistError::InvalidRecord(_))
        ));
    }
}
