//! Player progress: energy keys, unlocked level, completion flag and volumes.
//!
//! [`ProgressStore`] owns the in-memory [`ProgressRecord`] and writes it
//! through an injected [`ProgressBackend`] after every mutation. The on-disk
//! shape is a flat key-value record (`CurrentLevel`, `GameCompleted`,
//! `EnergyKey_0..3`, `MasterVolume`, ...).

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{KEY_COUNT, LEVEL_COUNT};

// ============================================================================
// KEYS
// ============================================================================

/// One flag per level. Slots only ever go from `false` to `true`, except
/// through [`EnergyKeySet::clear`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyKeySet {
    slots: [bool; KEY_COUNT],
}

impl EnergyKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slots(slots: [bool; KEY_COUNT]) -> Self {
        Self { slots }
    }

    /// Set slot `index`. Returns `false` when out of range or already set.
    pub fn collect(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_collected(&self, index: usize) -> bool {
        self.slots.get(index).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| **s).count()
    }

    pub fn all(&self) -> bool {
        self.slots.iter().all(|s| *s)
    }

    pub fn slots(&self) -> [bool; KEY_COUNT] {
        self.slots
    }

    pub fn clear(&mut self) {
        self.slots = [false; KEY_COUNT];
    }
}

// ============================================================================
// VOLUMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeChannel {
    Master,
    Music,
    Sfx,
    Narration,
}

/// Audio levels in [0, 1]. Stored alongside progress, never read by it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSettings {
    pub master: f32,
    pub music: f32,
    pub sfx: f32,
    pub narration: f32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            music: 1.0,
            sfx: 1.0,
            narration: 1.0,
        }
    }
}

impl VolumeSettings {
    pub fn get(&self, channel: VolumeChannel) -> f32 {
        match channel {
            VolumeChannel::Master => self.master,
            VolumeChannel::Music => self.music,
            VolumeChannel::Sfx => self.sfx,
            VolumeChannel::Narration => self.narration,
        }
    }

    /// Set a channel, clamping to [0, 1]. NaN is treated as 0.
    pub fn set(&mut self, channel: VolumeChannel, value: f32) {
        let value = clamp_volume(value);
        match channel {
            VolumeChannel::Master => self.master = value,
            VolumeChannel::Music => self.music = value,
            VolumeChannel::Sfx => self.sfx = value,
            VolumeChannel::Narration => self.narration = value,
        }
    }

    /// Effective gain for a channel (channel × master).
    pub fn effective(&self, channel: VolumeChannel) -> f32 {
        match channel {
            VolumeChannel::Master => self.master,
            other => self.get(other) * self.master,
        }
    }
}

fn clamp_volume(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Everything persisted about a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    /// Highest unlocked level, starting at 1.
    pub current_level: u32,
    pub game_completed: bool,
    pub keys: EnergyKeySet,
    pub volumes: VolumeSettings,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            current_level: 1,
            game_completed: false,
            keys: EnergyKeySet::new(),
            volumes: VolumeSettings::default(),
        }
    }
}

/// Flat key-value layout written to storage.
#[derive(Debug, Serialize, Deserialize)]
struct StoredPrefs {
    #[serde(rename = "CurrentLevel", default = "default_level")]
    current_level: i64,
    #[serde(rename = "GameCompleted", default)]
    game_completed: bool,
    #[serde(rename = "EnergyKey_0", default)]
    energy_key_0: bool,
    #[serde(rename = "EnergyKey_1", default)]
    energy_key_1: bool,
    #[serde(rename = "EnergyKey_2", default)]
    energy_key_2: bool,
    #[serde(rename = "EnergyKey_3", default)]
    energy_key_3: bool,
    #[serde(rename = "MasterVolume", default = "full_volume")]
    master_volume: f32,
    #[serde(rename = "MusicVolume", default = "full_volume")]
    music_volume: f32,
    #[serde(rename = "SFXVolume", default = "full_volume")]
    sfx_volume: f32,
    #[serde(rename = "NarrationVolume", default = "full_volume")]
    narration_volume: f32,
}

fn default_level() -> i64 {
    1
}

fn full_volume() -> f32 {
    1.0
}

impl From<&ProgressRecord> for StoredPrefs {
    fn from(record: &ProgressRecord) -> Self {
        let [k0, k1, k2, k3] = record.keys.slots();
        Self {
            current_level: i64::from(record.current_level),
            game_completed: record.game_completed,
            energy_key_0: k0,
            energy_key_1: k1,
            energy_key_2: k2,
            energy_key_3: k3,
            master_volume: record.volumes.master,
            music_volume: record.volumes.music,
            sfx_volume: record.volumes.sfx,
            narration_volume: record.volumes.narration,
        }
    }
}

impl TryFrom<StoredPrefs> for ProgressRecord {
    type Error = PersistError;

    fn try_from(prefs: StoredPrefs) -> Result<Self, Self::Error> {
        if prefs.current_level < 1 {
            return Err(PersistError::InvalidRecord(format!(
                "CurrentLevel must be >= 1, found {}",
                prefs.current_level
            )));
        }
        let current_level = u32::try_from(prefs.current_level).map_err(|_| {
            PersistError::InvalidRecord(format!(
                "CurrentLevel out of range: {}",
                prefs.current_level
            ))
        })?;

        let mut volumes = VolumeSettings::default();
        volumes.set(VolumeChannel::Master, prefs.master_volume);
        volumes.set(VolumeChannel::Music, prefs.music_volume);
        volumes.set(VolumeChannel::Sfx, prefs.sfx_volume);
        volumes.set(VolumeChannel::Narration, prefs.narration_volume);

        Ok(Self {
            current_level,
            game_completed: prefs.game_completed,
            keys: EnergyKeySet::from_slots([
                prefs.energy_key_0,
                prefs.energy_key_1,
                prefs.energy_key_2,
                prefs.energy_key_3,
            ]),
            volumes,
        })
    }
}

impl ProgressRecord {
    /// Serialize to the key-value JSON object.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(&StoredPrefs::from(self))?)
    }

    /// Parse the key-value JSON object. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let prefs: StoredPrefs = serde_json::from_str(json)?;
        Self::try_from(prefs)
    }
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid progress record: {0}")]
    InvalidRecord(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Where progress lives between launches.
pub trait ProgressBackend {
    /// `Ok(None)` on first launch.
    fn load(&mut self) -> Result<Option<ProgressRecord>, PersistError>;
    fn save(&mut self, record: &ProgressRecord) -> Result<(), PersistError>;
    fn clear(&mut self) -> Result<(), PersistError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    stored: Option<String>,
    saves: usize,
    failing: bool,
}

/// In-process backend. Clones share the same storage, so a test can keep a
/// handle after moving one into a [`ProgressStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose every operation fails.
    pub fn failing() -> Self {
        let backend = Self::default();
        backend.state.borrow_mut().failing = true;
        backend
    }

    /// Raw stored JSON, if any.
    pub fn stored_json(&self) -> Option<String> {
        self.state.borrow().stored.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state.borrow().saves
    }
}

impl ProgressBackend for MemoryBackend {
    fn load(&mut self) -> Result<Option<ProgressRecord>, PersistError> {
        let state = self.state.borrow();
        if state.failing {
            return Err(PersistError::Unavailable("memory backend failing".into()));
        }
        state
            .stored
            .as_deref()
            .map(ProgressRecord::from_json)
            .transpose()
    }

    fn save(&mut self, record: &ProgressRecord) -> Result<(), PersistError> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(PersistError::Unavailable("memory backend failing".into()));
        }
        state.stored = Some(record.to_json()?);
        state.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(PersistError::Unavailable("memory backend failing".into()));
        }
        state.stored = None;
        Ok(())
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Progress plus its backend. Every mutating call persists immediately; a
/// failed write is logged and the in-memory state is kept.
pub struct ProgressStore {
    record: ProgressRecord,
    backend: Box<dyn ProgressBackend>,
}

impl ProgressStore {
    /// Load from `backend`, falling back to defaults on first launch or on a
    /// storage error.
    pub fn open(backend: Box<dyn ProgressBackend>) -> Self {
        let mut store = Self {
            record: ProgressRecord::default(),
            backend,
        };
        if let Err(e) = store.load() {
            log::warn!("Could not load progress, starting fresh: {}", e);
        }
        store
    }

    /// Store backed by a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryBackend::new()))
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn keys(&self) -> &EnergyKeySet {
        &self.record.keys
    }

    pub fn current_level(&self) -> u32 {
        self.record.current_level
    }

    pub fn game_completed(&self) -> bool {
        self.record.game_completed
    }

    pub fn volumes(&self) -> &VolumeSettings {
        &self.record.volumes
    }

    pub fn keys_collected(&self) -> usize {
        self.record.keys.count()
    }

    pub fn all_keys_collected(&self) -> bool {
        self.record.keys.all()
    }

    /// Collect key `index`.
    ///
    /// Returns `None` when the call is ignored (index out of range or key
    /// already held), otherwise `Some(all_keys_collected)`.
    pub fn collect_key(&mut self, index: usize) -> Option<bool> {
        if !self.record.keys.collect(index) {
            log::debug!("collect_key({}) ignored", index);
            return None;
        }
        log::info!(
            "Energy key {} collected ({}/{})",
            index,
            self.keys_collected(),
            KEY_COUNT
        );
        self.persist();
        Some(self.all_keys_collected())
    }

    /// Unlock the level after `level`. Never lowers `current_level`.
    /// Completing the last level also marks the game completed.
    pub fn complete_level(&mut self, level: u32) {
        let unlocked = level.saturating_add(1);
        let mut changed = false;
        if unlocked > self.record.current_level {
            self.record.current_level = unlocked;
            changed = true;
        }
        if level >= u32::from(LEVEL_COUNT) && !self.record.game_completed {
            self.record.game_completed = true;
            changed = true;
        }
        if changed {
            self.persist();
        }
    }

    /// Whether `level` may be started from the level select.
    pub fn is_level_unlocked(&self, level: u32) -> bool {
        level >= 1 && level <= self.record.current_level
    }

    pub fn mark_game_completed(&mut self) {
        if !self.record.game_completed {
            self.record.game_completed = true;
            self.persist();
        }
    }

    pub fn set_volume(&mut self, channel: VolumeChannel, value: f32) {
        self.record.volumes.set(channel, value);
        self.persist();
    }

    /// Write the current record to the backend.
    pub fn save(&mut self) -> Result<(), PersistError> {
        self.backend.save(&self.record)
    }

    /// Replace the in-memory record with the stored one (defaults if none).
    pub fn load(&mut self) -> Result<(), PersistError> {
        self.record = self.backend.load()?.unwrap_or_default();
        Ok(())
    }

    /// Restore defaults and drop the stored record.
    pub fn reset_progress(&mut self) {
        self.record = ProgressRecord::default();
        if let Err(e) = self.backend.clear() {
            log::warn!("Could not clear stored progress: {}", e);
        }
        log::info!("Progress reset");
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            log::warn!("Failed to persist progress: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_backend() -> (ProgressStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = ProgressStore::open(Box::new(backend.clone()));
        (store, backend)
    }

    #[test]
    fn test_defaults_on_first_launch() {
        let (store, backend) = store_with_backend();
        assert_eq!(store.current_level(), 1);
        assert!(!store.game_completed());
        assert_eq!(store.keys_collected(), 0);
        assert_eq!(store.volumes().master, 1.0);
        assert!(backend.stored_json().is_none());
    }

    #[test]
    fn test_collect_key_idempotent() {
        let (mut store, backend) = store_with_backend();
        for k in 0..KEY_COUNT {
            let mut once = ProgressStore::in_memory();
            once.collect_key(k);
            let mut twice = ProgressStore::in_memory();
            twice.collect_key(k);
            twice.collect_key(k);
            assert_eq!(once.keys(), twice.keys());
        }

        assert_eq!(store.collect_key(1), Some(false));
        assert_eq!(store.collect_key(1), None);
        assert_eq!(store.keys_collected(), 1);
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_collect_key_out_of_range_ignored() {
        let (mut store, backend) = store_with_backend();
        assert_eq!(store.collect_key(4), None);
        assert_eq!(store.collect_key(usize::MAX), None);
        assert_eq!(store.keys_collected(), 0);
        assert_eq!(backend.save_count(), 0);
    }

    #[test]
    fn test_all_keys_monotonic() {
        let mut store = ProgressStore::in_memory();
        assert_eq!(store.collect_key(0), Some(false));
        assert!(!store.all_keys_collected());
        assert_eq!(store.collect_key(2), Some(false));
        assert_eq!(store.collect_key(1), Some(false));
        assert!(!store.all_keys_collected());
        assert_eq!(store.collect_key(3), Some(true));
        assert!(store.all_keys_collected());

        store.complete_level(2);
        store.collect_key(0);
        assert!(store.all_keys_collected());

        store.reset_progress();
        assert!(!store.all_keys_collected());
    }

    #[test]
    fn test_complete_level_never_regresses() {
        let mut store = ProgressStore::in_memory();
        store.complete_level(2);
        assert_eq!(store.current_level(), 3);
        store.complete_level(1);
        assert_eq!(store.current_level(), 3);
        assert!(!store.game_completed());
        assert!(store.is_level_unlocked(3));
        assert!(!store.is_level_unlocked(4));
        assert!(!store.is_level_unlocked(0));
    }

    #[test]
    fn test_completing_final_level_marks_game_completed() {
        let mut store = ProgressStore::in_memory();
        store.complete_level(4);
        assert_eq!(store.current_level(), 5);
        assert!(store.game_completed());
    }

    #[test]
    fn test_persisted_and_reloaded() {
        let backend = MemoryBackend::new();
        {
            let mut store = ProgressStore::open(Box::new(backend.clone()));
            store.collect_key(0);
            store.collect_key(2);
            store.complete_level(1);
            store.set_volume(VolumeChannel::Music, 0.25);
        }

        let json = backend.stored_json().unwrap();
        assert!(json.contains("\"EnergyKey_2\": true"));
        assert!(json.contains("\"CurrentLevel\": 2"));
        assert!(json.contains("\"SFXVolume\""));

        let reopened = ProgressStore::open(Box::new(backend));
        assert_eq!(reopened.keys().slots(), [true, false, true, false]);
        assert_eq!(reopened.current_level(), 2);
        assert_eq!(reopened.volumes().music, 0.25);
    }

    #[test]
    fn test_reset_clears_storage() {
        let (mut store, backend) = store_with_backend();
        store.collect_key(0);
        assert!(backend.stored_json().is_some());
        store.reset_progress();
        assert!(backend.stored_json().is_none());
        assert_eq!(*store.record(), ProgressRecord::default());
    }

    #[test]
    fn test_failing_backend_degrades_to_memory() {
        let mut store = ProgressStore::open(Box::new(MemoryBackend::failing()));
        assert_eq!(store.collect_key(0), Some(false));
        assert_eq!(store.keys_collected(), 1);
        assert!(store.save().is_err());
        store.reset_progress();
        assert_eq!(store.keys_collected(), 0);
    }

    #[test]
    fn test_volume_clamped() {
        let mut store = ProgressStore::in_memory();
        store.set_volume(VolumeChannel::Sfx, 1.7);
        store.set_volume(VolumeChannel::Narration, -0.2);
        store.set_volume(VolumeChannel::Master, 0.5);
        assert_eq!(store.volumes().sfx, 1.0);
        assert_eq!(store.volumes().narration, 0.0);
        assert!((store.volumes().effective(VolumeChannel::Sfx) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_from_json_missing_keys_default() {
        let record = ProgressRecord::from_json(r#"{"EnergyKey_1": true}"#).unwrap();
        assert_eq!(record.current_level, 1);
        assert!(record.keys.is_collected(1));
        assert_eq!(record.volumes, VolumeSettings::default());
    }

    #[test]
    fn test_from_json_rejects_bad_level() {
        let err = ProgressRecord::from_json(r#"{"CurrentLevel": 0}"#).unwrap_err();
        assert!(matches!(err, PersistError::InvalidRecord(_)));
        assert!(ProgressRecord::from_json("not json").is_err());
    }
}
