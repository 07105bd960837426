//! Save/load lifecycle.
//!
//! The host calls [`SaveCoordinator::save`] and [`SaveCoordinator::load`]
//! from its own lifecycle callbacks (pause, quit, autosave). Loading never
//! fails: a missing save starts a new game and a corrupt one falls back to
//! a new game with the reason in the [`LoadReport`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use super::migration::migrate_json;
use super::{encode, from_migrated, SaveError, SaveSnapshot};
use crate::config::GameConfig;
use crate::economy::{Currency, CurrencyLedger};
use crate::error::ProgressionError;
use crate::player::{generate_player_id, ProgressionState};
use crate::production::offline::{reconcile_offline, OfflineReport};

/// Where the serialized snapshot lives
pub trait SaveStore {
    /// `Ok(None)` when nothing has been saved yet
    fn read(&self) -> Result<Option<String>, SaveError>;

    fn write(&mut self, contents: &str) -> Result<(), SaveError>;

    fn delete(&mut self) -> Result<(), SaveError>;
}

/// One JSON file; writes go through a sibling temp file and a rename
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    path: PathBuf,
}

impl FileSaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl SaveStore for FileSaveStore {
    fn read(&self) -> Result<Option<String>, SaveError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, contents: &str) -> Result<(), SaveError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn delete(&mut self) -> Result<(), SaveError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and headless runs
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    pub contents: Option<String>,
    /// When set, every write fails with a storage error
    pub fail_writes: bool,
}

impl SaveStore for MemorySaveStore {
    fn read(&self) -> Result<Option<String>, SaveError> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), SaveError> {
        if self.fail_writes {
            return Err(SaveError::Storage(std::io::Error::new(
                std::io::ErrorKind::Other,
                "store unavailable",
            )));
        }
        self.contents = Some(contents.to_string());
        Ok(())
    }

    fn delete(&mut self) -> Result<(), SaveError> {
        self.contents = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    /// An existing save, possibly migrated from an older version
    Existing { original_version: u32 },
    /// No save was present
    NewGame,
    /// The save could not be read or decoded; a new game replaced it
    Recovered { error: ProgressionError },
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub state: ProgressionState,
    pub source: LoadSource,
    /// Already credited to the state's wallet
    pub offline: OfflineReport,
    pub vip_expired: bool,
}

#[derive(Debug)]
pub struct SaveCoordinator<S: SaveStore> {
    store: S,
    autosave_interval_secs: f64,
    autosave_timer: f64,
}

impl<S: SaveStore> SaveCoordinator<S> {
    pub fn new(store: S, config: &GameConfig) -> Self {
        Self {
            store,
            autosave_interval_secs: config.save.autosave_interval_secs,
            autosave_timer: 0.0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Persist `state` as of `now`.
    ///
    /// `last_saved` only advances once the write succeeded; on a storage
    /// failure the state is left exactly as it was.
    pub fn save(&mut self, state: &mut ProgressionState, now: DateTime<Utc>) -> Result<(), SaveError> {
        let json = encode(&SaveSnapshot::capture(state, now))?;
        if let Err(e) = self.store.write(&json) {
            warn!(error = %e, "Save failed");
            return Err(e);
        }
        state.last_saved = now;
        self.autosave_timer = 0.0;
        debug!(player = %state.player_id, bytes = json.len(), "Game saved");
        Ok(())
    }

    /// Load the stored state and settle everything that happened offline:
    /// expired VIP is cleared first, then offline production is paid.
    pub fn load<R: Rng + ?Sized>(
        &mut self,
        config: &GameConfig,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> LoadReport {
        let (mut state, source) = match self.read_snapshot() {
            Ok(Some((snapshot, original_version))) => (
                snapshot.restore(config, now),
                LoadSource::Existing { original_version },
            ),
            Ok(None) => {
                info!("No save found, starting new game");
                (
                    ProgressionState::new_game(config, generate_player_id(rng), now),
                    LoadSource::NewGame,
                )
            }
            Err(e) => {
                let error = ProgressionError::from(e);
                warn!(error = %error, "Save unusable, starting new game");
                (
                    ProgressionState::new_game(config, generate_player_id(rng), now),
                    LoadSource::Recovered { error },
                )
            }
        };

        let vip_expired = state.clear_expired_vip(now);
        let offline = reconcile_offline(
            &state.buildings,
            state.last_saved,
            now,
            &config.production,
            state.is_vip(),
        );
        state.wallet.credit(Currency::Gold, offline.produced.gold);
        state.wallet.credit(Currency::Premium, offline.produced.premium);

        info!(
            player = %state.player_id,
            level = state.progress.level,
            gold = state.wallet.gold,
            "Game loaded"
        );
        LoadReport {
            state,
            source,
            offline,
            vip_expired,
        }
    }

    fn read_snapshot(&self) -> Result<Option<(SaveSnapshot, u32)>, SaveError> {
        let Some(json) = self.store.read()? else {
            return Ok(None);
        };
        let migrated = migrate_json(&json)?;
        let original_version = migrated.original_version;
        Ok(Some((from_migrated(migrated)?, original_version)))
    }

    /// Wipe the stored save; the next load starts a new game
    pub fn delete_save(&mut self) -> Result<(), SaveError> {
        info!("Deleting save");
        self.store.delete()
    }

    /// Advance the autosave timer; true when an autosave is due.
    ///
    /// The timer restarts on every successful [`Self::save`].
    pub fn tick(&mut self, dt: f64) -> bool {
        if dt > 0.0 {
            self.autosave_timer += dt;
        }
        self.autosave_timer >= self.autosave_interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 2, 8, 0, 0).unwrap()
    }

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(1)
    }

    fn coordinator() -> SaveCoordinator<MemorySaveStore> {
        SaveCoordinator::new(MemorySaveStore::default(), &GameConfig::default())
    }

    #[test]
    fn test_empty_store_starts_new_game() {
        let config = GameConfig::default();
        let report = coordinator().load(&config, t0(), &mut rng());
        assert_eq!(report.source, LoadSource::NewGame);
        assert_eq!(report.state.wallet.gold, 1000);
        assert_eq!(report.state.player_id.len(), 32);
        assert!(!report.offline.paid_anything());
    }

    #[test]
    fn test_save_then_load_pays_offline() {
        let config = GameConfig::default();
        let mut coord = coordinator();
        let mut state = ProgressionState::new_game(&config, "p".into(), t0());
        coord.save(&mut state, t0()).unwrap();

        let report = coord.load(&config, t0() + Duration::hours(2), &mut rng());
        assert_eq!(report.source, LoadSource::Existing { original_version: 2 });
        // treasury 400 + workshop 2
        assert_eq!(report.offline.produced.gold, 402);
        assert_eq!(report.state.wallet.gold, 1402);
    }

    #[test]
    fn test_corrupt_save_recovers() {
        let config = GameConfig::default();
        let mut coord = coordinator();
        coord.store_mut().contents = Some("{\"version\": 2, \"gold\": ".into());
        let report = coord.load(&config, t0(), &mut rng());
        assert!(matches!(
            report.source,
            LoadSource::Recovered {
                error: ProgressionError::CorruptSaveData(_)
            }
        ));
        assert_eq!(report.state.wallet.premium, 200);
    }

    #[test]
    fn test_storage_failure_leaves_state_alone() {
        let config = GameConfig::default();
        let mut coord = coordinator();
        coord.store_mut().fail_writes = true;
        let mut state = ProgressionState::new_game(&config, "p".into(), t0());
        let err = coord.save(&mut state, t0() + Duration::hours(1)).unwrap_err();
        assert!(matches!(err, SaveError::Storage(_)));
        assert_eq!(state.last_saved, t0());
    }

    #[test]
    fn test_expired_vip_cleared_before_offline() {
        let config = GameConfig::default();
        let mut coord = coordinator();
        let mut state = ProgressionState::new_game(&config, "p".into(), t0());
        state.extend_vip(Duration::hours(1), t0());
        coord.save(&mut state, t0()).unwrap();

        let report = coord.load(&config, t0() + Duration::hours(30), &mut rng());
        assert!(report.vip_expired);
        assert!(!report.state.is_vip());
        assert_eq!(report.offline.cap_hours, 12.0);
    }

    #[test]
    fn test_autosave_cadence() {
        let config = GameConfig::default();
        let mut coord = coordinator();
        assert!(!coord.tick(29.0));
        assert!(coord.tick(1.0));
        let mut state = ProgressionState::new_game(&config, "p".into(), t0());
        coord.save(&mut state, t0()).unwrap();
        assert!(!coord.tick(10.0));
    }
}
