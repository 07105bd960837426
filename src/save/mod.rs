//! Save snapshots.
//!
//! [`SaveSnapshot`] is the persisted JSON shape (camelCase keys, ISO-8601
//! UTC timestamps, empty string for "no timestamp"). It exists only while
//! saving or loading: [`SaveSnapshot::capture`] reads a
//! [`ProgressionState`], [`SaveSnapshot::restore`] builds one back.
//! [`decode`] runs [`migration`] before deserializing, so older formats
//! load transparently.

pub mod coordinator;
pub mod migration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::buildings::{BuildingLedger, BuildingRecord};
use crate::config::GameConfig;
use crate::constants::STARTER_HERO_HP;
use crate::economy::store::DailyAdCounter;
use crate::economy::Wallet;
use crate::error::ProgressionError;
use crate::player::{HeroRecord, ItemStack, LevelProgress, ProgressionState, VipStatus};

pub use coordinator::{FileSaveStore, LoadReport, LoadSource, MemorySaveStore, SaveCoordinator, SaveStore};
pub use migration::{MigrationError, CURRENT_SAVE_VERSION};

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("save storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("corrupt save: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl From<SaveError> for ProgressionError {
    fn from(err: SaveError) -> Self {
        ProgressionError::CorruptSaveData(err.to_string())
    }
}

/// `Option<DateTime<Utc>>` as an ISO-8601 string, `""` meaning `None`.
///
/// Missing and `null` fields also read as `None`.
pub mod opt_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s
                .parse::<DateTime<Utc>>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnapshot {
    pub version: u32,
    pub last_saved_timestamp: DateTime<Utc>,
    pub player_id: String,
    pub player_level: u32,
    #[serde(rename = "currentXP")]
    pub current_xp: u64,
    pub gold: u64,
    pub premium_currency: u64,
    #[serde(default)]
    pub heroes: Vec<HeroRecord>,
    #[serde(default)]
    pub buildings: Vec<BuildingRecord>,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
    #[serde(default)]
    pub purchased_products: Vec<String>,
    #[serde(rename = "isVIP", default)]
    pub is_vip: bool,
    #[serde(default, with = "opt_timestamp")]
    pub vip_expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ads_watched_today: u32,
    #[serde(default, with = "opt_timestamp")]
    pub last_ad_reset_date: Option<DateTime<Utc>>,
}

impl SaveSnapshot {
    /// Snapshot `state` as of `now`
    pub fn capture(state: &ProgressionState, now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_SAVE_VERSION,
            last_saved_timestamp: now,
            player_id: state.player_id.clone(),
            player_level: state.progress.level,
            current_xp: state.progress.current_xp,
            gold: state.wallet.gold,
            premium_currency: state.wallet.premium,
            heroes: state.heroes.clone(),
            buildings: state.buildings.records(),
            inventory: state.inventory.clone(),
            purchased_products: state.purchased_products.clone(),
            is_vip: state.vip.is_vip,
            vip_expiry_date: state.vip.expiry,
            ads_watched_today: state.ads.watched_today,
            last_ad_reset_date: state.ads.last_reset,
        }
    }

    /// Rebuild a state on top of the configured templates.
    ///
    /// Levels outside `1..=max_level` are clamped; building records are
    /// applied through [`BuildingLedger::restore`].
    pub fn restore(self, config: &GameConfig, now: DateTime<Utc>) -> ProgressionState {
        let level = self.player_level.clamp(1, config.xp.max_level);
        if level != self.player_level {
            warn!(saved = self.player_level, clamped = level, "Player level out of range");
        }

        let mut buildings = BuildingLedger::from_templates(&config.buildings);
        buildings.restore(&self.buildings, now);

        let mut heroes = self.heroes;
        if heroes.is_empty() {
            debug!("Save has no heroes, granting starter");
            heroes.push(HeroRecord::unlocked(&config.new_player.starter_hero_id, STARTER_HERO_HP));
        }

        ProgressionState {
            player_id: self.player_id,
            progress: LevelProgress {
                level,
                current_xp: self.current_xp,
            },
            buildings,
            wallet: Wallet::new(self.gold, self.premium_currency),
            vip: VipStatus {
                is_vip: self.is_vip,
                expiry: self.vip_expiry_date,
            },
            ads: DailyAdCounter {
                watched_today: self.ads_watched_today,
                last_reset: self.last_ad_reset_date,
                daily_limit: config.monetization.daily_ad_limit,
            },
            heroes,
            inventory: self.inventory,
            purchased_products: self.purchased_products,
            last_saved: self.last_saved_timestamp,
        }
    }
}

pub fn encode(snapshot: &SaveSnapshot) -> Result<String, SaveError> {
    serde_json::to_string_pretty(snapshot).map_err(|e| SaveError::Corrupt(e.to_string()))
}

/// Parse, migrate and validate a snapshot
pub fn decode(json: &str) -> Result<SaveSnapshot, SaveError> {
    from_migrated(migration::migrate_json(json)?)
}

pub(crate) fn from_migrated(migrated: migration::MigratedSave) -> Result<SaveSnapshot, SaveError> {
    let snapshot: SaveSnapshot =
        serde_json::from_value(migrated.data).map_err(|e| SaveError::Corrupt(e.to_string()))?;
    if snapshot.player_id.trim().is_empty() {
        return Err(SaveError::Corrupt("empty playerId".to_string()));
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::default_templates;
    use crate::events::NullSink;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 2, 12, 0, 0).unwrap()
    }

    fn state() -> ProgressionState {
        ProgressionState::new_game(&GameConfig::default(), "player-1".into(), now())
    }

    #[test]
    fn test_json_uses_wire_names() {
        let json = encode(&SaveSnapshot::capture(&state(), now())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "version",
            "lastSavedTimestamp",
            "playerId",
            "playerLevel",
            "currentXP",
            "premiumCurrency",
            "isVIP",
            "vipExpiryDate",
            "adsWatchedToday",
            "lastAdResetDate",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["vipExpiryDate"], json!(""));
        assert_eq!(value["heroes"][0]["currentHP"], json!(500.0));
        assert_eq!(value["buildings"][0]["upgradeStartTime"], json!(""));
    }

    #[test]
    fn test_capture_restore_preserves_state() {
        let config = GameConfig::default();
        let mut original = state();
        original.wallet = Wallet::new(4321, 77);
        original.progress = LevelProgress {
            level: 7,
            current_xp: 99,
        };
        original.add_item("potion", 4);
        original.extend_vip(Duration::days(30), now());
        original
            .buildings
            .start_upgrade("treasury", now(), &mut NullSink)
            .unwrap();

        let later = now() + Duration::seconds(10);
        let json = encode(&SaveSnapshot::capture(&original, later)).unwrap();
        let restored = decode(&json).unwrap().restore(&config, later);

        assert_eq!(restored.last_saved, later);
        let mut expected = original.clone();
        expected.last_saved = later;
        assert_eq!(restored.wallet, expected.wallet);
        assert_eq!(restored.progress, expected.progress);
        assert_eq!(restored.vip, expected.vip);
        assert_eq!(restored.inventory, expected.inventory);
        assert_eq!(restored.heroes, expected.heroes);
        let treasury = restored.buildings.get("treasury").unwrap();
        assert!(treasury.is_upgrading());
        assert_eq!(treasury.upgrade.as_ref().unwrap().started_at, now());
    }

    #[test]
    fn test_decode_legacy_v1() {
        let legacy = json!({
            "version": "1.0.0",
            "lastSavedTimestamp": "2025-11-02T08:00:00.0000000Z",
            "playerId": "legacy",
            "playerLevel": 3,
            "currentXP": 10,
            "gold": 900,
            "solarShards": 40,
            "heroes": [],
            "buildings": [
                { "buildingId": "treasury", "currentLevel": 2, "isUpgrading": false,
                  "upgradeStartTime": "", "upgradeTimeRemaining": 0.0 }
            ],
            "inventory": [],
            "purchasedProducts": ["starter_pack_001"],
            "isVIP": false,
            "vipExpiryDate": "",
            "adsWatchedToday": 2,
            "lastAdResetDate": "2025-11-02T00:00:00Z"
        })
        .to_string();

        let snapshot = decode(&legacy).unwrap();
        assert_eq!(snapshot.version, CURRENT_SAVE_VERSION);
        assert_eq!(snapshot.premium_currency, 40);
        let restored = snapshot.restore(&GameConfig::default(), now());
        assert_eq!(restored.buildings.get("treasury").unwrap().level, 2);
        assert_eq!(restored.heroes.len(), 1);
        assert_eq!(restored.ads.watched_today, 2);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        assert!(decode("not json").is_err());
        assert!(matches!(
            decode(&json!({ "version": 2, "gold": "lots" }).to_string()),
            Err(SaveError::Corrupt(_))
        ));
        assert!(matches!(
            decode(&json!({ "version": 7 }).to_string()),
            Err(SaveError::Migration(MigrationError::FutureVersion { .. }))
        ));
    }

    #[test]
    fn test_level_clamped_on_restore() {
        let mut snapshot = SaveSnapshot::capture(&state(), now());
        snapshot.player_level = 500;
        let restored = snapshot.restore(&GameConfig::default(), now());
        assert_eq!(restored.progress.level, 50);
    }

    #[test]
    fn test_unknown_building_skipped() {
        let mut snapshot = SaveSnapshot::capture(&state(), now());
        snapshot.buildings.push(BuildingRecord {
            building_id: "moon_base".into(),
            current_level: 3,
            is_upgrading: false,
            upgrade_start_time: None,
            upgrade_time_remaining: 0.0,
        });
        let restored = snapshot.restore(&GameConfig::default(), now());
        assert_eq!(restored.buildings.len(), default_templates().len());
    }
}
