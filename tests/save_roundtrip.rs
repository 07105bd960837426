//! Integration tests: save files on disk.
//!
//! Drives the coordinator against a real file in a temp directory:
//!   1. play a session, save
//!   2. reload after an offline gap
//!   3. verify state survived and offline production was paid once

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde_json::json;

use sanctuary_core::config::GameConfig;
use sanctuary_core::economy::{Currency, CurrencyLedger};
use sanctuary_core::player::ProgressionState;
use sanctuary_core::save::{
    decode, encode, FileSaveStore, LoadSource, MemorySaveStore, SaveCoordinator, SaveSnapshot,
    SaveStore, CURRENT_SAVE_VERSION,
};
use sanctuary_core::session::GameSession;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 2, 8, 0, 0).unwrap()
}

fn rng() -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(99)
}

#[test]
fn test_round_trip_only_advances_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("savegame.json");
    let config = GameConfig::default();
    let mut coord = SaveCoordinator::new(FileSaveStore::new(&path), &config);

    let mut state = ProgressionState::new_game(&config, "round-trip".into(), t0());
    state.wallet.credit(Currency::Gold, 5_000);
    state.add_item("legendary_chest", 1);
    state.purchased_products.push("starter_pack_001".into());
    let before = SaveSnapshot::capture(&state, t0());

    let saved_at = t0() + Duration::minutes(3);
    coord.save(&mut state, saved_at).unwrap();
    assert_eq!(state.last_saved, saved_at);

    let json = std::fs::read_to_string(&path).unwrap();
    let after = decode(&json).unwrap();
    assert_eq!(after.last_saved_timestamp, saved_at);
    assert_eq!(
        SaveSnapshot {
            last_saved_timestamp: before.last_saved_timestamp,
            ..after
        },
        before
    );
}

#[test]
fn test_offline_gap_paid_once_per_save() {
    let dir = tempfile::tempdir().unwrap();
    let config = GameConfig::default();
    let mut coord =
        SaveCoordinator::new(FileSaveStore::new(dir.path().join("save.json")), &config);

    let mut state = ProgressionState::new_game(&config, "idle".into(), t0());
    coord.save(&mut state, t0()).unwrap();

    let back = t0() + Duration::hours(20);
    let report = coord.load(&config, back, &mut rng());
    assert_eq!(report.source, LoadSource::Existing { original_version: CURRENT_SAVE_VERSION });
    assert!(report.offline.capped);
    // 12h cap: treasury 2400 + workshop 12, reactor 3 premium
    assert_eq!(report.offline.produced.gold, 2412);
    assert_eq!(report.offline.produced.premium, 3);

    let mut session = GameSession::from_load(config.clone(), report, 1);
    session.save(&mut coord, back).unwrap();

    let again = coord.load(&config, back, &mut rng());
    assert!(!again.offline.paid_anything());
    assert_eq!(again.state.wallet.balance(Currency::Gold), 1000 + 2412);
}

#[test]
fn test_missing_file_starts_new_game() {
    let dir = tempfile::tempdir().unwrap();
    let config = GameConfig::default();
    let mut coord =
        SaveCoordinator::new(FileSaveStore::new(dir.path().join("none.json")), &config);
    let report = coord.load(&config, t0(), &mut rng());
    assert_eq!(report.source, LoadSource::NewGame);
    assert_eq!(report.state.heroes[0].hero_id, "hero_001_auron");
}

#[test]
fn test_corrupt_file_falls_back_to_new_game() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("save.json");
    std::fs::write(&path, "{ this is not a save").unwrap();

    let config = GameConfig::default();
    let mut coord = SaveCoordinator::new(FileSaveStore::new(&path), &config);
    let report = coord.load(&config, t0(), &mut rng());
    assert!(matches!(report.source, LoadSource::Recovered { .. }));
    assert_eq!(report.state.wallet.balance(Currency::Premium), 200);
}

#[test]
fn test_legacy_file_loads_and_resaves_current() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("save.json");
    let legacy = json!({
        "version": "1.0.0",
        "lastSavedTimestamp": t0().to_rfc3339(),
        "playerId": "veteran",
        "playerLevel": 12,
        "currentXP": 40,
        "gold": 7000,
        "solarShards": 950,
        "heroes": [ { "heroId": "hero_001_auron", "level": 12, "currentXP": 40, "isUnlocked": true } ],
        "buildings": [ { "buildingId": "barracks", "currentLevel": 4, "isUpgrading": false,
                         "upgradeStartTime": "", "upgradeTimeRemaining": 0 } ],
        "inventory": [],
        "purchasedProducts": [],
        "isVIP": false,
        "vipExpiryDate": "",
        "adsWatchedToday": 0,
        "lastAdResetDate": ""
    });
    std::fs::write(&path, legacy.to_string()).unwrap();

    let config = GameConfig::default();
    let mut coord = SaveCoordinator::new(FileSaveStore::new(&path), &config);
    let mut report = coord.load(&config, t0(), &mut rng());
    assert_eq!(report.source, LoadSource::Existing { original_version: 1 });
    assert_eq!(report.state.wallet.premium, 950);
    assert_eq!(report.state.progress.level, 12);
    assert_eq!(report.state.buildings.get("barracks").unwrap().level, 4);

    coord.save(&mut report.state, t0()).unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&coord.store().read().unwrap().unwrap()).unwrap();
    assert_eq!(raw["version"], json!(CURRENT_SAVE_VERSION));
    assert_eq!(raw["premiumCurrency"], json!(950));
}

#[test]
fn test_upgrade_finishes_while_offline() {
    let dir = tempfile::tempdir().unwrap();
    let config = GameConfig::default();
    let mut coord =
        SaveCoordinator::new(FileSaveStore::new(dir.path().join("save.json")), &config);

    let mut session =
        GameSession::new(config.clone(), ProgressionState::new_game(&config, "p".into(), t0()), 3);
    session.upgrade_building("treasury", t0()).unwrap();
    session.save(&mut coord, t0()).unwrap();

    let back = t0() + Duration::hours(1);
    let report = coord.load(&config, back, &mut rng());
    let mut session = GameSession::from_load(config, report, 3);
    let tick = session.tick(0.0, back);
    assert_eq!(tick.completed_upgrades, vec!["treasury".to_string()]);
    assert_eq!(session.state().buildings.get("treasury").unwrap().level, 2);
}

#[test]
fn test_nonsense_upgrade_timer_loads_without_panicking() {
    let config = GameConfig::default();
    let state = ProgressionState::new_game(&config, "garbled".into(), t0());
    let mut snapshot = SaveSnapshot::capture(&state, t0());
    let barracks = snapshot
        .buildings
        .iter_mut()
        .find(|b| b.building_id == "barracks")
        .unwrap();
    barracks.is_upgrading = true;
    barracks.upgrade_start_time = None;
    barracks.upgrade_time_remaining = -1e300;

    let mut coord = SaveCoordinator::new(MemorySaveStore::default(), &config);
    coord.store_mut().contents = Some(encode(&snapshot).unwrap());
    let report = coord.load(&config, t0(), &mut rng());
    assert!(matches!(report.source, LoadSource::Existing { .. }));

    let mut session = GameSession::from_load(config, report, 5);
    let tick = session.tick(0.0, t0() + Duration::seconds(1));
    assert_eq!(tick.completed_upgrades, vec!["barracks".to_string()]);
}
