//! Save format migration.
//!
//! Snapshots carry a `version` field. Migrations run on the raw JSON value,
//! one step at a time, before the snapshot is deserialized:
//! v(N) -> v(N+1) -> ... -> v(current). Versions newer than the build
//! are refused rather than guessed at.
//!
//! v1 is the launch format: `version` was the string `"1.0.0"` and the
//! premium balance was stored as `solarShards`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::info;

/// Current save format version
pub const CURRENT_SAVE_VERSION: u32 = 2;

/// Oldest version that can still be migrated
pub const MIN_SUPPORTED_VERSION: u32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationError {
    #[error("save version {save_version} is newer than supported version {max_supported}")]
    FutureVersion { save_version: u32, max_supported: u32 },

    #[error("save version {save_version} predates supported version {min_supported}")]
    TooOldVersion { save_version: u32, min_supported: u32 },

    #[error("invalid save format: {detail}")]
    InvalidFormat { detail: String },

    #[error("migration from v{from_version} failed: {detail}")]
    StepFailed { from_version: u32, detail: String },
}

/// A snapshot brought up to [`CURRENT_SAVE_VERSION`]
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedSave {
    pub original_version: u32,
    pub steps_applied: Vec<String>,
    pub data: Value,
}

impl MigratedSave {
    pub fn was_migrated(&self) -> bool {
        !self.steps_applied.is_empty()
    }
}

/// Read the format version from a snapshot value.
///
/// Accepts the numeric form and the legacy semver string, whose major
/// component is the version.
pub fn save_version(data: &Value) -> Option<u32> {
    match data.get("version")? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.split('.').next()?.trim().parse().ok(),
        _ => None,
    }
}

pub fn migrate_json(json_str: &str) -> Result<MigratedSave, MigrationError> {
    let data: Value = serde_json::from_str(json_str).map_err(|e| MigrationError::InvalidFormat {
        detail: e.to_string(),
    })?;
    migrate_value(data)
}

/// Migrate a parsed snapshot to the current version
pub fn migrate_value(mut data: Value) -> Result<MigratedSave, MigrationError> {
    let version = save_version(&data)
        .filter(|v| *v > 0)
        .ok_or_else(|| MigrationError::InvalidFormat {
            detail: "missing or invalid 'version' field".to_string(),
        })?;

    if version > CURRENT_SAVE_VERSION {
        return Err(MigrationError::FutureVersion {
            save_version: version,
            max_supported: CURRENT_SAVE_VERSION,
        });
    }
    if version < MIN_SUPPORTED_VERSION {
        return Err(MigrationError::TooOldVersion {
            save_version: version,
            min_supported: MIN_SUPPORTED_VERSION,
        });
    }

    let mut current = version;
    let mut steps = Vec::new();
    while current < CURRENT_SAVE_VERSION {
        let description =
            apply_step(&mut data, current).map_err(|detail| MigrationError::StepFailed {
                from_version: current,
                detail,
            })?;
        steps.push(description);
        current += 1;
        data["version"] = json!(current);
    }

    if !steps.is_empty() {
        info!(from = version, to = current, steps = steps.len(), "Save migrated");
    }
    Ok(MigratedSave {
        original_version: version,
        steps_applied: steps,
        data,
    })
}

fn apply_step(data: &mut Value, from_version: u32) -> Result<String, String> {
    match from_version {
        1 => migrate_v1_to_v2(data),
        _ => Err(format!("no migration path from version {from_version}")),
    }
}

/// v1 -> v2:
/// - `solarShards` renamed to `premiumCurrency`
/// - heroes gain `currentHP` (0 = unknown, healed on load) and `equipment`
/// - inventory entries gain `enhancementLevel`
fn migrate_v1_to_v2(data: &mut Value) -> Result<String, String> {
    let obj = data.as_object_mut().ok_or("save data is not an object")?;

    let shards = obj.remove("solarShards").unwrap_or(json!(0));
    obj.entry("premiumCurrency").or_insert(shards);

    if let Some(Value::Array(heroes)) = obj.get_mut("heroes") {
        for hero in heroes.iter_mut().filter_map(Value::as_object_mut) {
            insert_missing(hero, "currentHP", json!(0.0));
            insert_missing(hero, "equipment", json!([]));
        }
    }
    if let Some(Value::Array(items)) = obj.get_mut("inventory") {
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            insert_missing(item, "enhancementLevel", json!(0));
        }
    }

    Ok("v1->v2: solarShards renamed to premiumCurrency; hero and item fields added".to_string())
}

fn insert_missing(obj: &mut Map<String, Value>, key: &str, value: Value) {
    if !obj.contains_key(key) {
        obj.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_save() -> String {
        json!({
            "version": "1.0.0",
            "lastSavedTimestamp": "2025-11-02T08:00:00.0000000Z",
            "playerId": "legacy",
            "playerLevel": 4,
            "currentXP": 120,
            "gold": 5400,
            "solarShards": 310,
            "heroes": [
                { "heroId": "hero_001_auron", "level": 4, "currentXP": 120, "isUnlocked": true }
            ],
            "buildings": [],
            "inventory": [ { "itemId": "potion", "quantity": 3 } ],
            "purchasedProducts": [],
            "isVIP": false,
            "vipExpiryDate": "",
            "adsWatchedToday": 1,
            "lastAdResetDate": "2025-11-02T00:00:00Z"
        })
        .to_string()
    }

    #[test]
    fn test_v1_migrates_to_current() {
        let migrated = migrate_json(&v1_save()).unwrap();
        assert_eq!(migrated.original_version, 1);
        assert!(migrated.was_migrated());
        assert_eq!(migrated.data["version"], json!(CURRENT_SAVE_VERSION));
        assert_eq!(migrated.data["premiumCurrency"], json!(310));
        assert!(migrated.data.get("solarShards").is_none());
        assert_eq!(migrated.data["heroes"][0]["equipment"], json!([]));
        assert_eq!(migrated.data["inventory"][0]["enhancementLevel"], json!(0));
    }

    #[test]
    fn test_current_version_untouched() {
        let data = json!({ "version": CURRENT_SAVE_VERSION, "gold": 1 });
        let migrated = migrate_value(data.clone()).unwrap();
        assert!(!migrated.was_migrated());
        assert_eq!(migrated.data, data);
    }

    #[test]
    fn test_future_version_rejected() {
        let err = migrate_value(json!({ "version": 99 })).unwrap_err();
        assert_eq!(
            err,
            MigrationError::FutureVersion {
                save_version: 99,
                max_supported: CURRENT_SAVE_VERSION
            }
        );
    }

    #[test]
    fn test_missing_version_is_invalid() {
        assert!(matches!(
            migrate_value(json!({ "gold": 1 })),
            Err(MigrationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            migrate_json("{not json"),
            Err(MigrationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(save_version(&json!({ "version": "1.0.0" })), Some(1));
        assert_eq!(save_version(&json!({ "version": 2 })), Some(2));
        assert_eq!(save_version(&json!({ "version": "abc" })), None);
        assert_eq!(save_version(&json!({ "version": -1 })), None);
    }

    #[test]
    fn test_existing_premium_field_wins() {
        let data = json!({ "version": 1, "solarShards": 5, "premiumCurrency": 9 });
        let migrated = migrate_value(data).unwrap();
        assert_eq!(migrated.data["premiumCurrency"], json!(9));
    }
}
