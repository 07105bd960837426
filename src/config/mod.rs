//! Game configuration (balance data).
//!
//! Loaded from a JSON document shaped like the shipped `game_config.json`.
//! Every section is optional; missing sections fall back to the constants in
//! [`crate::constants`]. Values are validated before use so a bad balance
//! file is rejected instead of producing negative costs or endless loops.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buildings::{default_templates, BuildingTemplate};
use crate::constants::*;
use crate::economy::store::{default_catalog, ProductDef};
use crate::error::{ProgressionError, Result};
use crate::progression::XpTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub xp: XpConfig,
    pub combat: CombatConfig,
    pub production: ProductionConfig,
    pub buildings: Vec<BuildingTemplate>,
    pub monetization: MonetizationConfig,
    pub new_player: NewPlayerConfig,
    pub save: SaveConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            xp: XpConfig::default(),
            combat: CombatConfig::default(),
            production: ProductionConfig::default(),
            buildings: default_templates(),
            monetization: MonetizationConfig::default(),
            new_player: NewPlayerConfig::default(),
            save: SaveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XpConfig {
    pub max_level: u32,
    /// Explicit per-level requirements; overrides the formula where present
    pub level_table: XpTable,
    pub stage_xp_reward_base: u64,
    pub boss_xp_multiplier: f64,
    pub enemy_defeat_xp: u64,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            level_table: XpTable::default(),
            stage_xp_reward_base: STAGE_XP_REWARD_BASE,
            boss_xp_multiplier: BOSS_XP_MULTIPLIER,
            enemy_defeat_xp: ENEMY_DEFEAT_XP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub crit_damage_mult: f64,
    pub ultimate_crit_damage_mult: f64,
    pub max_dodge_chance: f64,
    pub burn_damage_fraction: f64,
    pub burn_tick_interval: f64,
    pub buff_bonus: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            crit_damage_mult: CRIT_DAMAGE_MULT,
            ultimate_crit_damage_mult: ULTIMATE_CRIT_DAMAGE_MULT,
            max_dodge_chance: MAX_DODGE_CHANCE,
            burn_damage_fraction: BURN_DAMAGE_FRACTION,
            burn_tick_interval: BURN_TICK_INTERVAL,
            buff_bonus: BUFF_BONUS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    pub tick_interval_secs: f64,
    pub offline_cap_hours: f64,
    pub vip_offline_cap_hours: f64,
    pub min_offline_hours: f64,
    pub ad_boost_multiplier: f64,
    pub ad_boost_duration_secs: f64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: PRODUCTION_TICK_SECS,
            offline_cap_hours: OFFLINE_CAP_HOURS,
            vip_offline_cap_hours: VIP_OFFLINE_CAP_HOURS,
            min_offline_hours: MIN_OFFLINE_HOURS,
            ad_boost_multiplier: AD_BOOST_MULTIPLIER,
            ad_boost_duration_secs: AD_BOOST_DURATION_SECS,
        }
    }
}

impl ProductionConfig {
    /// Offline accrual cap for the player's VIP status
    pub fn offline_cap_for(&self, is_vip: bool) -> f64 {
        if is_vip {
            self.vip_offline_cap_hours
        } else {
            self.offline_cap_hours
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonetizationConfig {
    pub daily_ad_limit: u32,
    pub resource_pack_gold: u64,
    pub resource_pack_materials: u32,
    /// Catalog; subscription length lives in each product's `Vip` reward
    pub products: Vec<ProductDef>,
}

impl Default for MonetizationConfig {
    fn default() -> Self {
        Self {
            daily_ad_limit: DAILY_AD_LIMIT,
            resource_pack_gold: AD_RESOURCE_PACK_GOLD,
            resource_pack_materials: AD_RESOURCE_PACK_MATERIALS,
            products: default_catalog(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPlayerConfig {
    pub gold: u64,
    pub premium_currency: u64,
    pub starter_hero_id: String,
}

impl Default for NewPlayerConfig {
    fn default() -> Self {
        Self {
            gold: NEW_PLAYER_GOLD,
            premium_currency: NEW_PLAYER_PREMIUM,
            starter_hero_id: STARTER_HERO_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub autosave_interval_secs: f64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: AUTOSAVE_INTERVAL_SECS,
        }
    }
}

impl GameConfig {
    /// Parse and validate a config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(json)
            .map_err(|e| ProgressionError::Validation(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProgressionError::Validation(format!("Read error for {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            buildings = config.buildings.len(),
            products = config.monetization.products.len(),
            "Game config loaded"
        );
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ProgressionError::Validation(format!("JSON write error: {}", e)))
    }

    /// Reject balance values that would break the curves
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(ProgressionError::Validation(msg));

        if self.xp.max_level < 1 {
            return fail("xp.max_level must be >= 1".into());
        }
        if let Some((level, _)) = self.xp.level_table.iter().find(|(_, xp)| **xp == 0) {
            return fail(format!("xp.level_table entry for level {} is zero", level));
        }
        if self.combat.burn_tick_interval <= 0.0 {
            return fail("combat.burn_tick_interval must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.combat.max_dodge_chance) {
            return fail("combat.max_dodge_chance must be within [0, 1]".into());
        }
        let p = &self.production;
        if p.tick_interval_secs <= 0.0 {
            return fail("production.tick_interval_secs must be > 0".into());
        }
        if p.offline_cap_hours <= 0.0 || p.vip_offline_cap_hours <= 0.0 {
            return fail("production offline caps must be > 0".into());
        }
        if p.ad_boost_multiplier < 1.0 {
            return fail("production.ad_boost_multiplier must be >= 1".into());
        }

        let mut seen = std::collections::HashSet::new();
        for t in &self.buildings {
            if !seen.insert(t.id.as_str()) {
                return fail(format!("duplicate building id {}", t.id));
            }
            if t.max_level < 1 {
                return fail(format!("building {} max_level must be >= 1", t.id));
            }
            if t.cost_growth <= 0.0 || t.time_growth <= 0.0 || t.production_growth <= 0.0 {
                return fail(format!("building {} growth factors must be > 0", t.id));
            }
            if t.production_per_hour < 0.0 {
                return fail(format!("building {} production must be >= 0", t.id));
            }
        }
        Ok(())
    }
}
