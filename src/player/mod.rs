//! Player progression state.
//!
//! Everything that survives between sessions lives in [`ProgressionState`]:
//! account level, wallet, base buildings, VIP, ad counter, heroes and
//! inventory. The save codec converts it to and from the snapshot format.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::buildings::BuildingLedger;
use crate::config::{GameConfig, ProductionConfig};
use crate::constants::*;
use crate::economy::store::DailyAdCounter;
use crate::economy::Wallet;
use crate::error::{ProgressionError, Result};
use crate::progression::StatGrowth;

/// Account level and XP toward the next level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub current_xp: u64,
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self {
            level: 1,
            current_xp: 0,
        }
    }
}

/// A hero's combat stat sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeroStats {
    pub max_hp: f64,
    pub current_hp: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub crit_chance: f64,
}

impl HeroStats {
    pub fn new(max_hp: f64, attack: f64, defense: f64, speed: f64, crit_chance: f64) -> Self {
        Self {
            max_hp,
            current_hp: max_hp,
            attack,
            defense,
            speed,
            crit_chance,
        }
    }

    pub fn starter() -> Self {
        Self::new(
            STARTER_HERO_HP,
            STARTER_HERO_ATTACK,
            STARTER_HERO_DEFENSE,
            STARTER_HERO_SPEED,
            STARTER_HERO_CRIT,
        )
    }

    /// Sheet after `level - 1` reallocations from `base`, at full HP
    pub fn at_level(base: &HeroStats, growth: &StatGrowth, level: u32) -> Self {
        let g = growth.scaled(level.saturating_sub(1));
        Self::new(
            base.max_hp + g.max_hp,
            base.attack + g.attack,
            base.defense + g.defense,
            base.speed + g.speed,
            base.crit_chance + g.crit_chance,
        )
    }

    /// One level's worth of growth; heals to full
    pub fn apply_growth(&mut self, growth: &StatGrowth) {
        self.max_hp += growth.max_hp;
        self.attack += growth.attack;
        self.defense += growth.defense;
        self.speed += growth.speed;
        self.crit_chance += growth.crit_chance;
        self.current_hp = self.max_hp;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSlot {
    pub slot_type: String,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroRecord {
    pub hero_id: String,
    pub level: u32,
    #[serde(rename = "currentXP")]
    pub current_xp: u64,
    pub is_unlocked: bool,
    #[serde(rename = "currentHP")]
    pub current_hp: f64,
    #[serde(default)]
    pub equipment: Vec<EquipmentSlot>,
}

impl HeroRecord {
    pub fn unlocked(hero_id: &str, current_hp: f64) -> Self {
        Self {
            hero_id: hero_id.to_string(),
            level: 1,
            current_xp: 0,
            is_unlocked: true,
            current_hp,
            equipment: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub enhancement_level: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VipStatus {
    pub is_vip: bool,
    pub expiry: Option<DateTime<Utc>>,
}

impl VipStatus {
    /// VIP with no expiry date never lapses
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_vip && self.expiry.is_some_and(|e| e <= now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionState {
    pub player_id: String,
    pub progress: LevelProgress,
    pub buildings: BuildingLedger,
    pub wallet: Wallet,
    pub vip: VipStatus,
    pub ads: DailyAdCounter,
    pub heroes: Vec<HeroRecord>,
    pub inventory: Vec<ItemStack>,
    pub purchased_products: Vec<String>,
    pub last_saved: DateTime<Utc>,
}

impl ProgressionState {
    /// Fresh account: starter balances, starter hero, level-1 buildings
    pub fn new_game(config: &GameConfig, player_id: String, now: DateTime<Utc>) -> Self {
        let np = &config.new_player;
        info!(player = %player_id, "Creating new game state");
        Self {
            player_id,
            progress: LevelProgress::default(),
            buildings: BuildingLedger::from_templates(&config.buildings),
            wallet: Wallet::new(np.gold, np.premium_currency),
            vip: VipStatus::default(),
            ads: DailyAdCounter::new(config.monetization.daily_ad_limit),
            heroes: vec![HeroRecord::unlocked(&np.starter_hero_id, STARTER_HERO_HP)],
            inventory: Vec::new(),
            purchased_products: Vec::new(),
            last_saved: now,
        }
    }

    pub fn is_vip(&self) -> bool {
        self.vip.is_vip
    }

    pub fn set_vip(&mut self, is_vip: bool) {
        self.vip.is_vip = is_vip;
        if !is_vip {
            self.vip.expiry = None;
        }
    }

    /// Grant or extend VIP; stacks on an unexpired subscription
    pub fn extend_vip(&mut self, by: Duration, now: DateTime<Utc>) {
        let from = match self.vip.expiry {
            Some(e) if self.vip.is_vip && e > now => e,
            _ => now,
        };
        let expiry = from.checked_add_signed(by).unwrap_or_else(|| {
            warn!(%from, "VIP expiry past the representable range, pinned");
            DateTime::<Utc>::MAX_UTC
        });
        self.vip = VipStatus {
            is_vip: true,
            expiry: Some(expiry),
        };
        info!(%expiry, "VIP extended");
    }

    /// Drop VIP whose expiry date has passed; returns true when it was cleared
    pub fn clear_expired_vip(&mut self, now: DateTime<Utc>) -> bool {
        if self.vip.is_expired(now) {
            info!(player = %self.player_id, "VIP expired");
            self.set_vip(false);
            true
        } else {
            false
        }
    }

    pub fn offline_cap_hours(&self, production: &ProductionConfig) -> f64 {
        production.offline_cap_for(self.is_vip())
    }

    pub fn has_purchased(&self, product_id: &str) -> bool {
        self.purchased_products.iter().any(|p| p == product_id)
    }

    pub fn item_quantity(&self, item_id: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|s| s.item_id == item_id)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn add_item(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self
            .inventory
            .iter_mut()
            .find(|s| s.item_id == item_id && s.enhancement_level == 0)
        {
            Some(stack) => stack.quantity = stack.quantity.saturating_add(quantity),
            None => self.inventory.push(ItemStack {
                item_id: item_id.to_string(),
                quantity,
                enhancement_level: 0,
            }),
        }
    }

    /// Consume items from the first matching stacks; empty stacks are dropped
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> Result<()> {
        if self.item_quantity(item_id) < quantity {
            return Err(ProgressionError::NotFound(item_id.to_string()));
        }
        let mut left = quantity;
        for stack in self.inventory.iter_mut().filter(|s| s.item_id == item_id) {
            let take = left.min(stack.quantity);
            stack.quantity -= take;
            left -= take;
            if left == 0 {
                break;
            }
        }
        self.inventory.retain(|s| s.quantity > 0);
        Ok(())
    }

    /// First unlocked hero, the one account levels apply to
    pub fn active_hero_mut(&mut self) -> Option<&mut HeroRecord> {
        self.heroes.iter_mut().find(|h| h.is_unlocked)
    }
}

/// Random 128-bit player id in lowercase hex
pub fn generate_player_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>())
}
