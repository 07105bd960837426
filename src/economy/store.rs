//! Storefront catalog and rewarded ads.
//!
//! Receipt checks and ad playback belong to platform SDKs. This module
//! only decides what a validated purchase or a finished ad is worth, and
//! applies it to the player's state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{VIP_AD_ALLOWANCE, VIP_SUBSCRIPTION_DAYS};
use crate::economy::{Currency, CurrencyLedger};
use crate::error::{ProgressionError, Result};
use crate::player::ProgressionState;

/// Item id granted by the instant-upgrade kit
pub const INSTANT_UPGRADE_KIT: &str = "instant_upgrade_kit";

/// Inventory item id for ad-rewarded crafting materials
pub const CRAFTING_MATERIALS: &str = "crafting_materials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Consumable,
    /// Can be owned once
    NonConsumable,
    Subscription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductReward {
    Premium { amount: u64 },
    Gold { amount: u64 },
    Vip { days: i64 },
    Item { item_id: String, quantity: u32 },
    /// Ownership is the whole reward (battle pass)
    Unlock { feature: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDef {
    pub id: String,
    pub name: String,
    pub kind: ProductKind,
    pub rewards: Vec<ProductReward>,
}

impl ProductDef {
    pub fn is_one_time(&self) -> bool {
        self.kind == ProductKind::NonConsumable
    }
}

fn product(id: &str, name: &str, kind: ProductKind, rewards: Vec<ProductReward>) -> ProductDef {
    ProductDef {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        rewards,
    }
}

fn premium(amount: u64) -> Vec<ProductReward> {
    vec![ProductReward::Premium { amount }]
}

fn item(item_id: &str, quantity: u32) -> Vec<ProductReward> {
    vec![ProductReward::Item {
        item_id: item_id.to_string(),
        quantity,
    }]
}

pub fn default_catalog() -> Vec<ProductDef> {
    use ProductKind::*;
    vec![
        product("gems_tier1", "Handful of Shards", Consumable, premium(120)),
        product("gems_tier2", "Pouch of Shards", Consumable, premium(650)),
        product("gems_tier3", "Sack of Shards", Consumable, premium(1400)),
        product("gems_tier4", "Chest of Shards", Consumable, premium(3000)),
        product("gems_tier5", "Vault of Shards", Consumable, premium(8000)),
        product("starter_pack_001", "Starter Pack", NonConsumable, premium(1200)),
        product("progression_boost_001", "Progression Boost", NonConsumable, premium(2000)),
        product(
            "monthly_sub_001",
            "Sanctuary VIP",
            Subscription,
            vec![ProductReward::Vip {
                days: VIP_SUBSCRIPTION_DAYS,
            }],
        ),
        product("legendary_chest_001", "Legendary Chest", Consumable, item("legendary_chest", 1)),
        product(
            "battle_pass_001",
            "Battle Pass",
            NonConsumable,
            vec![ProductReward::Unlock {
                feature: "battle_pass".to_string(),
            }],
        ),
        product("instant_upgrade_kit", "Instant Upgrade Kit", Consumable, item(INSTANT_UPGRADE_KIT, 1)),
    ]
}

/// Server-side receipt check. Only a `true` answer leads to a grant.
pub trait PurchaseValidator {
    fn validate(&mut self, product_id: &str) -> bool;
}

impl<F> PurchaseValidator for F
where
    F: FnMut(&str) -> bool,
{
    fn validate(&mut self, product_id: &str) -> bool {
        self(product_id)
    }
}

/// Approves everything. Development builds only.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproveAll;

impl PurchaseValidator for ApproveAll {
    fn validate(&mut self, product_id: &str) -> bool {
        warn!(product = product_id, "Purchase approved without receipt validation");
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Granted(Vec<ProductReward>),
    /// Validator refused the receipt; nothing granted
    Rejected,
    /// One-time product the player already owns
    AlreadyOwned,
}

#[derive(Debug, Clone)]
pub struct Storefront {
    catalog: Vec<ProductDef>,
}

impl Storefront {
    pub fn new(catalog: Vec<ProductDef>) -> Self {
        Self { catalog }
    }

    pub fn product(&self, id: &str) -> Option<&ProductDef> {
        self.catalog.iter().find(|p| p.id == id)
    }

    pub fn products(&self) -> &[ProductDef] {
        &self.catalog
    }

    pub fn purchase(
        &self,
        product_id: &str,
        validator: &mut dyn PurchaseValidator,
        state: &mut ProgressionState,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome> {
        let product = self
            .product(product_id)
            .ok_or_else(|| ProgressionError::NotFound(product_id.to_string()))?;

        if product.is_one_time() && state.has_purchased(product_id) {
            warn!(product = product_id, "One-time product already owned");
            return Ok(PurchaseOutcome::AlreadyOwned);
        }
        if !validator.validate(product_id) {
            warn!(product = product_id, "Receipt validation failed");
            return Ok(PurchaseOutcome::Rejected);
        }

        for reward in &product.rewards {
            apply_reward(reward, state, now);
        }
        if product.is_one_time() {
            state.purchased_products.push(product_id.to_string());
        }
        info!(product = product_id, "Purchase granted");
        Ok(PurchaseOutcome::Granted(product.rewards.clone()))
    }
}

fn apply_reward(reward: &ProductReward, state: &mut ProgressionState, now: DateTime<Utc>) {
    match reward {
        ProductReward::Premium { amount } => state.wallet.credit(Currency::Premium, *amount),
        ProductReward::Gold { amount } => state.wallet.credit(Currency::Gold, *amount),
        ProductReward::Vip { days } => state.extend_vip(Duration::days(*days), now),
        ProductReward::Item { item_id, quantity } => state.add_item(item_id, *quantity),
        ProductReward::Unlock { feature } => info!(feature = %feature, "Feature unlocked"),
    }
}

// =====================================================
// Rewarded ads
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdReward {
    /// Gold plus crafting materials
    ResourcePack,
    /// Timed production multiplier
    ProductionBoost,
    /// Pays the last offline reward a second time
    OfflineDoubler,
}

/// Daily allowance of rewarded videos
pub trait RewardedAdGate {
    fn remaining_allowance(&mut self, now: DateTime<Utc>, is_vip: bool) -> u32;

    fn record_watch(&mut self, now: DateTime<Utc>);

    fn can_watch(&mut self, now: DateTime<Utc>, is_vip: bool) -> bool {
        self.remaining_allowance(now, is_vip) > 0
    }
}

/// Persisted ad counter, reset whenever the UTC date changes
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAdCounter {
    pub watched_today: u32,
    pub last_reset: Option<DateTime<Utc>>,
    pub daily_limit: u32,
}

impl DailyAdCounter {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            watched_today: 0,
            last_reset: None,
            daily_limit,
        }
    }

    fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.last_reset.map(|d| d.date_naive()) != Some(today) {
            self.watched_today = 0;
            self.last_reset = Some(now);
        }
    }
}

impl RewardedAdGate for DailyAdCounter {
    fn remaining_allowance(&mut self, now: DateTime<Utc>, is_vip: bool) -> u32 {
        self.roll_over(now);
        if is_vip {
            VIP_AD_ALLOWANCE
        } else {
            self.daily_limit.saturating_sub(self.watched_today)
        }
    }

    fn record_watch(&mut self, now: DateTime<Utc>) {
        self.roll_over(now);
        self.watched_today += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 2, 12, 0, 0).unwrap()
    }

    fn state() -> ProgressionState {
        ProgressionState::new_game(&GameConfig::default(), "p1".into(), now())
    }

    #[test]
    fn test_catalog_has_original_products() {
        let store = Storefront::new(default_catalog());
        assert_eq!(store.products().len(), 11);
        assert!(store.product("starter_pack_001").unwrap().is_one_time());
        assert!(!store.product("gems_tier1").unwrap().is_one_time());
    }

    #[test]
    fn test_gems_purchase_credits_premium() {
        let store = Storefront::new(default_catalog());
        let mut state = state();
        let outcome = store
            .purchase("gems_tier3", &mut ApproveAll, &mut state, now())
            .unwrap();
        assert!(matches!(outcome, PurchaseOutcome::Granted(_)));
        assert_eq!(state.wallet.premium, 200 + 1400);
    }

    #[test]
    fn test_rejected_purchase_grants_nothing() {
        let store = Storefront::new(default_catalog());
        let mut state = state();
        let mut deny = |_: &str| false;
        let outcome = store
            .purchase("gems_tier5", &mut deny, &mut state, now())
            .unwrap();
        assert_eq!(outcome, PurchaseOutcome::Rejected);
        assert_eq!(state.wallet.premium, 200);
    }

    #[test]
    fn test_one_time_product_refused_second_time() {
        let store = Storefront::new(default_catalog());
        let mut state = state();
        store
            .purchase("starter_pack_001", &mut ApproveAll, &mut state, now())
            .unwrap();
        let outcome = store
            .purchase("starter_pack_001", &mut ApproveAll, &mut state, now())
            .unwrap();
        assert_eq!(outcome, PurchaseOutcome::AlreadyOwned);
        assert_eq!(state.wallet.premium, 200 + 1200);
    }

    #[test]
    fn test_unknown_product() {
        let store = Storefront::new(default_catalog());
        let err = store
            .purchase("gems_tier9", &mut ApproveAll, &mut state(), now())
            .unwrap_err();
        assert_eq!(err, ProgressionError::NotFound("gems_tier9".into()));
    }

    #[test]
    fn test_subscription_grants_vip() {
        let store = Storefront::new(default_catalog());
        let mut state = state();
        store
            .purchase("monthly_sub_001", &mut ApproveAll, &mut state, now())
            .unwrap();
        assert!(state.vip.is_vip);
        assert_eq!(state.vip.expiry, Some(now() + Duration::days(30)));
    }

    #[test]
    fn test_chest_and_kit_land_in_inventory() {
        let store = Storefront::new(default_catalog());
        let mut state = state();
        store
            .purchase("legendary_chest_001", &mut ApproveAll, &mut state, now())
            .unwrap();
        store
            .purchase("instant_upgrade_kit", &mut ApproveAll, &mut state, now())
            .unwrap();
        assert_eq!(state.item_quantity("legendary_chest"), 1);
        assert_eq!(state.item_quantity(INSTANT_UPGRADE_KIT), 1);
    }

    #[test]
    fn test_ad_counter_limit_and_reset() {
        let mut counter = DailyAdCounter::new(3);
        for _ in 0..3 {
            assert!(counter.can_watch(now(), false));
            counter.record_watch(now());
        }
        assert_eq!(counter.remaining_allowance(now(), false), 0);
        assert_eq!(counter.remaining_allowance(now(), true), 999);

        let tomorrow = now() + Duration::days(1);
        assert_eq!(counter.remaining_allowance(tomorrow, false), 3);
    }

    #[test]
    fn test_ad_counter_resets_at_utc_midnight_not_24h() {
        let mut counter = DailyAdCounter::new(3);
        let late = Utc.with_ymd_and_hms(2025, 11, 2, 23, 59, 0).unwrap();
        counter.record_watch(late);
        let after_midnight = Utc.with_ymd_and_hms(2025, 11, 3, 0, 1, 0).unwrap();
        assert_eq!(counter.remaining_allowance(after_midnight, false), 3);
    }
}
