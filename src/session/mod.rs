//! Game session: one player's live state plus the systems that act on it.
//!
//! The host owns a [`GameSession`], calls [`GameSession::tick`] once per
//! frame and drains the event queue afterwards. Tick order is fixed:
//! 1. live production (sees buildings as they were before this tick)
//! 2. ad-boost countdown
//! 3. building timers
//! 4. status effects
//!
//! A session is single-writer. Hosts serving several players keep one
//! session per player behind their own lock or actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buildings::UpgradeTicket;
use crate::combat::status::{StatusKind, StatusTickReport, StatusTracker};
use crate::combat::{ActorId, ActorRoster, AttackOutcome, CombatActor, CombatResolver, Skill};
use crate::config::GameConfig;
use crate::economy::store::{
    AdReward, PurchaseOutcome, PurchaseValidator, RewardedAdGate, Storefront, CRAFTING_MATERIALS,
    INSTANT_UPGRADE_KIT,
};
use crate::economy::{Currency, CurrencyLedger};
use crate::error::{ProgressionError, Result};
use crate::events::{EventQueue, EventSink, GameEvent, ProductionSource};
use crate::leveling::{LevelUpReport, LevelingSystem};
use crate::player::{HeroStats, ProgressionState};
use crate::production::offline::OfflineReport;
use crate::production::{ProductionEngine, ProductionYield};
use crate::save::{LoadReport, SaveCoordinator, SaveError, SaveStore};

/// Combat id of the player's active hero
pub const HERO_ACTOR_ID: ActorId = ActorId(0);

/// How an instant finish is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantFinishPayment {
    Premium,
    /// Consumes one instant-upgrade kit instead of premium currency
    UpgradeKit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdWatchOutcome {
    Granted(AdReward),
    DailyLimitReached,
    /// Offline doubler with no unclaimed offline reward; the ad is not counted
    NothingToDouble,
}

/// What one session tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub produced: ProductionYield,
    pub completed_upgrades: Vec<String>,
    pub status: StatusTickReport,
}

/// The hero plus whatever other actors the caller is fighting
struct EncounterRoster<'a> {
    hero: &'a mut CombatActor,
    others: &'a mut dyn ActorRoster,
}

impl ActorRoster for EncounterRoster<'_> {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut CombatActor> {
        if id == self.hero.id {
            Some(&mut *self.hero)
        } else {
            self.others.actor_mut(id)
        }
    }
}

#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    state: ProgressionState,
    production: ProductionEngine,
    leveling: LevelingSystem,
    storefront: Storefront,
    combat: CombatResolver,
    statuses: StatusTracker,
    hero: CombatActor,
    events: EventQueue,
    /// Last offline payout that an offline-doubler ad may still repeat
    unclaimed_offline: Option<ProductionYield>,
}

impl GameSession {
    /// Session over an already-loaded state. `seed` drives combat rolls.
    pub fn new(config: GameConfig, state: ProgressionState, seed: u64) -> Self {
        let leveling = LevelingSystem::from_config(&config.xp);
        let hero = Self::build_hero(&state, &leveling);
        Self {
            production: ProductionEngine::new(config.production.clone()),
            storefront: Storefront::new(config.monetization.products.clone()),
            combat: CombatResolver::seeded(config.combat.clone(), seed),
            statuses: StatusTracker::new(),
            events: EventQueue::new(),
            unclaimed_offline: None,
            leveling,
            hero,
            state,
            config,
        }
    }

    /// Session from a coordinator load; the offline payout becomes an event
    /// and stays available to the offline-doubler ad.
    pub fn from_load(config: GameConfig, report: LoadReport, seed: u64) -> Self {
        let mut session = Self::new(config, report.state, seed);
        session.record_offline(&report.offline);
        session
    }

    fn build_hero(state: &ProgressionState, leveling: &LevelingSystem) -> CombatActor {
        let mut stats =
            HeroStats::at_level(&HeroStats::starter(), leveling.growth(), state.progress.level);
        if let Some(record) = state.heroes.iter().find(|h| h.is_unlocked) {
            // 0 means the save did not know the HP
            if record.current_hp > 0.0 {
                stats.current_hp = record.current_hp.min(stats.max_hp);
            }
        }
        CombatActor::new(HERO_ACTOR_ID, stats)
    }

    fn record_offline(&mut self, report: &OfflineReport) {
        if !report.paid_anything() {
            return;
        }
        self.events.emit(GameEvent::ResourcesProduced {
            gold: report.produced.gold,
            premium: report.produced.premium,
            source: ProductionSource::Offline,
        });
        self.unclaimed_offline = Some(report.produced);
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ProgressionState {
        &mut self.state
    }

    pub fn production(&self) -> &ProductionEngine {
        &self.production
    }

    pub fn leveling(&self) -> &LevelingSystem {
        &self.leveling
    }

    pub fn storefront(&self) -> &Storefront {
        &self.storefront
    }

    pub fn statuses(&self) -> &StatusTracker {
        &self.statuses
    }

    pub fn hero(&self) -> &CombatActor {
        &self.hero
    }

    pub fn hero_mut(&mut self) -> &mut CombatActor {
        &mut self.hero
    }

    // =====================================================
    // Events
    // =====================================================

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain_events()
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        self.events.pending_events()
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    // =====================================================
    // Ticking
    // =====================================================

    /// Advance the session with no enemies in play
    pub fn tick(&mut self, dt: f64, now: DateTime<Utc>) -> TickReport {
        let mut nobody: Vec<CombatActor> = Vec::new();
        self.tick_encounter(dt, now, &mut nobody)
    }

    /// Advance the session; status effects on `enemies` tick alongside the
    /// hero's own.
    pub fn tick_encounter(
        &mut self,
        dt: f64,
        now: DateTime<Utc>,
        enemies: &mut dyn ActorRoster,
    ) -> TickReport {
        let produced =
            self.production
                .tick_live(self.state.buildings.buildings(), dt, &mut self.events);
        self.state.wallet.credit(Currency::Gold, produced.gold);
        self.state.wallet.credit(Currency::Premium, produced.premium);

        self.production.tick_ad_boost(dt, &mut self.events);

        let completed_upgrades = self.state.buildings.tick(now, &mut self.events);

        let mut roster = EncounterRoster {
            hero: &mut self.hero,
            others: enemies,
        };
        let status =
            self.combat
                .tick_status_effects(&mut self.statuses, &mut roster, dt, &mut self.events);

        TickReport {
            produced,
            completed_upgrades,
            status,
        }
    }

    // =====================================================
    // Buildings
    // =====================================================

    /// Pay for and start an upgrade. Nothing is charged when it cannot start.
    pub fn upgrade_building(&mut self, id: &str, now: DateTime<Utc>) -> Result<UpgradeTicket> {
        let quote = self.state.buildings.quote_upgrade(id)?;
        self.state.wallet.debit(Currency::Gold, quote.cost)?;
        match self.state.buildings.start_upgrade(id, now, &mut self.events) {
            Ok(ticket) => Ok(ticket),
            Err(e) => {
                self.state.wallet.credit(Currency::Gold, quote.cost);
                Err(e)
            }
        }
    }

    /// Finish an upgrade now. Timers are brought up to `now` first, so the
    /// price reflects the real remaining time.
    pub fn instant_finish_upgrade(
        &mut self,
        id: &str,
        payment: InstantFinishPayment,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        self.state.buildings.tick(now, &mut self.events);
        let building = self
            .state
            .buildings
            .get(id)
            .ok_or_else(|| ProgressionError::NotFound(id.to_string()))?;
        if !building.is_upgrading() {
            return Err(ProgressionError::NotUpgrading(id.to_string()));
        }

        match payment {
            InstantFinishPayment::Premium => {
                let cost = building.instant_finish_cost();
                self.state.wallet.debit(Currency::Premium, cost)?;
                debug!(building = id, cost, "Instant finish paid with premium");
            }
            InstantFinishPayment::UpgradeKit => {
                self.state.remove_item(INSTANT_UPGRADE_KIT, 1)?;
                debug!(building = id, "Instant finish paid with upgrade kit");
            }
        }
        self.state.buildings.instant_finish(id, &mut self.events)
    }

    // =====================================================
    // Progression
    // =====================================================

    pub fn add_xp(&mut self, amount: u64) -> LevelUpReport {
        let report = self.leveling.add_xp(
            &mut self.state.progress,
            &mut self.hero.stats,
            amount,
            &mut self.events,
        );
        self.sync_active_hero();
        report
    }

    pub fn award_stage_xp(&mut self, is_boss: bool) -> LevelUpReport {
        self.add_xp(self.leveling.stage_xp(is_boss))
    }

    pub fn award_enemy_defeated(&mut self) -> LevelUpReport {
        let report = self.leveling.award_enemy_defeated(
            &mut self.state.progress,
            &mut self.hero.stats,
            &mut self.events,
        );
        self.sync_active_hero();
        report
    }

    pub fn xp_progress(&self) -> f64 {
        self.leveling.xp_progress(&self.state.progress)
    }

    fn sync_active_hero(&mut self) {
        let progress = self.state.progress;
        let hp = self.hero.stats.current_hp;
        if let Some(record) = self.state.active_hero_mut() {
            record.level = progress.level;
            record.current_xp = progress.current_xp;
            record.current_hp = hp;
        }
    }

    // =====================================================
    // Monetization
    // =====================================================

    pub fn set_vip(&mut self, is_vip: bool) {
        self.state.set_vip(is_vip);
        info!(
            is_vip,
            offline_cap_hours = self.state.offline_cap_hours(&self.config.production),
            "VIP status changed"
        );
    }

    pub fn ads_remaining(&mut self, now: DateTime<Utc>) -> u32 {
        let is_vip = self.state.is_vip();
        self.state.ads.remaining_allowance(now, is_vip)
    }

    pub fn watch_ad(&mut self, reward: AdReward, now: DateTime<Utc>) -> AdWatchOutcome {
        let is_vip = self.state.is_vip();
        if !self.state.ads.can_watch(now, is_vip) {
            warn!(?reward, "Daily ad limit reached");
            return AdWatchOutcome::DailyLimitReached;
        }

        match reward {
            AdReward::ResourcePack => {
                let m = &self.config.monetization;
                self.state.wallet.credit(Currency::Gold, m.resource_pack_gold);
                self.state
                    .add_item(CRAFTING_MATERIALS, m.resource_pack_materials);
            }
            AdReward::ProductionBoost => self.production.activate_ad_boost(),
            AdReward::OfflineDoubler => {
                let Some(offline) = self.unclaimed_offline.take() else {
                    debug!("No offline reward to double");
                    return AdWatchOutcome::NothingToDouble;
                };
                self.state.wallet.credit(Currency::Gold, offline.gold);
                self.state.wallet.credit(Currency::Premium, offline.premium);
                self.events.emit(GameEvent::ResourcesProduced {
                    gold: offline.gold,
                    premium: offline.premium,
                    source: ProductionSource::OfflineDoubler,
                });
            }
        }

        self.state.ads.record_watch(now);
        info!(?reward, watched_today = self.state.ads.watched_today, "Ad reward granted");
        self.events.emit(GameEvent::AdRewardGranted { reward });
        AdWatchOutcome::Granted(reward)
    }

    pub fn purchase(
        &mut self,
        product_id: &str,
        validator: &mut dyn PurchaseValidator,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome> {
        let outcome = self
            .storefront
            .purchase(product_id, validator, &mut self.state, now)?;
        if matches!(outcome, PurchaseOutcome::Granted(_)) {
            self.events.emit(GameEvent::ProductGranted {
                product_id: product_id.to_string(),
            });
        }
        Ok(outcome)
    }

    // =====================================================
    // Combat
    // =====================================================

    /// Hero uses `skill` on `target`; `None` when the hero cannot act
    pub fn hero_attack(&mut self, target: &mut CombatActor, skill: &Skill) -> Option<AttackOutcome> {
        if !self.hero.can_act() {
            debug!("Hero cannot act");
            return None;
        }
        Some(
            self.combat
                .cast_skill(&self.hero, target, skill, &mut self.statuses, &mut self.events),
        )
    }

    /// `attacker` hits the hero, subject to the hero's dodge roll
    pub fn enemy_attack(
        &mut self,
        attacker: &CombatActor,
        skill_multiplier: f64,
    ) -> Option<AttackOutcome> {
        if !attacker.can_act() {
            return None;
        }
        let outcome = self.combat.attack_with_dodge(
            attacker,
            &mut self.hero,
            skill_multiplier,
            false,
            &mut self.events,
        );
        self.sync_active_hero();
        Some(outcome)
    }

    pub fn apply_status(&mut self, target: &mut CombatActor, kind: StatusKind, duration: f64) -> bool {
        self.combat
            .apply_status_effect(&mut self.statuses, target, kind, duration, &mut self.events)
    }

    pub fn apply_status_to_hero(&mut self, kind: StatusKind, duration: f64) -> bool {
        self.combat.apply_status_effect(
            &mut self.statuses,
            &mut self.hero,
            kind,
            duration,
            &mut self.events,
        )
    }

    pub fn cleanse_hero(&mut self) -> usize {
        self.statuses
            .cleanse_debuffs(&mut self.hero, &mut self.events)
    }

    /// Back to full HP with no effects, e.g. between stages
    pub fn reset_hero(&mut self) {
        self.statuses = StatusTracker::new();
        self.hero = Self::build_hero(&self.state, &self.leveling);
        self.hero.stats.current_hp = self.hero.stats.max_hp;
        self.sync_active_hero();
    }

    // =====================================================
    // Saving
    // =====================================================

    pub fn save<S: SaveStore>(
        &mut self,
        coordinator: &mut SaveCoordinator<S>,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), SaveError> {
        self.sync_active_hero();
        coordinator.save(&mut self.state, now)
    }
}
