//! Combat resolution.
//!
//! Damage formula:
//! `max(1, round(attack * attack_buff * skill * 100 / (100 + defense * defense_buff) * crit))`
//! where `crit` is 1.0, or 2.0 (2.5 for ultimates) when the crit roll
//! succeeds. Rounding is half away from zero. A dodge roll, when the caller
//! asks for one, happens before anything else and cancels the hit.
//!
//! Randomness comes from a seedable RNG owned by the resolver, so a fight
//! replays identically from the same seed.

pub mod status;

use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CombatConfig;
use crate::constants::{DEFENSE_CURVE, DODGE_SPEED_DIVISOR};
use crate::events::{EventSink, GameEvent};
use crate::player::HeroStats;
use status::{StatusKind, StatusTickReport, StatusTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// A fighter: stat sheet plus transient combat modifiers
#[derive(Debug, Clone, PartialEq)]
pub struct CombatActor {
    pub id: ActorId,
    pub stats: HeroStats,
    pub attack_buff: f64,
    pub defense_buff: f64,
    pub stunned: bool,
}

impl CombatActor {
    pub fn new(id: ActorId, stats: HeroStats) -> Self {
        Self {
            id,
            stats,
            attack_buff: 1.0,
            defense_buff: 1.0,
            stunned: false,
        }
    }

    pub fn effective_attack(&self) -> f64 {
        self.stats.attack * self.attack_buff
    }

    pub fn effective_defense(&self) -> f64 {
        (self.stats.defense * self.defense_buff).max(0.0)
    }

    pub fn is_alive(&self) -> bool {
        self.stats.current_hp > 0.0
    }

    pub fn can_act(&self) -> bool {
        self.is_alive() && !self.stunned
    }

    /// HP never drops below zero
    pub fn take_damage(&mut self, amount: f64) {
        self.stats.current_hp = (self.stats.current_hp - amount.max(0.0)).max(0.0);
    }

    pub fn heal(&mut self, amount: f64) {
        self.stats.current_hp = (self.stats.current_hp + amount.max(0.0)).min(self.stats.max_hp);
    }
}

/// Lookup of actors by id for effects that outlive a single call
pub trait ActorRoster {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut CombatActor>;
}

impl ActorRoster for CombatActor {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut CombatActor> {
        (self.id == id).then_some(self)
    }
}

impl ActorRoster for [CombatActor] {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut CombatActor> {
        self.iter_mut().find(|a| a.id == id)
    }
}

impl ActorRoster for Vec<CombatActor> {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut CombatActor> {
        self.as_mut_slice().actor_mut(id)
    }
}

impl ActorRoster for HashMap<ActorId, CombatActor> {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut CombatActor> {
        self.get_mut(&id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOutcome {
    pub damage: u32,
    pub is_critical: bool,
    pub dodged: bool,
}

impl AttackOutcome {
    fn dodged() -> Self {
        Self {
            damage: 0,
            is_critical: false,
            dodged: true,
        }
    }
}

/// A hero skill: damage multiplier plus an optional on-hit status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub multiplier: f64,
    #[serde(default)]
    pub is_ultimate: bool,
    #[serde(default)]
    pub on_hit: Option<(StatusKind, f64)>,
}

impl Skill {
    pub fn basic(name: &str, multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            multiplier,
            is_ultimate: false,
            on_hit: None,
        }
    }

    /// Auron's arc swing
    pub fn solar_cleave() -> Self {
        Self::basic("Solar Cleave", 1.8)
    }

    /// Auron's ultimate: heavy slam that stuns
    pub fn eclipse_breaker() -> Self {
        Self {
            name: "Eclipse Breaker".to_string(),
            multiplier: 3.5,
            is_ultimate: true,
            on_hit: Some((StatusKind::Stun, 1.5)),
        }
    }
}

/// Rolls and applies attacks. Generic over the RNG so tests can pin it.
#[derive(Debug, Clone)]
pub struct CombatResolver<R: Rng = Xoshiro256PlusPlus> {
    config: CombatConfig,
    rng: R,
}

impl CombatResolver<Xoshiro256PlusPlus> {
    pub fn seeded(config: CombatConfig, seed: u64) -> Self {
        Self::with_rng(config, Xoshiro256PlusPlus::seed_from_u64(seed))
    }
}

impl<R: Rng> CombatResolver<R> {
    pub fn with_rng(config: CombatConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Deterministic part of the formula, before crit and rounding
    pub fn raw_damage(attacker: &CombatActor, target: &CombatActor, skill_multiplier: f64) -> f64 {
        let base = attacker.effective_attack() * skill_multiplier;
        let reduction = DEFENSE_CURVE / (DEFENSE_CURVE + target.effective_defense());
        base * reduction
    }

    pub fn dodge_chance(&self, speed: f64) -> f64 {
        (speed / DODGE_SPEED_DIVISOR).clamp(0.0, self.config.max_dodge_chance)
    }

    pub fn roll_dodge(&mut self, speed: f64) -> bool {
        let chance = self.dodge_chance(speed);
        self.rng.gen::<f64>() < chance
    }

    /// Apply one hit to `target`. Never misses; see [`Self::attack_with_dodge`].
    pub fn resolve_attack(
        &mut self,
        attacker: &CombatActor,
        target: &mut CombatActor,
        skill_multiplier: f64,
        is_ultimate: bool,
        sink: &mut dyn EventSink,
    ) -> AttackOutcome {
        let is_critical = self.rng.gen::<f64>() < attacker.stats.crit_chance;
        let crit = match (is_critical, is_ultimate) {
            (false, _) => 1.0,
            (true, false) => self.config.crit_damage_mult,
            (true, true) => self.config.ultimate_crit_damage_mult,
        };

        let raw = Self::raw_damage(attacker, target, skill_multiplier) * crit;
        let damage = raw.round().max(1.0) as u32;
        target.take_damage(damage as f64);

        debug!(
            attacker = attacker.id.0,
            target = target.id.0,
            damage,
            is_critical,
            hp_left = target.stats.current_hp,
            "Attack resolved"
        );
        sink.emit(GameEvent::DamageDealt {
            attacker: Some(attacker.id),
            target: target.id,
            damage: damage as f64,
            is_critical,
        });

        AttackOutcome {
            damage,
            is_critical,
            dodged: false,
        }
    }

    /// Dodge check against the target's speed, then the hit
    pub fn attack_with_dodge(
        &mut self,
        attacker: &CombatActor,
        target: &mut CombatActor,
        skill_multiplier: f64,
        is_ultimate: bool,
        sink: &mut dyn EventSink,
    ) -> AttackOutcome {
        if self.roll_dodge(target.stats.speed) {
            debug!(attacker = attacker.id.0, target = target.id.0, "Attack dodged");
            sink.emit(GameEvent::AttackDodged {
                attacker: attacker.id,
                target: target.id,
            });
            return AttackOutcome::dodged();
        }
        self.resolve_attack(attacker, target, skill_multiplier, is_ultimate, sink)
    }

    /// Dodge-checked skill hit, applying the skill's status on a landed hit
    pub fn cast_skill(
        &mut self,
        attacker: &CombatActor,
        target: &mut CombatActor,
        skill: &Skill,
        tracker: &mut StatusTracker,
        sink: &mut dyn EventSink,
    ) -> AttackOutcome {
        let outcome =
            self.attack_with_dodge(attacker, target, skill.multiplier, skill.is_ultimate, sink);
        if !outcome.dodged {
            if let Some((kind, duration)) = skill.on_hit {
                tracker.apply(target, kind, duration, &self.config, sink);
            }
        }
        outcome
    }

    pub fn apply_status_effect(
        &self,
        tracker: &mut StatusTracker,
        target: &mut CombatActor,
        kind: StatusKind,
        duration: f64,
        sink: &mut dyn EventSink,
    ) -> bool {
        tracker.apply(target, kind, duration, &self.config, sink)
    }

    /// Advance every live effect in `tracker` by `dt` seconds
    pub fn tick_status_effects(
        &self,
        tracker: &mut StatusTracker,
        roster: &mut dyn ActorRoster,
        dt: f64,
        sink: &mut dyn EventSink,
    ) -> StatusTickReport {
        tracker.tick(roster, dt, sink)
    }
}
