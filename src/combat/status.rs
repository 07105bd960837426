//! Timed status effects.
//!
//! Every instance is independent: two burns on one target both tick, and a
//! second attack buff does not refresh the first. A side effect (stun, buff
//! multiplier) is reverted only when the last live instance of that kind on
//! the target goes away.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ActorId, ActorRoster, CombatActor};
use crate::config::CombatConfig;
use crate::events::{EventSink, GameEvent};

/// Accumulated float error tolerated when comparing a burn timer to its interval
const TICK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Burn,
    Stun,
    AttackBuff,
    DefenseBuff,
    /// Marker buff with no stat effect
    Shield,
}

impl StatusKind {
    pub fn is_debuff(&self) -> bool {
        matches!(self, StatusKind::Burn | StatusKind::Stun)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub target: ActorId,
    pub duration: f64,
    pub remaining: f64,
    /// Burn only
    pub damage_per_tick: f64,
    pub tick_interval: f64,
    pub tick_timer: f64,
}

impl StatusEffect {
    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// What one `tick` did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTickReport {
    pub burn_ticks: u32,
    pub burn_damage: f64,
    pub expired: Vec<(ActorId, StatusKind)>,
}

/// Live effects across every actor in an encounter
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    effects: Vec<StatusEffect>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effects_on(&self, target: ActorId) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter().filter(move |e| e.target == target)
    }

    pub fn has(&self, target: ActorId, kind: StatusKind) -> bool {
        self.effects_on(target).any(|e| e.kind == kind)
    }

    /// Attach a new instance to `target` and apply its side effect.
    ///
    /// Non-positive durations are ignored; returns whether it was applied.
    pub fn apply(
        &mut self,
        target: &mut CombatActor,
        kind: StatusKind,
        duration: f64,
        config: &CombatConfig,
        sink: &mut dyn EventSink,
    ) -> bool {
        if duration <= 0.0 || !duration.is_finite() {
            debug!(?kind, duration, "Ignoring status effect with no duration");
            return false;
        }

        let mut damage_per_tick = 0.0;
        match kind {
            StatusKind::Burn => damage_per_tick = target.stats.max_hp * config.burn_damage_fraction,
            StatusKind::Stun => target.stunned = true,
            StatusKind::AttackBuff => target.attack_buff = 1.0 + config.buff_bonus,
            StatusKind::DefenseBuff => target.defense_buff = 1.0 + config.buff_bonus,
            StatusKind::Shield => {}
        }

        self.effects.push(StatusEffect {
            kind,
            target: target.id,
            duration,
            remaining: duration,
            damage_per_tick,
            tick_interval: config.burn_tick_interval,
            tick_timer: 0.0,
        });
        debug!(target = target.id.0, ?kind, duration, "Status effect applied");
        sink.emit(GameEvent::StatusEffectApplied {
            target: target.id,
            kind,
            duration_secs: duration,
        });
        true
    }

    /// Advance every effect by `dt` seconds.
    ///
    /// Burn ticks are resolved before expiry, so a tick landing exactly on
    /// the end of the effect still fires; a partial final interval does not.
    pub fn tick(
        &mut self,
        roster: &mut dyn ActorRoster,
        dt: f64,
        sink: &mut dyn EventSink,
    ) -> StatusTickReport {
        let mut report = StatusTickReport::default();
        if !dt.is_finite() || dt <= 0.0 {
            return report;
        }

        for effect in self.effects.iter_mut() {
            let before = effect.remaining.max(0.0);
            effect.remaining -= dt;

            if effect.kind != StatusKind::Burn {
                continue;
            }
            effect.tick_timer += dt.min(before);
            while effect.tick_timer + TICK_EPSILON >= effect.tick_interval {
                effect.tick_timer -= effect.tick_interval;
                report.burn_ticks += 1;
                match roster.actor_mut(effect.target) {
                    Some(actor) => {
                        actor.take_damage(effect.damage_per_tick);
                        report.burn_damage += effect.damage_per_tick;
                        sink.emit(GameEvent::DamageDealt {
                            attacker: None,
                            target: effect.target,
                            damage: effect.damage_per_tick,
                            is_critical: false,
                        });
                    }
                    None => debug!(target = effect.target.0, "Burn target not in roster"),
                }
            }
        }

        let (expired, live): (Vec<_>, Vec<_>) =
            self.effects.drain(..).partition(StatusEffect::is_expired);
        self.effects = live;

        for effect in expired {
            self.revert_if_last(roster, effect.target, effect.kind);
            sink.emit(GameEvent::StatusEffectRemoved {
                target: effect.target,
                kind: effect.kind,
            });
            report.expired.push((effect.target, effect.kind));
        }
        report
    }

    /// Remove every Burn and Stun on `target` now and unstun it. Buffs stay.
    pub fn cleanse_debuffs(&mut self, target: &mut CombatActor, sink: &mut dyn EventSink) -> usize {
        let id = target.id;
        let before = self.effects.len();
        let mut removed = Vec::new();
        self.effects.retain(|e| {
            let drop = e.target == id && e.kind.is_debuff();
            if drop {
                removed.push(e.kind);
            }
            !drop
        });
        target.stunned = false;

        for kind in &removed {
            sink.emit(GameEvent::StatusEffectRemoved { target: id, kind: *kind });
        }
        debug!(target = id.0, removed = before - self.effects.len(), "Debuffs cleansed");
        removed.len()
    }

    fn revert_if_last(&self, roster: &mut dyn ActorRoster, target: ActorId, kind: StatusKind) {
        if self.has(target, kind) {
            return;
        }
        let Some(actor) = roster.actor_mut(target) else {
            return;
        };
        match kind {
            StatusKind::Stun => actor.stunned = false,
            StatusKind::AttackBuff => actor.attack_buff = 1.0,
            StatusKind::DefenseBuff => actor.defense_buff = 1.0,
            StatusKind::Burn | StatusKind::Shield => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::HeroStats;

    fn dummy(id: u32) -> CombatActor {
        CombatActor::new(ActorId(id), HeroStats::new(500.0, 45.0, 20.0, 100.0, 0.0))
    }

    fn config() -> CombatConfig {
        CombatConfig::default()
    }

    #[test]
    fn test_burn_three_and_a_half_seconds_ticks_three_times() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        let mut events = Vec::new();
        tracker.apply(&mut target, StatusKind::Burn, 3.5, &config(), &mut events);

        let mut ticks = 0;
        for _ in 0..7 {
            ticks += tracker.tick(&mut target, 0.5, &mut events).burn_ticks;
        }
        assert_eq!(ticks, 3);
        assert_eq!(target.stats.current_hp, 470.0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_burn_fires_on_exact_boundary() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        tracker.apply(&mut target, StatusKind::Burn, 3.0, &config(), &mut Vec::new());
        let mut ticks = 0;
        for _ in 0..3 {
            ticks += tracker.tick(&mut target, 1.0, &mut Vec::new()).burn_ticks;
        }
        assert_eq!(ticks, 3);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_large_dt_loops_but_stops_at_expiry() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        tracker.apply(&mut target, StatusKind::Burn, 3.5, &config(), &mut Vec::new());
        let report = tracker.tick(&mut target, 10.0, &mut Vec::new());
        assert_eq!(report.burn_ticks, 3);
        assert_eq!(report.expired, vec![(ActorId(1), StatusKind::Burn)]);
    }

    #[test]
    fn test_small_steps_accumulate() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        tracker.apply(&mut target, StatusKind::Burn, 3.5, &config(), &mut Vec::new());
        let mut ticks = 0;
        for _ in 0..60 {
            ticks += tracker.tick(&mut target, 0.1, &mut Vec::new()).burn_ticks;
        }
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_stun_expires_and_unstuns() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        tracker.apply(&mut target, StatusKind::Stun, 1.5, &config(), &mut Vec::new());
        assert!(target.stunned);
        tracker.tick(&mut target, 1.0, &mut Vec::new());
        assert!(target.stunned);
        tracker.tick(&mut target, 0.5, &mut Vec::new());
        assert!(!target.stunned);
    }

    #[test]
    fn test_buff_reverts_only_after_last_instance() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        let cfg = config();
        tracker.apply(&mut target, StatusKind::AttackBuff, 2.0, &cfg, &mut Vec::new());
        tracker.apply(&mut target, StatusKind::AttackBuff, 5.0, &cfg, &mut Vec::new());
        assert!((target.attack_buff - 1.1).abs() < 1e-12);

        tracker.tick(&mut target, 2.0, &mut Vec::new());
        assert!((target.attack_buff - 1.1).abs() < 1e-12);
        assert_eq!(tracker.len(), 1);

        tracker.tick(&mut target, 3.0, &mut Vec::new());
        assert_eq!(target.attack_buff, 1.0);
    }

    #[test]
    fn test_two_burns_both_tick() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        let cfg = config();
        tracker.apply(&mut target, StatusKind::Burn, 2.0, &cfg, &mut Vec::new());
        tracker.apply(&mut target, StatusKind::Burn, 2.0, &cfg, &mut Vec::new());
        let report = tracker.tick(&mut target, 1.0, &mut Vec::new());
        assert_eq!(report.burn_ticks, 2);
        assert_eq!(target.stats.current_hp, 480.0);
    }

    #[test]
    fn test_cleanse_keeps_buffs() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        let cfg = config();
        let mut events = Vec::new();
        tracker.apply(&mut target, StatusKind::Burn, 5.0, &cfg, &mut events);
        tracker.apply(&mut target, StatusKind::Stun, 5.0, &cfg, &mut events);
        tracker.apply(&mut target, StatusKind::DefenseBuff, 5.0, &cfg, &mut events);
        tracker.apply(&mut target, StatusKind::Shield, 5.0, &cfg, &mut events);

        assert_eq!(tracker.cleanse_debuffs(&mut target, &mut events), 2);
        assert!(!target.stunned);
        assert!(!tracker.has(target.id, StatusKind::Burn));
        assert!(tracker.has(target.id, StatusKind::DefenseBuff));
        assert!(tracker.has(target.id, StatusKind::Shield));
        assert!((target.defense_buff - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_cleanse_only_touches_target() {
        let mut tracker = StatusTracker::new();
        let mut a = dummy(1);
        let mut b = dummy(2);
        tracker.apply(&mut a, StatusKind::Burn, 5.0, &config(), &mut Vec::new());
        tracker.apply(&mut b, StatusKind::Burn, 5.0, &config(), &mut Vec::new());
        tracker.cleanse_debuffs(&mut a, &mut Vec::new());
        assert!(tracker.has(ActorId(2), StatusKind::Burn));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_zero_duration_ignored() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        assert!(!tracker.apply(&mut target, StatusKind::Stun, 0.0, &config(), &mut Vec::new()));
        assert!(!target.stunned);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_non_finite_dt_is_skipped() {
        let mut tracker = StatusTracker::new();
        let mut target = dummy(1);
        tracker.apply(&mut target, StatusKind::Stun, 2.0, &config(), &mut Vec::new());
        for dt in [f64::NAN, f64::INFINITY, -1.0] {
            assert_eq!(tracker.tick(&mut target, dt, &mut Vec::new()), StatusTickReport::default());
        }

        // The effect still expires on schedule afterwards
        tracker.tick(&mut target, 2.0, &mut Vec::new());
        assert!(tracker.is_empty());
        assert!(!target.stunned);
    }
}
