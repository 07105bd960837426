//! Progression curves.
//!
//! Pure functions for upgrade cost/time, the instant-finish price and the
//! XP ladder. Identical inputs always give identical outputs so a server
//! can mirror every number the client shows.
//!
//! "Round" here is round-half-to-even, matching the production numbers the
//! live game already paid out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Round half to even, returned as a non-negative integer
pub fn round_even(value: f64) -> u64 {
    let rounded = value.round_ties_even();
    if rounded <= 0.0 {
        0
    } else {
        rounded as u64
    }
}

/// Gold needed to upgrade a building currently at `level`
pub fn upgrade_cost(level: u32, base_cost: f64, growth: f64) -> u64 {
    round_even(base_cost * growth.powi(level as i32))
}

/// Seconds an upgrade from `level` takes
pub fn upgrade_time(level: u32, base_time: f64, growth: f64) -> f64 {
    base_time * growth.powi(level as i32)
}

/// Premium currency to finish an upgrade with `remaining_secs` left.
///
/// Always within [INSTANT_FINISH_MIN, INSTANT_FINISH_MAX], even for zero,
/// negative or non-finite input.
pub fn instant_finish_cost(remaining_secs: f64) -> u64 {
    let hours = if remaining_secs.is_nan() {
        0.0
    } else {
        remaining_secs / 3600.0
    };
    let raw = (hours * INSTANT_FINISH_PER_HOUR).round_ties_even();
    raw.clamp(INSTANT_FINISH_MIN as f64, INSTANT_FINISH_MAX as f64) as u64
}

/// Closed-form XP requirement for a level
pub fn xp_formula(level: u32) -> u64 {
    let l = level as f64;
    round_even(XP_CURVE_SCALE * l.powf(XP_CURVE_EXPONENT) + XP_CURVE_LINEAR * l)
}

/// Designer overrides for the XP ladder, keyed by level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XpTable {
    entries: BTreeMap<u32, u64>,
}

impl XpTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, level: u32, xp: u64) -> Self {
        self.entries.insert(level, xp);
        self
    }

    pub fn get(&self, level: u32) -> Option<u64> {
        self.entries.get(&level).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &u64)> {
        self.entries.iter()
    }

    /// Table entry when present, otherwise the formula
    pub fn xp_for_level(&self, level: u32) -> u64 {
        self.get(level).unwrap_or_else(|| xp_formula(level))
    }

    /// XP a player at `level` needs to reach the next level; 0 at the cap
    pub fn xp_to_next_level(&self, level: u32, max_level: u32) -> u64 {
        if level >= max_level {
            0
        } else {
            self.xp_for_level(level + 1)
        }
    }
}

/// Stat deltas applied once per level gained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatGrowth {
    pub max_hp: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub crit_chance: f64,
}

impl Default for StatGrowth {
    fn default() -> Self {
        Self {
            max_hp: LEVEL_UP_MAX_HP,
            attack: LEVEL_UP_ATTACK,
            defense: LEVEL_UP_DEFENSE,
            speed: LEVEL_UP_SPEED,
            crit_chance: LEVEL_UP_CRIT,
        }
    }
}

impl StatGrowth {
    /// Total growth for `levels` level-ups
    pub fn scaled(&self, levels: u32) -> Self {
        let n = levels as f64;
        Self {
            max_hp: self.max_hp * n,
            attack: self.attack * n,
            defense: self.defense * n,
            speed: self.speed * n,
            crit_chance: self.crit_chance * n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_cost_values() {
        // barracks: 500 * 1.5^L
        assert_eq!(upgrade_cost(1, 500.0, 1.5), 750);
        assert_eq!(upgrade_cost(2, 500.0, 1.5), 1125);
        assert_eq!(upgrade_cost(0, 500.0, 1.5), 500);
    }

    #[test]
    fn test_upgrade_cost_rounds_half_even() {
        // 5 * 1.5 = 7.5 -> 8, 3 * 1.5 = 4.5 -> 4
        assert_eq!(upgrade_cost(1, 5.0, 1.5), 8);
        assert_eq!(upgrade_cost(1, 3.0, 1.5), 4);
    }

    #[test]
    fn test_upgrade_time() {
        assert!((upgrade_time(1, 60.0, 1.3) - 78.0).abs() < 1e-9);
        assert!((upgrade_time(2, 60.0, 1.3) - 101.4).abs() < 1e-9);
    }

    #[test]
    fn test_instant_finish_cost_bounds() {
        assert_eq!(instant_finish_cost(0.0), 50);
        assert_eq!(instant_finish_cost(-500.0), 50);
        assert_eq!(instant_finish_cost(3600.0 * 3.0), 150);
        assert_eq!(instant_finish_cost(3600.0 * 100.0), 300);
        assert_eq!(instant_finish_cost(f64::INFINITY), 300);
        assert_eq!(instant_finish_cost(f64::NEG_INFINITY), 50);
        assert_eq!(instant_finish_cost(f64::NAN), 50);
    }

    #[test]
    fn test_xp_formula() {
        // 100 * 2^1.8 + 100 = 348.2 + 100
        assert_eq!(xp_formula(2), 448);
        assert_eq!(xp_formula(1), 150);
    }

    #[test]
    fn test_xp_table_overrides_formula() {
        let table = XpTable::new().with_entry(2, 200);
        assert_eq!(table.xp_for_level(2), 200);
        assert_eq!(table.xp_for_level(3), xp_formula(3));
    }

    #[test]
    fn test_xp_to_next_level() {
        let table = XpTable::new();
        assert_eq!(table.xp_to_next_level(1, 50), xp_formula(2));
        assert_eq!(table.xp_to_next_level(50, 50), 0);
    }

    #[test]
    fn test_stat_growth_scaled() {
        let g = StatGrowth::default().scaled(3);
        assert_eq!(g.max_hp, 75.0);
        assert_eq!(g.attack, 9.0);
        assert_eq!(g.defense, 6.0);
    }
}
