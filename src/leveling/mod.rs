//! XP gains and level-ups.
//!
//! A single gain can cross several levels; each level crossed consumes
//! exactly its requirement and reallocates stats once.

use tracing::{debug, info};

use crate::config::XpConfig;
use crate::events::{EventSink, GameEvent};
use crate::player::{HeroStats, LevelProgress};
use crate::progression::{round_even, StatGrowth, XpTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelUpReport {
    pub xp_added: u64,
    pub levels_gained: u32,
}

#[derive(Debug, Clone)]
pub struct LevelingSystem {
    table: XpTable,
    max_level: u32,
    growth: StatGrowth,
    stage_xp_base: u64,
    boss_multiplier: f64,
    enemy_xp: u64,
}

impl LevelingSystem {
    pub fn from_config(config: &XpConfig) -> Self {
        Self {
            table: config.level_table.clone(),
            max_level: config.max_level,
            growth: StatGrowth::default(),
            stage_xp_base: config.stage_xp_reward_base,
            boss_multiplier: config.boss_xp_multiplier,
            enemy_xp: config.enemy_defeat_xp,
        }
    }

    pub fn with_growth(mut self, growth: StatGrowth) -> Self {
        self.growth = growth;
        self
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn growth(&self) -> &StatGrowth {
        &self.growth
    }

    /// XP a player at `level` needs for the next level; 0 at the cap
    pub fn xp_for_next_level(&self, level: u32) -> u64 {
        self.table.xp_to_next_level(level, self.max_level)
    }

    pub fn add_xp(
        &self,
        progress: &mut LevelProgress,
        stats: &mut HeroStats,
        amount: u64,
        sink: &mut dyn EventSink,
    ) -> LevelUpReport {
        if progress.level >= self.max_level {
            debug!(level = progress.level, "At max level, XP ignored");
            return LevelUpReport::default();
        }

        progress.current_xp = progress.current_xp.saturating_add(amount);
        sink.emit(GameEvent::XpGained {
            amount,
            current_xp: progress.current_xp,
        });

        let mut levels_gained = 0;
        while progress.level < self.max_level {
            let needed = self.xp_for_next_level(progress.level);
            if progress.current_xp < needed {
                break;
            }
            progress.current_xp -= needed;
            progress.level += 1;
            levels_gained += 1;
            stats.apply_growth(&self.growth);

            info!(level = progress.level, "Level up");
            sink.emit(GameEvent::LevelUp {
                new_level: progress.level,
            });
        }

        LevelUpReport {
            xp_added: amount,
            levels_gained,
        }
    }

    /// Stage clear reward: base XP, boss stages multiplied
    pub fn stage_xp(&self, is_boss: bool) -> u64 {
        let multiplier = if is_boss { self.boss_multiplier } else { 1.0 };
        round_even(self.stage_xp_base as f64 * multiplier)
    }

    pub fn award_stage_xp(
        &self,
        progress: &mut LevelProgress,
        stats: &mut HeroStats,
        is_boss: bool,
        sink: &mut dyn EventSink,
    ) -> LevelUpReport {
        self.add_xp(progress, stats, self.stage_xp(is_boss), sink)
    }

    pub fn award_enemy_defeated(
        &self,
        progress: &mut LevelProgress,
        stats: &mut HeroStats,
        sink: &mut dyn EventSink,
    ) -> LevelUpReport {
        self.add_xp(progress, stats, self.enemy_xp, sink)
    }

    /// Fill ratio of the XP bar; 1.0 at the cap
    pub fn xp_progress(&self, progress: &LevelProgress) -> f64 {
        let needed = self.xp_for_next_level(progress.level);
        if needed == 0 {
            return 1.0;
        }
        (progress.current_xp as f64 / needed as f64).min(1.0)
    }
}
