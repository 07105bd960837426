//! Resource production.
//!
//! One formula serves both the hourly live tick and offline catch-up:
//! `pph * growth^(level-1) * hours * boost`, rounded per building before
//! the buildings are summed into the gold and premium buckets.

pub mod offline;

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buildings::Building;
use crate::config::ProductionConfig;
use crate::events::{EventSink, GameEvent, ProductionSource};
use crate::progression::round_even;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionYield {
    pub gold: u64,
    pub premium: u64,
}

impl ProductionYield {
    pub fn is_empty(&self) -> bool {
        self.gold == 0 && self.premium == 0
    }
}

impl AddAssign for ProductionYield {
    fn add_assign(&mut self, rhs: Self) {
        self.gold = self.gold.saturating_add(rhs.gold);
        self.premium = self.premium.saturating_add(rhs.premium);
    }
}

/// Yield of `buildings` over `elapsed_hours` with a flat boost multiplier.
///
/// Negative or non-finite durations produce nothing.
pub fn tick_production<'a, I>(buildings: I, elapsed_hours: f64, boost: f64) -> ProductionYield
where
    I: IntoIterator<Item = &'a Building>,
{
    let mut total = ProductionYield::default();
    if !elapsed_hours.is_finite() || elapsed_hours <= 0.0 {
        return total;
    }
    for building in buildings {
        let rate = building.production_rate();
        if rate <= 0.0 {
            continue;
        }
        let amount = round_even(rate * elapsed_hours * boost);
        if building.template.produces_premium {
            total.premium += amount;
        } else {
            total.gold += amount;
        }
    }
    total
}

/// Rewarded-video production multiplier. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdBoost {
    multiplier: f64,
    remaining_secs: f64,
}

impl AdBoost {
    pub fn inactive() -> Self {
        Self {
            multiplier: 1.0,
            remaining_secs: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining_secs > 0.0
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_secs
    }

    /// Multiplier to apply right now
    pub fn multiplier(&self) -> f64 {
        if self.is_active() {
            self.multiplier
        } else {
            1.0
        }
    }

    /// Start (or restart) the boost for a full duration
    pub fn activate(&mut self, multiplier: f64, duration_secs: f64) {
        self.multiplier = multiplier;
        self.remaining_secs = duration_secs.max(0.0);
    }

    /// Count down; returns true on the tick the boost runs out
    pub fn tick(&mut self, dt: f64) -> bool {
        if !self.is_active() || dt <= 0.0 {
            return false;
        }
        self.remaining_secs -= dt;
        if self.remaining_secs <= 0.0 {
            self.remaining_secs = 0.0;
            self.multiplier = 1.0;
            return true;
        }
        false
    }
}

impl Default for AdBoost {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Live production: an interval accumulator plus the ad boost
#[derive(Debug, Clone)]
pub struct ProductionEngine {
    config: ProductionConfig,
    accumulator_secs: f64,
    boost: AdBoost,
}

impl ProductionEngine {
    pub fn new(config: ProductionConfig) -> Self {
        Self {
            config,
            accumulator_secs: 0.0,
            boost: AdBoost::inactive(),
        }
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    pub fn boost(&self) -> &AdBoost {
        &self.boost
    }

    /// Seconds until the next live payout
    pub fn secs_until_next_tick(&self) -> f64 {
        (self.config.tick_interval_secs - self.accumulator_secs).max(0.0)
    }

    /// Accumulate `dt` seconds of play and pay out every full interval.
    ///
    /// Every interval paid in this call uses the boost active at call time.
    pub fn tick_live(
        &mut self,
        buildings: &[Building],
        dt: f64,
        sink: &mut dyn EventSink,
    ) -> ProductionYield {
        if dt > 0.0 {
            self.accumulator_secs += dt;
        }
        let interval = self.config.tick_interval_secs;
        let hours = interval / 3600.0;
        let boost = self.boost.multiplier();

        let mut total = ProductionYield::default();
        while self.accumulator_secs >= interval {
            self.accumulator_secs -= interval;
            total += tick_production(buildings, hours, boost);
        }

        if !total.is_empty() {
            info!(gold = total.gold, premium = total.premium, boost, "Live production");
            sink.emit(GameEvent::ResourcesProduced {
                gold: total.gold,
                premium: total.premium,
                source: ProductionSource::Live,
            });
        }
        total
    }

    pub fn activate_ad_boost(&mut self) {
        self.boost
            .activate(self.config.ad_boost_multiplier, self.config.ad_boost_duration_secs);
        info!(
            multiplier = self.config.ad_boost_multiplier,
            duration_secs = self.config.ad_boost_duration_secs,
            "Ad boost activated"
        );
    }

    pub fn tick_ad_boost(&mut self, dt: f64, sink: &mut dyn EventSink) {
        if self.boost.tick(dt) {
            debug!("Ad boost expired");
            sink.emit(GameEvent::AdBoostExpired);
        }
    }
}
