//! Building ledger.
//!
//! Each building is Idle or Upgrading. An upgrade is started with a ticket
//! (cost, duration, target level), runs against wall-clock time and only
//! completes through [`BuildingLedger::tick`] or
//! [`BuildingLedger::instant_finish`]. Paying for it is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{checked_offset, seconds_between};
use crate::error::{ProgressionError, Result};
use crate::events::{EventSink, GameEvent};
use crate::progression;
use crate::save::opt_timestamp;

/// Static balance data for one building type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingTemplate {
    pub id: String,
    pub name: String,
    pub max_level: u32,
    pub base_cost: f64,
    pub base_time_secs: f64,
    pub cost_growth: f64,
    pub time_growth: f64,
    #[serde(default)]
    pub production_per_hour: f64,
    #[serde(default = "default_growth")]
    pub production_growth: f64,
    #[serde(default)]
    pub produces_premium: bool,
}

fn default_growth() -> f64 {
    1.0
}

#[allow(clippy::too_many_arguments)]
fn template(
    id: &str,
    name: &str,
    max_level: u32,
    base_cost: f64,
    base_time_secs: f64,
    production_per_hour: f64,
    production_growth: f64,
    produces_premium: bool,
) -> BuildingTemplate {
    BuildingTemplate {
        id: id.to_string(),
        name: name.to_string(),
        max_level,
        base_cost,
        base_time_secs,
        cost_growth: 1.5,
        time_growth: 1.3,
        production_per_hour,
        production_growth,
        produces_premium,
    }
}

/// The four base buildings shipped with the game
pub fn default_templates() -> Vec<BuildingTemplate> {
    vec![
        template("barracks", "Barracks", 15, 500.0, 60.0, 0.0, 1.0, false),
        template("workshop", "Workshop", 12, 800.0, 120.0, 1.0, 1.2, false),
        template("shard_reactor", "Shard Reactor", 10, 1200.0, 180.0, 0.25, 1.15, true),
        template("treasury", "Treasury", 15, 600.0, 90.0, 200.0, 1.2, false),
    ]
}

/// An upgrade in flight
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeTimer {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Cached at the last tick
    pub remaining_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub template: BuildingTemplate,
    pub level: u32,
    pub upgrade: Option<UpgradeTimer>,
}

impl Building {
    pub fn from_template(template: BuildingTemplate) -> Self {
        Self {
            template,
            level: 1,
            upgrade: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.template.id
    }

    pub fn is_upgrading(&self) -> bool {
        self.upgrade.is_some()
    }

    pub fn is_max_level(&self) -> bool {
        self.level >= self.template.max_level
    }

    pub fn upgrade_cost(&self) -> u64 {
        progression::upgrade_cost(self.level, self.template.base_cost, self.template.cost_growth)
    }

    pub fn upgrade_time(&self) -> f64 {
        progression::upgrade_time(
            self.level,
            self.template.base_time_secs,
            self.template.time_growth,
        )
    }

    pub fn remaining_secs(&self) -> f64 {
        self.upgrade.as_ref().map_or(0.0, |u| u.remaining_secs)
    }

    /// Premium price to finish now; 0 when idle
    pub fn instant_finish_cost(&self) -> u64 {
        match &self.upgrade {
            Some(u) => progression::instant_finish_cost(u.remaining_secs),
            None => 0,
        }
    }

    /// Output per hour at the current level
    pub fn production_rate(&self) -> f64 {
        if self.template.production_per_hour <= 0.0 {
            return 0.0;
        }
        self.template.production_per_hour
            * self
                .template
                .production_growth
                .powi(self.level.saturating_sub(1) as i32)
    }

    pub fn to_record(&self) -> BuildingRecord {
        BuildingRecord {
            building_id: self.template.id.clone(),
            current_level: self.level,
            is_upgrading: self.is_upgrading(),
            upgrade_start_time: self.upgrade.as_ref().map(|u| u.started_at),
            upgrade_time_remaining: self.remaining_secs(),
        }
    }
}

/// Persisted form of a building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingRecord {
    pub building_id: String,
    pub current_level: u32,
    #[serde(default)]
    pub is_upgrading: bool,
    #[serde(default, with = "opt_timestamp")]
    pub upgrade_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upgrade_time_remaining: f64,
}

/// Result of starting (or quoting) an upgrade
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeTicket {
    pub building_id: String,
    pub cost: u64,
    pub duration_secs: f64,
    pub target_level: u32,
}

/// Owns every building of a player's base, in template order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingLedger {
    buildings: Vec<Building>,
}

impl BuildingLedger {
    pub fn from_templates(templates: &[BuildingTemplate]) -> Self {
        Self {
            buildings: templates
                .iter()
                .cloned()
                .map(Building::from_template)
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Building> {
        self.buildings
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or_else(|| ProgressionError::NotFound(id.to_string()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Building> {
        self.buildings.iter()
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Validate an upgrade without changing anything
    pub fn quote_upgrade(&self, id: &str) -> Result<UpgradeTicket> {
        let building = self
            .get(id)
            .ok_or_else(|| ProgressionError::NotFound(id.to_string()))?;
        if building.is_upgrading() {
            return Err(ProgressionError::AlreadyUpgrading(id.to_string()));
        }
        if building.is_max_level() {
            return Err(ProgressionError::AlreadyMax(id.to_string()));
        }
        Ok(UpgradeTicket {
            building_id: id.to_string(),
            cost: building.upgrade_cost(),
            duration_secs: building.upgrade_time(),
            target_level: building.level + 1,
        })
    }

    /// Put a building into the Upgrading state.
    ///
    /// The cost in the returned ticket must already have been debited.
    pub fn start_upgrade(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        sink: &mut dyn EventSink,
    ) -> Result<UpgradeTicket> {
        let ticket = self.quote_upgrade(id)?;
        let building = self.get_mut(id)?;
        building.upgrade = Some(UpgradeTimer {
            started_at: now,
            duration_secs: ticket.duration_secs,
            remaining_secs: ticket.duration_secs,
        });

        info!(
            building = id,
            target_level = ticket.target_level,
            duration_secs = ticket.duration_secs,
            "Upgrade started"
        );
        sink.emit(GameEvent::UpgradeStarted {
            building_id: ticket.building_id.clone(),
            target_level: ticket.target_level,
            cost: ticket.cost,
            duration_secs: ticket.duration_secs,
        });
        Ok(ticket)
    }

    /// Advance every timer to `now`; returns the ids that completed
    pub fn tick(&mut self, now: DateTime<Utc>, sink: &mut dyn EventSink) -> Vec<String> {
        let mut completed = Vec::new();
        for building in self.buildings.iter_mut() {
            let Some(timer) = building.upgrade.as_mut() else {
                continue;
            };
            // Clock skew: a start time in the future counts as zero elapsed
            let elapsed = seconds_between(timer.started_at, now).max(0.0);
            timer.remaining_secs = (timer.duration_secs - elapsed).max(0.0);
            if elapsed >= timer.duration_secs {
                Self::complete(building, sink);
                completed.push(building.id().to_string());
            }
        }
        if !completed.is_empty() {
            debug!(count = completed.len(), "Upgrades completed on tick");
        }
        completed
    }

    /// Complete an in-flight upgrade immediately; returns the new level
    pub fn instant_finish(&mut self, id: &str, sink: &mut dyn EventSink) -> Result<u32> {
        let building = self.get_mut(id)?;
        if !building.is_upgrading() {
            return Err(ProgressionError::NotUpgrading(id.to_string()));
        }
        Self::complete(building, sink);
        Ok(building.level)
    }

    fn complete(building: &mut Building, sink: &mut dyn EventSink) {
        building.upgrade = None;
        building.level = (building.level + 1).min(building.template.max_level);
        info!(building = building.id(), level = building.level, "Upgrade completed");
        sink.emit(GameEvent::UpgradeCompleted {
            building_id: building.id().to_string(),
            new_level: building.level,
        });
    }

    /// Apply saved records on top of the template buildings.
    ///
    /// Unknown ids are skipped and levels are clamped to the template range.
    /// An upgrade saved without a start time is re-anchored so that its
    /// saved remaining time counts down from `now`. Remaining times are
    /// clamped to the upgrade duration; one that cannot be anchored is dropped.
    pub fn restore(&mut self, records: &[BuildingRecord], now: DateTime<Utc>) {
        for record in records {
            let Ok(building) = self.get_mut(&record.building_id) else {
                warn!(building = %record.building_id, "Unknown building in save, skipped");
                continue;
            };
            building.level = record.current_level.clamp(1, building.template.max_level);
            building.upgrade = None;

            if record.is_upgrading && !building.is_max_level() {
                let duration_secs = building.upgrade_time();
                let remaining_secs = if record.upgrade_time_remaining.is_finite() {
                    record.upgrade_time_remaining.max(0.0).min(duration_secs)
                } else {
                    0.0
                };
                let started_at = match record.upgrade_start_time {
                    Some(at) => Some(at),
                    None => checked_offset(now, remaining_secs - duration_secs),
                };
                let Some(started_at) = started_at else {
                    warn!(building = %record.building_id, "Upgrade start out of range, dropped");
                    continue;
                };
                building.upgrade = Some(UpgradeTimer {
                    started_at,
                    duration_secs,
                    remaining_secs,
                });
            }
        }
    }

    pub fn records(&self) -> Vec<BuildingRecord> {
        self.buildings.iter().map(Building::to_record).collect()
    }
}
