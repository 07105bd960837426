//! Offline catch-up.
//!
//! Run once at load. Production for the capped gap is paid eagerly here;
//! upgrade timers are left alone and complete on the first ledger tick,
//! which already sees the real wall-clock gap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{tick_production, ProductionYield};
use crate::buildings::BuildingLedger;
use crate::clock::seconds_between;
use crate::config::ProductionConfig;
use crate::error::ProgressionError;

/// Result of reconciling one offline gap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfflineReport {
    /// Real gap in hours, zero when the clock went backwards
    pub offline_hours: f64,
    /// Hours actually paid for after the cap
    pub credited_hours: f64,
    pub cap_hours: f64,
    pub capped: bool,
    pub clock_skew: bool,
    pub produced: ProductionYield,
}

impl OfflineReport {
    pub fn paid_anything(&self) -> bool {
        !self.produced.is_empty()
    }
}

/// Production owed for the gap between `last_saved` and `now`.
///
/// Negative gaps are clock skew: logged and treated as zero. The gap is
/// capped at the VIP-dependent cap and nothing is paid at or below the
/// minimum threshold. Ad boosts never apply offline.
pub fn reconcile_offline(
    ledger: &BuildingLedger,
    last_saved: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &ProductionConfig,
    is_vip: bool,
) -> OfflineReport {
    let raw_secs = seconds_between(last_saved, now);
    let clock_skew = raw_secs < 0.0;
    if clock_skew {
        let err = ProgressionError::ClockSkew { seconds: -raw_secs };
        warn!(error = %err, "Offline gap clamped to zero");
    }

    let offline_hours = raw_secs.max(0.0) / 3600.0;
    let cap_hours = config.offline_cap_for(is_vip);
    let credited = offline_hours.min(cap_hours);

    let mut report = OfflineReport {
        offline_hours,
        credited_hours: 0.0,
        cap_hours,
        capped: offline_hours > cap_hours,
        clock_skew,
        produced: ProductionYield::default(),
    };

    if credited > config.min_offline_hours {
        report.credited_hours = credited;
        report.produced = tick_production(ledger.iter(), credited, 1.0);
        info!(
            hours = credited,
            capped = report.capped,
            gold = report.produced.gold,
            premium = report.produced.premium,
            "Offline production"
        );
    }
    report
}
