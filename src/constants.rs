//! Centralized game constants for the Sanctuary core.
//!
//! These are the defaults baked into `GameConfig::default()`. Systems read
//! the live values from the config; the constants stay the single source of
//! truth for the shipped balance.

// =====================================================
// Progression curves
// =====================================================

/// Premium currency charged per remaining hour of an upgrade
pub const INSTANT_FINISH_PER_HOUR: f64 = 50.0;

/// Floor of the instant-finish price
pub const INSTANT_FINISH_MIN: u64 = 50;

/// Ceiling of the instant-finish price
pub const INSTANT_FINISH_MAX: u64 = 300;

/// XP curve: round(XP_CURVE_SCALE * level^XP_CURVE_EXPONENT + XP_CURVE_LINEAR * level)
pub const XP_CURVE_SCALE: f64 = 100.0;
pub const XP_CURVE_EXPONENT: f64 = 1.8;
pub const XP_CURVE_LINEAR: f64 = 50.0;

/// Player level cap
pub const DEFAULT_MAX_LEVEL: u32 = 50;

/// Base XP for clearing a stage
pub const STAGE_XP_REWARD_BASE: u64 = 50;

/// Boss stages pay this multiple of the base stage reward
pub const BOSS_XP_MULTIPLIER: f64 = 2.5;

/// XP for defeating a single enemy
pub const ENEMY_DEFEAT_XP: u64 = 50;

// =====================================================
// Per-level stat reallocation
// =====================================================

pub const LEVEL_UP_MAX_HP: f64 = 25.0;
pub const LEVEL_UP_ATTACK: f64 = 3.0;
pub const LEVEL_UP_DEFENSE: f64 = 2.0;
pub const LEVEL_UP_SPEED: f64 = 0.1;
pub const LEVEL_UP_CRIT: f64 = 0.005;

// =====================================================
// Combat
// =====================================================

/// Critical damage multiplier for normal skills (2.0x)
pub const CRIT_DAMAGE_MULT: f64 = 2.0;

/// Critical damage multiplier for ultimates (2.5x)
pub const ULTIMATE_CRIT_DAMAGE_MULT: f64 = 2.5;

/// Defense curve constant: reduction = DEFENSE_CURVE / (DEFENSE_CURVE + def)
pub const DEFENSE_CURVE: f64 = 100.0;

/// Speed points per 1.0 dodge probability (speed 100 -> 10%)
pub const DODGE_SPEED_DIVISOR: f64 = 1000.0;

/// Dodge probability cap
pub const MAX_DODGE_CHANCE: f64 = 0.35;

/// Burn deals this fraction of the target's max HP per tick
pub const BURN_DAMAGE_FRACTION: f64 = 0.02;

/// Seconds between burn ticks
pub const BURN_TICK_INTERVAL: f64 = 1.0;

/// Attack/defense buffs add +10%
pub const BUFF_BONUS: f64 = 0.10;

// =====================================================
// Production & offline
// =====================================================

/// Live production fires once per hour of play
pub const PRODUCTION_TICK_SECS: f64 = 3600.0;

/// Offline accrual cap for free players
pub const OFFLINE_CAP_HOURS: f64 = 12.0;

/// Offline accrual cap for VIP players
pub const VIP_OFFLINE_CAP_HOURS: f64 = 24.0;

/// Gaps at or below this many hours pay nothing
pub const MIN_OFFLINE_HOURS: f64 = 0.1;

/// Rewarded-video production boost
pub const AD_BOOST_MULTIPLIER: f64 = 1.5;
pub const AD_BOOST_DURATION_SECS: f64 = 3600.0;

// =====================================================
// Monetization
// =====================================================

/// Rewarded ads per UTC day for free players (VIP is unlimited)
pub const DAILY_AD_LIMIT: u32 = 3;

/// Allowance reported to the UI for VIP players
pub const VIP_AD_ALLOWANCE: u32 = 999;

/// Resource-pack ad reward
pub const AD_RESOURCE_PACK_GOLD: u64 = 500;
pub const AD_RESOURCE_PACK_MATERIALS: u32 = 50;

/// VIP subscription length granted by one purchase
pub const VIP_SUBSCRIPTION_DAYS: i64 = 30;

// =====================================================
// Save
// =====================================================

/// Autosave cadence in seconds of play
pub const AUTOSAVE_INTERVAL_SECS: f64 = 30.0;

/// Starting balances for a fresh save
pub const NEW_PLAYER_GOLD: u64 = 1000;
pub const NEW_PLAYER_PREMIUM: u64 = 200;

/// Hero granted on a fresh save
pub const STARTER_HERO_ID: &str = "hero_001_auron";

/// Auron's level-1 stat sheet
pub const STARTER_HERO_HP: f64 = 500.0;
pub const STARTER_HERO_ATTACK: f64 = 45.0;
pub const STARTER_HERO_DEFENSE: f64 = 20.0;
pub const STARTER_HERO_SPEED: f64 = 100.0;
pub const STARTER_HERO_CRIT: f64 = 0.05;
