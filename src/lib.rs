//! Sanctuary - Progression & Combat Core
//!
//! This crate provides the deterministic game logic behind the Sanctuary
//! idle RPG, independent of any engine, renderer or input layer:
//! - Progression curves (upgrade cost/time, instant-finish, XP per level)
//! - Building ledger (one upgrade in flight per building, timer completion)
//! - Production engine (live ticks, ad boost, offline reconciliation)
//! - Combat resolver (damage formula, crit/dodge rolls, status effects)
//! - Leveling (multi-level XP gains with per-level stat reallocation)
//! - Economy (wallet, storefront rewards, rewarded-ad gate)
//! - Save snapshots (versioned JSON, migration, explicit save coordinator)
//! - Game session (fixed tick order, presentation events)

pub mod buildings;
pub mod clock;
pub mod combat;
pub mod config;
pub mod constants;
pub mod economy;
pub mod error;
pub mod events;
pub mod leveling;
pub mod logging;
pub mod player;
pub mod production;
pub mod progression;
pub mod save;
pub mod session;

pub use error::{ProgressionError, Result};
