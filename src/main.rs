//! sanctuary-sim: headless driver for the progression core.
//!
//! Loads the save (or starts a new game), plays a scripted stretch of idle
//! play on a manual clock, then writes the save back. Useful for balance
//! checks and for reproducing save/offline bugs outside the client.
//!
//! Usage: sanctuary-sim [--save PATH] [--config PATH] [--hours N] [--seed N] [--offline-hours N] [--verbose]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info};

use sanctuary_core::clock::{Clock, ManualClock};
use sanctuary_core::combat::{ActorId, CombatActor, Skill};
use sanctuary_core::config::GameConfig;
use sanctuary_core::economy::store::AdReward;
use sanctuary_core::events::GameEvent;
use sanctuary_core::logging::{init_tracing, TracingConfig};
use sanctuary_core::player::HeroStats;
use sanctuary_core::save::{FileSaveStore, LoadSource, SaveCoordinator};
use sanctuary_core::session::{AdWatchOutcome, GameSession};

/// Seconds of play per simulation step
const STEP_SECS: f64 = 60.0;

/// Minutes between fights
const FIGHT_EVERY_STEPS: u64 = 10;

/// Safety cap on rounds in one fight
const MAX_ROUNDS: u32 = 200;

#[derive(Debug)]
struct SimArgs {
    save_path: PathBuf,
    config_path: Option<PathBuf>,
    hours: f64,
    seed: u64,
    offline_hours: f64,
    verbose: bool,
}

impl SimArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = SimArgs {
            save_path: PathBuf::from("savegame.json"),
            config_path: None,
            hours: 8.0,
            seed: 42,
            offline_hours: 0.0,
            verbose: false,
        };
        while let Some(flag) = args.next() {
            let mut value = || args.next().with_context(|| format!("{flag} needs a value"));
            match flag.as_str() {
                "--save" => parsed.save_path = value()?.into(),
                "--config" => parsed.config_path = Some(value()?.into()),
                "--hours" => parsed.hours = value()?.parse().context("--hours")?,
                "--seed" => parsed.seed = value()?.parse().context("--seed")?,
                "--offline-hours" => {
                    parsed.offline_hours = value()?.parse().context("--offline-hours")?
                }
                "--verbose" => parsed.verbose = true,
                other => bail!("unknown argument: {other}"),
            }
        }
        if !parsed.hours.is_finite() || parsed.hours < 0.0 {
            bail!("--hours must be a non-negative number");
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    let args = SimArgs::parse(std::env::args().skip(1))?;
    if args.verbose {
        init_tracing(&TracingConfig::verbose());
    } else {
        init_tracing(&TracingConfig::quiet());
    }

    let config = match &args.config_path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };

    // Pretend the player was away before this run
    let clock = ManualClock::new(Utc::now());
    clock.advance_hours(args.offline_hours);

    let mut coordinator = SaveCoordinator::new(FileSaveStore::new(&args.save_path), &config);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(args.seed);
    let report = coordinator.load(&config, clock.now(), &mut rng);
    match &report.source {
        LoadSource::Existing { original_version } => {
            info!(original_version, "Loaded existing save")
        }
        LoadSource::NewGame => info!("Started new game"),
        LoadSource::Recovered { error } => info!(%error, "Recovered from unusable save"),
    }
    if report.offline.paid_anything() {
        info!(
            hours = report.offline.credited_hours,
            gold = report.offline.produced.gold,
            premium = report.offline.produced.premium,
            "Offline rewards"
        );
    }

    let mut session = GameSession::from_load(config, report, args.seed);
    if let AdWatchOutcome::Granted(_) = session.watch_ad(AdReward::OfflineDoubler, clock.now()) {
        info!("Offline reward doubled");
    }

    let steps = (args.hours * 3600.0 / STEP_SECS).floor() as u64;
    let mut stats = SimStats::default();
    for step in 1..=steps {
        clock.advance_secs(STEP_SECS);
        session.tick(STEP_SECS, clock.now());
        try_upgrades(&mut session, &clock);

        if step % FIGHT_EVERY_STEPS == 0 {
            fight(&mut session, &clock, &mut stats);
        }
        if coordinator.tick(STEP_SECS) {
            session
                .save(&mut coordinator, clock.now())
                .context("autosave")?;
        }
        stats.record(&session.drain_events());
    }

    session
        .save(&mut coordinator, clock.now())
        .with_context(|| format!("writing save {}", args.save_path.display()))?;

    let state = session.state();
    println!("player      {}", state.player_id);
    println!("level       {} ({:.0}% to next)", state.progress.level, session.xp_progress() * 100.0);
    println!("gold        {}", state.wallet.gold);
    println!("premium     {}", state.wallet.premium);
    for building in state.buildings.iter() {
        println!(
            "{:<12}lv {}{}",
            building.id(),
            building.level,
            if building.is_upgrading() { " (upgrading)" } else { "" }
        );
    }
    println!(
        "fights      {} won, {} lost; {} upgrades, {} level-ups",
        stats.fights_won, stats.fights_lost, stats.upgrades, stats.level_ups
    );
    Ok(())
}

#[derive(Debug, Default)]
struct SimStats {
    fights_won: u32,
    fights_lost: u32,
    upgrades: u32,
    level_ups: u32,
}

impl SimStats {
    fn record(&mut self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::UpgradeCompleted { .. } => self.upgrades += 1,
                GameEvent::LevelUp { .. } => self.level_ups += 1,
                _ => {}
            }
        }
    }
}

/// Start the cheapest affordable upgrade, if any
fn try_upgrades(session: &mut GameSession, clock: &ManualClock) {
    let cheapest = session
        .state()
        .buildings
        .iter()
        .filter(|b| !b.is_upgrading() && !b.is_max_level())
        .min_by_key(|b| b.upgrade_cost())
        .map(|b| b.id().to_string());
    if let Some(id) = cheapest {
        if let Err(e) = session.upgrade_building(&id, clock.now()) {
            debug!(building = %id, error = %e, "Upgrade skipped");
        }
    }
}

fn fight(session: &mut GameSession, clock: &ManualClock, stats: &mut SimStats) {
    let level = session.state().progress.level as f64;
    let mut enemies = vec![CombatActor::new(
        ActorId(1),
        HeroStats::new(300.0 + 40.0 * level, 18.0 + 3.0 * level, 8.0 + 2.0 * level, 60.0, 0.05),
    )];
    let cleave = Skill::solar_cleave();
    let ultimate = Skill::eclipse_breaker();

    for round in 1..=MAX_ROUNDS {
        let skill = if round % 5 == 0 { &ultimate } else { &cleave };
        session.hero_attack(&mut enemies[0], skill);
        if enemies[0].is_alive() {
            let attacker = enemies[0].clone();
            session.enemy_attack(&attacker, 1.0);
        }

        clock.advance_secs(1.0);
        session.tick_encounter(1.0, clock.now(), &mut enemies);

        if !enemies[0].is_alive() {
            stats.fights_won += 1;
            session.award_enemy_defeated();
            if stats.fights_won % 5 == 0 {
                session.award_stage_xp(stats.fights_won % 25 == 0);
            }
            break;
        }
        if !session.hero().is_alive() {
            stats.fights_lost += 1;
            break;
        }
    }
    session.reset_hero();
}
