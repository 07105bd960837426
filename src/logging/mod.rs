//! Structured logging via `tracing`.
//!
//! The core never installs a subscriber on its own. Hosts call
//! [`init_tracing`] (or [`init_tracing_default`]) once at startup; repeated
//! calls are ignored and a `RUST_LOG` environment filter always wins over
//! the configured levels.

use std::collections::BTreeMap;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Verbosity for one target, serialized in `RUST_LOG` spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Off => "off",
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// Game systems that log under their own target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum System {
    Buildings,
    Combat,
    Economy,
    Leveling,
    Production,
    Save,
    Session,
}

impl System {
    pub fn target(self) -> &'static str {
        match self {
            System::Buildings => "sanctuary_core::buildings",
            System::Combat => "sanctuary_core::combat",
            System::Economy => "sanctuary_core::economy",
            System::Leveling => "sanctuary_core::leveling",
            System::Production => "sanctuary_core::production",
            System::Save => "sanctuary_core::save",
            System::Session => "sanctuary_core::session",
        }
    }
}

/// Subscriber settings for a host process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Level for everything without an override, host crates included
    pub base: Verbosity,
    pub systems: BTreeMap<System, Verbosity>,
    pub show_targets: bool,
}

impl Default for TracingConfig {
    /// Info everywhere
    fn default() -> Self {
        Self {
            base: Verbosity::Info,
            systems: BTreeMap::new(),
            show_targets: true,
        }
    }
}

impl TracingConfig {
    /// Headless simulator: warnings and errors only
    pub fn quiet() -> Self {
        Self {
            base: Verbosity::Warn,
            systems: BTreeMap::new(),
            show_targets: false,
        }
    }

    /// Debug for the economy-facing systems, combat left at info
    pub fn verbose() -> Self {
        Self::default()
            .with_system(System::Buildings, Verbosity::Debug)
            .with_system(System::Economy, Verbosity::Debug)
            .with_system(System::Production, Verbosity::Debug)
            .with_system(System::Save, Verbosity::Debug)
            .with_system(System::Session, Verbosity::Debug)
    }

    pub fn with_system(mut self, system: System, level: Verbosity) -> Self {
        self.systems.insert(system, level);
        self
    }

    /// `EnvFilter` directives: the base level, then one per overridden system
    pub fn directives(&self) -> String {
        std::iter::once(self.base.directive().to_string())
            .chain(
                self.systems
                    .iter()
                    .map(|(system, level)| format!("{}={}", system.target(), level.directive())),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

static SUBSCRIBER: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Install a compact fmt subscriber. First call wins.
pub fn init_tracing(config: &TracingConfig) {
    let directives = config.directives();
    let show_targets = config.show_targets;
    SUBSCRIBER.call_once(move || {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(from_env) => from_env,
            Err(_) => EnvFilter::new(directives),
        };
        // Another subscriber may already be installed by the host
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .compact()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_plain_info() {
        assert_eq!(TracingConfig::default().directives(), "info");
        assert_eq!(TracingConfig::quiet().directives(), "warn");
    }

    #[test]
    fn test_system_overrides_in_stable_order() {
        let config = TracingConfig::quiet()
            .with_system(System::Save, Verbosity::Debug)
            .with_system(System::Combat, Verbosity::Off);
        assert_eq!(
            config.directives(),
            "warn,sanctuary_core::combat=off,sanctuary_core::save=debug"
        );
    }

    #[test]
    fn test_verbose_leaves_combat_alone() {
        let directives = TracingConfig::verbose().directives();
        assert!(directives.contains("sanctuary_core::production=debug"));
        assert!(!directives.contains("combat"));
    }

    #[test]
    fn test_config_from_json() {
        let config: TracingConfig =
            serde_json::from_str(r#"{"base": "error", "systems": {"leveling": "trace"}}"#).unwrap();
        assert_eq!(config.base, Verbosity::Error);
        assert_eq!(config.systems[&System::Leveling], Verbosity::Trace);
        assert!(config.show_targets);
    }

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing_default();
        init_tracing(&TracingConfig::quiet());
        tracing::debug!("still alive");
    }
}
