//! Error types for the progression core

use thiserror::Error;

use crate::economy::Currency;

/// Recoverable failures returned by ledger, economy and session operations.
///
/// None of these are fatal: the caller reports them and play continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgressionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Building {0} is already at max level")]
    AlreadyMax(String),

    #[error("Building {0} is already upgrading")]
    AlreadyUpgrading(String),

    #[error("Building {0} has no upgrade in progress")]
    NotUpgrading(String),

    #[error("Insufficient {currency:?}: need {required}, have {available}")]
    InsufficientCurrency {
        currency: Currency,
        required: u64,
        available: u64,
    },

    #[error("Corrupt save data: {0}")]
    CorruptSaveData(String),

    #[error("Clock skew: wall clock is {seconds:.0}s behind the last save")]
    ClockSkew { seconds: f64 },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProgressionError>;
