//! Currencies and the player wallet.
//!
//! Systems that charge or pay the player go through [`CurrencyLedger`], so a
//! host with a server-side wallet can plug its own implementation in.

pub mod store;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProgressionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Gold,
    /// Solar shards
    Premium,
}

/// Debit/credit access to a player's balances
pub trait CurrencyLedger {
    fn balance(&self, currency: Currency) -> u64;

    /// Fails with `InsufficientCurrency` and leaves the balance untouched
    fn debit(&mut self, currency: Currency, amount: u64) -> Result<()>;

    fn credit(&mut self, currency: Currency, amount: u64);

    fn can_afford(&self, currency: Currency, amount: u64) -> bool {
        self.balance(currency) >= amount
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub gold: u64,
    pub premium: u64,
}

impl Wallet {
    pub fn new(gold: u64, premium: u64) -> Self {
        Self { gold, premium }
    }

    fn slot(&mut self, currency: Currency) -> &mut u64 {
        match currency {
            Currency::Gold => &mut self.gold,
            Currency::Premium => &mut self.premium,
        }
    }
}

impl CurrencyLedger for Wallet {
    fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Gold => self.gold,
            Currency::Premium => self.premium,
        }
    }

    fn debit(&mut self, currency: Currency, amount: u64) -> Result<()> {
        let available = self.balance(currency);
        if available < amount {
            return Err(ProgressionError::InsufficientCurrency {
                currency,
                required: amount,
                available,
            });
        }
        *self.slot(currency) -= amount;
        debug!(?currency, amount, remaining = available - amount, "Debit");
        Ok(())
    }

    fn credit(&mut self, currency: Currency, amount: u64) {
        let slot = self.slot(currency);
        *slot = slot.saturating_add(amount);
    }
}
