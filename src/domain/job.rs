use super::address::Address;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};

/// Fixed-point scale of a job's rate: `rate` is token units per `SCALE` seconds.
pub const SCALE: u64 = 1_000_000_000_000;

/// An open job: escrowed funds streaming from `owner` to `provider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub index: u64,
    pub owner: Address,
    pub provider: Address,
    pub metadata: String,
    pub rate: u64,
    pub balance: u64,
    pub last_settled: i64,
}

/// Outcome of one settlement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Amount owed for the elapsed time, before clamping to the balance.
    pub accrued: u64,
    /// Amount actually released to the provider.
    pub amount: u64,
    /// Job balance after the release.
    pub balance: u64,
    pub timestamp: i64,
}

/// Computes `ceil(rate * elapsed / SCALE)` without floating point.
pub fn accrue(rate: u64, elapsed: u64) -> Result<u64> {
    let numerator = rate
        .checked_mul(elapsed)
        .ok_or(MarketError::ArithmeticOverflow("rate * elapsed"))?;
    let rounded = numerator
        .checked_add(SCALE - 1)
        .ok_or(MarketError::ArithmeticOverflow("accrual rounding"))?;
    Ok(rounded / SCALE)
}

impl Job {
    pub fn open(
        index: u64,
        owner: Address,
        provider: Address,
        metadata: String,
        rate: u64,
        balance: u64,
        now: i64,
    ) -> Result<Self> {
        if rate == 0 {
            return Err(MarketError::InvalidRate);
        }
        if balance == 0 {
            return Err(MarketError::InvalidBalance);
        }
        Ok(Self {
            index,
            owner,
            provider,
            metadata,
            rate,
            balance,
            last_settled: now,
        })
    }

    pub fn address(&self) -> Address {
        Address::job(self.index)
    }

    /// Fails with `ProviderMismatch` unless `provider` is the account this job pays.
    pub fn require_provider(&self, provider: &Address) -> Result<()> {
        if self.provider == *provider {
            Ok(())
        } else {
            Err(MarketError::ProviderMismatch {
                expected: self.provider,
                actual: *provider,
            })
        }
    }

    /// Charges the time elapsed since the last settlement against the balance.
    ///
    /// The job is left untouched when an error is returned. The caller is
    /// responsible for moving `Settlement::amount` out of the vault.
    pub fn settle(&mut self, now: i64) -> Result<Settlement> {
        let elapsed = now
            .checked_sub(self.last_settled)
            .filter(|elapsed| *elapsed >= 0)
            .ok_or(MarketError::ClockSkew {
                now,
                last_settled: self.last_settled,
            })?;
        let accrued = accrue(self.rate, elapsed as u64)?;
        let amount = accrued.min(self.balance);

        self.balance -= amount;
        self.last_settled = now;

        Ok(Settlement {
            accrued,
            amount,
            balance: self.balance,
            timestamp: now,
        })
    }

    /// Takes `amount` out of an already settled balance.
    pub fn withdraw(&mut self, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(MarketError::InsufficientBalance {
                have: self.balance,
                need: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.balance == 0
    }
}
