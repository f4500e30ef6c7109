use super::address::Address;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};

/// Selector the rate-lock parameters are conventionally stored under.
pub const RATE_LOCK_SELECTOR: &str = "RATE_LOCK";

/// The market singleton.
///
/// Owns the job-index counter: `next_job_index` is the only code path that
/// advances it. The rate-lock selector and wait time are stored verbatim and
/// carry no behaviour of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub admin: Address,
    pub token_mint: Address,
    pub job_index: u64,
    pub rate_lock_selector: String,
    pub rate_lock_wait: u64,
}

impl MarketConfig {
    pub fn new(admin: Address, token_mint: Address, selector: String, wait_time: u64) -> Self {
        Self {
            admin,
            token_mint,
            job_index: 0,
            rate_lock_selector: selector,
            rate_lock_wait: wait_time,
        }
    }

    /// Returns the index for a new job and advances the counter.
    pub fn next_job_index(&mut self) -> Result<u64> {
        let index = self.job_index;
        self.job_index = index
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow("job index"))?;
        Ok(index)
    }

    /// Checks that the token service runs the mint this market was set up with.
    pub fn require_mint(&self, actual: &Address) -> Result<()> {
        if self.token_mint == *actual {
            Ok(())
        } else {
            Err(MarketError::InvalidMint {
                expected: self.token_mint,
                actual: *actual,
            })
        }
    }

    pub fn vault(&self) -> Address {
        Address::vault(&self.token_mint)
    }
}
