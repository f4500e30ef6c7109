use super::address::Address;
use super::job::Job;
use super::market::MarketConfig;
use super::provider::Provider;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the keyed store can hold at an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Market(MarketConfig),
    Provider(Provider),
    Job(Job),
}

/// A token movement between two accounts of the market's mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
}

/// The staged effects of one instruction.
///
/// `writes` maps an address to its new record, or to `None` when the record
/// is deleted. `reads` holds every record the instruction looked at, as it
/// was when first read. Transfers are applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub reads: BTreeMap<Address, Option<Record>>,
    pub writes: BTreeMap<Address, Option<Record>>,
    pub transfers: Vec<Transfer>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.transfers.is_empty()
    }

    /// Fails with `ConcurrentModification` if any record read by this change
    /// set no longer matches what `current` returns for its address.
    ///
    /// Backends call this under the same exclusion that covers the write.
    pub fn check_reads<F>(&self, mut current: F) -> Result<()>
    where
        F: FnMut(&Address) -> Result<Option<Record>>,
    {
        for (key, seen) in &self.reads {
            if current(key)? != *seen {
                return Err(MarketError::ConcurrentModification(*key));
            }
        }
        Ok(())
    }

    /// Replays the transfers against current balances and returns the final
    /// balance of every touched account.
    ///
    /// Fails with `InsufficientFunds` as soon as a transfer would overdraw its
    /// source; nothing is written by this function.
    pub fn resolve_balances<F>(&self, mut current: F) -> Result<BTreeMap<Address, u64>>
    where
        F: FnMut(&Address) -> Result<u64>,
    {
        let mut balances: BTreeMap<Address, u64> = BTreeMap::new();
        for transfer in &self.transfers {
            for account in [transfer.from, transfer.to] {
                if !balances.contains_key(&account) {
                    let balance = current(&account)?;
                    balances.insert(account, balance);
                }
            }

            let have = balances[&transfer.from];
            if have < transfer.amount {
                return Err(MarketError::InsufficientFunds {
                    account: transfer.from,
                    have,
                    need: transfer.amount,
                });
            }
            balances.insert(transfer.from, have - transfer.amount);

            let to = balances[&transfer.to];
            let credited = to
                .checked_add(transfer.amount)
                .ok_or(MarketError::ArithmeticOverflow("token balance"))?;
            balances.insert(transfer.to, credited);
        }
        Ok(balances)
    }
}
