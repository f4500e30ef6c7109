use crate::domain::address::Address;
use crate::domain::job::Job;
use crate::domain::market::MarketConfig;
use crate::domain::ports::Backend;
use crate::domain::provider::Provider;
use crate::domain::record::{ChangeSet, Record, Transfer};
use crate::error::{MarketError, Result};
use tracing::debug;

/// Stages the reads, writes and token transfers of one instruction.
///
/// Nothing reaches the backend until `commit`, which hands the whole
/// `ChangeSet` over in one call. Dropping the unit of work (or calling
/// `abort`) discards everything staged so far.
///
/// Every record fetched from the backend is remembered as it was first seen;
/// the backend refuses the commit if any of them changed in the meantime.
pub struct UnitOfWork<'a> {
    backend: &'a dyn Backend,
    changes: ChangeSet,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            changes: ChangeSet::default(),
        }
    }

    /// Reads a record, seeing this unit's own staged writes first.
    pub async fn get(&mut self, key: &Address) -> Result<Option<Record>> {
        if let Some(staged) = self.changes.writes.get(key) {
            return Ok(staged.clone());
        }
        if let Some(seen) = self.changes.reads.get(key) {
            return Ok(seen.clone());
        }
        let record = self.backend.get(key).await?;
        self.changes.reads.insert(*key, record.clone());
        Ok(record)
    }

    pub fn put(&mut self, key: Address, record: Record) {
        self.changes.writes.insert(key, Some(record));
    }

    pub fn delete(&mut self, key: Address) {
        self.changes.writes.insert(key, None);
    }

    /// Token balance of `account` including transfers staged in this unit.
    pub async fn balance_of(&self, account: &Address) -> Result<u64> {
        let mut balance = self.backend.balance_of(account).await?;
        for transfer in &self.changes.transfers {
            if transfer.from == *account {
                balance = balance
                    .checked_sub(transfer.amount)
                    .ok_or(MarketError::ArithmeticOverflow("staged debit"))?;
            }
            if transfer.to == *account {
                balance = balance
                    .checked_add(transfer.amount)
                    .ok_or(MarketError::ArithmeticOverflow("staged credit"))?;
            }
        }
        Ok(balance)
    }

    /// Stages a token transfer after checking that `from` can cover it.
    ///
    /// Zero-amount transfers are dropped.
    pub async fn transfer(&mut self, from: Address, to: Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let have = self.balance_of(&from).await?;
        if have < amount {
            return Err(MarketError::InsufficientFunds {
                account: from,
                have,
                need: amount,
            });
        }
        self.changes.transfers.push(Transfer { from, to, amount });
        Ok(())
    }

    pub fn mint(&self) -> Address {
        self.backend.mint()
    }

    pub async fn market(&mut self) -> Result<MarketConfig> {
        match self.get(&Address::market()).await? {
            Some(Record::Market(market)) => Ok(market),
            Some(_) => Err(unexpected_record("market")),
            None => Err(MarketError::MarketNotInitialized),
        }
    }

    pub async fn market_exists(&mut self) -> Result<bool> {
        Ok(self.get(&Address::market()).await?.is_some())
    }

    pub fn put_market(&mut self, market: MarketConfig) {
        self.put(Address::market(), Record::Market(market));
    }

    pub async fn provider(&mut self, authority: &Address) -> Result<Option<Provider>> {
        match self.get(&Address::provider(authority)).await? {
            Some(Record::Provider(provider)) => Ok(Some(provider)),
            Some(_) => Err(unexpected_record("provider")),
            None => Ok(None),
        }
    }

    pub fn put_provider(&mut self, provider: Provider) {
        self.put(provider.address(), Record::Provider(provider));
    }

    pub fn remove_provider(&mut self, authority: &Address) {
        self.delete(Address::provider(authority));
    }

    pub async fn job(&mut self, index: u64) -> Result<Option<Job>> {
        match self.get(&Address::job(index)).await? {
            Some(Record::Job(job)) => Ok(Some(job)),
            Some(_) => Err(unexpected_record("job")),
            None => Ok(None),
        }
    }

    pub fn put_job(&mut self, job: Job) {
        self.put(job.address(), Record::Job(job));
    }

    pub fn remove_job(&mut self, index: u64) {
        self.delete(Address::job(index));
    }

    pub async fn commit(self) -> Result<()> {
        if self.changes.is_empty() {
            return Ok(());
        }
        debug!(
            writes = self.changes.writes.len(),
            transfers = self.changes.transfers.len(),
            "committing unit of work"
        );
        self.backend.commit(self.changes).await
    }

    pub fn abort(self) {
        debug!(
            writes = self.changes.writes.len(),
            transfers = self.changes.transfers.len(),
            "aborting unit of work"
        );
    }
}

fn unexpected_record(expected: &str) -> MarketError {
    MarketError::internal(format!("stored record is not a {expected}"))
}
