use super::address::Address;
use super::record::{ChangeSet, Record};
use crate::error::Result;
use async_trait::async_trait;

/// Keyed storage for market, provider and job records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &Address) -> Result<Option<Record>>;
    async fn records(&self) -> Result<Vec<Record>>;
}

/// Read side of the fungible-token service for a single mint.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    fn mint(&self) -> Address;
    async fn balance_of(&self, account: &Address) -> Result<u64>;
}

/// A backend owning both records and token balances, so that one
/// instruction's writes and transfers commit together.
#[async_trait]
pub trait Backend: RecordStore + TokenLedger {
    /// Applies every write and transfer in `changes`, or none of them.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Source of the current unix timestamp in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

pub type BackendBox = Box<dyn Backend>;
pub type ClockBox = Box<dyn Clock>;
pub type BackendFactory = Box<dyn Fn() -> BackendBox + Send + Sync>;
