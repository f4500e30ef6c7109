use super::Faucet;
use crate::domain::address::Address;
use crate::domain::ports::{Backend, RecordStore, TokenLedger};
use crate::domain::record::{ChangeSet, Record};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct State {
    records: HashMap<Address, Record>,
    balances: HashMap<Address, u64>,
}

/// A thread-safe in-memory backend for records and token balances.
///
/// Uses `Arc<RwLock<..>>` so clones share the same state. A commit holds the
/// write lock for its whole duration and validates every transfer before
/// touching anything, so a failed commit leaves no trace.
/// Ideal for testing or for replaying a script without persistence.
#[derive(Clone)]
pub struct InMemoryBackend {
    mint: Address,
    state: Arc<RwLock<State>>,
}

impl InMemoryBackend {
    /// Creates a new, empty backend holding balances of `mint`.
    pub fn new(mint: Address) -> Self {
        Self {
            mint,
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Returns a handle on the same state that reports a different mint.
    pub fn with_mint(&self, mint: Address) -> Self {
        Self {
            mint,
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryBackend {
    async fn get(&self, key: &Address) -> Result<Option<Record>> {
        let state = self.state.read().await;
        Ok(state.records.get(key).cloned())
    }

    async fn records(&self) -> Result<Vec<Record>> {
        let state = self.state.read().await;
        Ok(state.records.values().cloned().collect())
    }
}

#[async_trait]
impl TokenLedger for InMemoryBackend {
    fn mint(&self) -> Address {
        self.mint
    }

    async fn balance_of(&self, account: &Address) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.balances.get(account).copied().unwrap_or(0))
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut state = self.state.write().await;

        changes.check_reads(|key| Ok(state.records.get(key).cloned()))?;
        let balances = changes
            .resolve_balances(|account| Ok(state.balances.get(account).copied().unwrap_or(0)))?;

        for (key, write) in changes.writes {
            match write {
                Some(record) => {
                    state.records.insert(key, record);
                }
                None => {
                    state.records.remove(&key);
                }
            }
        }
        for (account, balance) in balances {
            state.balances.insert(account, balance);
        }

        debug!(transfers = changes.transfers.len(), "in-memory commit applied");
        Ok(())
    }
}

#[async_trait]
impl Faucet for InMemoryBackend {
    async fn airdrop(&self, account: &Address, amount: u64) -> Result<()> {
        let mut state = self.state.write().await;
        let balance = state.balances.entry(*account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow("airdrop"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::Provider;
    use crate::domain::record::Transfer;

    fn provider_record(label: &str) -> (Address, Record) {
        let provider = Provider::new(Address::from_label(label), format!("http://{label}")).unwrap();
        (provider.address(), Record::Provider(provider))
    }

    #[tokio::test]
    async fn test_in_memory_commit_writes_and_deletes() {
        let backend = InMemoryBackend::new(Address::from_label("usdc"));
        let (key, record) = provider_record("p1");

        let mut changes = ChangeSet::default();
        changes.writes.insert(key, Some(record.clone()));
        backend.commit(changes).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), Some(record));

        let mut changes = ChangeSet::default();
        changes.writes.insert(key, None);
        backend.commit(changes).await.unwrap();
        assert!(backend.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_failed_transfer_rolls_back_writes() {
        let backend = InMemoryBackend::new(Address::from_label("usdc"));
        let alice = Address::from_label("alice");
        backend.airdrop(&alice, 10).await.unwrap();
        let (key, record) = provider_record("p1");

        let mut changes = ChangeSet::default();
        changes.writes.insert(key, Some(record));
        changes.transfers.push(Transfer {
            from: alice,
            to: Address::from_label("bob"),
            amount: 11,
        });

        assert!(matches!(
            backend.commit(changes).await,
            Err(MarketError::InsufficientFunds { .. })
        ));
        assert!(backend.get(&key).await.unwrap().is_none());
        assert_eq!(backend.balance_of(&alice).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_in_memory_airdrop_accumulates() {
        let backend = InMemoryBackend::new(Address::from_label("usdc"));
        let alice = Address::from_label("alice");
        backend.airdrop(&alice, 10).await.unwrap();
        backend.airdrop(&alice, 5).await.unwrap();
        assert_eq!(backend.balance_of(&alice).await.unwrap(), 15);
        assert_eq!(
            backend.balance_of(&Address::from_label("bob")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_with_mint_shares_state() {
        let backend = InMemoryBackend::new(Address::from_label("usdc"));
        let other = backend.with_mint(Address::from_label("other"));
        let alice = Address::from_label("alice");
        backend.airdrop(&alice, 3).await.unwrap();
        assert_eq!(other.balance_of(&alice).await.unwrap(), 3);
        assert_eq!(other.mint(), Address::from_label("other"));
    }

    #[tokio::test]
    async fn test_in_memory_rejects_stale_read() {
        let backend = InMemoryBackend::new(Address::from_label("usdc"));
        let (key, record) = provider_record("p1");

        let mut stale = ChangeSet::default();
        stale.reads.insert(key, None);
        stale.writes.insert(key, Some(record.clone()));

        let mut first = ChangeSet::default();
        first.reads.insert(key, None);
        first.writes.insert(key, Some(record.clone()));
        backend.commit(first).await.unwrap();

        assert!(matches!(
            backend.commit(stale).await,
            Err(MarketError::ConcurrentModification(address)) if address == key
        ));
        assert_eq!(backend.get(&key).await.unwrap(), Some(record));
    }
}
