use super::Faucet;
use crate::domain::address::Address;
use crate::domain::ports::{Backend, RecordStore, TokenLedger};
use crate::domain::record::{ChangeSet, Record};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Column Family for market, provider and job records.
pub const CF_RECORDS: &str = "records";
/// Column Family for token balances.
pub const CF_BALANCES: &str = "balances";

/// A persistent backend using RocksDB.
///
/// Records are stored as JSON under their 32-byte address in `records`;
/// balances as big-endian `u64` in `balances`. Each commit is written as a
/// single `WriteBatch`, and commits are serialized so that the balance checks
/// of one batch always see the result of the previous one.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    mint: Address,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("records" and "balances") exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    /// * `mint` - The token mint whose balances this store holds.
    pub fn open<P: AsRef<Path>>(path: P, mint: Address) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_records = ColumnFamilyDescriptor::new(CF_RECORDS, Options::default());
        let cf_balances = ColumnFamilyDescriptor::new(CF_BALANCES, Options::default());

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), vec![cf_records, cf_balances])?;
        info!(path = %path.as_ref().display(), "opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            mint,
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| MarketError::internal(format!("column family {name} not found")))
    }

    fn read_record(&self, key: &Address) -> Result<Option<Record>> {
        let cf = self.cf(CF_RECORDS)?;
        match self.db.get_pinned_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_balance(&self, account: &Address) -> Result<u64> {
        let cf = self.cf(CF_BALANCES)?;
        match self.db.get_pinned_cf(cf, account.as_bytes())? {
            Some(bytes) => decode_balance(&bytes),
            None => Ok(0),
        }
    }
}

fn decode_balance(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| MarketError::internal("balance value is not 8 bytes"))?;
    Ok(u64::from_be_bytes(raw))
}

#[async_trait]
impl RecordStore for RocksDBStore {
    async fn get(&self, key: &Address) -> Result<Option<Record>> {
        self.read_record(key)
    }

    async fn records(&self) -> Result<Vec<Record>> {
        let cf = self.cf(CF_RECORDS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl TokenLedger for RocksDBStore {
    fn mint(&self) -> Address {
        self.mint
    }

    async fn balance_of(&self, account: &Address) -> Result<u64> {
        self.read_balance(account)
    }
}

#[async_trait]
impl Backend for RocksDBStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        changes.check_reads(|key| self.read_record(key))?;
        let balances = changes.resolve_balances(|account| self.read_balance(account))?;

        let records = self.cf(CF_RECORDS)?;
        let balance_cf = self.cf(CF_BALANCES)?;
        let mut batch = WriteBatch::default();
        for (key, write) in &changes.writes {
            match write {
                Some(record) => batch.put_cf(records, key.as_bytes(), serde_json::to_vec(record)?),
                None => batch.delete_cf(records, key.as_bytes()),
            }
        }
        for (account, balance) in &balances {
            batch.put_cf(balance_cf, account.as_bytes(), balance.to_be_bytes());
        }

        self.db.write(batch)?;
        debug!(
            writes = changes.writes.len(),
            transfers = changes.transfers.len(),
            "rocksdb commit applied"
        );
        Ok(())
    }
}

#[async_trait]
impl Faucet for RocksDBStore {
    async fn airdrop(&self, account: &Address, amount: u64) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let balance = self
            .read_balance(account)?
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow("airdrop"))?;
        let cf = self.cf(CF_BALANCES)?;
        self.db.put_cf(cf, account.as_bytes(), balance.to_be_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::Job;
    use crate::domain::record::Transfer;
    use tempfile::tempdir;

    fn job_record() -> (Address, Record) {
        let job = Job::open(
            0,
            Address::from_label("owner"),
            Address::from_label("provider"),
            "m".to_string(),
            1,
            10,
            0,
        )
        .unwrap();
        (job.address(), Record::Job(job))
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path(), Address::from_label("usdc"))
            .expect("Failed to open RocksDB");

        // Verify CFs exist
        assert!(store.db.cf_handle(CF_RECORDS).is_some());
        assert!(store.db.cf_handle(CF_BALANCES).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_commit_and_read() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path(), Address::from_label("usdc")).unwrap();
        let alice = Address::from_label("alice");
        let vault = Address::from_label("vault");
        store.airdrop(&alice, 10).await.unwrap();

        let (key, record) = job_record();
        let mut changes = ChangeSet::default();
        changes.writes.insert(key, Some(record.clone()));
        changes.transfers.push(Transfer {
            from: alice,
            to: vault,
            amount: 10,
        });
        store.commit(changes).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), Some(record));
        assert_eq!(store.records().await.unwrap().len(), 1);
        assert_eq!(store.balance_of(&alice).await.unwrap(), 0);
        assert_eq!(store.balance_of(&vault).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_rocksdb_failed_commit_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path(), Address::from_label("usdc")).unwrap();
        let alice = Address::from_label("alice");

        let (key, record) = job_record();
        let mut changes = ChangeSet::default();
        changes.writes.insert(key, Some(record));
        changes.transfers.push(Transfer {
            from: alice,
            to: Address::from_label("vault"),
            amount: 1,
        });

        assert!(store.commit(changes).await.is_err());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let alice = Address::from_label("alice");
        {
            let store = RocksDBStore::open(dir.path(), Address::from_label("usdc")).unwrap();
            store.airdrop(&alice, 42).await.unwrap();
        }
        let store = RocksDBStore::open(dir.path(), Address::from_label("usdc")).unwrap();
        assert_eq!(store.balance_of(&alice).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_rocksdb_rejects_stale_read() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path(), Address::from_label("usdc")).unwrap();
        let (key, record) = job_record();

        let mut first = ChangeSet::default();
        first.reads.insert(key, None);
        first.writes.insert(key, Some(record.clone()));
        let stale = first.clone();
        store.commit(first).await.unwrap();

        assert!(matches!(
            store.commit(stale).await,
            Err(MarketError::ConcurrentModification(address)) if address == key
        ));
        assert_eq!(store.records().await.unwrap(), vec![record]);
    }
}
