//! Infrastructure layer: storage backends and clocks behind the domain ports.

use crate::domain::address::Address;
use crate::error::Result;
use async_trait::async_trait;

pub mod clock;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

/// Credits tokens out of thin air on a simulated token service.
///
/// Bootstrapping only: the market itself never mints.
#[async_trait]
pub trait Faucet: Send + Sync {
    async fn airdrop(&self, account: &Address, amount: u64) -> Result<()>;
}
