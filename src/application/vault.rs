use super::unit_of_work::UnitOfWork;
use crate::domain::address::Address;
use crate::domain::market::MarketConfig;
use crate::error::Result;

/// The escrow account holding every open job's balance.
///
/// Its address is derived from the market's mint, so there is exactly one
/// vault per market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenVault {
    address: Address,
}

impl TokenVault {
    pub fn for_market(market: &MarketConfig) -> Self {
        Self {
            address: market.vault(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Moves `amount` from `from` into escrow.
    pub async fn deposit(&self, uow: &mut UnitOfWork<'_>, from: Address, amount: u64) -> Result<()> {
        uow.transfer(from, self.address, amount).await
    }

    /// Moves `amount` out of escrow to `to`.
    pub async fn release(&self, uow: &mut UnitOfWork<'_>, to: Address, amount: u64) -> Result<()> {
        uow.transfer(self.address, to, amount).await
    }

    pub async fn balance(&self, uow: &UnitOfWork<'_>) -> Result<u64> {
        uow.balance_of(&self.address).await
    }
}
