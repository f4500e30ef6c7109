use super::instruction::Instruction;
use super::unit_of_work::UnitOfWork;
use super::vault::TokenVault;
use crate::domain::address::Address;
use crate::domain::job::{Job, Settlement};
use crate::domain::market::MarketConfig;
use crate::domain::ports::{BackendBox, ClockBox};
use crate::domain::provider::Provider;
use crate::domain::record::Record;
use crate::domain::signer::Signer;
use crate::error::{MarketError, Result};
use tokio::sync::Mutex;
use tracing::info;

/// Result of closing a job: the final settlement and the refund to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobClosed {
    pub settlement: Settlement,
    pub refund: u64,
}

/// The main entry point of the marketplace.
///
/// `MarketEngine` executes one instruction at a time as a unit of work
/// against its backend. Every operation either commits all of its record
/// writes and token transfers or leaves the backend untouched.
///
/// Mutating operations hold `serial` from their first read to their commit,
/// so concurrent callers sharing an engine never interleave units of work.
/// Engines sharing a backend are kept apart by the backend itself: a commit
/// whose reads went stale fails with `ConcurrentModification`.
pub struct MarketEngine {
    backend: BackendBox,
    clock: ClockBox,
    serial: Mutex<()>,
}

impl MarketEngine {
    /// Creates a new `MarketEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `backend` - Storage for records and token balances.
    /// * `clock` - Source of settlement timestamps.
    pub fn new(backend: BackendBox, clock: ClockBox) -> Self {
        Self {
            backend,
            clock,
            serial: Mutex::new(()),
        }
    }

    /// Dispatches an instruction to its operation.
    pub async fn execute(&self, signer: &Signer, instruction: Instruction) -> Result<()> {
        match instruction {
            Instruction::Initialize {
                selector,
                wait_time,
                admin,
            } => self.initialize(signer, selector, wait_time, admin).await.map(drop),
            Instruction::ProviderAdd { cp } => self.provider_add(signer, cp).await.map(drop),
            Instruction::ProviderUpdateWithCp { provider, cp } => self
                .provider_update_with_cp(signer, &provider, cp)
                .await
                .map(drop),
            Instruction::ProviderRemove { provider } => {
                self.provider_remove(signer, &provider).await
            }
            Instruction::JobOpen {
                metadata,
                provider,
                rate,
                balance,
            } => self
                .job_open(signer, metadata, &provider, rate, balance)
                .await
                .map(drop),
            Instruction::JobSettle { index, provider } => {
                self.job_settle(signer, index, &provider).await.map(drop)
            }
            Instruction::JobClose { index, provider } => {
                self.job_close(signer, index, &provider).await.map(drop)
            }
            Instruction::JobWithdraw {
                index,
                provider,
                amount,
            } => self
                .job_withdraw(signer, index, &provider, amount)
                .await
                .map(drop),
        }
    }

    /// Creates the market singleton bound to the backend's token mint.
    pub async fn initialize(
        &self,
        signer: &Signer,
        selector: String,
        wait_time: u64,
        admin: Address,
    ) -> Result<MarketConfig> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        if uow.market_exists().await? {
            return Err(MarketError::AlreadyInitialized);
        }

        let market = MarketConfig::new(admin, uow.mint(), selector, wait_time);
        uow.put_market(market.clone());
        uow.commit().await?;

        info!(
            payer = %signer.address(),
            admin = %market.admin,
            token_mint = %market.token_mint,
            selector = %market.rate_lock_selector,
            wait_time = market.rate_lock_wait,
            "market initialized"
        );
        Ok(market)
    }

    /// Registers the signer as a provider reachable at `cp`.
    pub async fn provider_add(&self, signer: &Signer, cp: String) -> Result<Provider> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let authority = signer.address();
        if uow.provider(&authority).await?.is_some() {
            return Err(MarketError::ProviderAlreadyExists(authority));
        }

        let provider = Provider::new(authority, cp)?;
        uow.put_provider(provider.clone());
        uow.commit().await?;

        info!(provider = %provider.authority, cp = %provider.cp, "provider added");
        Ok(provider)
    }

    /// Replaces the checkpoint of the provider registered by `provider`.
    pub async fn provider_update_with_cp(
        &self,
        signer: &Signer,
        provider: &Address,
        cp: String,
    ) -> Result<Provider> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let mut record = uow
            .provider(provider)
            .await?
            .ok_or(MarketError::ProviderDoesNotExist(*provider))?;
        signer.require(&record.authority)?;

        record.update_checkpoint(cp)?;
        uow.put_provider(record.clone());
        uow.commit().await?;

        info!(provider = %record.authority, new_cp = %record.cp, "provider updated");
        Ok(record)
    }

    /// Deletes the provider registered by `provider`.
    ///
    /// Jobs already opened against it keep paying its token account.
    pub async fn provider_remove(&self, signer: &Signer, provider: &Address) -> Result<()> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let record = uow
            .provider(provider)
            .await?
            .ok_or(MarketError::ProviderDoesNotExist(*provider))?;
        signer.require(&record.authority)?;

        uow.remove_provider(&record.authority);
        uow.commit().await?;

        info!(provider = %record.authority, "provider removed");
        Ok(())
    }

    /// Opens a job, escrowing `balance` tokens from the signer.
    pub async fn job_open(
        &self,
        signer: &Signer,
        metadata: String,
        provider: &Address,
        rate: u64,
        balance: u64,
    ) -> Result<Job> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let mut market = uow.market().await?;
        market.require_mint(&uow.mint())?;

        if uow.provider(provider).await?.is_none() {
            return Err(MarketError::InvalidProvider(*provider));
        }

        let index = market.next_job_index()?;
        let job = Job::open(
            index,
            signer.address(),
            *provider,
            metadata,
            rate,
            balance,
            self.clock.now(),
        )?;

        let vault = TokenVault::for_market(&market);
        vault.deposit(&mut uow, job.owner, job.balance).await?;
        uow.put_market(market);
        uow.put_job(job.clone());
        uow.commit().await?;

        info!(
            job = job.index,
            metadata = %job.metadata,
            owner = %job.owner,
            provider = %job.provider,
            rate = job.rate,
            balance = job.balance,
            timestamp = job.last_settled,
            "job opened"
        );
        Ok(job)
    }

    /// Pays the provider everything accrued since the last settlement.
    ///
    /// Anyone may settle a job. A job whose balance reaches zero is closed.
    pub async fn job_settle(
        &self,
        signer: &Signer,
        index: u64,
        provider: &Address,
    ) -> Result<Settlement> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let market = uow.market().await?;
        market.require_mint(&uow.mint())?;

        let mut job = uow.job(index).await?.ok_or(MarketError::JobNotFound(index))?;
        job.require_provider(provider)?;

        let vault = TokenVault::for_market(&market);
        let settlement = self.settle(&mut uow, &vault, &mut job).await?;
        let exhausted = job.is_exhausted();
        if exhausted {
            uow.remove_job(index);
        } else {
            uow.put_job(job);
        }
        uow.commit().await?;

        info!(
            job = index,
            caller = %signer.address(),
            amount = settlement.amount,
            accrued = settlement.accrued,
            balance = settlement.balance,
            timestamp = settlement.timestamp,
            "job settled"
        );
        if exhausted {
            info!(job = index, "job closed");
        }
        Ok(settlement)
    }

    /// Settles the job, refunds what is left to the owner and deletes it.
    pub async fn job_close(
        &self,
        signer: &Signer,
        index: u64,
        provider: &Address,
    ) -> Result<JobClosed> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let market = uow.market().await?;
        market.require_mint(&uow.mint())?;

        let mut job = uow.job(index).await?.ok_or(MarketError::JobNotFound(index))?;
        signer.require(&job.owner)?;
        job.require_provider(provider)?;

        let vault = TokenVault::for_market(&market);
        let settlement = self.settle(&mut uow, &vault, &mut job).await?;
        let refund = job.balance;
        vault.release(&mut uow, job.owner, refund).await?;
        uow.remove_job(index);
        uow.commit().await?;

        info!(
            job = index,
            amount = settlement.amount,
            refund,
            owner = %job.owner,
            "job closed"
        );
        Ok(JobClosed { settlement, refund })
    }

    /// Returns `amount` of a job's escrow to its owner.
    ///
    /// The job is settled first so the provider is paid for all time up to
    /// now before the owner takes anything back. Returns the job, or `None`
    /// when the withdrawal emptied and closed it.
    pub async fn job_withdraw(
        &self,
        signer: &Signer,
        index: u64,
        provider: &Address,
        amount: u64,
    ) -> Result<Option<Job>> {
        let _serial = self.serial.lock().await;
        let mut uow = UnitOfWork::begin(self.backend.as_ref());
        let market = uow.market().await?;
        market.require_mint(&uow.mint())?;

        let mut job = uow.job(index).await?.ok_or(MarketError::JobNotFound(index))?;
        signer.require(&job.owner)?;
        job.require_provider(provider)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }

        let vault = TokenVault::for_market(&market);
        let settlement = self.settle(&mut uow, &vault, &mut job).await?;
        job.withdraw(amount)?;
        vault.release(&mut uow, job.owner, amount).await?;

        let remaining = if job.is_exhausted() {
            uow.remove_job(index);
            None
        } else {
            uow.put_job(job.clone());
            Some(job.clone())
        };
        uow.commit().await?;

        info!(
            job = index,
            to = %job.owner,
            amount,
            settled = settlement.amount,
            balance = job.balance,
            "job withdrew"
        );
        if remaining.is_none() {
            info!(job = index, "job closed");
        }
        Ok(remaining)
    }

    async fn settle(
        &self,
        uow: &mut UnitOfWork<'_>,
        vault: &TokenVault,
        job: &mut Job,
    ) -> Result<Settlement> {
        let settlement = job.settle(self.clock.now())?;
        vault.release(uow, job.provider, settlement.amount).await?;
        Ok(settlement)
    }

    pub async fn market(&self) -> Result<MarketConfig> {
        UnitOfWork::begin(self.backend.as_ref()).market().await
    }

    pub async fn provider(&self, authority: &Address) -> Result<Option<Provider>> {
        UnitOfWork::begin(self.backend.as_ref())
            .provider(authority)
            .await
    }

    pub async fn job(&self, index: u64) -> Result<Option<Job>> {
        UnitOfWork::begin(self.backend.as_ref()).job(index).await
    }

    pub async fn providers(&self) -> Result<Vec<Provider>> {
        let mut providers: Vec<Provider> = self
            .backend
            .records()
            .await?
            .into_iter()
            .filter_map(|record| match record {
                Record::Provider(provider) => Some(provider),
                _ => None,
            })
            .collect();
        providers.sort_by_key(|provider| provider.authority);
        Ok(providers)
    }

    pub async fn jobs(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .backend
            .records()
            .await?
            .into_iter()
            .filter_map(|record| match record {
                Record::Job(job) => Some(job),
                _ => None,
            })
            .collect();
        jobs.sort_by_key(|job| job.index);
        Ok(jobs)
    }

    pub async fn balance_of(&self, account: &Address) -> Result<u64> {
        self.backend.balance_of(account).await
    }

    pub async fn vault_balance(&self) -> Result<u64> {
        let market = self.market().await?;
        self.backend.balance_of(&market.vault()).await
    }
}
