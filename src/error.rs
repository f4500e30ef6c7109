use crate::domain::address::Address;
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Coarse classification of every failure the market can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Arithmetic,
    Transfer,
    Internal,
}

#[derive(Error, Diagnostic, Debug)]
pub enum MarketError {
    #[error("Market is already initialized")]
    #[diagnostic(code(job_escrow::already_initialized))]
    AlreadyInitialized,

    #[error("Market is not initialized")]
    #[diagnostic(code(job_escrow::market_not_initialized))]
    MarketNotInitialized,

    #[error("Provider already exists for authority {0}")]
    #[diagnostic(code(job_escrow::provider_already_exists))]
    ProviderAlreadyExists(Address),

    #[error("Provider does not exist for authority {0}")]
    #[diagnostic(code(job_escrow::provider_does_not_exist))]
    ProviderDoesNotExist(Address),

    #[error("Invalid checkpoint: must not be empty")]
    #[diagnostic(code(job_escrow::invalid_checkpoint))]
    InvalidCheckpoint,

    #[error("Invalid provider {0}: no provider record registered")]
    #[diagnostic(code(job_escrow::invalid_provider))]
    InvalidProvider(Address),

    #[error("Invalid rate: must be positive")]
    #[diagnostic(code(job_escrow::invalid_rate))]
    InvalidRate,

    #[error("Invalid balance: must be positive")]
    #[diagnostic(code(job_escrow::invalid_balance))]
    InvalidBalance,

    #[error("Invalid amount: must be positive")]
    #[diagnostic(code(job_escrow::invalid_amount))]
    InvalidAmount,

    #[error("Invalid mint: market uses {expected}, token service uses {actual}")]
    #[diagnostic(code(job_escrow::invalid_mint))]
    InvalidMint { expected: Address, actual: Address },

    #[error("Invalid instruction: {0}")]
    #[diagnostic(code(job_escrow::invalid_instruction))]
    InvalidInstruction(String),

    #[error("Unauthorized: {signer} may not act on this record")]
    #[diagnostic(code(job_escrow::unauthorized))]
    Unauthorized { signer: Address },

    #[error("Job {0} not found")]
    #[diagnostic(code(job_escrow::job_not_found))]
    JobNotFound(u64),

    #[error("Provider mismatch: job pays {expected}, got {actual}")]
    #[diagnostic(code(job_escrow::provider_mismatch))]
    ProviderMismatch { expected: Address, actual: Address },

    #[error("Concurrent modification: record {0} changed before this instruction committed")]
    #[diagnostic(code(job_escrow::concurrent_modification))]
    ConcurrentModification(Address),

    #[error("Clock skew: now {now} is before last settlement {last_settled}")]
    #[diagnostic(code(job_escrow::clock_skew))]
    ClockSkew { now: i64, last_settled: i64 },

    #[error("Arithmetic overflow while computing {0}")]
    #[diagnostic(code(job_escrow::arithmetic_overflow))]
    ArithmeticOverflow(&'static str),

    #[error("Insufficient funds in {account}: have {have}, need {need}")]
    #[diagnostic(code(job_escrow::insufficient_funds))]
    InsufficientFunds {
        account: Address,
        have: u64,
        need: u64,
    },

    #[error("Insufficient job balance: have {have}, need {need}")]
    #[diagnostic(code(job_escrow::insufficient_balance))]
    InsufficientBalance { have: u64, need: u64 },

    #[error("CSV error: {0}")]
    #[diagnostic(code(job_escrow::csv))]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(job_escrow::io))]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(job_escrow::serialization))]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(job_escrow::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCheckpoint
            | Self::InvalidProvider(_)
            | Self::InvalidRate
            | Self::InvalidBalance
            | Self::InvalidAmount
            | Self::InvalidMint { .. }
            | Self::InvalidInstruction(_) => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::MarketNotInitialized | Self::ProviderDoesNotExist(_) | Self::JobNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::AlreadyInitialized
            | Self::ProviderAlreadyExists(_)
            | Self::ProviderMismatch { .. }
            | Self::ConcurrentModification(_) => ErrorKind::Conflict,
            Self::ArithmeticOverflow(_) | Self::ClockSkew { .. } => ErrorKind::Arithmetic,
            Self::InsufficientFunds { .. } | Self::InsufficientBalance { .. } => {
                ErrorKind::Transfer
            }
            Self::CsvError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for MarketError {
    fn from(err: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}
