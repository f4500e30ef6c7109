use crate::domain::address::Address;

/// One market operation, as submitted by a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Initialize {
        selector: String,
        wait_time: u64,
        admin: Address,
    },
    ProviderAdd {
        cp: String,
    },
    ProviderUpdateWithCp {
        provider: Address,
        cp: String,
    },
    ProviderRemove {
        provider: Address,
    },
    JobOpen {
        metadata: String,
        provider: Address,
        rate: u64,
        balance: u64,
    },
    JobSettle {
        index: u64,
        provider: Address,
    },
    JobClose {
        index: u64,
        provider: Address,
    },
    JobWithdraw {
        index: u64,
        provider: Address,
        amount: u64,
    },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::ProviderAdd { .. } => "provider_add",
            Self::ProviderUpdateWithCp { .. } => "provider_update",
            Self::ProviderRemove { .. } => "provider_remove",
            Self::JobOpen { .. } => "job_open",
            Self::JobSettle { .. } => "job_settle",
            Self::JobClose { .. } => "job_close",
            Self::JobWithdraw { .. } => "job_withdraw",
        }
    }
}
