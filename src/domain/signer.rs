use super::address::Address;
use crate::error::{MarketError, Result};

/// The identity that authorized the current instruction.
///
/// Operations receive the signer explicitly and compare it against the
/// authority stored on the record they touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer(Address);

impl Signer {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// Fails with `Unauthorized` unless the signer is `authority`.
    pub fn require(&self, authority: &Address) -> Result<()> {
        if self.0 == *authority {
            Ok(())
        } else {
            Err(MarketError::Unauthorized { signer: self.0 })
        }
    }
}

impl From<Address> for Signer {
    fn from(address: Address) -> Self {
        Self(address)
    }
}
