use super::address::Address;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};

/// A registered compute provider, reachable at its checkpoint endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub authority: Address,
    pub cp: String,
}

impl Provider {
    pub fn new(authority: Address, cp: String) -> Result<Self> {
        validate_checkpoint(&cp)?;
        Ok(Self { authority, cp })
    }

    /// Replaces the checkpoint, leaving the record untouched on failure.
    pub fn update_checkpoint(&mut self, cp: String) -> Result<()> {
        validate_checkpoint(&cp)?;
        self.cp = cp;
        Ok(())
    }

    pub fn address(&self) -> Address {
        Address::provider(&self.authority)
    }
}

fn validate_checkpoint(cp: &str) -> Result<()> {
    if cp.is_empty() {
        Err(MarketError::InvalidCheckpoint)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_requires_checkpoint() {
        let authority = Address::from_label("provider");
        assert!(Provider::new(authority, "http://10.0.0.1:8080".to_string()).is_ok());
        assert!(matches!(
            Provider::new(authority, String::new()),
            Err(MarketError::InvalidCheckpoint)
        ));
    }

    #[test]
    fn test_update_checkpoint_rejects_empty() {
        let mut provider =
            Provider::new(Address::from_label("provider"), "http://a".to_string()).unwrap();
        assert!(provider.update_checkpoint(String::new()).is_err());
        assert_eq!(provider.cp, "http://a");

        provider.update_checkpoint("http://b".to_string()).unwrap();
        assert_eq!(provider.cp, "http://b");
    }
}
