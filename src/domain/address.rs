use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const MARKET_SEED: &[u8] = b"market";
pub const PROVIDER_SEED: &[u8] = b"provider";
pub const JOB_SEED: &[u8] = b"job";
pub const VAULT_SEED: &[u8] = b"job_token";
const LABEL_SEED: &[u8] = b"label";

/// A 32-byte identity for wallets, mints and stored records.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministically derives a record address from a seed label and a key.
    ///
    /// The seed is length-prefixed so that `("ab", "c")` and `("a", "bc")`
    /// never hash to the same address.
    pub fn derive(seed: &[u8], key: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((seed.len() as u64).to_le_bytes());
        hasher.update(seed);
        hasher.update(key);
        Self(hasher.finalize().into())
    }

    /// Maps a human-readable name onto an identity. Used by the CLI and tests.
    pub fn from_label(label: &str) -> Self {
        Self::derive(LABEL_SEED, label.as_bytes())
    }

    pub fn market() -> Self {
        Self::derive(MARKET_SEED, &[])
    }

    pub fn provider(authority: &Address) -> Self {
        Self::derive(PROVIDER_SEED, authority.as_bytes())
    }

    pub fn job(index: u64) -> Self {
        Self::derive(JOB_SEED, &index.to_le_bytes())
    }

    pub fn vault(mint: &Address) -> Self {
        Self::derive(VAULT_SEED, mint.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}
