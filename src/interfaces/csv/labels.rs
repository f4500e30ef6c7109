use crate::domain::address::Address;
use std::collections::BTreeMap;

/// Two-way mapping between the human labels used in scripts and addresses.
#[derive(Debug, Default, Clone)]
pub struct Labels {
    names: BTreeMap<Address, String>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the address for `label`, remembering the label for reports.
    pub fn resolve(&mut self, label: &str) -> Address {
        let address = Address::from_label(label);
        self.names.entry(address).or_insert_with(|| label.to_string());
        address
    }

    /// Names an address that was not derived from a label, such as the vault.
    pub fn insert(&mut self, address: Address, name: impl Into<String>) {
        self.names.insert(address, name.into());
    }

    /// The label for `address`, or its base58 form when unknown.
    pub fn name(&self, address: &Address) -> String {
        self.names
            .get(address)
            .cloned()
            .unwrap_or_else(|| address.to_string())
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.names.keys()
    }
}
