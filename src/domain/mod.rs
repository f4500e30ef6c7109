//! Domain layer: records, settlement arithmetic and the ports the
//! application layer drives.

pub mod address;
pub mod job;
pub mod market;
pub mod ports;
pub mod provider;
pub mod record;
pub mod signer;
