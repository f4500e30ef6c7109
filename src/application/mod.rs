//! Application layer containing the marketplace operations.
//!
//! `MarketEngine` is the primary entry point. Each operation runs inside a
//! `UnitOfWork` that stages record writes and token transfers and commits
//! them to the backend in one step.

pub mod engine;
pub mod instruction;
pub mod unit_of_work;
pub mod vault;
