//! Ledger use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into friend/split use cases.
//! - Keep balance arithmetic free of storage concerns.

pub mod balance;
pub mod ledger;
