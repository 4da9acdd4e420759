//! Ledger domain model.
//!
//! # Responsibility
//! - Define the friend and split records persisted by the ledger.
//! - Own amount parsing and two-decimal rendering rules.
//!
//! # Invariants
//! - Record ids are never reused inside one ledger.
//! - Settlement is one-way: a settled split never becomes unsettled.

pub mod amount;
pub mod friend;
pub mod payment_request;
pub mod split;
