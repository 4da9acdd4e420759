//! Key-value persistence behind the ledger.
//!
//! # Responsibility
//! - Define the storage contract the ledger store is written against.
//! - Provide SQLite and in-memory backends.
//!
//! # Invariants
//! - A `put` replaces the whole value for its key.
//! - Reading an absent key is `Ok(None)`, never an error.

pub mod kv_repo;
