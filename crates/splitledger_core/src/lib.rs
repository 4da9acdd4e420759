//! Core logic for splitledger: the friends & splits ledger and the bridge
//! panel workflow.
//! This crate owns every business invariant; hosts only render and forward.

pub mod bridge;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod progress;
pub mod repo;
pub mod service;

pub use bridge::hook::{BridgeError, BridgeHook, BridgePhase, FlowOutcome};
pub use bridge::inputs::{BridgeInputs, InputIssue};
pub use bridge::intent::{IntentError, IntentService};
pub use config::{AppConfig, BridgeConfig, ConfigError, Network};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::friend::{Friend, FriendId, FriendValidationError, NewFriend};
pub use model::payment_request::PaymentRequestId;
pub use model::split::{Payer, Participant, Split, SplitDraft, SplitId, SplitValidationError};
pub use progress::tracker::{ProgressSnapshot, ProgressTracker};
pub use repo::kv_repo::{
    KeyValueRepository, MemoryKeyValueRepository, RepoError, RepoResult,
    SqliteKeyValueRepository,
};
pub use service::ledger::{LedgerError, LedgerResult, LedgerStore, LedgerSummary, SettleOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
