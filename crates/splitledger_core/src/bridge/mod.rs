//! Bridge panel orchestration over the external wallet SDK.
//!
//! # Responsibility
//! - Describe the SDK surface the panel depends on ([`intent::IntentService`]).
//! - Validate panel inputs and own the panel's timers.
//! - Drive the single-flight quote → accept → execute workflow.
//!
//! # Invariants
//! - At most one quote attempt is outstanding per hook.
//! - Every timer is owned by the hook and cancelled when its phase ends.

pub mod hook;
pub mod inputs;
pub mod intent;
pub mod timers;
