//! Execution progress tracking for one in-flight intent.
//!
//! # Responsibility
//! - Consume the wallet SDK's step-lifecycle events.
//! - Reconcile "expected steps" lists with "step completed" events that may
//!   arrive first, and derive a display progress fraction.
//!
//! # Invariants
//! - A step id once completed stays completed for the whole attachment.
//! - The exposed completion fraction never decreases within one attachment.

pub mod events;
pub mod reducer;
pub mod step;
pub mod tracker;
