//! Step-lifecycle event contract and an in-process bus.
//!
//! The wallet SDK owns the real emitter; adapters expose it through
//! [`StepEventSource`]. [`StepEventBus`] is the in-process implementation
//! used by hosts that forward SDK callbacks, and by tests.

use crate::progress::step::{ProgressStep, TransactionKind};
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// SDK event channel names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepEventName {
    ExpectedSteps,
    StepComplete,
    BridgeExecuteExpectedSteps,
    BridgeExecuteCompletedSteps,
}

impl StepEventName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpectedSteps => "EXPECTED_STEPS",
            Self::StepComplete => "STEP_COMPLETE",
            Self::BridgeExecuteExpectedSteps => "BRIDGE_EXECUTE_EXPECTED_STEPS",
            Self::BridgeExecuteCompletedSteps => "BRIDGE_EXECUTE_COMPLETED_STEPS",
        }
    }

    /// `(expected, completed)` channel pair for an operation kind.
    pub fn pair_for(kind: TransactionKind) -> (Self, Self) {
        match kind {
            TransactionKind::BridgeAndExecute => (
                Self::BridgeExecuteExpectedSteps,
                Self::BridgeExecuteCompletedSteps,
            ),
            TransactionKind::Bridge | TransactionKind::Transfer => {
                (Self::ExpectedSteps, Self::StepComplete)
            }
        }
    }
}

/// Payload delivered on a step channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    /// Full, authoritative ordered step list.
    ExpectedSteps(Vec<ProgressStep>),
    /// Terminal data of one step.
    StepComplete(ProgressStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

pub type StepListener = Arc<dyn Fn(&StepEvent) + Send + Sync>;

/// Subscription surface of the SDK's step emitter.
pub trait StepEventSource: Send + Sync {
    fn subscribe(&self, name: StepEventName, listener: StepListener) -> ListenerId;
    fn unsubscribe(&self, name: StepEventName, id: ListenerId);
}

/// Synchronous fan-out emitter.
///
/// Listeners run on the emitting thread, outside the bus lock, so a
/// listener may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct StepEventBus {
    listeners: Mutex<BTreeMap<ListenerId, (StepEventName, StepListener)>>,
}

impl StepEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every listener of `name`; returns how many ran.
    pub fn emit(&self, name: StepEventName, event: StepEvent) -> usize {
        let targets: Vec<StepListener> = self
            .listeners
            .lock()
            .values()
            .filter(|(channel, _)| *channel == name)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(
            "event=step_emit module=progress status=ok channel={} listeners={}",
            name.as_str(),
            targets.len()
        );
        for listener in &targets {
            listener(&event);
        }
        targets.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl StepEventSource for StepEventBus {
    fn subscribe(&self, name: StepEventName, listener: StepListener) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.lock().insert(id, (name, listener));
        id
    }

    fn unsubscribe(&self, name: StepEventName, id: ListenerId) {
        let mut listeners = self.listeners.lock();
        if listeners.get(&id).is_some_and(|(channel, _)| *channel == name) {
            listeners.remove(&id);
        }
    }
}
