//! Progress tracker bound to one in-flight operation.
//!
//! # Responsibility
//! - Subscribe to the expected/completed step channels for one operation kind.
//! - Apply the first expected-steps list immediately and coalesce later ones
//!   until the next render frame ([`ProgressTracker::on_frame`]).
//! - Derive the display snapshot: fraction, milestones, explorer link.
//!
//! # Invariants
//! - `detach` unsubscribes both channels and drops any pending list.
//! - State never survives a detach; listeners from an older attachment are
//!   ignored even if an emitter already holds them.
//! - `completion_fraction` never decreases within one attachment.

use crate::progress::events::{
    ListenerId, StepEvent, StepEventName, StepEventSource, StepListener,
};
use crate::progress::reducer::StepReducer;
use crate::progress::step::{ProgressStep, TrackedStep, TransactionKind};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// `(id, label)` of the three display milestones, in order.
pub const MILESTONES: [(&str, &str); 3] = [
    ("verified", "Intent verified"),
    ("collected", "Collected on sources"),
    ("filled", "Filled on destination"),
];

/// Coarse display milestone; reached when the fraction crosses its threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub id: &'static str,
    pub label: &'static str,
    pub threshold: f64,
    pub completed: bool,
}

/// Render-ready view of the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub steps: Vec<TrackedStep>,
    pub completed_count: usize,
    pub total_count: usize,
    /// `completed / total` of the current list.
    pub raw_fraction: f64,
    /// Highest `raw_fraction` seen during this attachment.
    pub completion_fraction: f64,
    pub all_completed: bool,
    pub milestones: Vec<Milestone>,
    /// First incomplete milestone; `None` once all are reached.
    pub current_milestone: Option<usize>,
    pub explorer_url: Option<String>,
    pub latest_completed: Option<ProgressStep>,
    pub latest_completed_index: Option<usize>,
}

#[derive(Debug, Default)]
struct TrackerState {
    attachment: u64,
    reducer: StepReducer,
    first_list_applied: bool,
    pending_list: Option<Vec<ProgressStep>>,
    high_water: f64,
    explorer_url: Option<String>,
    latest_completed: Option<ProgressStep>,
}

impl TrackerState {
    fn fresh(attachment: u64) -> Self {
        Self {
            attachment,
            ..Self::default()
        }
    }

    fn on_expected(&mut self, steps: Vec<ProgressStep>) {
        if self.first_list_applied {
            self.pending_list = Some(steps);
            return;
        }
        self.first_list_applied = true;
        self.reducer.apply_expected(steps);
        self.raise_high_water();
    }

    fn on_completed(&mut self, step: ProgressStep) {
        self.reducer.mark_completed(&step);
        if let Some(url) = step.settlement_explorer_url() {
            info!("event=explorer_url module=progress status=ok url={url}");
            self.explorer_url = Some(url.to_string());
        }
        self.latest_completed = Some(step);
        self.raise_high_water();
    }

    fn flush_pending(&mut self) -> bool {
        let Some(steps) = self.pending_list.take() else {
            return false;
        };
        self.reducer.apply_expected(steps);
        self.raise_high_water();
        true
    }

    fn raise_high_water(&mut self) {
        self.high_water = self.high_water.max(self.reducer.fraction());
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let fraction = self.high_water;
        let milestones: Vec<Milestone> = MILESTONES
            .iter()
            .enumerate()
            .map(|(idx, &(id, label))| {
                let threshold = (idx + 1) as f64 / MILESTONES.len() as f64;
                Milestone {
                    id,
                    label,
                    threshold,
                    completed: fraction >= threshold,
                }
            })
            .collect();
        let current_milestone = milestones.iter().position(|m| !m.completed);

        ProgressSnapshot {
            steps: self.reducer.steps().to_vec(),
            completed_count: self.reducer.completed_count(),
            total_count: self.reducer.steps().len(),
            raw_fraction: self.reducer.fraction(),
            completion_fraction: fraction,
            all_completed: fraction >= 1.0,
            milestones,
            current_milestone,
            explorer_url: self.explorer_url.clone(),
            latest_completed: self.latest_completed.clone(),
            latest_completed_index: self.reducer.latest_completed_index(),
        }
    }
}

/// Step tracker attached to an SDK event source.
pub struct ProgressTracker {
    source: Arc<dyn StepEventSource>,
    kind: TransactionKind,
    state: Arc<Mutex<TrackerState>>,
    subscriptions: Vec<(StepEventName, ListenerId)>,
}

impl ProgressTracker {
    /// Subscribes to the channel pair of `kind` with empty state.
    pub fn attach(source: Arc<dyn StepEventSource>, kind: TransactionKind) -> Self {
        let mut tracker = Self {
            source,
            kind,
            state: Arc::new(Mutex::new(TrackerState::fresh(1))),
            subscriptions: Vec::new(),
        };
        tracker.subscribe();
        tracker
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Applies the latest coalesced expected-steps list, if one is waiting.
    ///
    /// Hosts call this once per render frame.
    pub fn on_frame(&self) -> bool {
        self.state.lock().flush_pending()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.state.lock().pending_list.is_some()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().snapshot()
    }

    /// Unsubscribes both channels and discards all tracked state.
    pub fn detach(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        for (name, id) in self.subscriptions.drain(..) {
            self.source.unsubscribe(name, id);
        }
        let mut state = self.state.lock();
        let next = state.attachment + 1;
        *state = TrackerState::fresh(next);
        debug!(
            "event=progress_detach module=progress status=ok kind={:?}",
            self.kind
        );
    }

    /// Detaches, then subscribes again from empty state.
    pub fn reattach(&mut self) {
        self.detach();
        self.subscribe();
    }

    fn subscribe(&mut self) {
        let attachment = self.state.lock().attachment;
        let (expected, completed) = StepEventName::pair_for(self.kind);
        for name in [expected, completed] {
            let listener = listener_for(Arc::downgrade(&self.state), attachment);
            let id = self.source.subscribe(name, listener);
            self.subscriptions.push((name, id));
        }
        debug!(
            "event=progress_attach module=progress status=ok kind={:?} attachment={attachment}",
            self.kind
        );
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.detach();
    }
}

fn listener_for(state: Weak<Mutex<TrackerState>>, attachment: u64) -> StepListener {
    Arc::new(move |event: &StepEvent| {
        let Some(state) = state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        if state.attachment != attachment {
            return;
        }
        match event {
            StepEvent::ExpectedSteps(steps) => state.on_expected(steps.clone()),
            StepEvent::StepComplete(step) => state.on_completed(step.clone()),
        }
    })
}
