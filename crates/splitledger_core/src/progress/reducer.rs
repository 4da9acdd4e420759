//! Two-phase step reducer.
//!
//! Phase 1 replaces the tracked list with an authoritative "expected steps"
//! list. Phase 2 overlays the completed-id set on top of it. The overlay is
//! kept as state so a "step completed" event that arrives before its step is
//! announced still lands once the announcement is applied.

use crate::progress::step::{ProgressStep, TrackedStep};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReducer {
    steps: Vec<TrackedStep>,
    completed_ids: BTreeSet<String>,
}

impl StepReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tracked list with `expected`, keeping completion of every
    /// id already known to be complete.
    pub fn apply_expected(&mut self, expected: Vec<ProgressStep>) {
        for tracked in self.steps.iter().filter(|tracked| tracked.completed) {
            remember(&mut self.completed_ids, &tracked.step.type_id);
        }

        self.steps = expected
            .into_iter()
            .enumerate()
            .map(|(index, step)| TrackedStep {
                index,
                completed: false,
                step,
            })
            .collect();

        self.overlay_completed();
    }

    /// Records `step` as complete and marks every tracked entry with its id.
    ///
    /// Returns the index of the first matching tracked entry, if any.
    pub fn mark_completed(&mut self, step: &ProgressStep) -> Option<usize> {
        remember(&mut self.completed_ids, &step.type_id);

        let mut first_match = None;
        for tracked in self
            .steps
            .iter_mut()
            .filter(|tracked| !step.type_id.is_empty() && tracked.step.type_id == step.type_id)
        {
            tracked.completed = true;
            first_match.get_or_insert(tracked.index);
        }
        first_match
    }

    pub fn steps(&self) -> &[TrackedStep] {
        &self.steps
    }

    pub fn completed_ids(&self) -> &BTreeSet<String> {
        &self.completed_ids
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|tracked| tracked.completed).count()
    }

    /// `completed / total`, or 0 for an empty list.
    pub fn fraction(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.steps.len() as f64
    }

    /// Index of the last completed tracked step.
    pub fn latest_completed_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .rev()
            .find(|tracked| tracked.completed)
            .map(|tracked| tracked.index)
    }

    fn overlay_completed(&mut self) {
        for tracked in &mut self.steps {
            if self.completed_ids.contains(&tracked.step.type_id) {
                tracked.completed = true;
            }
        }
    }
}

fn remember(ids: &mut BTreeSet<String>, type_id: &str) {
    if !type_id.is_empty() {
        ids.insert(type_id.to_string());
    }
}
