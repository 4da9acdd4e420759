//! Bridge panel state machine.
//!
//! # Responsibility
//! - Hold the form inputs, the quoted intent, and the visible error.
//! - Run the single-flight quote → accept → execute workflow against an
//!   [`IntentService`].
//! - Own the debounce, quote-refresh, and elapsed-counter timers.
//!
//! # Invariants
//! - At most one commit attempt is in flight; extra attempts are dropped.
//! - An input change clears the held quote before the new value is stored.
//! - Every timer handle is cancelled when its phase ends and on drop.
//! - No state lock is held across an SDK call.
//! - Results that resolve after a reset or input change are discarded.

use crate::bridge::inputs::{sanitize_amount_input, BridgeInputs, InputIssue};
use crate::bridge::intent::{
    AllowancePrompt, Intent, IntentError, IntentService, QuoteRequest, TokenBalance,
};
use crate::bridge::timers::{Clock, TimerHandle, TimerKind, TimerSet};
use crate::config::BridgeConfig;
use crate::progress::step::TransactionKind;
use crate::progress::tracker::{ProgressSnapshot, ProgressTracker};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Message used when the SDK reports failure without a reason.
const FALLBACK_EXECUTE_ERROR: &str = "Transaction rejected by user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    Idle,
    Quoting,
    QuoteReady,
    Refreshing,
    Executing,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    InvalidInputs(Vec<InputIssue>),
    /// Accept was requested without a held quote.
    NoQuote,
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInputs(issues) => {
                let joined: Vec<String> = issues.iter().map(ToString::to_string).collect();
                write!(f, "invalid bridge inputs: {}", joined.join("; "))
            }
            Self::NoQuote => write!(f, "no quote is held"),
        }
    }
}

impl Error for BridgeError {}

/// How a workflow step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Refused by a guard; nothing was sent to the SDK.
    Dropped,
    QuoteReady,
    Completed { explorer_url: Option<String> },
    /// The user declined in their wallet; reset without a banner.
    Cancelled,
    /// A banner is showing with this message.
    Failed(String),
    /// The SDK answered after a reset or input change; the answer was ignored.
    Discarded,
}

struct HookState {
    phase: BridgePhase,
    inputs: BridgeInputs,
    intent: Option<Intent>,
    allowance: Option<AllowancePrompt>,
    error: Option<String>,
    dialog_open: bool,
    elapsed: Duration,
    balances: Vec<TokenBalance>,
    explorer_url: Option<String>,
    timers: TimerSet,
    debounce: Option<TimerHandle>,
    refresh: Option<TimerHandle>,
    elapsed_tick: Option<TimerHandle>,
    generation: u64,
    tracker: Option<ProgressTracker>,
}

impl HookState {
    fn cancel(&mut self, kind: TimerKind) {
        let slot = match kind {
            TimerKind::Debounce => &mut self.debounce,
            TimerKind::QuoteRefresh => &mut self.refresh,
            TimerKind::ElapsedTick => &mut self.elapsed_tick,
        };
        if let Some(handle) = slot.take() {
            self.timers.cancel(handle);
        }
    }

    fn cancel_all(&mut self) {
        self.timers.clear();
        self.debounce = None;
        self.refresh = None;
        self.elapsed_tick = None;
    }

    /// Clears the held quote and its refresh timer; returns it for denial.
    fn take_quote(&mut self) -> Option<Intent> {
        self.cancel(TimerKind::QuoteRefresh);
        if matches!(self.phase, BridgePhase::QuoteReady | BridgePhase::Refreshing) {
            self.phase = BridgePhase::Idle;
        }
        self.intent.take()
    }

    fn close_dialog(&mut self) {
        self.dialog_open = false;
        self.cancel(TimerKind::ElapsedTick);
        self.tracker = None;
    }
}

/// Releases the commit lock even if the commit future is dropped mid-flight.
struct CommitGuard<'a>(&'a AtomicBool);

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Bridge panel controller for one connected wallet.
pub struct BridgeHook<S, C> {
    service: Arc<S>,
    clock: C,
    config: BridgeConfig,
    connected_address: String,
    state: Mutex<HookState>,
    commit_lock: AtomicBool,
}

impl<S: IntentService, C: Clock> BridgeHook<S, C> {
    pub fn new(
        service: Arc<S>,
        clock: C,
        config: BridgeConfig,
        connected_address: impl Into<String>,
    ) -> Self {
        let connected_address = connected_address.into();
        let inputs = BridgeInputs::defaults(&config, &connected_address);
        Self {
            service,
            clock,
            config,
            connected_address,
            state: Mutex::new(HookState {
                phase: BridgePhase::Idle,
                inputs,
                intent: None,
                allowance: None,
                error: None,
                dialog_open: false,
                elapsed: Duration::ZERO,
                balances: Vec::new(),
                explorer_url: None,
                timers: TimerSet::new(),
                debounce: None,
                refresh: None,
                elapsed_tick: None,
                generation: 0,
                tracker: None,
            }),
            commit_lock: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> BridgePhase {
        self.state.lock().phase
    }

    pub fn inputs(&self) -> BridgeInputs {
        self.state.lock().inputs.clone()
    }

    pub fn intent(&self) -> Option<Intent> {
        self.state.lock().intent.clone()
    }

    pub fn allowance_prompt(&self) -> Option<AllowancePrompt> {
        self.state.lock().allowance.clone()
    }

    /// Visible error banner text.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn is_dialog_open(&self) -> bool {
        self.state.lock().dialog_open
    }

    /// Time counted by the elapsed ticker during the last execution.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    pub fn balances(&self) -> Vec<TokenBalance> {
        self.state.lock().balances.clone()
    }

    /// Balance entry of the currently selected token.
    pub fn selected_balance(&self) -> Option<TokenBalance> {
        let state = self.state.lock();
        state
            .balances
            .iter()
            .find(|balance| balance.symbol == state.inputs.token)
            .cloned()
    }

    /// Explorer link of the last successful execution.
    pub fn explorer_url(&self) -> Option<String> {
        self.state.lock().explorer_url.clone()
    }

    pub fn is_commit_in_flight(&self) -> bool {
        self.commit_lock.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.state.lock().tracker.as_ref().map(ProgressTracker::snapshot)
    }

    /// Forwards a render frame to the progress tracker.
    pub fn on_frame(&self) -> bool {
        self.state
            .lock()
            .tracker
            .as_ref()
            .is_some_and(ProgressTracker::on_frame)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.lock().timers.next_deadline()
    }

    pub fn active_timer_count(&self) -> usize {
        self.state.lock().timers.len()
    }

    pub fn set_chain(&self, chain_id: u64) -> bool {
        self.update_inputs(|inputs| inputs.chain_id = chain_id)
    }

    pub fn set_token(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        self.update_inputs(|inputs| inputs.token = token)
    }

    /// Stores the sanitized amount text; empty text clears the amount.
    pub fn set_amount(&self, raw: &str) -> bool {
        let sanitized = sanitize_amount_input(raw);
        self.update_inputs(|inputs| {
            inputs.amount = (!sanitized.is_empty()).then_some(sanitized);
        })
    }

    pub fn set_recipient(&self, recipient: &str) -> bool {
        let trimmed = recipient.trim();
        self.update_inputs(|inputs| {
            inputs.recipient = (!trimmed.is_empty()).then(|| trimmed.to_string());
        })
    }

    /// Explicit submission. Invalid inputs never reach the SDK.
    pub async fn submit(&self) -> Result<FlowOutcome, BridgeError> {
        {
            let mut state = self.state.lock();
            let issues = state.inputs.issues();
            if !issues.is_empty() {
                debug!(
                    "event=submit module=bridge status=invalid issues={}",
                    issues.len()
                );
                return Err(BridgeError::InvalidInputs(issues));
            }
            state.cancel(TimerKind::Debounce);
        }
        Ok(self.commit().await)
    }

    /// Single-flight quote attempt.
    ///
    /// Dropped while another commit runs, while a quote is held, while an
    /// error is showing, while the workflow is busy, or when inputs are invalid.
    pub async fn commit(&self) -> FlowOutcome {
        if self.commit_lock.swap(true, Ordering::AcqRel) {
            debug!("event=commit module=bridge status=dropped reason=in_flight");
            return FlowOutcome::Dropped;
        }
        let _guard = CommitGuard(&self.commit_lock);

        let (request, generation) = {
            let mut state = self.state.lock();
            let reason = if state.intent.is_some() {
                Some("quote_held")
            } else if state.error.is_some() {
                Some("error_showing")
            } else if state.phase != BridgePhase::Idle {
                Some("busy")
            } else if !state.inputs.is_valid() {
                Some("invalid_inputs")
            } else {
                None
            };
            if let Some(reason) = reason {
                debug!("event=commit module=bridge status=dropped reason={reason}");
                return FlowOutcome::Dropped;
            }
            state.cancel(TimerKind::Debounce);
            state.phase = BridgePhase::Quoting;
            (self.quote_request(&state.inputs), state.generation)
        };

        info!(
            "event=quote module=bridge status=start chain_id={} token={} transfer={}",
            request.chain_id,
            request.token,
            request.is_transfer()
        );
        let result = self.service.quote(&request).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            if state.phase == BridgePhase::Quoting {
                state.phase = BridgePhase::Idle;
            }
            self.rearm_debounce(&mut state);
            drop(state);
            if let Ok(intent) = &result {
                self.service.deny_intent(intent);
            }
            info!("event=quote module=bridge status=stale");
            return FlowOutcome::Discarded;
        }

        match result {
            Ok(intent) => {
                info!("event=quote module=bridge status=ok intent_id={}", intent.id);
                state.intent = Some(intent);
                state.phase = BridgePhase::QuoteReady;
                let now = self.clock.now();
                let handle = state.timers.schedule_every(
                    TimerKind::QuoteRefresh,
                    now,
                    self.config.refresh_interval(),
                );
                state.refresh = Some(handle);
                FlowOutcome::QuoteReady
            }
            Err(err) => self.fail(&mut state, "quote", err),
        }
    }

    /// Accepts the held quote and executes it.
    pub async fn accept(&self) -> Result<FlowOutcome, BridgeError> {
        let (intent, generation) = {
            let mut state = self.state.lock();
            if !matches!(
                state.phase,
                BridgePhase::QuoteReady | BridgePhase::Refreshing
            ) {
                return Err(BridgeError::NoQuote);
            }
            let intent = state.intent.clone().ok_or(BridgeError::NoQuote)?;

            state.cancel(TimerKind::QuoteRefresh);
            state.phase = BridgePhase::Executing;
            state.error = None;
            state.dialog_open = true;
            state.elapsed = Duration::ZERO;
            state.explorer_url = None;

            state.cancel(TimerKind::ElapsedTick);
            let now = self.clock.now();
            let tick =
                state
                    .timers
                    .schedule_every(TimerKind::ElapsedTick, now, self.config.elapsed_tick());
            state.elapsed_tick = Some(tick);

            let kind = if intent.request.is_transfer() {
                TransactionKind::Transfer
            } else {
                TransactionKind::Bridge
            };
            state.tracker = Some(ProgressTracker::attach(self.service.step_events(), kind));
            (intent, state.generation)
        };

        info!("event=execute module=bridge status=start intent_id={}", intent.id);
        self.service.allow_intent(&intent);
        let result = self.service.execute(&intent).await;

        let explorer_url = {
            let mut state = self.state.lock();
            state.cancel(TimerKind::ElapsedTick);
            if state.generation != generation {
                info!("event=execute module=bridge status=stale intent_id={}", intent.id);
                return Ok(FlowOutcome::Discarded);
            }

            let response = match result {
                Ok(response) if response.success => response,
                Ok(response) => {
                    let message = response
                        .error
                        .unwrap_or_else(|| FALLBACK_EXECUTE_ERROR.to_string());
                    state.intent = None;
                    return Ok(self.fail(&mut state, "execute", IntentError::from_message(message)));
                }
                Err(err) => {
                    state.intent = None;
                    return Ok(self.fail(&mut state, "execute", err));
                }
            };

            info!(
                "event=execute module=bridge status=ok intent_id={} explorer_url={}",
                intent.id,
                response.explorer_url.as_deref().unwrap_or("-")
            );
            state.intent = None;
            state.allowance = None;
            state.cancel(TimerKind::QuoteRefresh);
            state.cancel(TimerKind::Debounce);
            state.inputs = BridgeInputs::defaults(&self.config, &self.connected_address);
            state.generation += 1;
            state.phase = BridgePhase::Idle;
            state.explorer_url = response.explorer_url.clone();
            response.explorer_url
        };

        self.refresh_balances().await;
        Ok(FlowOutcome::Completed { explorer_url })
    }

    /// Re-validates the held quote in the background.
    ///
    /// Failures are logged and the held quote is kept.
    pub async fn refresh_quote(&self) -> bool {
        let (intent, generation) = {
            let mut state = self.state.lock();
            if state.phase != BridgePhase::QuoteReady {
                return false;
            }
            let Some(intent) = state.intent.clone() else {
                return false;
            };
            state.phase = BridgePhase::Refreshing;
            (intent, state.generation)
        };

        let result = self.service.refresh_intent(&intent).await;

        let mut state = self.state.lock();
        if state.generation != generation || state.phase != BridgePhase::Refreshing {
            debug!("event=quote_refresh module=bridge status=stale");
            return false;
        }
        state.phase = BridgePhase::QuoteReady;
        match result {
            Ok(refreshed) => {
                debug!(
                    "event=quote_refresh module=bridge status=ok intent_id={}",
                    refreshed.id
                );
                state.intent = Some(refreshed);
                true
            }
            Err(err) => {
                warn!("event=quote_refresh module=bridge status=error error={err}");
                false
            }
        }
    }

    /// Reloads unified balances. Failures are logged; old balances stay.
    pub async fn refresh_balances(&self) -> bool {
        match self.service.get_balances().await {
            Ok(balances) => {
                debug!(
                    "event=balances module=bridge status=ok tokens={}",
                    balances.len()
                );
                self.state.lock().balances = balances;
                true
            }
            Err(err) => {
                warn!("event=balances module=bridge status=error error={err}");
                false
            }
        }
    }

    /// User deny: drops the quote, stops every timer, restores defaults.
    pub fn reset(&self) {
        let denied = {
            let mut state = self.state.lock();
            let intent = state.intent.take();
            state.cancel_all();
            state.close_dialog();
            state.allowance = None;
            state.error = None;
            state.inputs = BridgeInputs::defaults(&self.config, &self.connected_address);
            state.phase = BridgePhase::Idle;
            state.generation += 1;
            intent
        };
        if let Some(intent) = denied {
            self.service.deny_intent(&intent);
        }
        info!("event=reset module=bridge status=ok");
    }

    /// Hides the error banner and returns to Idle. Nothing is retried.
    pub fn dismiss_error(&self) {
        let mut state = self.state.lock();
        if state.phase == BridgePhase::Error {
            state.phase = BridgePhase::Idle;
        }
        state.error = None;
    }

    /// Closes the progress dialog, stopping the elapsed counter.
    pub fn close_dialog(&self) {
        self.state.lock().close_dialog();
    }

    pub fn receive_allowance_request(&self, prompt: AllowancePrompt) {
        info!(
            "event=allowance_request module=bridge status=ok token={} chain_id={}",
            prompt.token, prompt.chain_id
        );
        self.state.lock().allowance = Some(prompt);
    }

    pub fn clear_allowance_prompt(&self) {
        self.state.lock().allowance = None;
    }

    /// Fills the amount with the selected token's balance and commits now.
    pub async fn use_max_balance(&self) -> FlowOutcome {
        let Some(balance) = self.selected_balance() else {
            return FlowOutcome::Dropped;
        };
        self.set_amount(&balance.balance);
        self.state.lock().cancel(TimerKind::Debounce);
        self.commit().await
    }

    /// Runs every due timer task; returns how many firings were handled.
    pub async fn poll_timers(&self) -> usize {
        let firings = {
            let mut state = self.state.lock();
            let now = self.clock.now();
            state.timers.take_due(now)
        };

        for firing in &firings {
            match firing.handle.kind() {
                TimerKind::Debounce => {
                    let current = {
                        let mut state = self.state.lock();
                        if state.debounce == Some(firing.handle) {
                            state.debounce = None;
                            true
                        } else {
                            false
                        }
                    };
                    if current {
                        self.commit().await;
                    }
                }
                TimerKind::QuoteRefresh => {
                    let current = self.state.lock().refresh == Some(firing.handle);
                    if current {
                        self.refresh_quote().await;
                    }
                }
                TimerKind::ElapsedTick => {
                    let mut state = self.state.lock();
                    if state.elapsed_tick == Some(firing.handle) {
                        state.elapsed += self.config.elapsed_tick() * firing.runs;
                    }
                }
            }
        }
        firings.len()
    }

    /// Sleeps until the next deadline of a wall-clock driven hook, then polls.
    ///
    /// Returns `false` immediately when no timer is scheduled.
    pub async fn wait_for_next_timer(&self) -> bool {
        let Some(deadline) = self.next_deadline() else {
            return false;
        };
        let now = self.clock.now();
        if deadline > now {
            tokio::time::sleep(deadline - now).await;
        }
        self.poll_timers().await;
        true
    }

    fn update_inputs(&self, apply: impl FnOnce(&mut BridgeInputs)) -> bool {
        let denied = {
            let mut state = self.state.lock();
            if state.phase == BridgePhase::Executing {
                debug!("event=inputs module=bridge status=ignored reason=executing");
                return false;
            }
            let mut next = state.inputs.clone();
            apply(&mut next);
            if next == state.inputs {
                return false;
            }

            let denied = state.take_quote();
            if state.phase == BridgePhase::Error {
                state.phase = BridgePhase::Idle;
            }
            state.error = None;
            state.generation += 1;
            state.inputs = next;
            self.rearm_debounce(&mut state);
            denied
        };
        if let Some(intent) = denied {
            info!(
                "event=quote module=bridge status=invalidated intent_id={}",
                intent.id
            );
            self.service.deny_intent(&intent);
        }
        true
    }

    fn rearm_debounce(&self, state: &mut HookState) {
        state.cancel(TimerKind::Debounce);
        if state.inputs.is_valid() {
            let now = self.clock.now();
            let handle = state
                .timers
                .schedule_once(TimerKind::Debounce, now, self.config.debounce());
            state.debounce = Some(handle);
        }
    }

    fn quote_request(&self, inputs: &BridgeInputs) -> QuoteRequest {
        let recipient = inputs
            .recipient
            .as_ref()
            .filter(|address| !address.eq_ignore_ascii_case(&self.connected_address))
            .cloned();
        QuoteRequest {
            token: inputs.token.clone(),
            amount: inputs.amount.clone().unwrap_or_default().trim().to_string(),
            chain_id: inputs.chain_id,
            recipient,
        }
    }

    fn fail(&self, state: &mut HookState, stage: &str, err: IntentError) -> FlowOutcome {
        state.cancel(TimerKind::QuoteRefresh);
        state.close_dialog();
        if err.is_user_rejection() {
            info!("event={stage} module=bridge status=cancelled");
            state.phase = BridgePhase::Idle;
            return FlowOutcome::Cancelled;
        }
        error!("event={stage} module=bridge status=error error={err}");
        let message = err.to_string();
        state.phase = BridgePhase::Error;
        state.error = Some(message.clone());
        FlowOutcome::Failed(message)
    }
}

impl<S, C> Drop for BridgeHook<S, C> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.cancel_all();
        state.tracker = None;
    }
}
