//! Clock and scheduled-task handles owned by the bridge hook.
//!
//! Timers are plain data: a [`TimerSet`] records deadlines and the owner
//! asks for due firings with [`TimerSet::take_due`]. Nothing runs in the
//! background, so a cancelled handle can never fire into a later phase.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time since an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// One-shot auto-quote after input inactivity.
    Debounce,
    /// Periodic refresh of a held quote.
    QuoteRefresh,
    /// Periodic tick of the execution elapsed counter.
    ElapsedTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    kind: TimerKind,
}

impl TimerHandle {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

/// One due timer. Periodic timers that fell behind report every missed
/// period in `runs` instead of firing repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub handle: TimerHandle,
    pub runs: u32,
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    kind: TimerKind,
    due: Duration,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerSet {
    next_id: u64,
    entries: BTreeMap<u64, TimerEntry>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, kind: TimerKind, now: Duration, delay: Duration) -> TimerHandle {
        self.insert(kind, now + delay, None)
    }

    /// First firing one `period` after `now`. A zero period is clamped to 1 ms.
    pub fn schedule_every(
        &mut self,
        kind: TimerKind,
        now: Duration,
        period: Duration,
    ) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        self.insert(kind, now + period, Some(period))
    }

    /// Returns `false` when the handle already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.entries.remove(&handle.id).is_some()
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle.id)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.values().map(|entry| entry.due).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes due one-shots, advances due periodic timers, and returns the
    /// firings ordered by deadline.
    pub fn take_due(&mut self, now: Duration) -> Vec<Firing> {
        let mut due: Vec<(Duration, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.due <= now)
            .map(|(id, entry)| (entry.due, *id))
            .collect();
        due.sort();

        let mut firings = Vec::with_capacity(due.len());
        for (_, id) in due {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            let handle = TimerHandle {
                id,
                kind: entry.kind,
            };
            match entry.period {
                Some(period) => {
                    let behind = (now - entry.due).as_nanos() / period.as_nanos();
                    let runs = u32::try_from(behind + 1).unwrap_or(u32::MAX);
                    entry.due += period * runs;
                    firings.push(Firing { handle, runs });
                }
                None => {
                    self.entries.remove(&id);
                    firings.push(Firing { handle, runs: 1 });
                }
            }
        }
        firings
    }

    fn insert(&mut self, kind: TimerKind, due: Duration, period: Option<Duration>) -> TimerHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(id, TimerEntry { kind, due, period });
        TimerHandle { id, kind }
    }
}
