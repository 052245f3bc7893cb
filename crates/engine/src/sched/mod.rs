//! Cooperative virtual-time task scheduler.
//!
//! The engine runs four kinds of deferred work: the one-shot decay timeout,
//! the periodic refresh sweep, the warm-up settle timer and the periodic
//! temperature poll. Each is a one-shot entry in this scheduler; periodic
//! tasks re-arm themselves at the start of their handler.
//!
//! Time is a millisecond counter that only moves when the owner calls
//! [`Scheduler::advance_to`] or pops a due task, much like a timer compare
//! register against a free-running counter. Cancellation is synchronous: once
//! [`Scheduler::cancel`] returns, the task can no longer fire.

use std::collections::BTreeMap;
use std::fmt;

/// Kinds of deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// End of the current decay round.
    DecayTimeout,
    /// One software refresh pass over DRAM.
    RefreshSweep,
    /// End of one warm-up decay cycle.
    WarmUpSettle,
    /// One bandgap temperature sample.
    TemperaturePoll,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DecayTimeout => "decay-timeout",
            Self::RefreshSweep => "refresh-sweep",
            Self::WarmUpSettle => "warm-up-settle",
            Self::TemperaturePoll => "temperature-poll",
        };
        f.write_str(name)
    }
}

/// Identifies one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    id: u64,
    deadline: u64,
    kind: TaskKind,
}

impl TaskHandle {
    /// What the task does when it fires.
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Virtual time, in milliseconds, at which the task fires.
    pub const fn deadline(&self) -> u64 {
        self.deadline
    }
}

/// Single-owner scheduler of one-shot tasks in virtual time.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    next_id: u64,
    /// Keyed by `(deadline, id)` so iteration order is firing order, with
    /// ties broken by scheduling order.
    pending: BTreeMap<(u64, u64), TaskKind>,
}

impl Scheduler {
    /// Creates an empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `kind` to fire `delay_ms` from now.
    ///
    /// # Arguments
    ///
    /// * `kind` - Task to run.
    /// * `delay_ms` - Delay relative to the current time; zero fires on the next dispatch.
    ///
    /// # Returns
    ///
    /// A handle that can cancel the task.
    pub fn schedule(&mut self, kind: TaskKind, delay_ms: u64) -> TaskHandle {
        let handle = TaskHandle {
            id: self.next_id,
            deadline: self.now.saturating_add(delay_ms),
            kind,
        };
        self.next_id += 1;
        let _ = self.pending.insert((handle.deadline, handle.id), kind);
        handle
    }

    /// Cancels a task; returns `true` if it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.pending.remove(&(handle.deadline, handle.id)).is_some()
    }

    /// Cancels every pending task of `kind` and returns how many were removed.
    pub fn cancel_kind(&mut self, kind: TaskKind) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, k| *k != kind);
        before - self.pending.len()
    }

    /// Returns `true` if `handle` has neither fired nor been cancelled.
    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.contains_key(&(handle.deadline, handle.id))
    }

    /// Number of pending tasks of `kind`.
    pub fn pending_of(&self, kind: TaskKind) -> usize {
        self.pending.values().filter(|k| **k == kind).count()
    }

    /// Total number of pending tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deadline of the earliest pending task.
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|&(deadline, _)| deadline)
    }

    /// Removes the earliest task due at or before `until` and moves the clock to its deadline.
    ///
    /// Tasks scheduled by the handler of a popped task with a deadline still
    /// before `until` are returned by later calls, so a caller that loops on
    /// this method observes every firing in deadline order.
    pub fn pop_due(&mut self, until: u64) -> Option<TaskHandle> {
        let (&(deadline, id), _) = self.pending.first_key_value()?;
        if deadline > until {
            return None;
        }
        let kind = self.pending.remove(&(deadline, id))?;
        self.now = self.now.max(deadline);
        Some(TaskHandle { id, deadline, kind })
    }

    /// Moves the clock forward to `time`; never moves it backwards.
    pub const fn advance_to(&mut self, time: u64) {
        if time > self.now {
            self.now = time;
        }
    }
}
