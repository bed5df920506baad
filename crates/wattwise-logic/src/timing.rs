//! Tick-driven timers.
//!
//! Timed sequences (narration beats, signal locks, quiz deadlines) never block
//! the loop. A [`TaskQueue`] holds continuations that become due after a delay
//! and are drained on a later tick; cancelling removes them before they can
//! run. [`Countdown`] is a single restartable deadline.

/// Restartable countdown that reports expiry exactly once per start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    duration: f32,
    remaining: f32,
    running: bool,
}

impl Countdown {
    /// A stopped countdown of `duration` seconds.
    pub fn new(duration: f32) -> Self {
        let duration = duration.max(0.0);
        Self {
            duration,
            remaining: duration,
            running: false,
        }
    }

    /// Start (or restart) from the full duration.
    pub fn start(&mut self) {
        self.remaining = self.duration;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance by `dt` seconds. Returns `true` on the tick that reaches zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
        if self.remaining <= 0.0 {
            self.running = false;
            return true;
        }
        false
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Remaining time as a fraction of the duration (for a progress bar).
    pub fn fraction_remaining(&self) -> f32 {
        if self.duration <= 0.0 {
            0.0
        } else {
            self.remaining / self.duration
        }
    }
}

/// Identifies a scheduled continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct PendingTask<T> {
    handle: TaskHandle,
    due_at: f64,
    payload: T,
}

/// Queue of delayed continuations carrying a payload of type `T`.
///
/// Callers advance the clock once per tick and then drain due tasks one at a
/// time with [`TaskQueue::pop_due`], so a continuation that cancels others
/// stops them even when they were due in the same tick.
#[derive(Debug, Clone)]
pub struct TaskQueue<T> {
    pending: Vec<PendingTask<T>>,
    now: f64,
    next_id: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            now: 0.0,
            next_id: 0,
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `payload` after `delay` seconds of ticks.
    pub fn schedule(&mut self, delay: f32, payload: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTask {
            handle,
            due_at: self.now + f64::from(delay.max(0.0)),
            payload,
        });
        handle
    }

    /// Drop a pending task. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    /// Drop every pending task, returning how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move the queue clock forward.
    pub fn advance(&mut self, dt: f32) {
        self.now += f64::from(dt.max(0.0));
    }

    /// Remove and return the earliest due task, if any.
    /// Ties go to the task scheduled first.
    pub fn pop_due(&mut self) -> Option<T> {
        let now = self.now;
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_at <= now)
            .min_by(|(_, a), (_, b)| {
                a.due_at
                    .partial_cmp(&b.due_at)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.handle.0.cmp(&b.handle.0))
            })
            .map(|(i, _)| i)?;
        Some(self.pending.remove(index).payload)
    }

    /// Seconds until `handle` runs, if it is still pending.
    pub fn time_until(&self, handle: TaskHandle) -> Option<f32> {
        self.pending
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| (t.due_at - self.now).max(0.0) as f32)
    }
}
