//! Deterministic, host-driven time.
//!
//! hush never blocks and never spawns threads. The two cooperative
//! suspension points it needs (the fixed delay before the post-stream
//! reapplication pass, and the frame wait before a scroll restore) are
//! expressed as entries in a [`TimerQueue`]. The embedding host advances
//! monotonic time with [`TimerQueue::advance`] and reports rendering-frame
//! boundaries with [`TimerQueue::frame`]; both return the tasks that became
//! due, in the order they were scheduled.
//!
//! ```
//! use hush_core::clock::TimerQueue;
//! use std::time::Duration;
//!
//! let mut timers = TimerQueue::new();
//! timers.after(Duration::from_millis(100), "reapply");
//! timers.after_frames(2, "restore");
//!
//! assert!(timers.advance(Duration::from_millis(50)).is_empty());
//! assert!(timers.frame().is_empty());
//! assert_eq!(timers.frame(), vec!["restore"]);
//! assert_eq!(timers.advance(Duration::from_millis(50)), vec!["reapply"]);
//! ```

use core::time::Duration;

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Time never moves backwards.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

/// Handle for a scheduled task, usable with [`TimerQueue::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Due {
    At(Duration),
    Frames(u32),
}

#[derive(Debug)]
struct Pending<T> {
    id: TimerId,
    due: Due,
    task: T,
}

/// Queue of deferred tasks, woken by host time or host frame boundaries.
#[derive(Debug)]
pub struct TimerQueue<T> {
    clock: DeterministicClock,
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue with its clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clock: DeterministicClock::new(),
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Current time of the queue's clock.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Number of tasks still waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule `task` to run once `delay` of host time has elapsed.
    pub fn after(&mut self, delay: Duration, task: T) -> TimerId {
        let due = Due::At(self.clock.now().saturating_add(delay));
        self.push(due, task)
    }

    /// Schedule `task` to run after `frames` rendering-frame boundaries.
    ///
    /// `frames == 0` is treated as one frame: a frame wait always yields.
    pub fn after_frames(&mut self, frames: u32, task: T) -> TimerId {
        self.push(Due::Frames(frames.max(1)), task)
    }

    /// Cancel a pending task, returning it if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let pos = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(pos).task)
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Advance host time by `dt` and return the time-based tasks now due.
    ///
    /// Tasks are returned ordered by due time, ties broken by scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.clock.advance(dt);
        let now = self.clock.now();
        let mut due = self.take_where(|d| matches!(d, Due::At(at) if *at <= now));
        due.sort_by_key(|(id, d, _)| {
            let at = match d {
                Due::At(at) => *at,
                Due::Frames(_) => Duration::ZERO,
            };
            (at, *id)
        });
        due.into_iter().map(|(_, _, task)| task).collect()
    }

    /// Report one rendering-frame boundary and return the frame-based tasks
    /// whose wait just completed, in scheduling order.
    pub fn frame(&mut self) -> Vec<T> {
        for pending in &mut self.pending {
            if let Due::Frames(n) = &mut pending.due {
                *n = n.saturating_sub(1);
            }
        }
        self.take_where(|d| matches!(d, Due::Frames(0)))
            .into_iter()
            .map(|(_, _, task)| task)
            .collect()
    }

    fn push(&mut self, due: Due, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending { id, due, task });
        id
    }

    fn take_where(&mut self, pred: impl Fn(&Due) -> bool) -> Vec<(TimerId, Due, T)> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.pending.len());
        for pending in self.pending.drain(..) {
            if pred(&pending.due) {
                taken.push((pending.id, pending.due, pending.task));
            } else {
                kept.push(pending);
            }
        }
        self.pending = kept;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn clock_never_moves_backwards() {
        let mut clock = DeterministicClock::new();
        clock.advance(MS * 10);
        clock.set(MS * 5);
        assert_eq!(clock.now(), MS * 10);
        clock.set(MS * 20);
        assert_eq!(clock.now(), MS * 20);
    }

    #[test]
    fn time_tasks_fire_once_due() {
        let mut q = TimerQueue::new();
        q.after(MS * 100, 1);
        assert!(q.advance(MS * 99).is_empty());
        assert_eq!(q.advance(MS), vec![1]);
        assert!(q.is_empty());
        assert!(q.advance(MS * 1000).is_empty());
    }

    #[test]
    fn time_tasks_ordered_by_due_then_schedule() {
        let mut q = TimerQueue::new();
        q.after(MS * 30, "late");
        q.after(MS * 10, "early-a");
        q.after(MS * 10, "early-b");
        assert_eq!(q.advance(MS * 50), vec!["early-a", "early-b", "late"]);
    }

    #[test]
    fn frame_tasks_count_boundaries() {
        let mut q = TimerQueue::new();
        q.after_frames(2, 'a');
        q.after_frames(1, 'b');
        assert_eq!(q.frame(), vec!['b']);
        assert_eq!(q.frame(), vec!['a']);
        assert!(q.frame().is_empty());
    }

    #[test]
    fn zero_frames_still_waits_one_frame() {
        let mut q = TimerQueue::new();
        q.after_frames(0, ());
        assert_eq!(q.len(), 1);
        assert_eq!(q.frame().len(), 1);
    }

    #[test]
    fn frames_do_not_fire_time_tasks_and_vice_versa() {
        let mut q = TimerQueue::new();
        q.after(MS * 10, "time");
        q.after_frames(1, "frame");
        assert!(q.advance(MS).is_empty());
        assert_eq!(q.frame(), vec!["frame"]);
        assert_eq!(q.advance(MS * 9), vec!["time"]);
    }

    #[test]
    fn cancel_removes_pending_task() {
        let mut q = TimerQueue::new();
        let id = q.after(MS, 7);
        assert_eq!(q.cancel(id), Some(7));
        assert_eq!(q.cancel(id), None);
        assert!(q.advance(MS * 5).is_empty());
    }
}
