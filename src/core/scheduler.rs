/// Cooperative timer seam between the plugin and its host.
///
/// The host owns the event loop. The plugin asks it for one-shot or
/// repeating timers tagged with a [`Task`]; when a timer fires the host
/// hands `(TimerId, Task)` back to the plugin's dispatch method.
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("scheduler is shut down")]
    ShutDown,
    #[error("scheduler rejected timer: {0}")]
    Rejected(String),
}

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Work carried by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Periodic clock refresh.
    ClockTick,
    /// Next frame of the running reveal.
    RevealStep,
    /// Dwell elapsed, hand the slot back to the clock.
    ReturnToClock,
}

pub trait Scheduler {
    fn schedule_once(&mut self, delay_ms: u64, task: Task) -> Result<TimerId, ScheduleError>;

    fn schedule_repeating(&mut self, interval_ms: u64, task: Task)
        -> Result<TimerId, ScheduleError>;

    /// Cancel a timer. Unknown or already-fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub task: Task,
    pub at_ms: u64,
}

#[derive(Debug, Clone)]
struct Pending {
    id: TimerId,
    task: Task,
    repeat_ms: Option<u64>,
}

/// Deterministic virtual-time scheduler.
///
/// Timers are ordered by due time, then by scheduling order. Time only
/// moves when the owner pops due timers or advances it explicitly.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now_ms: u64,
    next_id: u64,
    seq: u64,
    queue: BTreeMap<(u64, u64), Pending>,
    shut_down: bool,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.values().any(|p| p.id == id)
    }

    /// Due time of the earliest pending timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the
    /// clock to its due time. Repeating timers are re-queued.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired> {
        let (&(due, seq), _) = self.queue.iter().next()?;
        if due > until_ms {
            return None;
        }
        let pending = self.queue.remove(&(due, seq))?;
        self.now_ms = self.now_ms.max(due);

        if let Some(interval) = pending.repeat_ms {
            let key = (due.saturating_add(interval), self.bump_seq());
            self.queue.insert(key, pending.clone());
        }

        Some(Fired {
            id: pending.id,
            task: pending.task,
            at_ms: due,
        })
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Refuse all further scheduling and drop pending timers.
    pub fn shut_down(&mut self) {
        self.shut_down = true;
        self.queue.clear();
    }

    fn bump_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn insert(
        &mut self,
        delay_ms: u64,
        task: Task,
        repeat_ms: Option<u64>,
    ) -> Result<TimerId, ScheduleError> {
        if self.shut_down {
            return Err(ScheduleError::ShutDown);
        }
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let key = (self.now_ms.saturating_add(delay_ms), self.bump_seq());
        self.queue.insert(key, Pending { id, task, repeat_ms });
        Ok(id)
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_once(&mut self, delay_ms: u64, task: Task) -> Result<TimerId, ScheduleError> {
        self.insert(delay_ms, task, None)
    }

    fn schedule_repeating(
        &mut self,
        interval_ms: u64,
        task: Task,
    ) -> Result<TimerId, ScheduleError> {
        if interval_ms == 0 {
            return Err(ScheduleError::Rejected(
                "repeating interval must be positive".to_string(),
            ));
        }
        self.insert(interval_ms, task, Some(interval_ms))
    }

    fn cancel(&mut self, id: TimerId) {
        self.queue.retain(|_, p| p.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut s = VirtualScheduler::new();
        let late = s.schedule_once(50, Task::ReturnToClock).unwrap();
        let early = s.schedule_once(10, Task::RevealStep).unwrap();

        let first = s.pop_due(100).unwrap();
        assert_eq!(first.id, early);
        assert_eq!(first.at_ms, 10);
        assert_eq!(s.now_ms(), 10);

        let second = s.pop_due(100).unwrap();
        assert_eq!(second.id, late);
        assert!(s.pop_due(100).is_none());
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut s = VirtualScheduler::new();
        let a = s.schedule_once(10, Task::RevealStep).unwrap();
        let b = s.schedule_once(10, Task::ClockTick).unwrap();
        assert_eq!(s.pop_due(10).unwrap().id, a);
        assert_eq!(s.pop_due(10).unwrap().id, b);
    }

    #[test]
    fn not_due_yet_stays_queued() {
        let mut s = VirtualScheduler::new();
        s.schedule_once(10, Task::RevealStep).unwrap();
        assert!(s.pop_due(9).is_none());
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn repeating_requeues() {
        let mut s = VirtualScheduler::new();
        let id = s.schedule_repeating(100, Task::ClockTick).unwrap();
        let fired: Vec<u64> = std::iter::from_fn(|| s.pop_due(350)).map(|f| f.at_ms).collect();
        assert_eq!(fired, vec![100, 200, 300]);
        assert!(s.is_pending(id));
        assert_eq!(s.next_due_ms(), Some(400));
    }

    #[test]
    fn cancel_removes_timer() {
        let mut s = VirtualScheduler::new();
        let id = s.schedule_repeating(100, Task::ClockTick).unwrap();
        s.cancel(id);
        assert!(s.pop_due(1_000).is_none());
        // cancelling twice is harmless
        s.cancel(id);
    }

    #[test]
    fn delays_are_relative_to_now() {
        let mut s = VirtualScheduler::new();
        s.set_now(500);
        s.schedule_once(20, Task::RevealStep).unwrap();
        assert_eq!(s.next_due_ms(), Some(520));
    }

    #[test]
    fn far_future_delay_saturates() {
        let mut s = VirtualScheduler::new();
        s.set_now(1_000);
        let id = s.schedule_once(u64::MAX, Task::ReturnToClock).unwrap();
        assert_eq!(s.next_due_ms(), Some(u64::MAX));
        assert_eq!(s.pop_due(u64::MAX).unwrap().id, id);

        let tick = s.schedule_repeating(u64::MAX, Task::ClockTick).unwrap();
        assert_eq!(s.pop_due(u64::MAX).unwrap().id, tick);
        assert!(s.is_pending(tick));
    }

    #[test]
    fn shut_down_rejects_new_timers() {
        let mut s = VirtualScheduler::new();
        s.schedule_once(20, Task::RevealStep).unwrap();
        s.shut_down();
        assert_eq!(s.pending(), 0);
        assert_eq!(
            s.schedule_once(20, Task::RevealStep),
            Err(ScheduleError::ShutDown)
        );
    }

    #[test]
    fn zero_interval_repeating_rejected() {
        let mut s = VirtualScheduler::new();
        assert!(matches!(
            s.schedule_repeating(0, Task::ClockTick),
            Err(ScheduleError::Rejected(_))
        ));
    }
}
