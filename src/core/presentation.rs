/// Presentation state machine: decides which driver owns the display slot.
///
/// `Idle` belongs to the clock, `Animating` to the reveal, and
/// `ShowingResult` holds the final name with both drivers locked out until
/// the dwell timer hands the slot back to the clock. The machine also
/// owns the ids of every timer it has asked for, so a fired timer can be
/// checked against the live one and stale callbacks dropped.
use thiserror::Error;

use crate::core::scheduler::{ScheduleError, Scheduler, Task, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationState {
    Idle,
    Animating,
    ShowingResult,
}

#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PresentationState,
        to: PresentationState,
    },
    #[error("scheduling failed: {0}")]
    Schedule(#[from] ScheduleError),
}

#[derive(Debug)]
pub struct PresentationMachine {
    state: PresentationState,
    clock_timer: Option<TimerId>,
    step_timer: Option<TimerId>,
    dwell_timer: Option<TimerId>,
}

impl Default for PresentationMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationMachine {
    pub fn new() -> Self {
        Self {
            state: PresentationState::Idle,
            clock_timer: None,
            step_timer: None,
            dwell_timer: None,
        }
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    /// The clock may write only while idle.
    pub fn clock_may_write(&self) -> bool {
        self.state == PresentationState::Idle
    }

    pub fn clock_armed(&self) -> bool {
        self.clock_timer.is_some()
    }

    /// Start the repeating clock timer if it is not already running.
    pub fn arm_clock<S: Scheduler>(
        &mut self,
        scheduler: &mut S,
        interval_ms: u64,
    ) -> Result<(), ScheduleError> {
        if self.clock_timer.is_none() {
            self.clock_timer = Some(scheduler.schedule_repeating(interval_ms, Task::ClockTick)?);
        }
        Ok(())
    }

    fn suspend_clock<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(id) = self.clock_timer.take() {
            scheduler.cancel(id);
        }
    }

    fn cancel_reveal_timers<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(id) = self.step_timer.take() {
            scheduler.cancel(id);
        }
        if let Some(id) = self.dwell_timer.take() {
            scheduler.cancel(id);
        }
    }

    /// Enter `Animating`. Returns `false` without side effects when a
    /// reveal is already animating; triggers are never queued.
    ///
    /// From `ShowingResult` the pending dwell is cancelled and a new
    /// reveal starts.
    pub fn begin_reveal<S: Scheduler>(&mut self, scheduler: &mut S) -> bool {
        if self.state == PresentationState::Animating {
            return false;
        }
        self.cancel_reveal_timers(scheduler);
        self.suspend_clock(scheduler);
        self.state = PresentationState::Animating;
        true
    }

    /// Schedule the next reveal frame, replacing any pending one.
    pub fn schedule_step<S: Scheduler>(
        &mut self,
        scheduler: &mut S,
        delay_ms: u64,
    ) -> Result<TimerId, PresentationError> {
        self.require(PresentationState::Animating, PresentationState::Animating)?;
        if let Some(id) = self.step_timer.take() {
            scheduler.cancel(id);
        }
        let id = scheduler.schedule_once(delay_ms, Task::RevealStep)?;
        self.step_timer = Some(id);
        Ok(id)
    }

    /// `Animating → ShowingResult`, arming the dwell timer.
    pub fn finish_reveal<S: Scheduler>(
        &mut self,
        scheduler: &mut S,
        dwell_ms: u64,
    ) -> Result<(), PresentationError> {
        self.require(PresentationState::Animating, PresentationState::ShowingResult)?;
        self.cancel_reveal_timers(scheduler);
        self.state = PresentationState::ShowingResult;
        self.dwell_timer = Some(scheduler.schedule_once(dwell_ms, Task::ReturnToClock)?);
        Ok(())
    }

    /// Any state → `Idle`. Cancels reveal timers and re-arms the clock.
    ///
    /// The state is `Idle` even if re-arming fails.
    pub fn return_to_idle<S: Scheduler>(
        &mut self,
        scheduler: &mut S,
        clock_interval_ms: u64,
    ) -> Result<(), ScheduleError> {
        self.cancel_reveal_timers(scheduler);
        self.state = PresentationState::Idle;
        self.arm_clock(scheduler, clock_interval_ms)
    }

    /// Cancel every outstanding timer and go idle without re-arming.
    pub fn cancel_all<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.cancel_reveal_timers(scheduler);
        self.suspend_clock(scheduler);
        self.state = PresentationState::Idle;
    }

    /// Accept a fired timer if it is the live one for its task.
    ///
    /// One-shot ids are released on acceptance. Stale ids return `false`.
    pub fn accept_fired(&mut self, id: TimerId, task: Task) -> bool {
        let slot = match task {
            Task::ClockTick => return self.clock_timer == Some(id),
            Task::RevealStep => &mut self.step_timer,
            Task::ReturnToClock => &mut self.dwell_timer,
        };
        if *slot == Some(id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn require(
        &self,
        expected: PresentationState,
        to: PresentationState,
    ) -> Result<(), PresentationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PresentationError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }
}
