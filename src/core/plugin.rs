/// The plugin instance: owns the pool, the reveal, the state machine and
/// the host collaborators, and routes fired timers to the right driver.
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::host::{
    DisplaySlot, LocalClock, Notifier, RecordingDisplay, RecordingNotifier, TimeSource,
};
use crate::core::pool::{Pick, WeightedPool};
use crate::core::presentation::{PresentationError, PresentationMachine, PresentationState};
use crate::core::reveal::{RevealAnimator, RevealFrame};
use crate::core::scheduler::{ScheduleError, Scheduler, Task, TimerId, VirtualScheduler};
use crate::schema::config::{ConfigError, PluginConfig};
use crate::schema::roster::Roster;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("scheduling failed: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Result of a selection trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A reveal is running towards this pick.
    Started(Pick),
    /// The roster is empty; the sentinel is showing.
    EmptyRoster,
    /// A reveal was already animating.
    Ignored,
    /// The reveal could not be scheduled and the slot went back to the clock.
    Recovered,
}

/// Builder for [`RollCallPlugin`].
pub struct RollCallPluginBuilder {
    config: PluginConfig,
    roster: Option<Roster>,
    roster_path: Option<PathBuf>,
    time_source: Option<Box<dyn TimeSource>>,
}

pub struct RollCallPlugin<S: Scheduler, D: DisplaySlot, N: Notifier> {
    config: PluginConfig,
    scheduler: S,
    display: D,
    notifier: N,
    time_source: Box<dyn TimeSource>,
    roster_path: Option<PathBuf>,
    rng: StdRng,
    pool: WeightedPool,
    animator: RevealAnimator,
    machine: PresentationMachine,
}

impl RollCallPluginBuilder {
    pub fn new() -> Self {
        Self {
            config: PluginConfig::default(),
            roster: None,
            roster_path: None,
            time_source: None,
        }
    }

    pub fn config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Provide the roster directly (no file backing).
    pub fn roster(mut self, roster: Roster) -> Self {
        self.roster = Some(roster);
        self
    }

    /// Back the roster with a file, read on build and on every `start`.
    pub fn roster_file(mut self, path: impl AsRef<Path>) -> Self {
        self.roster_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn time_source(mut self, source: impl TimeSource + 'static) -> Self {
        self.time_source = Some(Box::new(source));
        self
    }

    pub fn build<S, D, N>(
        self,
        scheduler: S,
        display: D,
        notifier: N,
    ) -> Result<RollCallPlugin<S, D, N>, PluginError>
    where
        S: Scheduler,
        D: DisplaySlot,
        N: Notifier,
    {
        self.config.validate()?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let roster = match (self.roster, &self.roster_path) {
            (Some(roster), _) => roster,
            (None, Some(path)) => Roster::load_or_default(path),
            (None, None) => Roster::default_roster(),
        };

        let pool = WeightedPool::new(roster, self.config.history_capacity, &mut rng);
        let animator = RevealAnimator::new(self.config.reveal.clone());

        Ok(RollCallPlugin {
            config: self.config,
            scheduler,
            display,
            notifier,
            time_source: self.time_source.unwrap_or_else(|| Box::new(LocalClock)),
            roster_path: self.roster_path,
            rng,
            pool,
            animator,
            machine: PresentationMachine::new(),
        })
    }
}

impl Default for RollCallPluginBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Plugin driven by virtual time with in-memory collaborators.
pub type HeadlessPlugin = RollCallPlugin<VirtualScheduler, RecordingDisplay, RecordingNotifier>;

impl HeadlessPlugin {
    /// Builder entry point. Hosts with their own collaborator types use
    /// [`RollCallPluginBuilder::new`] directly.
    pub fn builder() -> RollCallPluginBuilder {
        RollCallPluginBuilder::new()
    }
}

impl<S: Scheduler, D: DisplaySlot, N: Notifier> RollCallPlugin<S, D, N> {
    /// (Re)initialize: cancel every timer, reload the roster, show the
    /// clock and start the clock timer.
    pub fn start(&mut self) -> Result<(), ScheduleError> {
        self.machine.cancel_all(&mut self.scheduler);
        self.animator.abort();

        if let Some(path) = self.roster_path.clone() {
            let roster = Roster::load_or_default(&path);
            self.pool.reload(roster, &mut self.rng);
        } else {
            self.pool.rebuild(&mut self.rng);
        }

        self.register_widget();
        self.write_clock();
        self.machine
            .arm_clock(&mut self.scheduler, self.config.clock_interval_ms)?;

        log::info!(
            "roll call '{}' started: {} entries, {} pool slots",
            self.config.widget_code,
            self.pool.roster().len(),
            self.pool.pool().len()
        );
        Ok(())
    }

    /// Cancel every outstanding timer.
    pub fn shutdown(&mut self) {
        self.machine.cancel_all(&mut self.scheduler);
        self.animator.abort();
    }

    /// Draw a name and start revealing it.
    pub fn trigger(&mut self) -> TriggerOutcome {
        if self.machine.state() == PresentationState::Animating {
            log::debug!("selection ignored: reveal already running");
            return TriggerOutcome::Ignored;
        }

        let pick = self.pool.draw_next(&mut self.rng);
        self.machine.begin_reveal(&mut self.scheduler);

        if pick.is_empty_roster() {
            self.animator.abort();
            if let Err(e) = self
                .machine
                .finish_reveal(&mut self.scheduler, self.config.empty_roster_dwell_ms)
            {
                self.recover(e);
                return TriggerOutcome::Recovered;
            }
            let labels = &self.config.labels;
            self.display
                .set_content(&labels.error_title, &labels.empty_roster);
            log::warn!("selection on empty roster");
            return TriggerOutcome::EmptyRoster;
        }

        let delay = self.animator.start(pick.clone());
        if let Err(e) = self.machine.schedule_step(&mut self.scheduler, delay) {
            self.abandon(&pick, e);
            return TriggerOutcome::Recovered;
        }

        log::debug!("reveal started for {:?}", pick);
        TriggerOutcome::Started(pick)
    }

    /// Handle a fired timer. Stale timers are dropped.
    pub fn dispatch(&mut self, id: TimerId, task: Task) {
        if !self.machine.accept_fired(id, task) {
            log::debug!("dropping stale timer {:?} ({:?})", id, task);
            return;
        }
        match task {
            Task::ClockTick => {
                self.clock_tick();
            }
            Task::RevealStep => self.reveal_step(),
            Task::ReturnToClock => self.reset(),
        }
    }

    /// Clock driver. Writes the time only while idle; returns whether it
    /// wrote.
    pub fn clock_tick(&mut self) -> bool {
        if !self.machine.clock_may_write() {
            return false;
        }
        self.write_clock();
        true
    }

    /// Host update hook: re-register the widget if the host lost it, and
    /// refresh the clock unless a reveal title is showing.
    pub fn refresh(&mut self) {
        let title = match self.display.title() {
            Some(title) => title,
            None => {
                log::warn!(
                    "widget '{}' missing, registering again",
                    self.config.widget_code
                );
                self.register_widget();
                self.display.title().unwrap_or_default()
            }
        };
        if !self.machine.clock_may_write() {
            return;
        }
        let showing_reveal = self.config.labels.is_reveal_title(&title);
        if !showing_reveal {
            self.write_clock();
        }
    }

    /// Any state → idle, with an immediate clock write.
    pub fn reset(&mut self) {
        self.animator.abort();
        if let Err(e) = self
            .machine
            .return_to_idle(&mut self.scheduler, self.config.clock_interval_ms)
        {
            log::error!("could not re-arm clock timer: {}", e);
        }
        self.write_clock();
    }

    /// Replace the roster. The next draw comes from a fresh pool.
    pub fn reload_roster(&mut self, roster: Roster) {
        log::info!("roster reloaded: {} entries", roster.len());
        self.pool.reload(roster, &mut self.rng);
    }

    /// Re-read the backing roster file, if any.
    pub fn reload_from_file(&mut self) {
        if let Some(path) = self.roster_path.clone() {
            self.reload_roster(Roster::load_or_default(&path));
        }
    }

    pub fn state(&self) -> PresentationState {
        self.machine.state()
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn pool(&self) -> &WeightedPool {
        &self.pool
    }

    pub fn roster_path(&self) -> Option<&Path> {
        self.roster_path.as_deref()
    }

    /// Recent picks, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.pool.history().map(str::to_string).collect()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn reveal_step(&mut self) {
        let target = self.animator.final_pick().cloned();
        match self.animator.tick(&self.pool, &mut self.rng) {
            Some(RevealFrame::Transient {
                pick,
                next_delay_ms,
            }) => {
                let labels = &self.config.labels;
                self.display.set_content(
                    &labels.in_progress_title,
                    pick.display_text(&labels.empty_roster),
                );
                if let Err(e) = self.machine.schedule_step(&mut self.scheduler, next_delay_ms) {
                    if let Some(target) = target {
                        self.abandon(&target, e);
                    } else {
                        self.recover(e);
                    }
                }
            }
            Some(RevealFrame::Final(pick)) => {
                if let Err(e) = self
                    .machine
                    .finish_reveal(&mut self.scheduler, self.config.result_dwell_ms)
                {
                    self.abandon(&pick, e);
                    return;
                }
                let labels = &self.config.labels;
                let name = pick.display_text(&labels.empty_roster);
                self.display.set_content(&labels.result_title, name);
                self.notifier.notify(
                    &labels.notification_title,
                    &labels.notification_subtitle,
                    &labels.notification_body_for(name),
                    self.config.notification_duration_ms,
                );
                log::info!("picked {}", name);
            }
            None => log::debug!("reveal step with no reveal running"),
        }
    }

    /// Recover from a reveal that failed before showing `pick`, taking
    /// the pick back out of the history.
    fn abandon(&mut self, pick: &Pick, error: PresentationError) {
        if let Some(name) = pick.name() {
            self.pool.retract_last(name);
        }
        self.recover(error);
    }

    fn register_widget(&mut self) {
        self.display.register(
            &self.config.widget_code,
            &self.config.widget_name,
            self.config.widget_width,
        );
    }

    fn recover(&mut self, error: PresentationError) {
        log::error!("reveal aborted, returning to clock: {}", error);
        self.reset();
    }

    fn write_clock(&mut self) {
        debug_assert!(self.machine.clock_may_write());
        let label = self.time_source.label();
        self.display
            .set_content(&self.config.labels.clock_title, &label);
    }
}

impl<D: DisplaySlot, N: Notifier> RollCallPlugin<VirtualScheduler, D, N> {
    /// Advance virtual time by `ms`, dispatching every timer that comes
    /// due. Returns the number of timers fired.
    pub fn advance(&mut self, ms: u64) -> usize {
        let target = self.scheduler.now_ms().saturating_add(ms);
        let mut fired = 0;
        while let Some(f) = self.scheduler.pop_due(target) {
            self.dispatch(f.id, f.task);
            fired += 1;
        }
        self.scheduler.set_now(target);
        fired
    }

    /// Fire timers one at a time until the slot is back to the clock or
    /// `limit_ms` of virtual time has passed. Returns whether it went idle.
    pub fn run_until_idle(&mut self, limit_ms: u64) -> bool {
        let deadline = self.scheduler.now_ms().saturating_add(limit_ms);
        while self.machine.state() != PresentationState::Idle {
            match self.scheduler.pop_due(deadline) {
                Some(f) => self.dispatch(f.id, f.task),
                None => return false,
            }
        }
        true
    }
}

impl<S: Scheduler, D: DisplaySlot, N: Notifier> Drop for RollCallPlugin<S, D, N> {
    fn drop(&mut self) {
        self.machine.cancel_all(&mut self.scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::FixedClock;
    use crate::schema::roster::{RosterEntry, Tier};

    fn plugin(entries: &[(&str, i64)]) -> HeadlessPlugin {
        let roster = Roster::new(
            entries
                .iter()
                .map(|(n, t)| RosterEntry::new(*n, Tier::clamped(*t)))
                .collect(),
        );
        let mut p = HeadlessPlugin::builder()
            .seed(42)
            .roster(roster)
            .time_source(FixedClock("08:00:00".to_string()))
            .build(
                VirtualScheduler::new(),
                RecordingDisplay::new(),
                RecordingNotifier::new(),
            )
            .unwrap();
        p.start().unwrap();
        p
    }

    #[test]
    fn start_registers_widget_and_shows_clock() {
        let p = plugin(&[("a", 3)]);
        let last = p.display().last().unwrap();
        assert_eq!(last.title, "Current time");
        assert_eq!(last.body, "08:00:00");
        let widget = p.display().widget().unwrap();
        assert_eq!(widget.code, "random_name_result");
        assert_eq!(widget.name, "Roll call result");
        assert_eq!(widget.width_px, 250);
        assert_eq!(p.state(), PresentationState::Idle);
    }

    #[test]
    fn clock_ticks_while_idle() {
        let mut p = plugin(&[("a", 3)]);
        let before = p.display().writes().len();
        assert_eq!(p.advance(3_000), 3);
        assert_eq!(p.display().writes().len(), before + 3);
    }

    #[test]
    fn trigger_while_animating_is_ignored() {
        let mut p = plugin(&[("a", 3), ("b", 3)]);
        assert!(matches!(p.trigger(), TriggerOutcome::Started(_)));
        assert_eq!(p.trigger(), TriggerOutcome::Ignored);
        assert_eq!(p.history().len(), 1);
    }

    #[test]
    fn clock_tick_blocked_outside_idle() {
        let mut p = plugin(&[("a", 3)]);
        p.trigger();
        let before = p.display().writes().len();
        assert!(!p.clock_tick());
        assert_eq!(p.display().writes().len(), before);
    }

    #[test]
    fn reveal_writes_frames_then_result() {
        let mut p = plugin(&[("a", 3), ("b", 4)]);
        let TriggerOutcome::Started(pick) = p.trigger() else {
            panic!("reveal did not start");
        };
        p.display_mut().clear();

        let total = p.config().reveal.total_duration_ms();
        p.advance(total);
        assert_eq!(p.state(), PresentationState::ShowingResult);

        let writes = p.display().writes();
        assert_eq!(writes.len(), 16);
        assert!(writes[..15].iter().all(|w| w.title == "Picking..."));
        assert_eq!(writes[15].title, "Roll call result");
        assert_eq!(writes[15].body, pick.name().unwrap());
        assert_eq!(p.notifier().sent().len(), 1);
    }

    #[test]
    fn result_dwell_returns_to_clock() {
        let mut p = plugin(&[("a", 3)]);
        p.trigger();
        p.advance(p.config().reveal.total_duration_ms());
        p.advance(9_999);
        assert_eq!(p.state(), PresentationState::ShowingResult);
        p.advance(1);
        assert_eq!(p.state(), PresentationState::Idle);
        assert_eq!(p.display().last().unwrap().title, "Current time");
    }

    #[test]
    fn empty_roster_shows_sentinel_and_recovers_quickly() {
        let mut p = plugin(&[]);
        assert_eq!(p.trigger(), TriggerOutcome::EmptyRoster);
        let last = p.display().last().unwrap();
        assert_eq!(last.title, "Error");
        assert_eq!(last.body, "Roster is empty");
        assert_eq!(p.state(), PresentationState::ShowingResult);

        p.advance(3_000);
        assert_eq!(p.state(), PresentationState::Idle);
        assert!(p.notifier().sent().is_empty());
    }

    #[test]
    fn retrigger_during_result_restarts_reveal() {
        let mut p = plugin(&[("a", 3), ("b", 3)]);
        p.trigger();
        p.advance(p.config().reveal.total_duration_ms());
        assert_eq!(p.state(), PresentationState::ShowingResult);
        assert!(matches!(p.trigger(), TriggerOutcome::Started(_)));
        assert_eq!(p.state(), PresentationState::Animating);
        // the old dwell is gone, only the new reveal step is pending
        assert_eq!(p.scheduler().pending(), 1);
    }

    #[test]
    fn schedule_failure_recovers_to_idle() {
        let mut p = plugin(&[("a", 3)]);
        p.scheduler_mut().shut_down();
        assert_eq!(p.trigger(), TriggerOutcome::Recovered);
        assert_eq!(p.state(), PresentationState::Idle);
        assert_eq!(p.display().last().unwrap().title, "Current time");
        assert!(p.history().is_empty());
    }

    #[test]
    fn refresh_reregisters_lost_widget() {
        let mut p = plugin(&[("a", 3)]);
        assert_eq!(p.display().registrations(), 1);
        p.refresh();
        assert_eq!(p.display().registrations(), 1);

        p.display_mut().unregister();
        p.refresh();
        assert_eq!(p.display().registrations(), 2);
        assert_eq!(p.display().width(), Some(250));
        assert_eq!(p.display().last().unwrap().title, "Current time");
    }

    #[test]
    fn refresh_skips_clock_when_reveal_title_showing() {
        let mut p = plugin(&[("a", 3)]);
        p.display_mut().set_content("Roll call result", "a");
        let before = p.display().writes().len();
        p.refresh();
        assert_eq!(p.display().writes().len(), before);

        p.display_mut().set_content("something else", "x");
        p.refresh();
        assert_eq!(p.display().last().unwrap().title, "Current time");
    }

    #[test]
    fn shutdown_cancels_timers() {
        let mut p = plugin(&[("a", 3)]);
        p.trigger();
        p.shutdown();
        assert_eq!(p.scheduler().pending(), 0);
        assert_eq!(p.state(), PresentationState::Idle);
    }

    #[test]
    fn restart_mid_reveal_resets_state() {
        let mut p = plugin(&[("a", 3)]);
        p.trigger();
        p.advance(200);
        p.start().unwrap();
        assert_eq!(p.state(), PresentationState::Idle);
        assert_eq!(p.scheduler().pending(), 1);
        assert_eq!(p.pool().cursor(), 0);
    }

    #[test]
    fn roster_file_is_read_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        std::fs::write(&path, "Zed,5\nYan,3\n").unwrap();

        let mut p = HeadlessPlugin::builder()
            .seed(1)
            .roster_file(&path)
            .build(
                VirtualScheduler::new(),
                RecordingDisplay::new(),
                RecordingNotifier::new(),
            )
            .unwrap();
        p.start().unwrap();
        assert!(p.pool().pool().iter().all(|n| n == "Zed"));

        std::fs::write(&path, "Yan,3\n").unwrap();
        p.reload_from_file();
        assert!(p.pool().pool().iter().all(|n| n == "Yan"));
    }
}
