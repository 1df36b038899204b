/// Reveal animator: decelerating run of transient names ending on the pick.
use rand::rngs::StdRng;

use crate::core::pool::{Pick, WeightedPool};
use crate::schema::config::RevealConfig;

/// What a single animation tick produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealFrame {
    /// Show `pick` with the in-progress title, then wait `next_delay_ms`.
    Transient { pick: Pick, next_delay_ms: u64 },
    /// The reveal is over; show the pick that started it.
    Final(Pick),
}

/// Frame counter and final pick for the running reveal.
#[derive(Debug, Clone)]
pub struct RevealAnimator {
    config: RevealConfig,
    steps: u32,
    final_pick: Option<Pick>,
}

impl RevealAnimator {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            steps: 0,
            final_pick: None,
        }
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// The pick the running reveal ends on.
    pub fn final_pick(&self) -> Option<&Pick> {
        self.final_pick.as_ref()
    }

    /// Arm a new reveal for `final_pick`, discarding any unfinished one.
    /// Returns the delay before the first tick.
    pub fn start(&mut self, final_pick: Pick) -> u64 {
        self.steps = 0;
        self.final_pick = Some(final_pick);
        self.config.initial_delay_ms
    }

    pub fn is_running(&self) -> bool {
        self.final_pick.is_some()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Advance one tick. Returns `None` if no reveal is running.
    pub fn tick(&mut self, pool: &WeightedPool, rng: &mut StdRng) -> Option<RevealFrame> {
        if self.final_pick.is_none() {
            return None;
        }

        if self.steps < self.config.max_steps {
            let pick = pool.sample_transient(rng);
            self.steps += 1;
            return Some(RevealFrame::Transient {
                pick,
                next_delay_ms: self.config.delay_after(self.steps),
            });
        }

        self.final_pick.take().map(RevealFrame::Final)
    }

    /// Drop the running reveal without finishing it.
    pub fn abort(&mut self) {
        self.final_pick = None;
        self.steps = 0;
    }
}
