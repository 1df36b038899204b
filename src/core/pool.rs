/// Weighted shuffle-bag sampler.
///
/// Each roster entry is expanded into as many pool slots as its tier
/// weight, the slots are shuffled, and draws walk the shuffled pool until
/// it runs out. An exhausted pool is rebuilt and reshuffled, so within one
/// generation a name comes up exactly as often as it has slots.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::schema::roster::Roster;

/// Outcome of a draw. The empty-roster case is a displayable value,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    Name(String),
    EmptyRoster,
}

impl Pick {
    pub fn name(&self) -> Option<&str> {
        match self {
            Pick::Name(name) => Some(name),
            Pick::EmptyRoster => None,
        }
    }

    pub fn is_empty_roster(&self) -> bool {
        matches!(self, Pick::EmptyRoster)
    }

    /// Text to display, using `sentinel` for the empty roster.
    pub fn display_text<'a>(&'a self, sentinel: &'a str) -> &'a str {
        self.name().unwrap_or(sentinel)
    }
}

/// Expand a roster into its shuffled pool.
///
/// If any entry is tier 5, only tier-5 entries enter the pool. When no
/// entry carries weight (all tier 1), every distinct name gets a single
/// slot so a non-empty roster never yields an empty pool.
pub fn build_pool(roster: &Roster, rng: &mut StdRng) -> Vec<String> {
    let has_absolute = roster.has_absolute();
    let mut pool = Vec::new();

    for entry in &roster.entries {
        if has_absolute && !entry.tier.is_absolute() {
            continue;
        }
        for _ in 0..entry.tier.weight() {
            pool.push(entry.name.clone());
        }
    }

    if pool.is_empty() {
        let mut seen = FxHashSet::default();
        for name in roster.names() {
            if seen.insert(name) {
                pool.push(name.to_string());
            }
        }
    }

    pool.shuffle(rng);
    pool
}

/// Pool, cursor and pick history for one plugin instance.
#[derive(Debug, Clone)]
pub struct WeightedPool {
    roster: Roster,
    pool: Vec<String>,
    cursor: usize,
    generation: u64,
    history: VecDeque<String>,
    history_capacity: usize,
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

impl WeightedPool {
    pub fn new(roster: Roster, history_capacity: usize, rng: &mut StdRng) -> Self {
        let mut pool = Self {
            roster,
            pool: Vec::new(),
            cursor: 0,
            generation: 0,
            history: VecDeque::new(),
            history_capacity: history_capacity.max(1),
        };
        pool.rebuild(rng);
        pool
    }

    /// Replace the roster. The old pool generation is discarded at once.
    pub fn reload(&mut self, roster: Roster, rng: &mut StdRng) {
        self.roster = roster;
        self.rebuild(rng);
    }

    /// Rebuild and reshuffle the pool from the current roster.
    pub fn rebuild(&mut self, rng: &mut StdRng) {
        self.pool = build_pool(&self.roster, rng);
        self.cursor = 0;
        self.generation += 1;
    }

    /// Take the next name from the pool, reshuffling when exhausted,
    /// and record it in the history.
    pub fn draw_next(&mut self, rng: &mut StdRng) -> Pick {
        if self.pool.is_empty() {
            return Pick::EmptyRoster;
        }

        if self.cursor >= self.pool.len() {
            self.rebuild(rng);
        }

        let name = self.pool[self.cursor].clone();
        self.cursor += 1;

        self.history.push_back(name.clone());
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }

        Pick::Name(name)
    }

    /// A uniformly random slot of the current pool. Does not move the
    /// cursor or touch the history.
    pub fn sample_transient(&self, rng: &mut StdRng) -> Pick {
        match self.pool.choose(rng) {
            Some(name) => Pick::Name(name.clone()),
            None => Pick::EmptyRoster,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Slots left before the next reshuffle.
    pub fn remaining(&self) -> usize {
        self.pool.len() - self.cursor
    }

    /// Incremented on every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Oldest first.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.history.iter().map(String::as_str)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop the newest history entry if it is `name`. Used when a pick
    /// is abandoned before it was shown.
    pub fn retract_last(&mut self, name: &str) -> bool {
        if self.history.back().is_some_and(|last| last == name) {
            self.history.pop_back();
            true
        } else {
            false
        }
    }
}
