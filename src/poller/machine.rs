//! State machine behind [`Poller`](super::Poller).
//!
//! The machine owns no tasks or timers; it only decides which transitions are
//! legal and hands out [`Generation`] tags. The scheduler captures the tag when
//! it issues a fetch and asks the machine before applying anything, so results
//! from a cancelled cycle are dropped instead of delivered.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    AwaitingDelay,
    /// Number of outstanding pause holders, always at least one.
    Paused(u32),
}

/// Outcome of releasing one pause holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Other holders remain; polling stays suspended.
    Pending(u32),
    /// Last holder released; the caller should restart polling.
    Ready,
    /// Nothing was paused. The counter is left at zero.
    Unbalanced,
}

#[derive(Debug)]
pub struct PollMachine {
    state: PollState,
    generation: Generation,
}

impl PollMachine {
    pub fn new() -> Self {
        Self {
            state: PollState::Idle,
            generation: Generation(0),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn pause_count(&self) -> u32 {
        match self.state {
            PollState::Paused(n) => n,
            _ => 0,
        }
    }

    /// True while `generation` still owns the active cycle.
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
            && matches!(self.state, PollState::Fetching | PollState::AwaitingDelay)
    }

    fn invalidate(&mut self) {
        self.generation = Generation(self.generation.0 + 1);
    }

    /// Begins a new cycle chain, cancelling any previous one. Returns `None`
    /// while paused; the caller keeps the request for the eventual resume.
    pub fn start(&mut self) -> Option<Generation> {
        if let PollState::Paused(_) = self.state {
            return None;
        }
        self.invalidate();
        self.state = PollState::Fetching;
        Some(self.generation)
    }

    /// Cancels the active cycle. A paused machine stays paused.
    pub fn release(&mut self) {
        self.invalidate();
        if !matches!(self.state, PollState::Paused(_)) {
            self.state = PollState::Idle;
        }
    }

    pub fn fetch_resolved(&mut self, generation: Generation) -> bool {
        self.fetch_settled(generation)
    }

    pub fn fetch_rejected(&mut self, generation: Generation) -> bool {
        self.fetch_settled(generation)
    }

    fn fetch_settled(&mut self, generation: Generation) -> bool {
        if generation != self.generation || self.state != PollState::Fetching {
            return false;
        }
        self.state = PollState::AwaitingDelay;
        true
    }

    pub fn timer_fired(&mut self, generation: Generation) -> bool {
        if generation != self.generation || self.state != PollState::AwaitingDelay {
            return false;
        }
        self.state = PollState::Fetching;
        true
    }

    /// Adds a pause holder. The first holder cancels the active cycle.
    pub fn pause_acquired(&mut self) -> u32 {
        let count = match self.state {
            PollState::Paused(n) => n.saturating_add(1),
            _ => {
                self.invalidate();
                1
            }
        };
        self.state = PollState::Paused(count);
        count
    }

    pub fn pause_released(&mut self) -> Resume {
        match self.state {
            PollState::Paused(1) => {
                self.state = PollState::Idle;
                Resume::Ready
            }
            PollState::Paused(n) => {
                self.state = PollState::Paused(n - 1);
                Resume::Pending(n - 1)
            }
            _ => Resume::Unbalanced,
        }
    }
}

impl Default for PollMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut machine = PollMachine::new();
        assert_eq!(machine.state(), PollState::Idle);

        let generation = machine.start().unwrap();
        assert_eq!(machine.state(), PollState::Fetching);
        assert!(machine.is_current(generation));

        assert!(machine.fetch_resolved(generation));
        assert_eq!(machine.state(), PollState::AwaitingDelay);

        assert!(machine.timer_fired(generation));
        assert_eq!(machine.state(), PollState::Fetching);

        assert!(machine.fetch_rejected(generation));
        assert_eq!(machine.state(), PollState::AwaitingDelay);
    }

    #[test]
    fn test_restart_invalidates_previous_generation() {
        let mut machine = PollMachine::new();
        let first = machine.start().unwrap();
        let second = machine.start().unwrap();

        assert!(second > first);
        assert!(!machine.fetch_resolved(first));
        assert!(machine.fetch_resolved(second));
    }

    #[test]
    fn test_release_drops_in_flight_result() {
        let mut machine = PollMachine::new();
        let generation = machine.start().unwrap();

        machine.release();
        assert_eq!(machine.state(), PollState::Idle);
        assert!(!machine.is_current(generation));
        assert!(!machine.fetch_resolved(generation));
        assert!(!machine.fetch_rejected(generation));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut machine = PollMachine::new();
        machine.release();
        machine.release();
        assert_eq!(machine.state(), PollState::Idle);
    }

    #[test]
    fn test_timer_ignored_after_release() {
        let mut machine = PollMachine::new();
        let generation = machine.start().unwrap();
        assert!(machine.fetch_resolved(generation));

        machine.release();
        assert!(!machine.timer_fired(generation));
        assert_eq!(machine.state(), PollState::Idle);
    }

    #[test]
    fn test_duplicate_settlement_rejected() {
        let mut machine = PollMachine::new();
        let generation = machine.start().unwrap();
        assert!(machine.fetch_resolved(generation));
        assert!(!machine.fetch_rejected(generation));
    }

    #[test]
    fn test_pause_cancels_and_blocks_start() {
        let mut machine = PollMachine::new();
        let generation = machine.start().unwrap();

        assert_eq!(machine.pause_acquired(), 1);
        assert!(!machine.fetch_resolved(generation));
        assert_eq!(machine.start(), None);
        assert_eq!(machine.state(), PollState::Paused(1));
    }

    #[test]
    fn test_nested_pause_resumes_at_zero() {
        let mut machine = PollMachine::new();
        machine.start();

        machine.pause_acquired();
        machine.pause_acquired();
        assert_eq!(machine.pause_count(), 2);

        assert_eq!(machine.pause_released(), Resume::Pending(1));
        assert_eq!(machine.start(), None);

        assert_eq!(machine.pause_released(), Resume::Ready);
        assert_eq!(machine.state(), PollState::Idle);
        assert!(machine.start().is_some());
    }

    #[test]
    fn test_unbalanced_resume_keeps_counter_at_zero() {
        let mut machine = PollMachine::new();
        assert_eq!(machine.pause_released(), Resume::Unbalanced);
        assert_eq!(machine.pause_count(), 0);
        assert_eq!(machine.state(), PollState::Idle);
    }

    #[test]
    fn test_release_while_paused_stays_paused() {
        let mut machine = PollMachine::new();
        machine.pause_acquired();
        machine.release();
        assert_eq!(machine.state(), PollState::Paused(1));
    }
}
