//! Bounded history of published input states
//!
//! Fixed-capacity circular window of the most recent [`State`] values with a
//! per-slot delivered mark. The buffer itself is not synchronised; the owning
//! [`GameController`](super::game_controller::GameController) keeps it behind
//! its single lock.
//!
//! ```text
//!  first                      first + count
//!    │                              │
//!    ▼                              ▼
//!  [ s3 | s4 | s5 | s6 | s7 | s8 | -- | -- ]   (capacity 8, wraps modulo N)
//! ```
//!
//! Delivered marks give "at most once per new state" semantics to a single
//! logical draining consumer. Two consumers draining the same buffer split the
//! stream between them.

use super::state::State;

/// Capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    state: State,
    delivered: bool,
}

#[derive(Debug, Clone)]
pub struct StateHistory {
    slots: Vec<Slot>,
    first: usize,
    count: usize,
    last_state: State,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StateHistory {
    /// Creates an empty window holding at most `capacity` states.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Configuration validation rejects zero
    /// before it gets here.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "state history capacity must be non-zero");
        Self {
            slots: vec![Slot::default(); capacity],
            first: 0,
            count: 0,
            last_state: State::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of states currently in the window, delivered or not
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends `state`, evicting the oldest entry when the window is full.
    ///
    /// Returns `true` if an entry was evicted.
    pub fn publish(&mut self, state: State) -> bool {
        let capacity = self.capacity();
        let evicted = self.count >= capacity;
        if evicted {
            self.count = capacity - 1;
            self.first = (self.first + 1) % capacity;
        }

        let index = (self.first + self.count) % capacity;
        self.slots[index] = Slot {
            state,
            delivered: false,
        };
        self.last_state = state;
        self.count += 1;

        evicted
    }

    /// Most recently published state, or the default state if nothing has
    /// been published yet.
    pub fn peek(&self) -> State {
        if self.count == 0 {
            return self.last_state;
        }
        let last = (self.first + self.count - 1) % self.capacity();
        self.slots[last].state
    }

    /// Returns up to `max` undelivered states, oldest first, marking each
    /// one delivered.
    ///
    /// An empty window yields the last known state so a consumer always sees
    /// something; `max` only bounds the walk over a non-empty window.
    pub fn drain(&mut self, max: usize) -> Vec<State> {
        if self.count == 0 {
            return vec![self.last_state];
        }

        let capacity = self.capacity();
        let mut out = Vec::with_capacity(max.min(self.count));
        for i in 0..self.count {
            if out.len() >= max {
                break;
            }
            let slot = &mut self.slots[(self.first + i) % capacity];
            if !slot.delivered {
                slot.delivered = true;
                out.push(slot.state);
            }
        }
        out
    }

    /// Number of states in the window not yet returned by [`drain`](Self::drain)
    pub fn pending(&self) -> usize {
        let capacity = self.capacity();
        (0..self.count)
            .filter(|i| !self.slots[(self.first + i) % capacity].delivered)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::Buttons;

    fn state(time: u64) -> State {
        State::default().stamped(time)
    }

    fn times(states: &[State]) -> Vec<u64> {
        states.iter().map(|s| s.time).collect()
    }

    #[test]
    fn peek_before_publish_is_default() {
        let history = StateHistory::new(4);
        assert_eq!(history.peek(), State::default());
        assert!(history.is_empty());
    }

    #[test]
    fn drain_on_empty_window_returns_last_state() {
        let mut history = StateHistory::new(4);
        assert_eq!(history.drain(3), vec![State::default()]);
        // still empty, so the same fallback comes back again
        assert_eq!(history.drain(3), vec![State::default()]);
    }

    #[test]
    fn drain_with_zero_max_only_limits_a_filled_window() {
        let mut history = StateHistory::new(4);
        assert_eq!(history.drain(0), vec![State::default()]);
        history.publish(state(1));
        assert!(history.drain(0).is_empty());
        assert_eq!(history.pending(), 1);
    }

    #[test]
    fn window_stays_bounded() {
        let mut history = StateHistory::new(4);
        for t in 1..=10 {
            history.publish(state(t));
        }
        assert_eq!(history.len(), 4);
        assert_eq!(history.peek().time, 10);
    }

    #[test]
    fn publish_reports_eviction() {
        let mut history = StateHistory::new(2);
        assert!(!history.publish(state(1)));
        assert!(!history.publish(state(2)));
        assert!(history.publish(state(3)));
    }

    #[test]
    fn drain_delivers_each_state_once() {
        let mut history = StateHistory::new(8);
        for t in 1..=5 {
            history.publish(state(t));
        }
        assert_eq!(times(&history.drain(8)), vec![1, 2, 3, 4, 5]);
        assert!(history.drain(8).is_empty());
        // delivered slots stay in the window
        assert_eq!(history.len(), 5);
        assert_eq!(history.peek().time, 5);
    }

    #[test]
    fn drain_respects_max_and_resumes() {
        let mut history = StateHistory::new(8);
        for t in 1..=6 {
            history.publish(state(t));
        }
        assert_eq!(times(&history.drain(4)), vec![1, 2, 3, 4]);
        assert_eq!(times(&history.drain(4)), vec![5, 6]);
    }

    #[test]
    fn evicted_undelivered_states_are_lost() {
        let mut history = StateHistory::new(3);
        history.publish(state(1));
        history.publish(state(2));
        assert_eq!(times(&history.drain(1)), vec![1]);

        history.publish(state(3));
        history.publish(state(4));
        history.publish(state(5));

        // 2 was evicted before it was drained
        assert_eq!(times(&history.drain(10)), vec![3, 4, 5]);
    }

    #[test]
    fn rewritten_slot_is_undelivered_again() {
        let mut history = StateHistory::new(2);
        history.publish(state(1));
        history.publish(state(2));
        assert_eq!(history.drain(2).len(), 2);
        assert_eq!(history.pending(), 0);

        history.publish(state(3));
        assert_eq!(history.pending(), 1);
        assert_eq!(times(&history.drain(2)), vec![3]);
    }

    #[test]
    fn peek_tracks_latest_publish() {
        let mut history = StateHistory::new(1);
        let pressed = state(7).with_button(Buttons::SQUARE, true);
        history.publish(state(6));
        history.publish(pressed);
        assert_eq!(history.peek(), pressed);
        assert_eq!(history.len(), 1);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_capacity_is_rejected() {
        let _ = StateHistory::new(0);
    }
}
