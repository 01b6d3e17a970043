//! Integration tests for the state history exposed through `GameController`.
//!
//! Covers the bounded window, at-most-once delivery, eviction of undelivered
//! states and the empty-window fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use padstate::controller::{Axis, Buttons, Clock, GameController, State, TriggerThresholds};
use rstest::rstest;

struct StepClock(AtomicU64);

impl Clock for StepClock {
    fn now_micros(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn controller(capacity: usize) -> GameController {
    GameController::with_parts(
        capacity,
        TriggerThresholds::default(),
        Arc::new(StepClock(AtomicU64::new(0))),
    )
}

fn times(states: &[State]) -> Vec<u64> {
    states.iter().map(|s| s.time).collect()
}

#[test]
fn test_frame_loop_drains_surviving_backlog() {
    let pad = controller(8);
    for i in 0..10 {
        pad.on_button_edge(Buttons::CROSS, i % 2 == 0);
    }

    let first = pad.read_states(5);
    assert!(first.connected);
    assert_eq!(first.connected_count, 1);
    // publishes 1 and 2 were evicted
    assert_eq!(times(&first.states), vec![3, 4, 5, 6, 7]);

    let second = pad.read_states(5);
    assert_eq!(times(&second.states), vec![8, 9, 10]);

    assert!(pad.read_states(5).states.is_empty());

    // the window still holds the delivered states
    assert_eq!(pad.read_state().state.time, 10);
}

#[rstest]
#[case(1, 0)]
#[case(1, 5)]
#[case(4, 0)]
#[case(4, 3)]
#[case(64, 100)]
fn test_window_is_bounded(#[case] capacity: usize, #[case] extra: usize) {
    let pad = controller(capacity);
    let total = capacity + extra;
    let mut last = State::default();
    for t in 1..=total as u64 {
        last = State::default().stamped(t).with_axis(Axis::LeftX, (t % 256) as i32);
        pad.add_state(last);
    }

    assert_eq!(pad.read_state().state, last);
    let drained = pad.read_states(usize::MAX);
    assert_eq!(drained.states.len(), capacity);
    assert_eq!(drained.states.last(), Some(&last));
}

#[test]
fn test_drain_without_overwrite_is_exactly_once() {
    let pad = controller(16);
    let published: Vec<State> = (1..=6)
        .map(|t| State::default().stamped(t).with_button(Buttons::SQUARE, t % 2 == 1))
        .collect();
    for state in &published {
        pad.add_state(*state);
    }

    assert_eq!(pad.read_states(16).states, published);
    assert!(pad.read_states(16).states.is_empty());
}

#[test]
fn test_evicted_states_never_reappear() {
    let pad = controller(4);
    for t in 1..=4 {
        pad.add_state(State::default().stamped(t));
    }
    assert_eq!(times(&pad.read_states(2).states), vec![1, 2]);

    // overwrite 1, 2 (delivered) and 3, 4 (still pending)
    for t in 5..=8 {
        pad.add_state(State::default().stamped(t));
    }

    assert_eq!(times(&pad.read_states(10).states), vec![5, 6, 7, 8]);
}

#[test]
fn test_empty_window_returns_default_state() {
    let pad = controller(8);
    assert_eq!(pad.read_state().state, State::default());

    let drained = pad.read_states(4);
    assert_eq!(drained.states, vec![State::default()]);
}

#[test]
fn test_empty_window_fallback_ignores_max() {
    let pad = controller(8);
    assert_eq!(pad.read_states(0).states, vec![State::default()]);

    pad.on_button_edge(Buttons::CROSS, true);
    assert!(pad.read_states(0).states.is_empty());
    assert_eq!(pad.read_states(1).states.len(), 1);
}

#[test]
fn test_disconnect_hides_backlog_until_reconnect() {
    let pad = controller(8);
    pad.on_button_edge(Buttons::OPTIONS, true);
    pad.set_connected(false, 0);

    let snapshot = pad.read_state();
    assert!(!snapshot.connected);
    assert!(snapshot.state.is_pressed(Buttons::OPTIONS));
    assert!(pad.read_states(8).states.is_empty());

    pad.set_connected(true, 2);
    let drained = pad.read_states(8);
    assert_eq!(drained.connected_count, 2);
    assert_eq!(drained.states.len(), 1);
}

#[test]
fn test_trigger_latch_through_controller() {
    let pad = controller(16);
    let samples = [0, 20, 32, 17, 15];
    for v in samples {
        pad.on_axis_sample(Axis::TriggerLeft, v);
    }

    let latched: Vec<bool> = pad
        .read_states(16)
        .states
        .iter()
        .map(|s| s.is_pressed(Buttons::L2))
        .collect();
    assert_eq!(latched, vec![false, false, true, true, false]);
}

#[test]
fn test_stick_samples_leave_buttons_alone() {
    let pad = controller(16);
    for v in [0, 20, 32, 17, 15] {
        pad.on_axis_sample(Axis::RightX, v);
    }

    let states = pad.read_states(16).states;
    assert!(states.iter().all(|s| s.buttons.is_empty()));
    let values: Vec<i32> = states.iter().map(|s| s.axis(Axis::RightX)).collect();
    assert_eq!(values, vec![0, 20, 32, 17, 15]);
}
