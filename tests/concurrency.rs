//! Producer/consumer tests on real OS threads.
//!
//! Producers publish self-describing states (every field derived from one
//! sequence number) so any mix of two publishes is detectable on the reader
//! side.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use padstate::controller::{Axis, Buttons, GameController, State};

const PRODUCERS: u64 = 4;
const PER_PRODUCER: u64 = 2_000;
const CONSUMERS: usize = 3;

fn encode(producer: u64, seq: u64) -> State {
    let tag = producer * 1_000_000 + seq;
    let mut state = State::default().stamped(tag);
    state.buttons = Buttons::from_bits_retain((tag & 0xFFFF) as u32);
    for axis in Axis::ALL {
        state = state.with_axis(axis, (tag % 251) as i32 + axis.index() as i32);
    }
    state
}

fn assert_consistent(state: &State) {
    if *state == State::default() {
        return;
    }
    let tag = state.time;
    assert_eq!(state.buttons.bits(), (tag & 0xFFFF) as u32, "torn buttons in {state:?}");
    for axis in Axis::ALL {
        assert_eq!(
            state.axis(axis),
            (tag % 251) as i32 + axis.index() as i32,
            "torn axis {axis:?} in {state:?}"
        );
    }
}

#[test]
fn test_concurrent_publish_and_drain_never_tears() {
    let pad = Arc::new(GameController::new(16));
    let start = Arc::new(Barrier::new(PRODUCERS as usize + CONSUMERS));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let pad = pad.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                for seq in 1..=PER_PRODUCER {
                    pad.add_state(encode(p, seq));
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|c| {
            let pad = pad.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                let mut seen = Vec::new();
                for _ in 0..2_000 {
                    if c == 0 {
                        assert_consistent(&pad.read_state().state);
                    }
                    let batch = pad.read_states(5);
                    for state in &batch.states {
                        assert_consistent(state);
                    }
                    seen.extend(batch.states);
                }
                seen
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut delivered = HashSet::new();
    for consumer in consumers {
        let seen = consumer.join().unwrap();

        // one consumer's view of each producer is in publish order
        for p in 0..PRODUCERS {
            let seqs: Vec<u64> = seen
                .iter()
                .filter(|s| **s != State::default() && s.time / 1_000_000 == p)
                .map(|s| s.time % 1_000_000)
                .collect();
            assert!(seqs.windows(2).all(|w| w[0] < w[1]), "reordered: {seqs:?}");
        }

        for state in seen.into_iter().filter(|s| *s != State::default()) {
            // shared delivered marks: no state reaches two consumers
            assert!(delivered.insert(state.time), "duplicate delivery of {}", state.time);
        }
    }

    assert_eq!(pad.read_state().state.time % 1_000_000, PER_PRODUCER);
}

#[test]
fn test_concurrent_ingestion_keeps_every_edge() {
    let pad = Arc::new(GameController::new(4096));
    let buttons = [Buttons::CROSS, Buttons::CIRCLE, Buttons::SQUARE, Buttons::TRIANGLE];

    let handles: Vec<_> = buttons
        .into_iter()
        .map(|button| {
            let pad = pad.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    pad.on_button_edge(button, i % 2 == 0);
                }
                // finish pressed
                pad.on_button_edge(button, true);
            })
        })
        .collect();
    let trigger = {
        let pad = pad.clone();
        thread::spawn(move || {
            for v in 0..=255 {
                pad.on_axis_sample(Axis::TriggerRight, v);
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    trigger.join().unwrap();

    let last = pad.read_state().state;
    assert_eq!(
        last.buttons,
        Buttons::CROSS | Buttons::CIRCLE | Buttons::SQUARE | Buttons::TRIANGLE | Buttons::R2
    );
    assert_eq!(last.axis(Axis::TriggerRight), 255);

    assert_eq!(pad.read_states(usize::MAX).states.len(), 4 * 501 + 256);
}
