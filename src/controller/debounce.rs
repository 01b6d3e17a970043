//! Analog trigger to digital button derivation with hysteresis
//!
//! Trigger samples arrive on a 0..255 scale. The rest point is ideally zero
//! but drifts on worn pads, so the digital bit uses two thresholds: it turns
//! on above `on` and only turns off again below the lower `off`. Samples in
//! between leave the bit where it was. The latch state lives in the button
//! bitmask of the composite [`State`].

use super::state::{Axis, Buttons, State};
use tracing::trace;

/// 255 / 8
pub const DEFAULT_ON_THRESHOLD: i32 = 31;
/// 255 / 16 + 1
pub const DEFAULT_OFF_THRESHOLD: i32 = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("off threshold {off} must be below on threshold {on}")]
    Inverted { on: i32, off: i32 },

    #[error("threshold {0} is outside the 0..=255 trigger range")]
    OutOfRange(i32),
}

/// ON/OFF pair for the trigger latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerThresholds {
    on: i32,
    off: i32,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            on: DEFAULT_ON_THRESHOLD,
            off: DEFAULT_OFF_THRESHOLD,
        }
    }
}

impl TriggerThresholds {
    pub fn new(on: i32, off: i32) -> Result<Self, ThresholdError> {
        for value in [on, off] {
            if !(0..=255).contains(&value) {
                return Err(ThresholdError::OutOfRange(value));
            }
        }
        if off >= on {
            return Err(ThresholdError::Inverted { on, off });
        }
        Ok(Self { on, off })
    }

    pub fn on(&self) -> i32 {
        self.on
    }

    pub fn off(&self) -> i32 {
        self.off
    }
}

/// Digital bit derived from a trigger axis, if the axis is monitored
pub fn trigger_button(axis: Axis) -> Option<Buttons> {
    match axis {
        Axis::TriggerLeft => Some(Buttons::L2),
        Axis::TriggerRight => Some(Buttons::R2),
        _ => None,
    }
}

/// Applies one raw sample to `state`.
///
/// The analog slot is always overwritten. For trigger axes the matching
/// digital bit is latched according to `thresholds`.
pub fn apply_axis_sample(
    state: State,
    axis: Axis,
    value: i32,
    thresholds: TriggerThresholds,
) -> State {
    let state = state.with_axis(axis, value);

    let Some(button) = trigger_button(axis) else {
        return state;
    };

    if value > thresholds.on {
        state.with_button(button, true)
    } else if value < thresholds.off {
        state.with_button(button, false)
    } else {
        state
    }
}

/// Logs a latch flip between two states. Called outside the state lock.
pub(crate) fn trace_transition(axis: Axis, before: &State, after: &State) {
    if let Some(button) = trigger_button(axis) {
        let was = before.is_pressed(button);
        let now = after.is_pressed(button);
        if was != now {
            trace!(
                "{:?} {} at {}",
                button,
                if now { "ON" } else { "OFF" },
                after.axis(axis)
            );
        }
    }
}
