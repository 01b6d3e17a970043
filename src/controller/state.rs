//! Input state snapshot types
//!
//! A [`State`] is a plain value: every producer call derives a new one from the
//! previously published snapshot and hands it to the history buffer.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Digital button bitmask, laid out like the PS4 pad report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[repr(transparent)]
    pub struct Buttons: u32 {
        const L3 = 0x0000_0002;
        const R3 = 0x0000_0004;
        const OPTIONS = 0x0000_0008;
        const UP = 0x0000_0010;
        const RIGHT = 0x0000_0020;
        const DOWN = 0x0000_0040;
        const LEFT = 0x0000_0080;
        /// Derived from [`Axis::TriggerLeft`] by the debounce engine
        const L2 = 0x0000_0100;
        /// Derived from [`Axis::TriggerRight`] by the debounce engine
        const R2 = 0x0000_0200;
        const L1 = 0x0000_0400;
        const R1 = 0x0000_0800;
        const TRIANGLE = 0x0000_1000;
        const CIRCLE = 0x0000_2000;
        const CROSS = 0x0000_4000;
        const SQUARE = 0x0000_8000;
        const TOUCH_PAD = 0x0010_0000;
    }
}

/// Analog axes tracked per snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    TriggerLeft,
    TriggerRight,
}

impl Axis {
    /// Number of axis slots in a [`State`]
    pub const COUNT: usize = 6;

    pub const ALL: [Axis; Axis::COUNT] = [
        Axis::LeftX,
        Axis::LeftY,
        Axis::RightX,
        Axis::RightY,
        Axis::TriggerLeft,
        Axis::TriggerRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Value an untouched axis reports: sticks rest at the centre of the
    /// 0..255 range, triggers at zero.
    pub fn rest_value(self) -> i32 {
        match self {
            Axis::LeftX | Axis::LeftY | Axis::RightX | Axis::RightY => 128,
            Axis::TriggerLeft | Axis::TriggerRight => 0,
        }
    }
}

/// One timestamped recording of every monitored input signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Monotonic time in microseconds
    pub time: u64,
    pub buttons: Buttons,
    pub axes: [i32; Axis::COUNT],
}

impl Default for State {
    fn default() -> Self {
        Self {
            time: 0,
            buttons: Buttons::empty(),
            axes: Axis::ALL.map(Axis::rest_value),
        }
    }
}

impl State {
    pub fn axis(&self, axis: Axis) -> i32 {
        self.axes[axis.index()]
    }

    pub fn is_pressed(&self, button: Buttons) -> bool {
        self.buttons.contains(button)
    }

    /// Copy of this state stamped with a new time
    pub fn stamped(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Copy of this state with `button` set or cleared
    pub fn with_button(mut self, button: Buttons, pressed: bool) -> Self {
        self.buttons.set(button, pressed);
        self
    }

    /// Copy of this state with one analog slot replaced
    pub fn with_axis(mut self, axis: Axis, value: i32) -> Self {
        self.axes[axis.index()] = value;
        self
    }
}
