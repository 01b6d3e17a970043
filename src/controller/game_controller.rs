//! Game Controller - the shared record of one logical pad
//!
//! Producers (the device event thread) call [`GameController::on_button_edge`]
//! and [`GameController::on_axis_sample`]; consumers (the emulated frame loop)
//! call [`GameController::read_state`] and [`GameController::read_states`].
//!
//! # Locking
//!
//! The history window, the last published state and the connection fields
//! form one unit guarded by a single mutex. Every operation holds it for its
//! whole, short duration. The clock is read before taking the lock and all
//! logging happens after it is released. The output device has its own lock
//! and is never held together with the state lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::debounce::{self, TriggerThresholds};
use super::device::{scale_motor, Clock, MonotonicClock, PadDevice, PadOpener};
use super::history::{StateHistory, DEFAULT_CAPACITY};
use super::state::{Axis, Buttons, State};

/// Light bar colour set whenever a device is bound
pub const DEFAULT_LIGHT_BAR: (u8, u8, u8) = (0, 0, 255);

/// Latest state plus connection info, as returned by [`GameController::read_state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadSnapshot {
    pub state: State,
    pub connected: bool,
    pub connected_count: u32,
}

/// Drained backlog plus connection info, as returned by [`GameController::read_states`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadStates {
    pub states: Vec<State>,
    pub connected: bool,
    pub connected_count: u32,
}

#[derive(Debug)]
struct Shared {
    history: StateHistory,
    connected: bool,
    connected_count: u32,
}

pub struct GameController {
    shared: Mutex<Shared>,
    device: Mutex<Option<Box<dyn PadDevice>>>,
    clock: Arc<dyn Clock>,
    thresholds: TriggerThresholds,
    light_bar: (u8, u8, u8),
}

impl std::fmt::Debug for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameController")
            .field("shared", &self.shared)
            .field("thresholds", &self.thresholds)
            .field("light_bar", &self.light_bar)
            .finish_non_exhaustive()
    }
}

impl Default for GameController {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl GameController {
    /// Controller with the default thresholds and a [`MonotonicClock`].
    ///
    /// Starts out connected with one pad so the frame loop always has a state
    /// to read, even before the device thread reports anything.
    pub fn new(capacity: usize) -> Self {
        Self::with_parts(
            capacity,
            TriggerThresholds::default(),
            Arc::new(MonotonicClock::new()),
        )
    }

    pub fn with_parts(capacity: usize, thresholds: TriggerThresholds, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Mutex::new(Shared {
                history: StateHistory::new(capacity),
                connected: true,
                connected_count: 1,
            }),
            device: Mutex::new(None),
            clock,
            thresholds,
            light_bar: DEFAULT_LIGHT_BAR,
        }
    }

    /// Overrides the colour sent to the light bar when a device is bound
    pub fn with_light_bar(mut self, rgb: (u8, u8, u8)) -> Self {
        self.light_bar = rgb;
        self
    }

    pub fn thresholds(&self) -> TriggerThresholds {
        self.thresholds
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().history.capacity()
    }

    /// Latest published state with the current connection fields
    pub fn read_state(&self) -> PadSnapshot {
        let shared = self.shared.lock();
        PadSnapshot {
            state: shared.history.peek(),
            connected: shared.connected,
            connected_count: shared.connected_count,
        }
    }

    /// Drains up to `max` states not yet returned by a previous call.
    ///
    /// Returns nothing while disconnected. With an empty window the last known
    /// state is returned once per call.
    pub fn read_states(&self, max: usize) -> PadStates {
        let mut shared = self.shared.lock();
        let states = if shared.connected {
            shared.history.drain(max)
        } else {
            Vec::new()
        };
        PadStates {
            states,
            connected: shared.connected,
            connected_count: shared.connected_count,
        }
    }

    /// Publishes a fully formed state. The ingestion calls below are the usual
    /// writers; this is the raw entry point.
    pub fn add_state(&self, state: State) {
        let evicted = self.shared.lock().history.publish(state);
        if evicted {
            trace!("State history full, dropped oldest entry");
        }
    }

    /// Sets or clears one digital button
    pub fn on_button_edge(&self, button: Buttons, pressed: bool) {
        let now = self.clock.now_micros();
        let evicted = {
            let mut shared = self.shared.lock();
            let state = shared
                .history
                .peek()
                .stamped(now)
                .with_button(button, pressed);
            shared.history.publish(state)
        };

        trace!("Button {:?} {}", button, if pressed { "pressed" } else { "released" });
        if evicted {
            trace!("State history full, dropped oldest entry");
        }
    }

    /// Stores a raw axis sample; trigger axes also latch L2/R2.
    pub fn on_axis_sample(&self, axis: Axis, value: i32) {
        let now = self.clock.now_micros();
        let (before, after, evicted) = {
            let mut shared = self.shared.lock();
            let before = shared.history.peek();
            let after = debounce::apply_axis_sample(before.stamped(now), axis, value, self.thresholds);
            let evicted = shared.history.publish(after);
            (before, after, evicted)
        };

        if debounce::trigger_button(axis).is_some() {
            trace!("{:?} {}", axis, value);
        }
        debounce::trace_transition(axis, &before, &after);
        if evicted {
            trace!("State history full, dropped oldest entry");
        }
    }

    /// Updates device presence. The published input state is left alone.
    pub fn set_connected(&self, connected: bool, connected_count: u32) {
        {
            let mut shared = self.shared.lock();
            shared.connected = connected;
            shared.connected_count = connected_count;
        }
        debug!(
            "Connection changed: connected={}, count={}",
            connected, connected_count
        );
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// Forwards to the bound device; no-op without one.
    pub fn set_light(&self, r: u8, g: u8, b: u8) {
        if let Some(device) = self.device.lock().as_mut() {
            device.set_led(r, g, b);
        }
    }

    /// Forwards rumble, scaled from 0..=255 to the device's native range.
    ///
    /// Returns `true` when no device is bound.
    pub fn set_vibration(&self, small_motor: u8, large_motor: u8) -> bool {
        let accepted = match self.device.lock().as_mut() {
            Some(device) => device.rumble(scale_motor(small_motor), scale_motor(large_motor)),
            None => true,
        };
        if !accepted {
            warn!(
                "Device rejected vibration request ({}, {})",
                small_motor, large_motor
            );
        }
        accepted
    }

    /// Binds `device` as the output target and sets its light bar.
    pub fn bind_device(&self, device: Box<dyn PadDevice>) {
        *self.device.lock() = Some(device);
        info!("Output device bound");
        let (r, g, b) = self.light_bar;
        self.set_light(r, g, b);
    }

    /// Drops the bound device, returning it if there was one.
    pub fn unbind_device(&self) -> Option<Box<dyn PadDevice>> {
        let device = self.device.lock().take();
        if device.is_some() {
            info!("Output device unbound");
        }
        device
    }

    pub fn has_device(&self) -> bool {
        self.device.lock().is_some()
    }

    /// Re-opens a device if none is bound or the bound one went away, then
    /// re-sends the light bar colour.
    ///
    /// The device lock is held from the connected check through the open, so
    /// concurrent callers open at most one device between them. The opener
    /// must not call back into this controller.
    ///
    /// Returns whether a device is bound afterwards.
    pub fn try_open_device(&self, opener: &mut dyn PadOpener) -> bool {
        let bound = {
            let mut device = self.device.lock();
            let needs_open = match device.as_ref() {
                Some(current) => !current.is_connected(),
                None => true,
            };
            if needs_open {
                *device = opener.open_first();
            }
            device.is_some()
        };

        if !bound {
            debug!("No gamepad available to open");
        }
        let (r, g, b) = self.light_bar;
        self.set_light(r, g, b);
        bound
    }
}
