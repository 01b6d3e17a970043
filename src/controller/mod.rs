//! Controller subsystem: the shared record of one gamepad's input state
//!
//! 1. [`state`] - Snapshot value type and button/axis layout
//! 2. [`history`] - Bounded window of published snapshots
//! 3. [`debounce`] - Analog trigger to digital bit latch
//! 4. [`game_controller`] - Locked record producers write and consumers drain
//! 5. [`event_collector`] - gilrs device thread feeding the record
//! 6. [`controller_handle`] - Lifecycle of the collector thread
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► GameController ──► frame loop
//!             (gilrs)       (history + latch)   (read_state / read_states)
//! ```

pub mod controller_handle;
pub mod debounce;
pub mod device;
pub mod event_collector;
pub mod game_controller;
pub mod history;
pub mod state;

pub use controller_handle::{ControllerError, ControllerHandle};
pub use debounce::TriggerThresholds;
pub use device::{Clock, MonotonicClock, PadDevice, PadOpener};
pub use game_controller::{GameController, PadSnapshot, PadStates};
pub use history::StateHistory;
pub use state::{Axis, Buttons, State};
