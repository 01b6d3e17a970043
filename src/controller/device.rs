//! Collaborators the controller talks to: the physical pad's output side and
//! the time source used to stamp published states.

use std::time::Instant;

/// Output side of a physical gamepad
///
/// Implementations are fire-and-forget. They must not call back into the
/// [`GameController`](super::game_controller::GameController) that owns them.
pub trait PadDevice: Send {
    /// Whether the device is still attached
    fn is_connected(&self) -> bool;

    /// Requests rumble at native intensity (0..=0xFFFF per motor).
    ///
    /// Returns `false` if the device layer rejected the request.
    fn rumble(&mut self, small: u16, large: u16) -> bool;

    /// Sets the light bar colour
    fn set_led(&mut self, r: u8, g: u8, b: u8);
}

/// Finds and opens a physical pad
pub trait PadOpener {
    /// First available device, if any
    fn open_first(&mut self) -> Option<Box<dyn PadDevice>>;
}

impl<F> PadOpener for F
where
    F: FnMut() -> Option<Box<dyn PadDevice>>,
{
    fn open_first(&mut self) -> Option<Box<dyn PadDevice>> {
        self()
    }
}

/// Monotonic time source in microseconds
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> u64;
}

/// [`Clock`] counting from its own creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        // u64 microseconds covers ~584k years
        self.origin.elapsed().as_micros() as u64
    }
}

/// Scales a 0..=255 motor intensity to the device's 0..=0xFFFF range
pub fn scale_motor(value: u8) -> u16 {
    ((value as f32 / 255.0) * 0xFFFF as f32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_scaling_covers_full_range() {
        assert_eq!(scale_motor(0), 0);
        assert_eq!(scale_motor(255), 0xFFFF);
        let half = scale_motor(128);
        assert!(half > 0x7F00 && half < 0x8100, "got {half:#x}");
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_micros();
        let b = clock.now_micros();
        assert!(b >= a);
    }
}
