use chrono::Local;
use gilrs::ff::{BaseEffect, BaseEffectType, EffectBuilder, Replay, Ticks};
use gilrs::{Axis as GilrsAxis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::device::PadDevice;
use super::game_controller::GameController;
use super::state::{Axis, Buttons};

// Output request forwarded to the thread that owns the gilrs context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Rumble { small: u16, large: u16 },
    Led { r: u8, g: u8, b: u8 },
}

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub joystick_deadzone: f32,
    pub poll_interval_us: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            joystick_deadzone: 0.05,
            poll_interval_us: 100,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to apply device command: {0}")]
    CommandError(String),

    #[error("Failed to spawn collector thread: {0}")]
    SpawnError(#[from] std::io::Error),
}

// Rumble effect currently playing; dropping it stops the motors
struct RumbleEffect(gilrs::ff::Effect);

impl std::fmt::Debug for RumbleEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RumbleEffect")
    }
}

// Last trigger travel forwarded per side. Pads may report a trigger both as
// an analog button and as a Z axis; the second copy of a sample is dropped.
#[derive(Debug, Default, Clone, Copy)]
struct TriggerFilter {
    last: [Option<i32>; 2],
}

impl TriggerFilter {
    fn slot(axis: Axis) -> Option<usize> {
        match axis {
            Axis::TriggerLeft => Some(0),
            Axis::TriggerRight => Some(1),
            _ => None,
        }
    }

    // Whether the sample should be forwarded; sticks always are
    fn accept(&mut self, axis: Axis, sample: i32) -> bool {
        let Some(slot) = Self::slot(axis) else {
            return true;
        };
        if self.last[slot] == Some(sample) {
            return false;
        }
        self.last[slot] = Some(sample);
        true
    }
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    // Active gamepad
    active_gamepad: Option<GamepadId>,

    // Collector settings
    settings: CollectorSettings,

    // Shared pad record the events are published into
    controller: Arc<GameController>,

    // Output requests from GilrsPad
    commands: mpsc::Receiver<DeviceCommand>,

    // Mirrors whether the active gamepad is attached, read by GilrsPad
    attached: Arc<AtomicBool>,

    // Effect kept alive while rumbling
    rumble: Option<RumbleEffect>,

    // Duplicate trigger samples from the two trigger sources
    triggers: TriggerFilter,
}

// Implementation of methods available in all states
impl<S: CollectionState> EventCollector<S> {
    fn connected_count(&self) -> u32 {
        self.gilrs.gamepads().count() as u32
    }

    // Pick the first attached gamepad and publish presence
    fn select_gamepad(&mut self) {
        let count = self.connected_count();
        let selected = self
            .gilrs
            .gamepads()
            .next()
            .map(|(id, gamepad): (GamepadId, Gamepad<'_>)| {
                info!(
                    "Selected gamepad: {} ({}), force feedback: {}",
                    gamepad.name(),
                    id,
                    gamepad.is_ff_supported()
                );
                id
            });

        self.active_gamepad = selected;
        self.rumble = None;
        self.triggers = TriggerFilter::default();
        self.attached.store(selected.is_some(), Ordering::SeqCst);
        self.controller.set_connected(selected.is_some(), count);
    }
}

// Implementation for Initializing state
impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        controller: Arc<GameController>,
        commands: mpsc::Receiver<DeviceCommand>,
        attached: Arc<AtomicBool>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            settings,
            controller,
            commands,
            attached,
            None,
            TriggerFilter::default(),
        ))
    }

    // Find the gamepad and transition to Collecting state
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        info!(
            "Initializing Event Collector with deadzone: {}",
            self.settings.joystick_deadzone
        );

        for (idx, (id, gamepad)) in self.gilrs.gamepads().enumerate() {
            info!(
                "  [{}] ID: {}, Name: {}, UUID: {:?}",
                idx,
                id,
                gamepad.name(),
                gamepad.uuid()
            );
        }

        self.select_gamepad();
        if self.active_gamepad.is_none() {
            warn!("No gamepad connected, continuing in idle mode");
        }

        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

// Implementation for Controller in Collecting state
impl EventCollector<Collecting> {
    // Handle a single pending gilrs event, if any
    pub fn collect_next_event(&mut self) -> bool {
        let Some(Event { id, event, .. }) = self.gilrs.next_event() else {
            return false;
        };

        match event {
            EventType::Connected => {
                info!("Controller connected event detected: {}", id);
                if self.active_gamepad.is_none() {
                    self.select_gamepad();
                } else {
                    self.controller.set_connected(true, self.connected_count());
                }
                return true;
            }
            EventType::Disconnected => {
                warn!("Controller disconnected event detected: {}", id);
                if self.active_gamepad == Some(id) {
                    self.select_gamepad();
                } else {
                    self.controller
                        .set_connected(self.active_gamepad.is_some(), self.connected_count());
                }
                return true;
            }
            _ => {}
        }

        // Only process events from the active gamepad
        if self.active_gamepad != Some(id) {
            debug!("Skipping event from non-active gamepad: {:?}", id);
            return true;
        }

        match event {
            EventType::ButtonPressed(button, _) => {
                if let Some(mapped) = map_button(button) {
                    self.controller.on_button_edge(mapped, true);
                }
            }
            EventType::ButtonReleased(button, _) => {
                if let Some(mapped) = map_button(button) {
                    self.controller.on_button_edge(mapped, false);
                }
            }
            // Analog triggers reported as buttons carry their travel here
            EventType::ButtonChanged(button, value, _) => {
                if let Some(axis) = trigger_axis(button) {
                    self.forward_axis(axis, trigger_to_byte(value));
                }
            }
            EventType::AxisChanged(axis, value, _) => {
                if let Some((mapped, sample)) =
                    convert_axis(axis, value, self.settings.joystick_deadzone)
                {
                    self.forward_axis(mapped, sample);
                } else {
                    debug!("Ignoring unsupported axis: {:?}", axis);
                }
            }
            _ => debug!("Unhandled event type: {:?}", event),
        }
        true
    }

    fn forward_axis(&mut self, axis: Axis, sample: i32) {
        if self.triggers.accept(axis, sample) {
            self.controller.on_axis_sample(axis, sample);
        }
    }

    // Apply queued output requests
    pub fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            if let Err(e) = self.apply_command(command) {
                warn!("{}", e);
            }
        }
    }

    fn apply_command(&mut self, command: DeviceCommand) -> Result<(), CollectorError> {
        match command {
            DeviceCommand::Rumble { small, large } => self.rumble(small, large),
            DeviceCommand::Led { r, g, b } => {
                // gilrs exposes no light bar control
                debug!("Light bar request ({}, {}, {}) not supported by backend", r, g, b);
                Ok(())
            }
        }
    }

    fn rumble(&mut self, small: u16, large: u16) -> Result<(), CollectorError> {
        // Dropping the previous effect stops it
        self.rumble = None;

        let Some(id) = self.active_gamepad else {
            return Ok(());
        };
        if small == 0 && large == 0 {
            return Ok(());
        }
        if !self.gilrs.gamepad(id).is_ff_supported() {
            debug!("Gamepad {} has no force feedback, ignoring rumble", id);
            return Ok(());
        }

        let scheduling = Replay {
            play_for: Ticks::from_ms(50),
            ..Default::default()
        };
        let effect = EffectBuilder::new()
            .add_effect(BaseEffect {
                kind: BaseEffectType::Strong { magnitude: large },
                scheduling: scheduling.clone(),
                envelope: Default::default(),
            })
            .add_effect(BaseEffect {
                kind: BaseEffectType::Weak { magnitude: small },
                scheduling,
                envelope: Default::default(),
            })
            .gamepads(&[id])
            .finish(&mut self.gilrs)
            .map_err(|e| CollectorError::CommandError(e.to_string()))?;
        effect
            .play()
            .map_err(|e| CollectorError::CommandError(e.to_string()))?;

        self.rumble = Some(RumbleEffect(effect));
        Ok(())
    }

    // Run the collector until `stop` is raised
    pub fn run_collection_loop(&mut self, stop: &AtomicBool) {
        info!("Starting Event Collector loop");

        // For performance monitoring
        let mut event_count = 0u64;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);
        let poll_interval = std::time::Duration::from_micros(self.settings.poll_interval_us);

        while !stop.load(Ordering::SeqCst) {
            while self.collect_next_event() {
                event_count += 1;
            }
            self.apply_commands();

            let now = Local::now();
            if now - last_log_time > log_interval {
                debug!(
                    "Event Collector stats: processed {} events in last {} seconds (avg {:.2}/sec)",
                    event_count,
                    log_interval.num_seconds(),
                    event_count as f64 / log_interval.num_seconds() as f64
                );
                event_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(poll_interval);
        }

        info!("Event Collector loop stopped");
    }
}

/// [`PadDevice`] backed by the collector thread's gilrs context
#[derive(Debug, Clone)]
pub struct GilrsPad {
    commands: mpsc::Sender<DeviceCommand>,
    attached: Arc<AtomicBool>,
}

impl GilrsPad {
    pub fn new(commands: mpsc::Sender<DeviceCommand>, attached: Arc<AtomicBool>) -> Self {
        Self { commands, attached }
    }
}

impl PadDevice for GilrsPad {
    fn is_connected(&self) -> bool {
        self.attached.load(Ordering::SeqCst) && !self.commands.is_closed()
    }

    fn rumble(&mut self, small: u16, large: u16) -> bool {
        match self.commands.try_send(DeviceCommand::Rumble { small, large }) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to queue rumble command: {}", e);
                false
            }
        }
    }

    fn set_led(&mut self, r: u8, g: u8, b: u8) {
        if let Err(e) = self.commands.try_send(DeviceCommand::Led { r, g, b }) {
            debug!("Dropped light bar command: {}", e);
        }
    }
}

// Helper function to map gilrs Button to pad bits
fn map_button(button: Button) -> Option<Buttons> {
    match button {
        Button::South => Some(Buttons::CROSS),
        Button::East => Some(Buttons::CIRCLE),
        Button::North => Some(Buttons::TRIANGLE),
        Button::West => Some(Buttons::SQUARE),
        Button::Start => Some(Buttons::OPTIONS),
        Button::Select => Some(Buttons::TOUCH_PAD),
        Button::LeftTrigger => Some(Buttons::L1),
        Button::RightTrigger => Some(Buttons::R1),
        Button::LeftThumb => Some(Buttons::L3),
        Button::RightThumb => Some(Buttons::R3),
        Button::DPadUp => Some(Buttons::UP),
        Button::DPadDown => Some(Buttons::DOWN),
        Button::DPadLeft => Some(Buttons::LEFT),
        Button::DPadRight => Some(Buttons::RIGHT),
        _ => None,
    }
}

// L2/R2 are never mapped as plain buttons; their bits come from the latch
fn trigger_axis(button: Button) -> Option<Axis> {
    match button {
        Button::LeftTrigger2 => Some(Axis::TriggerLeft),
        Button::RightTrigger2 => Some(Axis::TriggerRight),
        _ => None,
    }
}

fn convert_axis(axis: GilrsAxis, value: f32, deadzone: f32) -> Option<(Axis, i32)> {
    match axis {
        GilrsAxis::LeftStickX => Some((Axis::LeftX, stick_to_byte(apply_deadzone(value, deadzone)))),
        // gilrs reports up as positive, the pad report has up at 0
        GilrsAxis::LeftStickY => Some((Axis::LeftY, stick_to_byte(-apply_deadzone(value, deadzone)))),
        GilrsAxis::RightStickX => {
            Some((Axis::RightX, stick_to_byte(apply_deadzone(value, deadzone))))
        }
        GilrsAxis::RightStickY => {
            Some((Axis::RightY, stick_to_byte(-apply_deadzone(value, deadzone))))
        }
        GilrsAxis::LeftZ => Some((Axis::TriggerLeft, trigger_to_byte(value))),
        GilrsAxis::RightZ => Some((Axis::TriggerRight, trigger_to_byte(value))),
        _ => None,
    }
}

// -1.0..=1.0 to 0..=255 with the centre at 128
fn stick_to_byte(value: f32) -> i32 {
    let scaled = ((value.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as i32;
    scaled.clamp(0, 255)
}

// 0.0..=1.0 to 0..=255
fn trigger_to_byte(value: f32) -> i32 {
    (value.clamp(0.0, 1.0) * 255.0).round() as i32
}

// Helper function to apply deadzone to analog stick values
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        // Rescale the value to the range outside the deadzone
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}
