//! Controller Handle - lifecycle of the gilrs-backed pad pipeline
//!
//! Wires the device collector thread to a shared [`GameController`] and binds
//! the collector's output side as the controller's [`PadDevice`].
//!

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::{ConfigError, PadConfig};

pub use super::event_collector::{CollectorError, CollectorSettings, DeviceCommand, GilrsPad};
use super::event_collector::EventCollector;
pub use super::game_controller::{GameController, PadSnapshot, PadStates};

/// Capacity of the output command queue between the controller and the
/// collector thread
const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Errors that can occur while bringing up the pad pipeline
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Error from the device collection subsystem
    ///
    /// Typically indicates gilrs initialization or driver problems.
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),

    /// Configuration values the pipeline cannot run with
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Handle owning the collector thread and the shared pad record
///
/// # Threading Model
///
/// ```text
/// gilrs ──► collector thread ──► GameController ◄── frame loop (read_states)
///                 ▲                    │
///                 └── DeviceCommand ───┘ (GilrsPad: rumble, LED)
/// ```
///
/// The collector runs on a dedicated OS thread and is stopped by
/// [`ControllerHandle::shutdown`] or when the handle is dropped.
pub struct ControllerHandle {
    controller: Arc<GameController>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Spawns the collector and returns a handle to the shared controller
    ///
    /// # Errors
    ///
    /// * [`ControllerError::ConfigError`] - invalid thresholds or capacity
    /// * [`ControllerError::CollectorError`] - gilrs could not be initialized
    ///   or the thread could not be spawned
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use padstate::config::PadConfig;
    /// use padstate::controller::ControllerHandle;
    ///
    /// let handle = ControllerHandle::spawn(&PadConfig::default())?;
    /// let frame = handle.controller().read_states(8);
    /// println!("{} new states", frame.states.len());
    /// # Ok::<(), padstate::controller::ControllerError>(())
    /// ```
    pub fn spawn(config: &PadConfig) -> Result<Self, ControllerError> {
        info!("Initializing Controller system with config: {:?}", config);
        config.validate()?;

        let controller = Arc::new(
            GameController::with_parts(
                config.history_capacity,
                config.thresholds()?,
                Arc::new(super::device::MonotonicClock::new()),
            )
            .with_light_bar(config.light_bar),
        );

        let collector_settings = CollectorSettings {
            joystick_deadzone: config.stick_deadzone,
            poll_interval_us: config.poll_interval_us,
        };

        let (command_sender, command_receiver) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        debug!(
            "Created device command channel with capacity {}",
            COMMAND_QUEUE_CAPACITY
        );
        let attached = Arc::new(AtomicBool::new(false));

        info!("Creating Event Collector");
        let collector = EventCollector::create(
            Some(collector_settings),
            controller.clone(),
            command_receiver,
            attached.clone(),
        )?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread = std::thread::Builder::new()
            .name("pad-collector".into())
            .spawn(move || {
                let mut collecting = collector.initialize();
                collecting.run_collection_loop(&thread_stop);
            })
            .map_err(CollectorError::from)?;
        info!("Event Collector spawned successfully");

        controller.bind_device(Box::new(GilrsPad::new(command_sender, attached)));

        info!("Controller system initialized successfully");
        Ok(Self {
            controller,
            stop,
            thread: Some(thread),
        })
    }

    /// Shared pad record for consumers
    pub fn controller(&self) -> Arc<GameController> {
        self.controller.clone()
    }

    /// Stops the collector thread and waits for it to finish
    pub fn shutdown(mut self) {
        self.stop_collector();
    }

    fn stop_collector(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Collector thread panicked");
            } else {
                info!("Collector thread stopped");
            }
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.stop_collector();
    }
}
