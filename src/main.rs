use color_eyre::{eyre::eyre, Result};
use padstate::config::{ConfigError, PadConfig};
use padstate::controller::{Buttons, ControllerHandle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Upper bound of states taken from the history per frame
const STATES_PER_FRAME: usize = 8;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config()?;
    info!("Starting pad pipeline with {:?}", config);

    let handle = ControllerHandle::spawn(&config)
        .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;
    let controller = handle.controller();

    let mut frame = interval(Duration::from_secs_f64(1.0 / config.frame_rate_hz as f64));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut rumbling = false;
    loop {
        tokio::select! {
            _ = frame.tick() => {}
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }

        let batch = controller.read_states(STATES_PER_FRAME);
        if !batch.connected {
            continue;
        }

        for state in &batch.states {
            debug!(
                "t={}us buttons={:?} axes={:?}",
                state.time, state.buttons, state.axes
            );
        }

        // Rumble while both triggers are latched, as a visible round trip
        let Some(latest) = batch.states.last() else {
            continue;
        };
        let want_rumble = latest.is_pressed(Buttons::L2 | Buttons::R2);
        if want_rumble != rumbling {
            let level = if want_rumble { 255 } else { 0 };
            if !controller.set_vibration(level / 2, level) {
                warn!("Vibration request was not accepted");
            }
            rumbling = want_rumble;
        }
    }

    controller.set_vibration(0, 0);
    tokio::task::spawn_blocking(move || handle.shutdown()).await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

// First CLI argument overrides the config location
fn load_config() -> Result<PadConfig> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => PadConfig::load(&path)?,
        None => match PadConfig::load_default() {
            Ok(config) => config,
            Err(ConfigError::NoConfigDir) => {
                warn!("No config directory available, using defaults");
                PadConfig::default()
            }
            Err(e) => return Err(e.into()),
        },
    };
    Ok(config)
}
