//! # Crossbar Input
//!
//! Drive a trigger-combo action crossbar from a gamepad.
//!
//! This application grabs a gamepad through evdev, classifies trigger combos
//! and slot presses, replays everything it does not hide on a virtual
//! gamepad, and reports every slot activation on the next tick.

use anyhow::Result;
use clap::Parser;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crossbar_input::config::{Config, Delivery};
use crossbar_input::controller::device::Gamepad;
use crossbar_input::controller::dispatch::{SlotActivation, SlotActivationSink};
use crossbar_input::controller::mapper::{EventMapper, RawInput};
use crossbar_input::controller::passthrough::{forwards, Passthrough, VirtualGamepad};
use crossbar_input::controller::profile::DeviceProfile;
use crossbar_input::controller::ComboClassifier;
use crossbar_input::error::CrossbarError;
use crossbar_input::telemetry::ActivationJournal;

/// Default configuration file
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of ticks between status log messages
const LOG_INTERVAL_TICKS: u64 = 600;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "crossbar-input", version, about = "Drive a trigger-combo action crossbar from a gamepad")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured input delivery
    #[arg(short, long, value_enum)]
    delivery: Option<Delivery>,
}

/// Tick period for a rate in Hz
fn tick_period(rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)))
}

/// Load the configuration, falling back to defaults if the file is missing
fn load_config(path: &Path) -> Result<Config> {
    match Config::load(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Err(CrossbarError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Main entry point for Crossbar Input
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration and build the classifier
///    - Open the gamepad (configured path or auto-detected)
///    - Grab it and create the virtual gamepad that replays unsuppressed input
///
/// 2. **Main Loop**
///    - Event delivery: feed each evdev event to the classifier and replay
///      the events it does not consume
///    - Polled delivery: feed one state snapshot per tick and replay the
///      masked snapshot
///    - Flush deferred slot activations on every tick
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is invalid
/// - No gamepad can be opened or grabbed
/// - The virtual gamepad cannot be created
/// - The activation journal cannot be created
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --config config/default.toml --delivery polled
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Crossbar Input v{} starting...", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let delivery = cli.delivery.unwrap_or(config.input.delivery);

    // Polled samples are rendered in the XInput layout
    let profile = match delivery {
        Delivery::Event => config.profile.build(),
        Delivery::Polled => DeviceProfile::xinput(),
    };
    info!("Using device profile: {}", profile.name());
    let mut classifier = ComboClassifier::new(profile, config.classifier.clone());

    let mut journal = if config.journal.enabled {
        Some(ActivationJournal::create(&config.journal.path)?)
    } else {
        None
    };

    let mut gamepad = Gamepad::open(&config.input.device_path)?;
    info!("Gamepad opened at: {}", gamepad.device_path());

    let mut virtual_pad = if config.input.grab {
        let virtual_pad = VirtualGamepad::mirror(&gamepad)?;
        gamepad.grab()?;
        Some(virtual_pad)
    } else {
        warn!("Input grab disabled, suppressed input still reaches the system");
        None
    };

    let mut events = gamepad.into_event_stream()?;
    let mut mapper = EventMapper::new();
    let mut passthrough = Passthrough::new();

    let mut tick = interval(tick_period(config.input.poll_rate_hz));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Classifying {:?} input at {}Hz", delivery, config.input.poll_rate_hz);
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;
    let mut activation_count: u64 = 0;

    // Main input loop
    loop {
        tokio::select! {
            event = events.next_event() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Gamepad disconnected: {}", e);
                        break;
                    }
                };

                let raw = mapper.process_event(&event);
                let consumed = match raw {
                    Some(RawInput::Button { id, pressed }) if delivery == Delivery::Event => {
                        classifier.on_discrete_button_event(id, pressed)
                    }
                    Some(RawInput::Axis { id, value }) if delivery == Delivery::Event => {
                        classifier.on_axis_event(id, value)
                    }
                    _ => false,
                };
                if consumed {
                    trace!("Consumed {:?}", raw);
                }

                let Some(pad) = virtual_pad.as_mut() else {
                    continue;
                };
                if !forwards(delivery, &event, consumed) {
                    continue;
                }
                if let Some(frame) = passthrough.forward(event) {
                    if let Err(e) = pad.emit(&frame) {
                        warn!("Failed to replay input: {}", e);
                    }
                }
            }

            _ = tick.tick() => {
                if delivery == Delivery::Polled {
                    let mut state = mapper.state().to_snapshot();
                    let instruction = classifier.on_polling_sample(Some(&state));
                    classifier.apply_suppression(&instruction, Some(&mut state));

                    if let Some(pad) = virtual_pad.as_mut() {
                        if let Err(e) = pad.emit(&passthrough.render(&state)) {
                            warn!("Failed to replay input: {}", e);
                        }
                    }
                }

                // Deferred dispatch: activations queued during input handling run here
                let flushed = classifier.flush_activations(&mut |activation: SlotActivation| {
                    info!("Slot {} activated under {}", activation.slot, activation.mode);
                    if let Some(journal) = journal.as_mut() {
                        journal.on_slot_activate(activation);
                    }
                });
                activation_count += flushed as u64;

                tick_count += 1;
                if tick_count % LOG_INTERVAL_TICKS == 0 {
                    debug!(
                        "Combo {} (pressed slot {:?}), {} activations so far",
                        classifier.active_combo(),
                        classifier.pressed_slot().map(|slot| slot.get()),
                        activation_count
                    );
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total slot activations: {}", activation_count);
    Ok(())
}
