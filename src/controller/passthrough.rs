//! # Passthrough Module
//!
//! Replays the input the classifier leaves to the host.
//!
//! The physical gamepad is grabbed, so none of its events reach the system
//! directly. A uinput gamepad with the same capabilities replays whatever
//! passes:
//!
//! - **Event delivery**: every evdev event the classifier did not consume is
//!   collected into a frame and re-emitted on `SYN_REPORT`.
//! - **Polled delivery**: the controls covered by [`GamepadSnapshot`] are
//!   re-rendered from the masked snapshot each tick. Everything else (sticks,
//!   the PS button, motion sensors) is forwarded per frame as above.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, EventType, InputEvent, InputEventKind, Key, Synchronization,
    UinputAbsSetup,
};
use std::mem;
use tracing::{debug, info};

use crate::config::Delivery;
use crate::error::{CrossbarError, Result};

use super::device::Gamepad;
use super::profile::xinput;
use super::suppression::GamepadSnapshot;

/// Name of the uinput device.
pub const VIRTUAL_DEVICE_NAME: &str = "Crossbar Input Virtual Gamepad";

/// Snapshot button bits and the keys they are emitted as.
const SNAPSHOT_KEYS: [(u16, Key); 10] = [
    (xinput::START, Key::BTN_START),
    (xinput::BACK, Key::BTN_SELECT),
    (xinput::LEFT_THUMB, Key::BTN_THUMBL),
    (xinput::RIGHT_THUMB, Key::BTN_THUMBR),
    (xinput::LEFT_SHOULDER, Key::BTN_TL),
    (xinput::RIGHT_SHOULDER, Key::BTN_TR),
    (xinput::A, Key::BTN_SOUTH),
    (xinput::B, Key::BTN_EAST),
    (xinput::X, Key::BTN_WEST),
    (xinput::Y, Key::BTN_NORTH),
];

/// uinput gamepad mirroring the capabilities of a physical one.
pub struct VirtualGamepad {
    device: VirtualDevice,
}

impl VirtualGamepad {
    /// Creates a virtual gamepad with the keys and axes of `source`.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if `/dev/uinput` is unavailable or the
    /// capabilities cannot be registered.
    pub fn mirror(source: &Gamepad) -> Result<Self> {
        let physical = source.device();
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(uinput_error)?
            .name(VIRTUAL_DEVICE_NAME);

        if let Some(keys) = physical.supported_keys() {
            builder = builder.with_keys(keys).map_err(uinput_error)?;
        }

        if let Some(axes) = physical.supported_absolute_axes() {
            let state = physical.get_abs_state().map_err(uinput_error)?;
            for axis in axes.iter() {
                let info = &state[usize::from(axis.0)];
                let setup = UinputAbsSetup::new(
                    axis,
                    AbsInfo::new(info.value, info.minimum, info.maximum, info.fuzz, info.flat, info.resolution),
                );
                builder = builder.with_absolute_axis(&setup).map_err(uinput_error)?;
            }
        }

        let device = builder.build().map_err(uinput_error)?;
        info!("Created {} mirroring {}", VIRTUAL_DEVICE_NAME, source.device_path());

        Ok(Self { device })
    }

    /// Emits one frame. The frame is terminated with `SYN_REPORT` by evdev.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the write to uinput fails.
    pub fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.device.emit(events)?;
        Ok(())
    }
}

fn uinput_error(e: std::io::Error) -> CrossbarError {
    CrossbarError::Controller(format!("Failed to create virtual gamepad: {}", e))
}

/// Returns true for events the polled path re-renders from the snapshot.
#[must_use]
pub fn rendered_from_snapshot(event: &InputEvent) -> bool {
    match event.kind() {
        InputEventKind::Key(key) => {
            key == Key::BTN_TL2
                || key == Key::BTN_TR2
                || SNAPSHOT_KEYS.iter().any(|&(_, rendered)| rendered == key)
        }
        InputEventKind::AbsAxis(axis) => matches!(
            axis,
            AbsoluteAxisType::ABS_Z
                | AbsoluteAxisType::ABS_RZ
                | AbsoluteAxisType::ABS_HAT0X
                | AbsoluteAxisType::ABS_HAT0Y
        ),
        _ => false,
    }
}

/// Returns true if a raw event is replayed as-is.
///
/// On the event path that is every event the classifier did not consume. On
/// the polled path it is every event the snapshot does not cover.
#[must_use]
pub fn forwards(delivery: Delivery, event: &InputEvent, consumed: bool) -> bool {
    match delivery {
        Delivery::Event => !consumed,
        Delivery::Polled => !rendered_from_snapshot(event),
    }
}

/// Frame buffer and snapshot renderer for the virtual gamepad.
#[derive(Debug, Default)]
pub struct Passthrough {
    frame: Vec<InputEvent>,
    rendered: GamepadSnapshot,
}

impl Passthrough {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a replayed event to the current frame.
    ///
    /// Returns the finished frame on `SYN_REPORT` if anything in it survived.
    pub fn forward(&mut self, event: InputEvent) -> Option<Vec<InputEvent>> {
        match event.kind() {
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) => {
                (!self.frame.is_empty()).then(|| mem::take(&mut self.frame))
            }
            InputEventKind::Synchronization(_) => None,
            _ => {
                self.frame.push(event);
                None
            }
        }
    }

    /// Renders the controls covered by a (masked) snapshot.
    ///
    /// Only changes since the previous call are returned. The trigger buttons
    /// follow their axis, so a zeroed trigger also releases `BTN_TL2`/`BTN_TR2`.
    pub fn render(&mut self, snapshot: &GamepadSnapshot) -> Vec<InputEvent> {
        let previous = mem::replace(&mut self.rendered, *snapshot);
        let mut events = Vec::new();

        for (bit, key) in SNAPSHOT_KEYS {
            let was = (previous.buttons & bit) != 0;
            let is = (snapshot.buttons & bit) != 0;
            if was != is {
                events.push(InputEvent::new(EventType::KEY, key.code(), i32::from(is)));
            }
        }

        let hats = [
            (AbsoluteAxisType::ABS_HAT0X, xinput::DPAD_LEFT, xinput::DPAD_RIGHT),
            (AbsoluteAxisType::ABS_HAT0Y, xinput::DPAD_UP, xinput::DPAD_DOWN),
        ];
        for (axis, negative, positive) in hats {
            let was = dpad_value(previous.buttons, negative, positive);
            let is = dpad_value(snapshot.buttons, negative, positive);
            if was != is {
                events.push(InputEvent::new(EventType::ABSOLUTE, axis.0, is));
            }
        }

        let triggers = [
            (AbsoluteAxisType::ABS_Z, Key::BTN_TL2, previous.left_trigger, snapshot.left_trigger),
            (AbsoluteAxisType::ABS_RZ, Key::BTN_TR2, previous.right_trigger, snapshot.right_trigger),
        ];
        for (axis, key, was, is) in triggers {
            if was != is {
                events.push(InputEvent::new(EventType::ABSOLUTE, axis.0, i32::from(is)));
            }
            if (was > 0) != (is > 0) {
                events.push(InputEvent::new(EventType::KEY, key.code(), i32::from(is > 0)));
            }
        }

        if !events.is_empty() {
            debug!("Rendered {} events from snapshot", events.len());
        }
        events
    }
}

fn dpad_value(buttons: u16, negative: u16, positive: u16) -> i32 {
    if (buttons & positive) != 0 {
        1
    } else if (buttons & negative) != 0 {
        -1
    } else {
        0
    }
}
