//! # Gamepad Device Module
//!
//! Opens a gamepad through the Linux evdev interface.
//!
//! ## Detection
//!
//! With no configured path, every `/dev/input/event*` node is scanned in
//! sorted order and the first one exposing `BTN_SOUTH` (the primary face
//! button every evdev gamepad driver reports) is used.

use evdev::{Device, EventStream, Key};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CrossbarError, Result};

/// Directory scanned for event devices.
const INPUT_DIR: &str = "/dev/input";

/// Key every gamepad reports.
const GAMEPAD_DETECT_KEY: Key = Key::BTN_SOUTH;

/// Gamepad handle
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl Gamepad {
    /// Open the gamepad at `device_path`, or detect one if the path is empty
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: detection found no gamepad
    /// - `Controller`: the configured device could not be opened, or
    ///   `/dev/input` could not be read
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crossbar_input::controller::device::Gamepad;
    ///
    /// let gamepad = Gamepad::open("")?;
    /// println!("Connected to gamepad at: {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: &str) -> Result<Self> {
        if device_path.is_empty() {
            return Self::detect();
        }

        let device = Device::open(device_path).map_err(|e| {
            CrossbarError::Controller(format!("Failed to open {}: {}", device_path, e))
        })?;
        info!("Opened gamepad at: {}", device_path);

        Ok(Self {
            device,
            device_path: device_path.to_string(),
        })
    }

    /// Detect and open the first available gamepad
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no gamepad found on the system
    /// - `Controller`: `/dev/input` is missing or unreadable
    pub fn detect() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);

        if !input_dir.exists() {
            return Err(CrossbarError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| CrossbarError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CrossbarError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic device selection when multiple gamepads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("event"));
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );

                    if is_gamepad(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!(
                            "Found gamepad {} at: {}",
                            device.name().unwrap_or("(unnamed)"),
                            device_path
                        );

                        return Ok(Self {
                            device,
                            device_path,
                        });
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(CrossbarError::ControllerNotFound)
    }

    /// Get the `/dev/input/eventX` path of this gamepad
    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Get the gamepad name from evdev
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Take exclusive access so events only reach the system through us
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if another process already holds the grab.
    pub fn grab(&mut self) -> Result<()> {
        self.device
            .grab()
            .map_err(|e| CrossbarError::Controller(format!("Failed to grab {}: {}", self.device_path, e)))?;
        info!("Grabbed gamepad at: {}", self.device_path);
        Ok(())
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    /// Turn the device into an async event stream
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if the device cannot be switched to
    /// non-blocking mode.
    pub fn into_event_stream(self) -> Result<EventStream> {
        self.device
            .into_event_stream()
            .map_err(|e| CrossbarError::Controller(format!("Failed to open event stream: {}", e)))
    }
}

fn is_gamepad(device: &Device) -> bool {
    device
        .supported_keys()
        .is_some_and(|keys| keys.contains(GAMEPAD_DETECT_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_key() {
        assert_eq!(GAMEPAD_DETECT_KEY, Key::BTN_SOUTH);
        assert_eq!(GAMEPAD_DETECT_KEY.code(), 0x130);
    }

    #[test]
    fn test_open_missing_device() {
        let result = Gamepad::open("/nonexistent/event99");
        match result {
            Err(CrossbarError::Controller(msg)) => assert!(msg.contains("/nonexistent/event99")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opened a device that does not exist"),
        }
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_detect_with_real_hardware() {
        let gamepad = Gamepad::detect().expect("Gamepad not found");
        assert!(gamepad.device_path().starts_with("/dev/input/event"));
        assert!(gamepad.name().is_some());
    }
}
