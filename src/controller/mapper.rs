//! # Controller Input Mapper Module
//!
//! This module parses raw evdev events from a gamepad, keeps a structured
//! [`ControllerState`], and converts each event into a [`RawInput`] the
//! classifier understands.
//!
//! ## Event Types
//!
//! - **EV_ABS (Absolute Axis)**: sticks, analog triggers, d-pad hat
//! - **EV_KEY (Key/Button)**: digital buttons
//!
//! ## Axis Codes (EV_ABS, hid-playstation)
//!
//! | Axis | evdev Code | Range |
//! |------|------------|-------|
//! | Left Stick X/Y | ABS_X / ABS_Y | 0-255 |
//! | Right Stick X/Y | ABS_RX / ABS_RY | 0-255 |
//! | L2 Trigger | ABS_Z | 0-255 |
//! | R2 Trigger | ABS_RZ | 0-255 |
//! | D-Pad X | ABS_HAT0X | -1/0/1 |
//! | D-Pad Y | ABS_HAT0Y | -1/0/1 |
//!
//! The two hat axes are folded into a single POV angle reported under
//! `ABS_HAT0X`, so the classifier sees one rotating control.
//!
//! ## Usage
//!
//! ```
//! use evdev::{AbsoluteAxisType, EventType, InputEvent};
//! use crossbar_input::controller::mapper::{EventMapper, RawInput};
//!
//! let mut mapper = EventMapper::new();
//! let right = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_HAT0X.0, 1);
//!
//! assert_eq!(
//!     mapper.process_event(&right),
//!     Some(RawInput::Axis { id: u32::from(AbsoluteAxisType::ABS_HAT0X.0), value: 9000 })
//! );
//! ```

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};

use super::profile::xinput;
use super::slot::POV_CENTERED;
use super::suppression::GamepadSnapshot;

/// Raw axis value range from the controller.
pub const AXIS_MIN: i32 = 0;
/// Raw axis value range from the controller.
pub const AXIS_MAX: i32 = 255;
/// Raw axis center value.
pub const AXIS_CENTER: i32 = 128;

/// D-Pad axis values.
pub const DPAD_RELEASED: i32 = 0;
/// D-Pad pressed negative direction (left or up).
pub const DPAD_NEGATIVE: i32 = -1;
/// D-Pad pressed positive direction (right or down).
pub const DPAD_POSITIVE: i32 = 1;

/// One classifier input produced from an evdev event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    /// Button press (or auto-repeat) and release.
    Button { id: u32, pressed: bool },
    /// Absolute axis value. Hat axes carry a POV angle.
    Axis { id: u32, value: i32 },
}

/// Complete state of the gamepad as seen through evdev.
///
/// Analog values are raw evdev values (0-255 for sticks and triggers,
/// -1/0/1 for the d-pad).
///
/// # Examples
///
/// ```
/// use crossbar_input::controller::mapper::ControllerState;
///
/// let state = ControllerState::default();
/// assert_eq!(state.left_stick_x, 128);  // Centered
/// assert!(!state.btn_cross);            // Not pressed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    // Analog sticks (0-255, 128 = center)
    pub left_stick_x: i32,
    pub left_stick_y: i32,
    pub right_stick_x: i32,
    pub right_stick_y: i32,

    // Triggers (0-255)
    /// L2 trigger analog value. 0 = released, 255 = fully pressed.
    pub trigger_l2: i32,
    /// R2 trigger analog value. 0 = released, 255 = fully pressed.
    pub trigger_r2: i32,

    // D-Pad (-1, 0, 1)
    /// D-Pad X axis. -1 = left, 0 = center, 1 = right.
    pub dpad_x: i32,
    /// D-Pad Y axis. -1 = up, 0 = center, 1 = down.
    pub dpad_y: i32,

    // Face buttons
    pub btn_cross: bool,
    pub btn_circle: bool,
    pub btn_square: bool,
    pub btn_triangle: bool,

    // Shoulder buttons
    pub btn_l1: bool,
    pub btn_r1: bool,

    // System buttons
    pub btn_share: bool,
    pub btn_options: bool,

    // Stick clicks
    pub btn_l3: bool,
    pub btn_r3: bool,
}

impl Default for ControllerState {
    /// Creates a new controller state with all sticks centered and buttons released.
    fn default() -> Self {
        Self {
            left_stick_x: AXIS_CENTER,
            left_stick_y: AXIS_CENTER,
            right_stick_x: AXIS_CENTER,
            right_stick_y: AXIS_CENTER,

            trigger_l2: AXIS_MIN,
            trigger_r2: AXIS_MIN,

            dpad_x: DPAD_RELEASED,
            dpad_y: DPAD_RELEASED,

            btn_cross: false,
            btn_circle: false,
            btn_square: false,
            btn_triangle: false,
            btn_l1: false,
            btn_r1: false,
            btn_share: false,
            btn_options: false,
            btn_l3: false,
            btn_r3: false,
        }
    }
}

impl ControllerState {
    /// Creates a new controller state with default (centered/released) values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the d-pad as a POV angle in hundredths of a degree.
    ///
    /// 0 is up and angles grow clockwise; a centered d-pad is
    /// [`POV_CENTERED`].
    ///
    /// # Examples
    ///
    /// ```
    /// use crossbar_input::controller::mapper::ControllerState;
    ///
    /// let mut state = ControllerState::new();
    /// assert_eq!(state.pov_angle(), -1);
    ///
    /// state.dpad_x = 1;
    /// state.dpad_y = 1;  // Down-right
    /// assert_eq!(state.pov_angle(), 13500);
    /// ```
    #[must_use]
    pub fn pov_angle(&self) -> i32 {
        match (self.dpad_x.signum(), self.dpad_y.signum()) {
            (0, -1) => 0,
            (1, -1) => 4500,
            (1, 0) => 9000,
            (1, 1) => 13500,
            (0, 1) => 18000,
            (-1, 1) => 22500,
            (-1, 0) => 27000,
            (-1, -1) => 31500,
            _ => POV_CENTERED,
        }
    }

    /// Renders the state in the polled (XInput) layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use crossbar_input::controller::mapper::ControllerState;
    /// use crossbar_input::controller::profile::xinput;
    ///
    /// let mut state = ControllerState::new();
    /// state.btn_cross = true;
    /// state.trigger_l2 = 300;  // Out of range, clamped
    ///
    /// let snapshot = state.to_snapshot();
    /// assert_eq!(snapshot.buttons, xinput::A);
    /// assert_eq!(snapshot.left_trigger, 255);
    /// ```
    #[must_use]
    pub fn to_snapshot(&self) -> GamepadSnapshot {
        let bits = [
            (self.dpad_y < 0, xinput::DPAD_UP),
            (self.dpad_y > 0, xinput::DPAD_DOWN),
            (self.dpad_x < 0, xinput::DPAD_LEFT),
            (self.dpad_x > 0, xinput::DPAD_RIGHT),
            (self.btn_options, xinput::START),
            (self.btn_share, xinput::BACK),
            (self.btn_l3, xinput::LEFT_THUMB),
            (self.btn_r3, xinput::RIGHT_THUMB),
            (self.btn_l1, xinput::LEFT_SHOULDER),
            (self.btn_r1, xinput::RIGHT_SHOULDER),
            (self.btn_cross, xinput::A),
            (self.btn_circle, xinput::B),
            (self.btn_square, xinput::X),
            (self.btn_triangle, xinput::Y),
        ];

        GamepadSnapshot {
            buttons: bits
                .into_iter()
                .filter(|(pressed, _)| *pressed)
                .fold(0, |mask, (_, bit)| mask | bit),
            left_trigger: trigger_byte(self.trigger_l2),
            right_trigger: trigger_byte(self.trigger_r2),
            thumb_lx: stick_to_thumb(self.left_stick_x),
            thumb_ly: stick_to_thumb(2 * AXIS_CENTER - self.left_stick_y),
            thumb_rx: stick_to_thumb(self.right_stick_x),
            thumb_ry: stick_to_thumb(2 * AXIS_CENTER - self.right_stick_y),
        }
    }
}

fn trigger_byte(value: i32) -> u8 {
    u8::try_from(value.clamp(AXIS_MIN, AXIS_MAX)).unwrap_or_default()
}

/// Maps 0-255 (128 = center) onto the signed thumbstick range.
fn stick_to_thumb(value: i32) -> i16 {
    let centered = (value.clamp(AXIS_MIN, AXIS_MAX) - AXIS_CENTER) * 256;
    i16::try_from(centered.clamp(i32::from(i16::MIN), i32::from(i16::MAX))).unwrap_or_default()
}

/// Parses raw evdev events and maintains controller state.
///
/// # Thread Safety
///
/// `EventMapper` is not thread-safe. Use from a single task/thread only.
#[derive(Debug, Default)]
pub struct EventMapper {
    state: ControllerState,
}

impl EventMapper {
    /// Creates a new event mapper with default controller state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ControllerState::default(),
        }
    }

    /// Returns a reference to the current controller state.
    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Processes a single evdev input event and updates internal state.
    ///
    /// Returns the classifier input for key and axis events. Sync and other
    /// event types return `None`. Key auto-repeat (value 2) counts as a press.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<RawInput> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => Some(self.process_axis_event(axis, event.value())),
            InputEventKind::Key(key) => {
                let pressed = event.value() != 0;
                self.process_key_event(key, pressed);
                Some(RawInput::Button {
                    id: u32::from(key.code()),
                    pressed,
                })
            }
            _ => None,
        }
    }

    /// Processes an absolute axis event.
    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) -> RawInput {
        match axis {
            AbsoluteAxisType::ABS_X => self.state.left_stick_x = value,
            AbsoluteAxisType::ABS_Y => self.state.left_stick_y = value,
            AbsoluteAxisType::ABS_RX => self.state.right_stick_x = value,
            AbsoluteAxisType::ABS_RY => self.state.right_stick_y = value,

            AbsoluteAxisType::ABS_Z => self.state.trigger_l2 = value,
            AbsoluteAxisType::ABS_RZ => self.state.trigger_r2 = value,

            AbsoluteAxisType::ABS_HAT0X | AbsoluteAxisType::ABS_HAT0Y => {
                if axis == AbsoluteAxisType::ABS_HAT0X {
                    self.state.dpad_x = value;
                } else {
                    self.state.dpad_y = value;
                }
                return RawInput::Axis {
                    id: u32::from(AbsoluteAxisType::ABS_HAT0X.0),
                    value: self.state.pov_angle(),
                };
            }

            _ => {
                // Gyro, accelerometer, touchpad position
            }
        }

        RawInput::Axis {
            id: u32::from(axis.0),
            value,
        }
    }

    /// Processes a key/button event.
    fn process_key_event(&mut self, key: Key, pressed: bool) {
        match key {
            Key::BTN_SOUTH => self.state.btn_cross = pressed,
            Key::BTN_EAST => self.state.btn_circle = pressed,
            Key::BTN_WEST => self.state.btn_square = pressed,
            Key::BTN_NORTH => self.state.btn_triangle = pressed,

            Key::BTN_TL => self.state.btn_l1 = pressed,
            Key::BTN_TR => self.state.btn_r1 = pressed,

            Key::BTN_SELECT => self.state.btn_share = pressed,
            Key::BTN_START => self.state.btn_options = pressed,

            Key::BTN_THUMBL => self.state.btn_l3 = pressed,
            Key::BTN_THUMBR => self.state.btn_r3 = pressed,

            _ => {
                // Still forwarded as a RawInput
            }
        }
    }

    /// Resets all state to default (centered sticks, released buttons).
    ///
    /// Useful when reconnecting a controller.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    fn hat_id() -> u32 {
        u32::from(AbsoluteAxisType::ABS_HAT0X.0)
    }

    // ==================== ControllerState Tests ====================

    #[test]
    fn test_controller_state_default() {
        let state = ControllerState::default();

        assert_eq!(state.left_stick_x, AXIS_CENTER);
        assert_eq!(state.right_stick_y, AXIS_CENTER);
        assert_eq!(state.trigger_l2, AXIS_MIN);
        assert_eq!(state.trigger_r2, AXIS_MIN);
        assert_eq!(state.dpad_x, DPAD_RELEASED);
        assert_eq!(state.dpad_y, DPAD_RELEASED);
        assert!(!state.btn_cross);
        assert!(!state.btn_l1);
        assert_eq!(state, ControllerState::new());
    }

    #[test]
    fn test_pov_angle_all_directions() {
        let cases = [
            ((0, -1), 0),
            ((1, -1), 4500),
            ((1, 0), 9000),
            ((1, 1), 13500),
            ((0, 1), 18000),
            ((-1, 1), 22500),
            ((-1, 0), 27000),
            ((-1, -1), 31500),
            ((0, 0), POV_CENTERED),
        ];

        for ((x, y), angle) in cases {
            let state = ControllerState {
                dpad_x: x,
                dpad_y: y,
                ..ControllerState::default()
            };
            assert_eq!(state.pov_angle(), angle, "dpad ({}, {})", x, y);
        }
    }

    #[test]
    fn test_snapshot_default_is_neutral() {
        let snapshot = ControllerState::default().to_snapshot();
        assert_eq!(snapshot.buttons, 0);
        assert_eq!(snapshot.left_trigger, 0);
        assert_eq!(snapshot.thumb_lx, 0);
        assert_eq!(snapshot.thumb_ly, 0);
    }

    #[test]
    fn test_snapshot_buttons() {
        let state = ControllerState {
            dpad_x: DPAD_NEGATIVE,
            dpad_y: DPAD_NEGATIVE,
            btn_triangle: true,
            btn_r1: true,
            btn_options: true,
            ..ControllerState::default()
        };
        let snapshot = state.to_snapshot();
        assert_eq!(
            snapshot.buttons,
            xinput::DPAD_UP | xinput::DPAD_LEFT | xinput::Y | xinput::RIGHT_SHOULDER | xinput::START
        );
    }

    #[test]
    fn test_snapshot_triggers_and_sticks() {
        let state = ControllerState {
            trigger_l2: 200,
            trigger_r2: -5,
            left_stick_x: AXIS_MAX,
            left_stick_y: AXIS_MIN,
            right_stick_x: AXIS_MIN,
            ..ControllerState::default()
        };
        let snapshot = state.to_snapshot();
        assert_eq!(snapshot.left_trigger, 200);
        assert_eq!(snapshot.right_trigger, 0);
        assert_eq!(snapshot.thumb_lx, 127 * 256);
        // Stick pushed up reads positive
        assert_eq!(snapshot.thumb_ly, 127 * 256);
        assert_eq!(snapshot.thumb_rx, i16::MIN);
    }

    // ==================== EventMapper Tests ====================

    #[test]
    fn test_key_event_updates_state_and_forwards() {
        let mut mapper = EventMapper::new();

        let raw = mapper.process_event(&make_key_event(Key::BTN_SOUTH, 1));
        assert_eq!(
            raw,
            Some(RawInput::Button { id: u32::from(Key::BTN_SOUTH.code()), pressed: true })
        );
        assert!(mapper.state().btn_cross);

        mapper.process_event(&make_key_event(Key::BTN_SOUTH, 0));
        assert!(!mapper.state().btn_cross);
    }

    #[test]
    fn test_key_autorepeat_is_pressed() {
        let mut mapper = EventMapper::new();
        let raw = mapper.process_event(&make_key_event(Key::BTN_NORTH, 2));
        assert!(matches!(raw, Some(RawInput::Button { pressed: true, .. })));
    }

    #[test]
    fn test_unknown_key_is_forwarded() {
        let mut mapper = EventMapper::new();
        let raw = mapper.process_event(&make_key_event(Key::BTN_MODE, 1));
        assert_eq!(
            raw,
            Some(RawInput::Button { id: u32::from(Key::BTN_MODE.code()), pressed: true })
        );
        assert_eq!(mapper.state(), &ControllerState::default());
    }

    #[test]
    fn test_trigger_axes() {
        let mut mapper = EventMapper::new();

        let raw = mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 180));
        assert_eq!(
            raw,
            Some(RawInput::Axis { id: u32::from(AbsoluteAxisType::ABS_Z.0), value: 180 })
        );
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RZ, 90));

        assert_eq!(mapper.state().trigger_l2, 180);
        assert_eq!(mapper.state().trigger_r2, 90);
    }

    #[test]
    fn test_stick_axes() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 10));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RY, 250));
        assert_eq!(mapper.state().left_stick_x, 10);
        assert_eq!(mapper.state().right_stick_y, 250);
    }

    #[test]
    fn test_hat_axes_fold_into_angle() {
        let mut mapper = EventMapper::new();

        let up = mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, DPAD_NEGATIVE));
        assert_eq!(up, Some(RawInput::Axis { id: hat_id(), value: 0 }));

        let up_right = mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, DPAD_POSITIVE));
        assert_eq!(up_right, Some(RawInput::Axis { id: hat_id(), value: 4500 }));

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, DPAD_RELEASED));
        let centered = mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, DPAD_RELEASED));
        assert_eq!(centered, Some(RawInput::Axis { id: hat_id(), value: POV_CENTERED }));
    }

    #[test]
    fn test_sync_event_ignored() {
        let mut mapper = EventMapper::new();
        let sync = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(mapper.process_event(&sync), None);
        assert_eq!(mapper.state(), &ControllerState::default());
    }

    #[test]
    fn test_reset() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&make_key_event(Key::BTN_TL, 1));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 255));

        mapper.reset();
        assert_eq!(mapper.state(), &ControllerState::default());
    }
}
