//! # Device Profile Module
//!
//! Static tables mapping a controller's raw button and axis ids to roles.
//!
//! A profile is built once (from a preset or from configuration) and never
//! mutated by the classifier. Every capability is a variant of
//! [`ButtonRole`] or [`AxisRole`], so code that consumes a profile matches
//! exhaustively instead of probing for optional lookups.
//!
//! ## Slot Layout
//!
//! All presets use the same crossbar layout:
//!
//! | Slot | Input |
//! |------|-------|
//! | 1 | D-Pad Up |
//! | 2 | D-Pad Right |
//! | 3 | D-Pad Down |
//! | 4 | D-Pad Left |
//! | 5 | Face North (Y / Triangle) |
//! | 6 | Face East (B / Circle) |
//! | 7 | Face South (A / Cross) |
//! | 8 | Face West (X / Square) |
//!
//! ## Configuration
//!
//! Custom profiles deserialize from TOML:
//!
//! ```
//! use crossbar_input::controller::profile::DeviceProfile;
//!
//! let profile: DeviceProfile = toml::from_str(r#"
//! name = "Arcade stick"
//! buttons = [
//!     { id = 1, role = "left_trigger" },
//!     { id = 2, role = "right_trigger" },
//!     { id = 3, role = "slot", slot = 5 },
//! ]
//! axes = [{ id = 16, role = "hat" }]
//! "#).unwrap();
//!
//! assert_eq!(profile.name(), "Arcade stick");
//! ```

use evdev::{AbsoluteAxisType, Key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::slot::{HatDirection, SlotIndex};

/// XInput `wButtons` bit values used by the polled layout.
pub mod xinput {
    /// D-Pad up (slot 1).
    pub const DPAD_UP: u16 = 0x0001;
    /// D-Pad down (slot 3).
    pub const DPAD_DOWN: u16 = 0x0002;
    /// D-Pad left (slot 4).
    pub const DPAD_LEFT: u16 = 0x0004;
    /// D-Pad right (slot 2).
    pub const DPAD_RIGHT: u16 = 0x0008;
    /// Start / Options.
    pub const START: u16 = 0x0010;
    /// Back / Share.
    pub const BACK: u16 = 0x0020;
    /// Left stick click (L3).
    pub const LEFT_THUMB: u16 = 0x0040;
    /// Right stick click (R3).
    pub const RIGHT_THUMB: u16 = 0x0080;
    /// Left bumper (L1).
    pub const LEFT_SHOULDER: u16 = 0x0100;
    /// Right bumper (R1).
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    /// Face south (slot 7).
    pub const A: u16 = 0x1000;
    /// Face east (slot 6).
    pub const B: u16 = 0x2000;
    /// Face west (slot 8).
    pub const X: u16 = 0x4000;
    /// Face north (slot 5).
    pub const Y: u16 = 0x8000;
}

/// Button indices and axis ids of a typical DirectInput gamepad.
pub mod directinput {
    pub const BUTTON_SQUARE: u32 = 0;
    pub const BUTTON_CROSS: u32 = 1;
    pub const BUTTON_CIRCLE: u32 = 2;
    pub const BUTTON_TRIANGLE: u32 = 3;
    pub const BUTTON_L1: u32 = 4;
    pub const BUTTON_R1: u32 = 5;
    pub const BUTTON_L2: u32 = 6;
    pub const BUTTON_R2: u32 = 7;
    /// First POV hat.
    pub const POV0: u32 = 0x100;
}

/// Role of a discrete button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ButtonRole {
    /// Trigger delivered as a button.
    LeftTrigger,
    /// Trigger delivered as a button.
    RightTrigger,
    /// Digital report of an analog trigger that also has an axis mapping.
    ///
    /// Never feeds the trigger state, but is hidden together with the axis.
    LeftTriggerMirror,
    /// Digital report of an analog trigger that also has an axis mapping.
    RightTriggerMirror,
    LeftShoulder,
    RightShoulder,
    /// Button addressing a crossbar slot.
    Slot { slot: SlotIndex },
}

/// Slots addressed by the four hat directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HatSlots {
    /// Slot for 0 degrees.
    pub up: SlotIndex,
    /// Slot for 90 degrees.
    pub right: SlotIndex,
    /// Slot for 180 degrees.
    pub down: SlotIndex,
    /// Slot for 270 degrees.
    pub left: SlotIndex,
}

impl Default for HatSlots {
    fn default() -> Self {
        Self {
            up: slot(1),
            right: slot(2),
            down: slot(3),
            left: slot(4),
        }
    }
}

impl HatSlots {
    /// Returns the slot for a direction.
    #[must_use]
    pub fn slot(&self, direction: HatDirection) -> SlotIndex {
        match direction {
            HatDirection::Up => self.up,
            HatDirection::Right => self.right,
            HatDirection::Down => self.down,
            HatDirection::Left => self.left,
        }
    }
}

/// Role of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AxisRole {
    /// Analog trigger reporting values in `min..=max`.
    LeftTrigger {
        #[serde(default)]
        min: i32,
        #[serde(default = "default_axis_max")]
        max: i32,
    },
    /// Analog trigger reporting values in `min..=max`.
    RightTrigger {
        #[serde(default)]
        min: i32,
        #[serde(default = "default_axis_max")]
        max: i32,
    },
    /// D-pad reported as a POV angle.
    Hat {
        #[serde(default)]
        slots: HatSlots,
    },
}

fn default_axis_max() -> i32 { 255 }

/// One button entry of a profile table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ButtonBinding {
    id: u32,
    #[serde(flatten)]
    role: ButtonRole,
}

/// One axis entry of a profile table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct AxisBinding {
    id: u32,
    #[serde(flatten)]
    role: AxisRole,
}

/// Serialized form of a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileTable {
    name: String,
    #[serde(default)]
    buttons: Vec<ButtonBinding>,
    #[serde(default)]
    axes: Vec<AxisBinding>,
}

/// Built-in profiles selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePreset {
    /// Polled XInput-style state (bitmask buttons, analog triggers).
    Xinput,
    /// DualSense on Linux evdev.
    #[default]
    Dualsense,
    /// DirectInput-style gamepad with digital triggers and a POV hat.
    Directinput,
}

/// Immutable controller mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProfileTable", into = "ProfileTable")]
pub struct DeviceProfile {
    name: String,
    buttons: BTreeMap<u32, ButtonRole>,
    axes: BTreeMap<u32, AxisRole>,
}

impl TryFrom<ProfileTable> for DeviceProfile {
    type Error = String;

    fn try_from(table: ProfileTable) -> Result<Self, Self::Error> {
        let mut profile = DeviceProfile::empty(table.name);
        for binding in table.buttons {
            if profile.buttons.insert(binding.id, binding.role).is_some() {
                return Err(format!("button id {} is mapped more than once", binding.id));
            }
        }
        for binding in table.axes {
            if profile.axes.insert(binding.id, binding.role).is_some() {
                return Err(format!("axis id {} is mapped more than once", binding.id));
            }
        }
        Ok(profile)
    }
}

impl From<DeviceProfile> for ProfileTable {
    fn from(profile: DeviceProfile) -> Self {
        Self {
            name: profile.name,
            buttons: profile
                .buttons
                .into_iter()
                .map(|(id, role)| ButtonBinding { id, role })
                .collect(),
            axes: profile
                .axes
                .into_iter()
                .map(|(id, role)| AxisBinding { id, role })
                .collect(),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::from_preset(ProfilePreset::default())
    }
}

fn slot(index: u8) -> SlotIndex {
    match SlotIndex::new(index) {
        Some(slot) => slot,
        None => unreachable!("preset slot {} out of range", index),
    }
}

impl DeviceProfile {
    /// Creates a profile with no mappings.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buttons: BTreeMap::new(),
            axes: BTreeMap::new(),
        }
    }

    /// Adds or replaces a button mapping.
    #[must_use]
    pub fn with_button(mut self, id: u32, role: ButtonRole) -> Self {
        self.buttons.insert(id, role);
        self
    }

    /// Adds or replaces an axis mapping.
    #[must_use]
    pub fn with_axis(mut self, id: u32, role: AxisRole) -> Self {
        self.axes.insert(id, role);
        self
    }

    /// Builds a preset profile.
    #[must_use]
    pub fn from_preset(preset: ProfilePreset) -> Self {
        match preset {
            ProfilePreset::Xinput => Self::xinput(),
            ProfilePreset::Dualsense => Self::dualsense(),
            ProfilePreset::Directinput => Self::directinput(),
        }
    }

    /// Polled XInput layout. Button ids are `wButtons` bit values; triggers
    /// arrive as separate analog fields and need no mapping.
    #[must_use]
    pub fn xinput() -> Self {
        let slots = [
            (xinput::DPAD_UP, 1),
            (xinput::DPAD_RIGHT, 2),
            (xinput::DPAD_DOWN, 3),
            (xinput::DPAD_LEFT, 4),
            (xinput::Y, 5),
            (xinput::B, 6),
            (xinput::A, 7),
            (xinput::X, 8),
        ];

        slots
            .into_iter()
            .fold(Self::empty("XInput"), |profile, (bit, index)| {
                profile.with_button(u32::from(bit), ButtonRole::Slot { slot: slot(index) })
            })
            .with_button(u32::from(xinput::LEFT_SHOULDER), ButtonRole::LeftShoulder)
            .with_button(u32::from(xinput::RIGHT_SHOULDER), ButtonRole::RightShoulder)
    }

    /// DualSense on Linux evdev (hid-playstation driver).
    ///
    /// Triggers are the analog `ABS_Z`/`ABS_RZ` axes. The driver also reports
    /// each pull as `BTN_TL2`/`BTN_TR2`, which are mapped as mirrors so they
    /// are hidden along with the axis. The d-pad hat is keyed on `ABS_HAT0X`;
    /// the evdev mapper folds both hat axes into one angle.
    #[must_use]
    pub fn dualsense() -> Self {
        let slots = [
            (Key::BTN_NORTH, 5),
            (Key::BTN_EAST, 6),
            (Key::BTN_SOUTH, 7),
            (Key::BTN_WEST, 8),
        ];

        slots
            .into_iter()
            .fold(Self::empty("DualSense"), |profile, (key, index)| {
                profile.with_button(u32::from(key.code()), ButtonRole::Slot { slot: slot(index) })
            })
            .with_button(u32::from(Key::BTN_TL.code()), ButtonRole::LeftShoulder)
            .with_button(u32::from(Key::BTN_TR.code()), ButtonRole::RightShoulder)
            .with_button(u32::from(Key::BTN_TL2.code()), ButtonRole::LeftTriggerMirror)
            .with_button(u32::from(Key::BTN_TR2.code()), ButtonRole::RightTriggerMirror)
            .with_axis(
                u32::from(AbsoluteAxisType::ABS_Z.0),
                AxisRole::LeftTrigger { min: 0, max: 255 },
            )
            .with_axis(
                u32::from(AbsoluteAxisType::ABS_RZ.0),
                AxisRole::RightTrigger { min: 0, max: 255 },
            )
            .with_axis(
                u32::from(AbsoluteAxisType::ABS_HAT0X.0),
                AxisRole::Hat { slots: HatSlots::default() },
            )
    }

    /// DirectInput gamepad with digital L2/R2 and a POV hat.
    #[must_use]
    pub fn directinput() -> Self {
        let slots = [
            (directinput::BUTTON_TRIANGLE, 5),
            (directinput::BUTTON_CIRCLE, 6),
            (directinput::BUTTON_CROSS, 7),
            (directinput::BUTTON_SQUARE, 8),
        ];

        slots
            .into_iter()
            .fold(Self::empty("DirectInput"), |profile, (id, index)| {
                profile.with_button(id, ButtonRole::Slot { slot: slot(index) })
            })
            .with_button(directinput::BUTTON_L1, ButtonRole::LeftShoulder)
            .with_button(directinput::BUTTON_R1, ButtonRole::RightShoulder)
            .with_button(directinput::BUTTON_L2, ButtonRole::LeftTrigger)
            .with_button(directinput::BUTTON_R2, ButtonRole::RightTrigger)
            .with_axis(directinput::POV0, AxisRole::Hat { slots: HatSlots::default() })
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up the role of a button id.
    #[must_use]
    pub fn button_role(&self, id: u32) -> Option<&ButtonRole> {
        self.buttons.get(&id)
    }

    /// Looks up the role of an axis id.
    #[must_use]
    pub fn axis_role(&self, id: u32) -> Option<&AxisRole> {
        self.axes.get(&id)
    }

    /// Returns the polled-layout bitmask of every slot button.
    ///
    /// Only ids that are single bits of a 16-bit button word take part; other
    /// ids belong to event-delivered layouts and cannot be masked.
    #[must_use]
    pub fn slot_button_mask(&self) -> u16 {
        self.buttons
            .iter()
            .filter(|(_, role)| matches!(role, ButtonRole::Slot { .. }))
            .filter_map(|(&id, _)| u16::try_from(id).ok())
            .filter(|bit| bit.is_power_of_two())
            .fold(0, |mask, bit| mask | bit)
    }
}
