//! # Slot Resolver Module
//!
//! Maps raw button ids and d-pad angles to crossbar slots 1-8.
//!
//! Resolution is a pure lookup against a [`DeviceProfile`]. It does not know
//! about combo modes or whether a button was already pressed; edge handling
//! belongs to the caller.
//!
//! ## D-Pad Angles
//!
//! Hat switches report a POV angle in hundredths of a degree, clockwise from
//! up (0, 4500, 9000, ... 31500). Anything outside `0..36000` is treated as
//! the centered sentinel. Angles are bucketed to the nearest cardinal
//! direction, with exact diagonals rounding clockwise.
//!
//! ```
//! use crossbar_input::controller::slot::{hat_direction, HatDirection};
//!
//! assert_eq!(hat_direction(0), Some(HatDirection::Up));
//! assert_eq!(hat_direction(9000), Some(HatDirection::Right));
//! assert_eq!(hat_direction(4500), Some(HatDirection::Right));
//! assert_eq!(hat_direction(-1), None);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::profile::{ButtonRole, DeviceProfile, HatSlots};

/// Value reported by a hat switch at rest.
pub const POV_CENTERED: i32 = -1;

/// One full turn in POV units (hundredths of a degree).
pub const POV_FULL_TURN: i32 = 36_000;

/// POV units per cardinal bucket.
const POV_QUARTER: i32 = POV_FULL_TURN / 4;

/// Number of addressable slots per combo mode.
pub const SLOT_COUNT: usize = 8;

/// Error returned for slot numbers outside 1-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("slot index {0} is out of range (must be 1-8)")]
pub struct InvalidSlotIndex(pub u8);

/// A crossbar slot number, always in `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Lowest slot number.
    pub const MIN: u8 = 1;
    /// Highest slot number.
    pub const MAX: u8 = SLOT_COUNT as u8;

    /// Creates a slot index, returning `None` outside `1..=8`.
    #[must_use]
    pub fn new(index: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&index).then_some(Self(index))
    }

    /// Returns the 1-based slot number.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Returns the 0-based position, for array storage.
    #[must_use]
    pub(crate) fn position(self) -> usize {
        usize::from(self.0 - Self::MIN)
    }

    /// Iterates over all eight slots.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (Self::MIN..=Self::MAX).map(SlotIndex)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = InvalidSlotIndex;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SlotIndex::new(value).ok_or(InvalidSlotIndex(value))
    }
}

impl From<SlotIndex> for u8 {
    fn from(slot: SlotIndex) -> Self {
        slot.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cardinal direction of a hat switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatDirection {
    Up,
    Right,
    Down,
    Left,
}

/// Buckets a POV angle into a cardinal direction.
///
/// Returns `None` for the centered sentinel or any out-of-range value.
#[must_use]
pub fn hat_direction(angle: i32) -> Option<HatDirection> {
    if !(0..POV_FULL_TURN).contains(&angle) {
        return None;
    }

    let bucket = ((angle + POV_QUARTER / 2) / POV_QUARTER) % 4;
    match bucket {
        0 => Some(HatDirection::Up),
        1 => Some(HatDirection::Right),
        2 => Some(HatDirection::Down),
        _ => Some(HatDirection::Left),
    }
}

/// Resolves a hat angle with an explicit slot table.
#[must_use]
pub fn resolve_hat(slots: &HatSlots, angle: i32) -> Option<SlotIndex> {
    hat_direction(angle).map(|direction| slots.slot(direction))
}

/// Resolves a discrete button to its slot.
///
/// Buttons the profile does not map, or maps to a non-slot role, resolve to
/// `None`.
#[must_use]
pub fn resolve_button(profile: &DeviceProfile, button_id: u32) -> Option<SlotIndex> {
    match profile.button_role(button_id)? {
        ButtonRole::Slot { slot } => Some(*slot),
        _ => None,
    }
}
