//! # Event Adapter Module
//!
//! Normalizes discrete event delivery (DirectInput / evdev style).
//!
//! Events arrive one control at a time and carry their own edges, with two
//! exceptions handled here:
//!
//! - Triggers may arrive as buttons or as analog axes with device-specific
//!   ranges. Both are converted to the 0-255 scale so they can go through
//!   the same hysteresis as the polled path.
//! - A d-pad hat reports one rotating angle. Moving it from one direction to
//!   another is a release of the old slot followed by a press of the new one.
//!
//! The adapter also remembers which presses were consumed, so the host never
//! receives a release for a press it did not see, nor misses the release of a
//! press it did see.

use std::collections::BTreeSet;

use super::hysteresis::DISCRETE_PRESSED;
use super::slot::SlotIndex;

/// Raw trigger value for a trigger delivered as a button.
#[must_use]
pub fn discrete_trigger_value(pressed: bool) -> u8 {
    if pressed {
        DISCRETE_PRESSED
    } else {
        0
    }
}

/// Scales an analog trigger value from `min..=max` to 0-255.
///
/// Values outside the range are clamped. A degenerate range (`max <= min`)
/// reads as released.
///
/// # Examples
///
/// ```
/// use crossbar_input::controller::event::normalize_trigger_axis;
///
/// assert_eq!(normalize_trigger_axis(0, 0, 255), 0);
/// assert_eq!(normalize_trigger_axis(255, 0, 255), 255);
/// assert_eq!(normalize_trigger_axis(65535, 0, 65535), 255);
/// assert_eq!(normalize_trigger_axis(512, 0, 1023), 128);
/// ```
#[must_use]
pub fn normalize_trigger_axis(value: i32, min: i32, max: i32) -> u8 {
    if max <= min {
        return 0;
    }

    let span = i64::from(max) - i64::from(min);
    let offset = i64::from(value.clamp(min, max)) - i64::from(min);
    // Round to nearest on the 0-255 scale
    let scaled = (offset * 255 + span / 2) / span;

    u8::try_from(scaled).unwrap_or(u8::MAX)
}

/// Slot edges caused by one hat movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HatChange {
    /// Slot the hat left.
    pub released: Option<SlotIndex>,
    /// Slot the hat entered.
    pub pressed: Option<SlotIndex>,
}

/// Per-source state of the event path.
#[derive(Debug, Clone, Default)]
pub struct EventAdapter {
    hat_slot: Option<SlotIndex>,
    hat_consumed: bool,
    consumed_buttons: BTreeSet<u32>,
}

impl EventAdapter {
    /// Creates an adapter with the hat centered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot the hat currently points at.
    #[must_use]
    pub fn hat_slot(&self) -> Option<SlotIndex> {
        self.hat_slot
    }

    /// Records the hat's new slot and returns the resulting edges.
    ///
    /// Returns `None` when the hat still resolves to the same slot, which is
    /// how repeated angle reports are debounced.
    pub fn hat_moved(&mut self, slot: Option<SlotIndex>) -> Option<HatChange> {
        if slot == self.hat_slot {
            return None;
        }

        let change = HatChange {
            released: self.hat_slot,
            pressed: slot,
        };
        self.hat_slot = slot;
        Some(change)
    }

    /// Decides whether a button event is consumed.
    ///
    /// A press is consumed while suppression is in effect. A release is
    /// consumed exactly when its press was.
    pub fn settle_button(&mut self, id: u32, pressed: bool, suppressing: bool) -> bool {
        if pressed {
            if suppressing {
                self.consumed_buttons.insert(id);
            }
            suppressing
        } else {
            self.consumed_buttons.remove(&id)
        }
    }

    /// Decides whether a hat event is consumed, with the same pairing rule as
    /// [`settle_button`](Self::settle_button). Pointing the hat somewhere new
    /// counts as a press; centering it counts as a release.
    pub fn settle_hat(&mut self, centered: bool, suppressing: bool) -> bool {
        if centered {
            std::mem::take(&mut self.hat_consumed)
        } else {
            self.hat_consumed = suppressing;
            suppressing
        }
    }

    /// Returns true if the hat's current direction was hidden from the host.
    #[must_use]
    pub fn hat_consumed(&self) -> bool {
        self.hat_consumed
    }

    /// Centers the hat and forgets consumed presses.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
