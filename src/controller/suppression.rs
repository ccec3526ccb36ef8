//! # Suppression Module
//!
//! Hides the inputs the classifier owns from the host's native handling.
//!
//! Suppression starts as soon as either trigger is held, before a combo mode
//! is reported, so the host never sees even one frame of the trigger press.
//! On the polled path the host's state buffer is edited in place; on the
//! event path the handler reports whether the event should be consumed.

use tracing::{info, warn};

use super::combo::ComboMode;

/// XInput-shaped gamepad state, as handed over by a polling host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadSnapshot {
    /// Button bitmask (`wButtons`).
    pub buttons: u16,
    /// Left trigger magnitude (0-255).
    pub left_trigger: u8,
    /// Right trigger magnitude (0-255).
    pub right_trigger: u8,
    /// Left stick X (negative = left).
    pub thumb_lx: i16,
    /// Left stick Y (negative = down).
    pub thumb_ly: i16,
    /// Right stick X (negative = left).
    pub thumb_rx: i16,
    /// Right stick Y (negative = down).
    pub thumb_ry: i16,
}

/// What to hide from the host for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressionInstruction {
    /// Zero both trigger magnitudes.
    pub zero_triggers: bool,
    /// Button bits to clear.
    pub mask_buttons: u16,
}

impl SuppressionInstruction {
    /// Instruction that leaves the sample untouched.
    pub const PASS: Self = Self {
        zero_triggers: false,
        mask_buttons: 0,
    };

    /// Returns true if anything will be hidden.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.zero_triggers || self.mask_buttons != 0
    }

    /// Applies the instruction to a snapshot in place.
    pub fn apply_to(&self, state: &mut GamepadSnapshot) {
        if self.zero_triggers {
            state.left_trigger = 0;
            state.right_trigger = 0;
        }
        state.buttons &= !self.mask_buttons;
    }
}

/// Decides and performs suppression.
#[derive(Debug, Clone, Default)]
pub struct SuppressionGate {
    owned_buttons: u16,
    buffer_unavailable: bool,
}

impl SuppressionGate {
    /// Creates a gate owning the given button bits.
    #[must_use]
    pub fn new(owned_buttons: u16) -> Self {
        Self {
            owned_buttons,
            buffer_unavailable: false,
        }
    }

    /// Replaces the owned button bits, e.g. after a profile change.
    pub fn set_owned_buttons(&mut self, owned_buttons: u16) {
        self.owned_buttons = owned_buttons;
    }

    /// Returns true while inputs must be hidden from the host.
    #[must_use]
    pub fn should_suppress(mode: ComboMode, left_held: bool, right_held: bool) -> bool {
        mode.is_active() || left_held || right_held
    }

    /// Builds the instruction for one polled sample.
    #[must_use]
    pub fn evaluate(&self, mode: ComboMode, left_held: bool, right_held: bool) -> SuppressionInstruction {
        if Self::should_suppress(mode, left_held, right_held) {
            SuppressionInstruction {
                zero_triggers: true,
                mask_buttons: self.owned_buttons,
            }
        } else {
            SuppressionInstruction::PASS
        }
    }

    /// Applies an instruction to the host's buffer, if the host provided one.
    ///
    /// Returns whether the buffer was edited. A missing buffer is logged once
    /// per stretch of missing buffers.
    pub fn apply(&mut self, instruction: &SuppressionInstruction, buffer: Option<&mut GamepadSnapshot>) -> bool {
        let Some(state) = buffer else {
            if instruction.is_active() && !self.buffer_unavailable {
                warn!("Host state buffer unavailable, input suppression disabled");
                self.buffer_unavailable = true;
            }
            return false;
        };

        if self.buffer_unavailable {
            info!("Host state buffer available again, input suppression restored");
            self.buffer_unavailable = false;
        }

        if !instruction.is_active() {
            return false;
        }
        instruction.apply_to(state);
        true
    }

    /// Returns true while the missing-buffer condition is in effect.
    #[must_use]
    pub fn buffer_unavailable(&self) -> bool {
        self.buffer_unavailable
    }
}
