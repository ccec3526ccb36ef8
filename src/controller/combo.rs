//! # Combo State Machine Module
//!
//! Turns the held state of the two triggers into a single [`ComboMode`].
//!
//! ## Modes
//!
//! | Mode | Gesture |
//! |------|---------|
//! | `None` | Both triggers released |
//! | `L2` / `R2` | One trigger held |
//! | `L2x2` / `R2x2` | One trigger pressed again shortly after a full release |
//! | `L2R2` | L2 held, then R2 added (expanded) |
//! | `R2L2` | R2 held, then L2 added (expanded) |
//!
//! The machine only reacts to samples where at least one trigger changed.
//! Rules are checked in order: both held, only left held, only right held,
//! neither held.
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use crossbar_input::controller::combo::{ComboMode, ComboStateMachine};
//! use crossbar_input::controller::hysteresis::TriggerPair;
//!
//! let now = Instant::now();
//! let mut triggers = TriggerPair::new(30, 15);
//! let mut machine = ComboStateMachine::new(true, true, Duration::from_millis(300));
//!
//! triggers.right.update(255, now);
//! machine.update(&mut triggers, now);
//! triggers.left.update(255, now);
//! machine.update(&mut triggers, now);
//!
//! assert_eq!(machine.mode(), ComboMode::R2L2);
//! ```

use serde::Serialize;
use std::time::{Duration, Instant};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use super::hysteresis::{TriggerChannel, TriggerPair};

/// One of the two physical triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum TriggerSide {
    /// Left trigger (L2).
    #[strum(serialize = "L")]
    Left,
    /// Right trigger (R2).
    #[strum(serialize = "R")]
    Right,
}

impl TriggerSide {
    /// Returns the opposite trigger.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            TriggerSide::Left => TriggerSide::Right,
            TriggerSide::Right => TriggerSide::Left,
        }
    }
}

/// The currently recognised trigger gesture.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, IntoStaticStr, Serialize,
)]
pub enum ComboMode {
    /// No trigger held.
    #[default]
    #[strum(serialize = "none")]
    #[serde(rename = "none")]
    None,
    /// Left trigger held.
    L2,
    /// Right trigger held.
    R2,
    /// Left trigger held first, then right.
    L2R2,
    /// Right trigger held first, then left.
    R2L2,
    /// Left trigger double-tapped.
    L2x2,
    /// Right trigger double-tapped.
    R2x2,
}

impl ComboMode {
    /// Single-trigger mode for a side.
    #[must_use]
    pub fn single(side: TriggerSide) -> Self {
        match side {
            TriggerSide::Left => ComboMode::L2,
            TriggerSide::Right => ComboMode::R2,
        }
    }

    /// Double-tap mode for a side.
    #[must_use]
    pub fn double(side: TriggerSide) -> Self {
        match side {
            TriggerSide::Left => ComboMode::L2x2,
            TriggerSide::Right => ComboMode::R2x2,
        }
    }

    /// Returns true for every mode except `None`.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != ComboMode::None
    }

    /// Returns true for the two-trigger modes.
    #[must_use]
    pub fn is_expanded(self) -> bool {
        matches!(self, ComboMode::L2R2 | ComboMode::R2L2)
    }

    /// Returns the double-tapped side, if this is a double-tap mode.
    #[must_use]
    pub fn double_tap_side(self) -> Option<TriggerSide> {
        match self {
            ComboMode::L2x2 => Some(TriggerSide::Left),
            ComboMode::R2x2 => Some(TriggerSide::Right),
            _ => None,
        }
    }

    /// Returns the trigger that leads this mode.
    #[must_use]
    pub fn first_side(self) -> Option<TriggerSide> {
        match self {
            ComboMode::None => None,
            ComboMode::L2 | ComboMode::L2R2 | ComboMode::L2x2 => Some(TriggerSide::Left),
            ComboMode::R2 | ComboMode::R2L2 | ComboMode::R2x2 => Some(TriggerSide::Right),
        }
    }
}

/// A combo that is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboSession {
    /// Current mode of the session (never `None`).
    pub mode: ComboMode,
    /// When the session left `None`.
    pub entered_at: Instant,
    /// Trigger leading the current mode.
    pub first_trigger: TriggerSide,
}

/// A mode change reported by [`ComboStateMachine::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboTransition {
    /// Mode before the sample.
    pub from: ComboMode,
    /// Mode after the sample.
    pub to: ComboMode,
    /// Side whose double-tap was recognised by this transition.
    pub double_tap: Option<TriggerSide>,
}

impl ComboTransition {
    /// Returns true if the transition started a combo.
    #[must_use]
    pub fn entered(&self) -> bool {
        self.from == ComboMode::None && self.to.is_active()
    }

    /// Returns true if the transition ended the combo.
    #[must_use]
    pub fn exited(&self) -> bool {
        self.from.is_active() && self.to == ComboMode::None
    }
}

/// Finite-state machine over the trigger pair.
#[derive(Debug, Clone)]
pub struct ComboStateMachine {
    mode: ComboMode,
    session: Option<ComboSession>,
    prev_left: bool,
    prev_right: bool,
    expanded_enabled: bool,
    double_tap_enabled: bool,
    double_tap_window: Duration,
}

impl ComboStateMachine {
    /// Creates a machine in `None`.
    #[must_use]
    pub fn new(expanded_enabled: bool, double_tap_enabled: bool, double_tap_window: Duration) -> Self {
        Self {
            mode: ComboMode::None,
            session: None,
            prev_left: false,
            prev_right: false,
            expanded_enabled,
            double_tap_enabled,
            double_tap_window,
        }
    }

    /// Returns the active mode.
    #[must_use]
    pub fn mode(&self) -> ComboMode {
        self.mode
    }

    /// Returns the live session, if a combo is active.
    #[must_use]
    pub fn session(&self) -> Option<&ComboSession> {
        self.session.as_ref()
    }

    /// Enables or disables the two-trigger modes.
    pub fn set_expanded_enabled(&mut self, enabled: bool) {
        self.expanded_enabled = enabled;
    }

    /// Enables or disables double-tap recognition.
    pub fn set_double_tap_enabled(&mut self, enabled: bool) {
        self.double_tap_enabled = enabled;
    }

    /// Replaces the double-tap window.
    pub fn set_double_tap_window(&mut self, window: Duration) {
        self.double_tap_window = window;
    }

    /// Re-evaluates the mode after the trigger channels were updated.
    ///
    /// Returns `None` if neither trigger changed since the previous call, or
    /// if the change did not move the mode.
    pub fn update(&mut self, triggers: &mut TriggerPair, now: Instant) -> Option<ComboTransition> {
        let left = triggers.left.is_held();
        let right = triggers.right.is_held();
        if left == self.prev_left && right == self.prev_right {
            return None;
        }

        let left_pressed = left && !self.prev_left;
        let right_pressed = right && !self.prev_right;
        self.prev_left = left;
        self.prev_right = right;

        let from = self.mode;
        let to = match (left, right) {
            (true, true) => self.both_held(from, left_pressed, right_pressed),
            (true, false) => self.single_held(TriggerSide::Left, left_pressed, from, &mut triggers.left, now),
            (false, true) => self.single_held(TriggerSide::Right, right_pressed, from, &mut triggers.right, now),
            (false, false) => {
                triggers.left.disarm_double_tap();
                triggers.right.disarm_double_tap();
                ComboMode::None
            }
        };

        if to == from {
            return None;
        }

        self.mode = to;
        self.session = match to.first_side() {
            None => None,
            Some(first_trigger) => Some(ComboSession {
                mode: to,
                entered_at: self.session.map_or(now, |s| s.entered_at),
                first_trigger,
            }),
        };

        let double_tap = to.double_tap_side();
        if let Some(side) = double_tap {
            debug!("Double-tap recognised on {} trigger", side);
        }
        debug!("Combo mode {} -> {}", from, to);

        Some(ComboTransition { from, to, double_tap })
    }

    /// Both triggers held after this sample.
    fn both_held(&self, from: ComboMode, left_pressed: bool, right_pressed: bool) -> ComboMode {
        // Ties (and a missing prior mode) go to the left trigger.
        if (left_pressed && right_pressed) || from == ComboMode::None {
            return if self.expanded_enabled {
                ComboMode::L2R2
            } else {
                ComboMode::L2
            };
        }

        if !self.expanded_enabled {
            return from;
        }

        match (left_pressed, from.first_side()) {
            (true, Some(TriggerSide::Right)) => ComboMode::R2L2,
            (false, Some(TriggerSide::Left)) => ComboMode::L2R2,
            _ => from,
        }
    }

    /// Exactly one trigger held after this sample.
    fn single_held(
        &self,
        side: TriggerSide,
        just_pressed: bool,
        from: ComboMode,
        channel: &mut TriggerChannel,
        now: Instant,
    ) -> ComboMode {
        if !just_pressed {
            // The other trigger let go; fall back to this side's own mode.
            return if from.first_side() == Some(side) && !from.is_expanded() {
                from
            } else {
                ComboMode::single(side)
            };
        }

        if from == ComboMode::None && self.within_double_tap_window(channel, now) {
            channel.arm_double_tap();
            ComboMode::double(side)
        } else {
            ComboMode::single(side)
        }
    }

    fn within_double_tap_window(&self, channel: &TriggerChannel, now: Instant) -> bool {
        if !self.double_tap_enabled || self.double_tap_window.is_zero() {
            return false;
        }

        channel
            .last_release()
            .and_then(|released| now.checked_duration_since(released))
            .is_some_and(|elapsed| elapsed <= self.double_tap_window)
    }

    /// Returns to `None` and forgets the previous samples.
    pub fn reset(&mut self) {
        self.mode = ComboMode::None;
        self.session = None;
        self.prev_left = false;
        self.prev_right = false;
    }
}
