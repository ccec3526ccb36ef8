//! # Trigger Hysteresis Module
//!
//! Converts raw trigger readings into a stable held/released state.
//!
//! Two thresholds form a hysteresis band: a released trigger becomes held
//! only at or above `press_threshold`, and a held trigger is released only
//! once it drops below `release_threshold`. Readings that wobble inside the
//! band keep whatever state the trigger already had.
//!
//! Digital triggers (a trigger reported as a plain button) go through the
//! exact same function with a raw value of `0` or [`DISCRETE_PRESSED`].
//!
//! ## Usage
//!
//! ```
//! use crossbar_input::controller::hysteresis::held;
//!
//! // Released trigger inside the band stays released
//! assert!(!held(20, false, 30, 15));
//! // Held trigger inside the band stays held
//! assert!(held(20, true, 30, 15));
//! ```

use std::time::Instant;

use super::combo::TriggerSide;

/// Raw value reported for a trigger that is delivered as a button.
pub const DISCRETE_PRESSED: u8 = u8::MAX;

/// Default press threshold on the 0-255 trigger scale.
pub const DEFAULT_PRESS_THRESHOLD: u8 = 30;

/// Default release threshold on the 0-255 trigger scale.
pub const DEFAULT_RELEASE_THRESHOLD: u8 = 15;

/// Computes the next held state of a trigger.
///
/// # Arguments
///
/// * `raw` - Trigger magnitude (0-255)
/// * `was_held` - Held state before this reading
/// * `press_threshold` - Minimum value to become held
/// * `release_threshold` - Minimum value to stay held
#[must_use]
#[inline]
pub fn held(raw: u8, was_held: bool, press_threshold: u8, release_threshold: u8) -> bool {
    if was_held {
        raw >= release_threshold
    } else {
        raw >= press_threshold
    }
}

/// Edge produced by a trigger channel update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    /// Trigger crossed the press threshold.
    Pressed,
    /// Trigger dropped below the release threshold.
    Released,
}

/// State of one physical trigger.
///
/// Tracks the held flag, the thresholds it was configured with, the time of
/// its last full release and whether its current hold was recognised as the
/// second tap of a double-tap.
#[derive(Debug, Clone)]
pub struct TriggerChannel {
    held: bool,
    press_threshold: u8,
    release_threshold: u8,
    last_release: Option<Instant>,
    double_tap_armed: bool,
}

impl Default for TriggerChannel {
    fn default() -> Self {
        Self::new(DEFAULT_PRESS_THRESHOLD, DEFAULT_RELEASE_THRESHOLD)
    }
}

impl TriggerChannel {
    /// Creates a released channel.
    ///
    /// Callers are expected to pass thresholds that already satisfy
    /// `release_threshold < press_threshold`; see
    /// [`ClassifierOptions::sanitized`](crate::config::ClassifierOptions::sanitized).
    #[must_use]
    pub fn new(press_threshold: u8, release_threshold: u8) -> Self {
        Self {
            held: false,
            press_threshold,
            release_threshold,
            last_release: None,
            double_tap_armed: false,
        }
    }

    /// Returns whether the trigger is currently held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Returns the time of the most recent release edge, if any.
    #[must_use]
    pub fn last_release(&self) -> Option<Instant> {
        self.last_release
    }

    /// Returns whether the current hold counts as a double-tap.
    #[must_use]
    pub fn double_tap_armed(&self) -> bool {
        self.double_tap_armed
    }

    pub(crate) fn arm_double_tap(&mut self) {
        self.double_tap_armed = true;
    }

    pub(crate) fn disarm_double_tap(&mut self) {
        self.double_tap_armed = false;
    }

    /// Feeds a raw reading and returns the edge it caused, if any.
    ///
    /// A release edge records `now` as the last release and disarms the
    /// double-tap flag.
    pub fn update(&mut self, raw: u8, now: Instant) -> Option<TriggerEdge> {
        let next = held(raw, self.held, self.press_threshold, self.release_threshold);
        if next == self.held {
            return None;
        }
        self.held = next;

        if next {
            Some(TriggerEdge::Pressed)
        } else {
            self.last_release = Some(now);
            self.double_tap_armed = false;
            Some(TriggerEdge::Released)
        }
    }

    /// Forgets held state and release history.
    pub fn reset(&mut self) {
        self.held = false;
        self.last_release = None;
        self.double_tap_armed = false;
    }
}

/// The left and right trigger channels of one input source.
#[derive(Debug, Clone, Default)]
pub struct TriggerPair {
    /// Left trigger (L2).
    pub left: TriggerChannel,
    /// Right trigger (R2).
    pub right: TriggerChannel,
}

impl TriggerPair {
    /// Creates a pair sharing the same thresholds.
    #[must_use]
    pub fn new(press_threshold: u8, release_threshold: u8) -> Self {
        Self {
            left: TriggerChannel::new(press_threshold, release_threshold),
            right: TriggerChannel::new(press_threshold, release_threshold),
        }
    }

    /// Returns the channel for one side.
    #[must_use]
    pub fn get(&self, side: TriggerSide) -> &TriggerChannel {
        match side {
            TriggerSide::Left => &self.left,
            TriggerSide::Right => &self.right,
        }
    }

    /// Returns the mutable channel for one side.
    pub fn get_mut(&mut self, side: TriggerSide) -> &mut TriggerChannel {
        match side {
            TriggerSide::Left => &mut self.left,
            TriggerSide::Right => &mut self.right,
        }
    }

    /// Returns whether either trigger is held.
    #[must_use]
    pub fn any_held(&self) -> bool {
        self.left.held || self.right.held
    }

    /// Resets both channels.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ==================== held() Tests ====================

    #[test]
    fn test_released_trigger_needs_press_threshold() {
        assert!(!held(20, false, 30, 15));
        assert!(!held(29, false, 30, 15));
        assert!(held(30, false, 30, 15));
        assert!(held(255, false, 30, 15));
    }

    #[test]
    fn test_held_trigger_uses_release_threshold() {
        assert!(held(20, true, 30, 15));
        assert!(held(15, true, 30, 15));
        assert!(!held(14, true, 30, 15));
        assert!(!held(0, true, 30, 15));
    }

    #[test]
    fn test_monotonic_over_full_range() {
        for raw in 0..=u8::MAX {
            assert_eq!(held(raw, false, 30, 15), raw >= 30, "raw {} from released", raw);
            assert_eq!(held(raw, true, 30, 15), raw >= 15, "raw {} from held", raw);
        }
    }

    #[test]
    fn test_discrete_values_share_code_path() {
        assert!(held(DISCRETE_PRESSED, false, 30, 15));
        assert!(!held(0, true, 30, 15));
    }

    // ==================== TriggerChannel Tests ====================

    #[test]
    fn test_channel_press_and_release_edges() {
        let now = Instant::now();
        let mut channel = TriggerChannel::new(30, 15);

        assert_eq!(channel.update(10, now), None);
        assert_eq!(channel.update(40, now), Some(TriggerEdge::Pressed));
        assert!(channel.is_held());
        assert_eq!(channel.update(20, now), None);
        assert!(channel.is_held());

        let later = now + Duration::from_millis(50);
        assert_eq!(channel.update(5, later), Some(TriggerEdge::Released));
        assert!(!channel.is_held());
        assert_eq!(channel.last_release(), Some(later));
    }

    #[test]
    fn test_channel_no_chatter_inside_band() {
        let now = Instant::now();
        let mut channel = TriggerChannel::new(30, 15);
        channel.update(200, now);

        for raw in [29, 16, 25, 15, 28] {
            assert_eq!(channel.update(raw, now), None);
        }
        assert!(channel.is_held());
    }

    #[test]
    fn test_release_disarms_double_tap() {
        let now = Instant::now();
        let mut channel = TriggerChannel::default();
        channel.update(255, now);
        channel.arm_double_tap();
        assert!(channel.double_tap_armed());

        channel.update(0, now);
        assert!(!channel.double_tap_armed());
    }

    #[test]
    fn test_channel_reset() {
        let now = Instant::now();
        let mut channel = TriggerChannel::default();
        channel.update(255, now);
        channel.update(0, now);
        channel.reset();

        assert!(!channel.is_held());
        assert_eq!(channel.last_release(), None);
    }

    // ==================== TriggerPair Tests ====================

    #[test]
    fn test_pair_side_access() {
        let now = Instant::now();
        let mut pair = TriggerPair::new(30, 15);
        assert!(!pair.any_held());

        pair.get_mut(TriggerSide::Right).update(100, now);
        assert!(pair.get(TriggerSide::Right).is_held());
        assert!(!pair.get(TriggerSide::Left).is_held());
        assert!(pair.any_held());

        pair.reset();
        assert!(!pair.any_held());
    }
}
