//! # Combo Classifier Module
//!
//! Owns the complete classifier state of one input source and exposes the
//! operations a host drives it with.
//!
//! Every piece of state (trigger channels, combo FSM, held slots, adapters and
//! the activation queue) lives in one [`ComboClassifier`] value, so a process
//! can classify several devices side by side without shared globals.
//!
//! ## Usage
//!
//! ```
//! use std::time::Instant;
//! use crossbar_input::config::ClassifierOptions;
//! use crossbar_input::controller::classifier::ComboClassifier;
//! use crossbar_input::controller::combo::ComboMode;
//! use crossbar_input::controller::profile::{xinput, DeviceProfile};
//! use crossbar_input::controller::suppression::GamepadSnapshot;
//!
//! let mut classifier = ComboClassifier::new(DeviceProfile::xinput(), ClassifierOptions::default());
//!
//! let mut state = GamepadSnapshot { left_trigger: 200, buttons: xinput::A, ..Default::default() };
//! let instruction = classifier.on_polling_sample(Some(&state));
//! classifier.apply_suppression(&instruction, Some(&mut state));
//!
//! assert_eq!(classifier.active_combo(), ComboMode::L2);
//! assert_eq!(state.left_trigger, 0);
//!
//! // Activations run on the host's next tick, never inside input handling
//! let mut slots = Vec::new();
//! classifier.flush_activations(&mut |a: crossbar_input::controller::dispatch::SlotActivation| {
//!     slots.push(a.slot.get())
//! });
//! assert_eq!(slots, vec![7]);
//! ```

use std::time::Instant;
use tracing::{debug, info, trace};

use crate::config::ClassifierOptions;

use super::combo::{ComboMode, ComboSession, ComboStateMachine, TriggerSide};
use super::dispatch::{ActivationDispatcher, ActivationQueue, HeldButtonSet, SlotActivationSink, SlotSource};
use super::event::{discrete_trigger_value, normalize_trigger_axis, EventAdapter};
use super::hysteresis::TriggerPair;
use super::polling::PollingAdapter;
use super::profile::{AxisRole, ButtonRole, DeviceProfile};
use super::slot::{resolve_button, resolve_hat, SlotIndex};
use super::suppression::{GamepadSnapshot, SuppressionGate, SuppressionInstruction};

/// Classifier state for one input source.
#[derive(Debug)]
pub struct ComboClassifier {
    profile: DeviceProfile,
    options: ClassifierOptions,
    triggers: TriggerPair,
    combo: ComboStateMachine,
    dispatcher: ActivationDispatcher,
    gate: SuppressionGate,
    polling: PollingAdapter,
    events: EventAdapter,
    queue: ActivationQueue,
}

impl Default for ComboClassifier {
    fn default() -> Self {
        Self::new(DeviceProfile::default(), ClassifierOptions::default())
    }
}

impl ComboClassifier {
    /// Creates a classifier for a device profile.
    ///
    /// Unusable options are corrected to defaults, see
    /// [`ClassifierOptions::sanitized`].
    #[must_use]
    pub fn new(profile: DeviceProfile, options: ClassifierOptions) -> Self {
        let options = options.sanitized();
        debug!("Classifier initialized for profile {}", profile.name());

        Self {
            triggers: TriggerPair::new(options.press_threshold, options.release_threshold),
            combo: ComboStateMachine::new(
                options.expanded_combo_enabled,
                options.double_tap_enabled,
                options.double_tap_window(),
            ),
            dispatcher: ActivationDispatcher::new(options.min_pressed_display()),
            gate: SuppressionGate::new(profile.slot_button_mask()),
            polling: PollingAdapter::new(),
            events: EventAdapter::new(),
            queue: ActivationQueue::new(),
            profile,
            options,
        }
    }

    // ---------------------------------------------------------------------
    // Polled delivery
    // ---------------------------------------------------------------------

    /// Classifies one full-state sample taken now.
    pub fn on_polling_sample(&mut self, sample: Option<&GamepadSnapshot>) -> SuppressionInstruction {
        self.on_polling_sample_at(sample, Instant::now())
    }

    /// Classifies one full-state sample.
    ///
    /// A missing sample counts as no input this tick: nothing changes and the
    /// host's state is passed through untouched.
    pub fn on_polling_sample_at(&mut self, sample: Option<&GamepadSnapshot>, now: Instant) -> SuppressionInstruction {
        let Some(sample) = sample else {
            trace!("Skipping malformed polling sample");
            return SuppressionInstruction::PASS;
        };

        self.triggers.left.update(sample.left_trigger, now);
        self.triggers.right.update(sample.right_trigger, now);
        self.update_combo(now);

        for edge in self.polling.button_edges(sample.buttons) {
            if let Some(slot) = resolve_button(&self.profile, u32::from(edge.button)) {
                self.dispatch_edge(slot, edge.pressed, SlotSource::Button, now);
            }
        }

        self.gate.evaluate(
            self.combo.mode(),
            self.triggers.left.is_held(),
            self.triggers.right.is_held(),
        )
    }

    /// Applies a suppression instruction to the host's state buffer.
    ///
    /// The buffer is only borrowed for this call. Returns whether it was
    /// edited.
    pub fn apply_suppression(
        &mut self,
        instruction: &SuppressionInstruction,
        buffer: Option<&mut GamepadSnapshot>,
    ) -> bool {
        self.gate.apply(instruction, buffer)
    }

    // ---------------------------------------------------------------------
    // Event delivery
    // ---------------------------------------------------------------------

    /// Handles one discrete button event seen now.
    pub fn on_discrete_button_event(&mut self, button_id: u32, pressed: bool) -> bool {
        self.on_discrete_button_event_at(button_id, pressed, Instant::now())
    }

    /// Handles one discrete button event.
    ///
    /// Returns true if the event must be hidden from the host. Unmapped
    /// buttons and shoulder buttons always pass through. Trigger mirrors are
    /// hidden with their axis but leave the trigger state alone.
    pub fn on_discrete_button_event_at(&mut self, button_id: u32, pressed: bool, now: Instant) -> bool {
        let Some(&role) = self.profile.button_role(button_id) else {
            return false;
        };

        match role {
            ButtonRole::LeftShoulder | ButtonRole::RightShoulder => return false,
            ButtonRole::LeftTrigger => {
                self.triggers.left.update(discrete_trigger_value(pressed), now);
                self.update_combo(now);
            }
            ButtonRole::RightTrigger => {
                self.triggers.right.update(discrete_trigger_value(pressed), now);
                self.update_combo(now);
            }
            ButtonRole::LeftTriggerMirror | ButtonRole::RightTriggerMirror => {}
            ButtonRole::Slot { slot } => self.dispatch_edge(slot, pressed, SlotSource::Button, now),
        }

        let suppressing = self.is_suppressing();
        self.events.settle_button(button_id, pressed, suppressing)
    }

    /// Handles one axis event seen now.
    pub fn on_axis_event(&mut self, axis_id: u32, value: i32) -> bool {
        self.on_axis_event_at(axis_id, value, Instant::now())
    }

    /// Handles one axis event (analog trigger value or hat angle).
    ///
    /// Returns true if the event must be hidden from the host.
    pub fn on_axis_event_at(&mut self, axis_id: u32, value: i32, now: Instant) -> bool {
        let Some(&role) = self.profile.axis_role(axis_id) else {
            return false;
        };

        match role {
            AxisRole::LeftTrigger { min, max } => self.on_trigger_axis(TriggerSide::Left, value, min, max, now),
            AxisRole::RightTrigger { min, max } => self.on_trigger_axis(TriggerSide::Right, value, min, max, now),
            AxisRole::Hat { slots } => {
                let slot = resolve_hat(&slots, value);
                let Some(change) = self.events.hat_moved(slot) else {
                    // Same direction reported again
                    return self.events.hat_consumed();
                };

                if let Some(released) = change.released {
                    self.dispatch_edge(released, false, SlotSource::Hat, now);
                }
                if let Some(pressed) = change.pressed {
                    self.dispatch_edge(pressed, true, SlotSource::Hat, now);
                }

                let suppressing = self.is_suppressing();
                self.events.settle_hat(slot.is_none(), suppressing)
            }
        }
    }

    fn on_trigger_axis(&mut self, side: TriggerSide, value: i32, min: i32, max: i32, now: Instant) -> bool {
        let was_suppressing = self.is_suppressing();
        self.triggers.get_mut(side).update(normalize_trigger_axis(value, min, max), now);
        self.update_combo(now);
        // Trigger values are absolute, so the release sample is hidden too
        was_suppressing || self.is_suppressing()
    }

    // ---------------------------------------------------------------------
    // Shared classification
    // ---------------------------------------------------------------------

    fn update_combo(&mut self, now: Instant) {
        if let Some(transition) = self.combo.update(&mut self.triggers, now) {
            if transition.exited() {
                self.dispatcher.end_session();
            }
        }
    }

    fn dispatch_edge(&mut self, slot: SlotIndex, pressed: bool, source: SlotSource, now: Instant) {
        if let Some(activation) = self.dispatcher.on_slot_edge(self.combo.mode(), slot, pressed, source, now) {
            self.queue.push(activation);
        }
    }

    /// Returns true while owned inputs are hidden from the host.
    #[must_use]
    pub fn is_suppressing(&self) -> bool {
        SuppressionGate::should_suppress(
            self.combo.mode(),
            self.triggers.left.is_held(),
            self.triggers.right.is_held(),
        )
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    /// Switches to another device profile and resets all state.
    pub fn set_device_profile(&mut self, profile: DeviceProfile) {
        info!("Switching device profile to {}", profile.name());
        self.gate.set_owned_buttons(profile.slot_button_mask());
        self.profile = profile;
        self.reset();
    }

    /// Enables or disables double-tap recognition.
    pub fn set_double_tap_enabled(&mut self, enabled: bool) {
        self.options.double_tap_enabled = enabled;
        self.combo.set_double_tap_enabled(enabled);
    }

    /// Enables or disables the two-trigger modes.
    pub fn set_expanded_combo_enabled(&mut self, enabled: bool) {
        self.options.expanded_combo_enabled = enabled;
        self.combo.set_expanded_enabled(enabled);
    }

    /// Returns every state machine to idle.
    ///
    /// Activations already queued are still delivered on the next flush.
    pub fn reset(&mut self) {
        self.triggers.reset();
        self.combo.reset();
        self.dispatcher.reset();
        self.polling.reset();
        self.events.reset();
        debug!("Classifier reset");
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Returns the active combo mode.
    #[must_use]
    pub fn active_combo(&self) -> ComboMode {
        self.combo.mode()
    }

    /// Returns the live combo session.
    #[must_use]
    pub fn session(&self) -> Option<&ComboSession> {
        self.combo.session()
    }

    /// Returns the slot to draw as pressed right now.
    #[must_use]
    pub fn pressed_slot(&self) -> Option<SlotIndex> {
        self.pressed_slot_at(Instant::now())
    }

    /// Returns the slot to draw as pressed at `now`.
    #[must_use]
    pub fn pressed_slot_at(&self, now: Instant) -> Option<SlotIndex> {
        self.dispatcher.pressed_slot(now)
    }

    /// Returns whether a trigger is held.
    #[must_use]
    pub fn is_trigger_held(&self, side: TriggerSide) -> bool {
        self.triggers.get(side).is_held()
    }

    /// Returns the held slots.
    #[must_use]
    pub fn held_slots(&self) -> &HeldButtonSet {
        self.dispatcher.held()
    }

    /// Returns the active device profile.
    #[must_use]
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Returns the effective options.
    #[must_use]
    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    /// Number of activations waiting for the next flush.
    #[must_use]
    pub fn pending_activations(&self) -> usize {
        self.queue.pending()
    }

    /// Delivers every queued activation to `sink`. Call once per host tick.
    pub fn flush_activations<S>(&mut self, sink: &mut S) -> usize
    where
        S: SlotActivationSink + ?Sized,
    {
        self.queue.flush(sink)
    }
}
