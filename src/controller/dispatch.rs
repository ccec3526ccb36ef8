//! # Activation Dispatch Module
//!
//! Turns slot button edges into deferred slot activations.
//!
//! A press that arrives while a combo is active records the slot as held and
//! produces one [`SlotActivation`]. Further presses of a held slot
//! (auto-repeat, a second physical button on the same slot) are ignored
//! until the slot is released.
//!
//! Activations are never executed from inside input handling. They are
//! pushed onto an [`ActivationQueue`] and handed to a
//! [`SlotActivationSink`] when the host flushes the queue on its next tick.

use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use super::combo::ComboMode;
use super::slot::{SlotIndex, SLOT_COUNT};

/// Default minimum time a pressed slot stays visible.
pub const DEFAULT_MIN_PRESSED_DISPLAY: Duration = Duration::from_millis(100);

/// A slot activation waiting for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotActivation {
    /// Combo mode when the slot was pressed.
    pub mode: ComboMode,
    /// Slot that was pressed.
    pub slot: SlotIndex,
    /// When the press was seen.
    pub requested_at: Instant,
}

/// Receiver of flushed activations.
///
/// Implemented by whatever resolves a slot to an action and runs it.
#[cfg_attr(test, mockall::automock)]
pub trait SlotActivationSink {
    /// Called once per activation, outside of input handling.
    fn on_slot_activate(&mut self, activation: SlotActivation);
}

impl<F> SlotActivationSink for F
where
    F: FnMut(SlotActivation),
{
    fn on_slot_activate(&mut self, activation: SlotActivation) {
        self(activation)
    }
}

/// Held state of every slot.
///
/// Button slots and the hat are tracked apart: a d-pad hat is a single
/// rotating control, so at most one hat slot is held at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldButtonSet {
    buttons: [bool; SLOT_COUNT],
    hat: Option<SlotIndex>,
}

impl HeldButtonSet {
    /// Returns whether a slot is held by a button.
    #[must_use]
    pub fn is_button_held(&self, slot: SlotIndex) -> bool {
        self.buttons[slot.position()]
    }

    /// Returns the slot held by the hat, if any.
    #[must_use]
    pub fn hat(&self) -> Option<SlotIndex> {
        self.hat
    }

    /// Returns whether any slot is held.
    #[must_use]
    pub fn any_held(&self) -> bool {
        self.hat.is_some() || self.buttons.iter().any(|&held| held)
    }

    /// Releases everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Where a slot edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// Discrete button or polled bit.
    Button,
    /// D-pad hat angle.
    Hat,
}

/// Debounces slot edges and tracks the pressed-slot visual.
#[derive(Debug, Clone)]
pub struct ActivationDispatcher {
    held: HeldButtonSet,
    pressed_slot: Option<SlotIndex>,
    last_activation: Option<(SlotIndex, Instant)>,
    min_pressed_display: Duration,
}

impl Default for ActivationDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PRESSED_DISPLAY)
    }
}

impl ActivationDispatcher {
    /// Creates a dispatcher with nothing held.
    #[must_use]
    pub fn new(min_pressed_display: Duration) -> Self {
        Self {
            held: HeldButtonSet::default(),
            pressed_slot: None,
            last_activation: None,
            min_pressed_display,
        }
    }

    /// Returns the held set.
    #[must_use]
    pub fn held(&self) -> &HeldButtonSet {
        &self.held
    }

    /// Handles one slot edge.
    ///
    /// Returns the activation to enqueue, if the edge is a fresh press made
    /// while a combo is active.
    pub fn on_slot_edge(
        &mut self,
        mode: ComboMode,
        slot: SlotIndex,
        pressed: bool,
        source: SlotSource,
        now: Instant,
    ) -> Option<SlotActivation> {
        if !pressed {
            self.release(slot, source);
            return None;
        }

        if !mode.is_active() || self.is_held(slot, source) {
            return None;
        }

        match source {
            SlotSource::Button => self.held.buttons[slot.position()] = true,
            SlotSource::Hat => self.held.hat = Some(slot),
        }
        self.pressed_slot = Some(slot);
        self.last_activation = Some((slot, now));

        debug!("Slot {} pressed under {}", slot, mode);
        Some(SlotActivation {
            mode,
            slot,
            requested_at: now,
        })
    }

    fn is_held(&self, slot: SlotIndex, source: SlotSource) -> bool {
        match source {
            SlotSource::Button => self.held.is_button_held(slot),
            SlotSource::Hat => self.held.hat == Some(slot),
        }
    }

    fn release(&mut self, slot: SlotIndex, source: SlotSource) {
        match source {
            SlotSource::Button => self.held.buttons[slot.position()] = false,
            SlotSource::Hat => {
                if self.held.hat == Some(slot) {
                    self.held.hat = None;
                }
            }
        }

        if !self.held.any_held() {
            self.pressed_slot = None;
        }
    }

    /// Returns the slot to draw as pressed.
    ///
    /// A slot stays visible for the minimum display duration after its last
    /// activation even if it was already released.
    #[must_use]
    pub fn pressed_slot(&self, now: Instant) -> Option<SlotIndex> {
        self.pressed_slot.or_else(|| {
            self.last_activation.and_then(|(slot, at)| {
                let elapsed = now.checked_duration_since(at).unwrap_or_default();
                (elapsed < self.min_pressed_display).then_some(slot)
            })
        })
    }

    /// Drops held slots and the live pressed slot when a combo ends.
    ///
    /// The lingering visual of the last activation is kept.
    pub fn end_session(&mut self) {
        self.held.clear();
        self.pressed_slot = None;
    }

    /// Forgets everything, including the lingering visual.
    pub fn reset(&mut self) {
        self.end_session();
        self.last_activation = None;
    }
}

/// Single-producer, single-consumer queue of pending activations.
///
/// Input handling pushes, the host drains once per tick.
#[derive(Debug)]
pub struct ActivationQueue {
    tx: UnboundedSender<SlotActivation>,
    rx: UnboundedReceiver<SlotActivation>,
    pending: usize,
}

impl Default for ActivationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, pending: 0 }
    }

    /// Number of activations waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Queues an activation.
    pub fn push(&mut self, activation: SlotActivation) {
        // The receiver lives in `self`, so sending only fails if it was closed.
        if self.tx.send(activation).is_err() {
            warn!("Activation queue closed, dropping slot {}", activation.slot);
            return;
        }
        self.pending += 1;
    }

    /// Hands every queued activation to `sink`, oldest first.
    ///
    /// Returns the number of activations delivered.
    pub fn flush<S>(&mut self, sink: &mut S) -> usize
    where
        S: SlotActivationSink + ?Sized,
    {
        let mut delivered = 0;
        loop {
            match self.rx.try_recv() {
                Ok(activation) => {
                    sink.on_slot_activate(activation);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        self.pending = self.pending.saturating_sub(delivered);
        if delivered > 0 {
            trace!("Flushed {} slot activation(s)", delivered);
        }
        delivered
    }
}
