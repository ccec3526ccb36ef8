//! # Controller Module
//!
//! Gamepad input handling and trigger-combo classification.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Mapping evdev events to classifier inputs
//! - Trigger hysteresis and combo recognition
//! - Resolving buttons and hat angles to crossbar slots
//! - Deferred slot activation and input suppression
//! - Replaying unsuppressed input on a virtual gamepad
//!
//! [`classifier::ComboClassifier`] ties the pieces together and is the entry
//! point for hosts.

pub mod classifier;
pub mod combo;
pub mod device;
pub mod dispatch;
pub mod event;
pub mod hysteresis;
pub mod mapper;
pub mod passthrough;
pub mod polling;
pub mod profile;
pub mod slot;
pub mod suppression;

pub use classifier::ComboClassifier;
pub use combo::{ComboMode, TriggerSide};
pub use dispatch::{SlotActivation, SlotActivationSink};
pub use slot::SlotIndex;
