//! # Crossbar Input Library
//!
//! Drive a trigger-combo action crossbar from a gamepad.
//!
//! Holding L2 and/or R2 selects one of several slot sets; the d-pad and face
//! buttons then fire one of eight slots in that set. This library classifies
//! the trigger gesture, resolves slot presses, defers their activation to the
//! host's next tick, and tells the host which inputs to hide from its own
//! handling.

pub mod config;
pub mod error;
pub mod controller;
pub mod telemetry;
