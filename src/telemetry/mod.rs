//! # Telemetry Module
//!
//! Records flushed slot activations as JSONL (JSON Lines).
//!
//! This module handles:
//! - Formatting activations as one JSON object per line
//! - Appending to a journal file
//! - Keeping write failures away from input handling

pub mod journal;

pub use journal::{ActivationJournal, JournalRecord};
