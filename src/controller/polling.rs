//! # Polling Adapter Module
//!
//! Synthesizes button edges from full-state snapshots.
//!
//! Polled delivery (XInput style) hands over the complete button word every
//! frame and has no notion of press or release. The adapter remembers the
//! previous word and reports every bit that flipped.
//!
//! ```
//! use crossbar_input::controller::polling::{ButtonEdge, PollingAdapter};
//!
//! let mut adapter = PollingAdapter::new();
//! let edges: Vec<_> = adapter.button_edges(0x1001).collect();
//! assert_eq!(edges, vec![
//!     ButtonEdge { button: 0x0001, pressed: true },
//!     ButtonEdge { button: 0x1000, pressed: true },
//! ]);
//! assert_eq!(adapter.button_edges(0x1001).count(), 0);
//! ```

/// A press or release of one button bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEdge {
    /// Single-bit button value.
    pub button: u16,
    /// True for press, false for release.
    pub pressed: bool,
}

/// Iterator over the bits that changed between two button words.
#[derive(Debug, Clone)]
pub struct ButtonEdges {
    changed: u16,
    current: u16,
}

impl Iterator for ButtonEdges {
    type Item = ButtonEdge;

    fn next(&mut self) -> Option<Self::Item> {
        if self.changed == 0 {
            return None;
        }
        let button = self.changed & self.changed.wrapping_neg();
        self.changed &= !button;
        Some(ButtonEdge {
            button,
            pressed: self.current & button != 0,
        })
    }
}

/// Diffs consecutive button words.
#[derive(Debug, Clone, Default)]
pub struct PollingAdapter {
    previous_buttons: u16,
}

impl PollingAdapter {
    /// Creates an adapter that assumes nothing was pressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `buttons` and returns the edges since the previous word,
    /// lowest bit first.
    pub fn button_edges(&mut self, buttons: u16) -> ButtonEdges {
        let edges = ButtonEdges {
            changed: self.previous_buttons ^ buttons,
            current: buttons,
        };
        self.previous_buttons = buttons;
        edges
    }

    /// Returns the last recorded word.
    #[must_use]
    pub fn previous_buttons(&self) -> u16 {
        self.previous_buttons
    }

    /// Forgets the previous word.
    pub fn reset(&mut self) {
        self.previous_buttons = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_edges_for_identical_words() {
        let mut adapter = PollingAdapter::new();
        let _ = adapter.button_edges(0x00F0).count();
        assert_eq!(adapter.button_edges(0x00F0).count(), 0);
    }

    #[test]
    fn test_press_and_release_in_one_word() {
        let mut adapter = PollingAdapter::new();
        let _ = adapter.button_edges(0x0001).count();

        let edges: Vec<_> = adapter.button_edges(0x8000).collect();
        assert_eq!(
            edges,
            vec![
                ButtonEdge { button: 0x0001, pressed: false },
                ButtonEdge { button: 0x8000, pressed: true },
            ]
        );
        assert_eq!(adapter.previous_buttons(), 0x8000);
    }

    #[test]
    fn test_all_bits() {
        let mut adapter = PollingAdapter::new();
        assert_eq!(adapter.button_edges(u16::MAX).filter(|e| e.pressed).count(), 16);
        assert_eq!(adapter.button_edges(0).filter(|e| !e.pressed).count(), 16);
    }

    #[test]
    fn test_reset_replays_held_buttons() {
        let mut adapter = PollingAdapter::new();
        let _ = adapter.button_edges(0x1000).count();
        adapter.reset();
        let edges: Vec<_> = adapter.button_edges(0x1000).collect();
        assert_eq!(edges, vec![ButtonEdge { button: 0x1000, pressed: true }]);
    }
}
