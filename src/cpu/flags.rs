//! The FL register.
//!
//! Layout is `00000LGE`. CMP sets exactly one of the three bits; before
//! the first CMP the register reads zero.

use std::cmp::Ordering;
use std::fmt;
use serde::Serialize;

/// Result of the most recent comparison.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Flags(u8);

impl Flags {
    /// Equal.
    pub const E: u8 = 0b0000_0001;
    /// Greater-than.
    pub const G: u8 = 0b0000_0010;
    /// Less-than.
    pub const L: u8 = 0b0000_0100;

    /// Flags in their power-on state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Record the outcome of a comparison, replacing whatever was set before.
    pub fn set_from(&mut self, ordering: Ordering) {
        self.0 = match ordering {
            Ordering::Equal => Self::E,
            Ordering::Greater => Self::G,
            Ordering::Less => Self::L,
        };
    }

    pub fn is_equal(self) -> bool {
        self.0 & Self::E != 0
    }

    pub fn is_greater(self) -> bool {
        self.0 & Self::G != 0
    }

    pub fn is_less(self) -> bool {
        self.0 & Self::L != 0
    }

    /// Raw register value.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Clear back to the power-on state.
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FL={:08b} [{}{}{}]",
            self.0,
            if self.is_less() { 'L' } else { '-' },
            if self.is_greater() { 'G' } else { '-' },
            if self.is_equal() { 'E' } else { '-' },
        )
    }
}
