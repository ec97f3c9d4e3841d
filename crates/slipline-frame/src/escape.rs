//! The byte-stuffing rule, shared by every encoder and decoder.
//!
//! Decoding is a two-state machine driven one byte at a time by
//! [`Unescaper::step`]. The stream reassembler, the incremental decoder and
//! the async codec all consume the same [`Step`] values and differ only in
//! where bytes come from and where frames go.

use crate::marker::{is_reserved, END, ESC, ESC_END, ESC_ESC};

/// Decoder escape state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EscapeState {
    /// Bytes are taken literally; END and ESC are markers.
    #[default]
    Normal,
    /// The previous byte was ESC; the next byte must be ESC_END or ESC_ESC.
    Escaped,
}

/// What a single wire byte means to the frame being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// END outside an escape: the frame is complete.
    Boundary,
    /// ESC: nothing to store yet.
    Escape,
    /// A payload byte, already unescaped.
    Data(u8),
    /// The byte after ESC was not a valid transposition. The state is back
    /// to [`EscapeState::Normal`] and the byte must not be stored.
    Invalid(u8),
}

/// Escape state machine for one receive path.
#[derive(Debug, Clone, Default)]
pub struct Unescaper {
    state: EscapeState,
}

impl Unescaper {
    /// Create an unescaper in the normal state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one wire byte.
    pub fn step(&mut self, byte: u8) -> Step {
        match self.state {
            EscapeState::Normal => match byte {
                END => Step::Boundary,
                ESC => {
                    self.state = EscapeState::Escaped;
                    Step::Escape
                }
                other => Step::Data(other),
            },
            EscapeState::Escaped => {
                self.state = EscapeState::Normal;
                match byte {
                    ESC_END => Step::Data(END),
                    ESC_ESC => Step::Data(ESC),
                    other => Step::Invalid(other),
                }
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> EscapeState {
        self.state
    }

    /// True between an ESC and the byte it escapes.
    pub fn is_escaped(&self) -> bool {
        self.state == EscapeState::Escaped
    }

    /// Return to the normal state.
    pub fn reset(&mut self) {
        self.state = EscapeState::Normal;
    }
}

/// The wire form of one payload byte: one byte, or an ESC pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapedByte {
    bytes: [u8; 2],
    len: u8,
}

impl EscapedByte {
    /// The wire bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of wire bytes (1 or 2).
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if there are no wire bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Escape one payload byte.
pub fn escape_byte(byte: u8) -> EscapedByte {
    match byte {
        END => EscapedByte {
            bytes: [ESC, ESC_END],
            len: 2,
        },
        ESC => EscapedByte {
            bytes: [ESC, ESC_ESC],
            len: 2,
        },
        other => EscapedByte {
            bytes: [other, 0],
            len: 1,
        },
    }
}

/// Number of wire bytes the payload occupies once escaped (no markers).
pub fn escaped_len(payload: &[u8]) -> usize {
    payload.len() + payload.iter().filter(|b| is_reserved(**b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_bytes_pass_through() {
        let mut unescaper = Unescaper::new();
        assert_eq!(unescaper.step(0x41), Step::Data(0x41));
        assert_eq!(unescaper.step(0xFF), Step::Data(0xFF));
        assert_eq!(unescaper.step(ESC_END), Step::Data(ESC_END));
        assert_eq!(unescaper.state(), EscapeState::Normal);
    }

    #[test]
    fn end_is_boundary() {
        let mut unescaper = Unescaper::new();
        assert_eq!(unescaper.step(END), Step::Boundary);
    }

    #[test]
    fn escape_pairs_map_back() {
        let mut unescaper = Unescaper::new();
        assert_eq!(unescaper.step(ESC), Step::Escape);
        assert!(unescaper.is_escaped());
        assert_eq!(unescaper.step(ESC_END), Step::Data(END));
        assert_eq!(unescaper.step(ESC), Step::Escape);
        assert_eq!(unescaper.step(ESC_ESC), Step::Data(ESC));
        assert!(!unescaper.is_escaped());
    }

    #[test]
    fn invalid_escape_returns_to_normal() {
        let mut unescaper = Unescaper::new();
        unescaper.step(ESC);
        assert_eq!(unescaper.step(0x01), Step::Invalid(0x01));
        assert_eq!(unescaper.state(), EscapeState::Normal);
    }

    #[test]
    fn end_after_esc_is_not_a_boundary() {
        let mut unescaper = Unescaper::new();
        unescaper.step(ESC);
        assert_eq!(unescaper.step(END), Step::Invalid(END));
    }

    #[test]
    fn reset_clears_pending_escape() {
        let mut unescaper = Unescaper::new();
        unescaper.step(ESC);
        unescaper.reset();
        assert_eq!(unescaper.step(ESC_END), Step::Data(ESC_END));
    }

    #[test]
    fn escape_byte_table() {
        assert_eq!(escape_byte(END).as_slice(), &[ESC, ESC_END]);
        assert_eq!(escape_byte(ESC).as_slice(), &[ESC, ESC_ESC]);
        assert_eq!(escape_byte(0x00).as_slice(), &[0x00]);
        assert_eq!(escape_byte(0xFF).len(), 1);
        assert!(!escape_byte(0xFF).is_empty());
    }

    #[test]
    fn escaped_len_counts_pairs() {
        assert_eq!(escaped_len(&[]), 0);
        assert_eq!(escaped_len(&[1, 2, 3]), 3);
        assert_eq!(escaped_len(&[END, 1, ESC]), 5);
    }

    #[test]
    fn every_byte_survives_escape_and_unescape() {
        for byte in 0..=255u8 {
            let mut unescaper = Unescaper::new();
            let decoded: Vec<Step> = escape_byte(byte)
                .as_slice()
                .iter()
                .map(|b| unescaper.step(*b))
                .collect();
            assert_eq!(decoded.last(), Some(&Step::Data(byte)));
        }
    }

    #[test]
    fn escaped_byte_is_never_empty() {
        for byte in 0..=255u8 {
            let escaped = escape_byte(byte);
            assert!(!escaped.is_empty());
            assert_eq!(escaped.len(), escaped.as_slice().len());
        }
    }
}
