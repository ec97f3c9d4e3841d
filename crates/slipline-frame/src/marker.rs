//! Reserved byte values and size limits of the wire format.
//!
//! A frame on the wire is `FLUSH END <escaped payload> END`. Inside the
//! payload, END is sent as `ESC ESC_END` and ESC as `ESC ESC_ESC`.

/// Resynchronisation byte sent once before the opening END of every frame.
pub const FLUSH: u8 = 0xFF;

/// Frame boundary.
pub const END: u8 = 0xC0;

/// Escape: the next byte is a transposed literal.
pub const ESC: u8 = 0xDB;

/// Transposed END (follows ESC).
pub const ESC_END: u8 = 0xDC;

/// Transposed ESC (follows ESC).
pub const ESC_ESC: u8 = 0xDD;

/// Bytes opening every encoded frame.
pub const PREAMBLE: [u8; 2] = [FLUSH, END];

/// Default capacity of every frame buffer, encoded or decoded.
pub const BUF_SIZE: usize = 2048;

/// Segments shorter than this are line noise to the incremental
/// [`Decoder`](crate::decoder::Decoder).
///
/// The FLUSH byte of a preamble ends up as a one-byte segment after the
/// previous frame's closing END, and back-to-back ENDs form empty segments.
pub const MIN_FRAME_LEN: usize = 2;

/// Returns a human-readable name for a reserved byte value.
pub fn marker_name(byte: u8) -> &'static str {
    match byte {
        FLUSH => "FLUSH",
        END => "END",
        ESC => "ESC",
        ESC_END => "ESC_END",
        ESC_ESC => "ESC_ESC",
        _ => "DATA",
    }
}

/// Returns true if the byte must be escaped inside a payload.
pub fn is_reserved(byte: u8) -> bool {
    byte == END || byte == ESC
}

/// Returns true for segments the stream readers skip instead of delivering:
/// empty segments between back-to-back ENDs, and the lone FLUSH left over
/// from a preamble.
///
/// An empty payload and the one-byte payload `[FLUSH]` are indistinguishable
/// from these and never reach the caller.
pub fn is_filler(segment: &[u8]) -> bool {
    matches!(segment, [] | [FLUSH])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_reserved_bytes() {
        assert_eq!(marker_name(0xC0), "END");
        assert_eq!(marker_name(0xDB), "ESC");
        assert_eq!(marker_name(0xFF), "FLUSH");
        assert_eq!(marker_name(0x41), "DATA");
    }

    #[test]
    fn only_end_and_esc_are_reserved_in_payload() {
        let reserved: Vec<u8> = (0..=255u8).filter(|b| is_reserved(*b)).collect();
        assert_eq!(reserved, vec![END, ESC]);
    }

    #[test]
    fn filler_is_empty_or_lone_flush() {
        assert!(is_filler(&[]));
        assert!(is_filler(&[FLUSH]));
        assert!(!is_filler(&[0x42]));
        assert!(!is_filler(&[FLUSH, FLUSH]));
    }
}
