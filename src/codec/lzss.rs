//! LZSS sliding-window decoder for legacy archive entries.
//!
//! The stream is a sequence of flag bytes. Each flag byte's 8 bits are
//! consumed least-significant first and select, for each of the next 8
//! units, either a literal byte copied verbatim (bit set) or a two-byte
//! back-reference (bit clear) copied from already-produced output:
//!
//! ```text
//! lo, hi:
//!   distance = ((hi & 0xF0) << 4 | lo) + 1    1..=4096
//!   length   = (hi & 0x0F) + 3                3..=18
//! ```
//!
//! The stream carries no end marker; the expected plaintext length comes
//! from the entry descriptor and bounds the decode. Decoding stops exactly
//! when that many bytes have been produced; trailing input is padding.

use crate::{Error, Result};

/// Sliding window size, equal to the maximum encodable distance.
pub const WINDOW_SIZE: usize = 4096;

/// Shortest encodable back-reference.
pub const MIN_MATCH: usize = 3;

/// Longest encodable back-reference.
pub const MAX_MATCH: usize = 18;

/// Decodes a compressed byte sequence into exactly `expected_len` bytes.
///
/// A pure function of `(input, expected_len)`; holds no state across calls.
///
/// # Errors
///
/// All failures are [`Error::InvalidFormat`]:
///
/// - the input ends before `expected_len` bytes are produced (truncated
///   archive or corrupt table entry);
/// - a back-reference points before the start of all output produced so
///   far;
/// - a back-reference would produce more than `expected_len` bytes.
pub fn decode(input: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let expected = usize::try_from(expected_len)
        .map_err(|_| Error::InvalidFormat("entry too large for this platform".into()))?;

    let mut out = Vec::new();
    out.try_reserve_exact(expected)
        .map_err(|_| Error::OutOfMemory {
            requested: expected,
        })?;

    let mut pos = 0usize;
    while out.len() < expected {
        let Some(&flags) = input.get(pos) else {
            return Err(truncated(out.len(), expected));
        };
        pos += 1;

        for bit in 0..8 {
            if out.len() == expected {
                break;
            }
            if flags >> bit & 1 == 1 {
                let Some(&byte) = input.get(pos) else {
                    return Err(truncated(out.len(), expected));
                };
                pos += 1;
                out.push(byte);
            } else {
                let (Some(&lo), Some(&hi)) = (input.get(pos), input.get(pos + 1)) else {
                    return Err(truncated(out.len(), expected));
                };
                pos += 2;

                let distance = (((hi & 0xF0) as usize) << 4 | lo as usize) + 1;
                let length = (hi & 0x0F) as usize + MIN_MATCH;

                if distance > out.len() {
                    return Err(Error::InvalidFormat(format!(
                        "back-reference distance {} points before start of output ({} bytes produced)",
                        distance,
                        out.len()
                    )));
                }
                if out.len() + length > expected {
                    return Err(Error::InvalidFormat(format!(
                        "stream produces more than the expected {} bytes",
                        expected
                    )));
                }
                // Byte-by-byte copy: overlapping references (distance <
                // length) replicate the just-written bytes.
                for _ in 0..length {
                    let byte = out[out.len() - distance];
                    out.push(byte);
                }
            }
        }
    }
    Ok(out)
}

fn truncated(produced: usize, expected: usize) -> Error {
    Error::InvalidFormat(format!(
        "truncated LZSS stream: {} of {} bytes produced",
        produced, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_output() {
        assert_eq!(decode(&[], 0).unwrap(), Vec::<u8>::new());
        // Trailing input after the expected length is padding.
        assert_eq!(decode(&[0xFF, 0x41], 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_all_literals() {
        // 0xFF: eight literal units.
        let input = [0xFF, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h'];
        assert_eq!(decode(&input, 8).unwrap(), b"abcdefgh");
    }

    #[test]
    fn test_reference_zero_fill() {
        // Reference vector: literal 0x00, then distance 1 / length 15.
        let input = [0x01, 0x00, 0x00, 0x0C];
        assert_eq!(decode(&input, 16).unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn test_reference_repeated_pattern() {
        // "abc" literals, then distance 3 / length 9 -> "abcabcabcabc".
        let input = [0x07, b'a', b'b', b'c', 0x02, 0x06];
        assert_eq!(decode(&input, 12).unwrap(), b"abcabcabcabc");
    }

    #[test]
    fn test_overlapping_reference() {
        // "ab" then distance 2 / length 4 -> "ababab".
        let input = [0x03, b'a', b'b', 0x01, 0x01];
        assert_eq!(decode(&input, 6).unwrap(), b"ababab");
    }

    #[test]
    fn test_multiple_flag_groups() {
        // 16 literals need two flag bytes.
        let mut input = vec![0xFF];
        input.extend_from_slice(b"01234567");
        input.push(0xFF);
        input.extend_from_slice(b"89abcdef");
        assert_eq!(decode(&input, 16).unwrap(), b"0123456789abcdef");
    }

    #[test]
    fn test_max_distance_encoding() {
        // Stored distance 0xFFF decodes as 4096.
        let literals: Vec<u8> = (0..WINDOW_SIZE).map(|i| (i % 251) as u8).collect();
        let mut stream = Vec::new();
        for chunk in literals.chunks(8) {
            stream.push(0xFF);
            stream.extend_from_slice(chunk);
        }
        // One reference reaching all the way back: distance 4096, length 3.
        stream.push(0x00);
        stream.push(0xFF);
        stream.push(0xF0);

        let out = decode(&stream, (WINDOW_SIZE + 3) as u64).unwrap();
        assert_eq!(&out[WINDOW_SIZE..], &out[..3]);
    }

    #[test]
    fn test_truncated_missing_literal() {
        let err = decode(&[0xFF], 1).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_truncated_missing_flag_byte() {
        let err = decode(&[], 1).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_truncated_half_reference() {
        // Literal, then a reference with only one of its two bytes present.
        let err = decode(&[0x01, 0x00, 0x00], 16).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_reference_before_output_start() {
        // First unit is a reference; nothing has been produced yet.
        let err = decode(&[0x00, 0x05, 0x02], 5).unwrap_err();
        assert!(err.to_string().contains("before start"));
    }

    #[test]
    fn test_reference_distance_exceeds_output() {
        // One literal, then distance 6 with only 1 byte produced.
        let err = decode(&[0x01, b'x', 0x05, 0x00], 5).unwrap_err();
        assert!(err.to_string().contains("before start"));
    }

    #[test]
    fn test_over_length_reference() {
        // Literal, then distance 1 / length 18 against expected 4.
        let err = decode(&[0x01, b'x', 0x00, 0x0F], 4).unwrap_err();
        assert!(err.to_string().contains("more than the expected"));
    }

    #[test]
    fn test_literal_stops_exactly_at_expected() {
        // Flag byte promises 8 literals but only 3 are needed.
        let input = [0xFF, b'x', b'y', b'z'];
        assert_eq!(decode(&input, 3).unwrap(), b"xyz");
    }

    proptest! {
        /// Any payload encoded as pure literals decodes back to itself.
        #[test]
        fn prop_literal_only_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut stream = Vec::new();
            for chunk in payload.chunks(8) {
                stream.push(0xFFu8);
                stream.extend_from_slice(chunk);
            }
            let out = decode(&stream, payload.len() as u64).unwrap();
            prop_assert_eq!(out, payload);
        }

        /// Decoding is deterministic: same input, same output.
        #[test]
        fn prop_decode_is_pure(payload in proptest::collection::vec(any::<u8>(), 1..256)) {
            let mut stream = Vec::new();
            for chunk in payload.chunks(8) {
                stream.push(0xFFu8);
                stream.extend_from_slice(chunk);
            }
            let a = decode(&stream, payload.len() as u64).unwrap();
            let b = decode(&stream, payload.len() as u64).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
