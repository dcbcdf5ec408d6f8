//! One-byte two's-complement sample codec
//!
//! Samples and coefficients travel as a single signed byte. Anything outside
//! -128..=127 is rejected before it reaches the wire.

use crate::error::EncodingError;

/// Encode a value as its two's-complement byte.
pub fn encode(value: i64) -> Result<u8, EncodingError> {
    i8::try_from(value)
        .map(|v| v as u8)
        .map_err(|_| EncodingError { value })
}

/// Signed interpretation of a reply byte.
pub fn decode(byte: u8) -> i8 {
    byte as i8
}

/// True when `|value| > threshold`. Advisory only.
pub fn is_over_threshold(value: i64, threshold: u64) -> bool {
    value.unsigned_abs() > threshold
}

/// Two-digit lowercase hex of the encoded byte (e.g. `-1` -> `"ff"`).
pub fn to_hex(value: i64) -> Result<String, EncodingError> {
    Ok(format!("{:02x}", encode(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_full_range() {
        for v in -128i64..=127 {
            assert_eq!(i64::from(decode(encode(v).unwrap())), v);
        }
    }

    #[test]
    fn test_encode_twos_complement() {
        assert_eq!(encode(0).unwrap(), 0x00);
        assert_eq!(encode(127).unwrap(), 0x7f);
        assert_eq!(encode(-1).unwrap(), 0xff);
        assert_eq!(encode(-128).unwrap(), 0x80);
        assert_eq!(encode(-3).unwrap(), 0xfd);
    }

    #[test]
    fn test_encode_out_of_range() {
        for v in [128, 150, -129, 1000, i64::MAX, i64::MIN] {
            assert_eq!(encode(v), Err(EncodingError { value: v }));
        }
    }

    #[test]
    fn test_threshold_is_independent_of_range() {
        assert!(!is_over_threshold(101, 101));
        assert!(is_over_threshold(102, 101));
        assert!(is_over_threshold(-102, 101));
        assert!(is_over_threshold(150, 101));
        assert!(is_over_threshold(127, 120));
        assert!(is_over_threshold(-128, 120));
        assert!(!is_over_threshold(0, 0));
        assert!(is_over_threshold(i64::MIN, i64::MAX as u64));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(5).unwrap(), "05");
        assert_eq!(to_hex(-1).unwrap(), "ff");
        assert_eq!(to_hex(-128).unwrap(), "80");
        assert!(to_hex(200).is_err());
    }
}
