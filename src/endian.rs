//! Numeric helpers shared by the XCOFF and Big-AR readers.
//!
//! XCOFF32 is always big-endian on disk; `scroll`'s `BE` context is used
//! directly wherever a field is `Pread`-derived, so this module only owns the
//! one thing `scroll` doesn't: the ASCII-decimal fields used throughout
//! Big-AR headers (and XCOFF's loader import-file table).

use crate::error::{Error, Result};

/// Parses an ASCII decimal number out of `field`, stopping at the first
/// space (`0x20`) rather than requiring the field be NUL-terminated or fully
/// packed with digits. Mirrors the `r32`/`r64` macros in the original
/// project's `bigar.h`: overflow is detected before it happens rather than
/// wrapping.
pub fn parse_ascii_decimal_u32(field: &[u8]) -> Result<u32> {
    parse_ascii_decimal_u64(field).and_then(|v| {
        u32::try_from(v).map_err(|_| Error::Malformed(format!("ascii decimal field overflows u32: {}", v)))
    })
}

/// Formats `value` as a left-justified, space-padded ASCII-decimal field of
/// exactly `width` bytes, the inverse of [`parse_ascii_decimal_u64`] and the
/// layout Big-AR member headers use on disk. Panics if `value` doesn't fit
/// in `width` digits; every field width this crate reads (12 or 20 bytes)
/// comfortably holds a `u64`.
pub fn format_decimal(value: u64, width: usize) -> Vec<u8> {
    let digits = value.to_string();
    assert!(digits.len() <= width, "{} does not fit in a {}-byte ascii decimal field", value, width);
    let mut field = vec![b' '; width];
    field[..digits.len()].copy_from_slice(digits.as_bytes());
    field
}

/// As [`parse_ascii_decimal_u32`], but for the 64-bit archive member fields.
pub fn parse_ascii_decimal_u64(field: &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    let mut saw_digit = false;
    for &b in field {
        if b == b' ' {
            break;
        }
        if !b.is_ascii_digit() {
            return Err(Error::Malformed(format!(
                "non-digit byte {:#x} in ascii decimal field",
                b
            )));
        }
        saw_digit = true;
        let digit = (b - b'0') as u64;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| Error::Malformed("ascii decimal field overflows u64".into()))?;
    }
    if !saw_digit {
        return Err(Error::Malformed("ascii decimal field has no digits".into()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_terminated_field() {
        assert_eq!(parse_ascii_decimal_u64(b"8244        ").unwrap(), 8244);
    }

    #[test]
    fn parses_fully_packed_field() {
        assert_eq!(parse_ascii_decimal_u32(b"1234").unwrap(), 1234);
    }

    #[test]
    fn rejects_non_digit() {
        assert!(parse_ascii_decimal_u64(b"12x4").is_err());
    }

    #[test]
    fn rejects_empty_field() {
        assert!(parse_ascii_decimal_u64(b"            ").is_err());
    }

    #[test]
    fn detects_u32_overflow() {
        assert!(parse_ascii_decimal_u32(b"4294967296").is_err());
        assert_eq!(parse_ascii_decimal_u32(b"4294967295").unwrap(), u32::MAX);
    }

    /// spec.md §8: `format_decimal` round-trips through `parse_ascii_decimal_u64`
    /// across the width Big-AR's 20-byte size/nxtmem/prvmem/date fields use.
    #[test]
    fn format_decimal_round_trips_through_parse() {
        for value in [0u64, 1, 9, 10, 8244, u32::MAX as u64, u64::MAX / 2, u64::MAX] {
            let field = format_decimal(value, 20);
            assert_eq!(field.len(), 20);
            assert_eq!(parse_ascii_decimal_u64(&field).unwrap(), value);
        }
    }
}
