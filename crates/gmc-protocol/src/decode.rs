//! Reply payload decoders
//!
//! One decoder per reply format. Replies carry no framing, so every
//! fixed-size decoder validates the byte count first and reports
//! [`DecodeError::LengthMismatch`] for anything short - a truncated payload
//! usually means the link timed out mid-reply, and callers must be able to
//! tell that apart from "the device said zero".

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::DecodeError;

/// Reply length for `<GETSERIAL>>`
pub const SERIAL_LEN: usize = 7;
/// Reply length for `<GETVOLT>>`
pub const VOLTAGE_LEN: usize = 5;
/// Reply length for the CPM/CPS count commands
pub const COUNT_LEN: usize = 4;
/// Reply length for `<GETGYRO>>`
pub const GYRO_LEN: usize = 7;
/// Reply length for `<GETDATETIME>>`
pub const DATETIME_LEN: usize = 7;

/// Heartbeat samples on GQ-RFC1201 units carry status flags above bit 13
pub const CPS_RFC1201_MASK: u16 = 0x3FFF;

/// One 3-axis position reading
///
/// Neither vendor document specifies units; values are reported as the
/// device packs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GyroReading {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

fn expect_len(raw: &[u8], expected: usize) -> Result<(), DecodeError> {
    if raw.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            got: raw.len(),
            raw: raw.to_vec(),
        });
    }
    Ok(())
}

/// Decode a `<GETVER>>` reply: UTF-8 text, kept verbatim
pub fn decode_version(raw: &[u8]) -> Result<String, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::EmptyReply);
    }
    String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidText { raw: raw.to_vec() })
}

/// Decode a `<GETSERIAL>>` reply: 7 raw bytes, rendered as lowercase hex
pub fn decode_serial_number(raw: &[u8]) -> Result<String, DecodeError> {
    expect_len(raw, SERIAL_LEN)?;
    Ok(hex::encode(raw))
}

/// Decode a `<GETVOLT>>` reply
///
/// The payload reads like `4.8v\0`. The device only resolves tenths of a
/// volt; the first three ASCII characters carry the value and are parsed
/// as decimal text.
pub fn decode_voltage(raw: &[u8]) -> Result<f64, DecodeError> {
    expect_len(raw, VOLTAGE_LEN)?;
    let text = std::str::from_utf8(&raw[..3]).map_err(|_| DecodeError::InvalidNumber {
        raw: raw.to_vec(),
    })?;
    text.parse::<f64>().map_err(|_| DecodeError::InvalidNumber {
        raw: raw.to_vec(),
    })
}

/// Decode a CPM/CPS count reply: big-endian unsigned 32-bit
///
/// Example: `00 00 00 1C` is 28 counts.
pub fn decode_count(raw: &[u8]) -> Result<u32, DecodeError> {
    expect_len(raw, COUNT_LEN)?;
    Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Encode a count the way the device packs it
///
/// The simulator and tests use this to build protocol-accurate payloads.
pub fn encode_count(count: u32) -> [u8; COUNT_LEN] {
    count.to_be_bytes()
}

/// Decode one autonomous heartbeat CPS sample
///
/// GQ-RFC1801 units push the same 4-byte counts as `<GETCPS>>`. GQ-RFC1201
/// units push 2 bytes with status flags in the top bits, masked off here.
/// `sample_len` comes from the resolved model's profile.
pub fn decode_cps_sample(raw: &[u8], sample_len: usize) -> Result<u32, DecodeError> {
    expect_len(raw, sample_len)?;
    match sample_len {
        2 => Ok(u32::from(
            u16::from_be_bytes([raw[0], raw[1]]) & CPS_RFC1201_MASK,
        )),
        _ => decode_count(raw),
    }
}

/// Decode a `<GETGYRO>>` reply
///
/// Bytes 0-5 are three big-endian signed 16-bit axes (X, Y, Z); byte 6 is a
/// fixed sentinel and is discarded.
pub fn decode_gyro(raw: &[u8]) -> Result<GyroReading, DecodeError> {
    expect_len(raw, GYRO_LEN)?;
    Ok(GyroReading {
        x: i16::from_be_bytes([raw[0], raw[1]]),
        y: i16::from_be_bytes([raw[2], raw[3]]),
        z: i16::from_be_bytes([raw[4], raw[5]]),
    })
}

/// Decode a `<GETDATETIME>>` reply
///
/// Bytes 0-5 are year-since-2000, month, day, hour, minute, second as plain
/// binary values (not BCD); byte 6 is the sentinel. Field combinations that
/// do not form a real calendar time (month 13, hour 25, June 31st) are a
/// [`DecodeError::InvalidDateTime`].
pub fn decode_datetime(raw: &[u8]) -> Result<NaiveDateTime, DecodeError> {
    expect_len(raw, DATETIME_LEN)?;
    let invalid = || DecodeError::InvalidDateTime { raw: raw.to_vec() };
    let date = NaiveDate::from_ymd_opt(
        2000 + i32::from(raw[0]),
        u32::from(raw[1]),
        u32::from(raw[2]),
    )
    .ok_or_else(invalid)?;
    date.and_hms_opt(u32::from(raw[3]), u32::from(raw[4]), u32::from(raw[5]))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_count() {
        assert_eq!(decode_count(&[0x00, 0x00, 0x00, 0x1C]).unwrap(), 28);
        assert_eq!(decode_count(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(), u32::MAX);
    }

    #[test]
    fn test_decode_count_short_reply() {
        let err = decode_count(&[0x00, 0x1C]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                expected: 4,
                got: 2,
                raw: vec![0x00, 0x1C],
            }
        );
    }

    #[test]
    fn test_decode_gyro() {
        let reading = decode_gyro(&[0x00, 0x0A, 0xFF, 0xF6, 0x00, 0x00, 0xAA]).unwrap();
        assert_eq!((reading.x, reading.y, reading.z), (10, -10, 0));
    }

    #[test]
    fn test_decode_datetime() {
        let dt = decode_datetime(&[0x17, 0x06, 0x0F, 0x0C, 0x1E, 0x2D, 0xAA]).unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap();
        assert_eq!(dt, expected);
    }

    #[test]
    fn test_decode_datetime_rejects_month_13() {
        let err = decode_datetime(&[0x17, 0x0D, 0x0F, 0x0C, 0x1E, 0x2D, 0xAA]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDateTime { .. }));
    }

    #[test]
    fn test_decode_datetime_rejects_hour_25() {
        let err = decode_datetime(&[0x17, 0x06, 0x0F, 0x19, 0x1E, 0x2D, 0xAA]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDateTime { .. }));
    }

    #[test]
    fn test_decode_voltage() {
        assert_eq!(decode_voltage(b"4.8v\x00").unwrap(), 4.8);
        assert_eq!(decode_voltage(b"3.2v\x00").unwrap(), 3.2);
    }

    #[test]
    fn test_decode_voltage_garbage() {
        let err = decode_voltage(b"x.yv\x00").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { .. }));
    }

    #[test]
    fn test_decode_serial_number() {
        let serial = decode_serial_number(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD]).unwrap();
        assert_eq!(serial, "0123456789abcd");
    }

    #[test]
    fn test_decode_version() {
        assert_eq!(
            decode_version(b"GMC-500+Re 2.40").unwrap(),
            "GMC-500+Re 2.40"
        );
        assert_eq!(decode_version(b"").unwrap_err(), DecodeError::EmptyReply);
        assert!(matches!(
            decode_version(&[0xFF, 0xFE]).unwrap_err(),
            DecodeError::InvalidText { .. }
        ));
    }

    #[test]
    fn test_decode_cps_sample_widths() {
        // 2-byte RFC1201 samples have flag bits masked off
        assert_eq!(decode_cps_sample(&[0x80, 0x05], 2).unwrap(), 5);
        assert_eq!(decode_cps_sample(&[0x00, 0x00, 0x00, 0x05], 4).unwrap(), 5);
        assert!(decode_cps_sample(&[0x05], 2).is_err());
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn count_roundtrip(n in any::<u32>()) {
            prop_assert_eq!(decode_count(&encode_count(n)).unwrap(), n);
        }

        #[test]
        fn truncated_count_errors_cleanly(raw in proptest::collection::vec(any::<u8>(), 0..4)) {
            let err = decode_count(&raw).unwrap_err();
            prop_assert!(
                matches!(err, DecodeError::LengthMismatch { expected: 4, .. }),
                "expected LengthMismatch, got {:?}",
                err
            );
        }

        #[test]
        fn truncated_seven_byte_replies_error_cleanly(
            raw in proptest::collection::vec(any::<u8>(), 0..7)
        ) {
            prop_assert!(
                matches!(
                    decode_gyro(&raw).unwrap_err(),
                    DecodeError::LengthMismatch { expected: 7, .. }
                ),
                "expected LengthMismatch from decode_gyro"
            );
            prop_assert!(
                matches!(
                    decode_datetime(&raw).unwrap_err(),
                    DecodeError::LengthMismatch { expected: 7, .. }
                ),
                "expected LengthMismatch from decode_datetime"
            );
        }
    }
}
