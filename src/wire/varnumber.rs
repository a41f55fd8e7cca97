// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! VarNumber encode/decode: the TLV type/length prefix format. Shortest-form
//! only — 1 byte for `< 253`, a `0xFD` marker + 2 bytes for `<= 0xFFFF`, a
//! `0xFE` marker + 4 bytes for `<= 0xFFFF_FFFF`, else a `0xFF` marker + 8
//! bytes.

use bytes::{Buf, BufMut};

use crate::error::WireError;

pub fn encoded_len(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= 0xFFFF {
        3
    } else if value <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

pub fn encode(value: u64, out: &mut impl BufMut) {
    if value < 253 {
        out.put_u8(value as u8);
    } else if value <= 0xFFFF {
        out.put_u8(0xFD);
        out.put_u16(value as u16);
    } else if value <= 0xFFFF_FFFF {
        out.put_u8(0xFE);
        out.put_u32(value as u32);
    } else {
        out.put_u8(0xFF);
        out.put_u64(value);
    }
}

/// Decodes a VarNumber, returning the value and rejecting non-minimal
/// encodings (e.g. `0xFD 00 05` instead of a bare `05`).
pub fn decode(buf: &mut impl Buf) -> Result<u64, WireError> {
    if !buf.has_remaining() {
        return Err(WireError::Truncated);
    }
    let first = buf.get_u8();
    match first {
        0..=252 => Ok(first as u64),
        0xFD => {
            if buf.remaining() < 2 {
                return Err(WireError::Truncated);
            }
            let v = buf.get_u16() as u64;
            if v < 253 {
                return Err(WireError::NonMinimalVarNumber);
            }
            Ok(v)
        },
        0xFE => {
            if buf.remaining() < 4 {
                return Err(WireError::Truncated);
            }
            let v = buf.get_u32() as u64;
            if v <= 0xFFFF {
                return Err(WireError::NonMinimalVarNumber);
            }
            Ok(v)
        },
        0xFF => {
            if buf.remaining() < 8 {
                return Err(WireError::Truncated);
            }
            let v = buf.get_u64();
            if v <= 0xFFFF_FFFF {
                return Err(WireError::NonMinimalVarNumber);
            }
            Ok(v)
        },
        _ => unreachable!("u8 match is exhaustive"),
    }
}

/// Encodes a non-negative integer in the shortest of the four fixed widths
/// NDN allows (1/2/4/8 bytes).
pub fn encode_nonneg(value: u64, out: &mut impl BufMut) {
    if value <= u8::MAX as u64 {
        out.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        out.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        out.put_u32(value as u32);
    } else {
        out.put_u64(value);
    }
}

pub fn nonneg_len(value: u64) -> usize {
    if value <= u8::MAX as u64 {
        1
    } else if value <= u16::MAX as u64 {
        2
    } else if value <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

pub fn decode_nonneg(bytes: &[u8]) -> Result<u64, WireError> {
    match bytes.len() {
        1 => Ok(bytes[0] as u64),
        2 => Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as u64),
        4 => Ok(u32::from_be_bytes(bytes.try_into().map_err(|_| WireError::BadIntegerLength)?) as u64),
        8 => Ok(u64::from_be_bytes(bytes.try_into().map_err(|_| WireError::BadIntegerLength)?)),
        _ => Err(WireError::BadIntegerLength),
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn round_trips_every_width() {
        for v in [0u64, 1, 252, 253, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 0x1_0000_0000] {
            let mut buf = BytesMut::new();
            encode(v, &mut buf);
            assert_eq!(buf.len(), encoded_len(v));
            let mut cursor = &buf[..];
            assert_eq!(decode(&mut cursor).expect("decode"), v);
        }
    }

    #[test]
    fn rejects_non_minimal() {
        // 0xFD with a value that fits in one byte.
        let bytes = [0xFDu8, 0x00, 0x05];
        let mut cursor = &bytes[..];
        assert!(matches!(
            decode(&mut cursor),
            Err(WireError::NonMinimalVarNumber)
        ));
    }

    #[test]
    fn nonneg_round_trips_shortest_form() {
        for (v, expected_len) in [(0u64, 1), (255, 1), (256, 2), (70_000, 4), (1u64 << 40, 8)] {
            let mut buf = BytesMut::new();
            encode_nonneg(v, &mut buf);
            assert_eq!(buf.len(), expected_len);
            assert_eq!(decode_nonneg(&buf).expect("decode"), v);
        }
    }
}
