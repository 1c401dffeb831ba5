//! LEB128 variable-length integer encoding/decoding, aka protobuf varints.

// This module uses `as` casts which have been reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::error::DecodeErrorKind;
use crate::util::{likely, unlikely};

/// Types that can be encoded as and decoded from a LEB128 integer.
pub trait LebCodec: Sized {
    /// Maximum number of bytes an encoded value occupies.
    const MAX_LEB_BYTES: usize;

    /// Decode a LEB128 variable length integer from the front of `data`.
    ///
    /// Returns a tuple of the decoded value and the number of bytes read to
    /// decode said value.
    ///
    /// Fails with [`DecodeErrorKind::PrematureEnd`] if `data` ends before a
    /// terminating byte, and with [`DecodeErrorKind::OutOfRange`] if the
    /// value does not fit in `Self`.
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeErrorKind>;

    /// Decode a LEB128 variable length integer, advancing `buf` past it.
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<(Self, usize), DecodeErrorKind> {
        let chunk = buf.chunk();

        // Fast path: the current chunk holds the whole integer.
        if likely(chunk.len() >= Self::MAX_LEB_BYTES || chunk.len() == buf.remaining()) {
            let (value, bytes_read) = Self::decode_leb128(chunk)?;
            buf.advance(bytes_read);
            return Ok((value, bytes_read));
        }

        // Slow path: the integer straddles chunks, gather it byte by byte.
        let mut scratch = [0u8; 10];
        let mut len = 0;
        while len < Self::MAX_LEB_BYTES {
            if unlikely(!buf.has_remaining()) {
                return Err(DecodeErrorKind::PrematureEnd);
            }
            let byte = buf.get_u8();
            scratch[len] = byte;
            len += 1;
            if byte < 0x80 {
                break;
            }
        }
        Self::decode_leb128(&scratch[..len])
    }

    /// Encode `self` as a LEB128 variable length integer into the provided
    /// buffer, returning the number of bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes required to encode this integer.
    fn encoded_leb128_len(self) -> usize;
}

impl LebCodec for u64 {
    const MAX_LEB_BYTES: usize = 10;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeErrorKind> {
        let mut value = 0u64;
        for (idx, &byte) in data.iter().take(Self::MAX_LEB_BYTES).enumerate() {
            if unlikely(idx == Self::MAX_LEB_BYTES - 1) {
                // Only the lowest bit of the 10th byte is left for a u64.
                if byte > 0x01 {
                    return Err(DecodeErrorKind::OutOfRange);
                }
                value |= (byte as u64) << 63;
                return Ok((value, Self::MAX_LEB_BYTES));
            }

            value |= ((byte & 0x7f) as u64) << (idx * 7);
            if byte < 0x80 {
                return Ok((value, idx + 1));
            }
        }
        Err(DecodeErrorKind::PrematureEnd)
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut written = 1;
        while value >= 0x80 {
            buf.put_u8((value as u8) | 0x80);
            value >>= 7;
            written += 1;
        }
        buf.put_u8(value as u8);
        written
    }

    /// Each byte carries 7 bits, zero still takes one byte.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        // Index of the highest set bit, 0 for both 0 and 1.
        let high_bit = 63 - (self | 1).leading_zeros();
        (high_bit * 9 + 73) as usize / 64
    }
}

impl LebCodec for u32 {
    const MAX_LEB_BYTES: usize = 5;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeErrorKind> {
        let mut value = 0u32;
        for (idx, &byte) in data.iter().take(Self::MAX_LEB_BYTES).enumerate() {
            if unlikely(idx == Self::MAX_LEB_BYTES - 1) {
                // 4 bits are left for the 5th byte.
                if byte > 0x0f {
                    return Err(DecodeErrorKind::OutOfRange);
                }
                value |= (byte as u32) << 28;
                return Ok((value, Self::MAX_LEB_BYTES));
            }

            value |= ((byte & 0x7f) as u32) << (idx * 7);
            if byte < 0x80 {
                return Ok((value, idx + 1));
            }
        }
        Err(DecodeErrorKind::PrematureEnd)
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        (self as u64).encode_leb128(buf)
    }

    #[inline]
    fn encoded_leb128_len(self) -> usize {
        u64::from(self).encoded_leb128_len()
    }
}

/// Append `value` as a protobuf varint, returning the number of bytes written.
#[inline]
pub fn encode_varint<B: bytes::BufMut>(value: u64, buf: &mut B) -> usize {
    value.encode_leb128(buf)
}

/// Read one varint from the front of `buf` and advance past it.
///
/// A 10th byte greater than `0x01` fails with [`DecodeErrorKind::OutOfRange`].
#[inline]
pub fn decode_varint<B: bytes::Buf>(buf: &mut B) -> Result<u64, DecodeErrorKind> {
    u64::decode_leb128_buf(buf).map(|(value, _)| value)
}

#[inline]
pub fn encoded_varint_len(value: u64) -> usize {
    value.encoded_leb128_len()
}

#[cfg(test)]
mod tests {
    use bytes::Buf;
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    #[track_caller]
    fn check_u64(value: u64, expected_len: usize) {
        let mut buffer = Vec::new();
        assert_eq!(value.encode_leb128(&mut buffer), expected_len);
        assert_eq!(buffer.len(), expected_len);
        assert_eq!(value.encoded_leb128_len(), expected_len);
        assert_eq!(u64::decode_leb128(&buffer), Ok((value, expected_len)));
    }

    #[track_caller]
    fn check_u32(value: u32, expected_len: usize) {
        let mut buffer = Vec::new();
        assert_eq!(value.encode_leb128(&mut buffer), expected_len);
        assert_eq!(value.encoded_leb128_len(), expected_len);
        assert_eq!(u32::decode_leb128(&buffer), Ok((value, expected_len)));
    }

    #[test]
    fn test_length_boundaries() {
        check_u64(0, 1);
        check_u64(127, 1);
        check_u64(128, 2);
        check_u64(300, 2);
        check_u64((1 << 14) - 1, 2);
        check_u64(1 << 14, 3);
        check_u64((1 << 56) + 1, 9);
        check_u64(1 << 63, 10);
        check_u64(u64::MAX, 10);

        check_u32(0, 1);
        check_u32(150, 2);
        check_u32((1 << 28) - 1, 4);
        check_u32(1 << 28, 5);
        check_u32(u32::MAX, 5);
    }

    #[test]
    fn test_known_encodings() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        assert_eq!(buf, [0xAC, 0x02]);

        let mut buf = Vec::new();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(
            buf,
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
        assert_eq!(encoded_varint_len(u64::MAX), buf.len());
    }

    #[test]
    fn test_premature_end() {
        assert_eq!(
            u64::decode_leb128(&[]),
            Err(DecodeErrorKind::PrematureEnd)
        );
        assert_eq!(
            u64::decode_leb128(&[0x80, 0x80]),
            Err(DecodeErrorKind::PrematureEnd)
        );
        assert_eq!(
            decode_varint(&mut &[0xAC][..]),
            Err(DecodeErrorKind::PrematureEnd)
        );
    }

    #[test]
    fn test_out_of_range() {
        // 10th byte carrying more than the single remaining bit.
        let too_big = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(
            u64::decode_leb128(&too_big),
            Err(DecodeErrorKind::OutOfRange)
        );

        // 11 byte varint.
        let too_long = [0x80; 11];
        assert_eq!(
            u64::decode_leb128(&too_long),
            Err(DecodeErrorKind::OutOfRange)
        );

        assert_eq!(
            u32::decode_leb128(&[0xFF, 0xFF, 0xFF, 0xFF, 0x10]),
            Err(DecodeErrorKind::OutOfRange)
        );

        // Same rule through the buffer API.
        assert_eq!(
            decode_varint(&mut &too_big[..]),
            Err(DecodeErrorKind::OutOfRange)
        );
        let max = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(decode_varint(&mut &max[..]), Ok(u64::MAX));
    }

    #[test]
    fn test_decode_across_chunks() {
        let mut buffer = Vec::new();
        encode_varint(u64::MAX - 7, &mut buffer);
        let (front, back) = buffer.split_at(3);
        let mut chained = front.chain(back);

        assert_eq!(decode_varint(&mut chained), Ok(u64::MAX - 7));
        assert!(!chained.has_remaining());
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let mut buf = &[0xAC, 0x02, 0x08][..];
        assert_eq!(decode_varint(&mut buf), Ok(300));
        assert_eq!(buf, &[0x08]);
    }

    #[property_test]
    fn proptest_u64_bijection(val: u64) {
        let mut buffer = Vec::new();
        let written = val.encode_leb128(&mut buffer);
        prop_assert_eq!(u64::decode_leb128(&buffer), Ok((val, written)));
        prop_assert_eq!(val.encoded_leb128_len(), written);
    }

    #[property_test]
    fn proptest_u32_bijection(val: u32) {
        let mut buffer = Vec::new();
        let written = val.encode_leb128(&mut buffer);
        prop_assert_eq!(u32::decode_leb128(&buffer), Ok((val, written)));
        prop_assert_eq!(val.encoded_leb128_len(), written);
        prop_assert_eq!(&buffer, &{
            let mut wide = Vec::new();
            u64::from(val).encode_leb128(&mut wide);
            wide
        });
    }

    #[property_test]
    fn proptest_matches_leb128_crate(val: u64) {
        let mut ours = Vec::new();
        encode_varint(val, &mut ours);

        let mut theirs = Vec::new();
        leb128::write::unsigned(&mut theirs, val).unwrap();
        prop_assert_eq!(&ours, &theirs);

        let decoded = leb128::read::unsigned(&mut &ours[..]).unwrap();
        prop_assert_eq!(decoded, val);
    }
}
