//! Primitive encoding/decoding for the Sereal binary format.
//!
//! Implements the byte sink and source, varint, and zigzag. Offsets are
//! logical stream positions, never memory addresses, so buffer growth can
//! never invalidate a recorded offset.

use crate::error::DecodeError;
use crate::protocol::{MAX_VARINT_BYTES, TRACK_FLAG};

// =============================================================================
// ENCODING
// =============================================================================

/// Growable byte sink for encoding.
///
/// Append-only, except for one narrow retroactive operation:
/// [`Writer::mark_tracked`] sets the track flag on an already-written tag
/// byte. `clear` drops the contents but keeps the allocation, so a
/// long-lived encoder amortizes buffer growth across documents.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the current logical length as a stream offset.
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Returns the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Drops the contents, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Sets the track flag on the already-written byte at `offset`.
    ///
    /// This is the only mutation of history the format needs: the byte
    /// becomes a back-reference target. Everything else is append-only.
    /// Offsets at or past the logical length are ignored.
    pub fn mark_tracked(&mut self, offset: u64) {
        if let Some(byte) = self.buf.get_mut(offset as usize) {
            *byte |= TRACK_FLAG;
        }
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_varint(&mut self, mut value: u64) {
        // Stack buffer to batch the writes
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a signed varint (zigzag encoded).
    pub fn write_zigzag(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Bounds-checked reader for decoding binary data.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader over a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a reader positioned at `pos`, for back-reference replay.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.data.len() - self.pos {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads an unsigned varint (LEB128).
    #[inline]
    pub fn read_varint(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0;

        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;

            if shift >= 64 || (shift == 63 && value > 1) {
                return Err(DecodeError::VarintOverflow);
            }

            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;

            if i == MAX_VARINT_BYTES - 1 {
                return Err(DecodeError::VarintTooLong);
            }
        }

        Err(DecodeError::VarintTooLong)
    }

    /// Reads a signed varint (zigzag encoded).
    pub fn read_zigzag(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        let unsigned = self.read_varint(context)?;
        Ok(zigzag_decode(unsigned))
    }

    /// Reads a length-prefixed byte payload, checked against remaining input.
    pub fn read_bytes_prefixed(&mut self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint(field)? as usize;
        if len > self.remaining_len() {
            return Err(DecodeError::LengthExceedsInput {
                field,
                len,
                remaining: self.remaining_len(),
            });
        }
        self.read_bytes(len, field)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str_prefixed(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        let bytes = self.read_bytes_prefixed(field)?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    /// Reads a little-endian f32.
    pub fn read_f32(&mut self, context: &'static str) -> Result<f32, DecodeError> {
        let bytes = self.read_bytes(4, context)?;
        // SAFETY: read_bytes guarantees exactly 4 bytes, try_into always succeeds
        Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a little-endian f64.
    pub fn read_f64(&mut self, context: &'static str) -> Result<f64, DecodeError> {
        let bytes = self.read_bytes(8, context)?;
        // SAFETY: read_bytes guarantees exactly 8 bytes, try_into always succeeds
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Encodes a signed integer using zigzag encoding.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded unsigned integer back to signed.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_roundtrip() {
        for v in [0i64, 1, -1, 127, -128, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn test_zigzag_values() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(2), 4);
    }

    #[test]
    fn test_varint_roundtrip() {
        let test_values = [0u64, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX];

        for v in test_values {
            let mut writer = Writer::new();
            writer.write_varint(v);

            let mut reader = Reader::new(writer.as_bytes());
            let decoded = reader.read_varint("test").unwrap();
            assert_eq!(v, decoded, "failed for {}", v);
        }
    }

    #[test]
    fn test_varint_wire_bytes() {
        let mut writer = Writer::new();
        writer.write_varint(300);
        // 300 = 0b10_0101100: low group first, continuation bit on the first
        assert_eq!(writer.as_bytes(), &[0xAC, 0x02]);
    }

    #[test]
    fn test_varint_too_long() {
        let data = [0x80u8; 11];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.read_varint("test"),
            Err(DecodeError::VarintTooLong)
        ));
    }

    #[test]
    fn test_mark_tracked_sets_only_high_bit() {
        let mut writer = Writer::new();
        writer.write_byte(0x2B);
        writer.write_byte(0x01);
        writer.mark_tracked(0);
        assert_eq!(writer.as_bytes(), &[0xAB, 0x01]);
    }

    #[test]
    fn test_mark_tracked_ignores_out_of_range_offset() {
        let mut writer = Writer::new();
        writer.write_byte(0x2B);
        writer.mark_tracked(1);
        writer.mark_tracked(5);
        assert_eq!(writer.as_bytes(), &[0x2B]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut writer = Writer::with_capacity(64);
        writer.write_bytes(&[1, 2, 3]);
        writer.clear();
        assert_eq!(writer.position(), 0);
        assert!(writer.as_bytes().is_empty());
    }

    #[test]
    fn test_reader_replay_at_offset() {
        let data = [0x00u8, 0x01, 0x02, 0x03];
        let mut reader = Reader::at(&data, 2);
        assert_eq!(reader.read_byte("test").unwrap(), 0x02);
    }

    #[test]
    fn test_unexpected_eof() {
        let data = [0u8; 5];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.read_bytes(10, "test"),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}
