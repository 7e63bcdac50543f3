//! Little-endian primitive reader and writer shared by every format version.
//!
//! Strings are UTF-8 prefixed with a 7-bit variable-length byte count (low
//! seven bits first, high bit set on every byte except the last).

use glam::Vec3;

use crate::error::PersistError;

/// Append-only byte sink.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Writes one byte.
    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Writes a boolean as one byte (0 or 1).
    pub fn bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Writes an `i16`.
    pub fn i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an `i32`.
    pub fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an `f32`.
    pub fn f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes three `f32`s.
    pub fn vec3(&mut self, value: Vec3) {
        self.f32(value.x);
        self.f32(value.y);
        self.f32(value.z);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn string(&mut self, value: &str) {
        let mut len = value.len();
        loop {
            let byte = (len & 0x7F) as u8;
            len >>= 7;
            if len == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Writes a count as `i16`.
    ///
    /// # Errors
    ///
    /// [`PersistError::CountOverflow`] if `count > i16::MAX`.
    pub fn count_i16(&mut self, what: &'static str, count: usize) -> Result<(), PersistError> {
        let value = i16::try_from(count).map_err(|_| PersistError::CountOverflow { what, count })?;
        self.i16(value);
        Ok(())
    }

    /// Writes a count as `i32`.
    ///
    /// # Errors
    ///
    /// [`PersistError::CountOverflow`] if `count > i32::MAX`.
    pub fn count_i32(&mut self, what: &'static str, count: usize) -> Result<(), PersistError> {
        let value = i32::try_from(count).map_err(|_| PersistError::CountOverflow { what, count })?;
        self.i32(value);
        Ok(())
    }
}

/// Cursor over a borrowed byte buffer. Every read is bounds-checked.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Starts reading at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), PersistError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(PersistError::TrailingBytes {
                offset: self.pos,
                remaining,
            }),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PersistError> {
        if self.remaining() < n {
            return Err(PersistError::Truncated {
                offset: self.pos,
                needed: n,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], PersistError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, PersistError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean byte; any non-zero value is `true`.
    pub fn bool(&mut self) -> Result<bool, PersistError> {
        Ok(self.u8()? != 0)
    }

    /// Reads an `i16`.
    pub fn i16(&mut self) -> Result<i16, PersistError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    /// Reads an `i32`.
    pub fn i32(&mut self) -> Result<i32, PersistError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Reads an `f32`.
    pub fn f32(&mut self) -> Result<f32, PersistError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Reads three `f32`s.
    pub fn vec3(&mut self) -> Result<Vec3, PersistError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String, PersistError> {
        let prefix_offset = self.pos;
        let mut len: usize = 0;
        let mut shift = 0;
        loop {
            let byte = self.u8()?;
            len |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(PersistError::InvalidStringLength {
                    offset: prefix_offset,
                });
            }
        }
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| PersistError::InvalidUtf8 { offset })
    }

    /// Reads an `i16` count, rejecting negative values.
    pub fn count_i16(&mut self) -> Result<usize, PersistError> {
        let offset = self.pos;
        let count = self.i16()?;
        usize::try_from(count).map_err(|_| PersistError::NegativeCount {
            offset,
            count: count as i32,
        })
    }

    /// Reads an `i32` count, rejecting negative values.
    pub fn count_i32(&mut self) -> Result<usize, PersistError> {
        let offset = self.pos;
        let count = self.i32()?;
        usize::try_from(count).map_err(|_| PersistError::NegativeCount { offset, count })
    }

    /// Capacity hint for a list of `count` entries of at least `min_size`
    /// bytes each, capped by what the buffer can still hold.
    pub fn capacity_hint(&self, count: usize, min_size: usize) -> usize {
        count.min(self.remaining() / min_size.max(1))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
