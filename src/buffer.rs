use lebe::prelude::*;
use crate::error::{Error, Result, PassiveResult};

/// If a length-prefixed read declares a size larger than this relative to
/// what remains in the buffer, something has gone wrong upstream; we still
/// honor it (the final bounds check will reject it precisely) but warn loudly
/// since a malformed `byteLength`/`numValues` pair is the most common way a
/// corrupt tile manifests.
const SUSPICIOUS_SIZE_RATIO: usize = 64;

/// A monotonic read cursor over an immutable byte slice.
///
/// Mirrors the reference codec's `BufferStream`: peek or read one byte, read
/// a typed little-endian primitive, consume `n` bytes, report how much is
/// left. There is no way to seek backward — once bytes are consumed they are
/// gone, matching the single-pass decode model in the design.
#[derive(Debug, Clone, Copy)]
pub struct BufferStream<'data> {
    data: &'data [u8],
    offset: usize,
}

impl<'data> BufferStream<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.offset < self.data.len()
    }

    fn check(&self, size: usize) -> PassiveResult {
        if self.offset + size > self.data.len() {
            return Err(Error::end_of_buffer(format!(
                "wanted {} bytes at offset {}, only {} remain", size, self.offset, self.remaining()
            )));
        }

        if size > SUSPICIOUS_SIZE_RATIO && size > self.remaining().saturating_mul(SUSPICIOUS_SIZE_RATIO) {
            log::warn!(
                "suspiciously large read requested: {} bytes, {} remain in buffer",
                size, self.remaining()
            );
        }

        Ok(())
    }

    /// Read one raw byte, advancing the cursor.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.check(1)?;
        let byte = self.data[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    /// Peek at the next byte without advancing the cursor.
    #[inline]
    pub fn peek_u8(&self) -> Result<u8> {
        self.check(1)?;
        Ok(self.data[self.offset])
    }

    /// Read a typed little-endian primitive.
    #[inline]
    pub fn read<T: Primitive>(&mut self) -> Result<T> {
        self.check(std::mem::size_of::<T>())?;
        let value = T::read_le(&self.data[self.offset..])?;
        self.offset += std::mem::size_of::<T>();
        Ok(value)
    }

    /// Borrow the next `count` bytes without copying, advancing the cursor.
    pub fn consume(&mut self, count: usize) -> Result<&'data [u8]> {
        self.check(count)?;
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    /// Borrow the rest of the buffer without advancing the cursor.
    pub fn peek_remaining(&self) -> &'data [u8] {
        &self.data[self.offset..]
    }
}

/// A little-endian primitive readable out of a byte slice and writable to a
/// growable buffer, via `lebe`.
pub trait Primitive: Sized {
    fn read_le(bytes: &[u8]) -> Result<Self>;
    fn write_le(self, out: &mut ByteWriter);
}

macro_rules! implement_primitive {
    ($kind: ident) => {
        impl Primitive for $kind {
            fn read_le(mut bytes: &[u8]) -> Result<Self> {
                Ok(bytes.read_from_little_endian()?)
            }

            fn write_le(self, out: &mut ByteWriter) {
                let mut encoded = [0_u8; std::mem::size_of::<$kind>()];
                (&mut encoded[..]).write_as_little_endian(&self).expect("writing to a fixed-size buffer cannot fail");
                out.write_bytes(&encoded);
            }
        }
    };
}

implement_primitive!(u8);
implement_primitive!(i8);
implement_primitive!(u16);
implement_primitive!(i16);
implement_primitive!(u32);
implement_primitive!(i32);
implement_primitive!(u64);
implement_primitive!(i64);
implement_primitive!(f32);
implement_primitive!(f64);

/// A growable little-endian byte buffer that encoders append to.
///
/// The counterpart to `BufferStream` on the write side: no backward seeking,
/// append-only, byte-oriented.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { bytes: Vec::with_capacity(capacity) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Write a typed little-endian primitive.
    #[inline]
    pub fn write<T: Primitive>(&mut self, value: T) {
        value.write_le(self);
    }

    /// Overwrite `count` already-written bytes ending at the current length
    /// minus nothing -- used only for patching a length prefix written as a
    /// placeholder. Returns the absolute byte offset the caller can later
    /// splice into, without exposing a general seek.
    pub fn reserve_placeholder(&mut self, count: usize) -> usize {
        let at = self.bytes.len();
        self.bytes.resize(at + count, 0);
        at
    }

    pub fn patch(&mut self, at: usize, bytes: &[u8]) {
        self.bytes[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_primitives_advances_cursor() {
        let bytes: &[u8] = &[0x01, 0x00, 0x00, 0x00, 0xFF];
        let mut stream = BufferStream::new(bytes);
        assert_eq!(stream.read::<u32>().unwrap(), 1);
        assert_eq!(stream.read_u8().unwrap(), 0xFF);
        assert!(!stream.has_remaining());
    }

    #[test]
    fn peek_does_not_advance() {
        let bytes: &[u8] = &[5, 6, 7];
        let stream = BufferStream::new(bytes);
        assert_eq!(stream.peek_u8().unwrap(), 5);
        assert_eq!(stream.peek_u8().unwrap(), 5);
    }

    #[test]
    fn read_past_end_fails() {
        let bytes: &[u8] = &[1];
        let mut stream = BufferStream::new(bytes);
        assert!(stream.read::<u32>().is_err());
    }

    #[test]
    fn consume_borrows_without_copy() {
        let bytes: &[u8] = &[1, 2, 3, 4];
        let mut stream = BufferStream::new(bytes);
        let slice = stream.consume(2).unwrap();
        assert_eq!(slice, &[1, 2]);
        assert_eq!(stream.remaining(), 2);
    }
}
