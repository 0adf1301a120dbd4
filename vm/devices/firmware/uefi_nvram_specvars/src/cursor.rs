// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Forward-only reader over a borrowed byte buffer.

use crate::Error;
use ucs2::Ucs2LeSlice;
use zerocopy::FromBytes;

/// A forward-only cursor over a byte buffer that tracks its absolute offset,
/// so that errors can report where in the original record they occurred.
///
/// Sub-cursors created with [`Cursor::split`] keep the absolute offset of the
/// region they cover.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at the start of `buf` (offset 0).
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.buf
    }

    /// Number of bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() < len {
            return Err(Error::Truncated {
                offset: self.offset,
                needed: len,
                available: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        self.offset += len;
        Ok(head)
    }

    /// Consume exactly `len` bytes, returning a cursor bounded to them.
    pub fn split(&mut self, len: usize) -> Result<Cursor<'a>, Error> {
        let offset = self.offset;
        let buf = self.take(len)?;
        Ok(Cursor { buf, offset })
    }

    /// Consume everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.offset += rest.len();
        self.buf = &[];
        rest
    }

    /// Read a fixed-size little-endian wire struct.
    pub fn read<T: FromBytes>(&mut self) -> Result<T, Error> {
        let offset = self.offset;
        let needed = size_of::<T>();
        let bytes = self.take(needed)?;
        T::read_from_bytes(bytes).map_err(|_| Error::Truncated {
            offset,
            needed,
            available: bytes.len(),
        })
    }

    /// Read a null-terminated UCS-2 LE string. The terminator is consumed and
    /// included in the returned slice.
    pub fn read_ucs2(&mut self) -> Result<&'a Ucs2LeSlice, Error> {
        let offset = self.offset;
        let (s, _) = Ucs2LeSlice::split_with_nul(self.buf)
            .map_err(|source| Error::InvalidString { offset, source })?;
        self.take(s.as_bytes().len())?;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_with_tracing::test;
    use zerocopy::LittleEndian;
    use zerocopy::U32;

    #[test]
    fn reads_advance_offset() {
        let data = [0x78, 0x56, 0x34, 0x12, b'A', 0, 0, 0, 0xEE];
        let mut c = Cursor::new(&data);
        assert_eq!(c.read::<U32<LittleEndian>>().unwrap().get(), 0x12345678);
        assert_eq!(c.offset(), 4);
        assert_eq!(c.read_ucs2().unwrap().to_string(), "A");
        assert_eq!(c.offset(), 8);
        assert_eq!(c.rest(), [0xEE]);
        assert!(c.is_empty());
        assert_eq!(c.offset(), 9);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let data = [0u8; 6];
        let mut c = Cursor::new(&data);
        c.take(4).unwrap();
        let err = c.read::<U32<LittleEndian>>().unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 4,
                needed: 4,
                available: 2
            }
        ));
        // a failed read does not consume anything
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn split_is_bounded_and_keeps_absolute_offset() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut c = Cursor::new(&data);
        c.take(1).unwrap();
        let mut sub = c.split(3).unwrap();
        assert_eq!(sub.offset(), 1);
        assert_eq!(c.offset(), 4);
        let err = sub.take(4).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 1,
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let data = [b'A', 0, b'B', 0];
        let mut c = Cursor::new(&data);
        assert!(matches!(
            c.read_ucs2(),
            Err(Error::InvalidString { offset: 0, .. })
        ));
    }
}
