// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// UNSAFETY: Defining and implementing from_slice_unchecked.
#![expect(unsafe_code)]

//! Wrappers around possibly misaligned `[u8]` buffers containing UCS-2 LE data.

use std::fmt;
use thiserror::Error;

/// Errors which may occur while parsing UCS-2
#[derive(Debug, Error)]
pub enum Ucs2ParseError {
    /// buffer's length was not a multiple of 2
    #[error("buffer's length was not a multiple of 2")]
    NotMultiple2,
    /// buffer did not contain a null terminator
    #[error("buffer did not contain a null terminator")]
    MissingNullTerm,
}

/// Owned, null-terminated UCS-2 LE string.
///
/// Backed by a `Vec<u8>`, so the data is **not** guaranteed to be `u16`
/// aligned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ucs2LeVec(Vec<u8>);

impl Ucs2LeVec {
    /// Validate that the provided `Vec<u8>` is a valid null-terminated UCS-2 LE
    /// string, truncating it to the position of the first null u16.
    pub fn from_vec_with_nul(mut buf: Vec<u8>) -> Result<Ucs2LeVec, Ucs2ParseError> {
        let len = Ucs2LeSlice::from_slice_with_nul(&buf)?.0.len();
        buf.truncate(len);
        Ok(Ucs2LeVec(buf))
    }

    /// Consume self, returning the underlying raw `Vec<u8>`
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Ucs2LeVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_ref(), f)
    }
}

impl fmt::Display for Ucs2LeVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_ref(), f)
    }
}

impl AsRef<Ucs2LeSlice> for Ucs2LeVec {
    fn as_ref(&self) -> &Ucs2LeSlice {
        // SAFETY: Ucs2LeVec can only contain valid UCS-2 data
        unsafe { Ucs2LeSlice::from_slice_unchecked(&self.0) }
    }
}

impl std::ops::Deref for Ucs2LeVec {
    type Target = Ucs2LeSlice;

    fn deref(&self) -> &Ucs2LeSlice {
        self.as_ref()
    }
}

impl std::borrow::Borrow<Ucs2LeSlice> for Ucs2LeVec {
    fn borrow(&self) -> &Ucs2LeSlice {
        self.as_ref()
    }
}

impl From<&str> for Ucs2LeVec {
    fn from(s: &str) -> Ucs2LeVec {
        let mut buf = s
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect::<Vec<u8>>();
        buf.extend_from_slice(&[0, 0]);
        Ucs2LeVec(buf)
    }
}

/// Borrowed, null-terminated UCS-2 LE string.
///
/// Because `Ucs2LeSlice` uses a `[u8]` as the backing data type (as opposed to
/// a `[u16]`), the data is **not** guaranteed to be `u16` aligned!
///
/// # Example
///
/// ```
/// # use ucs2::Ucs2LeSlice;
/// let raw = [b'O', 0, b'K', 0, 0, 0, 0xAA];
/// let (s, rest) = Ucs2LeSlice::split_with_nul(&raw).unwrap();
/// assert_eq!(s.as_bytes().len(), 6);
/// assert_eq!(s.to_string(), "OK");
/// assert_eq!(rest, [0xAA]);
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ucs2LeSlice([u8]);

impl Ucs2LeSlice {
    /// Validate that the provided `&[u8]` is a valid null-terminated UCS-2 LE
    /// string, truncating the slice to the position of the first null u16.
    ///
    /// The entire buffer must have an even length.
    pub fn from_slice_with_nul(buf: &[u8]) -> Result<&Ucs2LeSlice, Ucs2ParseError> {
        if buf.len() % 2 != 0 {
            return Err(Ucs2ParseError::NotMultiple2);
        }
        Self::split_with_nul(buf).map(|(s, _)| s)
    }

    /// Split a null-terminated UCS-2 LE string off the front of `buf`,
    /// returning the string (including its terminator) and the bytes that
    /// follow it.
    ///
    /// Unlike [`Self::from_slice_with_nul`], `buf` may have any length, which
    /// makes this suitable for reading a string out of a larger record.
    pub fn split_with_nul(buf: &[u8]) -> Result<(&Ucs2LeSlice, &[u8]), Ucs2ParseError> {
        // All values from 0 to 0xFFFF are valid UCS-2 codepoints, so finding
        // the terminator is the only validation required.
        let end = buf
            .chunks_exact(2)
            .position(|c| c == [0, 0])
            .map(|idx| (idx + 1) * 2)
            .ok_or(Ucs2ParseError::MissingNullTerm)?;

        let (s, rest) = buf.split_at(end);
        // SAFETY: `s` is even-length and ends with its first null u16.
        Ok((unsafe { Ucs2LeSlice::from_slice_unchecked(s) }, rest))
    }

    /// Create a `Ucs2LeSlice` from a raw `&[u8]` without performing any
    /// validation.
    ///
    /// # Safety
    ///
    /// Callers must ensure that the buf has a length that is a multiple of 2
    /// and terminates with a single null u16.
    unsafe fn from_slice_unchecked(buf: &[u8]) -> &Ucs2LeSlice {
        // SAFETY: caller has maintained invariants, and `Ucs2LeSlice` has the
        // same representation as [u8]
        unsafe { std::mem::transmute(buf) }
    }

    /// View the underlying data as raw bytes, including the trailing null.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the underlying data as raw bytes, without the trailing null `u16`.
    pub fn as_bytes_without_nul(&self) -> &[u8] {
        &self.0[..self.0.len() - 2]
    }

    /// Number of UCS-2 code units, not counting the terminator.
    pub fn len_chars(&self) -> usize {
        self.0.len() / 2 - 1
    }

    /// Whether the string is empty (only a terminator).
    pub fn is_empty(&self) -> bool {
        self.0.len() == 2
    }

    /// Copies `self` into a new [`Ucs2LeVec`].
    pub fn to_ucs2_le_vec(&self) -> Ucs2LeVec {
        Ucs2LeVec(self.0.to_vec())
    }

    fn to_string_inner(&self) -> String {
        // UCS-2 is not UTF-16: unpaired surrogates are legal here, so they are
        // replaced rather than rejected.
        String::from_utf16_lossy(
            &self
                .as_bytes_without_nul()
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect::<Vec<u16>>(),
        )
    }
}

impl ToOwned for Ucs2LeSlice {
    type Owned = Ucs2LeVec;

    fn to_owned(&self) -> Ucs2LeVec {
        self.to_ucs2_le_vec()
    }
}

impl fmt::Debug for Ucs2LeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_inner(), f)
    }
}

impl fmt::Display for Ucs2LeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_string_inner(), f)
    }
}
