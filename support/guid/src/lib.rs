// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Provides the [`Guid`] type with the same layout as the UEFI type `EFI_GUID`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::str::FromStr;
use thiserror::Error;
use zerocopy::FromBytes;
use zerocopy::FromZeros;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;

/// UEFI / Windows format GUID.
///
/// On the wire (and in firmware variables) the first three fields are stored
/// little-endian and `data4` is stored as-is. Use [`Guid::from_le_bytes`] and
/// [`Guid::to_le_bytes`] when the host byte order must not leak into a
/// serialized buffer.
#[repr(C)]
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, IntoBytes, FromBytes, Immutable, KnownLayout,
)]
#[expect(missing_docs)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

// Default + FromBytes: null-guid is a reasonable return default
impl Default for Guid {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

impl Guid {
    /// The all-zero GUID.
    pub const ZERO: Self = Self::from_static_str("00000000-0000-0000-0000-000000000000");

    /// Creates a new GUID from a string, panicking if the input is invalid.
    /// Accepted formats are "{00000000-0000-0000-0000-000000000000}" and
    /// "00000000-0000-0000-0000-000000000000".
    ///
    /// This is intended for `const` initializers. Use `from_str` for runtime
    /// input.
    pub const fn from_static_str(value: &'static str) -> Guid {
        match Self::parse(value.as_bytes()) {
            Ok(guid) => guid,
            Err(ParseError::Length) => panic!("Invalid GUID length."),
            Err(ParseError::Format) => panic!("Invalid GUID format."),
            Err(ParseError::Digit) => panic!("Invalid GUID digit."),
        }
    }

    /// Decode a GUID from its 16-byte mixed-endian wire representation.
    pub const fn from_le_bytes(b: [u8; 16]) -> Guid {
        Guid {
            data1: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            data2: u16::from_le_bytes([b[4], b[5]]),
            data3: u16::from_le_bytes([b[6], b[7]]),
            data4: [b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]],
        }
    }

    /// Encode the GUID into its 16-byte mixed-endian wire representation.
    pub const fn to_le_bytes(&self) -> [u8; 16] {
        let d1 = self.data1.to_le_bytes();
        let d2 = self.data2.to_le_bytes();
        let d3 = self.data3.to_le_bytes();
        let d4 = self.data4;
        [
            d1[0], d1[1], d1[2], d1[3], d2[0], d2[1], d3[0], d3[1], d4[0], d4[1], d4[2], d4[3],
            d4[4], d4[5], d4[6], d4[7],
        ]
    }

    /// Returns true if this is the all-zero GUID.
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    const fn parse(value: &[u8]) -> Result<Self, ParseError> {
        let offset = match value.len() {
            38 => {
                if value[0] != b'{' || value[37] != b'}' {
                    return Err(ParseError::Format);
                }
                1
            }
            36 => 0,
            _ => return Err(ParseError::Length),
        };

        // 32 hex digits, with dashes after the 8th, 12th, 16th and 20th digit.
        let mut digits = [0u8; 32];
        let mut n = 0;
        let mut i = offset;
        while i < offset + 36 {
            let c = value[i];
            let pos = i - offset;
            if pos == 8 || pos == 13 || pos == 18 || pos == 23 {
                if c != b'-' {
                    return Err(ParseError::Format);
                }
            } else {
                digits[n] = match c {
                    b'0'..=b'9' => c - b'0',
                    b'a'..=b'f' => 10 + c - b'a',
                    b'A'..=b'F' => 10 + c - b'A',
                    _ => return Err(ParseError::Digit),
                };
                n += 1;
            }
            i += 1;
        }

        // The textual form is big-endian for every field.
        let mut bytes = [0u8; 16];
        let mut j = 0;
        while j < 16 {
            bytes[j] = digits[2 * j] << 4 | digits[2 * j + 1];
            j += 1;
        }

        Ok(Guid {
            data1: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_be_bytes([bytes[4], bytes[5]]),
            data3: u16::from_be_bytes([bytes[6], bytes[7]]),
            data4: [
                bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14],
                bytes[15],
            ],
        })
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1],
        )?;
        for b in &self.data4[2..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// An error parsing a GUID.
#[derive(Debug, Error)]
#[expect(missing_docs)]
pub enum ParseError {
    #[error("invalid GUID length")]
    Length,
    #[error("invalid GUID format")]
    Format,
    #[error("invalid GUID digit")]
    Digit,
}

impl FromStr for Guid {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse(s.as_bytes())
    }
}

impl From<[u8; 16]> for Guid {
    fn from(value: [u8; 16]) -> Self {
        Guid::from_le_bytes(value)
    }
}

impl From<Guid> for [u8; 16] {
    fn from(value: Guid) -> Self {
        value.to_le_bytes()
    }
}
