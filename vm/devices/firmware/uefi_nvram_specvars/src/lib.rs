// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decoders for UEFI NVRAM variable contents: device paths, boot load options,
//! the boot order, and signature lists.
//!
//! Every decoder reads from a bounds-checked [`Cursor`] and reports failures
//! with the absolute byte offset at which they occurred.

#![expect(missing_docs)]

pub mod boot_order;
mod cursor;
pub mod device_path;
pub mod load_option;
pub mod media;
pub mod signature_list;

pub use cursor::Cursor;
pub use device_path::DevicePath;
pub use device_path::DevicePathNode;
pub use device_path::EndDevice;
pub use device_path::Termination;
pub use device_path::UnsupportedNode;
pub use load_option::LoadOption;
pub use media::HardDrive;
pub use media::MediaDevice;

use std::fmt;
use thiserror::Error;
use uefi_specs::uefi::boot::EfiDeviceType;

/// Errors which may occur while decoding a device path or load option.
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated data at offset {offset:#x}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("device path node at offset {offset:#x} declares length {length}, less than its header")]
    InvalidNodeLength { offset: usize, length: u16 },
    #[error("structure at offset {offset:#x} declares {declared} bytes but {consumed} were decoded")]
    LengthMismatch {
        offset: usize,
        declared: usize,
        consumed: usize,
    },
    #[error("invalid UCS-2 string at offset {offset:#x}")]
    InvalidString {
        offset: usize,
        #[source]
        source: ucs2::Ucs2ParseError,
    },
    #[error("unsupported device path node at offset {offset:#x} (type {device_type:?}, subtype {sub_type:#04x})")]
    UnsupportedNode {
        offset: usize,
        device_type: EfiDeviceType,
        sub_type: u8,
    },
    #[error("boot order length {0} is not a multiple of 2")]
    InvalidBootOrderLength(usize),
}

/// How decoders treat nodes they do not implement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Stop the current device path at the first unsupported node and return
    /// what was decoded so far. Unknown media subtypes are kept as raw bytes.
    #[default]
    Lenient,
    /// Fail with [`Error::UnsupportedNode`].
    Strict,
}

/// Options for the device path and load option decoders.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeOptions {
    pub policy: DecodePolicy,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self {
            policy: DecodePolicy::Strict,
        }
    }
}

pub(crate) fn write_hex(f: &mut fmt::Formatter<'_>, data: &[u8]) -> fmt::Result {
    for b in data {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parsing boot order")]
    BootOrder(#[source] Error),
    #[error("parsing load option")]
    LoadOption(#[source] Error),
    #[error("parsing signature list")]
    SignatureList(#[from] signature_list::ParseError),
}

#[derive(Debug)]
pub enum ParsedNvramEntry<'a> {
    BootOrder(Vec<u16>),
    Boot(LoadOption<'a>),
    SignatureList(Vec<signature_list::SignatureList<'a>>),
    Unknown(&'a [u8]),
}

/// Whether `name` is a `Boot####` load option variable (four hex digits).
fn is_boot_option_name(name: &str) -> bool {
    name.strip_prefix("Boot")
        .is_some_and(|x| x.len() == 4 && x.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Decode the contents of a well-known variable based on its name.
pub fn parse_nvram_entry<'a>(
    name: &str,
    data: &'a [u8],
) -> Result<ParsedNvramEntry<'a>, ParseError> {
    Ok(match name {
        "BootOrder" => ParsedNvramEntry::BootOrder(
            boot_order::parse_boot_order(data)
                .map_err(ParseError::BootOrder)?
                .collect(),
        ),
        _ if is_boot_option_name(name) => ParsedNvramEntry::Boot(
            LoadOption::parse(data, &DecodeOptions::default()).map_err(ParseError::LoadOption)?,
        ),
        "KEK" | "db" | "dbx" | "PK" | "dbDefault" => {
            ParsedNvramEntry::SignatureList(signature_list::parse_signature_lists(data)?)
        }
        _ => ParsedNvramEntry::Unknown(data),
    })
}
