// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Media device path nodes (UEFI spec 10.3.5).

use crate::cursor::Cursor;
use crate::write_hex;
use crate::DecodeOptions;
use crate::DecodePolicy;
use crate::Error;
use guid::Guid;
use std::fmt;
use ucs2::Ucs2LeSlice;
use uefi_specs::uefi::boot::EfiDeviceType;
use uefi_specs::uefi::boot::EfiHardDriveDevice;
use uefi_specs::uefi::boot::EfiMediaDeviceSubType;
use uefi_specs::uefi::boot::EfiPartitionFormat;
use uefi_specs::uefi::boot::EfiSignatureType;

/// A decoded hard drive media device path node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardDrive {
    pub partition_number: u32,
    pub partition_start: u64,
    pub partition_size: u64,
    pub partition_signature: [u8; 16],
    pub partition_format: EfiPartitionFormat,
    pub signature_type: EfiSignatureType,
}

impl From<EfiHardDriveDevice> for HardDrive {
    fn from(raw: EfiHardDriveDevice) -> Self {
        HardDrive {
            partition_number: raw.partition_number.get(),
            partition_start: raw.partition_start.get(),
            partition_size: raw.partition_size.get(),
            partition_signature: raw.partition_signature,
            partition_format: raw.partition_format,
            signature_type: raw.signature_type,
        }
    }
}

impl HardDrive {
    /// The GPT unique partition GUID, if the signature is a GUID.
    pub fn partition_guid(&self) -> Option<Guid> {
        (self.signature_type == EfiSignatureType::GUID)
            .then(|| Guid::from_le_bytes(self.partition_signature))
    }

    /// The 32-bit MBR disk signature, if the signature is an MBR signature.
    pub fn mbr_signature(&self) -> Option<u32> {
        let s = &self.partition_signature;
        (self.signature_type == EfiSignatureType::MBR)
            .then(|| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }
}

impl fmt::Display for HardDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HD({},", self.partition_number)?;
        match (self.partition_guid(), self.mbr_signature()) {
            (Some(guid), _) => write!(f, "GPT,{guid}")?,
            (_, Some(sig)) => write!(f, "MBR,{sig:#010x}")?,
            _ => write!(f, "{},0", self.partition_format.0)?,
        }
        write!(
            f,
            ",{:#x},{:#x})",
            self.partition_start, self.partition_size
        )
    }
}

/// Payload of a media device path node.
#[derive(Debug, PartialEq, Eq)]
pub enum MediaDevice<'a> {
    HardDrive(HardDrive),
    File(&'a Ucs2LeSlice),
    PiwgFirmwareFile(Guid),
    /// A subtype this crate does not decode. Only produced under
    /// [`DecodePolicy::Lenient`].
    Unknown {
        sub_type: EfiMediaDeviceSubType,
        path_data: &'a [u8],
    },
}

impl fmt::Display for MediaDevice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaDevice::HardDrive(hd) => fmt::Display::fmt(hd, f),
            MediaDevice::File(path) => fmt::Display::fmt(path, f),
            MediaDevice::PiwgFirmwareFile(guid) => write!(f, "FvFile({guid})"),
            MediaDevice::Unknown {
                sub_type,
                path_data,
            } => {
                write!(f, "MediaPath({},", sub_type.0)?;
                write_hex(f, path_data)?;
                write!(f, ")")
            }
        }
    }
}

/// Decode the payload of a media node that starts at `offset` and declares
/// `length` bytes (header included).
///
/// `payload` is bounded to the node, so no variant can read past the declared
/// length. Every payload byte must be consumed.
pub(crate) fn decode_media<'a>(
    offset: usize,
    length: u16,
    sub_type: EfiMediaDeviceSubType,
    mut payload: Cursor<'a>,
    options: &DecodeOptions,
) -> Result<MediaDevice<'a>, Error> {
    let media = match sub_type {
        EfiMediaDeviceSubType::HARD_DRIVE => {
            MediaDevice::HardDrive(payload.read::<EfiHardDriveDevice>()?.into())
        }
        EfiMediaDeviceSubType::FILE => MediaDevice::File(payload.read_ucs2()?),
        EfiMediaDeviceSubType::PIWG_FIRMWARE_FILE => {
            MediaDevice::PiwgFirmwareFile(Guid::from_le_bytes(payload.read::<[u8; 16]>()?))
        }
        sub_type => match options.policy {
            DecodePolicy::Strict => {
                return Err(Error::UnsupportedNode {
                    offset,
                    device_type: EfiDeviceType::MEDIA,
                    sub_type: sub_type.0,
                })
            }
            DecodePolicy::Lenient => {
                tracing::debug!(offset, ?sub_type, "skipping unsupported media device path node");
                MediaDevice::Unknown {
                    sub_type,
                    path_data: payload.rest(),
                }
            }
        },
    };

    if !payload.is_empty() {
        let declared = usize::from(length);
        return Err(Error::LengthMismatch {
            offset,
            declared,
            consumed: declared - payload.len(),
        });
    }

    Ok(media)
}
