// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The buffer that is signed when writing an authenticated variable.

use guid::Guid;
use uefi_specs::uefi::nvram::EfiVariableAttributes;
use uefi_specs::uefi::time::EFI_TIME;
use zerocopy::IntoBytes;

/// The fields covered by an authenticated variable's signature.
///
/// See bullet point 2. in UEFI spec 8.2.2. Firmware rebuilds the same
/// buffer from the variable's name, vendor and attributes, together with the
/// timestamp carried in the descriptor, so the layout is fixed here rather
/// than by the caller.
#[derive(Debug, Clone, Copy)]
pub struct SignedFields<'a> {
    /// Variable name as UCS-2 LE, without a terminator unless the caller
    /// includes one.
    pub name: &'a [u8],
    pub vendor: Guid,
    pub attributes: EfiVariableAttributes,
    pub timestamp: EFI_TIME,
    pub data: &'a [u8],
}

impl SignedFields<'_> {
    /// Serialize `name | vendor | attributes | timestamp | data`, without
    /// padding.
    pub fn to_signing_buffer(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            self.name.len() + size_of::<Guid>() + 4 + size_of::<EFI_TIME>() + self.data.len(),
        );
        buf.extend_from_slice(self.name);
        buf.extend_from_slice(&self.vendor.to_le_bytes());
        buf.extend_from_slice(&u32::from(self.attributes).to_le_bytes());
        buf.extend_from_slice(self.timestamp.as_bytes());
        buf.extend_from_slice(self.data);
        buf
    }
}
