// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Definitions related to UEFI boot entries and device paths.

use bitfield_struct::bitfield;
use static_assertions::const_assert_eq;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::LittleEndian;
use zerocopy::Unaligned;
use zerocopy::U16;
use zerocopy::U32;
use zerocopy::U64;

/// From UEFI spec 10.2 - EFI Device Path Protocol
///
/// Generic header shared by every device path node. `length` covers the
/// header itself plus the node-specific payload that follows it.
#[repr(C)]
#[derive(Copy, Clone, Debug, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
pub struct EfiDevicePathProtocol {
    pub device_type: EfiDeviceType,
    pub sub_type: u8,
    pub length: U16<LittleEndian>,
}

const_assert_eq!(size_of::<EfiDevicePathProtocol>(), 4);

/// From UEFI spec 3.1.3 - Load Options
///
/// Fixed-size prefix of an `EFI_LOAD_OPTION`. It is followed by the
/// null-terminated `Description`, `FilePathList[]` (exactly
/// `file_path_list_length` bytes), and `OptionalData`.
#[repr(C)]
#[derive(Copy, Clone, Debug, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
pub struct EfiLoadOption {
    pub attributes: U32<LittleEndian>,
    pub file_path_list_length: U16<LittleEndian>,
}

const_assert_eq!(size_of::<EfiLoadOption>(), 6);

/// From UEFI spec 3.1.3 - Load Option Attributes
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct LoadOptionAttributes {
    /// LOAD_OPTION_ACTIVE
    pub active: bool,
    /// LOAD_OPTION_FORCE_RECONNECT
    pub force_reconnect: bool,
    #[bits(1)]
    _rsvd0: u8,
    /// LOAD_OPTION_HIDDEN
    pub hidden: bool,
    #[bits(4)]
    _rsvd1: u8,
    /// LOAD_OPTION_CATEGORY (0 = boot, 1 = application)
    #[bits(5)]
    pub category: u8,
    #[bits(19)]
    _rsvd2: u32,
}

open_enum::open_enum! {
    /// From UEFI spec 10.3.1 - Generic Device Path Structures
    #[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
    pub enum EfiDeviceType: u8 {
        HARDWARE = 0x01,
        ACPI = 0x02,
        MESSAGING = 0x03,
        MEDIA = 0x04,
        BIOS_BOOT_SPEC = 0x05,
        END = 0x7F,
    }
}

open_enum::open_enum! {
    /// From UEFI spec 10.3.1 - End of Hardware Device Path subtypes
    #[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
    pub enum EfiEndDeviceSubType: u8 {
        INSTANCE = 0x01,
        ENTIRE = 0xFF,
    }
}

open_enum::open_enum! {
    /// From UEFI spec 10.3.5 - Media Device Path
    #[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
    pub enum EfiMediaDeviceSubType: u8 {
        HARD_DRIVE = 0x01,
        CD_ROM = 0x02,
        VENDOR = 0x03,
        FILE = 0x04,
        MEDIA_PROTOCOL = 0x05,
        PIWG_FIRMWARE_FILE = 0x06,
        PIWG_FIRMWARE_VOLUME = 0x07,
        RELATIVE_OFFSET_RANGE = 0x08,
        RAM_DISK = 0x09,
    }
}

open_enum::open_enum! {
    /// From UEFI spec 10.3.5.1 - Hard Drive Media Device Path
    #[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
    pub enum EfiPartitionFormat: u8 {
        MBR = 0x01,
        GUID = 0x02,
    }
}

open_enum::open_enum! {
    /// From UEFI spec 10.3.5.1 - Hard Drive Media Device Path
    #[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
    pub enum EfiSignatureType: u8 {
        NONE = 0x00,
        MBR = 0x01,
        GUID = 0x02,
    }
}

/// From UEFI spec 10.3.5.1 - Hard Drive Media Device Path
///
/// Payload following the [`EfiDevicePathProtocol`] header, so a well-formed
/// node has a declared length of 42.
#[repr(C)]
#[derive(Copy, Clone, Debug, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
pub struct EfiHardDriveDevice {
    pub partition_number: U32<LittleEndian>,
    pub partition_start: U64<LittleEndian>,
    pub partition_size: U64<LittleEndian>,
    /// GPT partition GUID, or the 32-bit MBR disk signature zero-extended
    /// to 16 bytes, depending on `signature_type`.
    pub partition_signature: [u8; 16],
    pub partition_format: EfiPartitionFormat,
    pub signature_type: EfiSignatureType,
}

const_assert_eq!(size_of::<EfiHardDriveDevice>(), 38);
