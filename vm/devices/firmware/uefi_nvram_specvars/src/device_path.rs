// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Device path decoding (UEFI spec 10.2 - 10.3).
//!
//! Only media device nodes are decoded into structured fields. A device path
//! stops at its end node, or, under [`DecodePolicy::Lenient`], at the first
//! node of any other type. The two outcomes are reported separately through
//! [`Termination`].

use crate::cursor::Cursor;
use crate::media::decode_media;
use crate::media::MediaDevice;
use crate::write_hex;
use crate::DecodeOptions;
use crate::DecodePolicy;
use crate::Error;
use std::fmt;
use uefi_specs::uefi::boot;
use uefi_specs::uefi::boot::EfiDeviceType;
use uefi_specs::uefi::boot::EfiEndDeviceSubType;
use uefi_specs::uefi::boot::EfiMediaDeviceSubType;

/// A decoded device path node.
#[derive(Debug, PartialEq, Eq)]
pub struct DevicePathNode<'a> {
    /// Absolute offset of the node header.
    pub offset: usize,
    pub device_type: EfiDeviceType,
    pub sub_type: u8,
    /// Declared length, header included.
    pub length: u16,
    pub media: MediaDevice<'a>,
}

impl fmt::Display for DevicePathNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.media, f)
    }
}

/// The subtype of an end node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDevice {
    /// End of this device path instance. Another instance may follow.
    Instance,
    /// End of the entire device path.
    Entire,
    Unknown(EfiEndDeviceSubType),
}

impl From<EfiEndDeviceSubType> for EndDevice {
    fn from(sub_type: EfiEndDeviceSubType) -> Self {
        match sub_type {
            EfiEndDeviceSubType::INSTANCE => EndDevice::Instance,
            EfiEndDeviceSubType::ENTIRE => EndDevice::Entire,
            sub_type => EndDevice::Unknown(sub_type),
        }
    }
}

/// A node this crate does not decode. Its raw payload is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedNode<'a> {
    pub offset: usize,
    pub device_type: EfiDeviceType,
    pub sub_type: u8,
    pub length: u16,
    pub path_data: &'a [u8],
}

impl fmt::Display for UnsupportedNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({},{},", self.device_type.0, self.sub_type)?;
        write_hex(f, self.path_data)?;
        write!(f, ")")
    }
}

/// Why decoding of a device path stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination<'a> {
    /// An end node was reached.
    End(EndDevice),
    /// A node of an unsupported type was reached. Everything before it was
    /// decoded, and the cursor has been advanced past it.
    Unsupported(UnsupportedNode<'a>),
}

/// Result of decoding a single node.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodedNode<'a> {
    Node(DevicePathNode<'a>),
    End(EndDevice),
    Unsupported(UnsupportedNode<'a>),
}

/// Decode a single device path node.
///
/// On success the cursor has advanced by exactly the node's declared length,
/// whichever kind of node was read.
pub fn decode_node<'a>(
    cursor: &mut Cursor<'a>,
    options: &DecodeOptions,
) -> Result<DecodedNode<'a>, Error> {
    let offset = cursor.offset();
    let header = cursor.read::<boot::EfiDevicePathProtocol>()?;
    let length = header.length.get();
    let payload_len = usize::from(length)
        .checked_sub(size_of::<boot::EfiDevicePathProtocol>())
        .ok_or(Error::InvalidNodeLength { offset, length })?;
    let payload = cursor.split(payload_len)?;

    tracing::trace!(
        offset,
        device_type = ?header.device_type,
        sub_type = header.sub_type,
        length,
        "device path node"
    );

    Ok(match header.device_type {
        EfiDeviceType::MEDIA => DecodedNode::Node(DevicePathNode {
            offset,
            device_type: header.device_type,
            sub_type: header.sub_type,
            length,
            media: decode_media(
                offset,
                length,
                EfiMediaDeviceSubType(header.sub_type),
                payload,
                options,
            )?,
        }),
        EfiDeviceType::END => DecodedNode::End(EfiEndDeviceSubType(header.sub_type).into()),
        device_type => match options.policy {
            DecodePolicy::Strict => {
                return Err(Error::UnsupportedNode {
                    offset,
                    device_type,
                    sub_type: header.sub_type,
                })
            }
            DecodePolicy::Lenient => DecodedNode::Unsupported(UnsupportedNode {
                offset,
                device_type,
                sub_type: header.sub_type,
                length,
                path_data: payload.remaining(),
            }),
        },
    })
}

/// A single device path instance: its decoded nodes in wire order, and how
/// it ended.
#[derive(Debug, PartialEq, Eq)]
pub struct DevicePath<'a> {
    pub nodes: Vec<DevicePathNode<'a>>,
    pub termination: Termination<'a>,
}

impl<'a> DevicePath<'a> {
    /// Decode nodes until an end node or, under the lenient policy, an
    /// unsupported node.
    ///
    /// Running out of data before either is reached is [`Error::Truncated`].
    pub fn decode(cursor: &mut Cursor<'a>, options: &DecodeOptions) -> Result<Self, Error> {
        let mut nodes = Vec::new();
        let termination = loop {
            match decode_node(cursor, options)? {
                DecodedNode::Node(node) => nodes.push(node),
                DecodedNode::End(end) => break Termination::End(end),
                DecodedNode::Unsupported(node) => {
                    tracing::debug!(
                        offset = node.offset,
                        device_type = ?node.device_type,
                        sub_type = node.sub_type,
                        decoded = nodes.len(),
                        "stopping device path at unsupported node"
                    );
                    break Termination::Unsupported(node);
                }
            }
        };
        Ok(DevicePath { nodes, termination })
    }

    /// Decode a device path from the start of `data`, returning it along with
    /// the bytes that follow it.
    pub fn parse(data: &'a [u8], options: &DecodeOptions) -> Result<(Self, &'a [u8]), Error> {
        let mut cursor = Cursor::new(data);
        let path = Self::decode(&mut cursor, options)?;
        Ok((path, cursor.remaining()))
    }

    /// Whether decoding stopped at an unsupported node rather than an end
    /// node.
    pub fn is_partial(&self) -> bool {
        matches!(self.termination, Termination::Unsupported(_))
    }
}

impl fmt::Display for DevicePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for node in &self.nodes {
            write!(f, "{sep}{node}")?;
            sep = "/";
        }
        if let Termination::Unsupported(node) = &self.termination {
            write!(f, "{sep}{node}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::HardDrive;
    use guid::Guid;
    use test_with_tracing::test;
    use uefi_specs::uefi::boot::EfiPartitionFormat;
    use uefi_specs::uefi::boot::EfiSignatureType;

    pub const PARTITION_GUID: Guid = Guid::from_static_str("8f5c7a3e-1d2b-4c6e-9a0f-3b7d5e1c2a48");

    pub fn node(device_type: u8, sub_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut v = vec![device_type, sub_type];
        v.extend_from_slice(&(4 + payload.len() as u16).to_le_bytes());
        v.extend_from_slice(payload);
        v
    }

    pub fn hard_drive_node() -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&0x800u64.to_le_bytes());
        payload.extend_from_slice(&0x32000u64.to_le_bytes());
        payload.extend_from_slice(&PARTITION_GUID.to_le_bytes());
        payload.push(0x02);
        payload.push(0x02);
        node(0x04, 0x01, &payload)
    }

    pub fn file_node(path: &str) -> Vec<u8> {
        let mut payload: Vec<u8> = path.encode_utf16().flat_map(u16::to_le_bytes).collect();
        payload.extend_from_slice(&[0, 0]);
        node(0x04, 0x04, &payload)
    }

    pub fn end_entire() -> Vec<u8> {
        node(0x7F, 0xFF, &[])
    }

    pub fn end_instance() -> Vec<u8> {
        node(0x7F, 0x01, &[])
    }

    #[test]
    fn hard_drive_node_leaves_cursor_at_sibling() {
        let mut data = hard_drive_node();
        assert_eq!(data.len(), 42);
        data.extend(end_entire());

        let mut cursor = Cursor::new(&data);
        let decoded = decode_node(&mut cursor, &DecodeOptions::default()).unwrap();
        assert_eq!(cursor.offset(), 42);

        let DecodedNode::Node(node) = decoded else {
            panic!("expected a media node, got {decoded:?}");
        };
        assert_eq!(node.offset, 0);
        assert_eq!(node.length, 42);
        assert_eq!(
            node.media,
            MediaDevice::HardDrive(HardDrive {
                partition_number: 1,
                partition_start: 0x800,
                partition_size: 0x32000,
                partition_signature: PARTITION_GUID.to_le_bytes(),
                partition_format: EfiPartitionFormat::GUID,
                signature_type: EfiSignatureType::GUID,
            })
        );

        assert_eq!(
            decode_node(&mut cursor, &DecodeOptions::default()).unwrap(),
            DecodedNode::End(EndDevice::Entire)
        );
        assert!(cursor.is_empty());
    }

    #[test]
    fn well_formed_path_consumes_everything() {
        let mut data = hard_drive_node();
        data.extend(file_node(r"\EFI\BOOT\BOOTX64.EFI"));
        data.extend(end_entire());

        let (path, rest) = DevicePath::parse(&data, &DecodeOptions::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(path.termination, Termination::End(EndDevice::Entire));
        assert_eq!(path.nodes.len(), 2);
        assert_eq!(path.nodes[1].offset, 42);
        assert!(
            matches!(&path.nodes[1].media, MediaDevice::File(f) if f.to_string() == r"\EFI\BOOT\BOOTX64.EFI")
        );
        assert_eq!(
            path.to_string(),
            format!(r"HD(1,GPT,{PARTITION_GUID},0x800,0x32000)/\EFI\BOOT\BOOTX64.EFI")
        );
    }

    #[test]
    fn unsupported_type_after_nodes_stops_without_error() {
        let mut data = hard_drive_node();
        data.extend(file_node("a"));
        // ACPI node
        data.extend(node(0x02, 0x01, &[0xD0, 0x41, 0x03, 0x0A, 0, 0, 0, 0]));
        data.extend(end_entire());

        let (path, rest) = DevicePath::parse(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(path.nodes.len(), 2);
        assert!(path.is_partial());
        let Termination::Unsupported(unsupported) = path.termination else {
            panic!("expected unsupported termination");
        };
        assert_eq!(unsupported.offset, 42 + 8);
        assert_eq!(unsupported.device_type, EfiDeviceType::ACPI);
        assert_eq!(unsupported.path_data.len(), 8);
        // cursor advanced past the unsupported node
        assert_eq!(rest, end_entire());
        assert!(path.to_string().ends_with("/Path(2,1,d041030a00000000)"));
    }

    #[test]
    fn strict_policy_rejects_unsupported_type() {
        let mut data = file_node("a");
        data.extend(node(0x03, 0x02, &[0; 4]));
        data.extend(end_entire());

        let err = DevicePath::parse(&data, &DecodeOptions::strict()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedNode {
                offset: 8,
                device_type: EfiDeviceType::MESSAGING,
                sub_type: 2,
            }
        ));
    }

    #[test]
    fn unknown_type_after_nodes() {
        let mut data = file_node("a");
        data.extend(file_node("b"));
        data.extend(node(0x10, 0x03, &[0x01, 0x02]));
        data.extend(end_entire());

        let (path, rest) = DevicePath::parse(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(path.nodes.len(), 2);
        assert_eq!(
            path.termination,
            Termination::Unsupported(UnsupportedNode {
                offset: 16,
                device_type: EfiDeviceType(0x10),
                sub_type: 3,
                length: 6,
                path_data: &[0x01, 0x02],
            })
        );
        assert_eq!(rest, end_entire());
        assert_eq!(path.to_string(), "a/b/Path(16,3,0102)");

        let err = DevicePath::parse(&data, &DecodeOptions::strict()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedNode {
                offset: 16,
                device_type: EfiDeviceType(0x10),
                sub_type: 3,
            }
        ));
    }

    #[test]
    fn end_node_with_unknown_subtype() {
        let mut data = file_node("a");
        data.extend(node(0x7F, 0x02, &[]));

        let (path, rest) = DevicePath::parse(&data, &DecodeOptions::strict()).unwrap();
        assert!(rest.is_empty());
        assert!(!path.is_partial());
        assert_eq!(
            path.termination,
            Termination::End(EndDevice::Unknown(EfiEndDeviceSubType(0x02)))
        );
    }

    #[test]
    fn unknown_media_subtype() {
        let mut data = node(0x04, 0x07, &[0xAB; 16]);
        data.extend(end_entire());

        let (path, _) = DevicePath::parse(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(
            path.nodes[0].media,
            MediaDevice::Unknown {
                sub_type: EfiMediaDeviceSubType::PIWG_FIRMWARE_VOLUME,
                path_data: &[0xAB; 16],
            }
        );
        assert!(path.to_string().starts_with("MediaPath(7,abab"));

        let err = DevicePath::parse(&data, &DecodeOptions::strict()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedNode {
                offset: 0,
                device_type: EfiDeviceType::MEDIA,
                sub_type: 7,
            }
        ));
    }

    #[test]
    fn firmware_file_node() {
        let fv_file = Guid::from_static_str("7c04a583-9e3e-4f1c-ad65-e05268d0b4d1");
        let mut data = node(0x04, 0x06, &fv_file.to_le_bytes());
        data.extend(end_entire());

        let (path, _) = DevicePath::parse(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(path.nodes[0].media, MediaDevice::PiwgFirmwareFile(fv_file));
        assert_eq!(path.to_string(), format!("FvFile({fv_file})"));
    }

    #[test]
    fn short_payload_is_truncated() {
        // declares a full hard drive node but only carries 10 payload bytes
        let mut data = vec![0x04, 0x01, 42, 0];
        data.extend_from_slice(&[0; 10]);

        let err = DevicePath::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 4,
                needed: 38,
                available: 10,
            }
        ));
    }

    #[test]
    fn declared_length_too_small_for_variant_is_truncated() {
        // a hard drive node that declares only 20 bytes
        let mut data = vec![0x04, 0x01, 20, 0];
        data.extend_from_slice(&[0; 60]);

        let err = DevicePath::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 4,
                needed: 38,
                available: 16,
            }
        ));
    }

    #[test]
    fn declared_length_below_header() {
        let data = [0x04, 0x04, 3, 0, 0, 0];
        let err = DevicePath::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidNodeLength {
                offset: 0,
                length: 3
            }
        ));
    }

    #[test]
    fn excess_payload_is_length_mismatch() {
        let mut data = node(0x04, 0x06, &[0; 20]);
        data.extend(end_entire());

        let err = DevicePath::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                offset: 0,
                declared: 24,
                consumed: 20,
            }
        ));
    }

    #[test]
    fn file_path_is_bounded_by_node() {
        // the terminator only appears after the node's declared length
        let mut data = node(0x04, 0x04, &[b'a', 0, b'b', 0]);
        data.extend_from_slice(&[0, 0]);

        let err = DevicePath::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidString { offset: 4, .. }));
    }

    #[test]
    fn missing_terminator_is_truncated() {
        let data = file_node("a");
        let err = DevicePath::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 8,
                needed: 4,
                available: 0,
            }
        ));

        let err = DevicePath::parse(&[0x7F, 0xFF], &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 0, .. }));
    }
}
