// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `Boot####` load option decoding (UEFI spec 3.1.3).

use crate::cursor::Cursor;
use crate::device_path::DevicePath;
use crate::device_path::EndDevice;
use crate::device_path::Termination;
use crate::DecodeOptions;
use crate::Error;
use std::fmt;
use ucs2::Ucs2LeSlice;
use uefi_specs::uefi::boot;
use uefi_specs::uefi::boot::LoadOptionAttributes;

/// A decoded `EFI_LOAD_OPTION`.
#[derive(Debug)]
pub struct LoadOption<'a> {
    pub attributes: LoadOptionAttributes,
    pub file_path_list_length: u16,
    pub description: &'a Ucs2LeSlice,
    /// The first device path in the FilePathList, which describes the device
    /// and location of the image.
    pub file_path: DevicePath<'a>,
    /// Further device path instances. These are only present when each
    /// preceding instance ended with [`EndDevice::Instance`].
    pub additional_paths: Vec<DevicePath<'a>>,
    /// FilePathList bytes following an unsupported node, kept undecoded.
    pub undecoded_paths: &'a [u8],
    pub optional_data: &'a [u8],
}

impl<'a> LoadOption<'a> {
    /// Decode a load option that spans the rest of `cursor`.
    pub fn decode(cursor: &mut Cursor<'a>, options: &DecodeOptions) -> Result<Self, Error> {
        let header = cursor.read::<boot::EfiLoadOption>()?;
        let file_path_list_length = header.file_path_list_length.get();
        let description = cursor.read_ucs2()?;

        let list_offset = cursor.offset();
        let mut list = cursor.split(file_path_list_length.into())?;

        let file_path = DevicePath::decode(&mut list, options)?;
        let mut additional_paths = Vec::new();
        let mut undecoded_paths: &[u8] = &[];
        let mut last_termination = file_path.termination;
        loop {
            match last_termination {
                Termination::End(EndDevice::Instance) if !list.is_empty() => {
                    let path = DevicePath::decode(&mut list, options)?;
                    last_termination = path.termination;
                    additional_paths.push(path);
                }
                Termination::Unsupported(_) => {
                    undecoded_paths = list.rest();
                    break;
                }
                _ => break,
            }
        }

        if !list.is_empty() {
            let declared = usize::from(file_path_list_length);
            return Err(Error::LengthMismatch {
                offset: list_offset,
                declared,
                consumed: declared - list.len(),
            });
        }

        let optional_data = cursor.rest();

        tracing::trace!(
            description = %description,
            paths = 1 + additional_paths.len(),
            optional_data = optional_data.len(),
            "decoded load option"
        );

        Ok(LoadOption {
            attributes: LoadOptionAttributes::from(header.attributes.get()),
            file_path_list_length,
            description,
            file_path,
            additional_paths,
            undecoded_paths,
            optional_data,
        })
    }

    /// Decode a load option from a complete `Boot####` variable.
    pub fn parse(data: &'a [u8], options: &DecodeOptions) -> Result<Self, Error> {
        Self::decode(&mut Cursor::new(data), options)
    }

    /// All decoded device paths, in FilePathList order.
    pub fn device_paths(&self) -> impl Iterator<Item = &DevicePath<'a>> {
        std::iter::once(&self.file_path).chain(&self.additional_paths)
    }
}

impl fmt::Display for LoadOption<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        for path in self.device_paths() {
            write!(f, " {path}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_path::tests::end_entire;
    use crate::device_path::tests::end_instance;
    use crate::device_path::tests::file_node;
    use crate::device_path::tests::hard_drive_node;
    use crate::device_path::tests::node;
    use crate::MediaDevice;
    use test_with_tracing::test;

    fn load_option(attributes: u32, description: &str, list: &[u8], optional: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&attributes.to_le_bytes());
        v.extend_from_slice(&(list.len() as u16).to_le_bytes());
        v.extend(description.encode_utf16().flat_map(u16::to_le_bytes));
        v.extend_from_slice(&[0, 0]);
        v.extend_from_slice(list);
        v.extend_from_slice(optional);
        v
    }

    #[test]
    fn boot_entry() {
        let mut list = hard_drive_node();
        list.extend(file_node(r"\EFI\ubuntu\shimx64.efi"));
        list.extend(end_entire());
        let data = load_option(1, "ubuntu", &list, b"WINDOWS\0");

        let opt = LoadOption::parse(&data, &DecodeOptions::default()).unwrap();
        assert!(opt.attributes.active());
        assert!(!opt.attributes.hidden());
        assert_eq!(opt.description.to_string(), "ubuntu");
        assert_eq!(usize::from(opt.file_path_list_length), list.len());
        assert_eq!(opt.file_path.nodes.len(), 2);
        assert_eq!(opt.file_path.termination, Termination::End(EndDevice::Entire));
        // node offsets are relative to the start of the record
        assert_eq!(opt.file_path.nodes[0].offset, 6 + 14);
        assert!(opt.additional_paths.is_empty());
        assert!(opt.undecoded_paths.is_empty());
        assert_eq!(opt.optional_data, b"WINDOWS\0");
    }

    #[test]
    fn multiple_instances() {
        let mut list = file_node("a");
        list.extend(end_instance());
        list.extend(file_node("b"));
        list.extend(end_entire());
        let data = load_option(1, "x", &list, &[]);

        let opt = LoadOption::parse(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(opt.file_path.termination, Termination::End(EndDevice::Instance));
        assert_eq!(opt.additional_paths.len(), 1);
        assert!(
            matches!(&opt.additional_paths[0].nodes[0].media, MediaDevice::File(f) if f.to_string() == "b")
        );
        assert_eq!(opt.device_paths().count(), 2);
        assert_eq!(opt.to_string(), "x a b");
    }

    #[test]
    fn unsupported_node_keeps_rest_of_list() {
        let acpi = node(0x02, 0x01, &[0xD0, 0x41, 0x03, 0x0A, 0, 0, 0, 0]);
        let mut list = acpi.clone();
        list.extend(file_node("a"));
        list.extend(end_entire());
        let data = load_option(1, "vm", &list, &[1, 2]);

        let opt = LoadOption::parse(&data, &DecodeOptions::default()).unwrap();
        assert!(opt.file_path.nodes.is_empty());
        assert!(opt.file_path.is_partial());
        assert_eq!(opt.undecoded_paths, &list[acpi.len()..]);
        assert_eq!(opt.optional_data, [1, 2]);

        assert!(matches!(
            LoadOption::parse(&data, &DecodeOptions::strict()),
            Err(Error::UnsupportedNode { .. })
        ));
    }

    #[test]
    fn list_longer_than_path_is_length_mismatch() {
        let mut list = file_node("a");
        list.extend(end_entire());
        list.extend_from_slice(&[0xCC; 4]);
        let data = load_option(1, "x", &list, &[]);

        let err = LoadOption::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                offset: 10,
                declared: 16,
                consumed: 12,
            }
        ));
    }

    #[test]
    fn unknown_end_subtype_does_not_start_another_instance() {
        let mut list = file_node("a");
        list.extend(node(0x7F, 0x02, &[]));
        list.extend(file_node("b"));
        list.extend(end_entire());
        let data = load_option(1, "x", &list, &[]);

        let err = LoadOption::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                offset: 10,
                declared: 24,
                consumed: 12,
            }
        ));
    }

    #[test]
    fn list_shorter_than_declared_is_truncated() {
        let mut list = file_node("a");
        list.extend(end_entire());
        let mut data = load_option(1, "x", &list, &[]);
        data.truncate(data.len() - 2);

        let err = LoadOption::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 10,
                needed: 12,
                available: 10,
            }
        ));
    }

    #[test]
    fn path_running_past_list_is_truncated() {
        // the end node lies outside the declared FilePathList
        let list = file_node("a");
        let mut data = load_option(1, "x", &list, &[]);
        data.extend(end_entire());

        let err = LoadOption::parse(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 18, .. }));
    }

    #[test]
    fn truncated_header() {
        let err = LoadOption::parse(&[1, 0, 0], &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 0,
                needed: 6,
                available: 3,
            }
        ));
    }
}
