// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `EFI_VARIABLE_AUTHENTICATION_2` descriptors (UEFI spec 8.2.2).

use crate::SignError;
use guid::Guid;
use thiserror::Error;
use uefi_specs::uefi::nvram::EFI_VARIABLE_AUTHENTICATION_2;
use uefi_specs::uefi::signing::EFI_CERT_TYPE_PKCS7_GUID;
use uefi_specs::uefi::signing::WIN_CERTIFICATE;
use uefi_specs::uefi::signing::WIN_CERTIFICATE_UEFI_GUID;
use uefi_specs::uefi::signing::WIN_CERT_REVISION;
use uefi_specs::uefi::signing::WIN_CERT_TYPE_EFI_GUID;
use uefi_specs::uefi::time::EFI_TIME;
use zerocopy::FromBytes;
use zerocopy::IntoBytes;

/// A timestamp and the detached PKCS#7 signature over the signing buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationDescriptor {
    timestamp: EFI_TIME,
    cert_data: Vec<u8>,
    header_length: u32,
}

impl AuthenticationDescriptor {
    /// Size of the `WIN_CERTIFICATE_UEFI_GUID` header preceding `cert_data`.
    pub const HEADER_SIZE: usize = size_of::<WIN_CERTIFICATE_UEFI_GUID>();

    /// `cert_data` is the DER encoded PKCS#7 `SignedData`, with or without a
    /// `ContentInfo`. It must fit in a `WIN_CERTIFICATE`.
    pub fn new(timestamp: EFI_TIME, cert_data: Vec<u8>) -> Result<Self, SignError> {
        let header_length = Self::dw_length(cert_data.len())
            .ok_or(SignError::SignatureTooLarge(cert_data.len()))?;
        Ok(Self {
            timestamp,
            cert_data,
            header_length,
        })
    }

    fn dw_length(cert_len: usize) -> Option<u32> {
        Self::HEADER_SIZE
            .checked_add(cert_len)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn timestamp(&self) -> EFI_TIME {
        self.timestamp
    }

    pub fn cert_data(&self) -> &[u8] {
        &self.cert_data
    }

    /// Value of `WIN_CERTIFICATE.dwLength`: the certificate header plus the
    /// signature bytes.
    pub fn header_length(&self) -> u32 {
        self.header_length
    }

    /// Serialize the descriptor as an `EFI_VARIABLE_AUTHENTICATION_2`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = EFI_VARIABLE_AUTHENTICATION_2 {
            timestamp: self.timestamp,
            auth_info: WIN_CERTIFICATE_UEFI_GUID {
                header: WIN_CERTIFICATE {
                    length: self.header_length(),
                    revision: WIN_CERT_REVISION,
                    certificate_type: WIN_CERT_TYPE_EFI_GUID,
                },
                cert_type: EFI_CERT_TYPE_PKCS7_GUID,
            },
        };
        let mut buf = header.as_bytes().to_vec();
        buf.extend_from_slice(&self.cert_data);
        buf
    }
}

/// A signed variable update, ready to be passed to `SetVariable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedVariable {
    pub descriptor: AuthenticationDescriptor,
    pub data: Vec<u8>,
}

impl SignedVariable {
    /// The descriptor followed by the variable data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.descriptor.to_bytes();
        buf.extend_from_slice(&self.data);
        buf
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("data too short (cannot extract EFI_VARIABLE_AUTHENTICATION_2 header)")]
    NotEnoughHdrData,
    #[error("WIN_CERTIFICATE length {length} is invalid for {available} bytes of data")]
    InvalidLength { length: u32, available: usize },
    #[error("invalid WIN_CERTIFICATE revision {0:#06x}")]
    InvalidRevision(u16),
    #[error("incorrect certificate type {0:#06x} (must be WIN_CERT_TYPE_EFI_GUID)")]
    IncorrectCertificateType(u16),
    #[error("incorrect cert type {0} (must be EFI_CERT_TYPE_PKCS7_GUID)")]
    IncorrectCertType(Guid),
}

/// The parts of a time-based authenticated `SetVariable` payload.
#[derive(Debug, Clone, Copy)]
pub struct AuthVarPayload<'a> {
    pub timestamp: EFI_TIME,
    pub pkcs7_data: &'a [u8],
    pub var_data: &'a [u8],
}

impl<'a> AuthVarPayload<'a> {
    /// Split a payload into its descriptor and the new variable data.
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        let (auth_hdr, _) = EFI_VARIABLE_AUTHENTICATION_2::read_from_prefix(data)
            .map_err(|_| ParseError::NotEnoughHdrData)?;
        let auth_info = auth_hdr.auth_info;

        if auth_info.header.revision != WIN_CERT_REVISION {
            return Err(ParseError::InvalidRevision(auth_info.header.revision));
        }
        if auth_info.header.certificate_type != WIN_CERT_TYPE_EFI_GUID {
            return Err(ParseError::IncorrectCertificateType(
                auth_info.header.certificate_type,
            ));
        }
        if auth_info.cert_type != EFI_CERT_TYPE_PKCS7_GUID {
            return Err(ParseError::IncorrectCertType(auth_info.cert_type));
        }

        // `length` covers the WIN_CERTIFICATE_UEFI_GUID header and the cert
        // data, which follow the timestamp
        let auth_info_and_rest = &data[size_of::<EFI_TIME>()..];
        let length = auth_info.header.length as usize;
        if length < AuthenticationDescriptor::HEADER_SIZE || length > auth_info_and_rest.len() {
            return Err(ParseError::InvalidLength {
                length: auth_info.header.length,
                available: auth_info_and_rest.len(),
            });
        }
        let (auth_info_and_cert, var_data) = auth_info_and_rest.split_at(length);

        Ok(AuthVarPayload {
            timestamp: auth_hdr.timestamp,
            pkcs7_data: &auth_info_and_cert[AuthenticationDescriptor::HEADER_SIZE..],
            var_data,
        })
    }
}
