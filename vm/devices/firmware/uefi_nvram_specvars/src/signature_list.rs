// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Code to parse and emit [`EFI_SIGNATURE_LIST`] structures, as stored in the
//! `PK`, `KEK`, `db` and `dbx` variables.

use guid::Guid;
use std::borrow::Cow;
use thiserror::Error;
use uefi_specs::uefi::nvram::signature_list::EFI_CERT_SHA256_GUID;
use uefi_specs::uefi::nvram::signature_list::EFI_CERT_X509_GUID;
use uefi_specs::uefi::nvram::signature_list::EFI_SIGNATURE_DATA;
use uefi_specs::uefi::nvram::signature_list::EFI_SIGNATURE_LIST;
use zerocopy::FromBytes;
use zerocopy::IntoBytes;

const SHA256_LEN: usize = 32;

/// A sha256 digest and the agent that enrolled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sha256Entry<'a> {
    pub owner: Guid,
    pub digest: Cow<'a, [u8; SHA256_LEN]>,
}

/// A DER encoded x509 certificate and the agent that enrolled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Entry<'a> {
    pub owner: Guid,
    pub cert: Cow<'a, [u8]>,
}

/// Rust-y representation of a [`EFI_SIGNATURE_LIST`] struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureList<'a> {
    Sha256(Vec<Sha256Entry<'a>>),
    // Every entry in a signature list has the same size, so in practice each
    // x509 signature list carries a single cert.
    X509(X509Entry<'a>),
}

impl SignatureList<'_> {
    /// Serialize the signature list as a `EFI_SIGNATURE_LIST` into a vec
    pub fn extend_as_spec_signature_list(
        &self,
        res: &mut Vec<u8>,
    ) -> Result<(), SerializeError> {
        let (signature_type, sig_data_size, count) = match self {
            SignatureList::Sha256(sigs) => (EFI_CERT_SHA256_GUID, SHA256_LEN, sigs.len()),
            SignatureList::X509(sig) => (EFI_CERT_X509_GUID, sig.cert.len(), 1),
        };

        let (signature_list_size, signature_size) = header_sizes(sig_data_size, count)?;
        let header = EFI_SIGNATURE_LIST {
            signature_type,
            signature_list_size,
            signature_header_size: 0,
            signature_size,
        };

        res.extend(header.as_bytes());
        match self {
            SignatureList::Sha256(sigs) => {
                for sig in sigs {
                    res.extend(sig.owner.as_bytes());
                    res.extend(sig.digest.as_slice());
                }
            }
            SignatureList::X509(sig) => {
                res.extend(sig.owner.as_bytes());
                res.extend(sig.cert.iter());
            }
        }
        Ok(())
    }

    /// Serialize a series of signature lists, as written to a key variable.
    pub fn to_spec_signature_lists(
        lists: &[SignatureList<'_>],
    ) -> Result<Vec<u8>, SerializeError> {
        let mut buf = Vec::new();
        for list in lists {
            list.extend_as_spec_signature_list(&mut buf)?;
        }
        Ok(buf)
    }

    /// Iterate over the x509 certificates in the list, if any.
    pub fn x509_certs(&self) -> impl Iterator<Item = &[u8]> {
        match self {
            SignatureList::X509(sig) => Some(sig.cert.as_ref()),
            SignatureList::Sha256(_) => None,
        }
        .into_iter()
    }
}

/// Compute the `signature_list_size` and `signature_size` header fields for
/// `count` entries of `sig_data_size` bytes each.
fn header_sizes(sig_data_size: usize, count: usize) -> Result<(u32, u32), SerializeError> {
    let signature_size = size_of::<EFI_SIGNATURE_DATA>()
        .checked_add(sig_data_size)
        .ok_or(SerializeError::TooLarge(usize::MAX))?;
    let list_size = signature_size
        .checked_mul(count)
        .and_then(|n| n.checked_add(size_of::<EFI_SIGNATURE_LIST>()))
        .ok_or(SerializeError::TooLarge(usize::MAX))?;
    Ok((
        u32::try_from(list_size).map_err(|_| SerializeError::TooLarge(list_size))?,
        u32::try_from(signature_size).map_err(|_| SerializeError::TooLarge(signature_size))?,
    ))
}

/// Errors which may occur while serializing an `EFI_SIGNATURE_LIST`.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("signature list of {0} bytes does not fit in a u32 size field")]
    TooLarge(usize),
}

/// Errors which may occur during `EFI_SIGNATURE_LIST` parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read signature list header at offset {0:#x}")]
    InvalidHeader(usize),
    #[error("unsupported signature type: {0}")]
    UnsupportedSignatureType(Guid),
    #[error("signature list at offset {offset:#x} declares {declared} bytes, {available} available")]
    TruncatedData {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("invalid signature_size {signature_size} for signature type {signature_type}")]
    InvalidSigSize {
        signature_type: Guid,
        signature_size: u32,
    },
    #[error("signature data of {len} bytes is not a multiple of signature_size {signature_size}")]
    MisalignedData { len: usize, signature_size: usize },
}

/// Parse a buffer containing zero or more `EFI_SIGNATURE_LIST`s.
pub fn parse_signature_lists(buf: &[u8]) -> Result<Vec<SignatureList<'_>>, ParseError> {
    let mut lists = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let rest = &buf[offset..];
        let (header, _) = EFI_SIGNATURE_LIST::read_from_prefix(rest)
            .map_err(|_| ParseError::InvalidHeader(offset))?;

        let declared = header.signature_list_size as usize;
        let body_start = size_of::<EFI_SIGNATURE_LIST>() + header.signature_header_size as usize;
        if declared > rest.len() || declared < body_start {
            return Err(ParseError::TruncatedData {
                offset,
                declared,
                available: rest.len(),
            });
        }

        parse_signature_list(&header, &rest[body_start..declared], &mut lists)?;
        offset += declared;
    }
    Ok(lists)
}

fn parse_signature_list<'a>(
    header: &EFI_SIGNATURE_LIST,
    body: &'a [u8],
    lists: &mut Vec<SignatureList<'a>>,
) -> Result<(), ParseError> {
    let signature_size = header.signature_size as usize;
    let data_size = signature_size.checked_sub(size_of::<EFI_SIGNATURE_DATA>());
    let invalid_size = || ParseError::InvalidSigSize {
        signature_type: header.signature_type,
        signature_size: header.signature_size,
    };

    match header.signature_type {
        EFI_CERT_SHA256_GUID if data_size != Some(SHA256_LEN) => return Err(invalid_size()),
        EFI_CERT_SHA256_GUID | EFI_CERT_X509_GUID => {}
        guid => return Err(ParseError::UnsupportedSignatureType(guid)),
    }
    if data_size.is_none_or(|size| size == 0) {
        return Err(invalid_size());
    }
    if body.len() % signature_size != 0 {
        return Err(ParseError::MisalignedData {
            len: body.len(),
            signature_size,
        });
    }

    let mut sha256 = Vec::new();
    for entry in body.chunks_exact(signature_size) {
        let (sig, data) = EFI_SIGNATURE_DATA::read_from_prefix(entry).map_err(|_| invalid_size())?;
        match header.signature_type {
            EFI_CERT_SHA256_GUID => {
                let digest: &[u8; SHA256_LEN] = data.try_into().map_err(|_| invalid_size())?;
                sha256.push(Sha256Entry {
                    owner: sig.signature_owner,
                    digest: Cow::Borrowed(digest),
                });
            }
            _ => lists.push(SignatureList::X509(X509Entry {
                owner: sig.signature_owner,
                cert: Cow::Borrowed(data),
            })),
        }
    }

    if !sha256.is_empty() {
        lists.push(SignatureList::Sha256(sha256));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_with_tracing::test;

    const OWNER_1: Guid = Guid::from_static_str("77fa9abd-0359-4d32-bd60-28f4e78f784b");
    const OWNER_2: Guid = Guid::from_static_str("9d132b6c-59d5-4388-ab1c-185cfcb2eb92");

    fn test_data() -> Vec<SignatureList<'static>> {
        vec![
            SignatureList::Sha256(vec![
                Sha256Entry {
                    owner: OWNER_1,
                    digest: Cow::Owned([0; 32]),
                },
                Sha256Entry {
                    owner: OWNER_2,
                    digest: Cow::Owned([1; 32]),
                },
            ]),
            SignatureList::X509(X509Entry {
                owner: OWNER_2,
                cert: b"some cert data"[..].into(),
            }),
            SignatureList::X509(X509Entry {
                owner: OWNER_1,
                cert: b"more cert data!"[..].into(),
            }),
        ]
    }

    #[test]
    fn emit_and_parse() {
        let lists = test_data();
        let buf = SignatureList::to_spec_signature_lists(&lists).unwrap();
        assert_eq!(buf.len(), (28 + 2 * 48) + (28 + 16 + 14) + (28 + 16 + 15));

        let parsed = parse_signature_lists(&buf).unwrap();
        assert_eq!(lists, parsed);
        assert_eq!(parsed.iter().flat_map(|l| l.x509_certs()).count(), 2);
    }

    #[test]
    fn oversized_list_is_rejected() {
        assert_eq!(header_sizes(32, 2).unwrap(), (28 + 2 * 48, 48));
        assert!(matches!(
            header_sizes(32, 0x0800_0000),
            Err(SerializeError::TooLarge(n)) if n == 28 + 48 * 0x0800_0000
        ));
        assert!(matches!(
            header_sizes(u32::MAX as usize, 1),
            Err(SerializeError::TooLarge(_))
        ));
    }

    #[test]
    fn truncated_list() {
        let buf = SignatureList::to_spec_signature_lists(&test_data()).unwrap();
        let err = parse_signature_lists(&buf[..buf.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TruncatedData {
                offset: 182,
                declared: 59,
                available: 58,
            }
        ));

        assert!(matches!(
            parse_signature_lists(&buf[..10]),
            Err(ParseError::InvalidHeader(0))
        ));
    }

    #[test]
    fn bad_sha256_size() {
        let header = EFI_SIGNATURE_LIST {
            signature_type: EFI_CERT_SHA256_GUID,
            signature_list_size: 28 + 40,
            signature_header_size: 0,
            signature_size: 40,
        };
        let mut buf = header.as_bytes().to_vec();
        buf.extend_from_slice(&[0; 40]);
        assert!(matches!(
            parse_signature_lists(&buf),
            Err(ParseError::InvalidSigSize {
                signature_size: 40,
                ..
            })
        ));
    }

    #[test]
    fn unknown_signature_type() {
        let guid = Guid::from_static_str("3c5766e8-269c-4e34-aa14-ed776e85b3b6");
        let header = EFI_SIGNATURE_LIST {
            signature_type: guid,
            signature_list_size: 28,
            signature_header_size: 0,
            signature_size: 16,
        };
        assert!(matches!(
            parse_signature_lists(header.as_bytes()),
            Err(ParseError::UnsupportedSignatureType(g)) if g == guid
        ));
    }
}
