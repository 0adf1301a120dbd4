// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structural correction of PKCS#7 `SignedData` produced by a generic encoder.
//!
//! This is not an ASN.1 rewriter. It walks the fixed top-level positions of
//! the `ContentInfo` and `SignedData` structures from RFC 2315 and patches tag
//! bytes in place:
//!
//! ```text
//! SignedData ::= SEQUENCE {
//!   version Version,
//!   digestAlgorithms DigestAlgorithmIdentifiers,
//!   contentInfo ContentInfo,
//!   certificates [0] IMPLICIT ExtendedCertificatesAndCertificates OPTIONAL,
//!   crls [1] IMPLICIT CertificateRevocationLists OPTIONAL,
//!   signerInfos SignerInfos }
//! ```
//!
//! Some encoders emit `certificates` and `crls` with a universal `SET` tag
//! (`0x31`) rather than their context-specific tags (`0xA0`, `0xA1`).
//! Firmware parsers reject that form, so the tags are rewritten. Lengths are
//! never changed.

use crate::ContentInfoMode;
use der::asn1::ObjectIdentifier;
use der::Decode;
use der::Header;
use der::Reader;
use der::SliceReader;
use der::Tag;
use der::TagNumber;
use thiserror::Error;

/// RFC 2315 section 14 - signedData
pub const PKCS7_SIGNED_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// RFC 2315 section 14 - data
pub const PKCS7_DATA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// RFC 5754 section 2.2 - id-sha256
pub const SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

const SET_TAG: u8 = 0x31;
const CERTIFICATES_TAG: u8 = 0xA0;
const CRLS_TAG: u8 = 0xA1;

#[derive(Debug, Error)]
pub enum FixupError {
    #[error("malformed DER")]
    Der(#[from] der::Error),
    #[error("expected {expected} at offset {offset:#x}, found tag {found}")]
    UnexpectedTag {
        offset: usize,
        expected: &'static str,
        found: Tag,
    },
    #[error("content type {0} is not signedData")]
    NotSignedData(ObjectIdentifier),
    #[error("digest algorithm {0} is not SHA-256")]
    UnsupportedDigest(ObjectIdentifier),
    #[error("signedData lists no digest algorithms")]
    MissingDigest,
    #[error("signedData embeds its content")]
    ContentNotDetached,
    #[error("{0} trailing bytes after ContentInfo")]
    TrailingData(usize),
}

/// A single TLV, located by its absolute offset in the input.
struct Tlv<'a> {
    offset: usize,
    tag: Tag,
    header_len: usize,
    value: &'a [u8],
}

impl<'a> Tlv<'a> {
    fn end(&self) -> usize {
        self.offset + self.header_len + self.value.len()
    }

    fn expect_tag(self, tag: Tag, expected: &'static str) -> Result<Self, FixupError> {
        if self.tag != tag {
            return Err(FixupError::UnexpectedTag {
                offset: self.offset,
                expected,
                found: self.tag,
            });
        }
        Ok(self)
    }

    fn children(&self) -> Result<Walker<'a>, FixupError> {
        Ok(Walker {
            reader: SliceReader::new(self.value)?,
            base: self.offset + self.header_len,
        })
    }

    fn oid(&self) -> Result<ObjectIdentifier, FixupError> {
        Ok(ObjectIdentifier::from_bytes(self.value).map_err(der::Error::from)?)
    }
}

/// Iterates over sibling TLVs.
struct Walker<'a> {
    reader: SliceReader<'a>,
    base: usize,
}

impl<'a> Walker<'a> {
    fn position(&self) -> Result<usize, FixupError> {
        Ok(self.base + usize::try_from(self.reader.position())?)
    }

    fn is_finished(&self) -> bool {
        self.reader.is_finished()
    }

    fn next(&mut self, expected: &'static str) -> Result<Tlv<'a>, FixupError> {
        if self.is_finished() {
            return Err(der::Error::incomplete(self.reader.position()).into());
        }
        let offset = self.position()?;
        let header = Header::decode(&mut self.reader)?;
        let header_len = self.position()? - offset;
        let value = self.reader.read_slice(header.length)?;
        tracing::trace!(offset, tag = %header.tag, len = value.len(), expected, "pkcs7 tlv");
        Ok(Tlv {
            offset,
            tag: header.tag,
            header_len,
            value,
        })
    }
}

fn context_tag(number: u8) -> Tag {
    Tag::ContextSpecific {
        constructed: true,
        number: TagNumber::new(number),
    }
}

/// Validate the DER encoded PKCS#7 `ContentInfo` in `pkcs7` and correct the
/// tags of its `certificates` and `crls` fields.
///
/// The `SignedData` must be detached and use SHA-256 for every digest
/// algorithm. Depending on `mode`, either the bare `SignedData` or the full
/// `ContentInfo` is returned.
pub fn fixup_signed_data(pkcs7: &[u8], mode: ContentInfoMode) -> Result<Vec<u8>, FixupError> {
    let mut top = Walker {
        reader: SliceReader::new(pkcs7)?,
        base: 0,
    };
    let content_info = top.next("ContentInfo")?.expect_tag(Tag::Sequence, "ContentInfo")?;
    if content_info.end() != pkcs7.len() {
        return Err(FixupError::TrailingData(pkcs7.len() - content_info.end()));
    }

    let mut fields = content_info.children()?;
    let content_type = fields
        .next("contentType")?
        .expect_tag(Tag::ObjectIdentifier, "contentType")?
        .oid()?;
    if content_type != PKCS7_SIGNED_DATA_OID {
        return Err(FixupError::NotSignedData(content_type));
    }
    let content = fields
        .next("content")?
        .expect_tag(context_tag(0), "[0] EXPLICIT content")?;
    let signed_data = content
        .children()?
        .next("SignedData")?
        .expect_tag(Tag::Sequence, "SignedData")?;

    let mut fields = signed_data.children()?;
    fields.next("version")?.expect_tag(Tag::Integer, "version")?;
    check_digest_algorithms(
        fields
            .next("digestAlgorithms")?
            .expect_tag(Tag::Set, "digestAlgorithms")?,
    )?;
    check_detached(
        fields
            .next("contentInfo")?
            .expect_tag(Tag::Sequence, "contentInfo")?,
    )?;

    // certificates and crls are optional, signerInfos is always last
    let mut trailing = Vec::new();
    while !fields.is_finished() {
        trailing.push(fields.next("signerInfos")?);
    }
    let Some((signer_infos, optional)) = trailing.split_last() else {
        return Err(der::Error::incomplete(der::Length::ZERO).into());
    };
    if signer_infos.tag != Tag::Set || optional.len() > 2 {
        return Err(FixupError::UnexpectedTag {
            offset: signer_infos.offset,
            expected: "signerInfos",
            found: signer_infos.tag,
        });
    }

    let mut patches = Vec::new();
    for (i, field) in optional.iter().enumerate() {
        // a lone SET is taken to be the certificates
        let (name, tag) = if i == 0 {
            ("certificates", CERTIFICATES_TAG)
        } else {
            ("crls", CRLS_TAG)
        };
        match pkcs7[field.offset] {
            SET_TAG => {
                tracing::debug!(offset = field.offset, field = name, "rewriting SET tag");
                patches.push((field.offset, tag));
            }
            CERTIFICATES_TAG if i == 0 => {}
            CRLS_TAG => {}
            _ => {
                return Err(FixupError::UnexpectedTag {
                    offset: field.offset,
                    expected: name,
                    found: field.tag,
                })
            }
        }
    }

    let (start, end) = match mode {
        ContentInfoMode::Strip => (signed_data.offset, signed_data.end()),
        ContentInfoMode::Keep => (0, pkcs7.len()),
    };
    let mut out = pkcs7[start..end].to_vec();
    for (offset, tag) in patches {
        out[offset - start] = tag;
    }
    Ok(out)
}

fn check_digest_algorithms(algorithms: Tlv<'_>) -> Result<(), FixupError> {
    let mut algorithms = algorithms.children()?;
    if algorithms.is_finished() {
        return Err(FixupError::MissingDigest);
    }
    while !algorithms.is_finished() {
        let algorithm = algorithms
            .next("AlgorithmIdentifier")?
            .expect_tag(Tag::Sequence, "AlgorithmIdentifier")?;
        let oid = algorithm
            .children()?
            .next("algorithm")?
            .expect_tag(Tag::ObjectIdentifier, "algorithm")?
            .oid()?;
        if oid != SHA256_OID {
            return Err(FixupError::UnsupportedDigest(oid));
        }
    }
    Ok(())
}

fn check_detached(content_info: Tlv<'_>) -> Result<(), FixupError> {
    let mut fields = content_info.children()?;
    fields
        .next("contentType")?
        .expect_tag(Tag::ObjectIdentifier, "contentType")?;
    if !fields.is_finished() {
        return Err(FixupError::ContentNotDetached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_with_tracing::test;

    const SIGNED_DATA_OID_DER: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02];
    const DATA_OID_DER: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x01];
    const SHA256_OID_DER: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];
    const SHA1_OID_DER: &[u8] = &[0x2B, 0x0E, 0x03, 0x02, 0x1A];

    fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
        assert!(value.len() < 0x80);
        let mut v = vec![tag, value.len() as u8];
        v.extend_from_slice(value);
        v
    }

    fn cat(parts: &[Vec<u8>]) -> Vec<u8> {
        parts.concat()
    }

    struct Parts {
        digest_oid: &'static [u8],
        inner_content: Option<Vec<u8>>,
        certificates_tag: Option<u8>,
        crls_tag: Option<u8>,
    }

    impl Default for Parts {
        fn default() -> Self {
            Parts {
                digest_oid: SHA256_OID_DER,
                inner_content: None,
                certificates_tag: Some(0xA0),
                crls_tag: None,
            }
        }
    }

    fn signed_data(parts: &Parts) -> Vec<u8> {
        let digest = tlv(
            0x31,
            &tlv(0x30, &cat(&[tlv(0x06, parts.digest_oid), tlv(0x05, &[])])),
        );
        let mut inner = vec![tlv(0x06, DATA_OID_DER)];
        if let Some(content) = &parts.inner_content {
            inner.push(tlv(0xA0, &tlv(0x04, content)));
        }
        let mut fields = vec![tlv(0x02, &[1]), digest, tlv(0x30, &cat(&inner))];
        if let Some(tag) = parts.certificates_tag {
            fields.push(tlv(tag, &tlv(0x04, &[0xCE, 0x27])));
        }
        if let Some(tag) = parts.crls_tag {
            fields.push(tlv(tag, &[]));
        }
        fields.push(tlv(0x31, &[]));
        tlv(0x30, &cat(&fields))
    }

    fn content_info(signed_data: &[u8]) -> Vec<u8> {
        tlv(
            0x30,
            &cat(&[tlv(0x06, SIGNED_DATA_OID_DER), tlv(0xA0, signed_data)]),
        )
    }

    #[test]
    fn rewrites_set_certificates_tag() {
        let divergent = signed_data(&Parts {
            certificates_tag: Some(0x31),
            ..Default::default()
        });
        let expected = signed_data(&Parts::default());
        assert_ne!(divergent, expected);

        let out = fixup_signed_data(&content_info(&divergent), ContentInfoMode::Strip).unwrap();
        assert_eq!(out, expected);

        let out = fixup_signed_data(&content_info(&divergent), ContentInfoMode::Keep).unwrap();
        assert_eq!(out, content_info(&expected));
    }

    #[test]
    fn rewrites_set_crls_tag() {
        let divergent = signed_data(&Parts {
            certificates_tag: Some(0x31),
            crls_tag: Some(0x31),
            ..Default::default()
        });
        let expected = signed_data(&Parts {
            crls_tag: Some(0xA1),
            ..Default::default()
        });

        let out = fixup_signed_data(&content_info(&divergent), ContentInfoMode::Strip).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn well_formed_input_is_unchanged() {
        let data = signed_data(&Parts::default());
        let out = fixup_signed_data(&content_info(&data), ContentInfoMode::Strip).unwrap();
        assert_eq!(out, data);

        let data = signed_data(&Parts {
            certificates_tag: None,
            ..Default::default()
        });
        let out = fixup_signed_data(&content_info(&data), ContentInfoMode::Keep).unwrap();
        assert_eq!(out, content_info(&data));
    }

    #[test]
    fn rejects_non_sha256_digest() {
        let data = signed_data(&Parts {
            digest_oid: SHA1_OID_DER,
            ..Default::default()
        });
        let err = fixup_signed_data(&content_info(&data), ContentInfoMode::Strip).unwrap_err();
        assert!(
            matches!(err, FixupError::UnsupportedDigest(oid) if oid.to_string() == "1.3.14.3.2.26")
        );
    }

    #[test]
    fn rejects_embedded_content() {
        let data = signed_data(&Parts {
            inner_content: Some(b"hello".to_vec()),
            ..Default::default()
        });
        let err = fixup_signed_data(&content_info(&data), ContentInfoMode::Strip).unwrap_err();
        assert!(matches!(err, FixupError::ContentNotDetached));
    }

    #[test]
    fn rejects_other_content_types() {
        let data = signed_data(&Parts::default());
        let wrapped = tlv(0x30, &cat(&[tlv(0x06, DATA_OID_DER), tlv(0xA0, &data)]));
        let err = fixup_signed_data(&wrapped, ContentInfoMode::Strip).unwrap_err();
        assert!(matches!(err, FixupError::NotSignedData(oid) if oid == PKCS7_DATA_OID));
    }

    #[test]
    fn rejects_trailing_data() {
        let mut der = content_info(&signed_data(&Parts::default()));
        der.push(0);
        let err = fixup_signed_data(&der, ContentInfoMode::Strip).unwrap_err();
        assert!(matches!(err, FixupError::TrailingData(1)));
    }
}
