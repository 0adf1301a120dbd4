// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cryptographic verification of authenticated variables.

use crate::descriptor::AuthVarPayload;
use crate::signing_buffer::SignedFields;
use guid::Guid;
use openssl::pkcs7::Pkcs7;
use openssl::pkcs7::Pkcs7Flags;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::verify::X509VerifyFlags;
use openssl::x509::X509PurposeId;
use openssl::x509::X509;
use thiserror::Error;
use ucs2::Ucs2LeSlice;
use uefi_nvram_specvars::signature_list;
use uefi_specs::uefi::nvram::EfiVariableAttributes;

/// Errors that occur due to various formatting issues in the crypto objects.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("parsing signature list")]
    SignatureList(#[from] signature_list::ParseError),
    #[error("decoding x509 cert from signature list")]
    SignatureListX509(#[source] openssl::error::ErrorStack),

    #[error("parsing auth var's pkcs7_data as pkcs#7 DER")]
    AuthVarPkcs7Der(#[source] openssl::error::ErrorStack),
    #[error("could not reconstruct signedData header for auth var's pkcs#7 data: {0}")]
    AuthVarPkcs7DerHeader(der::Error),

    #[error("building certificate store")]
    Store(#[source] openssl::error::ErrorStack),
}

impl VerifyError {
    /// Whether the error is due to malformed data in the signature lists
    pub fn key_var_error(&self) -> bool {
        match self {
            VerifyError::SignatureList(_) | VerifyError::SignatureListX509(_) => true,
            VerifyError::AuthVarPkcs7Der(_)
            | VerifyError::AuthVarPkcs7DerHeader(_)
            | VerifyError::Store(_) => false,
        }
    }
}

/// An authenticated variable update, along with the metadata that is covered
/// by its signature.
#[derive(Debug, Clone, Copy)]
pub struct ParsedAuthVar<'a> {
    pub name: &'a Ucs2LeSlice,
    pub vendor: Guid,
    pub attributes: EfiVariableAttributes,
    pub payload: AuthVarPayload<'a>,
}

/// Authenticate the variable against the certs in the provided signature_lists,
/// returning `true` if the auth was successful.
pub fn authenticate_variable(
    signature_lists: &[u8],
    var: ParsedAuthVar<'_>,
) -> Result<bool, VerifyError> {
    let ParsedAuthVar {
        name,
        vendor,
        attributes,
        payload:
            AuthVarPayload {
                timestamp,
                pkcs7_data,
                var_data,
            },
    } = var;

    // stage 1 - parse the pkcs7_data into an openssl Pkcs7 object
    let var_pkcs7 = match Pkcs7::from_der(pkcs7_data) {
        Ok(pkcs7) => pkcs7,
        Err(_) => {
            // UEFI spec 8.2.2 requires SignedData to be accepted both with
            // and without a ContentInfo header. If parsing fails, wrap the
            // data in a ContentInfo and try again.
            let buf = pkcs7_details::encapsulate_in_content_info(pkcs7_data)
                .map_err(VerifyError::AuthVarPkcs7DerHeader)?;
            Pkcs7::from_der(&buf).map_err(VerifyError::AuthVarPkcs7Der)?
        }
    };

    // stage 2 - parse all the x509 certs from the signature list(s)
    let mut certs = Vec::new();
    for list in signature_list::parse_signature_lists(signature_lists)? {
        for cert in list.x509_certs() {
            certs.push(X509::from_der(cert).map_err(VerifyError::SignatureListX509)?);
        }
    }

    // stage 3 - rebuild the signed buffer (see bullet point 2. in UEFI spec
    // 8.2.2)
    let verify_buf = SignedFields {
        name: name.as_bytes_without_nul(),
        vendor,
        attributes,
        timestamp,
        data: var_data,
    }
    .to_signing_buffer();

    // stage 4 - package the trusted certs into an openssl X509Store
    let store = {
        let mut store = X509StoreBuilder::new().map_err(VerifyError::Store)?;
        for cert in certs {
            store.add_cert(cert).map_err(VerifyError::Store)?;
        }

        // PARTIAL_CHAIN: the certs in the EFI_SIGNATURE_LIST are not
        // necessarily roots, so chain verification terminates at whichever
        // listed cert is reached.
        //
        // NO_CHECK_TIME: firmware does not enforce certificate validity
        // periods, and long-expired signing keys are common.
        store
            .set_flags(X509VerifyFlags::PARTIAL_CHAIN | X509VerifyFlags::NO_CHECK_TIME)
            .map_err(VerifyError::Store)?;

        // Without this, openssl rejects certs that lack the extended key
        // usages it expects of an S/MIME signer.
        store
            .set_purpose(X509PurposeId::ANY)
            .map_err(VerifyError::Store)?;

        store.build()
    };

    // stage 5 - actually perform the verification
    let no_certs: Stack<X509> = Stack::new().map_err(VerifyError::Store)?;
    match var_pkcs7.verify(
        &no_certs,
        &store,
        Some(&verify_buf),
        None,
        Pkcs7Flags::empty(),
    ) {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::trace!(
                error = &e as &dyn std::error::Error,
                "could not verify auth var"
            );
            Ok(false)
        }
    }
}

mod pkcs7_details {
    use crate::pkcs7_fixup::PKCS7_SIGNED_DATA_OID;
    use der::asn1::AnyRef;
    use der::asn1::ContextSpecific;
    use der::asn1::ObjectIdentifier;
    use der::Encode;
    use der::Sequence;
    use der::TagMode;
    use der::TagNumber;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Sequence)]
    struct ContentInfo<'a> {
        pub content_type: ObjectIdentifier,
        pub content: ContextSpecific<AnyRef<'a>>,
    }

    /// Construct a ASN.1 `ContentInfo` header with `ContentType = signedData`
    /// as specified by the PKCS#7 RFC2315.
    ///
    /// See https://datatracker.ietf.org/doc/html/rfc2315#section-7
    ///
    /// ```text
    /// ContentInfo ::= SEQUENCE {
    ///   contentType ContentType,
    ///   content
    ///     [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL }
    /// ```
    pub fn encapsulate_in_content_info(content: &[u8]) -> der::Result<Vec<u8>> {
        let content_info = ContentInfo {
            content_type: PKCS7_SIGNED_DATA_OID,
            content: ContextSpecific {
                tag_number: TagNumber::new(0),
                value: AnyRef::try_from(content)?,
                tag_mode: TagMode::Explicit,
            },
        };

        Encode::to_der(&content_info)
    }
}
