// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::descriptor::AuthenticationDescriptor;
use crate::descriptor::SignedVariable;
use crate::pkcs7_fixup::fixup_signed_data;
use crate::signing_buffer::SignedFields;
use crate::SignError;
use crate::SignOptions;
use guid::Guid;
use openssl::pkcs7::Pkcs7;
use openssl::pkcs7::Pkcs7Flags;
use openssl::pkey::PKey;
use openssl::pkey::Private;
use openssl::stack::Stack;
use openssl::x509::X509;
use std::fmt;
use ucs2::Ucs2LeSlice;
use uefi_specs::uefi::nvram::EfiVariableAttributes;
use uefi_specs::uefi::time::EFI_TIME;

/// Everything needed to sign an update to a single authenticated variable.
pub struct SigningContext {
    certificate: X509,
    private_key: PKey<Private>,
    variable_name: Vec<u8>,
    vendor: Guid,
    attributes: EfiVariableAttributes,
    data: Vec<u8>,
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("variable_name", &self.variable_name)
            .field("vendor", &self.vendor)
            .field("attributes", &self.attributes)
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl SigningContext {
    /// `variable_name` is the UCS-2 LE name exactly as it is signed. It should
    /// not include a terminator; see [`Self::for_variable`].
    pub fn new(
        certificate: X509,
        private_key: PKey<Private>,
        variable_name: Vec<u8>,
        vendor: Guid,
        attributes: EfiVariableAttributes,
        data: Vec<u8>,
    ) -> Self {
        Self {
            certificate,
            private_key,
            variable_name,
            vendor,
            attributes,
            data,
        }
    }

    /// Create a context for a well-known `(vendor, name)` pair such as
    /// [`uefi_specs::uefi::nvram::vars::PK`]. The name's terminator is not
    /// signed.
    pub fn for_variable(
        certificate: X509,
        private_key: PKey<Private>,
        (vendor, name): (Guid, &Ucs2LeSlice),
        attributes: EfiVariableAttributes,
        data: Vec<u8>,
    ) -> Self {
        Self::new(
            certificate,
            private_key,
            name.as_bytes_without_nul().to_vec(),
            vendor,
            attributes,
            data,
        )
    }

    pub fn signed_fields(&self, timestamp: EFI_TIME) -> SignedFields<'_> {
        SignedFields {
            name: &self.variable_name,
            vendor: self.vendor,
            attributes: self.attributes,
            timestamp,
            data: &self.data,
        }
    }

    /// Sign the update with `timestamp`, producing the value to pass to
    /// `SetVariable`.
    ///
    /// The signature is a detached PKCS#7 `SignedData` with no authenticated
    /// attributes (UEFI spec 8.2.2), so it carries no signing time.
    pub fn sign(
        &self,
        timestamp: EFI_TIME,
        options: &SignOptions,
    ) -> Result<SignedVariable, SignError> {
        if !timestamp.is_valid_auth_timestamp() {
            return Err(SignError::InvalidTimestamp(timestamp));
        }

        let buf = self.signed_fields(timestamp).to_signing_buffer();

        let extra_certs: Stack<X509> = Stack::new().map_err(SignError::Openssl)?;
        let pkcs7 = Pkcs7::sign(
            &self.certificate,
            &self.private_key,
            &extra_certs,
            &buf,
            Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY | Pkcs7Flags::NOATTR | Pkcs7Flags::NOSMIMECAP,
        )
        .map_err(SignError::Sign)?;
        let der = pkcs7.to_der().map_err(SignError::Openssl)?;

        let cert_data = fixup_signed_data(&der, options.content_info)?;

        tracing::debug!(
            signed_len = buf.len(),
            pkcs7_len = der.len(),
            cert_data_len = cert_data.len(),
            content_info = ?options.content_info,
            "signed authenticated variable"
        );

        Ok(SignedVariable {
            descriptor: AuthenticationDescriptor::new(timestamp, cert_data)?,
            data: self.data.clone(),
        })
    }
}
