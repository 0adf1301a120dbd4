// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Construction, parsing and verification of time-based authenticated UEFI
//! variable payloads (UEFI spec 8.2.2).
//!
//! [`SigningContext::sign`] produces the complete value passed to
//! `SetVariable`: an `EFI_VARIABLE_AUTHENTICATION_2` descriptor carrying a
//! detached PKCS#7 `SignedData` over the canonical signing buffer, followed
//! by the new variable data.

#![expect(missing_docs)]

mod context;
mod descriptor;
pub mod pkcs7_fixup;
pub mod signing_buffer;
pub mod verify;

pub use context::SigningContext;
pub use descriptor::AuthVarPayload;
pub use descriptor::AuthenticationDescriptor;
pub use descriptor::ParseError;
pub use descriptor::SignedVariable;
pub use pkcs7_fixup::FixupError;
pub use signing_buffer::SignedFields;

use thiserror::Error;
use uefi_specs::uefi::time::EFI_TIME;

/// Errors which may occur while signing a variable. No descriptor is
/// produced when signing fails.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("timestamp {0} must be GMT with zero pad, nanosecond, timezone and daylight fields")]
    InvalidTimestamp(EFI_TIME),
    #[error("openssl error")]
    Openssl(#[source] openssl::error::ErrorStack),
    #[error("creating PKCS#7 signature")]
    Sign(#[source] openssl::error::ErrorStack),
    #[error("correcting PKCS#7 signature structure")]
    Fixup(#[from] FixupError),
    #[error("signature of {0} bytes does not fit in a WIN_CERTIFICATE")]
    SignatureTooLarge(usize),
}

/// Which form of the signature is placed in the descriptor.
///
/// UEFI spec 8.2.2 requires firmware to accept a `SignedData` both with and
/// without a `ContentInfo` wrapper.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ContentInfoMode {
    /// Emit the bare `SignedData`, as `sign-efi-sig-list` does.
    #[default]
    Strip,
    /// Emit the full `ContentInfo`.
    Keep,
}

/// Options for [`SigningContext::sign`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SignOptions {
    pub content_info: ContentInfoMode,
}
