// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Types and constants related to the UEFI spec.
//!
//! Every type in `uefi` is lifted directly from the official UEFI spec and
//! references the section it was pulled from. Multi-byte integers in wire
//! structs use explicit little-endian types where the struct is read out of
//! untrusted buffers.

#![no_std]

macro_rules! defn_nvram_var {
    ($varname:ident = ($guid:expr, $name:literal)) => {
        #[allow(non_snake_case)]
        pub fn $varname() -> (Guid, &'static ucs2::Ucs2LeSlice) {
            use ucs2::Ucs2LeSlice;
            use zerocopy::IntoBytes;

            (
                $guid,
                Ucs2LeSlice::from_slice_with_nul(wchar::wchz!(u16, $name).as_bytes())
                    .expect("wchz! literals are null terminated"),
            )
        }
    };
}

pub mod uefi;
