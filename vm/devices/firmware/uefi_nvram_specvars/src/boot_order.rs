// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `BootOrder` variable decoding (UEFI spec 3.3).

use crate::Error;

/// Iterate over the `Boot####` option numbers in a `BootOrder` variable.
pub fn parse_boot_order(data: &[u8]) -> Result<impl Iterator<Item = u16> + '_, Error> {
    let boot_order_iter = data.chunks_exact(2);
    if !boot_order_iter.remainder().is_empty() {
        return Err(Error::InvalidBootOrderLength(data.len()));
    }
    Ok(boot_order_iter.map(|x| u16::from_le_bytes([x[0], x[1]])))
}
