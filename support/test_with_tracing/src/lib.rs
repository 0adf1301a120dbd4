// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Crate for defining tests that have tracing output.
//!
//! Use `#[test_with_tracing::test]` in place of `#[test]`. Output is captured
//! by the test harness and filtered with `RUST_LOG` (default: everything at
//! `TRACE` for the firmware crates, `DEBUG` elsewhere).

#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

const FIRMWARE_TARGETS: &[&str] = &["uefi_auth_var", "uefi_nvram_specvars", "uefi_specs"];

fn default_targets() -> Targets {
    FIRMWARE_TARGETS
        .iter()
        .fold(Targets::new().with_default(LevelFilter::DEBUG), |t, name| {
            t.with_target(*name, LevelFilter::TRACE)
        })
}

#[doc(hidden)]
/// Initializes `tracing` for tests.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = std::env::var("RUST_LOG")
            .ok()
            .and_then(|var| var.parse::<Targets>().ok())
            .unwrap_or_else(default_targets);

        // Another harness may have installed a global subscriber already.
        let _ = tracing_subscriber::fmt()
            .compact()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .finish()
            .with(targets)
            .try_init();
    });
}
