// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! meshattr round trip.
//!
//! Builds the demo mesh (one triangle, a position channel and two texture
//! coordinate channels, the second tagged `name = "secondaryUvs"`), encodes
//! it, writes it to disk, reads it back, decodes it and checks that every
//! attribute can be found again. The report is printed to stdout as JSON;
//! logs go to stderr.
//!
//! Exits non-zero if any step fails.

use anyhow::Context;
use meshattr_core::ZlibCodec;
use meshattr_processing::{scenario, RoundTripDriver};

mod config;

use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,meshattr_processing=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();

    tracing::info!(
        output = %config.output.display(),
        compression_level = config.compression_level,
        require_position = config.require_position,
        keep_output = config.keep_output,
        "Starting mesh round trip"
    );

    let demo = scenario::demo_mesh().context("failed to build the demo mesh")?;
    let (key, value) = scenario::secondary_uv_lookup();
    let mut driver = RoundTripDriver::new(
        ZlibCodec::new(config.codec_options()),
        demo.mesh,
        config.output.clone(),
    )
    .with_lookup(key, value);

    let outcome = driver
        .run()
        .context("mesh round trip failed")
        .and_then(|report| report.to_json().context("failed to serialize the report"));

    if !config.keep_output && driver.path().exists() {
        if let Err(err) = std::fs::remove_file(driver.path()) {
            tracing::warn!(path = %driver.path().display(), error = %err, "Could not remove output file");
        }
    }

    let json = outcome?;
    println!("{json}");
    Ok(())
}
