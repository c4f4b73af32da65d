// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Round-trip configuration loaded from environment variables.

use std::path::PathBuf;

use meshattr_core::CodecOptions;

/// Round-trip configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// File the encoded mesh is written to and read back from.
    pub output: PathBuf,
    /// zlib level, 0 (stored) through 9.
    pub compression_level: u32,
    /// Refuse to encode meshes without a position attribute.
    pub require_position: bool,
    /// Leave the encoded file on disk after the run.
    pub keep_output: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            output: var("MESHATTR_OUTPUT")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "compressed_mesh.bin".into())
                .into(),
            compression_level: var("MESHATTR_COMPRESSION_LEVEL")
                .and_then(|s| s.trim().parse().ok())
                .filter(|level| *level <= 9)
                .unwrap_or(6),
            require_position: var("MESHATTR_REQUIRE_POSITION")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(true),
            keep_output: var("MESHATTR_KEEP_OUTPUT")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(true),
        }
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            compression_level: self.compression_level,
            require_position: self.require_position,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
