// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh codecs: turning a [`Mesh`] into bytes and back.
//!
//! A codec must carry every attribute's semantic, layout, values and metadata
//! through the byte stream. It does not have to keep attribute ids: decoding
//! produces a new mesh whose registry issues its own ids, so callers resolve
//! attributes again (by metadata, or by semantic) after every decode.
//!
//! Decoding never produces a partial mesh. Any truncation, corruption or
//! inconsistency is reported as a [`DecodeError`].

mod format;
mod zlib;

use bytes::Bytes;

use crate::mesh::Mesh;

pub use format::{peek_header, GeometryKind, StreamHeader, FORMAT_MAGIC, HEADER_LEN};
pub use zlib::ZlibCodec;

/// Encoder/decoder pair for meshes.
pub trait Codec {
    /// Serializes `mesh`. The returned buffer is immutable.
    fn encode(&self, mesh: &Mesh) -> Result<Bytes, EncodeError>;

    /// Rebuilds a mesh from a buffer produced by [`Codec::encode`].
    fn decode(&self, bytes: &[u8]) -> Result<Mesh, DecodeError>;

    /// Reads the header of an encoded buffer without decoding it.
    ///
    /// Streams are opaque outside their codec; codecs without a
    /// [`StreamHeader`] keep the default and return `None`.
    fn describe(&self, _bytes: &[u8]) -> Option<StreamHeader> {
        None
    }
}

/// Options controlling how a mesh is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// zlib compression level, 0 (stored) through 9 (smallest).
    pub compression_level: u32,
    /// Refuse to encode meshes without a position attribute.
    pub require_position: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            require_position: true,
        }
    }
}

/// Errors raised while encoding a mesh.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("mesh has no points")]
    EmptyMesh,

    #[error("mesh has no POSITION attribute")]
    MissingPosition,

    #[error("{what} count {count} does not fit the stream format")]
    TooLarge { what: &'static str, count: usize },

    #[error("attribute {index} holds {values} values, mesh has {points} points")]
    AttributeSize {
        index: usize,
        values: usize,
        points: usize,
    },

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Errors raised while decoding a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("stream truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("not a mesh stream (bad magic)")]
    BadMagic,

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("unsupported geometry kind {0}")]
    UnsupportedGeometry(u8),

    #[error("unknown header flags {0:#04x}")]
    UnknownFlags(u8),

    #[error("decompression failed: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("header declares {body_len} body bytes for a {payload_len} byte payload")]
    ImplausibleLength { body_len: usize, payload_len: usize },

    #[error("decoded body is {actual} bytes, header declares {expected}")]
    BodyLength { expected: usize, actual: usize },

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("unknown attribute semantic code {0}")]
    UnknownSemantic(u8),

    #[error("unknown component type code {0}")]
    UnknownComponentType(u8),

    #[error("unknown metadata value tag {0}")]
    UnknownMetadataTag(u8),

    #[error("metadata key or value is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("{geometry:?} stream declares {faces} faces")]
    GeometryMismatch { geometry: GeometryKind, faces: usize },

    #[error("attribute {index} stores {values} values for {points} points")]
    ValueCount {
        index: usize,
        values: usize,
        points: usize,
    },

    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] crate::error::Error),
}
