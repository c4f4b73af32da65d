// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stream header and little-endian primitives shared by the encoder and
//! decoder.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "MATR"
//!      4     1  major version
//!      5     1  minor version
//!      6     1  geometry kind (0 = point cloud, 1 = triangular mesh)
//!      7     1  flags (bit 0: body is zlib-compressed)
//!      8     4  body length in bytes, uncompressed (u32 LE)
//!     12     4  payload length in bytes, as stored (u32 LE)
//!     16     …  payload
//! ```
//!
//! The body, after decompression:
//!
//! ```text
//! point_count u32 | face_count u32 | face_count × [u32; 3]
//! attribute_count u32 | attribute_count × attribute
//!
//! attribute: semantic u8 | component type u8 | component count u8
//!            value_count u32 | value_count × component count × f32
//!            has_metadata u8 | [entry_count u32 | entry_count × entry]
//! entry:     key (u32 length + UTF-8) | tag u8 | i64 | f64 | string
//! ```
//!
//! All integers are little-endian.

use serde::Serialize;

use super::DecodeError;

/// First four bytes of every stream.
pub const FORMAT_MAGIC: [u8; 4] = *b"MATR";

/// Size of the fixed stream header.
pub const HEADER_LEN: usize = 16;

pub(crate) const VERSION_MAJOR: u8 = 1;
pub(crate) const VERSION_MINOR: u8 = 0;

pub(crate) const FLAG_COMPRESSED: u8 = 0b0000_0001;
const KNOWN_FLAGS: u8 = FLAG_COMPRESSED;

/// Kind of geometry a stream holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryKind {
    PointCloud = 0,
    TriangularMesh = 1,
}

impl GeometryKind {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GeometryKind::PointCloud),
            1 => Some(GeometryKind::TriangularMesh),
            _ => None,
        }
    }
}

/// Parsed fixed-size stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamHeader {
    pub major: u8,
    pub minor: u8,
    pub geometry: GeometryKind,
    pub compressed: bool,
    pub body_len: usize,
    pub payload_len: usize,
}

impl StreamHeader {
    pub(crate) fn write(&self, out: &mut bytes::BytesMut) {
        use bytes::BufMut;

        out.put_slice(&FORMAT_MAGIC);
        out.put_u8(self.major);
        out.put_u8(self.minor);
        out.put_u8(self.geometry as u8);
        out.put_u8(if self.compressed { FLAG_COMPRESSED } else { 0 });
        out.put_u32_le(self.body_len as u32);
        out.put_u32_le(self.payload_len as u32);
    }
}

/// Reads the header of an encoded stream without decoding the body.
///
/// Useful to check what a file contains (and whether this build can read
/// it) before committing to a full decode.
pub fn peek_header(bytes: &[u8]) -> Result<StreamHeader, DecodeError> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(FORMAT_MAGIC.len())? != FORMAT_MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let major = reader.u8()?;
    let minor = reader.u8()?;
    if major != VERSION_MAJOR {
        return Err(DecodeError::UnsupportedVersion { major, minor });
    }
    let geometry_code = reader.u8()?;
    let geometry = GeometryKind::from_code(geometry_code)
        .ok_or(DecodeError::UnsupportedGeometry(geometry_code))?;
    let flags = reader.u8()?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(DecodeError::UnknownFlags(flags));
    }
    Ok(StreamHeader {
        major,
        minor,
        geometry,
        compressed: flags & FLAG_COMPRESSED != 0,
        body_len: reader.u32()? as usize,
        payload_len: reader.u32()? as usize,
    })
}

/// Bounds-checked little-endian cursor over a byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Takes `count` items of `size` bytes, guarding the multiplication.
    pub(crate) fn take_array(&mut self, count: usize, size: usize) -> Result<&'a [u8], DecodeError> {
        let len = count.checked_mul(size).ok_or(DecodeError::Truncated {
            offset: self.offset,
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        self.take(len)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array().map(u32::from_le_bytes)
    }

    pub(crate) fn i64(&mut self) -> Result<i64, DecodeError> {
        self.array().map(i64::from_le_bytes)
    }

    pub(crate) fn f64(&mut self) -> Result<f64, DecodeError> {
        self.array().map(f64::from_le_bytes)
    }

    pub(crate) fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        Ok(String::from_utf8(raw.to_vec())?)
    }

    /// Fails unless every byte has been consumed.
    pub(crate) fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}
