// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lossless codec: a flat little-endian body compressed with zlib.
//!
//! Attributes are written in registration order and registered again in the
//! same order on decode, so "first by semantic" answers the same attribute on
//! both sides. Ids are compacted: the decoded registry numbers attributes
//! from 0 regardless of the gaps left by removed attributes in the source.
//!
//! The zlib stream carries an Adler-32 checksum, and the header records both
//! the stored and the decompressed length, so truncated or altered input is
//! rejected instead of producing a partial mesh.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::format::{
    peek_header, ByteReader, GeometryKind, StreamHeader, HEADER_LEN, VERSION_MAJOR, VERSION_MINOR,
};
use super::{Codec, CodecOptions, DecodeError, EncodeError};
use crate::attribute::PointAttribute;
use crate::keys::{AttributeSemantic, ComponentType, Face};
use crate::mesh::Mesh;
use crate::metadata::{AttributeMetadata, MetadataValue};

/// Deflate cannot expand input by more than about 1032:1.
const MAX_DEFLATE_RATIO: usize = 1032;

/// The default mesh codec.
#[derive(Debug, Clone, Default)]
pub struct ZlibCodec {
    options: CodecOptions,
}

impl ZlibCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }
}

impl Codec for ZlibCodec {
    fn encode(&self, mesh: &Mesh) -> Result<Bytes, EncodeError> {
        if mesh.point_count() == 0 {
            return Err(EncodeError::EmptyMesh);
        }
        if self.options.require_position
            && mesh
                .get_first_by_semantic(AttributeSemantic::Position)
                .is_none()
        {
            return Err(EncodeError::MissingPosition);
        }

        let body = encode_body(mesh)?;
        let compressed = self.options.compression_level > 0;
        let payload = if compressed {
            let level = Compression::new(self.options.compression_level.min(9));
            let mut encoder = ZlibEncoder::new(Vec::with_capacity(body.len() / 2), level);
            encoder.write_all(&body)?;
            encoder.finish()?
        } else {
            body.to_vec()
        };

        let header = StreamHeader {
            major: VERSION_MAJOR,
            minor: VERSION_MINOR,
            geometry: if mesh.num_faces() > 0 {
                GeometryKind::TriangularMesh
            } else {
                GeometryKind::PointCloud
            },
            compressed,
            body_len: fits_u32("body byte", body.len())? as usize,
            payload_len: fits_u32("payload byte", payload.len())? as usize,
        };

        let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
        header.write(&mut out);
        out.put_slice(&payload);
        Ok(out.freeze())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Mesh, DecodeError> {
        let header = peek_header(bytes)?;
        let mut reader = ByteReader::new(&bytes[HEADER_LEN..]);
        let payload = reader.take(header.payload_len)?;
        reader.finish()?;

        let body = if header.compressed {
            if header.body_len > payload.len().saturating_mul(MAX_DEFLATE_RATIO) {
                return Err(DecodeError::ImplausibleLength {
                    body_len: header.body_len,
                    payload_len: payload.len(),
                });
            }
            inflate(payload, header.body_len)?
        } else {
            payload.to_vec()
        };
        if body.len() != header.body_len {
            return Err(DecodeError::BodyLength {
                expected: header.body_len,
                actual: body.len(),
            });
        }

        let mesh = decode_body(&body)?;
        let faces_present = mesh.num_faces() > 0;
        if faces_present != (header.geometry == GeometryKind::TriangularMesh) {
            return Err(DecodeError::GeometryMismatch {
                geometry: header.geometry,
                faces: mesh.num_faces(),
            });
        }
        Ok(mesh)
    }

    fn describe(&self, bytes: &[u8]) -> Option<StreamHeader> {
        peek_header(bytes).ok()
    }
}

fn fits_u32(what: &'static str, count: usize) -> Result<u32, EncodeError> {
    u32::try_from(count).map_err(|_| EncodeError::TooLarge { what, count })
}

fn encode_body(mesh: &Mesh) -> Result<BytesMut, EncodeError> {
    let registry = mesh.registry();
    let value_bytes: usize = registry.iter().map(|a| a.byte_len()).sum();
    let mut out = BytesMut::with_capacity(12 + mesh.num_faces() * 12 + value_bytes);

    out.put_u32_le(fits_u32("point", mesh.point_count())?);
    out.put_u32_le(fits_u32("face", mesh.num_faces())?);
    for face in mesh.faces() {
        for &point in face {
            out.put_u32_le(point);
        }
    }

    out.put_u32_le(fits_u32("attribute", registry.len())?);
    for (index, (attribute, metadata)) in registry.iter_with_metadata().enumerate() {
        if attribute.value_count() != mesh.point_count() {
            return Err(EncodeError::AttributeSize {
                index,
                values: attribute.value_count(),
                points: mesh.point_count(),
            });
        }
        encode_attribute(&mut out, attribute)?;
        match metadata {
            Some(metadata) => {
                out.put_u8(1);
                encode_metadata(&mut out, metadata)?;
            }
            None => out.put_u8(0),
        }
    }
    Ok(out)
}

fn encode_attribute(out: &mut BytesMut, attribute: &PointAttribute) -> Result<(), EncodeError> {
    out.put_u8(attribute.semantic().code());
    out.put_u8(attribute.component_type().code());
    // bounded by MAX_COMPONENTS
    out.put_u8(attribute.component_count() as u8);
    out.put_u32_le(fits_u32("value", attribute.value_count())?);
    for &component in attribute.values() {
        out.put_f32_le(component);
    }
    Ok(())
}

fn encode_metadata(out: &mut BytesMut, metadata: &AttributeMetadata) -> Result<(), EncodeError> {
    out.put_u32_le(fits_u32("metadata entry", metadata.len())?);
    for (key, value) in metadata.entries() {
        put_string(out, key)?;
        out.put_u8(value.tag());
        match value {
            MetadataValue::Int(v) => out.put_i64_le(*v),
            MetadataValue::Double(v) => out.put_f64_le(*v),
            MetadataValue::String(s) => put_string(out, s)?,
        }
    }
    Ok(())
}

fn put_string(out: &mut BytesMut, s: &str) -> Result<(), EncodeError> {
    out.put_u32_le(fits_u32("string byte", s.len())?);
    out.put_slice(s.as_bytes());
    Ok(())
}

fn inflate(payload: &[u8], body_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = ZlibDecoder::new(payload);
    // never trust the declared length for the allocation
    let mut body = Vec::with_capacity(body_len.min(payload.len().saturating_mul(8)));
    // one byte past the declared length is enough to detect an overlong body
    (&mut decoder)
        .take(body_len as u64 + 1)
        .read_to_end(&mut body)?;
    let consumed = decoder.total_in() as usize;
    if consumed < payload.len() {
        return Err(DecodeError::TrailingBytes(payload.len() - consumed));
    }
    Ok(body)
}

fn decode_body(body: &[u8]) -> Result<Mesh, DecodeError> {
    let mut reader = ByteReader::new(body);
    let mut mesh = Mesh::new();

    let point_count = reader.u32()? as usize;
    mesh.set_point_count(point_count)?;

    let face_count = reader.u32()? as usize;
    let raw_faces = reader.take_array(face_count, 12)?;
    let faces: Vec<Face> = raw_faces
        .chunks_exact(12)
        .map(|chunk| {
            let point = |i: usize| {
                u32::from_le_bytes([chunk[i], chunk[i + 1], chunk[i + 2], chunk[i + 3]])
            };
            [point(0), point(4), point(8)]
        })
        .collect();
    mesh.set_faces(faces)?;

    let attribute_count = reader.u32()? as usize;
    for index in 0..attribute_count {
        let semantic_code = reader.u8()?;
        let semantic = AttributeSemantic::from_code(semantic_code)
            .ok_or(DecodeError::UnknownSemantic(semantic_code))?;
        let type_code = reader.u8()?;
        let component_type = ComponentType::from_code(type_code)
            .ok_or(DecodeError::UnknownComponentType(type_code))?;
        let component_count = reader.u8()? as usize;
        let value_count = reader.u32()? as usize;
        if value_count != point_count {
            return Err(DecodeError::ValueCount {
                index,
                values: value_count,
                points: point_count,
            });
        }
        // read the raw values before allocating storage for them
        let raw_values = reader.take_array(
            value_count.saturating_mul(component_count),
            component_type.size(),
        )?;

        let id = mesh.add_attribute(semantic, component_count, component_type)?;
        let attribute = mesh
            .registry_mut()
            .get_by_id_mut(id)
            .ok_or(crate::error::Error::UnknownAttribute(id))?;
        let stride = component_count * component_type.size();
        let mut tuple = vec![0f32; component_count];
        for (point, raw) in raw_values.chunks_exact(stride).enumerate() {
            for (slot, bytes) in tuple.iter_mut().zip(raw.chunks_exact(4)) {
                *slot = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            attribute.set_value(point, &tuple)?;
        }

        if reader.u8()? != 0 {
            let metadata = decode_metadata(&mut reader)?;
            mesh.attach_metadata(id, metadata)?;
        }
    }

    reader.finish()?;
    Ok(mesh)
}

fn decode_metadata(reader: &mut ByteReader<'_>) -> Result<AttributeMetadata, DecodeError> {
    let entry_count = reader.u32()? as usize;
    let mut metadata = AttributeMetadata::new();
    for _ in 0..entry_count {
        let key = reader.string()?;
        let value = match reader.u8()? {
            0 => MetadataValue::Int(reader.i64()?),
            1 => MetadataValue::Double(reader.f64()?),
            2 => MetadataValue::String(reader.string()?),
            tag => return Err(DecodeError::UnknownMetadataTag(tag)),
        };
        metadata.add_entry(key, value);
    }
    Ok(metadata)
}
