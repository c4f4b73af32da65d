// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # meshattr core
//!
//! A triangle mesh with an attribute registry that can hold several
//! attributes of the same semantic kind (for example two texture-coordinate
//! channels), plus a binary codec that round-trips the mesh.
//!
//! Looking an attribute up by semantic alone is ambiguous as soon as two
//! attributes share it: [`AttributeRegistry::get_first_by_semantic`] always
//! answers with the earliest-registered one. Attributes that must be told
//! apart carry [`AttributeMetadata`] and are resolved with
//! [`AttributeRegistry::get_by_metadata`].
//!
//! Attribute ids are in-memory handles. A [`Codec`] is free to renumber them,
//! so after a decode every attribute has to be resolved again.
//!
//! ```
//! use meshattr_core::{AttributeMetadata, AttributeSemantic, Codec, ComponentType, Mesh, ZlibCodec};
//!
//! let mut mesh = Mesh::new();
//! mesh.set_point_count(3).unwrap();
//! let pos = mesh.add_attribute(AttributeSemantic::Position, 3, ComponentType::Float32).unwrap();
//! let uv = mesh.add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32).unwrap();
//! let detail = mesh.add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32).unwrap();
//! for p in 0..3 {
//!     mesh.set_value(pos, p, &[p as f32, 0.0, 0.0]).unwrap();
//!     mesh.set_value(uv, p, &[0.0, 0.0]).unwrap();
//!     mesh.set_value(detail, p, &[1.0, 1.0]).unwrap();
//! }
//! let mut meta = AttributeMetadata::new();
//! meta.add_string("name", "detail");
//! mesh.attach_metadata(detail, meta).unwrap();
//!
//! let codec = ZlibCodec::default();
//! let bytes = codec.encode(&mesh).unwrap();
//! let decoded = codec.decode(&bytes).unwrap();
//!
//! let found = decoded.registry().get_by_metadata("name", &"detail".into()).unwrap();
//! assert_eq!(found.get_value(0).unwrap(), vec![1.0, 1.0]);
//! ```

pub mod attribute;
pub mod codec;
pub mod error;
pub mod keys;
pub mod mesh;
pub mod metadata;
pub mod registry;

pub use attribute::{AttributeStore, PointAttribute, MAX_COMPONENTS};
pub use codec::{
    peek_header, Codec, CodecOptions, DecodeError, EncodeError, GeometryKind, StreamHeader,
    ZlibCodec,
};
pub use error::{Error, Result};
pub use keys::{AttributeId, AttributeSemantic, ComponentType, Face, PointIndex};
pub use mesh::Mesh;
pub use metadata::{AttributeMetadata, MetadataValue};
pub use registry::AttributeRegistry;
