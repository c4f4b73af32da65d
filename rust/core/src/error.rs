// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for mesh construction and attribute access.
//!
//! Lookups that simply find nothing (by semantic, by metadata) return
//! `Option::None` and are not errors. [`Error::UnknownAttribute`] is reserved
//! for ids that were never issued by the registry or have been removed.

use crate::keys::{AttributeId, AttributeSemantic};

/// Result type alias for mesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or accessing a mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An attribute layout that cannot hold any values.
    #[error("invalid attribute shape: {component_count} components per value (expected 1..={max})")]
    InvalidShape { component_count: usize, max: usize },

    /// A value tuple whose length differs from the attribute's component count.
    #[error("value has {actual} components, attribute expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A point index outside `0..point_count`.
    #[error("point index {index} out of range (point count {point_count})")]
    OutOfRange { index: usize, point_count: usize },

    /// The point count cannot change once attributes are sized against it.
    #[error("point count is fixed at {0}: attributes already exist")]
    AlreadySized(usize),

    /// The id does not reference a live attribute in this registry.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(AttributeId),

    /// Every attribute id has been issued; ids are never reused.
    #[error("attribute ids exhausted")]
    IdsExhausted,

    /// A face references a point that does not exist.
    #[error("face {face} references point {point}, but the mesh has {point_count} points")]
    FaceOutOfRange {
        face: usize,
        point: u32,
        point_count: usize,
    },

    /// Two attributes would answer the same metadata lookup.
    #[error("metadata entry {key:?} is already used to identify {semantic} attribute {existing}")]
    AmbiguousMetadata {
        key: String,
        existing: AttributeId,
        semantic: AttributeSemantic,
    },
}
