// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier and discriminant types shared by the registry and the codec.
//!
//! An [`AttributeId`] is an arena handle: unique within one mesh, issued in
//! increasing order and never reused, but meaningless outside the mesh that
//! issued it. Decoding a mesh issues fresh ids.

use serde::{Deserialize, Serialize};

/// Index of a point (vertex) within a mesh.
pub type PointIndex = u32;

/// A triangle, as three point indices.
pub type Face = [PointIndex; 3];

/// Handle of an attribute within one mesh's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(pub(crate) u32);

impl AttributeId {
    /// Returns the raw numeric value of the id.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AttributeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an attribute's values mean. Several attributes may share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeSemantic {
    Position = 0,
    Normal = 1,
    Color = 2,
    TexCoord = 3,
    Generic = 4,
}

impl AttributeSemantic {
    /// All semantics, in wire-code order.
    pub const ALL: [AttributeSemantic; 5] = [
        AttributeSemantic::Position,
        AttributeSemantic::Normal,
        AttributeSemantic::Color,
        AttributeSemantic::TexCoord,
        AttributeSemantic::Generic,
    ];

    /// Returns the semantic name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeSemantic::Position => "POSITION",
            AttributeSemantic::Normal => "NORMAL",
            AttributeSemantic::Color => "COLOR",
            AttributeSemantic::TexCoord => "TEX_COORD",
            AttributeSemantic::Generic => "GENERIC",
        }
    }

    /// Wire code used by the binary codec.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`AttributeSemantic::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

impl std::fmt::Display for AttributeSemantic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric type of each component of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComponentType {
    #[default]
    Float32,
}

impl ComponentType {
    /// Size of one component in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            ComponentType::Float32 => std::mem::size_of::<f32>(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Float32 => "FLOAT32",
        }
    }

    /// Wire code used by the binary codec.
    pub fn code(self) -> u8 {
        match self {
            ComponentType::Float32 => 9,
        }
    }

    /// Inverse of [`ComponentType::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            9 => Some(ComponentType::Float32),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
