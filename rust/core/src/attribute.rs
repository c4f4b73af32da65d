// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-point value storage for a single attribute channel.

use std::ops::Deref;

use crate::error::{Error, Result};
use crate::keys::{AttributeId, AttributeSemantic, ComponentType};

/// Largest number of components a single value may have (a 4x4 matrix).
pub const MAX_COMPONENTS: usize = 16;

/// Fixed-shape storage holding one value tuple per point.
///
/// Values are laid out contiguously, `component_count` floats per point.
/// Points map to values through the identity map, so the value index of
/// point `i` is `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeStore {
    component_count: usize,
    component_type: ComponentType,
    point_count: usize,
    values: Vec<f32>,
}

impl AttributeStore {
    /// Allocates zeroed storage for `point_count` values.
    pub fn new(
        component_count: usize,
        component_type: ComponentType,
        point_count: usize,
    ) -> Result<Self> {
        if component_count == 0 || component_count > MAX_COMPONENTS {
            return Err(Error::InvalidShape {
                component_count,
                max: MAX_COMPONENTS,
            });
        }
        Ok(Self {
            component_count,
            component_type,
            point_count,
            values: vec![0.0; point_count * component_count],
        })
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.component_count
    }

    #[inline]
    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Number of stored value tuples.
    #[inline]
    pub fn value_count(&self) -> usize {
        self.values.len() / self.component_count
    }

    /// Returns the value index that `point` reads from.
    pub fn mapped_index(&self, point: usize) -> Result<usize> {
        self.check_point(point)?;
        Ok(point)
    }

    /// Writes the value tuple of `point`.
    pub fn set_value(&mut self, point: usize, value: &[f32]) -> Result<()> {
        let index = self.mapped_index(point)?;
        if value.len() != self.component_count {
            return Err(Error::ShapeMismatch {
                expected: self.component_count,
                actual: value.len(),
            });
        }
        let start = index * self.component_count;
        self.values[start..start + self.component_count].copy_from_slice(value);
        Ok(())
    }

    /// Returns a copy of the value tuple of `point`.
    pub fn get_value(&self, point: usize) -> Result<Vec<f32>> {
        self.value(point).map(<[f32]>::to_vec)
    }

    /// Borrows the value tuple of `point`.
    pub fn value(&self, point: usize) -> Result<&[f32]> {
        let start = self.mapped_index(point)? * self.component_count;
        Ok(&self.values[start..start + self.component_count])
    }

    /// All components, flattened in value order.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Iterates over the value tuples in value order.
    pub fn iter_values(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.values.chunks_exact(self.component_count)
    }

    /// Size of the stored values in bytes.
    pub fn byte_len(&self) -> usize {
        self.values.len() * self.component_type.size()
    }

    fn check_point(&self, point: usize) -> Result<()> {
        if point >= self.point_count {
            return Err(Error::OutOfRange {
                index: point,
                point_count: self.point_count,
            });
        }
        Ok(())
    }
}

/// An attribute registered in a mesh: identity, meaning, and values.
///
/// Semantic and layout are fixed at registration; only values change
/// afterwards. Reads go through the wrapped [`AttributeStore`]; the only
/// write is [`PointAttribute::set_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct PointAttribute {
    id: AttributeId,
    semantic: AttributeSemantic,
    store: AttributeStore,
}

impl PointAttribute {
    pub(crate) fn new(id: AttributeId, semantic: AttributeSemantic, store: AttributeStore) -> Self {
        Self {
            id,
            semantic,
            store,
        }
    }

    #[inline]
    pub fn id(&self) -> AttributeId {
        self.id
    }

    #[inline]
    pub fn semantic(&self) -> AttributeSemantic {
        self.semantic
    }

    #[inline]
    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    /// Writes the value tuple of `point`. Layout and point count stay fixed.
    pub fn set_value(&mut self, point: usize, value: &[f32]) -> Result<()> {
        self.store.set_value(point, value)
    }
}

impl Deref for PointAttribute {
    type Target = AttributeStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
