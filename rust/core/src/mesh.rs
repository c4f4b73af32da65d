// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle mesh: point count, face list and attribute registry.

use crate::attribute::PointAttribute;
use crate::error::{Error, Result};
use crate::keys::{AttributeId, AttributeSemantic, ComponentType, Face};
use crate::metadata::{AttributeMetadata, MetadataValue};
use crate::registry::AttributeRegistry;

/// A triangle mesh whose per-point data lives in an [`AttributeRegistry`].
///
/// The point count must be set before attributes are added; every attribute
/// is sized against it and it cannot change afterwards.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    point_count: usize,
    faces: Vec<Face>,
    registry: AttributeRegistry,
}

impl Mesh {
    /// Creates an empty mesh with no points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of points that attributes are sized against.
    pub fn set_point_count(&mut self, point_count: usize) -> Result<()> {
        if !self.registry.is_empty() {
            return Err(Error::AlreadySized(self.point_count));
        }
        self.point_count = point_count;
        Ok(())
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Replaces the face list. Every index must be below the point count.
    pub fn set_faces(&mut self, faces: Vec<Face>) -> Result<()> {
        for (i, face) in faces.iter().enumerate() {
            self.check_face(i, face)?;
        }
        self.faces = faces;
        Ok(())
    }

    /// Appends one face.
    pub fn add_face(&mut self, face: Face) -> Result<()> {
        self.check_face(self.faces.len(), &face)?;
        self.faces.push(face);
        Ok(())
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face(&self, index: usize) -> Option<&Face> {
        self.faces.get(index)
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut AttributeRegistry {
        &mut self.registry
    }

    /// Registers an attribute sized to the mesh's point count.
    pub fn add_attribute(
        &mut self,
        semantic: AttributeSemantic,
        component_count: usize,
        component_type: ComponentType,
    ) -> Result<AttributeId> {
        self.registry
            .add_attribute(semantic, component_count, component_type, self.point_count)
    }

    pub fn set_value(&mut self, id: AttributeId, point: usize, value: &[f32]) -> Result<()> {
        self.registry.set_value(id, point, value)
    }

    pub fn attach_metadata(&mut self, id: AttributeId, metadata: AttributeMetadata) -> Result<()> {
        self.registry.attach_metadata(id, metadata)
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&PointAttribute> {
        self.registry.get_by_id(id)
    }

    pub fn get_first_by_semantic(&self, semantic: AttributeSemantic) -> Option<&PointAttribute> {
        self.registry.get_first_by_semantic(semantic)
    }

    pub fn get_by_metadata(&self, key: &str, value: &MetadataValue) -> Option<&PointAttribute> {
        self.registry.get_by_metadata(key, value)
    }

    fn check_face(&self, index: usize, face: &Face) -> Result<()> {
        match face.iter().find(|&&p| p as usize >= self.point_count) {
            Some(&point) => Err(Error::FaceOutOfRange {
                face: index,
                point,
                point_count: self.point_count,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.set_point_count(3).unwrap();
        mesh
    }

    #[test]
    fn new_mesh_is_empty() {
        let mesh = Mesh::new();
        assert_eq!(mesh.point_count(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.registry().is_empty());
    }

    #[test]
    fn point_count_can_change_before_attributes() {
        let mut mesh = triangle();
        mesh.set_point_count(4).unwrap();
        assert_eq!(mesh.point_count(), 4);
    }

    #[test]
    fn point_count_is_fixed_once_sized() {
        let mut mesh = triangle();
        mesh.add_attribute(AttributeSemantic::Position, 3, ComponentType::Float32)
            .unwrap();
        assert_eq!(mesh.set_point_count(4), Err(Error::AlreadySized(3)));
        assert_eq!(mesh.set_point_count(3), Err(Error::AlreadySized(3)));
        assert_eq!(mesh.point_count(), 3);
    }

    #[test]
    fn attributes_are_sized_to_point_count() {
        let mut mesh = triangle();
        let id = mesh
            .add_attribute(AttributeSemantic::Position, 3, ComponentType::Float32)
            .unwrap();
        let attr = mesh.attribute(id).unwrap();
        assert_eq!(attr.point_count(), 3);
        assert_eq!(attr.value_count(), 3);
        assert_eq!(attr.component_count(), 3);
    }

    #[test]
    fn set_faces_replaces_list() {
        let mut mesh = triangle();
        mesh.set_faces(vec![[0, 1, 2], [2, 1, 0]]).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        mesh.set_faces(vec![[0, 2, 1]]).unwrap();
        assert_eq!(mesh.faces(), &[[0u32, 2, 1]]);
        assert_eq!(mesh.face(0), Some(&[0, 2, 1]));
        assert_eq!(mesh.face(1), None);
    }

    #[test]
    fn faces_are_bounds_checked() {
        let mut mesh = triangle();
        mesh.set_faces(vec![[0, 1, 2]]).unwrap();

        let err = mesh.set_faces(vec![[0, 1, 2], [1, 2, 3]]).unwrap_err();
        assert_eq!(
            err,
            Error::FaceOutOfRange {
                face: 1,
                point: 3,
                point_count: 3
            }
        );
        // the previous face list survives a rejected replacement
        assert_eq!(mesh.faces(), &[[0u32, 1, 2]]);

        assert!(mesh.add_face([0, 0, 3]).is_err());
        mesh.add_face([2, 0, 1]).unwrap();
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn faces_need_points() {
        let mut mesh = Mesh::new();
        assert!(mesh.set_faces(vec![[0, 0, 0]]).is_err());
        assert!(mesh.set_faces(Vec::new()).is_ok());
    }

    #[test]
    fn delegates_lookup_to_registry() {
        let mut mesh = triangle();
        let uv1 = mesh
            .add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32)
            .unwrap();
        let uv2 = mesh
            .add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32)
            .unwrap();
        let mut meta = AttributeMetadata::new();
        meta.add_string("name", "secondaryUvs");
        mesh.attach_metadata(uv2, meta).unwrap();
        mesh.set_value(uv2, 0, &[0.1, 0.1]).unwrap();

        assert_eq!(
            mesh.get_first_by_semantic(AttributeSemantic::TexCoord)
                .unwrap()
                .id(),
            uv1
        );
        let found = mesh.get_by_metadata("name", &"secondaryUvs".into()).unwrap();
        assert_eq!(found.id(), uv2);
        assert_eq!(found.get_value(0).unwrap(), vec![0.1, 0.1]);
    }
}
