// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The attribute registry: identity, ownership and lookup of a mesh's
//! attributes.
//!
//! Attributes live in a `Vec` in registration order, with a hash index from
//! [`AttributeId`] to position. Ids come from a counter that starts at 0 and
//! is never rewound, so removing an attribute leaves a gap rather than
//! freeing its id.
//!
//! ## Resolving attributes
//!
//! Two lookups exist and they answer different questions:
//!
//! - [`AttributeRegistry::get_first_by_semantic`] answers "some attribute of
//!   this kind". With two `TexCoord` channels it returns the first one
//!   registered, never an error, and never the second.
//! - [`AttributeRegistry::get_by_metadata`] answers "the attribute tagged
//!   `(key, value)`". [`AttributeRegistry::attach_metadata`] refuses tags
//!   that another attribute already answers to, so this lookup is
//!   unambiguous.
//!
//! Code holding an id across an encode/decode cycle must resolve the
//! attribute again in the decoded registry; ids are not carried over.

use rustc_hash::FxHashMap;

use crate::attribute::{AttributeStore, PointAttribute};
use crate::error::{Error, Result};
use crate::keys::{AttributeId, AttributeSemantic, ComponentType};
use crate::metadata::{AttributeMetadata, MetadataValue};

/// Owner of all attributes of one mesh.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    attributes: Vec<PointAttribute>,
    index: FxHashMap<AttributeId, usize>,
    metadata: FxHashMap<AttributeId, AttributeMetadata>,
    next_id: u32,
}

impl AttributeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new zero-filled attribute and returns its id.
    pub fn add_attribute(
        &mut self,
        semantic: AttributeSemantic,
        component_count: usize,
        component_type: ComponentType,
        point_count: usize,
    ) -> Result<AttributeId> {
        let next = self.next_id.checked_add(1).ok_or(Error::IdsExhausted)?;
        let store = AttributeStore::new(component_count, component_type, point_count)?;
        let id = AttributeId(self.next_id);
        self.next_id = next;
        self.index.insert(id, self.attributes.len());
        self.attributes.push(PointAttribute::new(id, semantic, store));
        Ok(id)
    }

    /// Attaches `metadata` to an attribute, replacing any metadata it had.
    ///
    /// Fails with [`Error::AmbiguousMetadata`] if one of the visible entries
    /// of `metadata` is already matched by another attribute's metadata.
    pub fn attach_metadata(&mut self, id: AttributeId, metadata: AttributeMetadata) -> Result<()> {
        if !self.index.contains_key(&id) {
            return Err(Error::UnknownAttribute(id));
        }
        for (key, value) in metadata.effective_entries() {
            if let Some(existing) = self.find_by_metadata(key, value, Some(id)) {
                return Err(Error::AmbiguousMetadata {
                    key: key.to_string(),
                    existing: existing.id(),
                    semantic: existing.semantic(),
                });
            }
        }
        self.metadata.insert(id, metadata);
        Ok(())
    }

    /// Returns the metadata attached to an attribute, if any.
    pub fn metadata(&self, id: AttributeId) -> Option<&AttributeMetadata> {
        self.metadata.get(&id)
    }

    /// Detaches and returns the metadata of an attribute.
    pub fn detach_metadata(&mut self, id: AttributeId) -> Option<AttributeMetadata> {
        self.metadata.remove(&id)
    }

    pub fn get_by_id(&self, id: AttributeId) -> Option<&PointAttribute> {
        self.index.get(&id).map(|&i| &self.attributes[i])
    }

    pub fn get_by_id_mut(&mut self, id: AttributeId) -> Option<&mut PointAttribute> {
        self.index.get(&id).map(|&i| &mut self.attributes[i])
    }

    /// Returns the earliest-registered attribute with `semantic`.
    ///
    /// When several attributes share the semantic, the later ones are never
    /// returned here. Use [`AttributeRegistry::get_by_metadata`] or
    /// [`AttributeRegistry::get_nth_by_semantic`] to reach them.
    pub fn get_first_by_semantic(&self, semantic: AttributeSemantic) -> Option<&PointAttribute> {
        self.iter_by_semantic(semantic).next()
    }

    /// Returns the `n`-th attribute (in registration order) with `semantic`.
    pub fn get_nth_by_semantic(
        &self,
        semantic: AttributeSemantic,
        n: usize,
    ) -> Option<&PointAttribute> {
        self.iter_by_semantic(semantic).nth(n)
    }

    /// Number of attributes with `semantic`.
    pub fn count_by_semantic(&self, semantic: AttributeSemantic) -> usize {
        self.iter_by_semantic(semantic).count()
    }

    /// Iterates over the attributes with `semantic` in registration order.
    pub fn iter_by_semantic(
        &self,
        semantic: AttributeSemantic,
    ) -> impl Iterator<Item = &PointAttribute> + '_ {
        self.attributes
            .iter()
            .filter(move |a| a.semantic() == semantic)
    }

    /// Returns the attribute whose metadata has `key` set to `value`.
    pub fn get_by_metadata(&self, key: &str, value: &MetadataValue) -> Option<&PointAttribute> {
        self.find_by_metadata(key, value, None)
    }

    /// Returns the id of the attribute whose metadata has `key` set to `value`.
    pub fn id_by_metadata(&self, key: &str, value: &MetadataValue) -> Option<AttributeId> {
        self.get_by_metadata(key, value).map(PointAttribute::id)
    }

    fn find_by_metadata(
        &self,
        key: &str,
        value: &MetadataValue,
        skip: Option<AttributeId>,
    ) -> Option<&PointAttribute> {
        self.attributes.iter().find(|a| {
            Some(a.id()) != skip
                && self
                    .metadata
                    .get(&a.id())
                    .is_some_and(|m| m.matches(key, value))
        })
    }

    /// Writes the value of `point` in an attribute.
    pub fn set_value(&mut self, id: AttributeId, point: usize, value: &[f32]) -> Result<()> {
        self.get_by_id_mut(id)
            .ok_or(Error::UnknownAttribute(id))?
            .set_value(point, value)
    }

    /// Removes an attribute and its metadata. Its id is not reused.
    pub fn remove_attribute(&mut self, id: AttributeId) -> Result<PointAttribute> {
        let position = self.index.remove(&id).ok_or(Error::UnknownAttribute(id))?;
        let removed = self.attributes.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        self.metadata.remove(&id);
        Ok(removed)
    }

    /// Iterates over all attributes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PointAttribute> + '_ {
        self.attributes.iter()
    }

    /// Iterates over all attributes with their metadata, in registration order.
    pub fn iter_with_metadata(
        &self,
    ) -> impl Iterator<Item = (&PointAttribute, Option<&AttributeMetadata>)> + '_ {
        self.attributes
            .iter()
            .map(|a| (a, self.metadata.get(&a.id())))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The id the next registered attribute will receive.
    pub fn next_id(&self) -> AttributeId {
        AttributeId(self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(key: &str, value: impl Into<MetadataValue>) -> AttributeMetadata {
        let mut meta = AttributeMetadata::new();
        meta.add_entry(key, value);
        meta
    }

    fn two_uv_registry() -> (AttributeRegistry, AttributeId, AttributeId) {
        let mut reg = AttributeRegistry::new();
        reg.add_attribute(AttributeSemantic::Position, 3, ComponentType::Float32, 3)
            .unwrap();
        let uv1 = reg
            .add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32, 3)
            .unwrap();
        let uv2 = reg
            .add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32, 3)
            .unwrap();
        (reg, uv1, uv2)
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let (reg, uv1, uv2) = two_uv_registry();
        assert_eq!(uv1.get(), 1);
        assert_eq!(uv2.get(), 2);
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.next_id().get(), 3);
    }

    #[test]
    fn invalid_shape_does_not_consume_an_id() {
        let mut reg = AttributeRegistry::new();
        assert!(reg
            .add_attribute(AttributeSemantic::Generic, 0, ComponentType::Float32, 3)
            .is_err());
        let id = reg
            .add_attribute(AttributeSemantic::Generic, 1, ComponentType::Float32, 3)
            .unwrap();
        assert_eq!(id.get(), 0);
    }

    #[test]
    fn first_by_semantic_is_first_registered() {
        let (reg, uv1, uv2) = two_uv_registry();
        let found = reg.get_first_by_semantic(AttributeSemantic::TexCoord).unwrap();
        assert_eq!(found.id(), uv1);
        assert_ne!(found.id(), uv2);
        assert_eq!(reg.count_by_semantic(AttributeSemantic::TexCoord), 2);
        assert_eq!(
            reg.get_nth_by_semantic(AttributeSemantic::TexCoord, 1)
                .map(PointAttribute::id),
            Some(uv2)
        );
        assert!(reg.get_first_by_semantic(AttributeSemantic::Normal).is_none());
    }

    #[test]
    fn metadata_resolves_the_second_channel() {
        let (mut reg, uv1, uv2) = two_uv_registry();
        let mut meta = tagged("name", "secondaryUvs");
        meta.add_int("custom_id", 44);
        reg.attach_metadata(uv2, meta).unwrap();

        assert_eq!(reg.id_by_metadata("name", &"secondaryUvs".into()), Some(uv2));
        assert_eq!(reg.id_by_metadata("custom_id", &44.into()), Some(uv2));
        assert_ne!(reg.id_by_metadata("name", &"secondaryUvs".into()), Some(uv1));
        assert!(reg.get_by_metadata("name", &"primaryUvs".into()).is_none());
        assert!(reg.get_by_metadata("custom_id", &"44".into()).is_none());
    }

    #[test]
    fn distinct_tags_resolve_distinct_attributes() {
        let (mut reg, uv1, uv2) = two_uv_registry();
        reg.attach_metadata(uv1, tagged("name", "baseUvs")).unwrap();
        reg.attach_metadata(uv2, tagged("name", "lightmapUvs")).unwrap();

        assert_eq!(reg.id_by_metadata("name", &"baseUvs".into()), Some(uv1));
        assert_eq!(reg.id_by_metadata("name", &"lightmapUvs".into()), Some(uv2));
    }

    #[test]
    fn attach_to_unknown_attribute() {
        let mut reg = AttributeRegistry::new();
        let result = reg.attach_metadata(AttributeId(9), tagged("name", "x"));
        assert_eq!(result, Err(Error::UnknownAttribute(AttributeId(9))));
    }

    #[test]
    fn attach_replaces_previous_metadata() {
        let (mut reg, _, uv2) = two_uv_registry();
        reg.attach_metadata(uv2, tagged("name", "old")).unwrap();
        reg.attach_metadata(uv2, tagged("name", "new")).unwrap();

        assert_eq!(reg.metadata(uv2).unwrap().len(), 1);
        assert!(reg.get_by_metadata("name", &"old".into()).is_none());
        assert_eq!(reg.id_by_metadata("name", &"new".into()), Some(uv2));
    }

    #[test]
    fn identical_tags_on_two_attributes_are_rejected() {
        let (mut reg, uv1, uv2) = two_uv_registry();
        reg.attach_metadata(uv1, tagged("name", "uvs")).unwrap();

        let err = reg.attach_metadata(uv2, tagged("name", "uvs")).unwrap_err();
        assert_eq!(
            err,
            Error::AmbiguousMetadata {
                key: "name".to_string(),
                existing: uv1,
                semantic: AttributeSemantic::TexCoord,
            }
        );
        assert!(reg.metadata(uv2).is_none());
    }

    #[test]
    fn shared_key_with_different_values_is_fine() {
        let (mut reg, uv1, uv2) = two_uv_registry();
        reg.attach_metadata(uv1, tagged("custom_id", 1)).unwrap();
        reg.attach_metadata(uv2, tagged("custom_id", 2)).unwrap();
        assert_eq!(reg.id_by_metadata("custom_id", &2.into()), Some(uv2));
    }

    #[test]
    fn reattaching_same_tag_to_same_attribute_is_fine() {
        let (mut reg, uv1, _) = two_uv_registry();
        reg.attach_metadata(uv1, tagged("name", "uvs")).unwrap();
        reg.attach_metadata(uv1, tagged("name", "uvs")).unwrap();
        assert_eq!(reg.id_by_metadata("name", &"uvs".into()), Some(uv1));
    }

    #[test]
    fn set_value_through_registry() {
        let (mut reg, uv1, _) = two_uv_registry();
        reg.set_value(uv1, 2, &[0.5, 0.5]).unwrap();
        assert_eq!(reg.get_by_id(uv1).unwrap().get_value(2).unwrap(), vec![0.5, 0.5]);
        assert_eq!(
            reg.set_value(AttributeId(42), 0, &[0.0, 0.0]),
            Err(Error::UnknownAttribute(AttributeId(42)))
        );
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let (mut reg, uv1, uv2) = two_uv_registry();
        reg.attach_metadata(uv1, tagged("name", "gone")).unwrap();

        let removed = reg.remove_attribute(uv1).unwrap();
        assert_eq!(removed.id(), uv1);
        assert!(reg.get_by_id(uv1).is_none());
        assert!(reg.metadata(uv1).is_none());
        assert!(reg.get_by_metadata("name", &"gone".into()).is_none());

        // the remaining attributes are still reachable by id
        assert_eq!(reg.get_by_id(uv2).unwrap().id(), uv2);
        assert_eq!(
            reg.get_first_by_semantic(AttributeSemantic::TexCoord).unwrap().id(),
            uv2
        );

        let fresh = reg
            .add_attribute(AttributeSemantic::Normal, 3, ComponentType::Float32, 3)
            .unwrap();
        assert_eq!(fresh.get(), 3);
        assert_eq!(reg.remove_attribute(uv1).unwrap_err(), Error::UnknownAttribute(uv1));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let (mut reg, _, uv2) = two_uv_registry();
        reg.attach_metadata(uv2, tagged("name", "b")).unwrap();

        let ids: Vec<u32> = reg.iter().map(|a| a.id().get()).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        let tagged_count = reg
            .iter_with_metadata()
            .filter(|(_, meta)| meta.is_some())
            .count();
        assert_eq!(tagged_count, 1);
    }

    #[test]
    fn exhausted_ids_are_not_reused() {
        let mut reg = AttributeRegistry::new();
        reg.next_id = u32::MAX - 1;
        let last = reg
            .add_attribute(AttributeSemantic::Generic, 1, ComponentType::Float32, 1)
            .unwrap();
        assert_eq!(last.get(), u32::MAX - 1);
        assert_eq!(
            reg.add_attribute(AttributeSemantic::Generic, 1, ComponentType::Float32, 1),
            Err(Error::IdsExhausted)
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.next_id().get(), u32::MAX);
    }
}
