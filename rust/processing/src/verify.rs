// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Post-decode verification.
//!
//! Every attribute of the original mesh is located again in the decoded mesh
//! without using its id. Attributes with metadata are found through each of
//! their effective metadata pairs, which must all agree on exactly one decoded
//! attribute. Attributes without metadata are matched by their position among
//! attributes of the same semantic. Values are compared bit for bit.

use meshattr_core::{
    AttributeId, AttributeMetadata, AttributeSemantic, Mesh, MetadataValue, PointAttribute,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Why a decoded mesh does not reproduce the original.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerificationError {
    #[error("point count changed from {original} to {decoded}")]
    PointCount { original: usize, decoded: usize },

    #[error("faces changed ({original} before, {decoded} after)")]
    Faces { original: usize, decoded: usize },

    #[error("attribute count changed from {original} to {decoded}")]
    AttributeCount { original: usize, decoded: usize },

    #[error("no decoded attribute has {key} = {value} (original attribute {original})")]
    Unresolved {
        original: AttributeId,
        key: String,
        value: MetadataValue,
    },

    #[error("no decoded {semantic} attribute at ordinal {ordinal}")]
    MissingOrdinal {
        semantic: AttributeSemantic,
        ordinal: usize,
    },

    #[error("{count} decoded attributes have {key} = {value}")]
    Ambiguous {
        key: String,
        value: MetadataValue,
        count: usize,
    },

    #[error("metadata of attribute {original} points at more than one decoded attribute")]
    Inconsistent { original: AttributeId },

    #[error("decoded attribute {decoded} was resolved for two original attributes")]
    Duplicate { decoded: AttributeId },

    #[error("{semantic} attribute {original} changed {detail}")]
    Layout {
        semantic: AttributeSemantic,
        original: AttributeId,
        detail: String,
    },

    #[error("{semantic} attribute {original} differs at point {point}")]
    Values {
        semantic: AttributeSemantic,
        original: AttributeId,
        point: usize,
    },

    #[error("metadata of attribute {original} changed")]
    Metadata { original: AttributeId },

    #[error("first {semantic} attribute differs from the first registered one")]
    SemanticOrder { semantic: AttributeSemantic },
}

/// How an original attribute was found in the decoded mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Resolution {
    Metadata { key: String, value: MetadataValue },
    SemanticOrdinal { ordinal: usize },
}

/// One original attribute and the decoded attribute it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAttribute {
    pub semantic: AttributeSemantic,
    pub original_id: AttributeId,
    pub decoded_id: AttributeId,
    pub component_count: usize,
    pub resolution: Resolution,
}

/// Checks that `decoded` reproduces `original` and returns how each original
/// attribute was resolved, in registration order.
pub fn verify_round_trip(
    original: &Mesh,
    decoded: &Mesh,
) -> Result<Vec<ResolvedAttribute>, VerificationError> {
    if original.point_count() != decoded.point_count() {
        return Err(VerificationError::PointCount {
            original: original.point_count(),
            decoded: decoded.point_count(),
        });
    }
    if original.faces() != decoded.faces() {
        return Err(VerificationError::Faces {
            original: original.num_faces(),
            decoded: decoded.num_faces(),
        });
    }
    if original.registry().len() != decoded.registry().len() {
        return Err(VerificationError::AttributeCount {
            original: original.registry().len(),
            decoded: decoded.registry().len(),
        });
    }

    let mut ordinals: FxHashMap<AttributeSemantic, usize> = FxHashMap::default();
    let mut claimed: FxHashSet<AttributeId> = FxHashSet::default();
    let mut resolved = Vec::with_capacity(original.registry().len());

    for (attribute, metadata) in original.registry().iter_with_metadata() {
        let ordinal = ordinals.entry(attribute.semantic()).or_insert(0);
        let (target, resolution) = resolve(attribute, metadata, *ordinal, decoded)?;
        *ordinal += 1;

        if !claimed.insert(target.id()) {
            return Err(VerificationError::Duplicate {
                decoded: target.id(),
            });
        }
        compare(attribute, target)?;
        let decoded_metadata = decoded.registry().metadata(target.id());
        if metadata.filter(|m| !m.is_empty()) != decoded_metadata.filter(|m| !m.is_empty()) {
            return Err(VerificationError::Metadata {
                original: attribute.id(),
            });
        }

        tracing::debug!(
            semantic = %attribute.semantic(),
            original = %attribute.id(),
            decoded = %target.id(),
            ?resolution,
            "Resolved attribute"
        );
        resolved.push(ResolvedAttribute {
            semantic: attribute.semantic(),
            original_id: attribute.id(),
            decoded_id: target.id(),
            component_count: attribute.component_count(),
            resolution,
        });
    }

    for semantic in AttributeSemantic::ALL {
        let expected = original.get_first_by_semantic(semantic).and_then(|first| {
            resolved
                .iter()
                .find(|r| r.original_id == first.id())
                .map(|r| r.decoded_id)
        });
        let actual = decoded.get_first_by_semantic(semantic).map(PointAttribute::id);
        if expected != actual {
            return Err(VerificationError::SemanticOrder { semantic });
        }
    }

    Ok(resolved)
}

fn resolve<'m>(
    attribute: &PointAttribute,
    metadata: Option<&AttributeMetadata>,
    ordinal: usize,
    decoded: &'m Mesh,
) -> Result<(&'m PointAttribute, Resolution), VerificationError> {
    let entries = metadata.map(AttributeMetadata::effective_entries).unwrap_or_default();
    let Some(&(first_key, first_value)) = entries.first() else {
        let target = decoded
            .registry()
            .get_nth_by_semantic(attribute.semantic(), ordinal)
            .ok_or(VerificationError::MissingOrdinal {
                semantic: attribute.semantic(),
                ordinal,
            })?;
        return Ok((target, Resolution::SemanticOrdinal { ordinal }));
    };

    let mut target: Option<&PointAttribute> = None;
    for &(key, value) in &entries {
        let count = decoded
            .registry()
            .iter_with_metadata()
            .filter(|(_, m)| m.is_some_and(|m| m.matches(key, value)))
            .count();
        if count > 1 {
            return Err(VerificationError::Ambiguous {
                key: key.to_string(),
                value: value.clone(),
                count,
            });
        }
        let found = decoded
            .get_by_metadata(key, value)
            .ok_or_else(|| VerificationError::Unresolved {
                original: attribute.id(),
                key: key.to_string(),
                value: value.clone(),
            })?;
        match target {
            Some(previous) if previous.id() != found.id() => {
                return Err(VerificationError::Inconsistent {
                    original: attribute.id(),
                });
            }
            _ => target = Some(found),
        }
    }

    let target = target.ok_or_else(|| VerificationError::Unresolved {
        original: attribute.id(),
        key: first_key.to_string(),
        value: first_value.clone(),
    })?;
    Ok((
        target,
        Resolution::Metadata {
            key: first_key.to_string(),
            value: first_value.clone(),
        },
    ))
}

fn compare(original: &PointAttribute, decoded: &PointAttribute) -> Result<(), VerificationError> {
    let layout = |detail: String| VerificationError::Layout {
        semantic: original.semantic(),
        original: original.id(),
        detail,
    };
    if original.semantic() != decoded.semantic() {
        return Err(layout(format!("semantic to {}", decoded.semantic())));
    }
    if original.component_count() != decoded.component_count() {
        return Err(layout(format!(
            "component count from {} to {}",
            original.component_count(),
            decoded.component_count()
        )));
    }
    if original.component_type() != decoded.component_type() {
        return Err(layout(format!(
            "component type to {}",
            decoded.component_type().as_str()
        )));
    }
    if original.point_count() != decoded.point_count() {
        return Err(layout(format!(
            "point count from {} to {}",
            original.point_count(),
            decoded.point_count()
        )));
    }

    let mismatch = original
        .iter_values()
        .zip(decoded.iter_values())
        .position(|(a, b)| a.iter().zip(b).any(|(x, y)| x.to_bits() != y.to_bits()));
    match mismatch {
        Some(point) => Err(VerificationError::Values {
            semantic: original.semantic(),
            original: original.id(),
            point,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario;
    use meshattr_core::{Codec, ComponentType, ZlibCodec};

    fn round_trip(mesh: &Mesh) -> Mesh {
        let codec = ZlibCodec::default();
        codec.decode(&codec.encode(mesh).unwrap()).unwrap()
    }

    #[test]
    fn test_demo_round_trip_verifies() {
        let demo = scenario::demo_mesh().unwrap();
        let decoded = round_trip(&demo.mesh);
        let resolved = verify_round_trip(&demo.mesh, &decoded).unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].resolution, Resolution::SemanticOrdinal { ordinal: 0 });
        assert_eq!(resolved[1].resolution, Resolution::SemanticOrdinal { ordinal: 0 });
        assert_eq!(
            resolved[2].resolution,
            Resolution::Metadata {
                key: scenario::SECONDARY_UV_KEY.to_string(),
                value: MetadataValue::from(scenario::SECONDARY_UV_NAME),
            }
        );
        assert_eq!(resolved[2].original_id, demo.secondary_uv);
    }

    #[test]
    fn test_renumbered_ids_still_resolve() {
        let mut demo = scenario::demo_mesh().unwrap();
        let scratch = demo
            .mesh
            .add_attribute(AttributeSemantic::Generic, 1, ComponentType::Float32)
            .unwrap();
        demo.mesh.registry_mut().remove_attribute(demo.position).unwrap();
        demo.mesh.registry_mut().remove_attribute(scratch).unwrap();
        let relaxed = ZlibCodec::new(meshattr_core::CodecOptions {
            require_position: false,
            ..Default::default()
        });
        let decoded = relaxed
            .decode(&relaxed.encode(&demo.mesh).unwrap())
            .unwrap();

        let resolved = verify_round_trip(&demo.mesh, &decoded).unwrap();
        let secondary = resolved
            .iter()
            .find(|r| r.original_id == demo.secondary_uv)
            .unwrap();
        assert_ne!(secondary.decoded_id, secondary.original_id);
    }

    #[test]
    fn test_changed_value_is_reported() {
        let demo = scenario::demo_mesh().unwrap();
        let mut decoded = round_trip(&demo.mesh);
        let id = decoded
            .get_by_metadata(
                scenario::SECONDARY_UV_KEY,
                &MetadataValue::from(scenario::SECONDARY_UV_NAME),
            )
            .map(PointAttribute::id)
            .unwrap();
        decoded.set_value(id, 2, &[0.9, 0.90001]).unwrap();

        let err = verify_round_trip(&demo.mesh, &decoded).unwrap_err();
        assert_eq!(
            err,
            VerificationError::Values {
                semantic: AttributeSemantic::TexCoord,
                original: demo.secondary_uv,
                point: 2,
            }
        );
    }

    #[test]
    fn test_lost_metadata_is_unresolved() {
        let demo = scenario::demo_mesh().unwrap();
        let mut decoded = round_trip(&demo.mesh);
        let ids: Vec<AttributeId> = decoded.registry().iter().map(PointAttribute::id).collect();
        for id in ids {
            decoded.registry_mut().detach_metadata(id);
        }

        let err = verify_round_trip(&demo.mesh, &decoded).unwrap_err();
        assert!(matches!(err, VerificationError::Unresolved { original, .. } if original == demo.secondary_uv));
    }

    #[test]
    fn test_swapped_registration_order_is_caught() {
        let demo = scenario::demo_mesh().unwrap();

        let mut swapped = Mesh::new();
        swapped.set_point_count(3).unwrap();
        let position = swapped
            .add_attribute(AttributeSemantic::Position, 3, ComponentType::Float32)
            .unwrap();
        let second = swapped
            .add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32)
            .unwrap();
        let first = swapped
            .add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32)
            .unwrap();
        for point in 0..3 {
            swapped.set_value(position, point, &scenario::POSITIONS[point]).unwrap();
            swapped.set_value(first, point, &scenario::PRIMARY_UVS[point]).unwrap();
            swapped.set_value(second, point, &scenario::SECONDARY_UVS[point]).unwrap();
        }
        swapped.set_faces(scenario::FACES.to_vec()).unwrap();
        swapped
            .attach_metadata(second, scenario::secondary_uv_metadata())
            .unwrap();

        assert!(verify_round_trip(&demo.mesh, &swapped).is_err());
    }

    #[test]
    fn test_face_change_is_reported() {
        let demo = scenario::demo_mesh().unwrap();
        let mut decoded = round_trip(&demo.mesh);
        decoded.set_faces(vec![[0, 2, 1]]).unwrap();
        assert_eq!(
            verify_round_trip(&demo.mesh, &decoded).unwrap_err(),
            VerificationError::Faces {
                original: 1,
                decoded: 1
            }
        );
    }
}
