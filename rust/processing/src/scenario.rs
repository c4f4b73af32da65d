// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The demo mesh: one triangle carrying two texture coordinate channels.
//!
//! The second channel is tagged with metadata so it can be told apart from
//! the first after a round trip; a lookup by semantic alone always answers
//! the first channel.

use meshattr_core::{
    AttributeId, AttributeMetadata, AttributeSemantic, ComponentType, Face, Mesh, MetadataValue,
    Result,
};

pub const SECONDARY_UV_KEY: &str = "name";
pub const SECONDARY_UV_NAME: &str = "secondaryUvs";
pub const CUSTOM_ID_KEY: &str = "custom_id";
pub const CUSTOM_ID: i64 = 44;

pub const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
pub const PRIMARY_UVS: [[f32; 2]; 3] = [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]];
pub const SECONDARY_UVS: [[f32; 2]; 3] = [[0.1, 0.1], [0.6, 0.6], [0.9, 0.9]];
pub const FACES: [Face; 1] = [[0, 1, 2]];

/// The demo mesh and the ids its attributes were registered under.
#[derive(Debug, Clone)]
pub struct DemoMesh {
    pub mesh: Mesh,
    pub position: AttributeId,
    pub primary_uv: AttributeId,
    pub secondary_uv: AttributeId,
}

/// Metadata attached to the secondary texture coordinates.
pub fn secondary_uv_metadata() -> AttributeMetadata {
    let mut metadata = AttributeMetadata::new();
    metadata.add_string(SECONDARY_UV_KEY, SECONDARY_UV_NAME);
    metadata.add_int(CUSTOM_ID_KEY, CUSTOM_ID);
    metadata
}

/// The `(key, value)` pair that selects the secondary texture coordinates.
pub fn secondary_uv_lookup() -> (&'static str, MetadataValue) {
    (SECONDARY_UV_KEY, MetadataValue::from(SECONDARY_UV_NAME))
}

pub fn demo_mesh() -> Result<DemoMesh> {
    let mut mesh = Mesh::new();
    mesh.set_point_count(POSITIONS.len())?;

    let position = mesh.add_attribute(AttributeSemantic::Position, 3, ComponentType::Float32)?;
    fill(&mut mesh, position, &POSITIONS)?;

    let primary_uv = mesh.add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32)?;
    fill(&mut mesh, primary_uv, &PRIMARY_UVS)?;

    let secondary_uv = mesh.add_attribute(AttributeSemantic::TexCoord, 2, ComponentType::Float32)?;
    fill(&mut mesh, secondary_uv, &SECONDARY_UVS)?;
    mesh.attach_metadata(secondary_uv, secondary_uv_metadata())?;

    mesh.set_faces(FACES.to_vec())?;

    Ok(DemoMesh {
        mesh,
        position,
        primary_uv,
        secondary_uv,
    })
}

fn fill<const N: usize>(mesh: &mut Mesh, id: AttributeId, rows: &[[f32; N]]) -> Result<()> {
    for (point, row) in rows.iter().enumerate() {
        mesh.set_value(id, point, row)?;
    }
    Ok(())
}
