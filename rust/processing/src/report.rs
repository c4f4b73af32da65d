// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON summary of a verified round trip.

use meshattr_core::{AttributeSemantic, Face, Mesh, MetadataValue, PointAttribute, StreamHeader};
use serde::Serialize;

use crate::pipeline::Stage;
use crate::verify::ResolvedAttribute;

/// What a verified round trip produced.
///
/// `uvs` is the first texture coordinate channel found by semantic; `uvs2`
/// is the channel found through the driver's metadata lookup, when one was
/// set and matched.
#[derive(Debug, Clone, Serialize)]
pub struct RoundTripReport {
    pub stage: Stage,
    pub compressed_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<StreamHeader>,
    pub point_count: usize,
    pub faces: Vec<Face>,
    pub positions: Vec<Vec<f32>>,
    pub uvs: Vec<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs2: Option<Vec<Vec<f32>>>,
    pub attributes: Vec<ResolvedAttribute>,
}

impl RoundTripReport {
    pub(crate) fn new(
        decoded: &Mesh,
        header: Option<StreamHeader>,
        compressed_size: usize,
        attributes: Vec<ResolvedAttribute>,
        lookup: Option<&(String, MetadataValue)>,
    ) -> Self {
        let uvs2 = lookup
            .and_then(|(key, value)| decoded.get_by_metadata(key, value))
            .map(rows);
        Self {
            stage: Stage::Verified,
            compressed_size,
            header,
            point_count: decoded.point_count(),
            faces: decoded.faces().to_vec(),
            positions: first_rows(decoded, AttributeSemantic::Position),
            uvs: first_rows(decoded, AttributeSemantic::TexCoord),
            uvs2,
            attributes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn first_rows(mesh: &Mesh, semantic: AttributeSemantic) -> Vec<Vec<f32>> {
    mesh.get_first_by_semantic(semantic)
        .map(rows)
        .unwrap_or_default()
}

fn rows(attribute: &PointAttribute) -> Vec<Vec<f32>> {
    attribute.iter_values().map(<[f32]>::to_vec).collect()
}
