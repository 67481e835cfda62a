//! Mesh payload produced by the conversion server.
//!
//! The server extrudes every blueprint wall into a vertical quad (4 vertices,
//! 2 triangles) and sends the raw vertex and face arrays. Nothing here
//! reorders, welds or deduplicates them: buffers keep the received order.

use std::collections::HashSet;

use glam::Vec3;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshMetadata {
    pub wall_count: u32,
    /// Extrusion height used by the server, if it reports one.
    #[serde(default)]
    pub wall_height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub metadata: MeshMetadata,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("no geometry: the blueprint produced no walls")]
    Empty,
    #[error("face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("vertex {0} has a non-finite coordinate")]
    NonFinite(usize),
    #[error("mesh data does not match the expected shape: {0}")]
    Shape(String),
}

impl MeshData {
    /// Deserializes and validates a `mesh_data` JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MeshError> {
        let mesh: MeshData =
            serde_json::from_value(value).map_err(|e| MeshError::Shape(e.to_string()))?;
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn from_json_str(text: &str) -> Result<Self, MeshError> {
        let mesh: MeshData =
            serde_json::from_str(text).map_err(|e| MeshError::Shape(e.to_string()))?;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Rejects meshes the renderer cannot draw safely.
    ///
    /// Degenerate triangles are accepted; they simply contribute nothing to
    /// the vertex normals.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        if let Some(i) = self
            .vertices
            .iter()
            .position(|v| v.iter().any(|c| !c.is_finite()))
        {
            return Err(MeshError::NonFinite(i));
        }
        let vertex_count = self.vertices.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn wall_count(&self) -> u32 {
        self.metadata.wall_count
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|&v| Vec3::from_array(v))
    }

    /// `[x0, y0, z0, x1, y1, z1, ...]`, length `3 * vertex_count`.
    pub fn flatten_positions(&self) -> Vec<f32> {
        self.vertices.iter().flatten().copied().collect()
    }

    /// `[i0, j0, k0, i1, j1, k1, ...]`, length `3 * face_count`.
    pub fn flatten_indices(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Per-vertex normals, flattened like the positions.
    ///
    /// Each face adds its un-normalised cross product to its three corners, so
    /// larger faces weigh more. Vertices touched only by degenerate faces (or by
    /// none) get a zero normal.
    pub fn vertex_normals(&self) -> Vec<f32> {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for &[a, b, c] in &self.faces {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            let (Some(&pa), Some(&pb), Some(&pc)) =
                (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c))
            else {
                continue;
            };
            let (pa, pb, pc) = (Vec3::from_array(pa), Vec3::from_array(pb), Vec3::from_array(pc));
            let n = (pb - pa).cross(pc - pa);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }
        acc.into_iter()
            .flat_map(|n| n.normalize_or_zero().to_array())
            .collect()
    }

    /// Unique undirected triangle edges, in first-seen order.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &[a, b, c] in &self.faces {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let key = (u.min(v), u.max(v));
                if seen.insert(key) {
                    out.push([u, v]);
                }
            }
        }
        out
    }
}
