//! CPU-side scene assembly: the buffers the GPU layer uploads as-is.

use glam::Vec3;

use crate::bounds::BoundingBox;
use crate::mesh::{MeshData, MeshError};

/// Margin around the wall footprint covered by the floor.
const FLOOR_MARGIN: f32 = 0.1;
/// Floor margin (m) on axes where the walls have no extent at all.
const MIN_FLOOR_MARGIN: f32 = 1.0;
const FLOOR_COLOR: [f32; 3] = [0.35, 0.37, 0.40];
const EDGE_COLOR: [f32; 3] = [0.10, 0.10, 0.12];
const AXIS_COLORS: [[f32; 3]; 3] = [[0.9, 0.2, 0.2], [0.2, 0.8, 0.2], [0.2, 0.4, 0.95]];

/// Floats per interleaved line vertex: xyz rgb.
pub const LINE_STRIDE: usize = 6;
/// Floats per ribbon vertex: xyz, other end xyz, rgb, side.
pub const RIBBON_STRIDE: usize = 10;
/// Two triangles per segment.
pub const RIBBON_VERTICES_PER_SEGMENT: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceBuffers {
    /// Flat xyz, in received vertex order.
    pub positions: Vec<f32>,
    /// Flat per-vertex normals, same layout as `positions`.
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl SurfaceBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle(&self, face: usize) -> Option<[Vec3; 3]> {
        let tri = self.indices.get(face * 3..face * 3 + 3)?;
        let mut out = [Vec3::ZERO; 3];
        for (slot, &i) in out.iter_mut().zip(tri) {
            let base = i as usize * 3;
            let p = self.positions.get(base..base + 3)?;
            *slot = Vec3::new(p[0], p[1], p[2]);
        }
        Some(out)
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneGeometry {
    pub walls: SurfaceBuffers,
    pub floor: SurfaceBuffers,
    /// Wall edges as line-list vertices (`LINE_STRIDE` floats each).
    pub edge_lines: Vec<f32>,
    /// X/Y/Z axes from the scene center, colored red/green/blue.
    pub axis_lines: Vec<f32>,
    pub bounds: BoundingBox,
    pub wall_count: u32,
}

impl SceneGeometry {
    pub fn floor_y(&self) -> f32 {
        self.bounds.floor_y()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SceneBuilder;

impl SceneBuilder {
    pub fn build(&self, mesh: &MeshData) -> Result<SceneGeometry, MeshError> {
        mesh.validate()?;
        let bounds = BoundingBox::from_points(mesh.positions()).ok_or(MeshError::Empty)?;

        let walls = SurfaceBuffers {
            positions: mesh.flatten_positions(),
            normals: mesh.vertex_normals(),
            indices: mesh.flatten_indices(),
        };

        let mut edge_lines = Vec::new();
        for [a, b] in mesh.edges() {
            for i in [a, b] {
                edge_lines.extend_from_slice(&mesh.vertices[i as usize]);
                edge_lines.extend_from_slice(&EDGE_COLOR);
            }
        }

        log::debug!(
            "Scene built: {} vertices, {} faces, {} edge segments, bounds {:?}..{:?}",
            mesh.vertex_count(),
            mesh.face_count(),
            edge_lines.len() / (2 * LINE_STRIDE),
            bounds.min,
            bounds.max
        );

        Ok(SceneGeometry {
            walls,
            floor: floor_quad(&bounds),
            edge_lines,
            axis_lines: axis_lines(&bounds),
            bounds,
            wall_count: mesh.wall_count(),
        })
    }
}

/// Upward-facing quad under the walls, slightly larger than their footprint.
fn floor_quad(bounds: &BoundingBox) -> SurfaceBuffers {
    let b = bounds.expanded_xz(FLOOR_MARGIN, MIN_FLOOR_MARGIN);
    let y = bounds.floor_y();
    SurfaceBuffers {
        positions: vec![
            b.min.x, y, b.min.z,
            b.min.x, y, b.max.z,
            b.max.x, y, b.max.z,
            b.max.x, y, b.min.z,
        ],
        normals: [0.0, 1.0, 0.0].repeat(4),
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

fn axis_lines(bounds: &BoundingBox) -> Vec<f32> {
    let origin = bounds.center();
    let length = bounds.max_extent().max(1.0);
    let mut out = Vec::with_capacity(3 * 2 * LINE_STRIDE);
    for (axis, color) in [Vec3::X, Vec3::Y, Vec3::Z].into_iter().zip(AXIS_COLORS) {
        let tip = origin + axis * length;
        out.extend_from_slice(&origin.to_array());
        out.extend_from_slice(&color);
        out.extend_from_slice(&tip.to_array());
        out.extend_from_slice(&color);
    }
    out
}

/// Expands a line list into triangles the vertex shader widens in screen
/// space, so edge width does not depend on `glLineWidth` support.
///
/// Each vertex carries its own end, the opposite end and a side sign. The far
/// end's sign is flipped because its direction to the other end is reversed.
pub fn ribbon_vertices(lines: &[f32]) -> Vec<f32> {
    let segments = lines.len() / (2 * LINE_STRIDE);
    let mut out = Vec::with_capacity(segments * RIBBON_VERTICES_PER_SEGMENT * RIBBON_STRIDE);
    for segment in lines.chunks_exact(2 * LINE_STRIDE) {
        let (a, b) = segment.split_at(LINE_STRIDE);
        let corner = |out: &mut Vec<f32>, this: &[f32], other: &[f32], side: f32| {
            out.extend_from_slice(&this[..3]);
            out.extend_from_slice(&other[..3]);
            out.extend_from_slice(&this[3..]);
            out.push(side);
        };
        // a+, a-, b+ then b+, a-, b-
        corner(&mut out, a, b, 1.0);
        corner(&mut out, a, b, -1.0);
        corner(&mut out, b, a, -1.0);
        corner(&mut out, b, a, -1.0);
        corner(&mut out, a, b, -1.0);
        corner(&mut out, b, a, 1.0);
    }
    out
}

/// Floor color, exposed so the renderer and the UI agree on it.
pub fn floor_color() -> Vec3 {
    Vec3::from_array(FLOOR_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::{single_wall, unit_cube};

    #[test]
    fn test_walls_keep_received_order() {
        let mesh = unit_cube(6);
        let scene = SceneBuilder.build(&mesh).unwrap();
        assert_eq!(scene.walls.positions, mesh.flatten_positions());
        assert_eq!(scene.walls.indices, mesh.flatten_indices());
        assert_eq!(scene.walls.normals.len(), scene.walls.positions.len());
        assert_eq!(scene.wall_count, 6);
    }

    #[test]
    fn test_bounds_of_unit_cube() {
        let scene = SceneBuilder.build(&unit_cube(6)).unwrap();
        assert_eq!(scene.bounds.center(), Vec3::splat(0.5));
        assert_eq!(scene.bounds.half_extents(), Vec3::splat(0.5));
    }

    #[test]
    fn test_floor_sits_under_walls() {
        let scene = SceneBuilder.build(&single_wall([0.0, 0.0], [10.0, 0.0], 3.0)).unwrap();
        assert_eq!(scene.floor.face_count(), 2);
        for p in scene.floor.positions.chunks(3) {
            assert_eq!(p[1], 0.0);
        }
        let tri = scene.floor.triangle(0).unwrap();
        let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
        assert!(n.y > 0.0, "floor must face up, got {n:?}");
        assert!(scene.floor.positions[0] < 0.0);
    }

    #[test]
    fn test_floor_under_single_wall_has_area() {
        let scene = SceneBuilder.build(&single_wall([0.0, 0.0], [10.0, 0.0], 3.0)).unwrap();
        for face in 0..scene.floor.face_count() {
            let tri = scene.floor.triangle(face).unwrap();
            let area = (tri[1] - tri[0]).cross(tri[2] - tri[0]).length() * 0.5;
            assert!(area > 1.0, "face {face} area {area}");
        }
        let z: Vec<f32> = scene.floor.positions.chunks(3).map(|p| p[2]).collect();
        assert_eq!(z, vec![-1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_edge_lines_cover_each_edge_once() {
        let scene = SceneBuilder.build(&single_wall([0.0, 0.0], [1.0, 0.0], 3.0)).unwrap();
        assert_eq!(scene.edge_lines.len(), 5 * 2 * LINE_STRIDE);
    }

    #[test]
    fn test_axes_start_at_center() {
        let scene = SceneBuilder.build(&unit_cube(6)).unwrap();
        assert_eq!(scene.axis_lines.len(), 3 * 2 * LINE_STRIDE);
        assert_eq!(&scene.axis_lines[..3], &[0.5, 0.5, 0.5]);
        // x axis tip, length clamped to at least one unit
        assert_eq!(&scene.axis_lines[6..9], &[1.5, 0.5, 0.5]);
    }

    #[test]
    fn test_ribbon_expansion() {
        let lines = [
            0.0, 0.0, 0.0, 0.1, 0.2, 0.3, //
            4.0, 0.0, 0.0, 0.1, 0.2, 0.3,
        ];
        let ribbon = ribbon_vertices(&lines);
        assert_eq!(ribbon.len(), RIBBON_VERTICES_PER_SEGMENT * RIBBON_STRIDE);

        let verts: Vec<&[f32]> = ribbon.chunks(RIBBON_STRIDE).collect();
        // every vertex points at the opposite end and keeps the color
        for v in &verts {
            assert_ne!(&v[0..3], &v[3..6]);
            assert_eq!(&v[6..9], &[0.1, 0.2, 0.3]);
        }
        // near end is offset both ways, and so is the far end
        let sides = |end: f32| -> Vec<f32> {
            verts.iter().filter(|v| v[0] == end).map(|v| v[9]).collect()
        };
        let near = sides(0.0);
        let far = sides(4.0);
        assert!(near.contains(&1.0) && near.contains(&-1.0));
        assert!(far.contains(&1.0) && far.contains(&-1.0));
    }

    #[test]
    fn test_ribbon_covers_all_scene_edges() {
        let scene = SceneBuilder.build(&single_wall([0.0, 0.0], [1.0, 0.0], 3.0)).unwrap();
        let segments = scene.edge_lines.len() / (2 * LINE_STRIDE);
        assert_eq!(
            ribbon_vertices(&scene.edge_lines).len(),
            segments * RIBBON_VERTICES_PER_SEGMENT * RIBBON_STRIDE
        );
        assert!(ribbon_vertices(&[]).is_empty());
    }

    #[test]
    fn test_triangle_lookup() {
        let scene = SceneBuilder.build(&single_wall([0.0, 0.0], [2.0, 0.0], 3.0)).unwrap();
        let tri = scene.walls.triangle(1).unwrap();
        assert_eq!(tri, [Vec3::ZERO, Vec3::new(2.0, 3.0, 0.0), Vec3::new(0.0, 3.0, 0.0)]);
        assert!(scene.walls.triangle(2).is_none());
    }

    #[test]
    fn test_invalid_mesh_rejected() {
        let mut mesh = unit_cube(6);
        mesh.faces[0] = [0, 1, 99];
        assert!(matches!(SceneBuilder.build(&mesh), Err(MeshError::IndexOutOfRange { .. })));
    }
}
