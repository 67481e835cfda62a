//! Click-to-select. A hit is only reported (logged); nothing is edited.

use glam::{Mat4, Vec2, Vec3};

use crate::scene::SurfaceBuffers;

/// Triangles the server emits per wall.
pub const TRIANGLES_PER_WALL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized.
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    /// Ray through a point in normalized device coordinates (`-1..=1`, y up).
    pub fn from_ndc(ndc: Vec2, view_projection: Mat4) -> Option<Self> {
        let inv = view_projection.inverse();
        let near = inv.project_point3(ndc.extend(-1.0));
        let far = inv.project_point3(ndc.extend(1.0));
        let dir = far - near;
        if !dir.is_finite() || dir.length_squared() == 0.0 {
            return None;
        }
        Some(Self::new(near, dir))
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Converts a pointer position inside a viewport rectangle to NDC.
pub fn screen_to_ndc(pointer: Vec2, viewport_min: Vec2, viewport_size: Vec2) -> Vec2 {
    let local = (pointer - viewport_min) / viewport_size;
    Vec2::new(local.x * 2.0 - 1.0, 1.0 - local.y * 2.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub face: usize,
    pub wall: usize,
    pub distance: f32,
    pub point: Vec3,
}

/// Möller-Trumbore; two-sided, returns the distance along the ray.
pub fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.dir.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Nearest wall face hit by `ray`, with `model` applied to the wall vertices.
pub fn pick_wall(walls: &SurfaceBuffers, model: Mat4, ray: &Ray) -> Option<WallHit> {
    (0..walls.face_count())
        .filter_map(|face| {
            let [a, b, c] = walls.triangle(face)?;
            let t = intersect_triangle(
                ray,
                model.transform_point3(a),
                model.transform_point3(b),
                model.transform_point3(c),
            )?;
            Some(WallHit {
                face,
                wall: face / TRIANGLES_PER_WALL,
                distance: t,
                point: ray.at(t),
            })
        })
        .min_by(|x, y| x.distance.total_cmp(&y.distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshData, MeshMetadata};
    use crate::scene::SceneBuilder;
    use crate::view_state::wall_transform;

    const EPS: f32 = 1e-4;

    /// Two parallel walls at z = 0 and z = 5, 4 m wide, 3 m high.
    fn two_walls() -> SurfaceBuffers {
        let mesh = MeshData {
            vertices: vec![
                [0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 3.0, 0.0], [0.0, 3.0, 0.0],
                [0.0, 0.0, 5.0], [4.0, 0.0, 5.0], [4.0, 3.0, 5.0], [0.0, 3.0, 5.0],
            ],
            faces: vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]],
            metadata: MeshMetadata {
                wall_count: 2,
                wall_height: Some(3.0),
            },
        };
        SceneBuilder.build(&mesh).unwrap().walls
    }

    #[test]
    fn test_ray_hits_triangle_from_both_sides() {
        let (v0, v1, v2) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        let front = Ray::new(Vec3::new(0.2, 0.2, 1.0), -Vec3::Z);
        let back = Ray::new(Vec3::new(0.2, 0.2, -2.0), Vec3::Z);
        assert!((intersect_triangle(&front, v0, v1, v2).unwrap() - 1.0).abs() < EPS);
        assert!((intersect_triangle(&back, v0, v1, v2).unwrap() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_ray_misses_outside_and_behind() {
        let (v0, v1, v2) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        let outside = Ray::new(Vec3::new(0.8, 0.8, 1.0), -Vec3::Z);
        let behind = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::Z);
        let parallel = Ray::new(Vec3::new(0.2, 0.2, 0.0), Vec3::X);
        assert!(intersect_triangle(&outside, v0, v1, v2).is_none());
        assert!(intersect_triangle(&behind, v0, v1, v2).is_none());
        assert!(intersect_triangle(&parallel, v0, v1, v2).is_none());
    }

    #[test]
    fn test_pick_nearest_wall() {
        let walls = two_walls();
        let ray = Ray::new(Vec3::new(1.0, 1.0, 10.0), -Vec3::Z);
        let hit = pick_wall(&walls, Mat4::IDENTITY, &ray).unwrap();
        assert_eq!(hit.wall, 1);
        assert!((hit.distance - 5.0).abs() < EPS);
        assert!(hit.point.abs_diff_eq(Vec3::new(1.0, 1.0, 5.0), EPS));

        let ray = Ray::new(Vec3::new(1.0, 1.0, -10.0), Vec3::Z);
        assert_eq!(pick_wall(&walls, Mat4::IDENTITY, &ray).unwrap().wall, 0);
    }

    #[test]
    fn test_pick_respects_height_scale() {
        let walls = two_walls();
        let ray = Ray::new(Vec3::new(1.0, 4.5, 10.0), -Vec3::Z);
        assert!(pick_wall(&walls, Mat4::IDENTITY, &ray).is_none());
        let taller = wall_transform(0.0, 2.0);
        assert_eq!(pick_wall(&walls, taller, &ray).unwrap().wall, 1);
    }

    #[test]
    fn test_screen_center_maps_to_ndc_origin() {
        let ndc = screen_to_ndc(Vec2::new(150.0, 100.0), Vec2::new(50.0, 50.0), Vec2::new(200.0, 100.0));
        assert!(ndc.abs_diff_eq(Vec2::ZERO, EPS));
        let corner = screen_to_ndc(Vec2::new(50.0, 50.0), Vec2::new(50.0, 50.0), Vec2::new(200.0, 100.0));
        assert!(corner.abs_diff_eq(Vec2::new(-1.0, 1.0), EPS));
    }

    #[test]
    fn test_center_ray_follows_view_direction() {
        let eye = Vec3::new(1.0, 1.5, 12.0);
        let target = Vec3::new(1.0, 1.5, 5.0);
        let vp = Mat4::perspective_rh_gl(0.8, 1.5, 0.1, 100.0) * Mat4::look_at_rh(eye, target, Vec3::Y);
        let ray = Ray::from_ndc(Vec2::ZERO, vp).unwrap();
        assert!(ray.dir.abs_diff_eq(-Vec3::Z, EPS));
        let hit = pick_wall(&two_walls(), Mat4::IDENTITY, &ray).unwrap();
        assert_eq!(hit.wall, 1);
        assert_eq!(hit.face / TRIANGLES_PER_WALL, hit.wall);
    }
}
