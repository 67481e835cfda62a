//! One viewing session: the mesh of a single upload plus its camera.
//!
//! A new upload builds a new session; the previous one is disposed first.
//! GPU resources are keyed by [`SessionId`] so the render layer can tell
//! when its buffers belong to a session that no longer exists.

use glam::{Mat4, Vec3};
use uuid::Uuid;

use crate::camera::{Camera, CameraInput, CameraPolicy, CameraPreset};
use crate::config::ViewerConfig;
use crate::mesh::{MeshData, MeshError};
use crate::picking::{Ray, WallHit, pick_wall};
use crate::scene::{SceneBuilder, SceneGeometry};

pub type SessionId = Uuid;

#[derive(Debug, Clone)]
pub struct ViewerSession {
    id: SessionId,
    filename: Option<String>,
    mesh: MeshData,
    geometry: SceneGeometry,
    camera: Camera,
}

impl ViewerSession {
    pub fn new(
        mesh: MeshData,
        filename: Option<String>,
        policy: CameraPolicy,
        config: &ViewerConfig,
    ) -> Result<Self, MeshError> {
        let geometry = SceneBuilder.build(&mesh)?;
        let camera = Camera::framing(policy, &geometry.bounds, config);
        let id = Uuid::new_v4();
        log::info!(
            "Session {id} created for {}: {} walls, {:?} camera",
            filename.as_deref().unwrap_or("<unnamed>"),
            mesh.wall_count(),
            policy
        );
        Ok(Self {
            id,
            filename,
            mesh,
            geometry,
            camera,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn wall_count(&self) -> u32 {
        self.mesh.wall_count()
    }

    pub fn apply_preset(&mut self, preset: CameraPreset, config: &ViewerConfig) {
        self.camera.apply_preset(preset, &self.geometry.bounds, config);
        log::debug!("Session {}: {} view", self.id, preset.label());
    }

    /// Re-frames the scene with another placement policy.
    pub fn set_camera_policy(&mut self, policy: CameraPolicy, config: &ViewerConfig) {
        if self.camera.policy() != policy {
            self.camera = Camera::framing(policy, &self.geometry.bounds, config);
        }
    }

    pub fn handle_input(&mut self, input: &CameraInput) {
        self.camera.handle_input(input);
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.camera.view_projection(aspect, &self.geometry.bounds)
    }

    pub fn eye(&self) -> Vec3 {
        self.camera.eye()
    }

    pub fn pick(&self, ray: &Ray, wall_model: Mat4) -> Option<WallHit> {
        let hit = pick_wall(&self.geometry.walls, wall_model, ray);
        match &hit {
            Some(h) => log::info!(
                "Selected wall {} (face {}) at {:.2?}, {:.2} m away",
                h.wall,
                h.face,
                h.point,
                h.distance
            ),
            None => log::debug!("Click hit no wall"),
        }
        hit
    }

    /// Ends the session. Returns the id so GPU buffers tagged with it can be
    /// released on the next frame that has a GL context.
    pub fn dispose(self) -> SessionId {
        log::info!(
            "Session {} disposed ({} vertices released)",
            self.id,
            self.mesh.vertex_count()
        );
        self.id
    }
}
