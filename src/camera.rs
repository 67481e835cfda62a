//! Camera models and bounding-box framing.
//!
//! Two placement policies coexist: an orbit camera circling the scene center,
//! and a first-person free-roam camera standing inside the plan at eye
//! height. Both accept the same discrete presets.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, PI};
use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Vec2, Vec3};
use serde::Deserialize;

use crate::bounds::BoundingBox;
use crate::config::ViewerConfig;

/// Vertical field of view (rad).
pub const FOV_Y: f32 = 0.8;
pub const NEAR: f32 = 0.1;

const ROTATE_SENSITIVITY: f32 = 0.01;
const PAN_SENSITIVITY: f32 = 0.002;
const ZOOM_SENSITIVITY: f32 = 0.001;
const LOOK_SENSITIVITY: f32 = 0.004;
/// Keeps the orbit off the poles, where `look_at` degenerates.
const MIN_BETA: f32 = 0.01;
const MAX_BETA: f32 = PI - 0.01;
const MAX_PITCH: f32 = 1.55;

pub const DEFAULT_SPEED: f32 = 3.0;
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraPolicy {
    Orbit,
    FreeRoam,
}

impl CameraPolicy {
    pub fn label(self) -> &'static str {
        match self {
            CameraPolicy::Orbit => "Orbit",
            CameraPolicy::FreeRoam => "Free roam",
        }
    }
}

impl fmt::Display for CameraPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CameraPolicy::Orbit => "orbit",
            CameraPolicy::FreeRoam => "free-roam",
        })
    }
}

impl FromStr for CameraPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "orbit" => Ok(CameraPolicy::Orbit),
            "free-roam" | "free" | "freeroam" => Ok(CameraPolicy::FreeRoam),
            other => Err(format!("unknown camera policy '{other}' (expected orbit or free-roam)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPreset {
    Top,
    Front,
    Left,
    Right,
    Back,
    Perspective,
}

impl CameraPreset {
    pub const ALL: [CameraPreset; 6] = [
        CameraPreset::Top,
        CameraPreset::Front,
        CameraPreset::Left,
        CameraPreset::Right,
        CameraPreset::Back,
        CameraPreset::Perspective,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CameraPreset::Top => "Top",
            CameraPreset::Front => "Front",
            CameraPreset::Left => "Left",
            CameraPreset::Right => "Right",
            CameraPreset::Back => "Back",
            CameraPreset::Perspective => "3D",
        }
    }

    /// `(alpha, beta)`: azimuth around +Y and inclination from vertical.
    pub fn angles(self) -> (f32, f32) {
        match self {
            CameraPreset::Top => (-FRAC_PI_2, 0.1),
            CameraPreset::Front => (-FRAC_PI_2, FRAC_PI_2),
            CameraPreset::Left => (PI, FRAC_PI_2),
            CameraPreset::Right => (0.0, FRAC_PI_2),
            CameraPreset::Back => (FRAC_PI_2, FRAC_PI_2),
            CameraPreset::Perspective => (-FRAC_PI_4, FRAC_PI_3),
        }
    }

    /// Unit vector from the target toward the eye.
    pub fn direction(self) -> Vec3 {
        let (alpha, beta) = self.angles();
        orbit_offset(alpha, beta)
    }
}

/// Unit offset of an orbit eye for the given angles.
pub fn orbit_offset(alpha: f32, beta: f32) -> Vec3 {
    Vec3::new(alpha.cos() * beta.sin(), beta.cos(), alpha.sin() * beta.sin())
}

/// Orbit distance that keeps the whole plan in view.
pub fn framing_radius(bounds: &BoundingBox, config: &ViewerConfig) -> f32 {
    (bounds.max_extent() * config.orbit_radius_factor).max(config.min_orbit_radius)
}

/// One frame of pointer and keyboard input, already in camera terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraInput {
    /// Primary-button drag (px).
    pub rotate: Vec2,
    /// Secondary-button drag (px).
    pub pan: Vec2,
    pub scroll: f32,
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Seconds since the previous frame.
    pub dt: f32,
}

impl CameraInput {
    const fn axis(positive: bool, negative: bool) -> f32 {
        match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }

    /// `(forward, right, up)` in -1..=1.
    pub fn movement(&self) -> Vec3 {
        Vec3::new(
            Self::axis(self.forward, self.backward),
            Self::axis(self.right, self.left),
            Self::axis(self.up, self.down),
        )
    }

    pub fn is_moving(&self) -> bool {
        self.movement() != Vec3::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub target: Vec3,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl OrbitCamera {
    pub fn framing(bounds: &BoundingBox, config: &ViewerConfig) -> Self {
        let radius = framing_radius(bounds, config);
        let (alpha, beta) = CameraPreset::Perspective.angles();
        Self {
            alpha,
            beta,
            radius,
            target: bounds.center(),
            min_radius: (radius * 0.05).max(NEAR * 2.0),
            max_radius: radius * 10.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.target + orbit_offset(self.alpha, self.beta) * self.radius
    }

    pub fn apply_preset(&mut self, preset: CameraPreset) {
        (self.alpha, self.beta) = preset.angles();
    }

    pub fn rotate(&mut self, delta: Vec2) {
        self.alpha -= delta.x * ROTATE_SENSITIVITY;
        self.beta = (self.beta - delta.y * ROTATE_SENSITIVITY).clamp(MIN_BETA, MAX_BETA);
    }

    /// Slides the target in the view plane, scaled by distance.
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        let scale = self.radius * PAN_SENSITIVITY;
        self.target += (-right * delta.x + up * delta.y) * scale;
    }

    pub fn zoom(&mut self, scroll: f32) {
        self.radius = (self.radius * (1.0 - scroll * ZOOM_SENSITIVITY))
            .clamp(self.min_radius, self.max_radius);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }
}

/// First-person camera; no collisions, no target lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Movement speed (m/s).
    pub speed: f32,
}

impl FreeCamera {
    /// Stands at the plan center, `eye_height` above the floor, facing +Z.
    pub fn framing(bounds: &BoundingBox, config: &ViewerConfig) -> Self {
        let center = bounds.center();
        Self {
            position: Vec3::new(center.x, bounds.floor_y() + config.eye_height, center.z),
            yaw: 0.0,
            pitch: 0.0,
            speed: DEFAULT_SPEED,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos()).cross(Vec3::Y).normalize()
    }

    pub fn look(&mut self, delta: Vec2) {
        self.yaw -= delta.x * LOOK_SENSITIVITY;
        self.pitch = (self.pitch - delta.y * LOOK_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = dir.x.atan2(dir.z);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// WASD moves on the horizontal plane, Q/E straight down/up.
    pub fn advance(&mut self, input: &CameraInput) {
        let m = input.movement();
        let flat_forward = Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos());
        let dir = flat_forward * m.x + self.right() * m.y + Vec3::Y * m.z;
        self.position += dir.normalize_or_zero() * self.speed * input.dt;
    }

    /// Scrolling up speeds up, down slows down.
    pub fn adjust_speed(&mut self, scroll: f32) {
        self.speed = (self.speed * (1.0 + scroll * ZOOM_SENSITIVITY)).clamp(MIN_SPEED, MAX_SPEED);
    }

    pub fn apply_preset(&mut self, preset: CameraPreset, target: Vec3, distance: f32) {
        self.position = target + preset.direction() * distance;
        self.look_at(target);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Camera {
    Orbit(OrbitCamera),
    FreeRoam(FreeCamera),
}

impl Camera {
    pub fn framing(policy: CameraPolicy, bounds: &BoundingBox, config: &ViewerConfig) -> Self {
        match policy {
            CameraPolicy::Orbit => Camera::Orbit(OrbitCamera::framing(bounds, config)),
            CameraPolicy::FreeRoam => Camera::FreeRoam(FreeCamera::framing(bounds, config)),
        }
    }

    pub fn policy(&self) -> CameraPolicy {
        match self {
            Camera::Orbit(_) => CameraPolicy::Orbit,
            Camera::FreeRoam(_) => CameraPolicy::FreeRoam,
        }
    }

    pub fn eye(&self) -> Vec3 {
        match self {
            Camera::Orbit(c) => c.eye(),
            Camera::FreeRoam(c) => c.position,
        }
    }

    /// Free-roam movement speed, shown next to the controls.
    pub fn speed(&self) -> Option<f32> {
        match self {
            Camera::Orbit(_) => None,
            Camera::FreeRoam(c) => Some(c.speed),
        }
    }

    pub fn apply_preset(&mut self, preset: CameraPreset, bounds: &BoundingBox, config: &ViewerConfig) {
        match self {
            Camera::Orbit(c) => c.apply_preset(preset),
            Camera::FreeRoam(c) => c.apply_preset(preset, bounds.center(), framing_radius(bounds, config)),
        }
    }

    pub fn handle_input(&mut self, input: &CameraInput) {
        match self {
            Camera::Orbit(c) => {
                if input.rotate != Vec2::ZERO {
                    c.rotate(input.rotate);
                }
                if input.pan != Vec2::ZERO {
                    c.pan(input.pan);
                }
                if input.scroll != 0.0 {
                    c.zoom(input.scroll);
                }
            }
            Camera::FreeRoam(c) => {
                if input.rotate != Vec2::ZERO {
                    c.look(input.rotate);
                }
                if input.scroll != 0.0 {
                    c.adjust_speed(input.scroll);
                }
                if input.is_moving() {
                    c.advance(input);
                }
            }
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self {
            Camera::Orbit(c) => c.view_matrix(),
            Camera::FreeRoam(c) => c.view_matrix(),
        }
    }

    /// Far plane reaches well past the scene from wherever the eye is.
    pub fn projection(&self, aspect: f32, bounds: &BoundingBox) -> Mat4 {
        let reach = self.eye().distance(bounds.center()) + bounds.bounding_radius();
        let far = (reach * 4.0).max(1000.0);
        Mat4::perspective_rh_gl(FOV_Y, aspect.max(1e-3), NEAR, far)
    }

    pub fn view_projection(&self, aspect: f32, bounds: &BoundingBox) -> Mat4 {
        self.projection(aspect, bounds) * self.view_matrix()
    }
}
