//! Presentation state owned by the app, not by the renderer.
//!
//! Controls mutate `ViewState`; the renderer only ever sees the snapshot
//! returned by [`ViewState::scene_uniforms`].

use glam::{Mat4, Vec3};
use serde::Deserialize;

pub const DEFAULT_WALL_COLOR: [f32; 3] = [0.80, 0.78, 0.74];
pub const MIN_LIGHT_INTENSITY: f32 = 0.0;
pub const MAX_LIGHT_INTENSITY: f32 = 2.0;
pub const WALL_HEIGHT_RANGE: std::ops::RangeInclusive<f32> = 0.5..=10.0;
pub const WALL_THICKNESS_RANGE: std::ops::RangeInclusive<f32> = 0.05..=0.5;

/// Edge width in points at full quality, for the reference thickness.
pub const FULL_EDGE_WIDTH: f32 = 2.0;
pub const REDUCED_EDGE_WIDTH: f32 = 1.0;

/// How toggle buttons describe themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelStyle {
    /// "Wireframe: ON": the label reports the current state.
    State,
    /// "Hide Walls": the label names what a click will do.
    Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub wireframe: bool,
    pub walls_visible: bool,
    pub floor_visible: bool,
    pub axes_visible: bool,
    pub light_intensity: f32,
    pub wall_color: [f32; 3],
    /// Displayed wall height (m); geometry is scaled relative to `base_wall_height`.
    pub wall_height: f32,
    pub base_wall_height: f32,
    pub wall_thickness: f32,
    pub base_wall_thickness: f32,
}

impl ViewState {
    pub fn new(wall_height: f32, wall_thickness: f32) -> Self {
        Self {
            wireframe: false,
            walls_visible: true,
            floor_visible: true,
            axes_visible: false,
            light_intensity: 1.0,
            wall_color: DEFAULT_WALL_COLOR,
            wall_height,
            base_wall_height: wall_height,
            wall_thickness,
            base_wall_thickness: wall_thickness,
        }
    }

    /// Re-bases the height slider on a freshly loaded mesh; other toggles persist.
    pub fn rebase_wall_height(&mut self, height: f32) {
        self.wall_height = height;
        self.base_wall_height = height;
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.wireframe = !self.wireframe;
        self.wireframe
    }

    pub fn toggle_walls(&mut self) -> bool {
        self.walls_visible = !self.walls_visible;
        self.walls_visible
    }

    pub fn toggle_floor(&mut self) -> bool {
        self.floor_visible = !self.floor_visible;
        self.floor_visible
    }

    pub fn toggle_axes(&mut self) -> bool {
        self.axes_visible = !self.axes_visible;
        self.axes_visible
    }

    pub fn set_light_intensity(&mut self, value: f32) {
        if value.is_finite() {
            self.light_intensity = value.clamp(MIN_LIGHT_INTENSITY, MAX_LIGHT_INTENSITY);
        }
    }

    pub fn set_wall_height(&mut self, value: f32) {
        if value.is_finite() {
            self.wall_height = value.clamp(*WALL_HEIGHT_RANGE.start(), *WALL_HEIGHT_RANGE.end());
        }
    }

    pub fn set_wall_thickness(&mut self, value: f32) {
        if value.is_finite() {
            self.wall_thickness =
                value.clamp(*WALL_THICKNESS_RANGE.start(), *WALL_THICKNESS_RANGE.end());
        }
    }

    pub fn wall_height_scale(&self) -> f32 {
        if self.base_wall_height > 0.0 {
            self.wall_height / self.base_wall_height
        } else {
            1.0
        }
    }

    pub fn wireframe_label(&self, style: LabelStyle) -> String {
        toggle_label(style, "Wireframe", self.wireframe)
    }

    pub fn walls_label(&self, style: LabelStyle) -> String {
        toggle_label(style, "Walls", self.walls_visible)
    }

    pub fn floor_label(&self, style: LabelStyle) -> String {
        toggle_label(style, "Floor", self.floor_visible)
    }

    pub fn axes_label(&self, style: LabelStyle) -> String {
        toggle_label(style, "Axes", self.axes_visible)
    }

    pub fn height_value_label(&self) -> String {
        format!("{:.1}m", self.wall_height)
    }

    pub fn thickness_value_label(&self) -> String {
        format!("{:.2}m", self.wall_thickness)
    }

    /// One-way sync: everything the renderer needs for this frame.
    pub fn scene_uniforms(&self, floor_y: f32, low_quality_edges: bool) -> SceneUniforms {
        let base_width = if low_quality_edges {
            REDUCED_EDGE_WIDTH
        } else {
            FULL_EDGE_WIDTH
        };
        let thickness_scale = if self.base_wall_thickness > 0.0 {
            self.wall_thickness / self.base_wall_thickness
        } else {
            1.0
        };
        SceneUniforms {
            wall_model: wall_transform(floor_y, self.wall_height_scale()),
            wall_color: Vec3::from_array(self.wall_color),
            light_intensity: self.light_intensity,
            draw_walls: self.walls_visible && !self.wireframe,
            draw_edges: self.walls_visible,
            edges_only: self.wireframe,
            draw_floor: self.floor_visible,
            draw_axes: self.axes_visible,
            edge_width: (base_width * thickness_scale).max(1.0),
        }
    }
}

/// Scales walls vertically about the floor plane.
pub fn wall_transform(floor_y: f32, height_scale: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, floor_y, 0.0))
        * Mat4::from_scale(Vec3::new(1.0, height_scale, 1.0))
        * Mat4::from_translation(Vec3::new(0.0, -floor_y, 0.0))
}

fn toggle_label(style: LabelStyle, name: &str, on: bool) -> String {
    match (style, on) {
        (LabelStyle::State, true) => format!("{name}: ON"),
        (LabelStyle::State, false) => format!("{name}: OFF"),
        (LabelStyle::Action, true) => format!("Hide {name}"),
        (LabelStyle::Action, false) => format!("Show {name}"),
    }
}

/// Per-frame render parameters derived from [`ViewState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneUniforms {
    pub wall_model: Mat4,
    pub wall_color: Vec3,
    pub light_intensity: f32,
    pub draw_walls: bool,
    pub draw_edges: bool,
    /// Wireframe mode: edges drawn in the wall color instead of dark outlines.
    pub edges_only: bool,
    pub draw_floor: bool,
    pub draw_axes: bool,
    pub edge_width: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ViewState {
        ViewState::new(3.0, 0.15)
    }

    #[test]
    fn test_wireframe_double_toggle_round_trips() {
        let mut view = state();
        let original = view.wireframe;
        assert_eq!(view.toggle_wireframe(), !original);
        assert_eq!(view.toggle_wireframe(), original);
        assert_eq!(view, state());
    }

    #[test]
    fn test_visibility_toggles_are_independent() {
        let mut view = state();
        view.toggle_walls();
        view.toggle_axes();
        assert!(!view.walls_visible);
        assert!(view.floor_visible);
        assert!(view.axes_visible);
        assert!(!view.wireframe);
    }

    #[test]
    fn test_state_labels() {
        let mut view = state();
        assert_eq!(view.wireframe_label(LabelStyle::State), "Wireframe: OFF");
        view.toggle_wireframe();
        assert_eq!(view.wireframe_label(LabelStyle::State), "Wireframe: ON");
        assert_eq!(view.floor_label(LabelStyle::State), "Floor: ON");
    }

    #[test]
    fn test_action_labels() {
        let mut view = state();
        assert_eq!(view.walls_label(LabelStyle::Action), "Hide Walls");
        view.toggle_walls();
        assert_eq!(view.walls_label(LabelStyle::Action), "Show Walls");
        assert_eq!(view.axes_label(LabelStyle::Action), "Show Axes");
    }

    #[test]
    fn test_light_intensity_clamped() {
        let mut view = state();
        view.set_light_intensity(5.0);
        assert_eq!(view.light_intensity, MAX_LIGHT_INTENSITY);
        view.set_light_intensity(-1.0);
        assert_eq!(view.light_intensity, MIN_LIGHT_INTENSITY);
        view.set_light_intensity(f32::NAN);
        assert_eq!(view.light_intensity, MIN_LIGHT_INTENSITY);
    }

    #[test]
    fn test_value_labels() {
        let mut view = state();
        view.set_wall_height(4.34);
        view.set_wall_thickness(0.2);
        assert_eq!(view.height_value_label(), "4.3m");
        assert_eq!(view.thickness_value_label(), "0.20m");
    }

    #[test]
    fn test_wireframe_hides_fill_but_keeps_edges() {
        let mut view = state();
        view.toggle_wireframe();
        let u = view.scene_uniforms(0.0, false);
        assert!(!u.draw_walls);
        assert!(u.draw_edges);
        assert!(u.edges_only);

        view.toggle_walls();
        let u = view.scene_uniforms(0.0, false);
        assert!(!u.draw_walls && !u.draw_edges);
    }

    #[test]
    fn test_edge_width_follows_quality_and_thickness() {
        let mut view = state();
        assert_eq!(view.scene_uniforms(0.0, false).edge_width, FULL_EDGE_WIDTH);
        assert_eq!(view.scene_uniforms(0.0, true).edge_width, REDUCED_EDGE_WIDTH);
        view.set_wall_thickness(0.3);
        assert!((view.scene_uniforms(0.0, false).edge_width - 2.0 * FULL_EDGE_WIDTH).abs() < 1e-5);
    }

    #[test]
    fn test_wall_transform_scales_about_floor() {
        let m = wall_transform(1.0, 2.0);
        assert!(m.transform_point3(Vec3::new(3.0, 1.0, 4.0)).abs_diff_eq(Vec3::new(3.0, 1.0, 4.0), 1e-5));
        assert!(m.transform_point3(Vec3::new(3.0, 2.5, 4.0)).abs_diff_eq(Vec3::new(3.0, 4.0, 4.0), 1e-5));
    }

    #[test]
    fn test_height_scale_after_rebase() {
        let mut view = state();
        view.set_wall_height(6.0);
        assert!((view.wall_height_scale() - 2.0).abs() < 1e-6);
        view.rebase_wall_height(2.5);
        assert!((view.wall_height_scale() - 1.0).abs() < 1e-6);
    }
}
