//! Viewer settings.
//!
//! Everything has a sensible default so the web build can start without any
//! configuration; the native binary can load overrides from a JSON file.

use serde::Deserialize;

use crate::camera::CameraPolicy;
use crate::view_state::LabelStyle;

#[cfg(target_arch = "wasm32")]
const DEFAULT_UPLOAD_URL: &str = "/upload";
#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_UPLOAD_URL: &str = "http://127.0.0.1:5000/upload";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Endpoint receiving the multipart `file` upload.
    pub upload_url: String,
    pub camera_policy: CameraPolicy,
    pub label_style: LabelStyle,
    /// Height of the free-roam eye above the floor (m).
    pub eye_height: f32,
    /// Orbit distance as a multiple of the largest bounding-box dimension.
    pub orbit_radius_factor: f32,
    pub min_orbit_radius: f32,
    /// Wall height the server extrudes with when the response omits it (m).
    pub wall_height: f32,
    pub wall_thickness: f32,
    /// Below this frame rate edge lines are drawn thinner.
    pub low_fps_threshold: f32,
    pub accepted_extensions: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_owned(),
            camera_policy: CameraPolicy::Orbit,
            label_style: LabelStyle::State,
            eye_height: 1.7,
            orbit_radius_factor: 1.5,
            min_orbit_radius: 2.0,
            wall_height: 3.0,
            wall_thickness: 0.15,
            low_fps_threshold: 30.0,
            accepted_extensions: vec!["dxf".into(), "dwg".into(), "pdf".into()],
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Reads a JSON config file; missing keys keep their defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded viewer config from {}", path.display());
        Ok(config)
    }

    /// Extensions as `&str`, the form the file dialog filter wants.
    pub fn extension_filter(&self) -> Vec<&str> {
        self.accepted_extensions.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json_str(r#"{ "camera_policy": "free-roam", "eye_height": 1.5 }"#)
            .unwrap();
        assert_eq!(config.camera_policy, CameraPolicy::FreeRoam);
        assert!((config.eye_height - 1.5).abs() < 1e-6);
        assert_eq!(config.label_style, LabelStyle::State);
        assert_eq!(config.upload_url, DEFAULT_UPLOAD_URL);
        assert_eq!(config.extension_filter(), vec!["dxf", "dwg", "pdf"]);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(ViewerConfig::from_json_str(r#"{ "camera_policy": "helicopter" }"#).is_err());
    }
}
