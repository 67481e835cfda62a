//! Application state that does not need a GL context: status line, viewer
//! visibility, the current session and the view toggles. The eframe shell
//! in `lib.rs` draws from it and forwards user actions to it.

use crate::camera::{CameraInput, CameraPolicy, CameraPreset};
use crate::config::ViewerConfig;
use crate::session::{SessionId, ViewerSession};
use crate::upload::{PendingUpload, UploadResult, UploadedMesh};
use crate::view_state::{LabelStyle, ViewState};

pub const IDLE_STATUS: &str = "Select a blueprint (DXF, DWG or PDF) to convert.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Busy,
    Success,
    Error,
}

pub struct Viewer {
    config: ViewerConfig,
    status: String,
    status_kind: StatusKind,
    visible: bool,
    session: Option<ViewerSession>,
    view: ViewState,
    camera_policy: CameraPolicy,
    label_style: LabelStyle,
    pending: Option<PendingUpload>,
    /// Sessions disposed since the render layer last asked.
    disposed: Vec<SessionId>,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            view: ViewState::new(config.wall_height, config.wall_thickness),
            camera_policy: config.camera_policy,
            label_style: config.label_style,
            config,
            status: IDLE_STATUS.to_owned(),
            status_kind: StatusKind::Info,
            visible: false,
            session: None,
            pending: None,
            disposed: Vec::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn status_kind(&self) -> StatusKind {
        self.status_kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn session(&self) -> Option<&ViewerSession> {
        self.session.as_ref()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn label_style(&self) -> LabelStyle {
        self.label_style
    }

    pub fn set_label_style(&mut self, style: LabelStyle) {
        self.label_style = style;
    }

    pub fn camera_policy(&self) -> CameraPolicy {
        self.camera_policy
    }

    pub fn is_uploading(&self) -> bool {
        self.pending.is_some()
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = text.into();
        self.status_kind = kind;
    }

    /// Tracks a new upload. An upload already in flight is abandoned.
    pub fn begin_upload(&mut self, pending: PendingUpload) {
        if let Some(previous) = self.pending.replace(pending) {
            log::warn!("Abandoning in-flight upload of {}", previous.file_name());
        }
        let name = self.pending.as_ref().map(|p| p.file_name().to_owned()).unwrap_or_default();
        self.set_status(StatusKind::Busy, format!("Uploading and converting {name}..."));
    }

    /// Picks up a finished upload, if any. Returns `true` when one completed.
    pub fn poll_upload(&mut self) -> bool {
        let Some(result) = self.pending.as_mut().and_then(PendingUpload::try_recv) else {
            return false;
        };
        self.pending = None;
        self.handle_outcome(result);
        true
    }

    /// Routes an upload result to the status line and, on success, a new session.
    /// Errors leave the current session and visibility untouched.
    pub fn handle_outcome(&mut self, result: UploadResult) {
        match result {
            Ok(uploaded) => self.show_mesh(uploaded),
            Err(e) => {
                log::error!("Upload error: {e}");
                self.set_status(StatusKind::Error, format!("Error: {e}"));
            }
        }
    }

    fn show_mesh(&mut self, uploaded: UploadedMesh) {
        let UploadedMesh { mesh, filename, .. } = uploaded;
        let wall_height = mesh.metadata.wall_height.unwrap_or(self.config.wall_height);
        let session = match ViewerSession::new(mesh, filename, self.camera_policy, &self.config) {
            Ok(session) => session,
            Err(e) => {
                log::error!("Rejected mesh: {e}");
                self.set_status(StatusKind::Error, format!("Error: {e}"));
                return;
            }
        };

        if let Some(old) = self.session.take() {
            self.disposed.push(old.dispose());
        }
        let walls = session.wall_count();
        let message = match (self.label_style, session.filename()) {
            (LabelStyle::State, Some(name)) => format!("Loaded {name}: {walls} walls"),
            (LabelStyle::State, None) => format!("Loaded {walls} walls"),
            (LabelStyle::Action, _) => format!("Conversion successful! {walls} walls generated"),
        };
        self.view.rebase_wall_height(wall_height);
        self.session = Some(session);
        self.visible = true;
        self.set_status(StatusKind::Success, message);
    }

    /// Session ids whose GPU buffers should now be released.
    pub fn take_disposed(&mut self) -> Vec<SessionId> {
        std::mem::take(&mut self.disposed)
    }

    pub fn apply_preset(&mut self, preset: CameraPreset) {
        if let Some(session) = self.session.as_mut() {
            session.apply_preset(preset, &self.config);
        }
    }

    pub fn set_camera_policy(&mut self, policy: CameraPolicy) {
        self.camera_policy = policy;
        if let Some(session) = self.session.as_mut() {
            session.set_camera_policy(policy, &self.config);
        }
    }

    pub fn handle_camera_input(&mut self, input: &CameraInput) {
        if let Some(session) = self.session.as_mut() {
            session.handle_input(input);
        }
    }

    /// Text for the free-roam speed readout.
    pub fn speed_display(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.camera().speed())
            .map(|speed| format!("Speed: {speed:.1} m/s"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{UploadError, interpret_response};

    const FIVE_WALLS: &str = r#"{
        "filename": "house.dxf",
        "mesh_data": {
            "vertices": [[0, 0, 0], [8, 0, 0], [8, 2.5, 0], [0, 2.5, 0]],
            "faces": [[0, 1, 2], [0, 2, 3]],
            "metadata": { "wall_count": 5, "wall_height": 2.5 }
        }
    }"#;

    fn viewer() -> Viewer {
        Viewer::new(ViewerConfig::default())
    }

    #[test]
    fn test_starts_hidden_and_idle() {
        let v = viewer();
        assert!(!v.is_visible());
        assert_eq!(v.status(), IDLE_STATUS);
        assert!(v.session().is_none());
    }

    #[test]
    fn test_server_error_keeps_viewer_hidden() {
        let mut v = viewer();
        v.handle_outcome(interpret_response(200, r#"{ "error": "bad file" }"#));
        assert_eq!(v.status(), "Error: bad file");
        assert_eq!(v.status_kind(), StatusKind::Error);
        assert!(!v.is_visible());
        assert!(v.session().is_none());
    }

    #[test]
    fn test_failure_status_shows_status_not_body() {
        let mut v = viewer();
        v.handle_outcome(interpret_response(400, r#"{ "error": "Invalid file type" }"#));
        assert_eq!(v.status(), "Error: HTTP error! status: 400");
        assert_eq!(v.status_kind(), StatusKind::Error);
        assert!(!v.is_visible());
    }

    #[test]
    fn test_success_shows_wall_count() {
        let mut v = viewer();
        v.handle_outcome(interpret_response(200, FIVE_WALLS));
        assert!(v.status().contains("5 walls"), "{}", v.status());
        assert_eq!(v.status(), "Loaded house.dxf: 5 walls");
        assert!(v.is_visible());
        assert_eq!(v.session().unwrap().wall_count(), 5);
        assert!((v.view().base_wall_height - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_action_wording() {
        let mut v = viewer();
        v.set_label_style(LabelStyle::Action);
        v.handle_outcome(interpret_response(200, FIVE_WALLS));
        assert_eq!(v.status(), "Conversion successful! 5 walls generated");
    }

    #[test]
    fn test_failure_after_success_keeps_scene() {
        let mut v = viewer();
        v.handle_outcome(interpret_response(200, FIVE_WALLS));
        let id = v.session().unwrap().id();
        v.handle_outcome(Err(UploadError::Http { status: 500, detail: None }));
        assert_eq!(v.status(), "Error: HTTP error! status: 500");
        assert!(v.is_visible());
        assert_eq!(v.session().unwrap().id(), id);
        assert!(v.take_disposed().is_empty());
    }

    #[test]
    fn test_reupload_disposes_previous_session() {
        let mut v = viewer();
        v.handle_outcome(interpret_response(200, FIVE_WALLS));
        let first = v.session().unwrap().id();
        v.handle_outcome(interpret_response(200, FIVE_WALLS));
        assert_ne!(v.session().unwrap().id(), first);
        assert_eq!(v.take_disposed(), vec![first]);
        assert!(v.take_disposed().is_empty());
    }

    #[test]
    fn test_pending_upload_lifecycle() {
        let mut v = viewer();
        let (tx, pending) = PendingUpload::channel("house.dxf");
        v.begin_upload(pending);
        assert!(v.is_uploading());
        assert_eq!(v.status_kind(), StatusKind::Busy);
        assert!(v.status().contains("house.dxf"));
        assert!(!v.poll_upload());

        tx.send(interpret_response(200, FIVE_WALLS)).unwrap();
        assert!(v.poll_upload());
        assert!(!v.is_uploading());
        assert!(v.is_visible());
    }

    #[test]
    fn test_second_upload_replaces_first() {
        let mut v = viewer();
        let (first_tx, first) = PendingUpload::channel("a.dxf");
        let (second_tx, second) = PendingUpload::channel("b.dxf");
        v.begin_upload(first);
        v.begin_upload(second);
        assert!(first_tx.send(Err(UploadError::Server("late".into()))).is_err());
        second_tx.send(Err(UploadError::Server("bad file".into()))).unwrap();
        assert!(v.poll_upload());
        assert_eq!(v.status(), "Error: bad file");
    }

    #[test]
    fn test_camera_policy_and_speed_display() {
        let mut v = viewer();
        assert!(v.speed_display().is_none());
        v.handle_outcome(interpret_response(200, FIVE_WALLS));
        assert!(v.speed_display().is_none());
        v.set_camera_policy(CameraPolicy::FreeRoam);
        assert_eq!(v.speed_display().as_deref(), Some("Speed: 3.0 m/s"));
        v.apply_preset(CameraPreset::Top);
        assert_eq!(v.camera_policy(), CameraPolicy::FreeRoam);
    }
}
