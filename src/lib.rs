pub mod bounds;
pub mod camera;
pub mod config;
pub mod mesh;
pub mod perf;
pub mod picking;
pub mod renderer;
pub mod scene;
pub mod session;
pub mod upload;
pub mod view_state;
pub mod viewer;

use eframe::egui;
use glam::Vec2;
use rfd::AsyncFileDialog;
use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use crate::camera::{CameraInput, CameraPolicy, CameraPreset};
use crate::config::ViewerConfig;
use crate::perf::FrameStats;
use crate::picking::{Ray, screen_to_ndc};
use crate::renderer::{FrameUniforms, GpuScene};
use crate::session::SessionId;
use crate::view_state::{
    LabelStyle, MAX_LIGHT_INTENSITY, MIN_LIGHT_INTENSITY, WALL_HEIGHT_RANGE, WALL_THICKNESS_RANGE,
};
use crate::viewer::{StatusKind, Viewer};

/// Id of the `<canvas>` the web build renders into.
pub const CANVAS_ID: &str = "renderCanvas";

/// A file returned by the open dialog, waiting for the next frame.
enum PickedFile {
    /// Sent to the conversion server.
    Blueprint { name: String, bytes: Vec<u8> },
    /// A conversion reply saved earlier; opened without the server.
    SavedResponse { name: String, bytes: Vec<u8> },
}

pub struct ViewerApp {
    viewer: Viewer,
    picked: Arc<Mutex<Option<PickedFile>>>,
    gpu: Option<Arc<GpuScene>>,
    /// Scenes of disposed sessions; freed once no paint callback holds them.
    retired: Vec<Arc<GpuScene>>,
    /// Session whose buffers failed to build, so we don't retry every frame.
    gpu_failed: Option<SessionId>,
    frame_stats: FrameStats,
}

impl ViewerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        Self::with_viewer(Viewer::new(config))
    }

    pub fn with_viewer(viewer: Viewer) -> Self {
        let frame_stats = FrameStats::new(viewer.config().low_fps_threshold);
        Self {
            viewer,
            picked: Arc::new(Mutex::new(None)),
            gpu: None,
            retired: Vec::new(),
            gpu_failed: None,
            frame_stats,
        }
    }

    fn take_picked_file(&mut self) {
        let picked = match self.picked.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match picked {
            Some(PickedFile::Blueprint { name, bytes }) => {
                let url = self.viewer.config().upload_url.clone();
                self.viewer.begin_upload(upload::start_upload(url, name, bytes));
            }
            Some(PickedFile::SavedResponse { name, bytes }) => {
                log::info!("Opening saved conversion {name} ({} bytes)", bytes.len());
                self.viewer.handle_outcome(upload::open_saved_response(&name, &bytes));
            }
            None => {}
        }
    }

    /// Releases buffers of disposed sessions and uploads the current one.
    unsafe fn sync_gpu(&mut self, gl: &glow::Context) {
        for id in self.viewer.take_disposed() {
            if self.gpu.as_ref().is_some_and(|g| g.session() == id) {
                self.retired.extend(self.gpu.take());
            }
        }

        // The last paint callback may still hold a clone for one more frame.
        self.retired.retain(|scene| {
            if Arc::strong_count(scene) > 1 {
                return true;
            }
            log::debug!("Releasing GPU buffers of session {}", scene.session());
            unsafe { scene.destroy(gl) };
            false
        });

        if self.gpu.is_some() {
            return;
        }
        let Some(session) = self.viewer.session() else {
            return;
        };
        if self.gpu_failed == Some(session.id()) {
            return;
        }
        match unsafe { GpuScene::new(gl, session.id(), session.geometry()) } {
            Ok(scene) => self.gpu = Some(Arc::new(scene)),
            Err(e) => {
                log::error!("Could not upload scene for session {}: {e}", session.id());
                self.gpu_failed = Some(session.id());
            }
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Blueprint Viewer");
        ui.separator();

        if ui.button("Upload blueprint").clicked() {
            let exts = self
                .viewer
                .config()
                .extension_filter()
                .into_iter()
                .map(str::to_owned)
                .collect();
            spawn_file_picker(
                Arc::clone(&self.picked),
                ui.ctx().clone(),
                "Blueprint (dxf, dwg, pdf)",
                exts,
                |name, bytes| PickedFile::Blueprint { name, bytes },
            );
        }
        if ui.button("Open mesh JSON").clicked() {
            spawn_file_picker(
                Arc::clone(&self.picked),
                ui.ctx().clone(),
                "Conversion result (json)",
                vec!["json".to_owned()],
                |name, bytes| PickedFile::SavedResponse { name, bytes },
            );
        }

        ui.horizontal_wrapped(|ui| {
            let error_color = ui.visuals().error_fg_color;
            let text = egui::RichText::new(self.viewer.status());
            match self.viewer.status_kind() {
                StatusKind::Info => ui.label(text),
                StatusKind::Busy => {
                    ui.spinner();
                    ui.label(text)
                }
                StatusKind::Success => ui.colored_label(egui::Color32::from_rgb(90, 180, 90), text),
                StatusKind::Error => ui.colored_label(error_color, text),
            };
        });

        if !self.viewer.is_visible() {
            return;
        }

        ui.separator();
        ui.label("Camera");
        let mut policy = self.viewer.camera_policy();
        ui.horizontal(|ui| {
            for option in [CameraPolicy::Orbit, CameraPolicy::FreeRoam] {
                ui.selectable_value(&mut policy, option, option.label());
            }
        });
        if policy != self.viewer.camera_policy() {
            self.viewer.set_camera_policy(policy);
        }
        ui.horizontal_wrapped(|ui| {
            for preset in CameraPreset::ALL {
                if ui.button(preset.label()).clicked() {
                    self.viewer.apply_preset(preset);
                }
            }
        });
        if let Some(speed) = self.viewer.speed_display() {
            ui.label(speed);
            ui.small("WASD to move, Q/E down/up, wheel changes speed");
        }

        ui.separator();
        ui.label("Display");
        let mut style = self.viewer.label_style();
        ui.horizontal(|ui| {
            ui.label("Labels:");
            ui.selectable_value(&mut style, LabelStyle::State, "State");
            ui.selectable_value(&mut style, LabelStyle::Action, "Action");
        });
        self.viewer.set_label_style(style);

        let view = self.viewer.view_mut();
        if ui.button(view.wireframe_label(style)).clicked() {
            view.toggle_wireframe();
        }
        if ui.button(view.walls_label(style)).clicked() {
            view.toggle_walls();
        }
        if ui.button(view.floor_label(style)).clicked() {
            view.toggle_floor();
        }
        if ui.button(view.axes_label(style)).clicked() {
            view.toggle_axes();
        }

        let mut intensity = view.light_intensity;
        if ui
            .add(egui::Slider::new(&mut intensity, MIN_LIGHT_INTENSITY..=MAX_LIGHT_INTENSITY).text("Light"))
            .changed()
        {
            view.set_light_intensity(intensity);
        }
        ui.horizontal(|ui| {
            ui.label("Wall color");
            egui::color_picker::color_edit_button_rgb(ui, &mut view.wall_color);
        });

        ui.horizontal(|ui| {
            ui.label("Wall height");
            let mut height = view.wall_height;
            if ui
                .add(egui::Slider::new(&mut height, WALL_HEIGHT_RANGE).show_value(false))
                .changed()
            {
                view.set_wall_height(height);
            }
            ui.label(view.height_value_label());
        });
        ui.horizontal(|ui| {
            ui.label("Thickness");
            let mut thickness = view.wall_thickness;
            if ui
                .add(egui::Slider::new(&mut thickness, WALL_THICKNESS_RANGE).show_value(false))
                .changed()
            {
                view.set_wall_thickness(thickness);
            }
            ui.label(view.thickness_value_label());
        });

        ui.separator();
        ui.collapsing("Performance", |ui| {
            ui.label(format!("{:.0} fps", self.frame_stats.fps()));
            if self.frame_stats.is_reduced() {
                ui.small("Edges thinned to keep the frame rate up");
            }
            let points = egui_plot::PlotPoints::from(self.frame_stats.history());
            egui_plot::Plot::new("fps_history")
                .height(80.0)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show_axes([false, true])
                .include_y(0.0)
                .show(ui, |plot_ui| plot_ui.line(egui_plot::Line::new(points)));
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.take_picked_file();
        self.viewer.poll_upload();
        if self.viewer.is_visible() {
            self.frame_stats.record(ctx.input(|i| i.stable_dt));
        }

        egui::SidePanel::left("side_panel")
            .resizable(false)
            .min_width(200.0)
            .show(ctx, |ui| self.controls(ui));

        let gl = frame.gl().cloned();
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.viewer.is_visible() {
                ui.centered_and_justified(|ui| {
                    ui.label("Upload a blueprint to see its walls in 3D.");
                });
                return;
            }

            let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
            let input = camera_input(ui, &response);
            self.viewer.handle_camera_input(&input);

            let Some(session) = self.viewer.session() else {
                return;
            };
            let aspect = rect.width() / rect.height().max(1.0);
            let view_proj = session.view_projection(aspect);
            let scene = self
                .viewer
                .view()
                .scene_uniforms(session.geometry().floor_y(), self.frame_stats.is_reduced());

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let ndc = screen_to_ndc(
                        Vec2::new(pos.x, pos.y),
                        Vec2::new(rect.min.x, rect.min.y),
                        Vec2::new(rect.width(), rect.height()),
                    );
                    if let Some(ray) = Ray::from_ndc(ndc, view_proj) {
                        session.pick(&ray, scene.wall_model);
                    }
                }
            }

            let Some(gl) = gl else {
                return;
            };
            unsafe { self.sync_gpu(&gl) };

            if let Some(gpu) = &self.gpu {
                let gpu = Arc::clone(gpu);
                let uniforms = FrameUniforms { view_proj, scene };
                let callback = egui_glow::CallbackFn::new(move |info, painter| {
                    let viewport = info.viewport_in_pixels();
                    let size = Vec2::new(viewport.width_px as f32, viewport.height_px as f32);
                    unsafe { gpu.paint(painter.gl(), &uniforms, size, info.pixels_per_point) };
                });
                ui.painter().add(egui::PaintCallback {
                    rect,
                    callback: Arc::new(callback),
                });
            }
        });

        // Keep frames coming while there is a scene to measure or an upload to poll.
        if self.viewer.is_visible() || self.viewer.is_uploading() {
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        let Some(gl) = gl else {
            return;
        };
        for scene in self.retired.drain(..).chain(self.gpu.take()) {
            unsafe { scene.destroy(gl) };
        }
    }
}

/// Maps egui pointer and key state onto the camera's input frame.
fn camera_input(ui: &egui::Ui, response: &egui::Response) -> CameraInput {
    let mut input = CameraInput::default();
    let drag = response.drag_delta();
    if response.dragged_by(egui::PointerButton::Primary) {
        input.rotate = Vec2::new(drag.x, drag.y);
    } else if response.dragged_by(egui::PointerButton::Secondary) {
        input.pan = Vec2::new(drag.x, drag.y);
    }
    if response.hovered() {
        input.scroll = ui.input(|i| i.raw_scroll_delta.y);
    }

    let keys_free = !ui.ctx().wants_keyboard_input();
    ui.input(|i| {
        input.dt = i.stable_dt;
        if keys_free {
            input.forward = i.key_down(egui::Key::W);
            input.backward = i.key_down(egui::Key::S);
            input.left = i.key_down(egui::Key::A);
            input.right = i.key_down(egui::Key::D);
            input.down = i.key_down(egui::Key::Q);
            input.up = i.key_down(egui::Key::E);
        }
    });
    input
}

fn spawn_file_picker(
    target: Arc<Mutex<Option<PickedFile>>>,
    ctx: egui::Context,
    filter_name: &'static str,
    exts: Vec<String>,
    wrap: fn(String, Vec<u8>) -> PickedFile,
) {
    execute(async move {
        if let Some(handle) = AsyncFileDialog::new()
            .add_filter(filter_name, &exts)
            .pick_file()
            .await
        {
            let name = handle.file_name();
            let bytes = handle.read().await;
            match target.lock() {
                Ok(mut slot) => *slot = Some(wrap(name, bytes)),
                Err(_) => log::error!("File slot poisoned; dropping {name}"),
            }
            ctx.request_repaint();
        }
    });
}

// ── Web entry‑point ──
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Redirect `log` macros & panic messages to the browser console
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();
    console_error_panic_hook::set_once();

    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CANVAS_ID))
        .ok_or_else(|| JsValue::from_str("missing #renderCanvas element"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;

    let web_options = eframe::WebOptions {
        depth_buffer: 24,
        ..Default::default()
    };

    eframe::WebRunner::new()
        .start(
            canvas,
            web_options,
            Box::new(|cc| Ok(Box::new(ViewerApp::new(cc, ViewerConfig::default())))),
        )
        .await?;

    Ok(())
}

// Executes an async future without blocking the egui thread
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}
#[cfg(target_arch = "wasm32")]
pub(crate) fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
