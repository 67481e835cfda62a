// ── Native entry‑point ──
#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;

    use clap::Parser;

    use blueprint_viewer::camera::CameraPolicy;

    #[derive(Parser, Debug, Clone)]
    #[command(name = "blueprint-viewer")]
    #[command(about = "Upload architectural blueprints and inspect the generated walls in 3D", long_about = None)]
    pub struct Cli {
        /// JSON viewer config; missing keys keep their defaults
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Conversion endpoint, overriding the config
        #[arg(long)]
        pub upload_url: Option<String>,

        /// Camera policy: `orbit` or `free-roam`
        #[arg(long)]
        pub camera: Option<CameraPolicy>,

        /// Open a saved conversion reply on startup
        #[arg(long)]
        pub mesh: Option<PathBuf>,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use anyhow::Context as _;
    use clap::Parser;

    use blueprint_viewer::{
        ViewerApp, config::ViewerConfig, upload::open_saved_response, viewer::Viewer,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = cli::Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(url) = cli.upload_url {
        config.upload_url = url;
    }
    if let Some(policy) = cli.camera {
        config.camera_policy = policy;
    }

    let mut viewer = Viewer::new(config);
    if let Some(path) = &cli.mesh {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        viewer.handle_outcome(open_saved_response(&name, &bytes));
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Blueprint Viewer")
            .with_inner_size([1280.0, 800.0]),
        depth_buffer: 24,
        ..Default::default()
    };
    eframe::run_native(
        "Blueprint Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(ViewerApp::with_viewer(viewer)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe: {e}"))
}

#[cfg(target_arch = "wasm32")]
fn main() {}
