use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use minimap_editor::{persist, EditorConfig};

mod app;

use app::MapEditorApp;

/// Annotate platforms, portals and spawn points on a game minimap.
#[derive(Parser, Debug)]
#[command(name = "minimap-editor", version)]
struct Cli {
    /// Minimap image (PNG, JPEG, BMP). A file picker opens when omitted.
    image: Option<PathBuf>,

    /// Map document to open with the image.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Editor settings (JSON); missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    minimap_editor::init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let image_path = match cli.image.or_else(|| {
        rfd::FileDialog::new()
            .set_title("Select minimap image")
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp"])
            .pick_file()
    }) {
        Some(path) => path,
        None => {
            tracing::info!("no image selected");
            return Ok(());
        }
    };

    let image = persist::load_image(&image_path)
        .with_context(|| format!("opening image {}", image_path.display()))?;
    let map = match cli.map {
        Some(path) => {
            let loaded = persist::load_file(&path)
                .with_context(|| format!("opening map {}", path.display()))?;
            Some((path, loaded))
        }
        None => None,
    };

    let title = format!(
        "minimap-editor - {}",
        image_path
            .file_name()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title(&title),
        ..Default::default()
    };

    let app = MapEditorApp::new(image_path, image, map, config);
    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|err| anyhow::anyhow!("failed to run editor: {err}"))
}
