//! Core of the minimap editor: the map document, viewport transform,
//! hit-testing, jump reachability, platform auto-detection and persistence.
//! The egui front end in `main.rs` is a thin host over [`session::Session`].

pub mod config;
pub mod detect;
pub mod error;
pub mod hit;
pub mod jump;
pub mod model;
pub mod persist;
pub mod render;
pub mod session;
pub mod view;

pub use config::EditorConfig;
pub use detect::{detect, DetectionConfig, Region};
pub use error::{MapError, ValidationWarning};
pub use model::{Bounds, Entity, EntityKind, EntityRef, MapDocument, Platform, Portal, Spawn};
pub use session::{Mode, Session};
pub use view::ViewTransform;

/// Installs the `tracing` subscriber shared by the binaries. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
