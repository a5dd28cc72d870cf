use std::path::PathBuf;

use crate::detect::Region;

/// Errors surfaced by the map core. Every failing operation leaves the
/// caller's document untouched.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Image bytes could not be decoded into a raster.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// A map document could not be parsed or encoded.
    #[error("invalid map document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested detection region has no pixels inside the image.
    #[error("detection region {0:?} does not overlap the image")]
    EmptyRegion(Region),

    #[error("invalid detection config: {0}")]
    InvalidConfig(String),
}

impl MapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal findings reported next to a successfully loaded document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Platforms without an `id` were given their position as id; the
    /// document should be saved again.
    MissingPlatformIds { repaired: usize },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPlatformIds { repaired } => {
                write!(f, "assigned ids to {repaired} platform(s) without one")
            }
        }
    }
}
