//! Error types for the scene

use thiserror::Error;

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised while building or presenting the scene.
///
/// None of these stop the frame loop: every variant degrades to a scene with
/// fewer visual elements.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("image list could not be decoded: {0}")]
    ImageList(String),

    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),

    #[error("image load failed: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fullscreen presentation is not available on this host")]
    FullscreenUnavailable,

    #[error("window error: {0}")]
    Window(#[from] minifb::Error),
}
