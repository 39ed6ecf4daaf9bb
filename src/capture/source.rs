//! Host display-capture capability
//!
//! The host environment (compositor, browser shell, test harness) hands out
//! live display frames through these traits; the pipeline never talks to a
//! platform API directly.

use async_trait::async_trait;
use std::fmt;

/// Errors surfaced by the host capture capability.
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// The user denied the capture permission prompt.
    PermissionDenied(String),
    /// No display source exists or the environment cannot capture.
    NotAvailable(String),
    /// The stream produced no usable frame.
    FrameFailed(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "capture permission denied: {}", msg),
            CaptureError::NotAvailable(msg) => write!(f, "display capture unavailable: {}", msg),
            CaptureError::FrameFailed(msg) => write!(f, "frame capture failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Dimensions reported by the live stream once frame metadata is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
}

/// A still frame grabbed from the live stream.
pub struct StillFrame {
    pub image: image::RgbaImage,
}

impl StillFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A live display stream handed out by [`DisplayCapture`].
///
/// `release` must be idempotent. The pipeline calls it exactly once, right
/// after the still grab, on every path; no live stream survives past that
/// point.
#[async_trait]
pub trait LiveFrameStream: Send {
    /// Wait until frame metadata (dimensions) is available.
    async fn wait_for_metadata(&mut self) -> Result<FrameMetadata, CaptureError>;

    /// Grab the current frame as a still image.
    async fn grab_frame(&mut self) -> Result<StillFrame, CaptureError>;

    /// Stop all tracks and free the underlying capture resources.
    fn release(&mut self);
}

/// Host capability for requesting a live display stream.
#[async_trait]
pub trait DisplayCapture: Send + Sync {
    async fn request_stream(&self) -> Result<Box<dyn LiveFrameStream>, CaptureError>;
}
