//! Capture pipeline - from live display stream to cropped attachment
//!
//! Phases: Idle -> Requesting -> Previewing -> Selecting -> Extracting ->
//! Confirmed | Cancelled. A confirmed run emits exactly one attachment; a
//! cancelled run emits nothing and leaves chat input state untouched.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::source::{CaptureError, DisplayCapture, LiveFrameStream, StillFrame};
use crate::attachment::Attachment;
use crate::geometry::{resolve_source_rect, Point, Rect, ScaleFactor, SelectionState};

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePhase {
    Idle,
    Requesting,
    Previewing,
    Selecting,
    Extracting,
    Confirmed,
    Cancelled,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Requesting => "requesting",
            CapturePhase::Previewing => "previewing",
            CapturePhase::Selecting => "selecting",
            CapturePhase::Extracting => "extracting",
            CapturePhase::Confirmed => "confirmed",
            CapturePhase::Cancelled => "cancelled",
        }
    }
}

/// Capture tuning knobs.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Delay between frame metadata arriving and the still grab.
    ///
    /// Heuristic: gives the stream time to paint a real frame. A platform
    /// with an explicit frame-ready signal should wait on that signal inside
    /// its [`LiveFrameStream`] and set this to zero.
    pub settle_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// The screen-capture-and-crop state machine.
pub struct CapturePipeline {
    phase: CapturePhase,
    config: CaptureConfig,
    still: Option<StillFrame>,
    display_size: Option<(f64, f64)>,
    selection: SelectionState,
}

impl CapturePipeline {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            phase: CapturePhase::Idle,
            config,
            still: None,
            display_size: None,
            selection: SelectionState::new(),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Dimensions of the captured still, once one exists.
    pub fn still_size(&self) -> Option<(u32, u32)> {
        self.still.as_ref().map(|f| (f.width(), f.height()))
    }

    /// The current crop rectangle, if any.
    pub fn selection(&self) -> Option<Rect> {
        self.selection.current()
    }

    /// Request a live display stream and grab a still from it.
    ///
    /// Any failure (permission denied, no source, no frame) moves the
    /// pipeline to `Cancelled` and returns the error for the caller to
    /// surface as a transient notice; nothing is retried automatically.
    pub async fn begin(&mut self, source: &dyn DisplayCapture) -> Result<(), CaptureError> {
        self.phase = CapturePhase::Requesting;

        let mut stream = match source.request_stream().await {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("display capture request failed: {}", e);
                self.phase = CapturePhase::Cancelled;
                return Err(e);
            }
        };

        // The stream must be released exactly once no matter how the grab
        // goes, so run the whole grab before inspecting its result.
        let grabbed = self.grab_still(stream.as_mut()).await;
        stream.release();

        match grabbed {
            Ok(frame) => {
                log::info!("captured still frame {}x{}", frame.width(), frame.height());
                self.still = Some(frame);
                self.phase = CapturePhase::Previewing;
                Ok(())
            }
            Err(e) => {
                log::warn!("still grab failed: {}", e);
                self.phase = CapturePhase::Cancelled;
                Err(e)
            }
        }
    }

    async fn grab_still(
        &self,
        stream: &mut dyn LiveFrameStream,
    ) -> Result<StillFrame, CaptureError> {
        let metadata = stream.wait_for_metadata().await?;
        log::debug!(
            "capture stream reported {}x{}",
            metadata.width,
            metadata.height
        );
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        stream.grab_frame().await
    }

    /// Attach the selection overlay, recording the rendered size of the
    /// preview so display coordinates can be mapped back to source pixels.
    pub fn start_selection(&mut self, display_width: f64, display_height: f64) {
        if self.phase != CapturePhase::Previewing {
            log::warn!("selection requested in phase {}", self.phase.as_str());
            return;
        }
        self.display_size = Some((display_width, display_height));
        self.phase = CapturePhase::Selecting;
    }

    pub fn begin_drag(&mut self, origin: Point) -> Option<Rect> {
        if self.phase != CapturePhase::Selecting {
            return None;
        }
        Some(self.selection.begin_drag(origin))
    }

    pub fn drag_to(&mut self, point: Point) -> Option<Rect> {
        if self.phase != CapturePhase::Selecting {
            return None;
        }
        self.selection.drag_to(point)
    }

    pub fn end_drag(&mut self) -> Option<Rect> {
        if self.phase != CapturePhase::Selecting {
            return None;
        }
        self.selection.end_drag()
    }

    /// Clear the current rectangle without leaving the selection screen.
    pub fn reset_selection(&mut self) {
        if self.phase == CapturePhase::Selecting {
            self.selection.clear();
        }
    }

    /// Discard the still and any in-progress selection. Emits nothing.
    pub fn cancel(&mut self) {
        self.still = None;
        self.display_size = None;
        self.selection.clear();
        self.phase = CapturePhase::Cancelled;
    }

    /// Return the pipeline to `Idle` so it can run another capture.
    pub fn reset(&mut self) {
        self.still = None;
        self.display_size = None;
        self.selection.clear();
        self.phase = CapturePhase::Idle;
    }

    /// Extract the selected region and emit the attachment.
    ///
    /// A null (zero-area or absent) selection yields the whole still,
    /// unmodified.
    pub fn confirm(&mut self) -> Result<Attachment, CaptureError> {
        if self.phase != CapturePhase::Selecting {
            return Err(CaptureError::FrameFailed(format!(
                "nothing to confirm in phase {}",
                self.phase.as_str()
            )));
        }
        self.phase = CapturePhase::Extracting;

        let Some(frame) = self.still.take() else {
            self.phase = CapturePhase::Cancelled;
            return Err(CaptureError::FrameFailed(
                "still frame missing".to_string(),
            ));
        };

        let region = self
            .selection
            .current()
            .filter(|rect| !rect.is_null())
            .and_then(|rect| {
                let (dw, dh) = self.display_size?;
                let scale = ScaleFactor::from_dimensions(frame.width(), frame.height(), dw, dh)?;
                Some(resolve_source_rect(rect, scale, frame.width(), frame.height()))
            })
            .filter(|src| src.width > 0 && src.height > 0);

        let encoded = match region {
            None => Attachment::from_rgba(&frame.image),
            Some(src) => {
                log::info!(
                    "extracting {}x{} region at ({}, {})",
                    src.width,
                    src.height,
                    src.x,
                    src.y
                );
                let cropped =
                    image::imageops::crop_imm(&frame.image, src.x, src.y, src.width, src.height)
                        .to_image();
                Attachment::from_rgba(&cropped)
            }
        };

        match encoded {
            Ok(attachment) => {
                self.selection.clear();
                self.display_size = None;
                self.phase = CapturePhase::Confirmed;
                Ok(attachment)
            }
            Err(e) => {
                self.phase = CapturePhase::Cancelled;
                Err(CaptureError::FrameFailed(format!(
                    "re-encode failed: {}",
                    e
                )))
            }
        }
    }
}
