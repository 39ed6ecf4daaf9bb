//! Screen capture - live display to cropped attachment
//!
//! Module structure:
//! - source.rs: host capture capability traits and errors
//! - pipeline.rs: the capture-and-crop state machine

pub mod pipeline;
pub mod source;

pub use pipeline::{CaptureConfig, CapturePhase, CapturePipeline};
pub use source::{CaptureError, DisplayCapture, FrameMetadata, LiveFrameStream, StillFrame};
