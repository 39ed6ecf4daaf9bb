// Ops Agent - interactive assistant client core
//
// This is the headless core of the assistant client:
// - Chat session state machine (optimistic log, single-flight submit,
//   identity-keyed placeholder resolution, advisory feedback)
// - Screen capture pipeline with interactive crop selection
// - Attachment normalization for files, pastes and capture stills
// - Trait seams to the answer service and the host display capability
//
// Rendering, routing, admin panels and authentication storage are external
// collaborators: they consume log snapshots and session events, and inject
// a request context carrying the auth token.

// Core modules
pub mod attachment;
pub mod backend;
pub mod capture;
pub mod chat;
pub mod config;
pub mod geometry;

// Re-export the surface the presentation layer works against
pub use attachment::{
    check_selection_batch, check_submission, Attachment, AttachmentFormat, ValidationError,
    MAX_UPLOAD_BYTES,
};
pub use backend::{
    AnswerReply, AssistantBackend, FeedbackVerdict, HttpBackend, HttpBackendConfig,
    QuestionRequest, RequestContext, ServiceError, SourceDoc, UploadOutcome,
};
pub use capture::{CaptureConfig, CaptureError, CapturePhase, CapturePipeline, DisplayCapture};
pub use chat::{
    ChatMessage, ChatRole, MessageStatus, SessionConfig, SessionEngine, SessionEvent,
    SubmitReceipt,
};
pub use config::{init_logging, ClientConfig};
pub use geometry::{Point, Rect, ScaleFactor, SelectionState};
