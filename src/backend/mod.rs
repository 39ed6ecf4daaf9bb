//! External answer-service boundary
//!
//! Module structure:
//! - types.rs: boundary shapes, ServiceError, the AssistantBackend trait
//! - http.rs: reqwest implementation speaking the assistant server protocol

pub mod http;
pub mod types;

pub use http::{HttpBackend, HttpBackendConfig};
pub use types::{
    AnswerReply, AssistantBackend, FeedbackVerdict, QuestionRequest, RequestContext, ServiceError,
    SourceDoc, UploadOutcome,
};
