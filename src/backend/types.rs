//! Answer-service boundary types
//!
//! Transport-agnostic request/response shapes plus the trait every backend
//! implementation satisfies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attachment::Attachment;

/// Per-request context threaded into every outbound call.
///
/// Its lifecycle belongs to the authentication collaborator; the engine only
/// holds a shared reference and never refreshes or stores tokens itself.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Bearer token attached to outbound calls, when present.
    pub token: Option<String>,
}

impl RequestContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// A source document cited by an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDoc {
    pub filename: String,
    /// Present only for indexed documents that can be fetched later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// An outbound question.
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub question: String,
    pub attachment: Option<Attachment>,
}

/// A resolved answer from the service.
#[derive(Debug, Clone)]
pub struct AnswerReply {
    pub answer: String,
    /// Opaque id assigned by the service; required to submit feedback.
    pub correlation_id: String,
    pub sources: Vec<SourceDoc>,
}

/// User verdict on an assistant answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackVerdict {
    Solved,
    Unsolved,
}

impl FeedbackVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackVerdict::Solved => "solved",
            FeedbackVerdict::Unsolved => "unsolved",
        }
    }
}

/// Outcome of a document upload, validated at the boundary.
///
/// A closed set: each case carries exactly the fields it needs, so the
/// session engine never branches on ad hoc result fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Indexed immediately.
    Accepted { filename: String },
    /// Stored but awaiting administrator approval; renders distinctly from
    /// `Accepted`.
    AwaitingApproval { filename: String },
    /// Refused by the service.
    Rejected { filename: String, detail: String },
}

/// Errors surfaced by backend calls.
#[derive(Debug, Clone)]
pub enum ServiceError {
    /// The service could not be reached at all.
    Unreachable(String),
    /// The service answered with a failure status.
    Rejected(String),
    /// The reply did not match the expected shape.
    MalformedReply(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unreachable(msg) => write!(f, "service unreachable: {}", msg),
            ServiceError::Rejected(msg) => write!(f, "{}", msg),
            ServiceError::MalformedReply(msg) => write!(f, "unexpected reply: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

/// The boundary every answer service implementation satisfies.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Ask a question, optionally with an image attachment.
    async fn submit_question(
        &self,
        ctx: &RequestContext,
        request: QuestionRequest,
    ) -> Result<AnswerReply, ServiceError>;

    /// Upload a document to the knowledge base.
    async fn upload_document(
        &self,
        ctx: &RequestContext,
        filename: &str,
        data: bytes::Bytes,
    ) -> Result<UploadOutcome, ServiceError>;

    /// Report whether an answer solved the user's problem. Best-effort:
    /// callers treat failures as advisory.
    async fn submit_feedback(
        &self,
        ctx: &RequestContext,
        correlation_id: &str,
        verdict: FeedbackVerdict,
    ) -> Result<(), ServiceError>;
}
