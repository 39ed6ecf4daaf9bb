//! Chat types - the message model, events and receipts

use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::backend::{AnswerReply, FeedbackVerdict, SourceDoc};

/// Role of a message in the session log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "assistant" => ChatRole::Assistant,
            _ => ChatRole::User,
        }
    }
}

/// Resolution status of a message.
///
/// `Pending` marks an optimistic placeholder whose content will be replaced
/// in place, matched by id, once its request resolves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Complete,
    Error,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Complete => "complete",
            MessageStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pending" => MessageStatus::Pending,
            "error" => MessageStatus::Error,
            _ => MessageStatus::Complete,
        }
    }
}

/// A message in the session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// `question_id` assigned by the answer service; required for feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackVerdict>,
    pub status: MessageStatus,
    pub created_at: String,
}

impl ChatMessage {
    /// Create a user message carrying the submitted text and attachment.
    pub fn user(content: &str, attachment: Option<Attachment>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::User,
            content: content.to_string(),
            attachment,
            correlation_id: None,
            sources: Vec::new(),
            feedback: None,
            status: MessageStatus::Complete,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a resolved assistant message from an answer.
    pub fn assistant_reply(reply: &AnswerReply) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: reply.answer.clone(),
            attachment: None,
            correlation_id: Some(reply.correlation_id.clone()),
            sources: reply.sources.clone(),
            feedback: None,
            status: MessageStatus::Complete,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an assistant placeholder awaiting in-place resolution.
    pub fn assistant_pending(content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: content.to_string(),
            attachment: None,
            correlation_id: None,
            sources: Vec::new(),
            feedback: None,
            status: MessageStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an assistant message carrying a formatted error notice.
    pub fn assistant_error(detail: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: format!("**Error**: {}. Please try again later.", detail),
            attachment: None,
            correlation_id: None,
            sources: Vec::new(),
            feedback: None,
            status: MessageStatus::Error,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create the configured session greeting.
    ///
    /// Carries no correlation id, so it can never receive feedback.
    pub fn assistant_greeting(content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: content.to_string(),
            attachment: None,
            correlation_id: None,
            sources: Vec::new(),
            feedback: None,
            status: MessageStatus::Complete,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Returned by a successful submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub user_message_id: String,
    pub request_id: String,
}

/// Events pushed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageAppended { message: ChatMessage },
    MessageUpdated { message: ChatMessage },
    LoadingChanged { loading: bool },
    /// Transient, non-fatal notice (capture denials and the like); never
    /// part of the log.
    Notice { text: String },
}
