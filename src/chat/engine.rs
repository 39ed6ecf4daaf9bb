//! Chat session engine - the message log state machine
//!
//! Single writer over the session log: every mutation is an identity-keyed
//! append or update performed by this engine or a task it spawned. External
//! calls run in the background; the optimistic half of each operation is
//! synchronous so the log order never depends on network timing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use super::pending::{PendingRegistry, PendingRequest, RequestKind};
use super::types::{ChatMessage, ChatRole, MessageStatus, SessionEvent, SubmitReceipt};
use crate::attachment::{check_selection_batch, check_submission, Attachment, ValidationError};
use crate::backend::{
    AssistantBackend, FeedbackVerdict, QuestionRequest, RequestContext, UploadOutcome,
};

/// Tuning knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Greeting seeded into the log at construction, when set.
    pub welcome_message: Option<String>,
    /// Question text sent when the user submits an attachment with no text.
    pub default_image_question: String,
    /// Capacity of the event channel feeding the presentation layer.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            welcome_message: None,
            default_image_question: "Please analyze this image.".to_string(),
            event_capacity: 64,
        }
    }
}

/// The interactive chat session engine.
///
/// Owns the session log and all pending requests. Concurrent boundary calls
/// are permitted; each one touches the log only through identity-keyed
/// append or update.
pub struct SessionEngine {
    log: Arc<RwLock<Vec<ChatMessage>>>,
    loading: Arc<AtomicBool>,
    pending: Arc<PendingRegistry>,
    backend: Arc<dyn AssistantBackend>,
    ctx: Arc<RequestContext>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    config: SessionConfig,
}

impl SessionEngine {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        ctx: Arc<RequestContext>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        let mut log = Vec::new();
        if let Some(greeting) = &config.welcome_message {
            log.push(ChatMessage::assistant_greeting(greeting));
        }
        Self {
            log: Arc::new(RwLock::new(log)),
            loading: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(PendingRegistry::new()),
            backend,
            ctx,
            events,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Read-only snapshot of the session log, in display order.
    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        self.log.read().await.clone()
    }

    /// True while a submission is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Number of outstanding boundary calls.
    pub fn outstanding_requests(&self) -> usize {
        self.pending.len()
    }

    /// Surface a transient, non-fatal notice to the presentation layer.
    ///
    /// Notices never enter the session log.
    pub fn post_notice(&self, text: &str) {
        self.emit(SessionEvent::Notice {
            text: text.to_string(),
        });
    }

    /// Tear down the session, dropping outstanding boundary calls.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Submit a question, optionally with an attachment.
    ///
    /// Takes ownership of the compose text and the attachment slot. Returns
    /// `None` when the submission is a no-op: nothing to send, or another
    /// submission already in flight (single-flight). The user message is
    /// appended synchronously; the assistant reply or error message is
    /// appended by the background task when the answer resolves, so the user
    /// message always precedes it.
    pub async fn submit(
        &self,
        text: String,
        attachment: Option<Attachment>,
    ) -> Option<SubmitReceipt> {
        if check_submission(&text, attachment.as_ref()).is_err() {
            log::debug!("ignoring empty submission");
            return None;
        }
        let trimmed = text.trim().to_string();

        // Single-flight: claim the loading flag or bail out.
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("submission ignored: another one is in flight");
            return None;
        }
        self.emit(SessionEvent::LoadingChanged { loading: true });

        let question = if trimmed.is_empty() {
            self.config.default_image_question.clone()
        } else {
            trimmed.clone()
        };

        let user_message = ChatMessage::user(&trimmed, attachment.clone());
        let user_message_id = user_message.id.clone();
        self.append(user_message).await;

        let request_id = uuid::Uuid::new_v4().to_string();
        self.pending.register(PendingRequest {
            request_id: request_id.clone(),
            target_message_id: user_message_id.clone(),
            kind: RequestKind::Answer,
        });

        let backend = self.backend.clone();
        let ctx = self.ctx.clone();
        let log = self.log.clone();
        let loading = self.loading.clone();
        let pending = self.pending.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let target_id = user_message_id.clone();

        tokio::spawn(async move {
            let request = QuestionRequest {
                question,
                attachment,
            };
            let outcome = tokio::select! {
                result = backend.submit_question(&ctx, request) => Some(result),
                _ = cancel.cancelled() => None,
            };

            match outcome {
                Some(Ok(reply)) => {
                    log::info!(
                        "answer {} arrived with {} source(s)",
                        reply.correlation_id,
                        reply.sources.len()
                    );
                    append_message(&log, &events, ChatMessage::assistant_reply(&reply)).await;
                }
                Some(Err(e)) => {
                    // Failures stay visible in the conversation instead of
                    // being silently dropped.
                    log::warn!("question request failed: {}", e);
                    append_message(&log, &events, ChatMessage::assistant_error(&e.to_string()))
                        .await;
                }
                None => {
                    log::info!("question request dropped at session teardown");
                }
            }

            pending.remove(&target_id);
            loading.store(false, Ordering::SeqCst);
            let _ = events.send(SessionEvent::LoadingChanged { loading: false });
        });

        Some(SubmitReceipt {
            user_message_id,
            request_id,
        })
    }

    /// Upload a document to the knowledge base.
    ///
    /// Independent of `submit`. Appends a placeholder assistant message
    /// immediately and rewrites that same message's content once the upload
    /// resolves, matched by id - the log may have grown in the interim.
    /// Returns the placeholder id.
    pub async fn attach_document(
        &self,
        filename: &str,
        data: bytes::Bytes,
    ) -> Result<String, ValidationError> {
        check_selection_batch(&[(filename.to_string(), data.len() as u64)])?;

        let placeholder = ChatMessage::assistant_pending(&format!(
            "Uploading and parsing document: {}...",
            filename
        ));
        let placeholder_id = placeholder.id.clone();
        self.append(placeholder).await;

        self.pending.register(PendingRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            target_message_id: placeholder_id.clone(),
            kind: RequestKind::Attach,
        });

        let backend = self.backend.clone();
        let ctx = self.ctx.clone();
        let log = self.log.clone();
        let pending = self.pending.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let filename = filename.to_string();
        let target_id = placeholder_id.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = backend.upload_document(&ctx, &filename, data) => Some(result),
                _ = cancel.cancelled() => None,
            };

            if let Some(result) = outcome {
                let (content, status) = match result {
                    Ok(UploadOutcome::Accepted { filename }) => (
                        format!(
                            "Document **{}** uploaded and added to the knowledge base.",
                            filename
                        ),
                        MessageStatus::Complete,
                    ),
                    Ok(UploadOutcome::AwaitingApproval { filename }) => (
                        format!(
                            "Document **{}** uploaded; it takes effect once an administrator approves it.",
                            filename
                        ),
                        MessageStatus::Complete,
                    ),
                    Ok(UploadOutcome::Rejected { filename, detail }) => (
                        format!("Document **{}** was not accepted: {}", filename, detail),
                        MessageStatus::Error,
                    ),
                    Err(e) => {
                        log::warn!("document upload failed: {}", e);
                        (
                            format!("Document upload failed: {}", e),
                            MessageStatus::Error,
                        )
                    }
                };
                update_in_place(&log, &events, &target_id, content, status).await;
            } else {
                log::info!("document upload dropped at session teardown");
            }

            pending.remove(&target_id);
        });

        Ok(placeholder_id)
    }

    /// Record the user's verdict on an assistant answer.
    ///
    /// No-op (returns false) unless the target exists, is an assistant
    /// message and carries a correlation id. The local field updates
    /// immediately and last write wins; the outbound notification is
    /// advisory telemetry and is never rolled back on failure.
    pub async fn record_feedback(&self, message_id: &str, verdict: FeedbackVerdict) -> bool {
        let correlation_id = {
            let mut guard = self.log.write().await;
            let Some(message) = guard.iter_mut().find(|m| m.id == message_id) else {
                log::debug!("feedback for unknown message {}", message_id);
                return false;
            };
            if message.role != ChatRole::Assistant {
                return false;
            }
            let Some(correlation_id) = message.correlation_id.clone() else {
                log::debug!("feedback ignored: message {} has no correlation id", message_id);
                return false;
            };
            message.feedback = Some(verdict);
            let updated = message.clone();
            drop(guard);
            self.emit(SessionEvent::MessageUpdated { message: updated });
            correlation_id
        };

        let backend = self.backend.clone();
        let ctx = self.ctx.clone();
        let cancel = self.cancel.clone();
        let message_id = message_id.to_string();

        tokio::spawn(async move {
            let result = tokio::select! {
                result = backend.submit_feedback(&ctx, &correlation_id, verdict) => Some(result),
                _ = cancel.cancelled() => None,
            };
            if let Some(Err(e)) = result {
                log::warn!("feedback for {} not delivered: {}", message_id, e);
            }
        });

        true
    }

    async fn append(&self, message: ChatMessage) {
        append_message(&self.log, &self.events, message).await;
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; events are advisory.
        let _ = self.events.send(event);
    }
}

async fn append_message(
    log: &RwLock<Vec<ChatMessage>>,
    events: &broadcast::Sender<SessionEvent>,
    message: ChatMessage,
) {
    let mut guard = log.write().await;
    guard.push(message.clone());
    drop(guard);
    let _ = events.send(SessionEvent::MessageAppended { message });
}

/// Replace a message's content and status in place, matched by id.
///
/// Position lookups would break under concurrent appends; identity is the
/// only safe key.
async fn update_in_place(
    log: &RwLock<Vec<ChatMessage>>,
    events: &broadcast::Sender<SessionEvent>,
    message_id: &str,
    content: String,
    status: MessageStatus,
) {
    let mut guard = log.write().await;
    let Some(message) = guard.iter_mut().find(|m| m.id == message_id) else {
        log::error!("no message {} to update", message_id);
        return;
    };
    message.content = content;
    message.status = status;
    let updated = message.clone();
    drop(guard);
    let _ = events.send(SessionEvent::MessageUpdated { message: updated });
}
