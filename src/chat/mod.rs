//! Chat session engine - AI question/answer conversations
//!
//! This module provides:
//! - An append-only session log with identity-keyed updates
//! - Optimistic user messages with background answer resolution
//! - Single-flight submission and placeholder document uploads
//! - Best-effort answer feedback
//!
//! Module structure:
//! - types.rs: ChatMessage, roles/statuses, SessionEvent, SubmitReceipt
//! - pending.rs: registry of outstanding boundary calls
//! - engine.rs: SessionEngine with submit / attach_document / record_feedback

pub mod engine;
pub mod pending;
pub mod types;

pub use engine::{SessionConfig, SessionEngine};
pub use pending::{PendingRegistry, PendingRequest, RequestKind};
pub use types::{ChatMessage, ChatRole, MessageStatus, SessionEvent, SubmitReceipt};
