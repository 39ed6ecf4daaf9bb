//! Pending-request registry - tracks outstanding boundary calls
//!
//! Transient records only; a pending request exists exactly while its
//! external call is in flight, keyed by the message it will resolve.

use dashmap::DashMap;

/// What an in-flight request will do when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Answer,
    Attach,
}

/// A transient record of one outstanding boundary call.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: String,
    pub target_message_id: String,
    pub kind: RequestKind,
}

/// Registry of outstanding requests, keyed by target message id.
///
/// At most one request may be in flight per target message.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    requests: DashMap<String, PendingRequest>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request. Returns false when the target already has one in
    /// flight.
    pub fn register(&self, request: PendingRequest) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.requests.entry(request.target_message_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(request);
                true
            }
        }
    }

    /// Remove the request targeting `message_id`.
    pub fn remove(&self, message_id: &str) -> Option<PendingRequest> {
        self.requests.remove(message_id).map(|(_, request)| request)
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
