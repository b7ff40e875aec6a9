use std::future::Future;

use anyhow::Result;
use thiserror::Error;

use crate::domain::{
    events::InboxEvent,
    ids::{LocalId, OpenTicket, StudentId, ThreadId},
    records::{
        MembershipRecord, MessageRecord, NewMessage, ParticipantRecord, StudentProfile,
        ThreadRecord,
    },
};

/// Errors reported by the server-of-record collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Ordering and size of a message listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
    pub newest_first: bool,
}

impl MessagesQuery {
    /// The single most recent message.
    pub fn latest() -> Self {
        Self {
            limit: Some(1),
            newest_first: true,
        }
    }

    /// The `limit` most recent messages, newest first.
    pub fn history(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            newest_first: true,
        }
    }
}

/// Thread, participant and message tables of the server of record.
pub trait InboxApi: Send + Sync + 'static {
    fn list_memberships(
        &self,
        student_id: StudentId,
    ) -> impl Future<Output = Result<Vec<MembershipRecord>, ApiError>> + Send;

    fn list_participants(
        &self,
        thread_id: &ThreadId,
    ) -> impl Future<Output = Result<Vec<ParticipantRecord>, ApiError>> + Send;

    fn list_messages(
        &self,
        thread_id: &ThreadId,
        query: MessagesQuery,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, ApiError>> + Send;

    fn create_message(
        &self,
        message: &NewMessage,
    ) -> impl Future<Output = Result<MessageRecord, ApiError>> + Send;

    fn create_thread(&self) -> impl Future<Output = Result<ThreadRecord, ApiError>> + Send;

    fn add_participant(
        &self,
        thread_id: &ThreadId,
        student_id: StudentId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn remove_participant(
        &self,
        thread_id: &ThreadId,
        student_id: StudentId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn delete_thread(&self, thread_id: &ThreadId)
        -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Student-record lookup used to resolve display names.
pub trait DirectoryLookup: Send + Sync + 'static {
    fn lookup_student(
        &self,
        student_id: StudentId,
    ) -> impl Future<Output = Result<StudentProfile, ApiError>> + Send;
}

/// Network work requested by the inbox. The outcome comes back as an [`InboxEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    LoadThreads,
    EnrichThread(MembershipRecord),
    OpenThread {
        ticket: OpenTicket,
        thread_id: ThreadId,
    },
    SendMessage {
        local_id: LocalId,
        message: NewMessage,
    },
    CreateThread {
        participant_ids: Vec<StudentId>,
    },
    LeaveThread(ThreadId),
    DeleteThread(ThreadId),
}

impl BackendRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadThreads => "load_threads",
            Self::EnrichThread(_) => "enrich_thread",
            Self::OpenThread { .. } => "open_thread",
            Self::SendMessage { .. } => "send_message",
            Self::CreateThread { .. } => "create_thread",
            Self::LeaveThread(_) => "leave_thread",
            Self::DeleteThread(_) => "delete_thread",
        }
    }
}

/// Starts backend work without blocking the caller.
pub trait Dispatcher {
    fn dispatch(&self, request: BackendRequest);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("change feed is closed")]
    Closed,
    #[error("subscription rejected: {0}")]
    Rejected(String),
}

/// Column-filtered subscriptions to table changes. Dropping the returned
/// subscription ends it.
pub trait ChangeFeed {
    type Subscription;

    /// Memberships rows where `student_id` is the given user.
    fn subscribe_memberships(&self, student_id: StudentId)
        -> Result<Self::Subscription, FeedError>;

    /// Messages rows where `thread_id` is the given thread.
    fn subscribe_messages(&self, thread_id: &ThreadId) -> Result<Self::Subscription, FeedError>;
}

pub trait InboxEventSource {
    fn next_event(&mut self) -> Result<Option<InboxEvent>>;
}
