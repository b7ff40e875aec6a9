use super::{
    changes::{MembershipChange, MessageChange},
    error::InboxError,
    ids::{LocalId, OpenTicket, StudentId, ThreadId},
    message_store::OpenedThread,
    records::{MessageRecord, ThreadRecord},
    thread::Thread,
};

/// Everything the inbox reacts to, processed one at a time on a single thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxEvent {
    LoadThreads,
    OpenThread(ThreadId),
    CloseThread,
    DraftChanged(String),
    SendDraft,
    CreateThread(Vec<StudentId>),
    LeaveThread(ThreadId),
    DeleteThread(ThreadId),
    QuitRequested,

    ThreadsLoaded(Result<Vec<Thread>, InboxError>),
    ThreadEnriched(Thread),
    ThreadOpened {
        ticket: OpenTicket,
        opened: OpenedThread,
    },
    SendFinished {
        thread_id: ThreadId,
        local_id: LocalId,
        result: Result<MessageRecord, InboxError>,
    },
    ThreadCreated(Result<ThreadRecord, InboxError>),
    ThreadLeft {
        thread_id: ThreadId,
        result: Result<(), InboxError>,
    },
    ThreadDeleted {
        thread_id: ThreadId,
        result: Result<(), InboxError>,
    },

    Membership(MembershipChange),
    /// Message change delivered by the subscription scoped to `scope`.
    ThreadMessage {
        scope: ThreadId,
        change: MessageChange,
    },
}

/// Which pane the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    ThreadList,
    Thread(ThreadId),
}

/// Notification sent to inbox observers after state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxChange {
    ThreadsChanged,
    MessagesChanged,
    ViewChanged(View),
    DraftRestored(String),
    ThreadCreated(ThreadId),
    Error(InboxError),
}
