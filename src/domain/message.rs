use chrono::{DateTime, Utc};

use super::{
    display_name::DisplayName,
    ids::{LocalId, MessageId, StudentId, ThreadId},
    records::MessageRecord,
};

/// A member of the open thread with the name the directory resolved for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub thread_id: ThreadId,
    pub student_id: StudentId,
    pub display_name: DisplayName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: StudentId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_own: bool,
    pub sender_name: DisplayName,
}

impl Message {
    pub fn from_record(record: MessageRecord, is_own: bool, sender_name: DisplayName) -> Self {
        Self {
            id: MessageId::Confirmed(record.id),
            sender_id: record.sender_id,
            content: record.content,
            sent_at: record.created_at,
            is_own,
            sender_name,
        }
    }

    /// Local representation of a message the current user just submitted.
    pub fn optimistic(
        local_id: LocalId,
        sender_id: StudentId,
        content: String,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Temporary(local_id),
            sender_id,
            content,
            sent_at,
            is_own: true,
            sender_name: DisplayName::Own,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_temporary()
    }
}
