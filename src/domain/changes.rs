use super::{
    ids::{StudentId, ThreadId},
    records::{MembershipRecord, MessageRecord},
};

/// Change to the current user's thread memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Added(MembershipRecord),
    Removed {
        thread_id: ThreadId,
        student_id: StudentId,
    },
}

impl MembershipChange {
    pub fn student_id(&self) -> StudentId {
        match self {
            Self::Added(record) => record.student_id,
            Self::Removed { student_id, .. } => *student_id,
        }
    }
}

/// Change to a row of the messages table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageChange {
    Inserted(MessageRecord),
    Updated(MessageRecord),
    Deleted { id: String, thread_id: ThreadId },
}

impl MessageChange {
    pub fn thread_id(&self) -> &ThreadId {
        match self {
            Self::Inserted(record) | Self::Updated(record) => &record.thread_id,
            Self::Deleted { thread_id, .. } => thread_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "insert",
            Self::Updated(_) => "update",
            Self::Deleted { .. } => "delete",
        }
    }
}
