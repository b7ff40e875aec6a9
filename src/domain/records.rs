//! Row shapes exchanged with the server of record and the change feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{StudentId, ThreadId};

/// One thread membership of a student, with the thread's creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub thread_id: ThreadId,
    pub student_id: StudentId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub thread_id: ThreadId,
    pub student_id: StudentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub thread_id: ThreadId,
    pub sender_id: StudentId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: ThreadId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub name: String,
}

/// Payload of a message submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub thread_id: ThreadId,
    pub sender_id: StudentId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
