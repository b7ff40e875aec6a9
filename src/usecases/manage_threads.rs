use crate::domain::{
    error::InboxError,
    ids::{StudentId, ThreadId},
    records::ThreadRecord,
};

use super::contracts::{ApiError, InboxApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManageThreadError {
    Unauthorized,
    ThreadNotFound,
    TemporarilyUnavailable,
    Rejected,
}

impl ManageThreadError {
    pub fn into_inbox_error(self, operation: &'static str) -> InboxError {
        let reason = match self {
            Self::Unauthorized => "not authorized",
            Self::ThreadNotFound => "conversation no longer exists",
            Self::TemporarilyUnavailable => "service unavailable, try again",
            Self::Rejected => "server rejected the request",
        };
        InboxError::write(operation, reason)
    }
}

/// Creates a thread with the current user and every distinct requested participant.
///
/// If adding a participant fails, the half-created thread is deleted (best effort).
pub async fn create_thread<A: InboxApi>(
    api: &A,
    current_user: StudentId,
    participant_ids: &[StudentId],
) -> Result<ThreadRecord, ManageThreadError> {
    let thread = api.create_thread().await.map_err(map_source_error)?;

    let mut members = vec![current_user];
    for id in participant_ids {
        if !members.contains(id) {
            members.push(*id);
        }
    }

    for member in members {
        if let Err(error) = api.add_participant(&thread.id, member).await {
            tracing::warn!(
                thread_id = %thread.id,
                student_id = member,
                error = %error,
                "adding participant failed; removing incomplete thread"
            );
            if let Err(cleanup_error) = api.delete_thread(&thread.id).await {
                tracing::warn!(
                    thread_id = %thread.id,
                    error = %cleanup_error,
                    "incomplete thread could not be removed"
                );
            }
            return Err(map_source_error(error));
        }
    }

    tracing::info!(thread_id = %thread.id, "thread created");
    Ok(thread)
}

/// Removes the current user's membership of a thread.
pub async fn leave_thread<A: InboxApi>(
    api: &A,
    current_user: StudentId,
    thread_id: &ThreadId,
) -> Result<(), ManageThreadError> {
    api.remove_participant(thread_id, current_user)
        .await
        .map_err(map_source_error)
}

pub async fn delete_thread<A: InboxApi>(
    api: &A,
    thread_id: &ThreadId,
) -> Result<(), ManageThreadError> {
    api.delete_thread(thread_id).await.map_err(map_source_error)
}

fn map_source_error(error: ApiError) -> ManageThreadError {
    match error {
        ApiError::Unauthorized => ManageThreadError::Unauthorized,
        ApiError::NotFound => ManageThreadError::ThreadNotFound,
        ApiError::InvalidData(_) => ManageThreadError::Rejected,
        ApiError::Status(code) if (400..500).contains(&code) => ManageThreadError::Rejected,
        ApiError::Status(_) | ApiError::Unavailable(_) => {
            ManageThreadError::TemporarilyUnavailable
        }
    }
}
