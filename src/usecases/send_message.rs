//! Use case for submitting a message to a thread.
//!
//! Validation happens synchronously so the caller can materialize the message
//! locally before the submission is in flight.

use chrono::{DateTime, Utc};

use crate::domain::{
    error::InboxError,
    ids::{StudentId, ThreadId},
    records::{MessageRecord, NewMessage},
};

use super::contracts::{ApiError, InboxApi};

/// Command to send a message to a specific thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub thread_id: ThreadId,
    pub sender_id: StudentId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Domain-level errors for the send operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    EmptyMessage,
    /// User is not allowed to post in this thread.
    Unauthorized,
    /// Target thread no longer exists.
    ThreadNotFound,
    /// Server rejected the payload.
    Rejected,
    /// Service is temporarily unavailable.
    TemporarilyUnavailable,
}

impl From<SendMessageError> for InboxError {
    fn from(error: SendMessageError) -> Self {
        let reason = match error {
            SendMessageError::EmptyMessage => "message is empty",
            SendMessageError::Unauthorized => "not allowed to post here",
            SendMessageError::ThreadNotFound => "conversation no longer exists",
            SendMessageError::Rejected => "server rejected the message",
            SendMessageError::TemporarilyUnavailable => "service unavailable, try again",
        };
        InboxError::write("send message", reason)
    }
}

/// Validates the command and builds the submission payload.
///
/// # Errors
/// Returns `SendMessageError::EmptyMessage` if text is empty/whitespace.
pub fn prepare_message(command: SendMessageCommand) -> Result<NewMessage, SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    Ok(NewMessage {
        thread_id: command.thread_id,
        sender_id: command.sender_id,
        content: text.to_owned(),
        created_at: command.sent_at,
    })
}

/// Submits a prepared message to the server of record.
///
/// # Errors
/// Maps source errors to domain errors.
pub async fn submit_message<A: InboxApi>(
    api: &A,
    message: &NewMessage,
) -> Result<MessageRecord, SendMessageError> {
    api.create_message(message).await.map_err(map_source_error)
}

fn map_source_error(error: ApiError) -> SendMessageError {
    match error {
        ApiError::Unauthorized => SendMessageError::Unauthorized,
        ApiError::NotFound => SendMessageError::ThreadNotFound,
        ApiError::InvalidData(_) => SendMessageError::Rejected,
        ApiError::Status(code) if (400..500).contains(&code) => SendMessageError::Rejected,
        ApiError::Status(_) | ApiError::Unavailable(_) => SendMessageError::TemporarilyUnavailable,
    }
}
