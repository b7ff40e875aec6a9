use futures::future::join_all;

use crate::domain::{
    ids::ThreadId,
    message::Participant,
    message_store::OpenedThread,
};

use super::{
    contracts::{ApiError, DirectoryLookup, InboxApi, MessagesQuery},
    directory::Directory,
};

const DEFAULT_HISTORY_LIMIT: usize = 200;
const MAX_HISTORY_LIMIT: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenThreadQuery {
    pub thread_id: ThreadId,
    pub history_limit: usize,
}

impl OpenThreadQuery {
    pub fn new(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    fn normalized_limit(&self) -> usize {
        match self.history_limit {
            0 => DEFAULT_HISTORY_LIMIT,
            value if value > MAX_HISTORY_LIMIT => MAX_HISTORY_LIMIT,
            value => value,
        }
    }
}

/// Fetches the roster (with resolved names) and the message history of a thread.
///
/// Both fetches run concurrently and are joined before the result is
/// returned, so sender names are only computed once the roster is complete.
/// Read failures degrade to an empty roster or history. The history holds
/// the most recent `history_limit` messages, oldest first.
pub async fn open_thread<A, L>(api: &A, directory: &Directory<L>, query: OpenThreadQuery) -> OpenedThread
where
    A: InboxApi,
    L: DirectoryLookup,
{
    let limit = query.normalized_limit();
    let thread_id = query.thread_id;

    let (participants, messages) = futures::join!(
        load_roster(api, directory, &thread_id),
        api.list_messages(&thread_id, MessagesQuery::history(limit))
    );

    let participants = participants.unwrap_or_else(|error| {
        tracing::warn!(
            thread_id = %thread_id,
            error = %error,
            "participant fetch failed; sender names fall back to placeholders"
        );
        Vec::new()
    });

    let mut messages = messages.unwrap_or_else(|error| {
        tracing::warn!(
            thread_id = %thread_id,
            error = %error,
            "message history fetch failed; showing empty thread"
        );
        Vec::new()
    });
    messages.reverse();

    OpenedThread {
        thread_id,
        participants,
        messages,
    }
}

async fn load_roster<A, L>(
    api: &A,
    directory: &Directory<L>,
    thread_id: &ThreadId,
) -> Result<Vec<Participant>, ApiError>
where
    A: InboxApi,
    L: DirectoryLookup,
{
    let records = api.list_participants(thread_id).await?;

    let names = join_all(
        records
            .iter()
            .map(|record| directory.resolve_name(record.student_id)),
    )
    .await;

    Ok(records
        .into_iter()
        .zip(names)
        .map(|(record, display_name)| Participant {
            thread_id: record.thread_id,
            student_id: record.student_id,
            display_name,
        })
        .collect())
}
