use std::collections::HashSet;

use futures::future::join_all;

use crate::domain::{
    error::InboxError,
    ids::StudentId,
    thread::{sort_by_activity, Thread},
};

use super::{
    contracts::{ApiError, DirectoryLookup, InboxApi},
    directory::Directory,
    enrich_thread::enrich_thread,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadThreadsError {
    Unauthorized,
    TemporarilyUnavailable,
    DataContractViolation,
}

impl From<LoadThreadsError> for InboxError {
    fn from(error: LoadThreadsError) -> Self {
        let reason = match error {
            LoadThreadsError::Unauthorized => "not authorized",
            LoadThreadsError::TemporarilyUnavailable => "temporarily unavailable, try again",
            LoadThreadsError::DataContractViolation => "server sent malformed data",
        };
        InboxError::read("conversations", reason)
    }
}

/// Fetches the user's memberships and enriches every thread, most recent first.
///
/// Only the membership fetch can fail the load; individual threads degrade.
pub async fn load_threads<A, L>(
    api: &A,
    directory: &Directory<L>,
    current_user: StudentId,
) -> Result<Vec<Thread>, LoadThreadsError>
where
    A: InboxApi,
    L: DirectoryLookup,
{
    let memberships = api
        .list_memberships(current_user)
        .await
        .map_err(map_source_error)?;

    let mut seen = HashSet::new();
    let unique: Vec<_> = memberships
        .into_iter()
        .filter(|membership| seen.insert(membership.thread_id.clone()))
        .collect();

    let mut threads = join_all(
        unique
            .iter()
            .map(|membership| enrich_thread(api, directory, current_user, membership)),
    )
    .await;
    sort_by_activity(&mut threads);

    tracing::debug!(count = threads.len(), "conversation list loaded");
    Ok(threads)
}

fn map_source_error(error: ApiError) -> LoadThreadsError {
    match error {
        ApiError::Unauthorized => LoadThreadsError::Unauthorized,
        ApiError::InvalidData(_) => LoadThreadsError::DataContractViolation,
        ApiError::NotFound | ApiError::Unavailable(_) | ApiError::Status(_) => {
            LoadThreadsError::TemporarilyUnavailable
        }
    }
}
