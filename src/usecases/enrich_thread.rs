use futures::future::join_all;

use crate::domain::{
    ids::StudentId,
    records::MembershipRecord,
    thread::Thread,
};

use super::{
    contracts::{ApiError, DirectoryLookup, InboxApi, MessagesQuery},
    directory::Directory,
};

/// Builds the conversation-list entry for one membership.
///
/// Never fails: when the participant or latest-message fetch fails the thread
/// degrades to a minimal entry instead of breaking the whole list.
pub async fn enrich_thread<A, L>(
    api: &A,
    directory: &Directory<L>,
    current_user: StudentId,
    membership: &MembershipRecord,
) -> Thread
where
    A: InboxApi,
    L: DirectoryLookup,
{
    match try_enrich(api, directory, current_user, membership).await {
        Ok(thread) => thread,
        Err(error) => {
            tracing::warn!(
                thread_id = %membership.thread_id,
                error = %error,
                "thread enrichment failed; using fallback entry"
            );
            Thread::fallback(membership.thread_id.clone(), membership.created_at)
        }
    }
}

async fn try_enrich<A, L>(
    api: &A,
    directory: &Directory<L>,
    current_user: StudentId,
    membership: &MembershipRecord,
) -> Result<Thread, ApiError>
where
    A: InboxApi,
    L: DirectoryLookup,
{
    let thread_id = &membership.thread_id;
    let (participants, latest) = futures::join!(
        api.list_participants(thread_id),
        api.list_messages(thread_id, MessagesQuery::latest())
    );
    let participants = participants?;
    let latest = latest?;

    let mut others: Vec<StudentId> = Vec::new();
    for participant in participants {
        if participant.student_id != current_user && !others.contains(&participant.student_id) {
            others.push(participant.student_id);
        }
    }

    let names: Vec<String> = join_all(others.iter().map(|id| directory.resolve_name(*id)))
        .await
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    Ok(Thread::enriched(
        thread_id.clone(),
        membership.created_at,
        &names,
        latest.iter().max_by_key(|message| message.created_at),
    ))
}
