use std::sync::{mpsc::Sender, Arc};

use tokio::runtime::Handle;

use crate::{
    domain::{
        changes::{MembershipChange, MessageChange},
        events::InboxEvent,
        ids::{StudentId, ThreadId},
        records::MembershipRecord,
    },
    usecases::{
        contracts::{BackendRequest, DirectoryLookup, Dispatcher, InboxApi},
        directory::Directory,
        enrich_thread::enrich_thread,
        load_threads::load_threads,
        manage_threads::{create_thread, delete_thread, leave_thread},
        open_thread::{open_thread, OpenThreadQuery},
        send_message::submit_message,
    },
};

use super::feed::{FeedPublisher, TableChange};

const DISPATCH_EVENT_SEND_FAILED: &str = "BACKEND_DISPATCH_EVENT_SEND_FAILED";

/// Runs backend requests as tasks on a tokio runtime and reports their
/// outcome on the inbox event channel.
pub struct RuntimeDispatcher<A, L> {
    handle: Handle,
    worker: Arc<Worker<A, L>>,
    events: Sender<InboxEvent>,
}

struct Worker<A, L> {
    api: Arc<A>,
    directory: Arc<Directory<L>>,
    current_user: StudentId,
    history_limit: usize,
    echo: Option<FeedPublisher>,
}

impl<A, L> RuntimeDispatcher<A, L>
where
    A: InboxApi,
    L: DirectoryLookup,
{
    pub fn new(
        handle: Handle,
        api: Arc<A>,
        directory: Arc<Directory<L>>,
        current_user: StudentId,
        history_limit: usize,
        events: Sender<InboxEvent>,
    ) -> Self {
        Self {
            handle,
            worker: Arc::new(Worker {
                api,
                directory,
                current_user,
                history_limit,
                echo: None,
            }),
            events,
        }
    }

    /// Publishes successful writes into the change feed hub.
    pub fn with_echo(mut self, publisher: FeedPublisher) -> Self {
        if let Some(worker) = Arc::get_mut(&mut self.worker) {
            worker.echo = Some(publisher);
        }
        self
    }
}

impl<A, L> Dispatcher for RuntimeDispatcher<A, L>
where
    A: InboxApi,
    L: DirectoryLookup,
{
    fn dispatch(&self, request: BackendRequest) {
        let worker = Arc::clone(&self.worker);
        let events = self.events.clone();
        let name = request.name();

        tracing::debug!(request = name, "backend request dispatched");
        self.handle.spawn(async move {
            let event = worker.run(request).await;
            if let Err(error) = events.send(event) {
                tracing::warn!(
                    code = DISPATCH_EVENT_SEND_FAILED,
                    request = name,
                    error = %error,
                    "inbox event channel closed; dropping backend result"
                );
            }
        });
    }
}

impl<A, L> Worker<A, L>
where
    A: InboxApi,
    L: DirectoryLookup,
{
    async fn run(&self, request: BackendRequest) -> InboxEvent {
        let api = self.api.as_ref();
        let directory = self.directory.as_ref();

        match request {
            BackendRequest::LoadThreads => InboxEvent::ThreadsLoaded(
                load_threads(api, directory, self.current_user)
                    .await
                    .map_err(Into::into),
            ),
            BackendRequest::EnrichThread(membership) => InboxEvent::ThreadEnriched(
                enrich_thread(api, directory, self.current_user, &membership).await,
            ),
            BackendRequest::OpenThread { ticket, thread_id } => {
                let query = OpenThreadQuery::new(thread_id).with_history_limit(self.history_limit);
                InboxEvent::ThreadOpened {
                    ticket,
                    opened: open_thread(api, directory, query).await,
                }
            }
            BackendRequest::SendMessage { local_id, message } => {
                let result = submit_message(api, &message).await;
                if let Ok(record) = &result {
                    self.publish(TableChange::Message(MessageChange::Inserted(record.clone())));
                }
                InboxEvent::SendFinished {
                    thread_id: message.thread_id,
                    local_id,
                    result: result.map_err(Into::into),
                }
            }
            BackendRequest::CreateThread { participant_ids } => {
                let result = create_thread(api, self.current_user, &participant_ids).await;
                if let Ok(thread) = &result {
                    let mut members = vec![self.current_user];
                    for id in participant_ids {
                        if !members.contains(&id) {
                            members.push(id);
                        }
                    }
                    for student_id in members {
                        self.publish(TableChange::Membership(MembershipChange::Added(
                            MembershipRecord {
                                thread_id: thread.id.clone(),
                                student_id,
                                created_at: thread.created_at,
                            },
                        )));
                    }
                }
                InboxEvent::ThreadCreated(
                    result.map_err(|error| error.into_inbox_error("create conversation")),
                )
            }
            BackendRequest::LeaveThread(thread_id) => {
                let result = leave_thread(api, self.current_user, &thread_id).await;
                if result.is_ok() {
                    self.publish_removal(&thread_id);
                }
                InboxEvent::ThreadLeft {
                    thread_id,
                    result: result.map_err(|error| error.into_inbox_error("leave conversation")),
                }
            }
            BackendRequest::DeleteThread(thread_id) => {
                let result = delete_thread(api, &thread_id).await;
                if result.is_ok() {
                    self.publish_removal(&thread_id);
                }
                InboxEvent::ThreadDeleted {
                    thread_id,
                    result: result.map_err(|error| error.into_inbox_error("delete conversation")),
                }
            }
        }
    }

    fn publish_removal(&self, thread_id: &ThreadId) {
        self.publish(TableChange::Membership(MembershipChange::Removed {
            thread_id: thread_id.clone(),
            student_id: self.current_user,
        }));
    }

    fn publish(&self, change: TableChange) {
        if let Some(echo) = &self.echo {
            echo.publish(change);
        }
    }
}
