//! Event-driven core behind the conversations screen.
//!
//! All state lives here and is mutated only from [`InboxOrchestrator::handle_event`],
//! one event at a time. Network work is handed to a [`Dispatcher`] and its
//! outcome comes back later as another event, tagged with the context it was
//! started for.

use std::{collections::HashMap, sync::mpsc};

use chrono::{DateTime, Utc};

use crate::domain::{
    changes::{MembershipChange, MessageChange},
    composer::ComposerState,
    error::InboxError,
    events::{InboxChange, InboxEvent, View},
    ids::{LocalId, OpenTicket, StudentId, ThreadId},
    message::Message,
    message_store::{FeedOutcome, MessageStore, OpenedThread},
    records::{MembershipRecord, MessageRecord, ThreadRecord},
    thread::{Activity, Thread},
    thread_registry::ThreadRegistry,
};

use super::{
    contracts::{BackendRequest, ChangeFeed, Dispatcher},
    send_message::{prepare_message, SendMessageCommand, SendMessageError},
};

/// A submission between materialization and its server outcome.
#[derive(Debug, Clone)]
struct PendingSend {
    thread_id: ThreadId,
    draft: String,
    previous_activity: Option<Activity>,
    optimistic_activity: Activity,
}

struct MessageFeedScope<S> {
    thread_id: ThreadId,
    _subscription: S,
}

pub struct InboxOrchestrator<D, F>
where
    D: Dispatcher,
    F: ChangeFeed,
{
    current_user: StudentId,
    registry: ThreadRegistry,
    store: MessageStore,
    composer: ComposerState,
    view: View,
    running: bool,
    dispatcher: D,
    feed: F,
    membership_feed: Option<F::Subscription>,
    message_feed: Option<MessageFeedScope<F::Subscription>>,
    pending_sends: HashMap<LocalId, PendingSend>,
    next_local_id: u64,
    next_open_ticket: u64,
    observers: Vec<mpsc::Sender<InboxChange>>,
    clock: fn() -> DateTime<Utc>,
}

impl<D, F> InboxOrchestrator<D, F>
where
    D: Dispatcher,
    F: ChangeFeed,
{
    pub fn new(current_user: StudentId, dispatcher: D, feed: F) -> Self {
        Self {
            current_user,
            registry: ThreadRegistry::default(),
            store: MessageStore::new(current_user),
            composer: ComposerState::default(),
            view: View::ThreadList,
            running: true,
            dispatcher,
            feed,
            membership_feed: None,
            message_feed: None,
            pending_sends: HashMap::new(),
            next_local_id: 0,
            next_open_ticket: 0,
            observers: Vec::new(),
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn current_user(&self) -> StudentId {
        self.current_user
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn composer(&self) -> &ComposerState {
        &self.composer
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_send_count(&self) -> usize {
        self.pending_sends.len()
    }

    /// Thread the live message subscription is scoped to, if any.
    pub fn message_feed_scope(&self) -> Option<&ThreadId> {
        self.message_feed.as_ref().map(|scope| &scope.thread_id)
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<InboxChange> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Attaches the session-long membership subscription and loads the list.
    pub fn start(&mut self) {
        match self.feed.subscribe_memberships(self.current_user) {
            Ok(subscription) => self.membership_feed = Some(subscription),
            Err(error) => {
                tracing::warn!(error = %error, "membership feed unavailable; list will not update live");
                self.notify(InboxChange::Error(InboxError::read("membership updates", error)));
            }
        }

        self.load_threads();
    }

    pub fn handle_event(&mut self, event: InboxEvent) {
        match event {
            InboxEvent::LoadThreads => self.load_threads(),
            InboxEvent::OpenThread(thread_id) => self.open_thread(thread_id),
            InboxEvent::CloseThread => self.close_thread(),
            InboxEvent::DraftChanged(text) => self.composer.set_text(text),
            InboxEvent::SendDraft => self.send_draft(),
            InboxEvent::CreateThread(participant_ids) => {
                self.dispatcher
                    .dispatch(BackendRequest::CreateThread { participant_ids });
            }
            InboxEvent::LeaveThread(thread_id) => {
                self.dispatcher.dispatch(BackendRequest::LeaveThread(thread_id));
            }
            InboxEvent::DeleteThread(thread_id) => {
                self.dispatcher.dispatch(BackendRequest::DeleteThread(thread_id));
            }
            InboxEvent::QuitRequested => self.running = false,

            InboxEvent::ThreadsLoaded(result) => self.on_threads_loaded(result),
            InboxEvent::ThreadEnriched(thread) => self.on_thread_enriched(thread),
            InboxEvent::ThreadOpened { ticket, opened } => self.on_thread_opened(ticket, opened),
            InboxEvent::SendFinished {
                thread_id,
                local_id,
                result,
            } => self.on_send_finished(thread_id, local_id, result),
            InboxEvent::ThreadCreated(result) => self.on_thread_created(result),
            InboxEvent::ThreadLeft { thread_id, result } => {
                self.on_thread_removed_by_user(thread_id, result, "leave conversation")
            }
            InboxEvent::ThreadDeleted { thread_id, result } => {
                self.on_thread_removed_by_user(thread_id, result, "delete conversation")
            }

            InboxEvent::Membership(change) => self.on_membership_change(change),
            InboxEvent::ThreadMessage { scope, change } => self.on_message_change(scope, change),
        }
    }

    fn load_threads(&mut self) {
        self.registry.set_loading();
        self.dispatcher.dispatch(BackendRequest::LoadThreads);
        self.notify(InboxChange::ThreadsChanged);
    }

    fn on_threads_loaded(&mut self, result: Result<Vec<Thread>, InboxError>) {
        match result {
            Ok(threads) => self.registry.finish_loading(threads),
            Err(error) => {
                tracing::warn!(error = %error, "conversation list load failed");
                self.registry.set_error();
                self.notify(InboxChange::Error(error));
            }
        }
        self.notify(InboxChange::ThreadsChanged);
    }

    fn on_thread_enriched(&mut self, thread: Thread) {
        let thread_id = thread.id.clone();
        if self.registry.insert(thread) {
            tracing::debug!(thread_id = %thread_id, "thread added to conversation list");
            self.notify(InboxChange::ThreadsChanged);
        } else {
            tracing::debug!(thread_id = %thread_id, "duplicate thread insert ignored");
        }
    }

    fn open_thread(&mut self, thread_id: ThreadId) {
        if self.store.is_scoped_to(&thread_id) {
            return;
        }

        self.close_scope();

        self.next_open_ticket += 1;
        let ticket = OpenTicket::new(self.next_open_ticket);
        self.store.begin_open(thread_id.clone(), ticket);

        match self.feed.subscribe_messages(&thread_id) {
            Ok(subscription) => {
                self.message_feed = Some(MessageFeedScope {
                    thread_id: thread_id.clone(),
                    _subscription: subscription,
                });
            }
            Err(error) => {
                tracing::warn!(
                    thread_id = %thread_id,
                    error = %error,
                    "message feed unavailable; thread will not update live"
                );
            }
        }

        self.dispatcher.dispatch(BackendRequest::OpenThread {
            ticket,
            thread_id: thread_id.clone(),
        });

        self.set_view(View::Thread(thread_id));
        self.notify(InboxChange::MessagesChanged);
    }

    fn close_thread(&mut self) {
        if !self.store.is_open() {
            return;
        }

        self.close_scope();
        self.set_view(View::ThreadList);
        self.notify(InboxChange::MessagesChanged);
    }

    /// Tears down the message subscription before the store forgets the thread.
    fn close_scope(&mut self) {
        if let Some(scope) = self.message_feed.take() {
            tracing::debug!(thread_id = %scope.thread_id, "message feed detached");
        }
        self.store.close();
        self.composer.clear();
    }

    fn on_thread_opened(&mut self, ticket: OpenTicket, opened: OpenedThread) {
        match self.store.finish_open(ticket, opened) {
            Ok(patched) => {
                tracing::debug!(patched, "thread opened; placeholder sender names reconciled");
                self.notify(InboxChange::MessagesChanged);
            }
            Err(stale) => {
                tracing::debug!(thread_id = %stale.thread_id, "discarding stale thread load");
            }
        }
    }

    fn send_draft(&mut self) {
        let Some(thread_id) = self.store.thread_id().cloned() else {
            return;
        };

        let draft = self.composer.text().to_owned();
        let sent_at = (self.clock)();
        let message = match prepare_message(SendMessageCommand {
            thread_id: thread_id.clone(),
            sender_id: self.current_user,
            text: draft.clone(),
            sent_at,
        }) {
            Ok(message) => message,
            Err(SendMessageError::EmptyMessage) => return,
            Err(error) => {
                self.notify(InboxChange::Error(error.into()));
                return;
            }
        };

        self.next_local_id += 1;
        let local_id = LocalId::new(self.next_local_id);

        self.composer.clear();
        self.store.append_optimistic(
            &thread_id,
            Message::optimistic(local_id, self.current_user, message.content.clone(), sent_at),
        );

        let previous_activity = self.registry.activity(&thread_id);
        self.registry
            .record_activity(&thread_id, &message.content, sent_at);
        let optimistic_activity = Activity {
            preview: message.content.clone(),
            at: sent_at,
        };

        self.pending_sends.insert(
            local_id,
            PendingSend {
                thread_id,
                draft,
                previous_activity,
                optimistic_activity,
            },
        );

        tracing::debug!(%local_id, "message materialized; submitting");
        self.dispatcher
            .dispatch(BackendRequest::SendMessage { local_id, message });

        self.notify(InboxChange::MessagesChanged);
        self.notify(InboxChange::ThreadsChanged);
    }

    fn on_send_finished(
        &mut self,
        thread_id: ThreadId,
        local_id: LocalId,
        result: Result<MessageRecord, InboxError>,
    ) {
        let Some(pending) = self.pending_sends.remove(&local_id) else {
            tracing::debug!(%local_id, "send outcome for unknown message ignored");
            return;
        };

        match result {
            Ok(record) => {
                tracing::debug!(%local_id, server_id = %record.id, "message confirmed");
                if self.store.confirm_optimistic(&thread_id, local_id, record) {
                    self.notify(InboxChange::MessagesChanged);
                }
            }
            Err(error) => self.roll_back_send(local_id, pending, error),
        }
    }

    fn roll_back_send(&mut self, local_id: LocalId, pending: PendingSend, error: InboxError) {
        let PendingSend {
            thread_id,
            draft,
            previous_activity,
            optimistic_activity,
        } = pending;

        self.store.rollback_optimistic(&thread_id, local_id);
        if let Some(previous) = previous_activity {
            if self
                .registry
                .restore_activity(&thread_id, previous, &optimistic_activity)
            {
                self.notify(InboxChange::ThreadsChanged);
            }
        }

        if !self.store.is_scoped_to(&thread_id) {
            tracing::debug!(
                thread_id = %thread_id,
                %local_id,
                error = %error,
                "send failed for a thread that is no longer open"
            );
            return;
        }

        tracing::warn!(thread_id = %thread_id, %local_id, error = %error, "send failed; rolled back");
        self.notify(InboxChange::MessagesChanged);
        if self.composer.restore(draft.clone()) {
            self.notify(InboxChange::DraftRestored(draft));
        }
        self.notify(InboxChange::Error(error));
    }

    fn on_thread_created(&mut self, result: Result<ThreadRecord, InboxError>) {
        match result {
            Ok(record) => {
                self.dispatcher
                    .dispatch(BackendRequest::EnrichThread(MembershipRecord {
                        thread_id: record.id.clone(),
                        student_id: self.current_user,
                        created_at: record.created_at,
                    }));
                self.notify(InboxChange::ThreadCreated(record.id.clone()));
                self.open_thread(record.id);
            }
            Err(error) => self.notify(InboxChange::Error(error)),
        }
    }

    fn on_thread_removed_by_user(
        &mut self,
        thread_id: ThreadId,
        result: Result<(), InboxError>,
        operation: &'static str,
    ) {
        match result {
            Ok(()) => {
                tracing::info!(thread_id = %thread_id, operation, "conversation removed");
                self.drop_thread(&thread_id);
            }
            Err(error) => {
                tracing::warn!(thread_id = %thread_id, operation, error = %error, "conversation removal failed");
                self.notify(InboxChange::Error(error));
            }
        }
    }

    fn on_membership_change(&mut self, change: MembershipChange) {
        if change.student_id() != self.current_user {
            tracing::debug!("membership change for another student ignored");
            return;
        }

        match change {
            MembershipChange::Added(record) => {
                if self.registry.contains(&record.thread_id) {
                    tracing::debug!(thread_id = %record.thread_id, "duplicate membership event ignored");
                    return;
                }
                self.dispatcher.dispatch(BackendRequest::EnrichThread(record));
            }
            MembershipChange::Removed { thread_id, .. } => self.drop_thread(&thread_id),
        }
    }

    /// Removes a thread locally and returns to the list if it was open.
    fn drop_thread(&mut self, thread_id: &ThreadId) {
        if self.registry.remove(thread_id).is_some() {
            self.notify(InboxChange::ThreadsChanged);
        }

        if self.store.is_scoped_to(thread_id) {
            self.close_thread();
        }
    }

    fn on_message_change(&mut self, scope: ThreadId, change: MessageChange) {
        if self.message_feed_scope() != Some(&scope) {
            tracing::debug!(thread_id = %scope, kind = change.kind(), "event from detached message feed discarded");
            return;
        }

        let kind = change.kind();
        match self.store.apply_change(change) {
            Ok(FeedOutcome::Inserted(activity)) => {
                self.registry
                    .record_activity(&scope, &activity.preview, activity.at);
                self.notify(InboxChange::MessagesChanged);
                self.notify(InboxChange::ThreadsChanged);
            }
            Ok(FeedOutcome::Updated | FeedOutcome::Deleted) => {
                self.notify(InboxChange::MessagesChanged);
            }
            Ok(outcome) => {
                tracing::debug!(thread_id = %scope, kind, ?outcome, "message change had no effect");
            }
            Err(stale) => {
                tracing::debug!(thread_id = %stale.thread_id, kind, "message change outside open thread discarded");
            }
        }
    }

    fn set_view(&mut self, view: View) {
        if self.view != view {
            self.view = view.clone();
            self.notify(InboxChange::ViewChanged(view));
        }
    }

    fn notify(&mut self, change: InboxChange) {
        self.observers
            .retain(|observer| observer.send(change.clone()).is_ok());
    }
}
