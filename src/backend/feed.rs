//! In-process change feed.
//!
//! Table changes are published into a broadcast hub. Every subscription is a
//! forwarding task that filters the hub on one column and posts matching
//! changes to the inbox event channel until the subscription is dropped.

use std::sync::mpsc::Sender;

use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};

use crate::{
    domain::{
        changes::{MembershipChange, MessageChange},
        events::InboxEvent,
        ids::{StudentId, ThreadId},
    },
    usecases::contracts::{ChangeFeed, FeedError},
};

const FEED_SUBSCRIPTION_STARTED: &str = "CHANGE_FEED_SUBSCRIPTION_STARTED";
const FEED_SUBSCRIPTION_STOPPED: &str = "CHANGE_FEED_SUBSCRIPTION_STOPPED";
const FEED_SUBSCRIPTION_LAGGED: &str = "CHANGE_FEED_SUBSCRIPTION_LAGGED";
const FEED_EVENT_SEND_FAILED: &str = "CHANGE_FEED_EVENT_SEND_FAILED";

/// A row change on one of the tables the inbox listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    Membership(MembershipChange),
    Message(MessageChange),
}

/// Column predicate a subscription filters on.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    StudentId(StudentId),
    ThreadId(ThreadId),
}

impl Filter {
    /// Turns a hub change into an inbox event when it passes the filter.
    fn admit(&self, change: TableChange) -> Option<InboxEvent> {
        match (self, change) {
            (Self::StudentId(student_id), TableChange::Membership(change))
                if change.student_id() == *student_id =>
            {
                Some(InboxEvent::Membership(change))
            }
            (Self::ThreadId(thread_id), TableChange::Message(change))
                if change.thread_id() == thread_id =>
            {
                Some(InboxEvent::ThreadMessage {
                    scope: thread_id.clone(),
                    change,
                })
            }
            _ => None,
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Self::StudentId(_) => "thread_participants",
            Self::ThreadId(_) => "messages",
        }
    }
}

/// Write side of the hub.
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    hub: broadcast::Sender<TableChange>,
}

impl FeedPublisher {
    pub fn publish(&self, change: TableChange) {
        // No receivers just means nobody is subscribed right now.
        let _ = self.hub.send(change);
    }
}

#[derive(Debug, Clone)]
pub struct LocalChangeFeed {
    handle: Handle,
    hub: broadcast::Sender<TableChange>,
    events: Sender<InboxEvent>,
}

impl LocalChangeFeed {
    pub fn new(handle: Handle, capacity: usize, events: Sender<InboxEvent>) -> Self {
        let (hub, _) = broadcast::channel(capacity.max(1));
        Self {
            handle,
            hub,
            events,
        }
    }

    pub fn publisher(&self) -> FeedPublisher {
        FeedPublisher {
            hub: self.hub.clone(),
        }
    }

    fn attach(&self, filter: Filter) -> FeedSubscription {
        let (stop_tx, stop_rx) = watch::channel(false);
        // Subscribe before spawning so nothing published after this call is missed.
        let changes = self.hub.subscribe();

        tracing::info!(
            code = FEED_SUBSCRIPTION_STARTED,
            table = filter.table(),
            "change feed subscription started"
        );
        self.handle
            .spawn(forward(filter, changes, self.events.clone(), stop_rx));

        FeedSubscription {
            stop_tx: Some(stop_tx),
        }
    }
}

impl ChangeFeed for LocalChangeFeed {
    type Subscription = FeedSubscription;

    fn subscribe_memberships(&self, student_id: StudentId) -> Result<FeedSubscription, FeedError> {
        Ok(self.attach(Filter::StudentId(student_id)))
    }

    fn subscribe_messages(&self, thread_id: &ThreadId) -> Result<FeedSubscription, FeedError> {
        Ok(self.attach(Filter::ThreadId(thread_id.clone())))
    }
}

/// Live subscription; dropping it stops the forwarding task.
#[derive(Debug)]
pub struct FeedSubscription {
    stop_tx: Option<watch::Sender<bool>>,
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

async fn forward(
    filter: Filter,
    mut changes: broadcast::Receiver<TableChange>,
    events: Sender<InboxEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::info!(
                        code = FEED_SUBSCRIPTION_STOPPED,
                        table = filter.table(),
                        "change feed subscription stopped"
                    );
                    return;
                }
            }
            received = changes.recv() => {
                match received {
                    Ok(change) => {
                        let Some(event) = filter.admit(change) else {
                            continue;
                        };
                        if let Err(error) = events.send(event) {
                            tracing::warn!(
                                code = FEED_EVENT_SEND_FAILED,
                                error = %error,
                                "inbox event channel closed; ending subscription"
                            );
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            code = FEED_SUBSCRIPTION_LAGGED,
                            table = filter.table(),
                            skipped,
                            "change feed subscriber fell behind; changes were dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }
}
