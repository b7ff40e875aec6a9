//! Messages and roster of the single open thread.
//!
//! The store holds state for at most one thread. Every mutation names the
//! thread it is meant for, and anything addressed to a thread other than the
//! open one is rejected with [`StaleContext`] instead of being applied.

use thiserror::Error;

use super::{
    changes::MessageChange,
    display_name::DisplayName,
    ids::{LocalId, MessageId, OpenTicket, StudentId, ThreadId},
    message::{Message, Participant},
    records::MessageRecord,
    thread::Activity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePaneUiState {
    Closed,
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("data for thread {thread_id} arrived outside its open scope")]
pub struct StaleContext {
    pub thread_id: ThreadId,
}

/// Bulk-fetch result of opening a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedThread {
    pub thread_id: ThreadId,
    pub participants: Vec<Participant>,
    pub messages: Vec<MessageRecord>,
}

/// What a change-feed event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// A message from someone else was added; carries the thread preview it implies.
    Inserted(Activity),
    Updated,
    Deleted,
    /// Insert reported the current user as sender; the optimistic copy already covers it.
    SelfEcho,
    /// Insert for a message that is already present.
    Duplicate,
    /// Update or delete for a message that is not present.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStore {
    current_user: StudentId,
    thread_id: Option<ThreadId>,
    ticket: Option<OpenTicket>,
    ui_state: MessagePaneUiState,
    participants: Vec<Participant>,
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new(current_user: StudentId) -> Self {
        Self {
            current_user,
            thread_id: None,
            ticket: None,
            ui_state: MessagePaneUiState::Closed,
            participants: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.thread_id.is_some()
    }

    pub fn is_scoped_to(&self, thread_id: &ThreadId) -> bool {
        self.thread_id.as_ref() == Some(thread_id)
    }

    pub fn ui_state(&self) -> MessagePaneUiState {
        self.ui_state
    }

    /// Messages in non-decreasing timestamp order, ties in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Discards the previous thread and scopes the store to `thread_id`.
    pub fn begin_open(&mut self, thread_id: ThreadId, ticket: OpenTicket) {
        self.close();
        self.thread_id = Some(thread_id);
        self.ticket = Some(ticket);
        self.ui_state = MessagePaneUiState::Loading;
    }

    pub fn close(&mut self) {
        self.thread_id = None;
        self.ticket = None;
        self.ui_state = MessagePaneUiState::Closed;
        self.participants.clear();
        self.messages.clear();
    }

    /// Installs the roster and history fetched for `ticket`, keeping messages
    /// that arrived through the feed or were sent while loading, then runs
    /// the reconciliation pass. Returns how many sender names it patched.
    pub fn finish_open(
        &mut self,
        ticket: OpenTicket,
        opened: OpenedThread,
    ) -> Result<usize, StaleContext> {
        if self.ticket != Some(ticket) || !self.is_scoped_to(&opened.thread_id) {
            return Err(StaleContext {
                thread_id: opened.thread_id,
            });
        }

        self.participants = opened.participants;

        let arrived_meanwhile = std::mem::take(&mut self.messages);
        let mut messages: Vec<Message> = opened
            .messages
            .into_iter()
            .map(|record| self.materialize(record))
            .collect();
        messages.sort_by_key(|message| message.sent_at);

        for message in arrived_meanwhile {
            let already_loaded = match &message.id {
                MessageId::Confirmed(id) => messages.iter().any(|m| m.id.is_confirmed_as(id)),
                MessageId::Temporary(_) => false,
            };
            if !already_loaded {
                insert_sorted(&mut messages, message);
            }
        }

        self.messages = messages;
        self.ui_state = MessagePaneUiState::Ready;

        Ok(self.reconcile_sender_names())
    }

    /// Name for a sender based on the roster loaded so far.
    pub fn sender_name_for(&self, sender_id: StudentId) -> DisplayName {
        if sender_id == self.current_user {
            return DisplayName::Own;
        }

        self.participants
            .iter()
            .find(|participant| participant.student_id == sender_id)
            .map(|participant| participant.display_name.clone())
            .unwrap_or(DisplayName::Placeholder(sender_id))
    }

    pub fn apply_change(&mut self, change: MessageChange) -> Result<FeedOutcome, StaleContext> {
        if !self.is_scoped_to(change.thread_id()) {
            return Err(StaleContext {
                thread_id: change.thread_id().clone(),
            });
        }

        let outcome = match change {
            MessageChange::Inserted(record) => self.insert_from_feed(record),
            MessageChange::Updated(record) => self.update_from_feed(record),
            MessageChange::Deleted { id, .. } => self.delete_from_feed(&id),
        };

        Ok(outcome)
    }

    pub fn append_optimistic(&mut self, thread_id: &ThreadId, message: Message) -> bool {
        if !self.is_scoped_to(thread_id) {
            return false;
        }

        insert_sorted(&mut self.messages, message);
        true
    }

    /// Promotes a pending message to its server identity.
    ///
    /// If the pending copy is gone (the thread was reopened while the send
    /// was in flight) and the history did not include it, the stored record
    /// is inserted instead.
    pub fn confirm_optimistic(
        &mut self,
        thread_id: &ThreadId,
        local_id: LocalId,
        record: MessageRecord,
    ) -> bool {
        if !self.is_scoped_to(thread_id) {
            return false;
        }

        let confirmed = self.position_of_confirmed(&record.id).is_some();
        match self.position_of_temporary(local_id) {
            Some(index) if confirmed => {
                self.messages.remove(index);
            }
            Some(index) => self.messages[index].id = MessageId::Confirmed(record.id),
            None if confirmed => return false,
            None => {
                let message = self.materialize(record);
                insert_sorted(&mut self.messages, message);
            }
        }
        true
    }

    pub fn rollback_optimistic(&mut self, thread_id: &ThreadId, local_id: LocalId) -> Option<Message> {
        if !self.is_scoped_to(thread_id) {
            return None;
        }

        let index = self.position_of_temporary(local_id)?;
        Some(self.messages.remove(index))
    }

    /// Re-resolves placeholder sender names against the loaded roster.
    /// Returns how many messages were patched; a second run patches nothing.
    pub fn reconcile_sender_names(&mut self) -> usize {
        let mut patched = 0;

        for index in 0..self.messages.len() {
            let DisplayName::Placeholder(sender_id) = self.messages[index].sender_name else {
                continue;
            };

            let resolved = self.sender_name_for(sender_id);
            if resolved.is_resolved() {
                self.messages[index].sender_name = resolved;
                patched += 1;
            }
        }

        patched
    }

    fn insert_from_feed(&mut self, record: MessageRecord) -> FeedOutcome {
        if record.sender_id == self.current_user {
            return FeedOutcome::SelfEcho;
        }

        if self.position_of_confirmed(&record.id).is_some() {
            return FeedOutcome::Duplicate;
        }

        let message = self.materialize(record);
        let activity = Activity {
            preview: message.content.clone(),
            at: message.sent_at,
        };
        insert_sorted(&mut self.messages, message);

        FeedOutcome::Inserted(activity)
    }

    fn update_from_feed(&mut self, record: MessageRecord) -> FeedOutcome {
        let Some(index) = self.position_of_confirmed(&record.id) else {
            return FeedOutcome::Missing;
        };

        let mut message = self.messages.remove(index);
        message.content = record.content;
        message.sent_at = record.created_at;
        insert_sorted(&mut self.messages, message);

        FeedOutcome::Updated
    }

    fn delete_from_feed(&mut self, id: &str) -> FeedOutcome {
        match self.position_of_confirmed(id) {
            Some(index) => {
                self.messages.remove(index);
                FeedOutcome::Deleted
            }
            None => FeedOutcome::Missing,
        }
    }

    fn materialize(&self, record: MessageRecord) -> Message {
        let is_own = record.sender_id == self.current_user;
        let sender_name = self.sender_name_for(record.sender_id);
        Message::from_record(record, is_own, sender_name)
    }

    fn position_of_confirmed(&self, server_id: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|message| message.id.is_confirmed_as(server_id))
    }

    fn position_of_temporary(&self, local_id: LocalId) -> Option<usize> {
        self.messages
            .iter()
            .position(|message| message.id == MessageId::Temporary(local_id))
    }
}

/// Inserts after every message with an equal or earlier timestamp.
fn insert_sorted(messages: &mut Vec<Message>, message: Message) {
    let index = messages.partition_point(|existing| existing.sent_at <= message.sent_at);
    messages.insert(index, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, message_record, participant};

    const ME: StudentId = 1;
    const BEA: StudentId = 2;
    const CAL: StudentId = 3;

    fn open_store(thread_id: &str) -> MessageStore {
        let mut store = MessageStore::new(ME);
        store.begin_open(ThreadId::new(thread_id), OpenTicket::new(1));
        store
    }

    fn opened(thread_id: &str, messages: Vec<MessageRecord>) -> OpenedThread {
        OpenedThread {
            thread_id: ThreadId::new(thread_id),
            participants: vec![
                participant(thread_id, ME, "Me"),
                participant(thread_id, BEA, "Bea"),
            ],
            messages,
        }
    }

    fn contents(store: &MessageStore) -> Vec<&str> {
        store.messages().iter().map(|m| m.content.as_str()).collect()
    }

    fn assert_sorted(store: &MessageStore) {
        assert!(store
            .messages()
            .windows(2)
            .all(|pair| pair[0].sent_at <= pair[1].sent_at));
    }

    #[test]
    fn default_store_is_closed() {
        let store = MessageStore::new(ME);

        assert_eq!(store.ui_state(), MessagePaneUiState::Closed);
        assert!(!store.is_open());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn finish_open_sorts_history_and_resolves_names() {
        let mut store = open_store("t1");

        store
            .finish_open(
                OpenTicket::new(1),
                opened(
                    "t1",
                    vec![
                        message_record("m2", "t1", ME, "second", 200),
                        message_record("m1", "t1", BEA, "first", 100),
                    ],
                ),
            )
            .expect("ticket matches");

        assert_eq!(store.ui_state(), MessagePaneUiState::Ready);
        assert_eq!(contents(&store), vec!["first", "second"]);
        assert_eq!(
            store.messages()[0].sender_name,
            DisplayName::Resolved("Bea".to_owned())
        );
        assert!(!store.messages()[0].is_own);
        assert_eq!(store.messages()[1].sender_name, DisplayName::Own);
        assert!(store.messages()[1].is_own);
    }

    #[test]
    fn finish_open_with_other_ticket_is_stale() {
        let mut store = open_store("t1");

        let result = store.finish_open(OpenTicket::new(7), opened("t1", vec![]));

        assert!(result.is_err());
        assert_eq!(store.ui_state(), MessagePaneUiState::Loading);
    }

    #[test]
    fn finish_open_for_other_thread_is_stale() {
        let mut store = open_store("t2");

        let result = store.finish_open(OpenTicket::new(1), opened("t1", vec![]));

        assert_eq!(
            result,
            Err(StaleContext {
                thread_id: ThreadId::new("t1")
            })
        );
    }

    #[test]
    fn feed_insert_before_roster_is_reconciled_on_open() {
        let mut store = open_store("t1");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m5", "t1", BEA, "early", 500,
            )))
            .expect("in scope");
        assert_eq!(store.messages()[0].sender_name, DisplayName::Placeholder(BEA));

        let patched = store
            .finish_open(
                OpenTicket::new(1),
                opened("t1", vec![message_record("m1", "t1", BEA, "old", 100)]),
            )
            .expect("ticket matches");

        assert_eq!(patched, 1);
        assert_eq!(contents(&store), vec!["old", "early"]);
        assert_eq!(
            store.messages()[1].sender_name,
            DisplayName::Resolved("Bea".to_owned())
        );
    }

    #[test]
    fn finish_open_does_not_duplicate_feed_messages_also_in_history() {
        let mut store = open_store("t1");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", BEA, "hi", 100,
            )))
            .expect("in scope");

        store
            .finish_open(
                OpenTicket::new(1),
                opened("t1", vec![message_record("m1", "t1", BEA, "hi", 100)]),
            )
            .expect("ticket matches");

        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn finish_open_keeps_optimistic_messages_sent_while_loading() {
        let mut store = open_store("t1");
        let thread_id = ThreadId::new("t1");
        store.append_optimistic(
            &thread_id,
            Message::optimistic(LocalId::new(1), ME, "pending".to_owned(), at(300)),
        );

        store
            .finish_open(
                OpenTicket::new(1),
                opened("t1", vec![message_record("m1", "t1", BEA, "hi", 100)]),
            )
            .expect("ticket matches");

        assert_eq!(contents(&store), vec!["hi", "pending"]);
        assert!(store.messages()[1].is_pending());
    }

    #[test]
    fn self_insert_from_feed_is_suppressed() {
        let mut store = open_store("t1");

        let outcome = store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", ME, "mine", 100,
            )))
            .expect("in scope");

        assert_eq!(outcome, FeedOutcome::SelfEcho);
        assert!(store.messages().is_empty());
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut store = open_store("t1");
        let insert =
            MessageChange::Inserted(message_record("m1", "t1", BEA, "hi", 100));

        store.apply_change(insert.clone()).expect("in scope");
        let outcome = store.apply_change(insert).expect("in scope");

        assert_eq!(outcome, FeedOutcome::Duplicate);
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn insert_reports_preview_activity() {
        let mut store = open_store("t1");

        let outcome = store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", BEA, "hi", 100,
            )))
            .expect("in scope");

        assert_eq!(
            outcome,
            FeedOutcome::Inserted(Activity {
                preview: "hi".to_owned(),
                at: at(100)
            })
        );
    }

    #[test]
    fn insert_for_other_thread_is_stale() {
        let mut store = open_store("t1");

        let result = store.apply_change(MessageChange::Inserted(message_record(
            "m1", "t2", BEA, "hi", 100,
        )));

        assert!(result.is_err());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut store = open_store("t1");

        for (id, text) in [("m1", "a"), ("m2", "b"), ("m3", "c")] {
            store
                .apply_change(MessageChange::Inserted(message_record(
                    id, "t1", BEA, text, 100,
                )))
                .expect("in scope");
        }

        assert_eq!(contents(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn update_replaces_content_and_resorts_on_timestamp_change() {
        let mut store = open_store("t1");
        for (id, text, secs) in [("m1", "a", 100), ("m2", "b", 200)] {
            store
                .apply_change(MessageChange::Inserted(message_record(
                    id, "t1", BEA, text, secs,
                )))
                .expect("in scope");
        }

        let outcome = store
            .apply_change(MessageChange::Updated(message_record(
                "m1", "t1", BEA, "a (edited)", 300,
            )))
            .expect("in scope");

        assert_eq!(outcome, FeedOutcome::Updated);
        assert_eq!(contents(&store), vec!["b", "a (edited)"]);
    }

    #[test]
    fn update_and_delete_of_unknown_message_are_missing() {
        let mut store = open_store("t1");

        let updated = store
            .apply_change(MessageChange::Updated(message_record(
                "zz", "t1", BEA, "x", 1,
            )))
            .expect("in scope");
        let deleted = store
            .apply_change(MessageChange::Deleted {
                id: "zz".to_owned(),
                thread_id: ThreadId::new("t1"),
            })
            .expect("in scope");

        assert_eq!(updated, FeedOutcome::Missing);
        assert_eq!(deleted, FeedOutcome::Missing);
    }

    #[test]
    fn delete_removes_message() {
        let mut store = open_store("t1");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", BEA, "hi", 100,
            )))
            .expect("in scope");

        let outcome = store
            .apply_change(MessageChange::Deleted {
                id: "m1".to_owned(),
                thread_id: ThreadId::new("t1"),
            })
            .expect("in scope");

        assert_eq!(outcome, FeedOutcome::Deleted);
        assert!(store.messages().is_empty());
    }

    #[test]
    fn any_sequence_of_feed_events_keeps_messages_sorted() {
        let mut store = open_store("t1");
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..500 {
            let id = format!("m{}", next() % 40);
            let secs = (next() % 50) as i64;
            let sender = if next() % 5 == 0 { ME } else { BEA };
            let change = match next() % 3 {
                0 => MessageChange::Inserted(message_record(&id, "t1", sender, "x", secs)),
                1 => MessageChange::Updated(message_record(&id, "t1", sender, "y", secs)),
                _ => MessageChange::Deleted {
                    id,
                    thread_id: ThreadId::new("t1"),
                },
            };

            store.apply_change(change).expect("in scope");
            assert_sorted(&store);
        }
    }

    #[test]
    fn optimistic_message_is_confirmed_with_server_id() {
        let mut store = open_store("t1");
        let thread_id = ThreadId::new("t1");
        let local_id = LocalId::new(4);
        store.append_optimistic(
            &thread_id,
            Message::optimistic(local_id, ME, "hello".to_owned(), at(100)),
        );

        assert!(store.confirm_optimistic(
            &thread_id,
            local_id,
            message_record("m9", "t1", ME, "hello", 100)
        ));

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].id, MessageId::Confirmed("m9".to_owned()));
        assert_eq!(store.messages()[0].sender_name, DisplayName::Own);
    }

    #[test]
    fn confirm_drops_temporary_copy_when_confirmed_copy_exists() {
        let mut store = open_store("t1");
        let thread_id = ThreadId::new("t1");
        let local_id = LocalId::new(4);
        store.append_optimistic(
            &thread_id,
            Message::optimistic(local_id, ME, "hello".to_owned(), at(100)),
        );
        store
            .finish_open(
                OpenTicket::new(1),
                opened("t1", vec![message_record("m9", "t1", ME, "hello", 100)]),
            )
            .expect("ticket matches");
        assert_eq!(store.messages().len(), 2);

        store.confirm_optimistic(&thread_id, local_id, message_record("m9", "t1", ME, "hello", 100));

        assert_eq!(store.messages().len(), 1);
        assert!(!store.messages()[0].is_pending());
    }

    #[test]
    fn confirm_inserts_record_when_pending_copy_was_discarded() {
        let mut store = open_store("t1");
        let thread_id = ThreadId::new("t1");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", BEA, "later", 300,
            )))
            .expect("in scope");

        assert!(store.confirm_optimistic(
            &thread_id,
            LocalId::new(4),
            message_record("m9", "t1", ME, "hello", 100)
        ));
        assert!(!store.confirm_optimistic(
            &thread_id,
            LocalId::new(4),
            message_record("m9", "t1", ME, "hello", 100)
        ));

        assert_eq!(contents(&store), vec!["hello", "later"]);
        assert_eq!(store.messages()[0].id, MessageId::Confirmed("m9".to_owned()));
        assert_eq!(store.messages()[0].sender_name, DisplayName::Own);
    }

    #[test]
    fn edited_message_moves_after_messages_with_the_same_timestamp() {
        let mut store = open_store("t1");
        for (id, secs) in [("m1", 100), ("m2", 200), ("m3", 200)] {
            store
                .apply_change(MessageChange::Inserted(message_record(id, "t1", BEA, id, secs)))
                .expect("in scope");
        }

        store
            .apply_change(MessageChange::Updated(message_record(
                "m1", "t1", BEA, "m1 edited", 200,
            )))
            .expect("in scope");

        assert_eq!(contents(&store), vec!["m2", "m3", "m1 edited"]);
    }

    #[test]
    fn rollback_removes_only_the_temporary_message() {
        let mut store = open_store("t1");
        let thread_id = ThreadId::new("t1");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", BEA, "hi", 100,
            )))
            .expect("in scope");
        store.append_optimistic(
            &thread_id,
            Message::optimistic(LocalId::new(1), ME, "hello".to_owned(), at(200)),
        );

        let removed = store.rollback_optimistic(&thread_id, LocalId::new(1));

        assert_eq!(removed.map(|m| m.content), Some("hello".to_owned()));
        assert_eq!(contents(&store), vec!["hi"]);
    }

    #[test]
    fn optimistic_operations_for_closed_thread_are_ignored() {
        let mut store = open_store("t1");
        let other = ThreadId::new("t2");

        assert!(!store.append_optimistic(
            &other,
            Message::optimistic(LocalId::new(1), ME, "x".to_owned(), at(1)),
        ));
        assert!(!store.confirm_optimistic(
            &other,
            LocalId::new(1),
            message_record("m1", "t2", ME, "x", 1)
        ));
        assert!(store.rollback_optimistic(&other, LocalId::new(1)).is_none());
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let mut store = open_store("t1");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m1", "t1", BEA, "hi", 100,
            )))
            .expect("in scope");
        store
            .apply_change(MessageChange::Inserted(message_record(
                "m2", "t1", CAL, "yo", 110,
            )))
            .expect("in scope");
        store
            .finish_open(OpenTicket::new(1), opened("t1", vec![]))
            .expect("ticket matches");

        let first = store.messages().to_vec();
        let second_run = store.reconcile_sender_names();

        assert_eq!(second_run, 0);
        assert_eq!(store.messages(), first.as_slice());
        // Cal has no roster entry, so the placeholder stays.
        assert_eq!(store.messages()[1].sender_name, DisplayName::Placeholder(CAL));
    }

    #[test]
    fn close_discards_all_state() {
        let mut store = open_store("t1");
        store
            .finish_open(
                OpenTicket::new(1),
                opened("t1", vec![message_record("m1", "t1", BEA, "hi", 100)]),
            )
            .expect("ticket matches");

        store.close();

        assert!(!store.is_open());
        assert!(store.messages().is_empty());
        assert!(store.participants().is_empty());
        assert_eq!(store.ui_state(), MessagePaneUiState::Closed);
    }
}
