use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    future::Future,
    rc::Rc,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};

use crate::{
    domain::{
        display_name::DisplayName,
        ids::{LocalId, OpenTicket, StudentId, ThreadId},
        message::Participant,
        records::{
            MembershipRecord, MessageRecord, NewMessage, ParticipantRecord, StudentProfile,
            ThreadRecord,
        },
    },
    usecases::contracts::{
        ApiError, BackendRequest, ChangeFeed, DirectoryLookup, Dispatcher, FeedError, InboxApi,
        MessagesQuery,
    },
};

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("timestamp in range")
}

pub fn message_record(
    id: &str,
    thread_id: &str,
    sender_id: StudentId,
    content: &str,
    secs: i64,
) -> MessageRecord {
    MessageRecord {
        id: id.to_owned(),
        thread_id: ThreadId::new(thread_id),
        sender_id,
        content: content.to_owned(),
        created_at: at(secs),
    }
}

pub fn participant(thread_id: &str, student_id: StudentId, name: &str) -> Participant {
    Participant {
        thread_id: ThreadId::new(thread_id),
        student_id,
        display_name: DisplayName::Resolved(name.to_owned()),
    }
}

pub fn membership(thread_id: &str, student_id: StudentId, secs: i64) -> MembershipRecord {
    MembershipRecord {
        thread_id: ThreadId::new(thread_id),
        student_id,
        created_at: at(secs),
    }
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime should build")
        .block_on(future)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    ListMemberships,
    ListParticipants,
    ListMessages,
    CreateMessage,
    CreateThread,
    AddParticipant,
    RemoveParticipant,
    DeleteThread,
    LookupStudent,
}

#[derive(Debug, Default)]
struct ServerState {
    students: HashMap<StudentId, String>,
    threads: Vec<ThreadRecord>,
    participants: Vec<ParticipantRecord>,
    messages: Vec<MessageRecord>,
    failing: HashSet<FakeOp>,
    lookup_count: usize,
    last_message_limit: Option<usize>,
    next_id: u64,
}

impl ServerState {
    fn check(&self, op: FakeOp) -> Result<(), ApiError> {
        if self.failing.contains(&op) {
            return Err(ApiError::Unavailable("simulated".to_owned()));
        }
        Ok(())
    }

    fn thread(&self, thread_id: &ThreadId) -> Option<&ThreadRecord> {
        self.threads.iter().find(|thread| &thread.id == thread_id)
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory server of record shared between clones.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    pub fn with_student(self, student_id: StudentId, name: &str) -> Self {
        self.add_student(student_id, name);
        self
    }

    pub fn add_student(&self, student_id: StudentId, name: &str) {
        self.with_state(|state| {
            state.students.insert(student_id, name.to_owned());
        });
    }

    pub fn with_thread(self, thread_id: &str, created_secs: i64, members: &[StudentId]) -> Self {
        self.with_state(|state| {
            let id = ThreadId::new(thread_id);
            state.threads.push(ThreadRecord {
                id: id.clone(),
                created_at: at(created_secs),
            });
            for member in members {
                state.participants.push(ParticipantRecord {
                    thread_id: id.clone(),
                    student_id: *member,
                });
            }
        });
        self
    }

    pub fn with_message(self, message: MessageRecord) -> Self {
        self.with_state(|state| state.messages.push(message));
        self
    }

    pub fn failing(self, op: FakeOp) -> Self {
        self.with_state(|state| {
            state.failing.insert(op);
        });
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.with_state(|state| state.lookup_count)
    }

    pub fn last_message_limit(&self) -> Option<usize> {
        self.with_state(|state| state.last_message_limit)
    }

    pub fn stored_messages(&self, thread_id: &str) -> Vec<MessageRecord> {
        self.with_state(|state| {
            state
                .messages
                .iter()
                .filter(|message| message.thread_id.as_str() == thread_id)
                .cloned()
                .collect()
        })
    }

    pub fn members_of(&self, thread_id: &str) -> Vec<StudentId> {
        self.with_state(|state| {
            state
                .participants
                .iter()
                .filter(|participant| participant.thread_id.as_str() == thread_id)
                .map(|participant| participant.student_id)
                .collect()
        })
    }

    pub fn thread_count(&self) -> usize {
        self.with_state(|state| state.threads.len())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ServerState) -> T) -> T {
        let mut state = self.state.lock().expect("fake server lock poisoned");
        f(&mut state)
    }
}

impl InboxApi for FakeServer {
    async fn list_memberships(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<MembershipRecord>, ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::ListMemberships)?;
            Ok(state
                .participants
                .iter()
                .filter(|participant| participant.student_id == student_id)
                .filter_map(|participant| {
                    state.thread(&participant.thread_id).map(|thread| MembershipRecord {
                        thread_id: thread.id.clone(),
                        student_id,
                        created_at: thread.created_at,
                    })
                })
                .collect())
        })
    }

    async fn list_participants(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Vec<ParticipantRecord>, ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::ListParticipants)?;
            Ok(state
                .participants
                .iter()
                .filter(|participant| &participant.thread_id == thread_id)
                .cloned()
                .collect())
        })
    }

    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        query: MessagesQuery,
    ) -> Result<Vec<MessageRecord>, ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::ListMessages)?;
            state.last_message_limit = query.limit;

            let mut messages: Vec<MessageRecord> = state
                .messages
                .iter()
                .filter(|message| &message.thread_id == thread_id)
                .cloned()
                .collect();
            messages.sort_by_key(|message| message.created_at);
            if query.newest_first {
                messages.reverse();
            }
            if let Some(limit) = query.limit {
                messages.truncate(limit);
            }
            Ok(messages)
        })
    }

    async fn create_message(&self, message: &NewMessage) -> Result<MessageRecord, ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::CreateMessage)?;
            if state.thread(&message.thread_id).is_none() {
                return Err(ApiError::NotFound);
            }

            let record = MessageRecord {
                id: state.next_id("msg"),
                thread_id: message.thread_id.clone(),
                sender_id: message.sender_id,
                content: message.content.clone(),
                created_at: message.created_at,
            };
            state.messages.push(record.clone());
            Ok(record)
        })
    }

    async fn create_thread(&self) -> Result<ThreadRecord, ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::CreateThread)?;
            let record = ThreadRecord {
                id: ThreadId::new(state.next_id("thread")),
                created_at: at(1_000),
            };
            state.threads.push(record.clone());
            Ok(record)
        })
    }

    async fn add_participant(
        &self,
        thread_id: &ThreadId,
        student_id: StudentId,
    ) -> Result<(), ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::AddParticipant)?;
            if state.thread(thread_id).is_none() {
                return Err(ApiError::NotFound);
            }
            state.participants.push(ParticipantRecord {
                thread_id: thread_id.clone(),
                student_id,
            });
            Ok(())
        })
    }

    async fn remove_participant(
        &self,
        thread_id: &ThreadId,
        student_id: StudentId,
    ) -> Result<(), ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::RemoveParticipant)?;
            state.participants.retain(|participant| {
                !(&participant.thread_id == thread_id && participant.student_id == student_id)
            });
            Ok(())
        })
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> Result<(), ApiError> {
        self.with_state(|state| {
            state.check(FakeOp::DeleteThread)?;
            if state.thread(thread_id).is_none() {
                return Err(ApiError::NotFound);
            }
            state.threads.retain(|thread| &thread.id != thread_id);
            state
                .participants
                .retain(|participant| &participant.thread_id != thread_id);
            state.messages.retain(|message| &message.thread_id != thread_id);
            Ok(())
        })
    }
}

impl DirectoryLookup for FakeServer {
    async fn lookup_student(&self, student_id: StudentId) -> Result<StudentProfile, ApiError> {
        self.with_state(|state| {
            state.lookup_count += 1;
            state.check(FakeOp::LookupStudent)?;
            state
                .students
                .get(&student_id)
                .map(|name| StudentProfile {
                    id: student_id,
                    name: name.clone(),
                })
                .ok_or(ApiError::NotFound)
        })
    }
}

/// Captures every request instead of running it.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    requests: Rc<RefCell<Vec<BackendRequest>>>,
}

impl RecordingDispatcher {
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.borrow().clone()
    }

    pub fn open_requests(&self) -> Vec<(OpenTicket, ThreadId)> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|request| match request {
                BackendRequest::OpenThread { ticket, thread_id } => {
                    Some((*ticket, thread_id.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn last_open_ticket(&self) -> Option<OpenTicket> {
        self.open_requests().last().map(|(ticket, _)| *ticket)
    }

    pub fn last_send_local_id(&self) -> Option<LocalId> {
        self.requests
            .borrow()
            .iter()
            .rev()
            .find_map(|request| match request {
                BackendRequest::SendMessage { local_id, .. } => Some(*local_id),
                _ => None,
            })
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, request: BackendRequest) {
        self.requests.borrow_mut().push(request);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FakeScope {
    Memberships(StudentId),
    Messages(ThreadId),
}

#[derive(Debug, Default)]
struct FeedState {
    next_id: u64,
    active: Vec<(u64, FakeScope)>,
}

/// Tracks which subscriptions are alive; dropping one removes it.
#[derive(Debug, Clone, Default)]
pub struct FakeFeed {
    state: Arc<Mutex<FeedState>>,
}

impl FakeFeed {
    pub fn membership_subscribers(&self) -> Vec<StudentId> {
        self.scopes()
            .into_iter()
            .filter_map(|scope| match scope {
                FakeScope::Memberships(student_id) => Some(student_id),
                FakeScope::Messages(_) => None,
            })
            .collect()
    }

    pub fn active_message_scopes(&self) -> Vec<ThreadId> {
        self.scopes()
            .into_iter()
            .filter_map(|scope| match scope {
                FakeScope::Messages(thread_id) => Some(thread_id),
                FakeScope::Memberships(_) => None,
            })
            .collect()
    }

    fn scopes(&self) -> Vec<FakeScope> {
        let state = self.state.lock().expect("fake feed lock poisoned");
        state.active.iter().map(|(_, scope)| scope.clone()).collect()
    }

    fn attach(&self, scope: FakeScope) -> FakeSubscription {
        let mut state = self.state.lock().expect("fake feed lock poisoned");
        state.next_id += 1;
        let id = state.next_id;
        state.active.push((id, scope));
        FakeSubscription {
            id,
            state: Arc::clone(&self.state),
        }
    }
}

impl ChangeFeed for FakeFeed {
    type Subscription = FakeSubscription;

    fn subscribe_memberships(&self, student_id: StudentId) -> Result<FakeSubscription, FeedError> {
        Ok(self.attach(FakeScope::Memberships(student_id)))
    }

    fn subscribe_messages(&self, thread_id: &ThreadId) -> Result<FakeSubscription, FeedError> {
        Ok(self.attach(FakeScope::Messages(thread_id.clone())))
    }
}

#[derive(Debug)]
pub struct FakeSubscription {
    id: u64,
    state: Arc<Mutex<FeedState>>,
}

impl Drop for FakeSubscription {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.active.retain(|(id, _)| *id != self.id);
        }
    }
}
