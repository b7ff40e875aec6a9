use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::{
    ids::ThreadId,
    thread::{sort_by_activity, Activity, Thread},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Conversations visible to the current user, always sorted by last activity
/// (most recent first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRegistry {
    ui_state: ThreadListUiState,
    threads: Vec<Thread>,
    removed_while_loading: HashSet<ThreadId>,
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self {
            ui_state: ThreadListUiState::Loading,
            threads: Vec::new(),
            removed_while_loading: HashSet::new(),
        }
    }
}

impl ThreadRegistry {
    pub fn ui_state(&self) -> ThreadListUiState {
        self.ui_state
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn get(&self, thread_id: &ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|thread| &thread.id == thread_id)
    }

    pub fn contains(&self, thread_id: &ThreadId) -> bool {
        self.get(thread_id).is_some()
    }

    pub fn set_loading(&mut self) {
        self.ui_state = ThreadListUiState::Loading;
        self.threads.clear();
        self.removed_while_loading.clear();
    }

    /// Installs a bulk-load result.
    ///
    /// Threads that arrived through the change feed while the load was in
    /// flight are kept, and threads removed meanwhile are not brought back.
    pub fn finish_loading(&mut self, loaded: Vec<Thread>) {
        let arrived_meanwhile = std::mem::take(&mut self.threads);
        let removed = std::mem::take(&mut self.removed_while_loading);

        let mut threads: Vec<Thread> = loaded
            .into_iter()
            .filter(|thread| !removed.contains(&thread.id))
            .collect();
        for thread in arrived_meanwhile {
            if !threads.iter().any(|known| known.id == thread.id) {
                threads.push(thread);
            }
        }

        self.threads = threads;
        self.sort();
        self.refresh_ui_state();
    }

    pub fn set_error(&mut self) {
        self.ui_state = ThreadListUiState::Error;
        self.threads.clear();
        self.removed_while_loading.clear();
    }

    /// Inserts a thread at the front unless it is already present.
    pub fn insert(&mut self, thread: Thread) -> bool {
        if self.contains(&thread.id) {
            return false;
        }

        self.removed_while_loading.remove(&thread.id);
        self.threads.insert(0, thread);
        self.sort();
        if self.ui_state != ThreadListUiState::Loading {
            self.refresh_ui_state();
        }
        true
    }

    pub fn remove(&mut self, thread_id: &ThreadId) -> Option<Thread> {
        if self.ui_state == ThreadListUiState::Loading {
            self.removed_while_loading.insert(thread_id.clone());
        }

        let index = self
            .threads
            .iter()
            .position(|thread| &thread.id == thread_id)?;
        let removed = self.threads.remove(index);
        if self.ui_state != ThreadListUiState::Loading {
            self.refresh_ui_state();
        }
        Some(removed)
    }

    pub fn activity(&self, thread_id: &ThreadId) -> Option<Activity> {
        self.get(thread_id).map(Thread::activity)
    }

    pub fn record_activity(
        &mut self,
        thread_id: &ThreadId,
        preview: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(thread) = self.get_mut(thread_id) else {
            return false;
        };

        let changed = thread.record_activity(preview, at);
        if changed {
            self.sort();
        }
        changed
    }

    /// Puts back `previous` only while the thread still shows `expected`.
    pub fn restore_activity(
        &mut self,
        thread_id: &ThreadId,
        previous: Activity,
        expected: &Activity,
    ) -> bool {
        let Some(thread) = self.get_mut(thread_id) else {
            return false;
        };

        if &thread.activity() != expected {
            return false;
        }

        thread.restore_activity(previous);
        self.sort();
        true
    }

    fn get_mut(&mut self, thread_id: &ThreadId) -> Option<&mut Thread> {
        self.threads
            .iter_mut()
            .find(|thread| &thread.id == thread_id)
    }

    fn sort(&mut self) {
        sort_by_activity(&mut self.threads);
    }

    fn refresh_ui_state(&mut self) {
        self.ui_state = if self.threads.is_empty() {
            ThreadListUiState::Empty
        } else {
            ThreadListUiState::Ready
        };
    }
}
