use chrono::{DateTime, Utc};

use super::{ids::ThreadId, records::MessageRecord};

pub const SELF_CHAT_TITLE: &str = "Self Chat";
pub const NO_MESSAGES_PREVIEW: &str = "No messages yet";

/// Classification of a conversation for rendering purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadKind {
    /// Exactly one other participant.
    Direct,
    /// Zero or several other participants.
    #[default]
    Group,
}

impl ThreadKind {
    pub fn for_other_participants(count: usize) -> Self {
        if count == 1 {
            Self::Direct
        } else {
            Self::Group
        }
    }
}

/// Preview text together with the time it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub preview: String,
    pub at: DateTime<Utc>,
}

/// A conversation as presented in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: ThreadId,
    pub created_at: DateTime<Utc>,
    pub display_name: String,
    pub kind: ThreadKind,
    pub preview: String,
    /// Sort key of the conversation list.
    pub last_activity: DateTime<Utc>,
    /// No read tracking exists server-side, so this stays zero.
    pub unread_count: u32,
}

impl Thread {
    /// Builds the list entry from the names of everyone but the current user
    /// and the most recent message, if any.
    pub fn enriched(
        id: ThreadId,
        created_at: DateTime<Utc>,
        other_names: &[String],
        latest: Option<&MessageRecord>,
    ) -> Self {
        let display_name = if other_names.is_empty() {
            SELF_CHAT_TITLE.to_owned()
        } else {
            other_names.join(", ")
        };

        let (preview, last_activity) = match latest {
            Some(message) => (message.content.clone(), message.created_at),
            None => (NO_MESSAGES_PREVIEW.to_owned(), created_at),
        };

        Self {
            id,
            created_at,
            display_name,
            kind: ThreadKind::for_other_participants(other_names.len()),
            preview,
            last_activity,
            unread_count: 0,
        }
    }

    /// Minimal entry used when enrichment could not reach the server.
    pub fn fallback(id: ThreadId, created_at: DateTime<Utc>) -> Self {
        Self {
            display_name: format!("Thread {}", id.short()),
            id,
            created_at,
            kind: ThreadKind::Group,
            preview: NO_MESSAGES_PREVIEW.to_owned(),
            last_activity: created_at,
            unread_count: 0,
        }
    }

    pub fn activity(&self) -> Activity {
        Activity {
            preview: self.preview.clone(),
            at: self.last_activity,
        }
    }

    /// Applies a newer message as preview. Older activity is ignored.
    pub fn record_activity(&mut self, preview: &str, at: DateTime<Utc>) -> bool {
        if at < self.last_activity {
            return false;
        }

        self.preview = preview.to_owned();
        self.last_activity = at;
        true
    }

    pub fn restore_activity(&mut self, activity: Activity) {
        self.preview = activity.preview;
        self.last_activity = activity.at;
    }
}

/// Most recent activity first; equal timestamps keep their relative order.
pub fn sort_by_activity(threads: &mut [Thread]) {
    threads.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
}
