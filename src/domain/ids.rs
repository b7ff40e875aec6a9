use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a student (the participant key used by every table).
pub type StudentId = i64;

const SHORT_ID_CHARS: usize = 8;

/// Opaque conversation identifier as issued by the server of record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used where no better title is available.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_CHARS) {
            Some((byte_idx, _)) => &self.0[..byte_idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ThreadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Client-side identifier of a message that the server has not acknowledged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u64);

impl LocalId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "temp-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Materialized locally, submission still in flight.
    Temporary(LocalId),
    /// Known to the server of record.
    Confirmed(String),
}

impl MessageId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    pub fn is_confirmed_as(&self, server_id: &str) -> bool {
        matches!(self, Self::Confirmed(id) if id == server_id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(local_id) => local_id.fmt(f),
            Self::Confirmed(id) => f.write_str(id),
        }
    }
}

/// Identifies one `open` of a thread so late bulk-fetch results can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenTicket(u64);

impl OpenTicket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keeps_first_eight_characters() {
        let id = ThreadId::new("3f2a9c1e-77aa-4b1c-9d0e-0123456789ab");

        assert_eq!(id.short(), "3f2a9c1e");
    }

    #[test]
    fn short_returns_whole_id_when_shorter_than_eight() {
        assert_eq!(ThreadId::new("t1").short(), "t1");
    }

    #[test]
    fn short_respects_char_boundaries() {
        assert_eq!(ThreadId::new("ääääääääää").short(), "ääääääää");
    }

    #[test]
    fn temporary_and_confirmed_ids_never_compare_equal() {
        let temporary = MessageId::Temporary(LocalId::new(1));
        let confirmed = MessageId::Confirmed("1".to_owned());

        assert_ne!(temporary, confirmed);
        assert!(temporary.is_temporary());
        assert!(confirmed.is_confirmed_as("1"));
        assert!(!temporary.is_confirmed_as("1"));
    }

    #[test]
    fn thread_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ThreadId::new("abc")).expect("serialize");

        assert_eq!(json, "\"abc\"");
    }
}
