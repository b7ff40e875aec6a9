use std::fmt;

use super::ids::StudentId;

pub const OWN_SENDER_LABEL: &str = "You";

/// Name shown next to a participant or message sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayName {
    /// The current user.
    Own,
    Resolved(String),
    /// Directory data was unavailable when the name was needed.
    Placeholder(StudentId),
}

impl DisplayName {
    /// Builds a resolved name, falling back to a placeholder for blank input.
    pub fn from_profile(student_id: StudentId, name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            Self::Placeholder(student_id)
        } else {
            Self::Resolved(trimmed.to_owned())
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Own => f.write_str(OWN_SENDER_LABEL),
            Self::Resolved(name) => f.write_str(name),
            Self::Placeholder(student_id) => write!(f, "User {student_id}"),
        }
    }
}
