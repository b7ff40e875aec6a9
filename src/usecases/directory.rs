//! Resolves student ids to display names.

use std::{collections::HashMap, sync::Mutex};

use crate::domain::{display_name::DisplayName, ids::StudentId};

use super::contracts::DirectoryLookup;

/// Directory lookups with a process-lifetime cache of successful answers.
///
/// Failed lookups are not cached, so a later call can still succeed.
#[derive(Debug)]
pub struct Directory<L> {
    lookup: L,
    cache: Mutex<HashMap<StudentId, String>>,
}

impl<L: DirectoryLookup> Directory<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve_name(&self, student_id: StudentId) -> DisplayName {
        if let Some(name) = self.cached(student_id) {
            return DisplayName::Resolved(name);
        }

        match self.lookup.lookup_student(student_id).await {
            Ok(profile) => {
                let name = DisplayName::from_profile(student_id, &profile.name);
                if let DisplayName::Resolved(resolved) = &name {
                    if let Ok(mut cache) = self.cache.lock() {
                        cache.insert(student_id, resolved.clone());
                    }
                }
                name
            }
            Err(error) => {
                tracing::warn!(
                    student_id,
                    error = %error,
                    "directory lookup failed; using placeholder name"
                );
                DisplayName::Placeholder(student_id)
            }
        }
    }

    fn cached(&self, student_id: StudentId) -> Option<String> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&student_id).cloned())
    }
}
