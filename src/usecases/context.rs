use crate::{domain::ids::StudentId, infra::config::AppConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub config: AppConfig,
    pub current_user: StudentId,
}

impl AppContext {
    pub fn new(config: AppConfig, current_user: StudentId) -> Self {
        Self {
            config,
            current_user,
        }
    }
}
