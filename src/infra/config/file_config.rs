use serde::Deserialize;

use crate::{
    domain::ids::StudentId,
    infra::config::{ApiConfig, AppConfig, InboxConfig, LogConfig, SessionConfig},
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub api: Option<FileApiConfig>,
    pub session: Option<FileSessionConfig>,
    pub inbox: Option<FileInboxConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(api) = self.api {
            api.merge_into(&mut config.api);
        }

        if let Some(session) = self.session {
            session.merge_into(&mut config.session);
        }

        if let Some(inbox) = self.inbox {
            inbox.merge_into(&mut config.inbox);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl FileApiConfig {
    fn merge_into(self, config: &mut ApiConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }

        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSessionConfig {
    pub user_id: Option<StudentId>,
}

impl FileSessionConfig {
    fn merge_into(self, config: &mut SessionConfig) {
        if let Some(user_id) = self.user_id {
            config.user_id = Some(user_id);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileInboxConfig {
    pub history_limit: Option<usize>,
    pub feed_capacity: Option<usize>,
}

impl FileInboxConfig {
    fn merge_into(self, config: &mut InboxConfig) {
        if let Some(history_limit) = self.history_limit {
            config.history_limit = history_limit;
        }

        if let Some(feed_capacity) = self.feed_capacity {
            config.feed_capacity = feed_capacity;
        }
    }
}
