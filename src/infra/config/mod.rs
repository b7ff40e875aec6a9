mod app_config;
mod file_config;
mod loader;

pub use app_config::{ApiConfig, AppConfig, InboxConfig, LogConfig, SessionConfig};
pub use loader::{load, FileConfigAdapter};
