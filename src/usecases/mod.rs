//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod context;
pub mod contracts;
pub mod directory;
pub mod enrich_thread;
pub mod inbox;
pub mod load_threads;
pub mod manage_threads;
pub mod open_thread;
pub mod send_message;
