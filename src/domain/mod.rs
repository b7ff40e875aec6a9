//! Domain layer: conversation state and the rules that keep it consistent.

pub mod changes;
pub mod composer;
pub mod display_name;
pub mod error;
pub mod events;
pub mod ids;
pub mod message;
pub mod message_store;
pub mod records;
pub mod thread;
pub mod thread_registry;
