//! Plain-text rendering of inbox state for the line console.

use chrono::{DateTime, Local, Utc};

use crate::domain::{
    error::InboxError,
    message::Message,
    message_store::{MessagePaneUiState, MessageStore},
    thread::{Thread, ThreadKind},
    thread_registry::{ThreadListUiState, ThreadRegistry},
};

const PENDING_MARKER: &str = " (sending)";

pub fn thread_list_lines(registry: &ThreadRegistry) -> Vec<String> {
    match registry.ui_state() {
        ThreadListUiState::Loading => vec!["Loading conversations...".to_owned()],
        ThreadListUiState::Empty => vec!["No conversations yet. Start one with /new <id>.".to_owned()],
        ThreadListUiState::Error => {
            vec!["Could not load conversations. Type /list to retry.".to_owned()]
        }
        ThreadListUiState::Ready => {
            let mut lines = vec!["Conversations:".to_owned()];
            lines.extend(
                registry
                    .threads()
                    .iter()
                    .enumerate()
                    .map(|(index, thread)| thread_line(index + 1, thread)),
            );
            lines
        }
    }
}

fn thread_line(number: usize, thread: &Thread) -> String {
    let marker = match thread.kind {
        ThreadKind::Direct => ' ',
        ThreadKind::Group => '#',
    };
    format!(
        "{number:>3}.{marker}{} [{}] {}  {}",
        thread.display_name,
        thread.id.short(),
        format_time(thread.last_activity),
        thread.preview
    )
}

pub fn thread_header(thread: Option<&Thread>) -> String {
    match thread {
        Some(thread) => format!("== {} ==", thread.display_name),
        None => "== conversation ==".to_owned(),
    }
}

pub fn message_lines(store: &MessageStore) -> Vec<String> {
    match store.ui_state() {
        MessagePaneUiState::Closed => Vec::new(),
        MessagePaneUiState::Loading if store.messages().is_empty() => {
            vec!["Loading messages...".to_owned()]
        }
        _ if store.messages().is_empty() => vec!["No messages yet. Say hello!".to_owned()],
        _ => store.messages().iter().map(message_line).collect(),
    }
}

fn message_line(message: &Message) -> String {
    let pending = if message.is_pending() {
        PENDING_MARKER
    } else {
        ""
    };
    format!(
        "[{}] {}: {}{pending}",
        format_time(message.sent_at),
        message.sender_name,
        message.content
    )
}

pub fn error_line(error: &InboxError) -> String {
    format!("! {error}")
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}
