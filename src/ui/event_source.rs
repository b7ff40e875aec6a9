use std::{
    io::BufRead,
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use anyhow::Result;

use crate::{domain::events::InboxEvent, usecases::contracts::InboxEventSource};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Backend completions and feed changes, delivered over one channel.
pub struct ChannelEventSource {
    events: Receiver<InboxEvent>,
}

impl ChannelEventSource {
    pub fn new(events: Receiver<InboxEvent>) -> Self {
        Self { events }
    }
}

impl InboxEventSource for ChannelEventSource {
    fn next_event(&mut self) -> Result<Option<InboxEvent>> {
        match self.events.recv_timeout(EVENT_POLL_TIMEOUT) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Ok(Some(InboxEvent::QuitRequested)),
        }
    }
}

/// Forwards stdin lines to `lines` from a background thread until EOF.
pub fn spawn_line_reader(lines: Sender<String>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if lines.send(line).is_err() {
                        return;
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "stdin read failed; console input stopped");
                    return;
                }
            }
        }
        // EOF behaves like /quit.
        let _ = lines.send("/quit".to_owned());
    });
}

#[cfg(test)]
pub struct MockEventSource {
    queue: std::collections::VecDeque<InboxEvent>,
}

#[cfg(test)]
impl MockEventSource {
    pub fn from(events: Vec<InboxEvent>) -> Self {
        Self {
            queue: events.into(),
        }
    }
}

#[cfg(test)]
impl InboxEventSource for MockEventSource {
    fn next_event(&mut self) -> Result<Option<InboxEvent>> {
        Ok(self.queue.pop_front())
    }
}
