use std::{
    io::Write,
    sync::mpsc::{Receiver, TryRecvError},
};

use anyhow::Result;

use crate::{
    domain::{
        events::{InboxChange, InboxEvent, View},
        ids::ThreadId,
        thread_registry::ThreadRegistry,
    },
    usecases::{
        contracts::{ChangeFeed, Dispatcher, InboxEventSource},
        inbox::InboxOrchestrator,
    },
};

use super::{
    input::{parse_line, ConsoleCommand, HELP_LINES},
    render,
};

/// Runs the interactive console until the user quits or input ends.
pub fn start<D, F>(
    inbox: &mut InboxOrchestrator<D, F>,
    event_source: &mut dyn InboxEventSource,
    lines: &Receiver<String>,
    out: &mut dyn Write,
) -> Result<()>
where
    D: Dispatcher,
    F: ChangeFeed,
{
    tracing::info!(user_id = inbox.current_user(), "starting inbox console");

    let changes = inbox.subscribe();
    inbox.start();
    writeln!(out, "Type /help for commands.")?;

    while inbox.is_running() {
        loop {
            match lines.try_recv() {
                Ok(line) => handle_line(inbox, &line, out)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    inbox.handle_event(InboxEvent::QuitRequested);
                    break;
                }
            }
        }
        if !inbox.is_running() {
            break;
        }

        if let Some(event) = event_source.next_event()? {
            inbox.handle_event(event);
        }

        render_changes(inbox, &changes, out)?;
    }

    tracing::info!("inbox console stopped");
    Ok(())
}

pub fn handle_line<D, F>(
    inbox: &mut InboxOrchestrator<D, F>,
    line: &str,
    out: &mut dyn Write,
) -> Result<()>
where
    D: Dispatcher,
    F: ChangeFeed,
{
    let Some(command) = parse_line(line) else {
        return Ok(());
    };

    let event = match command {
        ConsoleCommand::List => InboxEvent::LoadThreads,
        ConsoleCommand::Open(target) => match resolve_thread(inbox.registry(), &target) {
            Some(thread_id) => InboxEvent::OpenThread(thread_id),
            None => {
                writeln!(out, "No conversation matches {target}.")?;
                return Ok(());
            }
        },
        ConsoleCommand::Close => InboxEvent::CloseThread,
        ConsoleCommand::New(participant_ids) => InboxEvent::CreateThread(participant_ids),
        ConsoleCommand::Leave(target) => match target_or_open(inbox, target.as_deref(), out)? {
            Some(thread_id) => InboxEvent::LeaveThread(thread_id),
            None => return Ok(()),
        },
        ConsoleCommand::Delete(target) => match target_or_open(inbox, target.as_deref(), out)? {
            Some(thread_id) => InboxEvent::DeleteThread(thread_id),
            None => return Ok(()),
        },
        ConsoleCommand::Retry => {
            if inbox.composer().is_empty() {
                writeln!(out, "Nothing to retry.")?;
                return Ok(());
            }
            InboxEvent::SendDraft
        }
        ConsoleCommand::Help => {
            for help in HELP_LINES {
                writeln!(out, "  {help}")?;
            }
            return Ok(());
        }
        ConsoleCommand::Quit => InboxEvent::QuitRequested,
        ConsoleCommand::Send(text) => {
            if !inbox.store().is_open() {
                writeln!(out, "Open a conversation first (/open <n>).")?;
                return Ok(());
            }
            inbox.handle_event(InboxEvent::DraftChanged(text));
            InboxEvent::SendDraft
        }
        ConsoleCommand::Invalid(reason) => {
            writeln!(out, "{reason}")?;
            return Ok(());
        }
    };

    inbox.handle_event(event);
    Ok(())
}

fn target_or_open<D, F>(
    inbox: &InboxOrchestrator<D, F>,
    target: Option<&str>,
    out: &mut dyn Write,
) -> Result<Option<ThreadId>>
where
    D: Dispatcher,
    F: ChangeFeed,
{
    let resolved = match target {
        Some(target) => resolve_thread(inbox.registry(), target),
        None => inbox.store().thread_id().cloned(),
    };

    if resolved.is_none() {
        writeln!(out, "No conversation selected.")?;
    }
    Ok(resolved)
}

/// Accepts a 1-based list number or an unambiguous id prefix.
pub fn resolve_thread(registry: &ThreadRegistry, target: &str) -> Option<ThreadId> {
    let threads = registry.threads();

    if let Ok(number) = target.parse::<usize>() {
        if let Some(thread) = number.checked_sub(1).and_then(|index| threads.get(index)) {
            return Some(thread.id.clone());
        }
    }

    let mut matches = threads
        .iter()
        .filter(|thread| thread.id.as_str().starts_with(target));
    match (matches.next(), matches.next()) {
        (Some(thread), None) => Some(thread.id.clone()),
        _ => None,
    }
}

fn render_changes<D, F>(
    inbox: &InboxOrchestrator<D, F>,
    changes: &Receiver<InboxChange>,
    out: &mut dyn Write,
) -> Result<()>
where
    D: Dispatcher,
    F: ChangeFeed,
{
    let mut list_dirty = false;
    let mut messages_dirty = false;

    for change in changes.try_iter() {
        match change {
            InboxChange::ThreadsChanged => list_dirty = true,
            InboxChange::MessagesChanged => messages_dirty = true,
            InboxChange::ViewChanged(View::ThreadList) => list_dirty = true,
            InboxChange::ViewChanged(View::Thread(_)) => messages_dirty = true,
            InboxChange::DraftRestored(draft) => {
                writeln!(out, "Draft restored: {draft} (type /retry to resend)")?;
            }
            InboxChange::ThreadCreated(thread_id) => {
                writeln!(out, "Started conversation [{}].", thread_id.short())?;
            }
            InboxChange::Error(error) => writeln!(out, "{}", render::error_line(&error))?,
        }
    }

    match inbox.view() {
        View::ThreadList if list_dirty => {
            for line in render::thread_list_lines(inbox.registry()) {
                writeln!(out, "{line}")?;
            }
        }
        View::Thread(thread_id) if messages_dirty => {
            writeln!(out, "{}", render::thread_header(inbox.registry().get(thread_id)))?;
            for line in render::message_lines(inbox.store()) {
                writeln!(out, "{line}")?;
            }
        }
        _ => {}
    }

    out.flush()?;
    Ok(())
}
