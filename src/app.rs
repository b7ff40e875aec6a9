use std::{
    io::Write,
    sync::{mpsc, Arc},
    time::Duration,
};

use anyhow::Result;
use tokio::runtime::Runtime;

use crate::{
    backend::{dispatcher::RuntimeDispatcher, feed::LocalChangeFeed, rest::RestApi},
    cli::{Cli, Command},
    domain::{
        error::InboxError,
        ids::{OpenTicket, ThreadId},
        message_store::MessageStore,
        thread_registry::ThreadRegistry,
    },
    infra::error::AppError,
    ui::{self, event_source::ChannelEventSource, render},
    usecases::{
        bootstrap,
        context::AppContext,
        directory::Directory,
        inbox::InboxOrchestrator,
        load_threads::load_threads,
        manage_threads::{create_thread, delete_thread, leave_thread},
        open_thread::{open_thread, OpenThreadQuery},
        send_message::{prepare_message, submit_message, SendMessageCommand},
    },
};

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref(), cli.user)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    let api = RestApi::new(
        &context.config.api.base_url,
        &context.config.api.api_key,
        Duration::from_millis(context.config.api.timeout_ms),
    )
    .map_err(AppError::HttpClient)?;
    let directory = Directory::new(api.clone());
    let user = context.current_user;

    tracing::debug!(
        user_id = user,
        base_url = %context.config.api.base_url,
        "backend configured"
    );

    let mut stdout = std::io::stdout().lock();

    match cli.command_or_default() {
        Command::Chat => run_console(&context, &runtime, api, directory, &mut stdout)?,
        Command::Threads => {
            let threads = runtime
                .block_on(load_threads(&api, &directory, user))
                .map_err(InboxError::from)?;
            let mut registry = ThreadRegistry::default();
            registry.finish_loading(threads);
            write_lines(&mut stdout, render::thread_list_lines(&registry))?;
        }
        Command::Show { thread } => {
            let query = OpenThreadQuery::new(ThreadId::new(thread))
                .with_history_limit(context.config.inbox.history_limit);
            let opened = runtime.block_on(open_thread(&api, &directory, query));

            let ticket = OpenTicket::new(1);
            let mut store = MessageStore::new(user);
            store.begin_open(opened.thread_id.clone(), ticket);
            store.finish_open(ticket, opened)?;
            write_lines(&mut stdout, render::message_lines(&store))?;
        }
        Command::Send { thread, text } => {
            let message = prepare_message(SendMessageCommand {
                thread_id: ThreadId::new(thread),
                sender_id: user,
                text,
                sent_at: chrono::Utc::now(),
            })
            .map_err(InboxError::from)?;
            let record = runtime
                .block_on(submit_message(&api, &message))
                .map_err(InboxError::from)?;
            writeln!(stdout, "Sent ({}).", record.id)?;
        }
        Command::Create { participants } => {
            let thread = runtime
                .block_on(create_thread(&api, user, &participants))
                .map_err(|error| error.into_inbox_error("create conversation"))?;
            writeln!(stdout, "Created conversation {}.", thread.id)?;
        }
        Command::Leave { thread } => {
            runtime
                .block_on(leave_thread(&api, user, &ThreadId::new(thread)))
                .map_err(|error| error.into_inbox_error("leave conversation"))?;
            writeln!(stdout, "Left conversation.")?;
        }
        Command::Delete { thread } => {
            runtime
                .block_on(delete_thread(&api, &ThreadId::new(thread)))
                .map_err(|error| error.into_inbox_error("delete conversation"))?;
            writeln!(stdout, "Deleted conversation.")?;
        }
    }

    Ok(())
}

fn run_console(
    context: &AppContext,
    runtime: &Runtime,
    api: RestApi,
    directory: Directory<RestApi>,
    out: &mut dyn Write,
) -> Result<()> {
    let user = context.current_user;
    let (events_tx, events_rx) = mpsc::channel();

    let feed = LocalChangeFeed::new(
        runtime.handle().clone(),
        context.config.inbox.feed_capacity,
        events_tx.clone(),
    );
    let dispatcher = RuntimeDispatcher::new(
        runtime.handle().clone(),
        Arc::new(api),
        Arc::new(directory),
        user,
        context.config.inbox.history_limit,
        events_tx,
    )
    .with_echo(feed.publisher());
    let mut inbox = InboxOrchestrator::new(user, dispatcher, feed);

    let (lines_tx, lines_rx) = mpsc::channel();
    ui::event_source::spawn_line_reader(lines_tx);
    let mut source = ChannelEventSource::new(events_rx);

    ui::console::start(&mut inbox, &mut source, &lines_rx, out)
}

fn write_lines(out: &mut dyn Write, lines: Vec<String>) -> Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
