use crate::domain::ids::StudentId;

pub const HELP_LINES: [&str; 9] = [
    "/list               reload conversations",
    "/open <n|id>        open a conversation by list number or id prefix",
    "/close              back to the conversation list",
    "/new <id> [id...]   start a conversation with students",
    "/leave [n|id]       leave a conversation (default: the open one)",
    "/delete [n|id]      delete a conversation (default: the open one)",
    "/retry              resend the restored draft",
    "/quit               exit",
    "anything else is sent to the open conversation",
];

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Open(String),
    Close,
    New(Vec<StudentId>),
    Leave(Option<String>),
    Delete(Option<String>),
    Retry,
    Help,
    Quit,
    Send(String),
    Invalid(String),
}

pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Some(ConsoleCommand::Send(line.to_owned()));
    };

    let mut words = rest.split_whitespace();
    let command = words.next().unwrap_or_default();
    let argument = words.next().map(str::to_owned);

    let parsed = match command {
        "list" => ConsoleCommand::List,
        "open" => match argument {
            Some(target) => ConsoleCommand::Open(target),
            None => ConsoleCommand::Invalid("usage: /open <n|id>".to_owned()),
        },
        "close" => ConsoleCommand::Close,
        "new" => parse_new(argument.into_iter().chain(words.map(str::to_owned))),
        "leave" => ConsoleCommand::Leave(argument),
        "delete" => ConsoleCommand::Delete(argument),
        "retry" => ConsoleCommand::Retry,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => ConsoleCommand::Invalid(format!("unknown command /{other}; try /help")),
    };

    Some(parsed)
}

fn parse_new(ids: impl Iterator<Item = String>) -> ConsoleCommand {
    let mut parsed = Vec::new();
    for id in ids {
        match id.parse::<StudentId>() {
            Ok(value) => parsed.push(value),
            Err(_) => return ConsoleCommand::Invalid(format!("not a student id: {id}")),
        }
    }

    if parsed.is_empty() {
        return ConsoleCommand::Invalid("usage: /new <id> [id...]".to_owned());
    }
    ConsoleCommand::New(parsed)
}
