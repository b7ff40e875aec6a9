use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ids::StudentId;

#[derive(Debug, Parser)]
#[command(name = "campus-inbox", about = "Campus tutoring inbox (line console + one-shot commands)")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Student id to act as (overrides session.user_id)
    #[arg(short, long, global = true)]
    pub user: Option<StudentId>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the interactive console
    Chat,
    /// Print the conversation list
    Threads,
    /// Print the messages of a conversation
    Show { thread: String },
    /// Send a message to a conversation
    Send { thread: String, text: String },
    /// Start a conversation with the given students
    Create {
        #[arg(required = true)]
        participants: Vec<StudentId>,
    },
    /// Leave a conversation
    Leave { thread: String },
    /// Delete a conversation
    Delete { thread: String },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}
