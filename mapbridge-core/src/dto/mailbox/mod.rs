//! Mailbox documents
//!
//! The bridge and its producer exchange whole JSON documents through an
//! inbox/outbox pair. The inbox carries a command and a batch of tasks, the
//! outbox carries the same tasks with results filled in.

use serde::{Deserialize, Serialize};

use crate::domain::task::Task;

/// File name of the inbox document inside the input directory
pub const INBOX_FILE_NAME: &str = "input_tasks.json";

/// File name of the outbox document inside the output directory
pub const OUTBOX_FILE_NAME: &str = "output_tasks.json";

/// Commands understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Stop,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Run => "run",
            Command::Stop => "stop",
        }
    }
}

impl std::str::FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Command::Run),
            "stop" => Ok(Command::Stop),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// A command string the bridge does not understand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl std::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Command unknown: {}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

/// Pending batch written by the producer
///
/// `command` stays a raw string so an unknown command can be reported
/// instead of failing to parse the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxDocument {
    pub command: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl InboxDocument {
    /// A batch of tasks to run under the given batch id
    pub fn run(uuid: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            command: Command::Run.as_str().to_string(),
            uuid: uuid.into(),
            tasks,
        }
    }

    /// A request for the bridge to shut down
    pub fn stop() -> Self {
        Self {
            command: Command::Stop.as_str().to_string(),
            uuid: String::new(),
            tasks: Vec::new(),
        }
    }

    pub fn command(&self) -> Result<Command, UnknownCommand> {
        self.command.parse()
    }
}

/// Results of one processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxDocument {
    pub uuid: String,
    pub tasks: Vec<Task>,
}
