use crate::session::Command;

pub const HELP: &str = "\
Commands:
  /open <id>      open a conversation (closes the current one)
  /search <text>  highlight messages containing <text>
  /next, /prev    move between search matches
  /clear          clear the search
  /close          close the current conversation
  /quit           exit
  /help           show this help
Anything else is sent as a message. Start a line with // to send a leading slash.";

/// Console input events
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    // Passed to the session runtime
    Open(String),
    Search(String),
    ClearSearch,
    NextMatch,
    PreviousMatch,
    Close,
    Say(String),

    // Console-local
    Quit,
    Help,
    Unknown(String),
}

impl ConsoleEvent {
    /// Runtime commands for this event. Empty for console-local events.
    pub fn into_commands(self) -> Vec<Command> {
        match self {
            ConsoleEvent::Open(id) => vec![Command::Open(id)],
            ConsoleEvent::Search(query) => vec![Command::Search(query)],
            ConsoleEvent::ClearSearch => vec![Command::Search(String::new())],
            ConsoleEvent::NextMatch => vec![Command::NextMatch],
            ConsoleEvent::PreviousMatch => vec![Command::PreviousMatch],
            ConsoleEvent::Close => vec![Command::Close],
            // A line arrives fully typed: it was composed, then sent.
            ConsoleEvent::Say(text) => vec![Command::Input(text.clone()), Command::Send(text)],
            ConsoleEvent::Quit | ConsoleEvent::Help | ConsoleEvent::Unknown(_) => Vec::new(),
        }
    }
}

/// Parses one line of input. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ConsoleEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    if let Some(escaped) = line.strip_prefix("//") {
        return Some(ConsoleEvent::Say(format!("/{escaped}")));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(ConsoleEvent::Say(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let event = match name {
        "open" | "o" => ConsoleEvent::Open(arg.to_string()),
        "search" | "s" if arg.is_empty() => ConsoleEvent::ClearSearch,
        "search" | "s" => ConsoleEvent::Search(arg.to_string()),
        "clear" => ConsoleEvent::ClearSearch,
        "next" | "n" => ConsoleEvent::NextMatch,
        "prev" | "p" => ConsoleEvent::PreviousMatch,
        "close" => ConsoleEvent::Close,
        "quit" | "q" | "exit" => ConsoleEvent::Quit,
        "help" | "h" | "?" => ConsoleEvent::Help,
        other => ConsoleEvent::Unknown(other.to_string()),
    };
    Some(event)
}
