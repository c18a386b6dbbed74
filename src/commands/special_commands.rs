//! Special commands parser for interactive chat mode
//!
//! This module parses the commands that can be entered during an
//! interactive chat session. Special commands allow users to:
//! - Start, list, select and delete conversations
//! - Toggle temporary mode
//! - Edit and resubmit the latest message
//! - Show or change the model
//! - Display the transcript, status and help
//!
//! Commands are prefixed with `/`. Command names are case-insensitive;
//! arguments keep their case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on the conversation store or the session rather
/// than being sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new regular conversation
    NewChat,

    /// Set temporary mode; `None` toggles it
    Temporary(Option<bool>),

    /// List conversations, newest first
    ListConversations,

    /// Select a conversation by its 1-based position in the list
    Select(usize),

    /// Delete a conversation by its 1-based position in the list
    Delete(usize),

    /// Edit the latest user message
    ///
    /// With text, replaces the message and resubmits. Without text, shows
    /// the message that would be edited.
    Edit(Option<String>),

    /// Show the active model
    ShowModel,

    /// Switch to a different model
    SwitchModel(String),

    /// List available models
    ListModels,

    /// Print the current conversation
    ShowTranscript,

    /// Display session status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the model.
    None,
}

/// Parse a 1-based list position
fn parse_position(command: &str, usage: &str, arg: &str) -> Result<usize, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        });
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        }),
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use chatshell::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewChat);
/// assert_eq!(parse_special_command("/select 2").unwrap(), SpecialCommand::Select(2));
/// assert_eq!(
///     parse_special_command("/temp on").unwrap(),
///     SpecialCommand::Temporary(Some(true))
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
///
/// // Invalid command returns error
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match (name.as_str(), arg) {
        ("/new", "") => Ok(SpecialCommand::NewChat),

        ("/temp" | "/temporary", "") => Ok(SpecialCommand::Temporary(None)),
        ("/temp" | "/temporary", arg) => match arg.to_lowercase().as_str() {
            "on" => Ok(SpecialCommand::Temporary(Some(true))),
            "off" => Ok(SpecialCommand::Temporary(Some(false))),
            _ => Err(CommandError::UnsupportedArgument {
                command: "/temp".to_string(),
                arg: arg.to_string(),
            }),
        },

        ("/list" | "/chats", "") => Ok(SpecialCommand::ListConversations),

        ("/select", arg) => {
            parse_position("/select", "/select <number>", arg).map(SpecialCommand::Select)
        }
        ("/delete", arg) => {
            parse_position("/delete", "/delete <number>", arg).map(SpecialCommand::Delete)
        }

        ("/edit", "") => Ok(SpecialCommand::Edit(None)),
        ("/edit", text) => Ok(SpecialCommand::Edit(Some(text.to_string()))),

        ("/model", "") => Ok(SpecialCommand::ShowModel),
        ("/model", model) => Ok(SpecialCommand::SwitchModel(model.to_string())),
        ("/models", "" | "list") => Ok(SpecialCommand::ListModels),

        ("/show", "") => Ok(SpecialCommand::ShowTranscript),
        ("/status", "") => Ok(SpecialCommand::ShowStatus),
        ("/help" | "/?", "") => Ok(SpecialCommand::Help),
        ("/exit" | "/quit", "") => Ok(SpecialCommand::Exit),

        // Known command with an argument it does not take
        (
            "/new" | "/list" | "/chats" | "/models" | "/show" | "/status" | "/help" | "/?"
            | "/exit" | "/quit",
            arg,
        ) => Err(CommandError::UnsupportedArgument {
            command: name.clone(),
            arg: arg.to_string(),
        }),

        // Unknown command starting with "/"
        _ => Err(CommandError::UnknownCommand(name)),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

CONVERSATIONS:
  /new            - Start a new conversation
  /list           - List conversations (newest first)
  /select <n>     - Switch to conversation number n
  /delete <n>     - Delete conversation number n
  /show           - Print the current conversation

TEMPORARY MODE:
  /temp           - Toggle temporary mode
  /temp on        - Start a temporary conversation
  /temp off       - Discard temporary conversations

EDITING:
  /edit           - Show the message that can be edited
  /edit <text>    - Replace the latest message with <text> and resend

MODELS:
  /model          - Show the active model
  /model <name>   - Switch to a different model
  /models         - List available models

SESSION:
  /status         - Show session status
  /help           - Show this help message
  /?              - Same as /help
  exit            - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Command names are case-insensitive
  - Regular text (not starting with /) is sent to the model
  - Only the most recent message you sent can be edited
  - Temporary conversations are discarded by /temp off
"#
    );
}
