//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history and anything being composed.
    Clear,

    /// Change the model.
    Model(String),

    /// List the known models.
    Models,

    /// Set or clear the system instruction.
    /// `None` clears the current system instruction.
    System(Option<String>),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Set the top-p value.
    TopP(f32),

    /// Set the top-k value.
    TopK(u32),

    /// Queue files for the next message.
    Attach(Vec<String>),

    /// Drop a queued attachment by its 1-based position.
    Detach(usize),

    /// List the queued attachments.
    Attachments,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (message count, current model, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use coporties::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model gemini-2.5-pro").is_some());
/// assert!(parse_command("Hello, Gemini!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "new" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::Models,
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "temperature" | "temp" => {
            parse_f32_command(argument, 0.0, 2.0, ChatCommand::Temperature, "/temperature")
        }
        "top_p" => parse_f32_command(argument, 0.0, 1.0, ChatCommand::TopP, "/top_p"),
        "top_k" => match argument {
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) => ChatCommand::TopK(value),
                Err(_) => ChatCommand::Invalid("/top_k expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/top_k requires a value".to_string()),
        },
        "attach" => match argument {
            Some(arg) => ChatCommand::Attach(arg.split_whitespace().map(String::from).collect()),
            None => ChatCommand::Invalid("/attach requires at least one file path".to_string()),
        },
        "detach" => match argument.map(|arg| arg.parse::<usize>()) {
            Some(Ok(index)) if index > 0 => ChatCommand::Detach(index),
            Some(_) => ChatCommand::Invalid(
                "/detach expects the attachment number shown by /attachments".to_string(),
            ),
            None => ChatCommand::Invalid("/detach requires an attachment number".to_string()),
        },
        "attachments" | "files" => ChatCommand::Attachments,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_f32_command<F>(
    argument: Option<&str>,
    min: f32,
    max: f32,
    constructor: F,
    name: &str,
) -> ChatCommand
where
    F: Fn(f32) -> ChatCommand,
{
    match argument {
        Some(arg) => match parse_f32_in_range(arg, min, max) {
            Ok(value) => constructor(value),
            Err(err) => ChatCommand::Invalid(format!("{name} {err}")),
        },
        None => ChatCommand::Invalid(format!("{name} requires a value")),
    }
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /model <name>          Change the model (e.g., /model gemini-2.5-pro)
  /models                List known models
  /system [text]         Set system instruction (no argument clears it)
  /temperature <v>       Set temperature 0.0-2.0
  /top_p <v>             Set top-p 0.0-1.0
  /top_k <n>             Set top-k
  /attach <path>...      Attach files to the next message
  /detach <n>            Remove attachment number n
  /attachments           List pending attachments
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
