//! Slash command parsing for the terminal host.
//!
//! Lines starting with `/` drive the widget's controls (tabs, speech
//! toggle, mic button) instead of being sent as messages.

/// A parsed terminal command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Switch to a tab.
    Tab(String),

    /// List the tabs.
    Tabs,

    /// Turn speech output on or off.  `None` toggles.
    Speech(Option<bool>),

    /// Simulate the recognizer hearing this text.
    Voice(String),

    /// Press the mic button.
    Mic,

    /// Redraw the active tab's history.
    History,

    /// Display help information.
    Help,

    /// Exit.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use tabchat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/tab chat2"), Some(ChatCommand::Tab("chat2".to_string())));
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "tab" => match argument {
            Some(tab) => ChatCommand::Tab(tab.to_string()),
            None => ChatCommand::Invalid("/tab requires a tab id".to_string()),
        },
        "tabs" => ChatCommand::Tabs,
        "tts" | "speech" => match argument {
            None => ChatCommand::Speech(None),
            Some(arg) => match parse_on_off(arg) {
                Some(on) => ChatCommand::Speech(Some(on)),
                None => ChatCommand::Invalid("/tts expects 'on' or 'off'".to_string()),
            },
        },
        "voice" => match argument {
            Some(text) => ChatCommand::Voice(text.to_string()),
            None => ChatCommand::Invalid("/voice requires the words to recognize".to_string()),
        },
        "mic" => ChatCommand::Mic,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /tab <id>              Switch to a chat tab
  /tabs                  List chat tabs
  /tts [on|off]          Turn speech output on or off (no argument toggles)
  /mic                   Start or stop voice input; while listening the next
                         line you type is taken as recognized speech
  /voice <text>          Recognize <text> as if it had been spoken
  /history               Redraw the current tab
  /help                  Show this help message
  /quit                  Exit"#
}
