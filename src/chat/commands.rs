//! Slash command parsing for the interactive chat client.
//!
//! Commands control the session locally and are never sent to the proxy.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Load a different model.
    Model(String),

    /// List the supported models.
    Models,

    /// Set or clear the system prompt.
    /// `None` clears the current system prompt.
    System(Option<String>),

    /// Set or clear the role the assistant acts as.
    Role(Option<String>),

    /// Enable or disable conversation tracking.
    Track(bool),

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::Models,
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "role" => ChatCommand::Role(argument.map(|s| s.to_string())),
        "track" => match argument.and_then(parse_on_off) {
            Some(enabled) => ChatCommand::Track(enabled),
            None => ChatCommand::Invalid("/track expects on or off".to_string()),
        },
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        unknown => ChatCommand::Invalid(format!(
            "Unknown command: /{unknown} (try /help for a list)"
        )),
    };
    Some(result)
}

fn parse_on_off(argument: &str) -> Option<bool> {
    if argument.eq_ignore_ascii_case("on") {
        Some(true)
    } else if argument.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}

/// Returns the help text listing available commands.
pub fn help_text() -> &'static str {
    "Available commands:\n\
     /help              Show this help\n\
     /quit              Exit the application\n\
     /clear             Clear conversation history\n\
     /model <name>      Load a different model\n\
     /models            List supported models\n\
     /system [prompt]   Set or clear the system prompt\n\
     /role [role]       Set or clear the assistant role\n\
     /track on|off      Enable or disable conversation tracking\n\
     /stats             Show session statistics"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_messages_are_not_commands() {
        assert!(parse_command("Hello there").is_none());
        assert!(parse_command("").is_none());
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
    }

    #[test]
    fn parses_model_with_argument() {
        assert_eq!(
            parse_command("/model gemma2:2b"),
            Some(ChatCommand::Model("gemma2:2b".to_string()))
        );
        assert!(matches!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parses_system_with_and_without_argument() {
        assert_eq!(
            parse_command("/system Be terse"),
            Some(ChatCommand::System(Some("Be terse".to_string())))
        );
        assert_eq!(parse_command("/system"), Some(ChatCommand::System(None)));
    }

    #[test]
    fn parses_track_on_off() {
        assert_eq!(parse_command("/track on"), Some(ChatCommand::Track(true)));
        assert_eq!(parse_command("/track OFF"), Some(ChatCommand::Track(false)));
        assert!(matches!(
            parse_command("/track maybe"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn unknown_command_is_invalid() {
        assert!(matches!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid(_))
        ));
    }
}
