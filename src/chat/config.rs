//! Configuration types for chat sessions and the interactive client.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_TIMEOUT;

/// Default proxy endpoint address.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Command-line arguments for the loquax-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Proxy endpoint to talk to.
    #[arrrg(optional, "Proxy base URL (default: http://localhost:8000)", "URL")]
    pub url: Option<String>,

    /// Model to load at startup.
    #[arrrg(optional, "Model to load (default: qwen:1.8b)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Role the assistant should act as.
    #[arrrg(optional, "Role the assistant acts as", "ROLE")]
    pub role: Option<String>,

    /// Replay prior turns as context on every request.
    #[arrrg(flag, "Track the conversation across turns")]
    pub track: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Base URL of the proxy endpoint.
    pub base_url: String,

    /// Whether completed turns are persisted and replayed as context.
    pub track_conversation: bool,

    /// Optional system prompt sent with every turn.
    pub system_prompt: Option<String>,

    /// Optional role the assistant acts as.
    pub role: Option<String>,

    /// Request/stream timeout for each turn.
    pub timeout: Duration,
}

impl SessionConfig {
    /// Creates a new configuration with default values.
    ///
    /// Defaults:
    /// - Base URL: `http://localhost:8000`
    /// - Tracking: disabled
    /// - Timeout: 60 s
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            track_conversation: false,
            system_prompt: None,
            role: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the proxy base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enables or disables conversation tracking.
    pub fn with_tracking(mut self, track: bool) -> Self {
        self.track_conversation = track;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the role the assistant acts as.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets the request/stream timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&ChatArgs> for SessionConfig {
    fn from(args: &ChatArgs) -> Self {
        let mut config = SessionConfig::new().with_tracking(args.track);
        if let Some(url) = &args.url {
            config.base_url = url.clone();
        }
        config.system_prompt = args.system.clone();
        config.role = args.role.clone();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SessionConfig::new();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(!config.track_conversation);
        assert!(config.system_prompt.is_none());
        assert!(config.role.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn config_builder_pattern() {
        let config = SessionConfig::new()
            .with_base_url("http://127.0.0.1:9000")
            .with_tracking(true)
            .with_system_prompt("Be terse")
            .with_role("comedian")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert!(config.track_conversation);
        assert_eq!(config.system_prompt.as_deref(), Some("Be terse"));
        assert_eq!(config.role.as_deref(), Some("comedian"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_from_args() {
        let args = ChatArgs {
            url: Some("http://localhost:9999".to_string()),
            model: Some("gemma2:2b".to_string()),
            system: Some("You are helpful.".to_string()),
            role: None,
            track: true,
            no_color: true,
        };
        let config = SessionConfig::from(&args);
        assert_eq!(config.base_url, "http://localhost:9999");
        assert!(config.track_conversation);
        assert_eq!(config.system_prompt.as_deref(), Some("You are helpful."));
        assert!(config.role.is_none());
    }
}
