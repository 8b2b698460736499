//! Chat session orchestration and the interactive client's plumbing.
//!
//! The module is organized into several components:
//!
//! - [`config`]: session configuration and CLI argument parsing
//! - [`session`]: the chat session state machine
//! - [`continuous`]: the background listen-and-chat driver
//! - [`commands`]: slash command parsing for the REPL
//! - [`render`]: terminal output rendering

mod commands;
mod config;
mod continuous;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, SessionConfig};
pub use continuous::ContinuousChat;
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatSession, SessionStats};
