//! Interactive chat application for conversing with a local model through
//! the proxy.
//!
//! This binary provides a streaming REPL interface: tokens are printed as
//! they arrive through the session's `on_token` hook.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! loquax-chat
//!
//! # Pick a model and keep conversation context across turns
//! loquax-chat --model gemma2:2b --track
//!
//! # Set a system prompt
//! loquax-chat --system "You are a helpful coding assistant"
//!
//! # Disable colors (useful for piping output)
//! loquax-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/model <name>` - Load a different model
//! - `/models` - List supported models
//! - `/system [prompt]` - Set or clear the system prompt
//! - `/role [role]` - Set or clear the assistant role
//! - `/track on|off` - Toggle conversation tracking
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use loquax::chat::{
    ChatArgs, ChatCommand, ChatSession, PlainTextRenderer, Renderer, SessionConfig, help_text,
    parse_command,
};

/// Default model loaded at startup.
const DEFAULT_MODEL: &str = "qwen:1.8b";

/// Main entry point for the loquax-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("loquax-chat [OPTIONS]");
    let use_color = !args.no_color;
    let config = SessionConfig::from(&args);
    let mut renderer = PlainTextRenderer::with_color(use_color);

    let mut session = ChatSession::new(config)?;
    let model = args.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Err(err) = session.load_model(model) {
        renderer.print_error(&err.to_string());
        renderer.print_info("Supported models:");
        for model in ChatSession::available_models() {
            renderer.print_info(&format!("  - {model}"));
        }
        return Err(err.into());
    }

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    // Stream tokens to the terminal. Returning an error here aborts the
    // in-flight turn cooperatively when Ctrl+C was pressed.
    let interrupted_clone = interrupted.clone();
    let mut token_renderer = PlainTextRenderer::with_color(use_color);
    session.callbacks_mut().on_token(move |token| {
        if interrupted_clone.load(Ordering::Relaxed) {
            return Err("interrupted by user".into());
        }
        token_renderer.print_text(token);
        Ok(())
    });

    let mut rl = DefaultEditor::new()?;

    println!("loquax chat (model: {model})");
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear_conversation();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Model(name) => match session.load_model(&name) {
                            Ok(()) => renderer.print_info(&format!("Model changed to: {name}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Models => {
                            renderer.print_info("Supported models:");
                            for model in ChatSession::available_models() {
                                renderer.print_info(&format!("  - {model}"));
                            }
                        }
                        ChatCommand::System(prompt) => match prompt {
                            Some(prompt) => {
                                session.set_system_prompt(prompt.clone());
                                renderer.print_info(&format!("System prompt set to: {prompt}"));
                            }
                            None => {
                                session.clear_system_prompt();
                                renderer.print_info("System prompt cleared.");
                            }
                        },
                        ChatCommand::Role(role) => match role {
                            Some(role) => {
                                session.set_role(role.clone());
                                renderer.print_info(&format!("Role set to: {role}"));
                            }
                            None => {
                                session.clear_role();
                                renderer.print_info("Role cleared.");
                            }
                        },
                        ChatCommand::Track(enabled) => {
                            if enabled {
                                session.enable_conversation_tracking();
                                renderer.print_info("Conversation tracking enabled.");
                            } else {
                                session.disable_conversation_tracking();
                                renderer.print_info(
                                    "Conversation tracking disabled; history cleared.",
                                );
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send through the proxy
                renderer.print_label("Assistant:");
                match session.chat(line).await {
                    Ok(_) => renderer.finish_response(),
                    Err(_) if interrupted.load(Ordering::Relaxed) => {
                        renderer.print_interrupted();
                    }
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    match stats.model {
        Some(model) => println!("      Model: {model}"),
        None => println!("      Model: (none)"),
    }
    println!("      Conversation messages: {}", stats.conversation_len);
    println!(
        "      Tracking: {}",
        if stats.tracking { "enabled" } else { "disabled" }
    );
    println!(
        "      Turns: {} completed / {} failed",
        stats.turns_completed, stats.turns_failed
    );
    println!("      Chunks received: {}", stats.chunks_received);
    if let Some(duration) = stats.last_turn_duration {
        println!("      Last turn: {:.2}s", duration.as_secs_f64());
    }
    if let Some(duration) = stats.average_turn_duration {
        println!("      Average turn: {:.2}s", duration.as_secs_f64());
    }
}
