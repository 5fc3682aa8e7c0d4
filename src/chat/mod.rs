//! Chat application module for interactive conversations with Gemini.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! coporties adapter. It supports:
//!
//! - Streaming responses with real-time token display
//! - File attachments sent inline with a message
//! - Slash commands for session control
//! - Configurable model, system instruction, and sampling parameters
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing, the YAML settings file, and configuration
//! - [`session`]: Conversation ownership and turn submission
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatArgsError, ChatConfig, ChatFileConfig};
pub use session::{ChatSession, SessionStats, SubmitOutcome};
