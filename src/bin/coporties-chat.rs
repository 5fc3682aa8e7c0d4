//! Interactive chat application for conversing with Gemini.
//!
//! This binary provides a streaming REPL interface for chatting with Gemini
//! models via the `generateContent` API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings; the key comes from GEMINI_API_KEY
//! coporties-chat
//!
//! # Specify a model
//! coporties-chat --model gemini-2.5-pro
//!
//! # Set a system instruction and sampling values
//! coporties-chat --system "You are a helpful coding assistant" --temperature 0.3
//!
//! # Load defaults from a YAML file
//! coporties-chat --config chat.yaml
//!
//! # Disable colors (useful for piping output)
//! coporties-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/attach <paths>` - Attach files to the next message
//! - `/clear` - Clear conversation history
//! - `/model <name>` - Change the model
//! - `/system [text]` - Set or clear the system instruction
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use coporties::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SubmitOutcome,
    help_text, parse_command,
};
use coporties::{Gemini, KnownModel, Model, ModelProvider};

/// Main entry point for the coporties-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("coporties-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let client = Gemini::new(None)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    if let Err(err) = client.ensure_credentials() {
        renderer.print_error(&err.to_string());
    }

    let mut session = ChatSession::new(client, &config);
    let mut rl = DefaultEditor::new()?;

    println!("Gemini Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");

    loop {
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
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model_name) => {
                            let model = Model::from(model_name.as_str());
                            renderer.print_info(&format!("Model changed to: {model}"));
                            session.set_model(model);
                        }
                        ChatCommand::Models => {
                            print_models(session.model());
                        }
                        ChatCommand::System(instruction) => {
                            session.set_system_instruction(instruction.clone());
                            match instruction {
                                Some(text) => renderer
                                    .print_info(&format!("System instruction set to: {}", text)),
                                None => renderer.print_info("System instruction cleared."),
                            }
                        }
                        ChatCommand::Temperature(value) => match session.set_temperature(value) {
                            Ok(()) => {
                                renderer.print_info(&format!("temperature set to {:.2}", value))
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::TopP(value) => match session.set_top_p(value) {
                            Ok(()) => renderer.print_info(&format!("top_p set to {:.2}", value)),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::TopK(value) => {
                            session.set_top_k(value);
                            renderer.print_info(&format!("top_k set to {value}"));
                        }
                        ChatCommand::Attach(paths) => {
                            let report = session.attach(&paths);
                            if report.is_complete() {
                                renderer.print_info(&format!(
                                    "Attached {} file(s).",
                                    report.attachments.len()
                                ));
                            }
                            for failure in &report.failures {
                                renderer.print_error(&failure.error.to_string());
                            }
                            renderer.print_attachments(session.conversation().attachments());
                        }
                        ChatCommand::Detach(number) => match session.detach(number) {
                            Ok(()) => {
                                renderer.print_attachments(session.conversation().attachments())
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Attachments => {
                            renderer.print_attachments(session.conversation().attachments());
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                if let SubmitOutcome::Failed(err) = session.send(line, &mut renderer).await
                    && err.is_retryable()
                {
                    renderer.print_info("This may be temporary; send the message again to retry.");
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
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_models(current: &Model) {
    println!("    Known models:");
    for known in KnownModel::ALL {
        let marker = if *current == Model::Known(known) {
            "*"
        } else {
            " "
        };
        println!("    {marker} {known}");
    }
}

fn print_stats<P: ModelProvider>(session: &ChatSession<P>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Pending attachments: {}", stats.pending_attachments);
    println!(
        "      Total tokens: {} prompt / {} generated / {} billed ({} requests, {} failed)",
        stats.total_prompt_tokens,
        stats.total_candidates_tokens,
        stats.total_tokens,
        stats.total_requests,
        stats.failed_requests
    );
    if let Some(usage) = stats.last_turn_usage {
        println!(
            "      Last turn tokens: {} prompt / {} generated",
            usage.prompt_token_count, usage.candidates_token_count
        );
    }
}

fn print_config<P: ModelProvider>(session: &ChatSession<P>) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!("      Temperature: {}", describe_float(stats.temperature));
    println!("      Top-p: {}", describe_float(stats.top_p));
    println!("      Top-k: {}", stats.top_k);
    if let Some(instruction) = stats.system_instruction.as_deref() {
        println!("      System instruction: {}", instruction);
    } else {
        println!("      System instruction: (none)");
    }
    println!(
        "      Color: {}",
        if session.use_color() { "on" } else { "off" }
    );
}

fn describe_float(value: f32) -> String {
    format!("{value:.2}")
}
