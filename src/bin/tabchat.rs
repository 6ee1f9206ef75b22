//! Terminal host for the chat widget.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the server on the default port
//! tabchat
//!
//! # Another server, voice input sent as soon as it is recognized
//! tabchat --endpoint http://10.0.0.5:5000/ --auto-send
//!
//! # Settings from a file
//! tabchat --config widget.yaml
//! ```
//!
//! Lines are sent on the active tab.  Slash commands drive the other
//! controls; `/help` lists them.  A terminal cannot hear, so voice input is
//! typed: after `/mic` the next line is taken as recognized speech.
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use tabchat::chat::{ChatCommand, WidgetArgs, WidgetConfig, help_text, parse_command};
use tabchat::speech::{EngineEvent, InputOutcome, SpeechRecognizer};
use tabchat::{ChatApi, ChatWidget, HostServices, Result, SendOutcome, TerminalView};

/// Recognizer whose "speech" is the next line the user types.
///
/// Engine events are queued and handed to the widget by the REPL.
#[derive(Clone, Default)]
struct TypedRecognizer {
    events: Arc<Mutex<VecDeque<EngineEvent>>>,
}

impl TypedRecognizer {
    fn push(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push_back(event);
        }
    }

    fn pop(&self) -> Option<EngineEvent> {
        self.events.lock().ok().and_then(|mut events| events.pop_front())
    }
}

impl SpeechRecognizer for TypedRecognizer {
    fn start(&mut self, lang: &str) -> Result<()> {
        tracing::debug!(lang, "typed recognition started");
        Ok(())
    }

    fn stop(&mut self) {
        self.push(EngineEvent::Ended);
    }
}

type Widget = ChatWidget<TerminalView>;

/// Main entry point for the tabchat application.
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let (args, _) = WidgetArgs::from_command_line_relaxed("tabchat [OPTIONS]");
    let config = WidgetConfig::from_args(args)?;
    let use_color = config.use_color;

    let client = ChatApi::with_options(&config.base_url, config.timeout)?;
    let recognizer = TypedRecognizer::default();
    let host = HostServices::none().with_recognizer(Box::new(recognizer.clone()));
    let view = TerminalView::with_color(use_color);
    let mut widget = ChatWidget::new(config, Arc::new(client), host, view)?;
    let mut rl = DefaultEditor::new()?;

    println!("Tab Chat ({})", widget.config().base_url);
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let prompt = if widget.is_listening() {
            "(listening) > ".to_string()
        } else {
            format!("[{}] > ", widget.active_tab())
        };
        let initial = widget.view_mut().take_input().unwrap_or_default();
        let readline = rl.readline_with_initial(&prompt, (initial.as_str(), ""));

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if widget.is_listening() && parse_command(line).is_none() {
                    hear(&mut widget, &recognizer, line).await;
                    continue;
                }

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Tab(tab) => {
                            if !widget.switch_tab(&tab) && widget.active_tab() != tab.as_str() {
                                widget
                                    .view_mut()
                                    .print_error(&format!("No such tab: {tab}"));
                            }
                        }
                        ChatCommand::Tabs => print_tabs(&widget),
                        ChatCommand::Speech(on) => {
                            let want = on.unwrap_or(!widget.is_speech_enabled());
                            if want && !widget.capabilities().can_speak() {
                                widget
                                    .view_mut()
                                    .print_error("Reading aloud is not supported here");
                            } else {
                                widget.set_speech_enabled(want);
                            }
                        }
                        ChatCommand::Mic => {
                            let outcome = widget.press_mic().await;
                            if outcome == InputOutcome::Stopped {
                                drain(&mut widget, &recognizer).await;
                            }
                        }
                        ChatCommand::Voice(text) => {
                            if !widget.is_listening() {
                                widget.press_mic().await;
                            }
                            if widget.is_listening() {
                                hear(&mut widget, &recognizer, &text).await;
                            }
                        }
                        ChatCommand::History => widget.redraw(),
                        ChatCommand::Invalid(message) => {
                            widget.view_mut().print_error(&message);
                        }
                    }
                    continue;
                }

                widget.set_input(line);
                let outcome = widget.send_input().await;
                report(&mut widget, outcome);
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                widget
                    .view_mut()
                    .print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Feed `text` to the widget as a finished recognition.
async fn hear(widget: &mut Widget, recognizer: &TypedRecognizer, text: &str) {
    recognizer.push(EngineEvent::Transcript(text.to_string()));
    recognizer.push(EngineEvent::Ended);
    drain(widget, recognizer).await;
}

async fn drain(widget: &mut Widget, recognizer: &TypedRecognizer) {
    while let Some(event) = recognizer.pop() {
        let recognition = widget.recognition_event(event).await;
        if let Some(sent) = recognition.sent {
            report(widget, sent);
        }
    }
}

fn report(widget: &mut Widget, outcome: SendOutcome) {
    if let SendOutcome::Busy(tab) = outcome {
        widget
            .view_mut()
            .print_error(&format!("{tab} is still waiting for a reply"));
    }
}

fn print_tabs(widget: &Widget) {
    let active = widget.active_tab().clone();
    for tab in &widget.config().tabs {
        let marker = if tab.id == active { "*" } else { " " };
        let count = widget.messages(tab.id.as_str()).len();
        println!("    {marker} {:<10} {} ({count} messages)", tab.id.as_str(), tab.label());
    }
}
