//! # Console Adapter
//!
//! Line-oriented front-end. Reads stdin, turns lines into session commands,
//! and prints session events as they arrive.
//!
//! This is the only module that touches the terminal. Anything that can drive
//! a `SessionRuntime` through its command and event queues could replace it.

mod event;
mod render;

use std::io::Write;
use std::sync::Arc;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::TransportKind;
use crate::api::{HttpTranscriptClient, TranscriptSource};
use crate::core::config::ResolvedConfig;
use crate::session::{Command, SessionEvent, SessionRuntime, SessionSettings};
use crate::transport::{LoopbackTransport, Transport, WebSocketTransport};

pub use event::{ConsoleEvent, HELP, parse_line};
pub use render::{View, format_message, prompt};

/// Build a transport from the resolved config.
pub fn build_transport(config: &ResolvedConfig, kind: &TransportKind) -> Arc<dyn Transport> {
    match kind {
        TransportKind::Loopback => {
            Arc::new(LoopbackTransport::new().with_capacity(config.event_buffer))
        }
        TransportKind::WebSocket => Arc::new(
            WebSocketTransport::new(config.realtime_url.clone(), config.api_token.clone())
                .with_policy(config.reconnect.clone())
                .with_capacity(config.event_buffer),
        ),
    }
}

pub fn build_transcripts(config: &ResolvedConfig) -> Arc<dyn TranscriptSource> {
    Arc::new(HttpTranscriptClient::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
    ))
}

pub async fn run(config: ResolvedConfig, kind: TransportKind) -> std::io::Result<()> {
    let runtime = SessionRuntime::new(
        build_transcripts(&config),
        build_transport(&config, &kind),
        SessionSettings::from(&config),
    );
    let (commands, mut events, task) = runtime.spawn();

    match config.conversation.clone() {
        Some(conversation_id) => {
            info!("Opening {} from config", conversation_id);
            let _ = commands.send(Command::Open(conversation_id)).await;
        }
        None => println!("No conversation selected. {HELP}"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = View::default();
    let mut composing = false;

    'session: loop {
        show_prompt(&view, composing);
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                let Some(event) = parse_line(&line) else { continue };
                match event {
                    ConsoleEvent::Quit => break,
                    ConsoleEvent::Help => println!("{HELP}"),
                    ConsoleEvent::Unknown(name) => println!("unknown command /{name}, try /help"),
                    other => {
                        for command in other.into_commands() {
                            let sent = send_draining(&commands, command, &mut events, |event| {
                                handle_event(&mut view, &mut composing, event)
                            })
                            .await;
                            if !sent {
                                warn!("Session runtime is gone");
                                break 'session;
                            }
                        }
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                handle_event(&mut view, &mut composing, event);
            }
        }
    }

    send_draining(&commands, Command::Shutdown, &mut events, |event| {
        print_event(&mut view, &event)
    })
    .await;
    drop(commands);
    // keep draining so the runtime never blocks on a full event queue
    while let Some(event) = events.recv().await {
        print_event(&mut view, &event);
    }
    if let Err(e) = task.await {
        warn!("Session runtime ended abnormally: {}", e);
    }
    Ok(())
}

/// Queues `command` while still draining events. The runtime may itself be
/// waiting on a full event queue, so a plain `send` could wait forever.
async fn send_draining(
    commands: &mpsc::Sender<Command>,
    command: Command,
    events: &mut mpsc::Receiver<SessionEvent>,
    mut on_event: impl FnMut(SessionEvent),
) -> bool {
    loop {
        tokio::select! {
            permit = commands.reserve() => {
                let Ok(permit) = permit else { return false };
                permit.send(command);
                return true;
            }
            event = events.recv() => match event {
                Some(event) => on_event(event),
                None => return false,
            },
        }
    }
}

fn handle_event(view: &mut View, composing: &mut bool, event: SessionEvent) {
    if let SessionEvent::Composing(now) = event {
        *composing = now;
    }
    print_event(view, &event);
}

fn print_event(view: &mut View, event: &SessionEvent) {
    for line in view.render(event) {
        println!("\r{line}");
    }
}

fn show_prompt(view: &View, composing: bool) {
    print!("{}", prompt(view, composing));
    let _ = std::io::stdout().flush();
}
