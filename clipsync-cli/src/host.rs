//! Interactive host around a [`SessionController`].
//!
//! Reads one command per line, drives the controller, and prints a reply
//! per command. Session events are printed by a separate task
//! ([`forward_events`]) so a slow terminal never stalls the session.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use clipsync_core::network::Connector;
use clipsync_core::{ClipboardBridge, SessionController, SessionEvent};

use crate::config::ClipSyncConfig;

pub const HELP: &str = "\
commands:
  text <content>    send text to the peer
  image <path>      send a PNG file to the peer
  clip              send the current clipboard text
  pause | resume    stop / restart applying peer content
  start [address]   connect (defaults to the configured peer)
  stop              disconnect
  status            show the session status
  quit              stop and exit";

// ── HostCommand ──────────────────────────────────────────────────

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Text(String),
    Image(PathBuf),
    Clip,
    Pause,
    Resume,
    Start(Option<String>),
    Stop,
    Status,
    Help,
    Quit,
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest),
            None => (line.trim_end(), ""),
        };
        let arg = rest.trim();

        match verb {
            // Verbatim after the separating space.
            "text" => Ok(Self::Text(rest.to_string())),
            "image" if !arg.is_empty() => Ok(Self::Image(PathBuf::from(arg))),
            "image" => Err("usage: image <path>".into()),
            "clip" => Ok(Self::Clip),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "start" => Ok(Self::Start((!arg.is_empty()).then(|| arg.to_string()))),
            "stop" => Ok(Self::Stop),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err("empty command".into()),
            other => Err(format!("unknown command {other:?}, try `help`")),
        }
    }
}

// ── ClipSyncHost ─────────────────────────────────────────────────

/// Owns the controller and the command loop.
pub struct ClipSyncHost<C: Connector> {
    config: ClipSyncConfig,
    controller: SessionController<C>,
    running: Arc<AtomicBool>,
}

impl<C: Connector> ClipSyncHost<C> {
    pub fn new(
        config: ClipSyncConfig,
        connector: C,
        bridge: ClipboardBridge,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (controller, events) =
            SessionController::new(connector, bridge, config.to_session_config());
        let host = Self {
            config,
            controller,
            running: Arc::new(AtomicBool::new(false)),
        };
        (host, events)
    }

    /// Obtain a handle that can be used to stop the host from another
    /// task (Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn controller(&self) -> &SessionController<C> {
        &self.controller
    }

    /// Run one command and describe the outcome in one line.
    pub async fn execute(&mut self, command: HostCommand) -> String {
        match command {
            HostCommand::Text(text) => {
                let chars = text.chars().count();
                match self.controller.send_text(text) {
                    Ok(()) => format!("sent text ({chars} chars)"),
                    Err(e) => format!("error: {e}"),
                }
            }
            HostCommand::Image(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let len = bytes.len();
                    match self.controller.send_image(bytes) {
                        Ok(()) => format!("sent image ({len} bytes)"),
                        Err(e) => format!("error: {e}"),
                    }
                }
                Err(e) => format!("error: cannot read {}: {e}", path.display()),
            },
            HostCommand::Clip => match self.controller.send_clipboard() {
                Ok(()) => "sent clipboard text".into(),
                Err(e) => format!("error: {e}"),
            },
            HostCommand::Pause => match self.controller.pause_sync() {
                Ok(()) => "pausing".into(),
                Err(e) => format!("error: {e}"),
            },
            HostCommand::Resume => match self.controller.resume_sync() {
                Ok(()) => "resuming".into(),
                Err(e) => format!("error: {e}"),
            },
            HostCommand::Start(address) => {
                let address = match address.or_else(|| self.config.peer_address().map(str::to_string)) {
                    Some(address) => address,
                    None => return "error: no peer address configured, use `start <address>`".into(),
                };
                match self.controller.start_sync(&address).await {
                    Ok(status) => format!("status: {status}"),
                    Err(e) => format!("error: {e}"),
                }
            }
            HostCommand::Stop => format!("status: {}", self.controller.stop_sync().await),
            HostCommand::Status => match self.controller.peer() {
                Some(peer) => format!("status: {} (peer {peer})", self.controller.status()),
                None => format!("status: {}", self.controller.status()),
            },
            HostCommand::Help => HELP.into(),
            HostCommand::Quit => {
                self.running.store(false, Ordering::SeqCst);
                format!("status: {}", self.controller.stop_sync().await)
            }
        }
    }

    /// Run the command loop until `quit`, end of input, or the stop
    /// handle is cleared. The session is stopped on the way out.
    pub async fn run<R>(&mut self, input: R) -> Result<(), Box<dyn std::error::Error>>
    where
        R: AsyncBufRead + Unpin,
    {
        self.running.store(true, Ordering::SeqCst);

        if self.config.network.auto_start && self.config.peer_address().is_some() {
            println!("{}", self.execute(HostCommand::Start(None)).await);
        }

        let mut lines = input.lines();
        while self.running.load(Ordering::SeqCst) {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = Self::wait_for_stop(&self.running) => break,
            };
            let Some(line) = line else {
                info!("input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<HostCommand>() {
                Ok(command) => println!("{}", self.execute(command).await),
                Err(e) => println!("{e}"),
            }
        }

        self.running.store(false, Ordering::SeqCst);
        let status = self.controller.stop_sync().await;
        info!(%status, "clipsync host stopped");
        Ok(())
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Events ───────────────────────────────────────────────────────

/// One printable line per event, plain or JSON.
pub fn render_event(event: &SessionEvent, json: bool) -> String {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("cannot serialize event: {e}");
                event.to_string()
            }
        }
    } else {
        format!("* {event}")
    }
}

/// Print events until the controller goes away.
pub async fn forward_events(mut events: mpsc::UnboundedReceiver<SessionEvent>, json: bool) {
    while let Some(event) = events.recv().await {
        println!("{}", render_event(&event, json));
    }
}

// ── Tests ────────────────────────────────────────────────────────
