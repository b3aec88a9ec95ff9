use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use super::embed::Embedder;
use super::log::{DEFAULT_LOG_CAPACITY, EventLog};
use super::panel::ToolPanel;
use super::render::PanelView;
use super::tools::ToolRegistry;
use super::transcript::Transcript;
use super::transport::Transport;
use crate::config::DEFAULT_TOOLS_DELAY;
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{ContentPart, Item, Role};
use crate::protocol::server_events::ServerEvent;
use crate::{Error, Result};

/// What the console shows: the tool panel and the latest transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    pub panel: PanelView,
    pub transcript: String,
}

impl std::fmt::Display for ConsoleView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.panel)?;
        writeln!(f, "---")?;
        writeln!(f, "{}", self.transcript)
    }
}

pub(super) struct ConsoleOptions {
    pub registry: ToolRegistry,
    pub tools_delay: Duration,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub greeting: Option<String>,
    pub log_capacity: usize,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            registry: ToolRegistry::console(),
            tools_delay: DEFAULT_TOOLS_DELAY,
            embedder: None,
            greeting: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

#[derive(Clone)]
pub struct ConsoleHandle {
    sender: mpsc::Sender<Command>,
}

/// A running console. All state lives in one background task; this value
/// talks to it over a command channel and watches its rendered view.
#[derive(Debug)]
pub struct Console {
    sender: mpsc::Sender<Command>,
    views: watch::Receiver<ConsoleView>,
}

impl Console {
    #[must_use]
    pub fn handle(&self) -> ConsoleHandle {
        ConsoleHandle { sender: self.sender.clone() }
    }

    /// Subscribe to rendered views. A new value is published after every change.
    #[must_use]
    pub fn views(&self) -> watch::Receiver<ConsoleView> {
        self.views.clone()
    }

    /// The most recently rendered view.
    #[must_use]
    pub fn view(&self) -> ConsoleView {
        self.views.borrow().clone()
    }

    /// Start or end the session.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped.
    pub async fn set_session_active(&self, active: bool) -> Result<()> {
        self.handle().set_session_active(active).await
    }

    /// Send a user text message.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped or the send fails.
    pub async fn say(&self, text: &str) -> Result<()> {
        self.handle().say(text).await
    }

    /// Ask the model to respond.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped or the send fails.
    pub async fn respond(&self) -> Result<()> {
        self.handle().respond().await
    }

    /// Send a raw protocol event.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped or the send fails.
    pub async fn send_raw(&self, event: ClientEvent) -> Result<()> {
        self.handle().send_raw(event).await
    }

    /// Stop the console task. The final view shows the session as inactive.
    ///
    /// # Errors
    /// Returns an error if the console task has already stopped.
    pub async fn stop(&self) -> Result<()> {
        self.sender.send(Command::Stop).await.map_err(|_| Error::ConnectionClosed)
    }

    pub(super) fn from_transport(mut transport: Box<dyn Transport>, options: ConsoleOptions) -> Self {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(64);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();

        let (mut panel, mut wake_rx) = ToolPanel::new(options.registry, outbound_tx);
        panel = panel.with_tools_delay(options.tools_delay);
        if let Some(embedder) = options.embedder {
            panel = panel.with_embedder(embedder);
        }
        let mut transcript = options.greeting.map_or_else(Transcript::new, Transcript::seeded);
        let mut log = EventLog::with_capacity(options.log_capacity);

        let (view_tx, view_rx) = watch::channel(ConsoleView {
            panel: panel.render(),
            transcript: transcript.text().to_string(),
        });
        let publish = move |panel: &ToolPanel, transcript: &Transcript| {
            view_tx.send_replace(ConsoleView {
                panel: panel.render(),
                transcript: transcript.text().to_string(),
            });
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(Command::Send { event, respond }) => {
                                let result = transport.send(event).await;
                                let _ = respond.send(result);
                            }
                            Some(Command::SetActive { active }) => {
                                if panel.set_session_active(active) {
                                    publish(&panel, &transcript);
                                }
                            }
                            Some(Command::Stop) | None => break,
                        }
                    }
                    Some(msg) = wake_rx.recv() => {
                        if panel.handle_message(msg) {
                            publish(&panel, &transcript);
                        }
                    }
                    Some(event) = outbound_rx.recv() => {
                        let kind = event.kind();
                        if let Err(e) = transport.send(event).await {
                            tracing::warn!(kind, "failed to send event: {e}");
                        }
                    }
                    event = transport.next_event() => {
                        match event {
                            Ok(Some(evt)) => {
                                if let ServerEvent::Error { error, .. } = &evt {
                                    tracing::warn!(code = ?error.code, "server error: {}", error.message);
                                }
                                log.push(evt);
                                let panel_changed = panel.observe(&log);
                                let transcript_changed = transcript.observe(&log);
                                if panel_changed || transcript_changed {
                                    publish(&panel, &transcript);
                                }
                            }
                            Ok(None) => {
                                tracing::info!("realtime connection closed");
                                break;
                            }
                            Err(e) => {
                                tracing::warn!("realtime connection failed: {e}");
                                break;
                            }
                        }
                    }
                }
            }
            panel.set_session_active(false);
            publish(&panel, &transcript);
        });

        Self { sender: cmd_tx, views: view_rx }
    }
}

impl ConsoleHandle {
    /// Start or end the session.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped.
    pub async fn set_session_active(&self, active: bool) -> Result<()> {
        self.sender
            .send(Command::SetActive { active })
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Send a user text message.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped or the send fails.
    pub async fn say(&self, text: &str) -> Result<()> {
        let item = Item::Message {
            id: None,
            status: None,
            role: Role::User,
            content: vec![ContentPart::InputText { text: text.to_string() }],
        };
        self.send_raw(ClientEvent::ConversationItemCreate {
            event_id: None,
            previous_item_id: None,
            item: Box::new(item),
        })
        .await
    }

    /// Ask the model to respond.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped or the send fails.
    pub async fn respond(&self) -> Result<()> {
        self.send_raw(ClientEvent::ResponseCreate { event_id: None, response: None }).await
    }

    /// Send a raw protocol event.
    ///
    /// # Errors
    /// Returns an error if the console task has stopped or the send fails.
    pub async fn send_raw(&self, event: ClientEvent) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Send { event, respond: tx })
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}

enum Command {
    Send { event: ClientEvent, respond: oneshot::Sender<Result<()>> },
    SetActive { active: bool },
    Stop,
}
