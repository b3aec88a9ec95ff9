//! The tool panel: dispatches function calls from `response.done` to renderers
//! and owns the mounted tool.
//!
//! The panel is driven by a single task. Anything that happens later (game
//! ticks, embedding results, the delayed tool registration) comes back as a
//! [`PanelMsg`] on the wake channel returned by [`ToolPanel::new`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::embed::Embedder;
use super::game::{Game, GameId};
use super::latch::Latch;
use super::log::EventLog;
use super::render::{InvalidView, PanelView, ToolView, render_game, render_invocation};
use super::tools::{ToolInvocation, ToolRegistry};
use crate::config::DEFAULT_TOOLS_DELAY;
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::Item;
use crate::protocol::server_events::ServerEvent;

/// Deferred work reporting back to the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelMsg {
    Tick { game: GameId },
    EmbeddingSettled { game: GameId, result: Result<Vec<f32>, String> },
    SendTools { epoch: u64 },
}

/// The function call currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCall {
    pub name: String,
    pub call_id: Option<String>,
    pub arguments: String,
}

impl ActiveCall {
    #[must_use]
    pub fn from_item(item: &Item) -> Option<Self> {
        match item {
            Item::FunctionCall { name, call_id, arguments, .. } => Some(Self {
                name: name.clone(),
                call_id: call_id.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        }
    }
}

enum Mounted {
    Static(ToolView),
    Game(Game),
}

pub struct ToolPanel {
    registry: ToolRegistry,
    tools_delay: Duration,
    embedder: Option<Arc<dyn Embedder>>,
    outbound: UnboundedSender<ClientEvent>,
    wake: UnboundedSender<PanelMsg>,
    session_active: bool,
    session_created: bool,
    tools_sent: Latch,
    epoch: u64,
    pending_send: Option<JoinHandle<()>>,
    active: Option<ActiveCall>,
    skipped_calls: usize,
    mounted: Option<Mounted>,
    next_game: u64,
}

impl ToolPanel {
    /// Create a panel that sends outbound events on `outbound`.
    ///
    /// The returned receiver must be drained into [`ToolPanel::handle_message`].
    #[must_use]
    pub fn new(
        registry: ToolRegistry,
        outbound: UnboundedSender<ClientEvent>,
    ) -> (Self, UnboundedReceiver<PanelMsg>) {
        let (wake, wake_rx) = mpsc::unbounded_channel();
        let panel = Self {
            registry,
            tools_delay: DEFAULT_TOOLS_DELAY,
            embedder: None,
            outbound,
            wake,
            session_active: false,
            session_created: false,
            tools_sent: Latch::new(),
            epoch: 0,
            pending_send: None,
            active: None,
            skipped_calls: 0,
            mounted: None,
            next_game: 0,
        };
        (panel, wake_rx)
    }

    #[must_use]
    pub fn with_tools_delay(mut self, delay: Duration) -> Self {
        self.tools_delay = delay;
        self
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub const fn is_session_active(&self) -> bool {
        self.session_active
    }

    #[must_use]
    pub const fn active_call(&self) -> Option<&ActiveCall> {
        self.active.as_ref()
    }

    /// Mark the session started or ended. Ending it clears the mounted tool and
    /// re-arms the one-shot tool registration. Starting it after the server has
    /// already announced `session.created` schedules the registration right away.
    /// Returns whether the view changed.
    pub fn set_session_active(&mut self, active: bool) -> bool {
        if self.session_active == active {
            return false;
        }
        self.session_active = active;
        if active {
            if self.session_created && self.tools_sent.try_set() {
                self.schedule_tools();
            }
        } else {
            self.tools_sent.reset();
            self.epoch += 1;
            if let Some(pending) = self.pending_send.take() {
                pending.abort();
            }
            self.active = None;
            self.skipped_calls = 0;
            self.mounted = None;
        }
        tracing::info!(active, "session state changed");
        true
    }

    /// Look at the newest logged event.
    pub fn observe(&mut self, log: &EventLog) -> bool {
        log.latest().is_some_and(|event| self.handle_event(event))
    }

    /// React to one inbound event. Returns whether the view changed.
    pub fn handle_event(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::SessionCreated { .. } => {
                self.session_created = true;
                if self.session_active && self.tools_sent.try_set() {
                    self.schedule_tools();
                }
                false
            }
            ServerEvent::ResponseDone { .. } => {
                let calls: Vec<ActiveCall> =
                    event.function_calls().filter_map(ActiveCall::from_item).collect();
                let skipped = calls.len().saturating_sub(1);
                let Some(call) = calls.into_iter().last() else {
                    return false;
                };
                if skipped > 0 {
                    tracing::warn!(skipped, kept = %call.name, "multiple function calls in one response; showing the last");
                }
                self.mount(call, skipped);
                true
            }
            _ => false,
        }
    }

    /// Apply deferred work. Messages for a game that is no longer mounted, or a
    /// registration scheduled in an earlier session, are dropped.
    pub fn handle_message(&mut self, msg: PanelMsg) -> bool {
        match msg {
            PanelMsg::SendTools { epoch } => {
                if epoch != self.epoch || !self.session_active {
                    tracing::debug!(epoch, current = self.epoch, "discarding stale tool registration");
                    return false;
                }
                self.pending_send = None;
                match self.registry.session_update() {
                    Ok(update) => {
                        tracing::info!(tools = self.registry.definitions().len(), "registering tools");
                        self.emit(update);
                    }
                    Err(e) => tracing::warn!("failed to build tool registration: {e}"),
                }
                false
            }
            PanelMsg::Tick { game } => {
                let Some(mounted) = self.game_mut(game) else {
                    tracing::debug!(game = game.0, "discarding tick for unmounted game");
                    return false;
                };
                if let Some(follow_up) = mounted.state_mut().tick() {
                    self.emit(follow_up);
                }
                true
            }
            PanelMsg::EmbeddingSettled { game, result } => {
                let Some(mounted) = self.game_mut(game) else {
                    tracing::debug!(game = game.0, "discarding embedding for unmounted game");
                    return false;
                };
                mounted.state_mut().settle_embedding(result);
                true
            }
        }
    }

    #[must_use]
    pub fn render(&self) -> PanelView {
        if !self.session_active {
            return PanelView::Inactive;
        }
        let (Some(call), Some(mounted)) = (&self.active, &self.mounted) else {
            return PanelView::Idle;
        };
        let body = match mounted {
            Mounted::Static(view) => view.clone(),
            Mounted::Game(game) => ToolView::Game(render_game(game.state())),
        };
        PanelView::Active { name: call.name.clone(), skipped_calls: self.skipped_calls, body }
    }

    fn mount(&mut self, call: ActiveCall, skipped: usize) {
        // Drop the old mount first so its game timer stops before a new one starts.
        self.mounted = None;
        self.mounted = match ToolInvocation::parse(&call.name, &call.arguments) {
            Ok(ToolInvocation::FindSimilarPeople(args)) => {
                self.next_game += 1;
                Some(Mounted::Game(Game::start(
                    GameId(self.next_game),
                    &args.query,
                    self.embedder.clone(),
                    &self.wake,
                )))
            }
            Ok(invocation) => render_invocation(&call, &invocation).map(Mounted::Static),
            Err(err) => {
                tracing::warn!(tool = %call.name, "cannot render tool call: {err}");
                Some(Mounted::Static(ToolView::Invalid(InvalidView::new(&call.name, &err))))
            }
        };
        self.active = Some(call);
        self.skipped_calls = skipped;
    }

    fn game_mut(&mut self, id: GameId) -> Option<&mut Game> {
        match &mut self.mounted {
            Some(Mounted::Game(game)) if game.id() == id => Some(game),
            _ => None,
        }
    }

    fn schedule_tools(&mut self) {
        self.epoch += 1;
        let epoch = self.epoch;
        let delay = self.tools_delay;
        let wake = self.wake.clone();
        if let Some(previous) = self.pending_send.take() {
            previous.abort();
        }
        self.pending_send = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wake.send(PanelMsg::SendTools { epoch });
        }));
    }

    fn emit(&self, event: ClientEvent) {
        let kind = event.kind();
        if self.outbound.send(event).is_err() {
            tracing::warn!(kind, "outbound channel closed; dropping event");
        }
    }
}

impl Drop for ToolPanel {
    fn drop(&mut self) {
        if let Some(pending) = self.pending_send.take() {
            pending.abort();
        }
    }
}
