//! The "find similar people" matching game.
//!
//! A game is a countdown plus a concurrent embedding fetch. Both run as
//! separate tasks that report back to the panel loop tagged with a [`GameId`];
//! the panel drops messages whose id no longer matches the mounted game.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::embed::Embedder;
use super::latch::Latch;
use super::panel::PanelMsg;
use crate::protocol::client_events::ClientEvent;

pub const GAME_SECONDS: u32 = 10;
pub const TICK: Duration = Duration::from_secs(1);
pub const FOLLOW_UP_INSTRUCTIONS: &str = "Ask if they found someone matching the criteria";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingState {
    Loading,
    Ready(Vec<f32>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct GameState {
    query: String,
    seconds_remaining: u32,
    finished: Latch,
    embedding: EmbeddingState,
}

impl GameState {
    #[must_use]
    pub fn new(query: impl Into<String>, seconds: u32) -> Self {
        Self {
            query: query.into(),
            seconds_remaining: seconds,
            finished: Latch::new(),
            embedding: EmbeddingState::Loading,
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns the follow-up `response.create` on the tick that reaches zero and
    /// `None` on every other tick, including any after the game finished.
    pub fn tick(&mut self) -> Option<ClientEvent> {
        if self.finished.is_set() {
            return None;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 && self.finished.try_set() {
            return Some(ClientEvent::response_with_instructions(FOLLOW_UP_INSTRUCTIONS));
        }
        None
    }

    /// Record the embedding outcome. Only the first outcome sticks.
    pub fn settle_embedding(&mut self, result: std::result::Result<Vec<f32>, String>) {
        if self.embedding != EmbeddingState::Loading {
            return;
        }
        self.embedding = match result {
            Ok(vector) => EmbeddingState::Ready(vector),
            Err(reason) => EmbeddingState::Failed(reason),
        };
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub const fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished.is_set()
    }

    #[must_use]
    pub const fn embedding(&self) -> &EmbeddingState {
        &self.embedding
    }
}

/// A mounted game. Dropping it stops its tasks.
#[derive(Debug)]
pub struct Game {
    id: GameId,
    state: GameState,
    timer: JoinHandle<()>,
    fetch: Option<JoinHandle<()>>,
}

impl Game {
    /// Mount a game: start the countdown and, when an embedder is available,
    /// the embedding fetch.
    pub fn start(
        id: GameId,
        query: &str,
        embedder: Option<Arc<dyn Embedder>>,
        wake: &UnboundedSender<PanelMsg>,
    ) -> Self {
        let mut state = GameState::new(query, GAME_SECONDS);
        let fetch = match embedder {
            Some(embedder) => Some(spawn_fetch(id, query.to_string(), embedder, wake.clone())),
            None => {
                state.settle_embedding(Err("no embedding service configured".to_string()));
                None
            }
        };
        let timer = spawn_timer(id, GAME_SECONDS, wake.clone());
        tracing::debug!(game = id.0, query, "game started");
        Self { id, state, timer, fetch }
    }

    #[must_use]
    pub const fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.timer.abort();
        if let Some(fetch) = &self.fetch {
            fetch.abort();
        }
    }
}

fn spawn_timer(id: GameId, ticks: u32, wake: UnboundedSender<PanelMsg>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + TICK, TICK);
        for _ in 0..ticks {
            interval.tick().await;
            if wake.send(PanelMsg::Tick { game: id }).is_err() {
                return;
            }
        }
    })
}

fn spawn_fetch(
    id: GameId,
    query: String,
    embedder: Arc<dyn Embedder>,
    wake: UnboundedSender<PanelMsg>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = embedder.embed(&query).await.map_err(|e| {
            tracing::warn!(game = id.0, "embedding failed: {e}");
            e.to_string()
        });
        let _ = wake.send(PanelMsg::EmbeddingSettled { game: id, result });
    })
}
