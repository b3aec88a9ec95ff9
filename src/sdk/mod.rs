//! Tool console built on the Realtime protocol.
//!
//! The console watches realtime events, renders the latest function call the
//! model made and runs the matching game. The low-level protocol types stay
//! reachable through `crate::protocol` when you need full control.

mod builder;
pub mod chat;
mod console;
mod embed;
pub mod game;
mod latch;
mod log;
pub mod panel;
pub mod render;
pub mod tools;
mod transcript;
mod transport;

pub use builder::ConsoleBuilder;
pub use console::{Console, ConsoleHandle, ConsoleView};
pub use embed::{Embedder, OpenAiEmbedder};
pub use game::{EmbeddingState, GameId, GameState};
pub use latch::Latch;
pub use log::EventLog;
pub use panel::{ActiveCall, PanelMsg, ToolPanel};
pub use render::{PanelView, ToolView};
pub use tools::{RenderError, ToolDefinition, ToolInvocation, ToolKind, ToolRegistry};
pub use transcript::Transcript;
pub use transport::{BoxFuture, Transport};
