//! Text renderers for tool calls.
//!
//! Each renderer turns typed arguments into a plain view value; `Display` draws
//! that view for a terminal. Views are comparable so callers can diff renders.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::game::{EmbeddingState, GameState};
use super::panel::ActiveCall;
use super::tools::{ArrowArgs, PaletteArgs, PixelArtArgs, RenderError, ToolInvocation};

/// How many embedding dimensions the game shows.
pub const EMBEDDING_PREVIEW_DIMS: usize = 20;

const INACTIVE_HINT: &str = "Start the session to use these tools...";
const IDLE_HINT: &str = "Ask for a color palette, pixel art, direction arrow, or find similar people...";
const LEGEND_SYMBOLS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    Inactive,
    Idle,
    Active {
        name: String,
        /// Function calls in the same response that were superseded by this one.
        skipped_calls: usize,
        body: ToolView,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolView {
    Palette(PaletteView),
    PixelArt(PixelArtView),
    Arrow(ArrowView),
    Game(GameView),
    Raw(RawView),
    Invalid(InvalidView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swatch {
    pub color: String,
    pub is_hex: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteView {
    pub theme: String,
    pub swatches: Vec<Swatch>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelArtView {
    pub description: String,
    pub columns: usize,
    pub cells: Vec<String>,
    /// Distinct colors in first-seen order.
    pub legend: Vec<String>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrowView {
    pub direction: String,
    pub glyph: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameView {
    pub query: String,
    pub seconds_remaining: u32,
    pub finished: bool,
    /// Present only once the countdown has finished.
    pub embedding: Option<EmbeddingView>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingView {
    Loading,
    Ready { preview: Vec<f32>, dimensions: usize },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawView {
    pub json: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidView {
    pub tool: String,
    pub message: String,
}

impl InvalidView {
    #[must_use]
    pub fn new(tool: &str, err: &RenderError) -> Self {
        Self { tool: tool.to_string(), message: err.to_string() }
    }
}

/// Render a parsed invocation that has no live state.
///
/// Returns `None` for the matching game, which is drawn from its running
/// [`GameState`] by [`render_game`].
#[must_use]
pub fn render_invocation(call: &ActiveCall, invocation: &ToolInvocation) -> Option<ToolView> {
    match invocation {
        ToolInvocation::Palette(args) => Some(ToolView::Palette(render_palette(call, args))),
        ToolInvocation::PixelArt(args) => Some(ToolView::PixelArt(render_pixel_art(call, args))),
        ToolInvocation::Arrow(args) => Some(ToolView::Arrow(render_arrow(*args))),
        ToolInvocation::FindSimilarPeople(_) => None,
        ToolInvocation::Other { .. } => Some(ToolView::Raw(render_raw(call))),
    }
}

#[must_use]
pub fn render_palette(call: &ActiveCall, args: &PaletteArgs) -> PaletteView {
    PaletteView {
        theme: args.theme.clone(),
        swatches: args
            .colors
            .iter()
            .map(|color| Swatch { color: color.clone(), is_hex: is_hex_color(color) })
            .collect(),
        raw: raw_json(call),
    }
}

#[must_use]
pub fn render_pixel_art(call: &ActiveCall, args: &PixelArtArgs) -> PixelArtView {
    let cells: Vec<String> = args.pixels.iter().flatten().cloned().collect();
    let mut seen = HashSet::new();
    let legend = cells
        .iter()
        .filter(|color| seen.insert(color.as_str()))
        .cloned()
        .collect();
    PixelArtView {
        description: args.description.clone(),
        columns: usize::from(args.size),
        cells,
        legend,
        raw: raw_json(call),
    }
}

#[must_use]
pub fn render_arrow(args: ArrowArgs) -> ArrowView {
    ArrowView {
        direction: args.direction.as_str().to_string(),
        glyph: args.direction.glyph().to_string(),
    }
}

#[must_use]
pub fn render_game(state: &GameState) -> GameView {
    let finished = state.is_finished();
    let embedding = finished.then(|| match state.embedding() {
        EmbeddingState::Loading => EmbeddingView::Loading,
        EmbeddingState::Ready(vector) => EmbeddingView::Ready {
            preview: vector.iter().take(EMBEDDING_PREVIEW_DIMS).copied().collect(),
            dimensions: vector.len(),
        },
        EmbeddingState::Failed(_) => EmbeddingView::Failed,
    });
    GameView {
        query: state.query().to_string(),
        seconds_remaining: state.seconds_remaining(),
        finished,
        embedding,
    }
}

#[must_use]
pub fn render_raw(call: &ActiveCall) -> RawView {
    RawView { json: raw_json(call) }
}

fn raw_json(call: &ActiveCall) -> String {
    let value = serde_json::json!({
        "type": "function_call",
        "name": call.name,
        "call_id": call.call_id,
        "arguments": call.arguments,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| Value::Null.to_string())
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AI Creative Tools")?;
        match self {
            Self::Inactive => writeln!(f, "{INACTIVE_HINT}"),
            Self::Idle => writeln!(f, "{IDLE_HINT}"),
            Self::Active { name, skipped_calls, body } => {
                writeln!(f, "Active Function: {name}")?;
                if *skipped_calls > 0 {
                    writeln!(f, "({skipped_calls} earlier call(s) in this response skipped)")?;
                }
                write!(f, "{body}")
            }
        }
    }
}

impl fmt::Display for ToolView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Palette(view) => write!(f, "{view}"),
            Self::PixelArt(view) => write!(f, "{view}"),
            Self::Arrow(view) => write!(f, "{view}"),
            Self::Game(view) => write!(f, "{view}"),
            Self::Raw(view) => writeln!(f, "{}", view.json),
            Self::Invalid(view) => writeln!(f, "{}", view.message),
        }
    }
}

impl fmt::Display for PaletteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Theme: {}", self.theme)?;
        for swatch in &self.swatches {
            let marker = if swatch.is_hex { "" } else { " (not a hex color)" };
            writeln!(f, "[ {} ]{marker}", swatch.color)?;
        }
        writeln!(f, "{}", self.raw)
    }
}

impl PixelArtView {
    fn symbol(&self, color: &str) -> char {
        self.legend.iter().position(|c| c == color).map_or('?', legend_symbol)
    }
}

/// ASCII letters and digits first, then further alphanumeric code points, so
/// every legend entry gets its own single-character symbol.
fn legend_symbol(index: usize) -> char {
    LEGEND_SYMBOLS.get(index).map_or_else(
        || {
            ('\u{c0}'..=char::MAX)
                .filter(|c| c.is_alphanumeric())
                .nth(index - LEGEND_SYMBOLS.len())
                .unwrap_or('?')
        },
        |b| char::from(*b),
    )
}

impl fmt::Display for PixelArtView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        for row in self.cells.chunks(self.columns.max(1)) {
            let line: String = row.iter().map(|color| self.symbol(color)).collect();
            writeln!(f, "{line}")?;
        }
        writeln!(f, "Color Palette Used:")?;
        for color in &self.legend {
            writeln!(f, "  {} {color}", self.symbol(color))?;
        }
        Ok(())
    }
}

impl fmt::Display for ArrowView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Direction: {}", self.direction)?;
        writeln!(f, "{}", self.glyph)
    }
}

impl fmt::Display for GameView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Find someone who is:")?;
        writeln!(f, "{}", self.query)?;
        if self.finished {
            writeln!(f, "Time's Up!")?;
        } else {
            writeln!(f, "{}", self.seconds_remaining)?;
        }
        match &self.embedding {
            None => Ok(()),
            Some(EmbeddingView::Loading) => {
                writeln!(f, "Query Embedding:")?;
                writeln!(f, "Still generating embedding...")
            }
            Some(EmbeddingView::Failed) => {
                writeln!(f, "Query Embedding:")?;
                writeln!(f, "Failed to generate embedding")
            }
            Some(EmbeddingView::Ready { preview, dimensions }) => {
                writeln!(f, "Query Embedding:")?;
                let values: Vec<String> = preview.iter().map(|v| format!("{v:.4}")).collect();
                writeln!(f, "{} ...", values.join(" "))?;
                writeln!(f, "{dimensions} dimensions")
            }
        }
    }
}
