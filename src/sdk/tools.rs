use crate::Result;
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{SessionUpdate, Tool, ToolChoice};
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tools the console knows how to render. Adding a tool means adding a variant
/// here, which forces every match over tool kinds to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    DisplayColorPalette,
    CreatePixelArt,
    ShowArrow,
    FindSimilarPeople,
}

impl ToolKind {
    pub const ALL: [Self; 4] = [
        Self::DisplayColorPalette,
        Self::CreatePixelArt,
        Self::ShowArrow,
        Self::FindSimilarPeople,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DisplayColorPalette => "display_color_palette",
            Self::CreatePixelArt => "create_pixel_art",
            Self::ShowArrow => "show_arrow",
            Self::FindSimilarPeople => "find_similar_people",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DisplayColorPalette => "Generate and display a color palette based on a theme",
            Self::CreatePixelArt => "Generate and display simple pixel art drawings",
            Self::ShowArrow => "Display an arrow pointing in the specified direction",
            Self::FindSimilarPeople => {
                "Start a game where users need to find people matching a specific criteria"
            }
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        let schema = match self {
            Self::DisplayColorPalette => parameter_schema::<PaletteArgs>(),
            Self::CreatePixelArt => parameter_schema::<PixelArtArgs>(),
            Self::ShowArrow => parameter_schema::<ArrowArgs>(),
            Self::FindSimilarPeople => parameter_schema::<GameArgs>(),
        };
        ToolDefinition {
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            schema,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PaletteArgs {
    /// Description of the theme for the color scheme.
    pub theme: String,
    /// Array of five hex color codes based on the theme.
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PixelArtArgs {
    /// Description of what the pixel art represents
    pub description: String,
    /// 2D array of hex color codes representing pixels (8x8 grid)
    pub pixels: Vec<Vec<String>>,
    /// Size of the pixel grid (8 for 8x8)
    #[schemars(range(min = 8, max = 8))]
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Left => "←",
            Self::Right => "→",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ArrowArgs {
    /// The direction the arrow should point
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GameArgs {
    /// The search criteria or category of people to find (e.g., 'AI enthusiasts', 'IIT alumni')
    pub query: String,
}

/// Failure to turn a tool call into something renderable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid {tool} data: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("Invalid pixel data format")]
    EmptyPixels,
}

/// A function call resolved to its tool, with typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    Palette(PaletteArgs),
    PixelArt(PixelArtArgs),
    Arrow(ArrowArgs),
    FindSimilarPeople(GameArgs),
    /// A tool this console has no renderer for; arguments are kept for a raw dump.
    Other { name: String, arguments: Value },
}

impl ToolInvocation {
    /// Resolve `name` and parse `arguments` (a JSON-encoded string).
    ///
    /// # Errors
    /// Returns a `RenderError` if the arguments do not match the tool's schema.
    pub fn parse(name: &str, arguments: &str) -> std::result::Result<Self, RenderError> {
        let Some(kind) = ToolKind::from_name(name) else {
            let arguments = serde_json::from_str(arguments)
                .unwrap_or_else(|_| Value::String(arguments.to_string()));
            return Ok(Self::Other { name: name.to_string(), arguments });
        };

        match kind {
            ToolKind::DisplayColorPalette => parse_args(kind, arguments).map(Self::Palette),
            ToolKind::CreatePixelArt => {
                let args: PixelArtArgs = parse_args(kind, arguments)?;
                if args.pixels.iter().all(Vec::is_empty) {
                    return Err(RenderError::EmptyPixels);
                }
                if args.size == 0 {
                    return Err(RenderError::InvalidArguments {
                        tool: kind.name().to_string(),
                        reason: "size must be positive".to_string(),
                    });
                }
                Ok(Self::PixelArt(args))
            }
            ToolKind::ShowArrow => parse_args(kind, arguments).map(Self::Arrow),
            ToolKind::FindSimilarPeople => parse_args(kind, arguments).map(Self::FindSimilarPeople),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> Option<ToolKind> {
        match self {
            Self::Palette(_) => Some(ToolKind::DisplayColorPalette),
            Self::PixelArt(_) => Some(ToolKind::CreatePixelArt),
            Self::Arrow(_) => Some(ToolKind::ShowArrow),
            Self::FindSimilarPeople(_) => Some(ToolKind::FindSimilarPeople),
            Self::Other { .. } => None,
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    kind: ToolKind,
    arguments: &str,
) -> std::result::Result<T, RenderError> {
    serde_json::from_str(arguments).map_err(|e| RenderError::InvalidArguments {
        tool: kind.name().to_string(),
        reason: e.to_string(),
    })
}

/// Self-contained parameter schema: no `$schema` header, subschemas inlined.
fn parameter_schema<T: JsonSchema>() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.meta_schema = None;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<T>()
}

#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub schema: RootSchema,
}

#[derive(Default, Clone, Debug)]
pub struct ToolRegistry {
    defs: Vec<ToolDefinition>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every tool the console renders.
    #[must_use]
    pub fn console() -> Self {
        Self {
            defs: ToolKind::ALL.into_iter().map(ToolKind::definition).collect(),
        }
    }

    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.defs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.defs.iter().any(|def| def.name == name)
    }

    /// Register a tool whose parameters are described by `TArgs`.
    pub fn register<TArgs: JsonSchema>(&mut self, name: &str, description: impl Into<String>) {
        self.defs.retain(|def| def.name != name);
        self.defs.push(ToolDefinition {
            name: name.to_string(),
            description: Some(description.into()),
            schema: parameter_schema::<TArgs>(),
        });
    }

    /// Convert all registered tools into protocol-level tool definitions.
    ///
    /// # Errors
    /// Returns an error if schema serialization fails.
    // Keep a single public error type for the SDK surface.
    #[allow(clippy::result_large_err)]
    pub fn try_as_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            let parameters = serde_json::to_value(&def.schema)
                .map_err(|e| crate::Error::InvalidClientEvent(e.to_string()))?;
            tools.push(Tool::Function {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters,
            });
        }
        Ok(tools)
    }

    /// The `session.update` that registers these tools with `tool_choice: auto`.
    ///
    /// # Errors
    /// Returns an error if schema serialization fails.
    #[allow(clippy::result_large_err)]
    pub fn session_update(&self) -> Result<ClientEvent> {
        let session = SessionUpdate {
            instructions: None,
            tools: Some(self.try_as_tools()?),
            tool_choice: Some(ToolChoice::default()),
        };
        Ok(ClientEvent::SessionUpdate {
            event_id: None,
            session: Box::new(session),
        })
    }
}
