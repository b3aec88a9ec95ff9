use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{ArbitraryJson, ItemStatus, Role};

/// A single part of a message item. Unknown part types are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    InputText {
        text: String,
    },
    InputAudio {
        audio: Option<String>,
        transcript: Option<String>,
    },
    OutputText {
        text: String,
    },
    OutputAudio {
        audio: Option<String>,
        transcript: Option<String>,
    },
    Text {
        text: String,
    },
    Audio {
        audio: Option<String>,
        transcript: Option<String>,
    },
    Unknown(ArbitraryJson),
}

impl ContentPart {
    /// The spoken transcript carried by audio parts.
    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        match self {
            Self::InputAudio { transcript, .. }
            | Self::OutputAudio { transcript, .. }
            | Self::Audio { transcript, .. } => transcript.as_deref(),
            Self::Unknown(value) => value.get("transcript").and_then(|v| v.as_str()),
            Self::InputText { .. } | Self::OutputText { .. } | Self::Text { .. } => None,
        }
    }
}

impl std::fmt::Display for ContentPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::InputText { .. } => "input_text",
            Self::InputAudio { .. } => "input_audio",
            Self::OutputText { .. } => "output_text",
            Self::OutputAudio { .. } => "output_audio",
            Self::Text { .. } => "text",
            Self::Audio { .. } => "audio",
            Self::Unknown(_) => "unknown",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPartRepr {
    InputText {
        text: String,
    },
    InputAudio {
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    OutputText {
        text: String,
    },
    OutputAudio {
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    Text {
        text: String,
    },
    Audio {
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
}

impl From<ContentPartRepr> for ContentPart {
    fn from(repr: ContentPartRepr) -> Self {
        match repr {
            ContentPartRepr::InputText { text } => Self::InputText { text },
            ContentPartRepr::InputAudio { audio, transcript } => Self::InputAudio { audio, transcript },
            ContentPartRepr::OutputText { text } => Self::OutputText { text },
            ContentPartRepr::OutputAudio { audio, transcript } => Self::OutputAudio { audio, transcript },
            ContentPartRepr::Text { text } => Self::Text { text },
            ContentPartRepr::Audio { audio, transcript } => Self::Audio { audio, transcript },
        }
    }
}

impl Serialize for ContentPart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = match self {
            Self::Unknown(value) => return value.serialize(serializer),
            Self::InputText { text } => ContentPartRepr::InputText { text: text.clone() },
            Self::InputAudio { audio, transcript } => ContentPartRepr::InputAudio {
                audio: audio.clone(),
                transcript: transcript.clone(),
            },
            Self::OutputText { text } => ContentPartRepr::OutputText { text: text.clone() },
            Self::OutputAudio { audio, transcript } => ContentPartRepr::OutputAudio {
                audio: audio.clone(),
                transcript: transcript.clone(),
            },
            Self::Text { text } => ContentPartRepr::Text { text: text.clone() },
            Self::Audio { audio, transcript } => ContentPartRepr::Audio {
                audio: audio.clone(),
                transcript: transcript.clone(),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentPart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = ArbitraryJson::deserialize(deserializer)?;
        match ContentPartRepr::deserialize(value.clone()) {
            Ok(repr) => Ok(repr.into()),
            Err(err) => {
                tracing::debug!("Failed to parse ContentPart: {err}");
                Ok(Self::Unknown(value))
            }
        }
    }
}

/// Manual (de)serialization preserves unknown variants as raw JSON while keeping
/// strong typing for known items.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Message {
        id: Option<String>,
        status: Option<ItemStatus>,
        role: Role,
        content: Vec<ContentPart>,
    },
    FunctionCall {
        id: Option<String>,
        status: Option<ItemStatus>,
        name: String,
        call_id: Option<String>,
        arguments: String,
    },
    FunctionCallOutput {
        id: Option<String>,
        call_id: String,
        output: String,
    },
    Unknown(ArbitraryJson),
}

impl Item {
    /// First content part of a message item.
    #[must_use]
    pub fn first_content(&self) -> Option<&ContentPart> {
        match self {
            Self::Message { content, .. } => content.first(),
            Self::Unknown(_) | Self::FunctionCall { .. } | Self::FunctionCallOutput { .. } => None,
        }
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Message { .. } => "message",
            Self::FunctionCall { .. } => "function_call",
            Self::FunctionCallOutput { .. } => "function_call_output",
            Self::Unknown(_) => "unknown",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ItemRepr {
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<ItemStatus>,
        #[serde(default)]
        role: Role,
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<ItemStatus>,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        arguments: String,
    },
    FunctionCallOutput {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        call_id: String,
        output: String,
    },
}

impl From<ItemRepr> for Item {
    fn from(repr: ItemRepr) -> Self {
        match repr {
            ItemRepr::Message { id, status, role, content } => Self::Message { id, status, role, content },
            ItemRepr::FunctionCall { id, status, name, call_id, arguments } => {
                Self::FunctionCall { id, status, name, call_id, arguments }
            }
            ItemRepr::FunctionCallOutput { id, call_id, output } => {
                Self::FunctionCallOutput { id, call_id, output }
            }
        }
    }
}

impl Serialize for Item {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = match self {
            Self::Unknown(value) => return value.serialize(serializer),
            Self::Message { id, status, role, content } => ItemRepr::Message {
                id: id.clone(),
                status: *status,
                role: *role,
                content: content.clone(),
            },
            Self::FunctionCall { id, status, name, call_id, arguments } => ItemRepr::FunctionCall {
                id: id.clone(),
                status: *status,
                name: name.clone(),
                call_id: call_id.clone(),
                arguments: arguments.clone(),
            },
            Self::FunctionCallOutput { id, call_id, output } => ItemRepr::FunctionCallOutput {
                id: id.clone(),
                call_id: call_id.clone(),
                output: output.clone(),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = ArbitraryJson::deserialize(deserializer)?;
        match ItemRepr::deserialize(value.clone()) {
            Ok(repr) => Ok(repr.into()),
            Err(err) => {
                tracing::debug!("Failed to parse Item: {err}");
                Ok(Self::Unknown(value))
            }
        }
    }
}
