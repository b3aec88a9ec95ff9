use serde::{Deserialize, Deserializer, Serialize, Serializer};
use super::models::{ArbitraryJson, Item, Response, Session};
use crate::error::ServerError;

/// Inbound realtime event.
///
/// Only the events the console reacts to are typed; everything else is kept as
/// raw JSON in `Unknown`. `event_id` is optional so hand-built or replayed events
/// without one still parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Error {
        event_id: Option<String>,
        error: ServerError,
    },
    SessionCreated {
        event_id: Option<String>,
        session: Session,
    },
    SessionUpdated {
        event_id: Option<String>,
        session: Session,
    },
    ResponseCreated {
        event_id: Option<String>,
        response: Response,
    },
    ResponseDone {
        event_id: Option<String>,
        response: Response,
    },
    ResponseOutputAudioTranscriptDone {
        event_id: Option<String>,
        response_id: String,
        item_id: String,
        output_index: u32,
        content_index: u32,
        transcript: String,
    },
    ResponseFunctionCallArgumentsDone {
        event_id: Option<String>,
        response_id: String,
        item_id: String,
        output_index: u32,
        call_id: String,
        name: Option<String>,
        arguments: String,
    },
    Unknown(ArbitraryJson),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
enum ServerEventRepr {
    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        error: ServerError,
    },
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default)]
        session: Session,
    },
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default)]
        session: Session,
    },
    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default)]
        response: Response,
    },
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default)]
        response: Response,
    },
    #[serde(rename = "response.output_audio_transcript.done")]
    ResponseOutputAudioTranscriptDone {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        response_id: String,
        item_id: String,
        output_index: u32,
        content_index: u32,
        transcript: String,
    },
    #[serde(rename = "response.function_call_arguments.done")]
    ResponseFunctionCallArgumentsDone {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        response_id: String,
        item_id: String,
        output_index: u32,
        call_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        arguments: String,
    },
}

impl From<ServerEventRepr> for ServerEvent {
    fn from(repr: ServerEventRepr) -> Self {
        match repr {
            ServerEventRepr::Error { event_id, error } => Self::Error { event_id, error },
            ServerEventRepr::SessionCreated { event_id, session } => Self::SessionCreated { event_id, session },
            ServerEventRepr::SessionUpdated { event_id, session } => Self::SessionUpdated { event_id, session },
            ServerEventRepr::ResponseCreated { event_id, response } => Self::ResponseCreated { event_id, response },
            ServerEventRepr::ResponseDone { event_id, response } => Self::ResponseDone { event_id, response },
            ServerEventRepr::ResponseOutputAudioTranscriptDone { event_id, response_id, item_id, output_index, content_index, transcript } => Self::ResponseOutputAudioTranscriptDone { event_id, response_id, item_id, output_index, content_index, transcript },
            ServerEventRepr::ResponseFunctionCallArgumentsDone { event_id, response_id, item_id, output_index, call_id, name, arguments } => Self::ResponseFunctionCallArgumentsDone { event_id, response_id, item_id, output_index, call_id, name, arguments },
        }
    }
}

impl Serialize for ServerEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = match self {
            Self::Unknown(value) => return value.serialize(serializer),
            Self::Error { event_id, error } => ServerEventRepr::Error { event_id: event_id.clone(), error: error.clone() },
            Self::SessionCreated { event_id, session } => ServerEventRepr::SessionCreated { event_id: event_id.clone(), session: session.clone() },
            Self::SessionUpdated { event_id, session } => ServerEventRepr::SessionUpdated { event_id: event_id.clone(), session: session.clone() },
            Self::ResponseCreated { event_id, response } => ServerEventRepr::ResponseCreated { event_id: event_id.clone(), response: response.clone() },
            Self::ResponseDone { event_id, response } => ServerEventRepr::ResponseDone { event_id: event_id.clone(), response: response.clone() },
            Self::ResponseOutputAudioTranscriptDone { event_id, response_id, item_id, output_index, content_index, transcript } => ServerEventRepr::ResponseOutputAudioTranscriptDone { event_id: event_id.clone(), response_id: response_id.clone(), item_id: item_id.clone(), output_index: *output_index, content_index: *content_index, transcript: transcript.clone() },
            Self::ResponseFunctionCallArgumentsDone { event_id, response_id, item_id, output_index, call_id, name, arguments } => ServerEventRepr::ResponseFunctionCallArgumentsDone { event_id: event_id.clone(), response_id: response_id.clone(), item_id: item_id.clone(), output_index: *output_index, call_id: call_id.clone(), name: name.clone(), arguments: arguments.clone() },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = ArbitraryJson::deserialize(deserializer)?;
        match ServerEventRepr::deserialize(value.clone()) {
            Ok(repr) => Ok(repr.into()),
            Err(err) => {
                tracing::debug!("Failed to parse ServerEvent: {err}");
                Ok(Self::Unknown(value))
            }
        }
    }
}

impl ServerEvent {
    /// Wire `type` tag; `None` for untyped payloads without one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        Some(match self {
            Self::Error { .. } => "error",
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::ResponseCreated { .. } => "response.created",
            Self::ResponseDone { .. } => "response.done",
            Self::ResponseOutputAudioTranscriptDone { .. } => "response.output_audio_transcript.done",
            Self::ResponseFunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            Self::Unknown(value) => return value.get("type").and_then(|v| v.as_str()),
        })
    }

    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Error { event_id, .. }
            | Self::SessionCreated { event_id, .. }
            | Self::SessionUpdated { event_id, .. }
            | Self::ResponseCreated { event_id, .. }
            | Self::ResponseDone { event_id, .. }
            | Self::ResponseOutputAudioTranscriptDone { event_id, .. }
            | Self::ResponseFunctionCallArgumentsDone { event_id, .. } => event_id.as_deref(),
            Self::Unknown(value) => value.get("event_id").and_then(|v| v.as_str()),
        }
    }

    /// The completed response carried by `response.done`.
    #[must_use]
    pub const fn done_response(&self) -> Option<&Response> {
        match self {
            Self::ResponseDone { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Function calls in a `response.done` output, in output order.
    pub fn function_calls(&self) -> impl Iterator<Item = &Item> + '_ {
        self.done_response()
            .map(Response::output_items)
            .unwrap_or_default()
            .iter()
            .filter(|item| matches!(item, Item::FunctionCall { .. }))
    }
}
