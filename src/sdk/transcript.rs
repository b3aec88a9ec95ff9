use crate::protocol::models::{ContentPart, Item};
use crate::protocol::server_events::ServerEvent;

use super::log::EventLog;

/// Latest spoken transcript. Only the most recent one is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a line already on screen, e.g. a greeting.
    #[must_use]
    pub fn seeded(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Look at the newest logged event.
    pub fn observe(&mut self, log: &EventLog) -> bool {
        log.latest().is_some_and(|event| self.handle_event(event))
    }

    /// Take the transcript from `response.done` at `output[0].content[0]`.
    /// Returns whether the text changed.
    pub fn handle_event(&mut self, event: &ServerEvent) -> bool {
        let Some(transcript) = event
            .done_response()
            .and_then(|response| response.output_items().first())
            .and_then(Item::first_content)
            .and_then(ContentPart::transcript)
        else {
            return false;
        };
        if self.text == transcript {
            return false;
        }
        transcript.clone_into(&mut self.text);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> ServerEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn takes_first_output_transcript() {
        let mut transcript = Transcript::seeded("hello");
        let done = event(json!({
            "type": "response.done",
            "response": { "output": [
                { "type": "message", "role": "assistant",
                  "content": [{ "type": "output_audio", "transcript": "Here is a palette." }] }
            ]}
        }));
        assert!(transcript.handle_event(&done));
        assert_eq!(transcript.text(), "Here is a palette.");
        assert!(!transcript.handle_event(&done));
    }

    #[test]
    fn ignores_function_call_outputs() {
        let mut transcript = Transcript::seeded("hello");
        let done = event(json!({
            "type": "response.done",
            "response": { "output": [
                { "type": "function_call", "name": "show_arrow", "arguments": "{}" }
            ]}
        }));
        assert!(!transcript.handle_event(&done));
        assert_eq!(transcript.text(), "hello");
    }

    #[test]
    fn observe_reads_newest_event() {
        let mut log = EventLog::new();
        log.push(event(json!({
            "type": "response.done",
            "response": { "output": [
                { "type": "message", "role": "assistant",
                  "content": [{ "type": "audio", "transcript": "older" }] }
            ]}
        })));
        log.push(event(json!({ "type": "session.created", "session": {} })));
        let mut transcript = Transcript::new();
        assert!(!transcript.observe(&log));
        assert_eq!(transcript.text(), "");
    }
}
