pub mod common;
pub mod items;
pub mod response;
pub mod session;
pub mod tools;

pub use common::{ArbitraryJson, DEFAULT_MODEL, ItemStatus, JsonSchema, Metadata, Role};
pub use items::{ContentPart, Item};
pub use response::{ConversationMode, Response, ResponseConfig, ResponseStatus};
pub use session::{Session, SessionUpdate};
pub use tools::{Tool, ToolChoice, ToolChoiceMode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_defaults_to_auto() {
        let serialized = serde_json::to_string(&ToolChoice::default()).unwrap();
        assert_eq!(serialized, "\"auto\"");
    }

    #[test]
    fn empty_session_update_serializes_empty() {
        let serialized = serde_json::to_string(&SessionUpdate::default()).unwrap();
        assert_eq!(serialized, "{}");
    }
}
