use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_MODEL: &str = "gpt-realtime";

/// Arbitrary JSON payloads allowed by the API (e.g. metadata values).
pub type Metadata = HashMap<String, Value>;

/// JSON Schema / tool parameter definitions are intentionally untyped.
pub type JsonSchema = Value;

/// Free-form JSON payloads where the protocol is open-ended.
pub type ArbitraryJson = Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
}
