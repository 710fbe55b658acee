//! Push message envelope.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded server push event.
///
/// `Clone` produces a deep, independent copy; the keep-message interceptor
/// policy relies on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Action verb, e.g. "new", "change", "destroy".
    pub method: String,

    /// Identifier of the affected entity.
    pub id: String,

    /// Entity type; the dispatcher maps it to a table.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload.
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new(
        method: impl Into<String>,
        id: impl Into<String>,
        event_type: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            method: method.into(),
            id: id.into(),
            event_type: event_type.into(),
            data,
        }
    }

    /// Decode from a JSON value.
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    /// Decode from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    /// Classify the method into the default store operation it implies.
    pub fn method_kind(&self) -> Method {
        Method::parse(&self.method)
    }
}

/// Default store operation implied by a message's method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// "new" or "change": insert or merge the payload.
    Upsert,
    /// "destroy" or "remove": delete the row.
    Delete,
    /// Anything else: no default write.
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_lowercase().as_str() {
            "new" | "change" => Method::Upsert,
            "destroy" | "remove" => Method::Delete,
            _ => Method::Other,
        }
    }
}
