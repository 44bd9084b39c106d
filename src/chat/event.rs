use bytes::Bytes;
use serde::Serialize;

use crate::llm::LlmError;

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// What the relay hands to the client, one server-sent event each.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Content {
        content: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
    #[serde(skip)]
    Done,
}

impl RelayEvent {
    pub fn content(text: impl Into<String>) -> Self {
        RelayEvent::Content { content: text.into() }
    }

    pub fn from_llm_error(err: &LlmError) -> Self {
        RelayEvent::Error {
            error: "Generation service error".to_string(),
            details: Some(err.provider_message()),
            status: err.status(),
        }
    }

    /// `data: <json>\n\n`, or the `[DONE]` marker.
    pub fn to_sse_frame(&self) -> Bytes {
        match self {
            RelayEvent::Done => Bytes::from_static(DONE_FRAME.as_bytes()),
            event => {
                let json = serde_json::to_string(event).unwrap_or_else(|_| {
                    r#"{"error":"Generation service error","details":"unserializable event"}"#.to_string()
                });
                Bytes::from(format!("data: {}\n\n", json))
            }
        }
    }
}
