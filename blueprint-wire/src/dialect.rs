//! Vendor dialects: mapping one decoded frame to a text delta.
//!
//! Only the incremental assistant text is extracted. Everything else a
//! vendor puts on the wire (usage, tool calls, stop reasons) is ignored.
//!
//! References:
//! - <https://platform.openai.com/docs/api-reference/chat/streaming>
//! - <https://docs.anthropic.com/en/api/messages-streaming>
//! - <https://ai.google.dev/api/generate-content#method:-models.streamgeneratecontent>

use std::borrow::Cow;

use crate::frame::{Frame, Framing};

/// SSE field prefix that marks a data line.
const DATA_PREFIX: &str = "data: ";

/// Payload OpenAI-compatible servers send as the final data line.
const DONE_SENTINEL: &str = "[DONE]";

/// Wire dialect of a streaming chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// OpenAI Chat Completions and compatible servers (e.g. OpenRouter).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Gemini `streamGenerateContent`.
    Google,
}

impl Dialect {
    /// The framing discipline this dialect's response body uses.
    #[must_use]
    pub fn framing(self) -> Framing {
        match self {
            Self::OpenAi | Self::Anthropic => Framing::Lines,
            Self::Google => Framing::BalancedJson,
        }
    }

    /// Extract the text delta carried by `frame`, if any.
    ///
    /// Returns `None` when the frame carries no delta at all (non-data lines,
    /// sentinels, unparseable payloads, events of another type). Returns
    /// `Some("")` when the frame has the right shape but the text field is
    /// missing.
    #[must_use]
    pub fn delta(self, frame: &Frame) -> Option<String> {
        let json = self.payload(frame)?;

        if let Some(error) = json.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown streaming error");
            tracing::warn!(dialect = ?self, %message, "in-band error from provider");
            return None;
        }

        match self {
            Self::OpenAi => Some(text_at(&json["choices"][0]["delta"]["content"])),
            Self::Anthropic => {
                if json["type"].as_str() == Some("content_block_delta") {
                    Some(text_at(&json["delta"]["text"]))
                } else {
                    None
                }
            }
            Self::Google => Some(text_at(&json["candidates"][0]["content"]["parts"][0]["text"])),
        }
    }

    /// Whether `frame` is this dialect's explicit end-of-turn marker.
    #[must_use]
    pub fn is_terminal(self, frame: &Frame) -> bool {
        match (self, frame) {
            (Self::OpenAi | Self::Anthropic, Frame::Line(line)) => {
                let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                    return false;
                };
                let data = data.trim();
                if data == DONE_SENTINEL {
                    return true;
                }
                self == Self::Anthropic
                    && serde_json::from_str::<serde_json::Value>(data)
                        .map(|json| json["type"].as_str() == Some("message_stop"))
                        .unwrap_or(false)
            }
            (Self::Google, Frame::Json(json)) => {
                json["candidates"][0]["finishReason"].as_str().is_some()
            }
            _ => false,
        }
    }

    /// Decode the JSON payload of a frame, or `None` if it carries none.
    fn payload(self, frame: &Frame) -> Option<Cow<'_, serde_json::Value>> {
        match (self.framing(), frame) {
            (Framing::Lines, Frame::Line(line)) => {
                let data = line.strip_prefix(DATA_PREFIX)?.trim();
                if data.is_empty() || data == DONE_SENTINEL {
                    return None;
                }
                match serde_json::from_str(data) {
                    Ok(json) => Some(Cow::Owned(json)),
                    Err(e) => {
                        tracing::trace!(dialect = ?self, error = %e, "skipping malformed data line");
                        None
                    }
                }
            }
            (Framing::BalancedJson, Frame::Json(json)) => Some(Cow::Borrowed(json)),
            _ => None,
        }
    }
}

fn text_at(value: &serde_json::Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}
