//! Stream record types.
//!
//! Each SSE event carries one JSON envelope discriminated by its `type`
//! field. This module decodes that envelope into a [`StreamRecord`].

use chatline_core::{MalformedRecordError, Product, QuickReply};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::sse::SseEvent;

/// Routing notice: which backend agent picked up the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingInfo {
    /// Agent name, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Any other routing fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl RoutingInfo {
    /// Create routing info for an agent.
    pub fn agent(agent: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
            extra: Map::new(),
        }
    }
}

/// One decoded stream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRecord {
    /// Informational routing notice.
    Routing(RoutingInfo),

    /// A fragment of reply text.
    Text {
        /// The text to append.
        content: String,
    },

    /// A tool was announced.
    ToolStart {
        /// Tool name.
        #[serde(default)]
        tool_name: String,
    },

    /// A tool is running.
    ToolExecuting {
        /// Tool name.
        #[serde(default)]
        tool_name: String,
    },

    /// A tool finished.
    ToolComplete {
        /// Tool name.
        #[serde(default)]
        tool_name: String,
    },

    /// Product suggestions, shown after the text.
    Products {
        /// The products. Entries that do not decode are dropped.
        #[serde(default, deserialize_with = "lenient_list")]
        products: Vec<Product>,
    },

    /// Quick reply suggestions, shown after the text.
    QuickReplies {
        /// The quick replies. Entries that do not decode are dropped.
        #[serde(default, deserialize_with = "lenient_list")]
        quick_replies: Vec<QuickReply>,
    },

    /// The reply is complete.
    Done {
        /// Backend message ID. Numeric IDs are kept as their decimal text.
        #[serde(
            default,
            deserialize_with = "lenient_id",
            skip_serializing_if = "Option::is_none"
        )]
        message_id: Option<String>,
    },

    /// The backend failed.
    Error {
        /// Raw error detail. Structured details are kept as JSON text.
        #[serde(default, deserialize_with = "raw_detail")]
        error: String,
    },

    /// A record kind this version does not know. Never on the wire.
    #[serde(skip)]
    Unknown {
        /// The unrecognized discriminator.
        kind: String,
    },
}

impl StreamRecord {
    /// Every discriminator this version understands.
    pub const KNOWN_KINDS: &'static [&'static str] = &[
        "routing",
        "text",
        "tool_start",
        "tool_executing",
        "tool_complete",
        "products",
        "quick_replies",
        "done",
        "error",
    ];

    /// Parse a JSON envelope.
    ///
    /// Unknown discriminators decode to [`StreamRecord::Unknown`] rather
    /// than failing.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedRecordError`] if the payload is not JSON, has no
    /// `type`, or has fields that do not match its `type`. `done` and `error`
    /// records always decode once their `type` is known.
    pub fn parse(data: &str) -> Result<Self, MalformedRecordError> {
        let value: JsonValue = serde_json::from_str(data)
            .map_err(|e| MalformedRecordError::InvalidJson(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or(MalformedRecordError::MissingDiscriminator)?
            .to_string();

        if !Self::KNOWN_KINDS.contains(&kind.as_str()) {
            return Ok(Self::Unknown { kind });
        }

        serde_json::from_value(value).map_err(|e| MalformedRecordError::InvalidFields {
            kind,
            reason: e.to_string(),
        })
    }

    /// Parse the data of an SSE event.
    ///
    /// # Errors
    ///
    /// See [`StreamRecord::parse`].
    pub fn from_event(event: &SseEvent) -> Result<Self, MalformedRecordError> {
        if event.data.trim().is_empty() {
            return Err(MalformedRecordError::NoData);
        }
        Self::parse(&event.data)
    }

    /// Create a text record.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create a done record.
    pub fn done(message_id: impl Into<String>) -> Self {
        Self::Done {
            message_id: Some(message_id.into()),
        }
    }

    /// Create an error record.
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// The discriminator of this record.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Routing(_) => "routing",
            Self::Text { .. } => "text",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolExecuting { .. } => "tool_executing",
            Self::ToolComplete { .. } => "tool_complete",
            Self::Products { .. } => "products",
            Self::QuickReplies { .. } => "quick_replies",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::Unknown { kind } => kind,
        }
    }

    /// Whether this record ends the reply.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Encode as one SSE frame: `data: <json>\n\n`.
    ///
    /// # Errors
    ///
    /// Fails for [`StreamRecord::Unknown`], which has no wire form.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// Decode an array entry by entry, dropping entries that do not fit `T`.
///
/// Anything other than an array or `null` decodes as empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items,
        JsonValue::Null => return Ok(Vec::new()),
        other => {
            warn!(value = %other, "expected a list of side payloads");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(%error, entry = %item, "skipping side payload entry");
                None
            }
        })
        .collect())
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(id) => Some(id),
        JsonValue::Number(id) => Some(id.to_string()),
        JsonValue::Null => None,
        other => {
            warn!(value = %other, "ignoring unusable message id");
            None
        }
    })
}

fn raw_detail<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(detail) => detail,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    })
}
