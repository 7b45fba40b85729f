//! Side payloads attached to an assistant reply.
//!
//! Products and quick replies arrive mid-stream but are only shown once
//! the reply text is complete.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product card suggested by the assistant.
///
/// Only `id` and `name` are interpreted; everything else the backend
/// sends is preserved in `attributes` for the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Backend identifier (number or string); `null` if the backend sent none.
    #[serde(default)]
    pub id: Value,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Remaining display fields (price, image, url, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    /// Create a product with just an id and a name.
    pub fn new(id: impl Into<Value>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Map::new(),
        }
    }

    /// Add a display attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A suggestion chip the user can tap instead of typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuickReply {
    /// Plain text; sent back verbatim when chosen.
    Text(String),
    /// A labelled option with an optional distinct value.
    Action(QuickReplyAction),
}

/// Structured quick reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickReplyAction {
    /// Text shown on the chip.
    #[serde(alias = "text", alias = "title")]
    pub label: String,
    /// Value sent back when chosen, if different from the label.
    #[serde(default, alias = "payload", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuickReply {
    /// Create a plain text quick reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Text shown on the chip.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Action(action) => &action.label,
        }
    }

    /// Text to send back when the chip is chosen.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Action(action) => action.value.as_deref().unwrap_or(&action.label),
        }
    }
}

/// Structured, non-text data delivered with a reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidePayloads {
    /// Suggested products.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
    /// Suggested quick replies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
}

impl SidePayloads {
    /// Create empty side payloads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.quick_replies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_product_keeps_unknown_fields() {
        let product: Product =
            serde_json::from_value(json!({"id": 1, "name": "Course A", "price": "49"})).unwrap();
        assert_eq!(product.id, json!(1));
        assert_eq!(product.name, "Course A");
        assert_eq!(product.attributes.get("price"), Some(&json!("49")));
    }

    #[test]
    fn test_product_without_id() {
        let product: Product = serde_json::from_value(json!({"name": "Course A"})).unwrap();
        assert!(product.id.is_null());
        assert_eq!(product.name, "Course A");
    }

    #[test]
    fn test_product_equals_constructed() {
        let product: Product = serde_json::from_value(json!({"id": 1, "name": "Course A"})).unwrap();
        assert_eq!(product, Product::new(1, "Course A"));
    }

    #[test]
    fn test_quick_reply_forms() {
        let replies: Vec<QuickReply> = serde_json::from_value(json!([
            "Show me courses",
            {"label": "Talk to sales", "value": "sales"},
            {"text": "Pricing"}
        ]))
        .unwrap();

        assert_eq!(replies[0].label(), "Show me courses");
        assert_eq!(replies[0].value(), "Show me courses");
        assert_eq!(replies[1].label(), "Talk to sales");
        assert_eq!(replies[1].value(), "sales");
        assert_eq!(replies[2].value(), "Pricing");
    }

    #[test]
    fn test_side_payloads_empty() {
        let mut payloads = SidePayloads::new();
        assert!(payloads.is_empty());
        payloads.quick_replies.push(QuickReply::text("Yes"));
        assert!(!payloads.is_empty());
    }
}
