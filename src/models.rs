//! Models Module for the Sandbox Core
//!
//! The immutable story registry: components, their story variants and the
//! typed argument metadata discovered for each story.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ARGUMENT TYPES & VALUES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArgumentType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "number")]
    Number,
    /// Trusted, pre-escaped HTML. Never re-escaped by the renderer.
    #[serde(rename = "html")]
    Markup,
}

impl ArgumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Markup => "html",
        }
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric argument value. Keeps the literal it was produced from so the
/// textual form round-trips; parsed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    literal: String,
}

impl Number {
    pub fn from_literal(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
        }
    }

    pub fn from_f64(value: f64) -> Self {
        Self {
            literal: value.to_string(),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.literal.parse().ok()
    }
}

/// A typed argument value, one case per [`ArgumentType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Bool(bool),
    Number(Number),
    Markup(String),
}

impl ArgValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Markup(_))
    }
}

/// The default string form: `true`/`false`, the numeric literal, or the raw text.
impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Markup(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(n.literal()),
        }
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) | Self::Markup(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match n.as_f64().filter(|v| v.is_finite()) {
                Some(v) => serializer.serialize_f64(v),
                None => serializer.serialize_str(n.literal()),
            },
        }
    }
}

/// Discovered metadata for one story argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ArgumentType,
    pub default: ArgValue,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>, ty: ArgumentType, default: ArgValue) -> Self {
        Self {
            name: name.into(),
            ty,
            default,
            required: false,
            control: None,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORIES & COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryVariant {
    pub key: String,
    pub title: String,
    pub args: IndexMap<String, ArgumentSpec>,
    /// Always true for discovered variants.
    pub has_csr: bool,
    /// Mirrors the owning component's `can_ssr`.
    pub has_ssr: bool,
    pub has_pending_text: bool,
}

impl StoryVariant {
    /// Declared defaults in declaration order, as a fresh map.
    pub fn defaults(&self) -> IndexMap<String, ArgValue> {
        self.args
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentGroup {
    pub name: String,
    pub title: String,
    /// Story source path relative to the static root, `/`-separated.
    pub path: String,
    pub ssr_template_path: String,
    pub component_template_path: String,
    pub variants: Vec<StoryVariant>,
    pub can_ssr: bool,
}

impl ComponentGroup {
    pub fn variant(&self, key: &str) -> Option<(usize, &StoryVariant)> {
        self.variants.iter().enumerate().find(|(_, v)| v.key == key)
    }

    pub fn first_variant(&self) -> Option<&StoryVariant> {
        self.variants.first()
    }
}

/// The discovered components, built once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    components: Vec<ComponentGroup>,
}

impl Registry {
    pub fn new(components: Vec<ComponentGroup>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[ComponentGroup] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&ComponentGroup> {
        self.components.get(index)
    }

    pub fn find(&self, name: &str) -> Option<(usize, &ComponentGroup)> {
        self.components
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
    }

    pub fn story(&self, component: &str, key: &str) -> Option<&StoryVariant> {
        self.find(component)
            .and_then(|(_, c)| c.variant(key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_display() {
        assert_eq!(ArgValue::Bool(true).to_string(), "true");
        assert_eq!(ArgValue::Number(Number::from_literal("12.5")).to_string(), "12.5");
        assert_eq!(ArgValue::Number(Number::from_f64(3.0)).to_string(), "3");
        assert_eq!(ArgValue::Markup("<b>x</b>".to_string()).to_string(), "<b>x</b>");
    }

    #[test]
    fn test_arg_value_serializes_native() {
        let json = serde_json::to_value(vec![
            ArgValue::Text("large".to_string()),
            ArgValue::Bool(false),
            ArgValue::Number(Number::from_literal("4")),
            ArgValue::Number(Number::from_literal("abc")),
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!(["large", false, 4.0, "abc"]));
    }

    #[test]
    fn test_argument_type_serializes_markup_as_html() {
        assert_eq!(
            serde_json::to_value(ArgumentType::Markup).unwrap(),
            serde_json::json!("html")
        );
    }

    #[test]
    fn test_registry_lookup() {
        let story = StoryVariant {
            key: "Primary".to_string(),
            title: "Primary".to_string(),
            args: IndexMap::new(),
            has_csr: true,
            has_ssr: false,
            has_pending_text: false,
        };
        let registry = Registry::new(vec![ComponentGroup {
            name: "button".to_string(),
            title: "Button".to_string(),
            path: "components/button/button.stories.js".to_string(),
            ssr_template_path: "components/button/button.stories.gohtml".to_string(),
            component_template_path: "components/button/button.gohtml".to_string(),
            variants: vec![story],
            can_ssr: false,
        }]);
        assert_eq!(registry.find("button").map(|(i, _)| i), Some(0));
        assert_eq!(registry.get(0).map(|c| c.name.as_str()), Some("button"));
        assert!(registry.get(1).is_none());
        assert!(registry.story("button", "Primary").is_some());
        assert!(registry.story("button", "Ghost").is_none());
        assert!(registry.find("card").is_none());
    }
}
