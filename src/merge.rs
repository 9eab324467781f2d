//! Merge Module for the Sandbox Core
//!
//! Combines a story's discovered argument defaults with query-string
//! overrides. Coercion is driven by the declared [`ArgumentType`], never by
//! inspecting the raw text.

use indexmap::IndexMap;
use serde::Serialize;

use crate::models::{ArgValue, ArgumentSpec, ArgumentType, Number};
use crate::query::{is_reserved, QueryParams};

/// The arguments a single request renders with. Always a fresh map; never
/// aliases the registry's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveArgs {
    pub values: IndexMap<String, ArgValue>,
    /// Textual form of each value, for embedding into generated URLs.
    pub query_values: IndexMap<String, String>,
    /// Undeclared, non-reserved parameters. Only filled when no story is selected.
    pub extras: IndexMap<String, String>,
}

/// Coerce one raw query value according to the declared type.
pub fn coerce(ty: ArgumentType, raw: &str) -> ArgValue {
    match ty {
        ArgumentType::Boolean => ArgValue::Bool(raw.eq_ignore_ascii_case("true")),
        ArgumentType::Number => match raw.parse::<f64>() {
            Ok(n) => ArgValue::Number(Number::from_f64(n)),
            Err(_) => ArgValue::Text(raw.to_string()),
        },
        // Markup coming back through the query string is not trusted again.
        ArgumentType::String | ArgumentType::Markup => ArgValue::Text(raw.to_string()),
    }
}

/// Effective arguments for a selected story.
///
/// A present parameter is coerced; an absent boolean is always `false`
/// (checkbox semantics); anything else keeps its discovered default.
pub fn merge_args(specs: &IndexMap<String, ArgumentSpec>, query: &QueryParams) -> EffectiveArgs {
    let mut merged = EffectiveArgs::default();

    for (name, spec) in specs {
        let (value, text) = match (query.get(name), spec.ty) {
            (Some(raw), ty) => (coerce(ty, raw), raw.to_string()),
            (None, ArgumentType::Boolean) => (ArgValue::Bool(false), "false".to_string()),
            (None, _) => (spec.default.clone(), spec.default.to_string()),
        };
        merged.values.insert(name.clone(), value);
        merged.query_values.insert(name.clone(), text);
    }

    merged
}

/// Arguments when no story is selected: every non-reserved parameter is
/// forwarded as opaque text.
pub fn passthrough_extras(query: &QueryParams) -> EffectiveArgs {
    let extras = query
        .iter()
        .filter(|(key, _)| !is_reserved(key))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    EffectiveArgs {
        extras,
        ..EffectiveArgs::default()
    }
}
