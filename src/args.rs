//! Args Module for the Sandbox Core
//!
//! Extracts story arguments from the body of an `args: { ... }` literal.
//! This is a pattern-based extractor, not a JavaScript parser. Passes run in
//! a fixed order and each pass blanks out the spans it consumed:
//!
//! 1. markup (`children: html\`...\``), stored as `Children`
//! 2. strings (`name: "value"`)
//! 3. booleans (`name: true|false`)
//! 4. numbers (`name: 12` / `name: 1.5`), literal text retained
//!
//! A key produced by an earlier pass is never overwritten by a later one.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{ArgValue, ArgumentSpec, ArgumentType, Number};

/// Argument name the markup field is stored under.
pub const MARKUP_ARG: &str = "Children";

lazy_static! {
    static ref MARKUP_RE: Regex = Regex::new(r"children:\s*html`((?:\\`|[^`])*)`").unwrap();
    static ref STRING_RE: Regex =
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*):\s*"((?:\\"|[^"])*)""#).unwrap();
    static ref BOOL_RE: Regex = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*):\s*(true|false)\b").unwrap();
    static ref NUMBER_RE: Regex =
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*):\s*([0-9]+(?:\.[0-9]+)?)").unwrap();
    static ref ARG_TYPES_START_RE: Regex = Regex::new(r"argTypes:\s*\{").unwrap();
    static ref ARG_TYPE_ENTRY_RE: Regex =
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*):\s*\{([^{}]*)\}").unwrap();
    static ref CONTROL_RE: Regex = Regex::new(r#"control:\s*["']([^"']+)["']"#).unwrap();
    static ref OPTIONS_RE: Regex = Regex::new(r"options:\s*\[([^\]]*)\]").unwrap();
    static ref MIN_RE: Regex = Regex::new(r"min:\s*(-?[0-9]+(?:\.[0-9]+)?)").unwrap();
    static ref MAX_RE: Regex = Regex::new(r"max:\s*(-?[0-9]+(?:\.[0-9]+)?)").unwrap();
}

/// Result of parsing one args block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    pub values: IndexMap<String, ArgValue>,
    pub specs: IndexMap<String, ArgumentSpec>,
}

impl ParsedArgs {
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Inserts unless the name is already taken by an earlier pass.
    pub fn insert(&mut self, name: &str, ty: ArgumentType, value: ArgValue) -> bool {
        if self.specs.contains_key(name) {
            return false;
        }
        self.values.insert(name.to_string(), value.clone());
        self.specs
            .insert(name.to_string(), ArgumentSpec::new(name, ty, value));
        true
    }
}

/// Parse the inner text of an `args: { ... }` block.
pub fn parse_args(block: &str) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut rest = block.to_string();

    // Markup first: its value may hold colons and quotes that would fool the
    // simpler passes. Only the first occurrence counts.
    if let Some(caps) = MARKUP_RE.captures(&rest) {
        let whole = caps.get(0).map(|m| m.range());
        let content = caps[1].replace("\\`", "`");
        parsed.insert(MARKUP_ARG, ArgumentType::Markup, ArgValue::Markup(content));
        if let Some(range) = whole {
            rest.replace_range(range, " ");
        }
    }

    // Only top-level keys are arguments.
    rest = blank_nested(&rest);

    rest = consume(&STRING_RE, &rest, |name, raw| {
        let value = raw.replace("\\\"", "\"");
        parsed.insert(name, ArgumentType::String, ArgValue::Text(value));
    });

    rest = consume(&BOOL_RE, &rest, |name, raw| {
        parsed.insert(name, ArgumentType::Boolean, ArgValue::Bool(raw == "true"));
    });

    consume(&NUMBER_RE, &rest, |name, raw| {
        parsed.insert(
            name,
            ArgumentType::Number,
            ArgValue::Number(Number::from_literal(raw)),
        );
    });

    parsed
}

/// Runs one extraction pass and returns the text with every match blanked.
fn consume(re: &Regex, text: &str, mut on_match: impl FnMut(&str, &str)) -> String {
    for caps in re.captures_iter(text) {
        on_match(&caps[1], &caps[2]);
    }
    re.replace_all(text, " ").into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARG TYPE ANNOTATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Applies an optional `argTypes: { name: { control, options, min, max } }`
/// block found in a story body to the specs already extracted from `args`.
/// Names that were not extracted are ignored.
pub fn apply_arg_types(body: &str, specs: &mut IndexMap<String, ArgumentSpec>) {
    let Some(start) = ARG_TYPES_START_RE.find(body) else {
        return;
    };
    let open = start.end() - 1;
    let Some(end) = find_block_end(body, open) else {
        return;
    };
    let inner = &body[open + 1..end - 1];

    for caps in ARG_TYPE_ENTRY_RE.captures_iter(inner) {
        let Some(spec) = specs.get_mut(&caps[1]) else {
            continue;
        };
        let entry = &caps[2];
        if let Some(c) = CONTROL_RE.captures(entry) {
            spec.control = Some(c[1].to_string());
        }
        if let Some(o) = OPTIONS_RE.captures(entry) {
            spec.options = o[1]
                .split(',')
                .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        spec.min = MIN_RE.captures(entry).and_then(|m| m[1].parse().ok());
        spec.max = MAX_RE.captures(entry).and_then(|m| m[1].parse().ok());
    }
}

/// `text` with comments and nested `{ ... }` objects replaced by spaces of
/// the same length. Strings are left alone.
fn blank_nested(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = text.to_string();
    let mut i = 0;
    let mut in_string: Option<u8> = None;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if let Some(len) = comment_len(bytes, i) {
            blank(&mut out, i, i + len);
            i += len;
            continue;
        }

        match c {
            b'"' | b'\'' | b'`' => in_string = Some(c),
            b'{' => {
                let end = find_block_end(text, i).unwrap_or(bytes.len());
                blank(&mut out, i, end);
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    out
}

/// Both ends sit on ASCII bytes, so the replacement keeps every other
/// offset valid.
fn blank(text: &mut String, start: usize, end: usize) {
    text.replace_range(start..end, &" ".repeat(end - start));
}

/// Length of the `//` or `/* */` comment starting at `i`, if any.
/// Unterminated comments run to the end of the text.
fn comment_len(bytes: &[u8], i: usize) -> Option<usize> {
    match (bytes.get(i), bytes.get(i + 1)) {
        (Some(b'/'), Some(b'/')) => {
            let end = bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| i + p);
            Some(end - i)
        }
        (Some(b'/'), Some(b'*')) => {
            let end = bytes[i + 2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(bytes.len(), |p| i + 2 + p + 2);
            Some(end - i)
        }
        _ => None,
    }
}

/// Byte index just past the `}` matching the `{` at `open`.
/// Quoted strings, template literals and comments are skipped.
pub(crate) fn find_block_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    let mut in_string: Option<u8> = None;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if let Some(len) = comment_len(bytes, i) {
            i += len;
            continue;
        }

        match c {
            b'"' | b'\'' | b'`' => in_string = Some(c),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_mixed_args() {
        let parsed = parse_args(r#" size: "large", disabled: true, count: 3, ratio: 1.5 "#);
        assert_eq!(parsed.values["size"], ArgValue::Text("large".to_string()));
        assert_eq!(parsed.values["disabled"], ArgValue::Bool(true));
        assert_eq!(
            parsed.values["count"],
            ArgValue::Number(Number::from_literal("3"))
        );
        assert_eq!(parsed.specs["ratio"].ty, ArgumentType::Number);
        assert_eq!(
            parsed.specs.keys().collect::<Vec<_>>(),
            vec!["size", "disabled", "count", "ratio"]
        );
    }

    #[test]
    fn test_markup_does_not_corrupt_other_fields() {
        let block = r#"
            label: "Save",
            children: html`<span title="a: b">x: 1 {y}</span> \` tick`,
            active: false,
            width: 20
        "#;
        let parsed = parse_args(block);
        assert_eq!(
            parsed.values[MARKUP_ARG],
            ArgValue::Markup(r#"<span title="a: b">x: 1 {y}</span> ` tick"#.to_string())
        );
        assert_eq!(parsed.values["label"], ArgValue::Text("Save".to_string()));
        assert_eq!(parsed.values["active"], ArgValue::Bool(false));
        assert_eq!(
            parsed.values["width"],
            ArgValue::Number(Number::from_literal("20"))
        );
        // Nothing from inside the markup leaked out as its own argument.
        assert!(!parsed.specs.contains_key("title"));
        assert!(!parsed.specs.contains_key("x"));
        assert_eq!(parsed.specs.len(), 4);
    }

    #[test]
    fn test_string_content_not_rematched() {
        let parsed = parse_args(r#"label: "count: 5, on: true""#);
        assert_eq!(parsed.specs.len(), 1);
        assert_eq!(
            parsed.values["label"],
            ArgValue::Text("count: 5, on: true".to_string())
        );
    }

    #[test]
    fn test_escaped_quotes() {
        let parsed = parse_args(r#"text: "say \"hi\"""#);
        assert_eq!(parsed.values["text"], ArgValue::Text(r#"say "hi""#.to_string()));
    }

    #[test]
    fn test_malformed_yields_empty() {
        assert!(parse_args("").is_empty());
        assert!(parse_args("just some words, no pairs").is_empty());
        assert!(parse_args("name: 'single quoted'").is_empty());
    }

    #[test]
    fn test_boolean_prefix_is_not_a_boolean() {
        let parsed = parse_args("flag: trueish");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_apply_arg_types() {
        let mut parsed = parse_args(r#"variant: "solid", size: 2"#);
        let body = r#"
            args: { variant: "solid", size: 2 },
            argTypes: {
                variant: { control: "select", options: ["solid", 'ghost'] },
                size: { control: "range", min: 1, max: 10.5 },
                unknown: { control: "text" },
            },
        "#;
        apply_arg_types(body, &mut parsed.specs);
        let variant = &parsed.specs["variant"];
        assert_eq!(variant.control.as_deref(), Some("select"));
        assert_eq!(variant.options, vec!["solid", "ghost"]);
        let size = &parsed.specs["size"];
        assert_eq!(size.min, Some(1.0));
        assert_eq!(size.max, Some(10.5));
        assert!(!parsed.specs.contains_key("unknown"));
    }

    #[test]
    fn test_find_block_end() {
        assert_eq!(find_block_end("{a}", 0), Some(3));
        assert_eq!(find_block_end("{a: {b: 1}}", 0), Some(11));
        assert_eq!(find_block_end("{s: '}'}", 0), Some(8));
        assert_eq!(find_block_end("{open", 0), None);
    }

    #[test]
    fn test_find_block_end_skips_comments() {
        let text = "{\n  // don't\n  a: 1\n}";
        assert_eq!(find_block_end(text, 0), Some(text.len()));
        let text = "{ /* it's } here */ a: 1 }";
        assert_eq!(find_block_end(text, 0), Some(text.len()));
        assert_eq!(find_block_end("{ a: \"//\" }", 0), Some(11));
    }

    #[test]
    fn test_nested_objects_are_not_arguments() {
        let parsed = parse_args(r#" label: "x", style: { color: "red", width: 3 }, on: true "#);
        assert_eq!(
            parsed.specs.keys().collect::<Vec<_>>(),
            vec!["label", "on"]
        );
        assert!(!parsed.specs.contains_key("color"));
    }

    #[test]
    fn test_commented_out_args_are_ignored() {
        let parsed = parse_args(
            r#"
            // label: "old",
            label: "new", /* size: 3 */
            wide: false
            "#,
        );
        assert_eq!(parsed.values["label"], ArgValue::Text("new".to_string()));
        assert!(!parsed.specs.contains_key("size"));
        assert_eq!(parsed.specs.len(), 2);
    }
}
