//! Request query parameters and URL construction.
//!
//! Keys are kept sorted so encoded URLs are canonical: the same parameters
//! always encode to the same query string.

use std::collections::BTreeMap;
use url::form_urlencoded;

pub const RENDER_MODE_PARAM: &str = "renderMode";
pub const THEME_PARAM: &str = "theme";
pub const COMPONENT_NAME_PARAM: &str = "componentName";
pub const STORY_KEY_PARAM: &str = "storyKey";

/// Parameters that steer the sandbox itself and are never story arguments.
pub const RESERVED_PARAMS: [&str; 4] = [
    RENDER_MODE_PARAM,
    THEME_PARAM,
    COMPONENT_NAME_PARAM,
    STORY_KEY_PARAM,
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            params.append(key.into_owned(), value.into_owned());
        }
        params
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.append(key.into(), value.into());
        }
        params
    }

    pub fn append(&mut self, key: String, value: String) {
        self.values.entry(key).or_default().push(value);
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// First value for `key`, or `""` when absent.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// True when `key` carries at least one value.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace all values of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// `(key, first value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.first().map(|first| (k.as_str(), first.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.values {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

/// `path` with the encoded query appended, if any.
pub fn build_url(path: &str, query: &QueryParams) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_first_value() {
        let q = QueryParams::parse("?b=2&a=1&b=3&label=hello+world");
        assert_eq!(q.get("a"), Some("1"));
        assert_eq!(q.get("b"), Some("2"));
        assert_eq!(q.get("label"), Some("hello world"));
        assert_eq!(q.get("missing"), None);
    }

    #[test]
    fn test_encode_is_sorted() {
        let q = QueryParams::from_pairs([("theme", "dark"), ("renderMode", "ssr"), ("a", "x y")]);
        assert_eq!(q.encode(), "a=x+y&renderMode=ssr&theme=dark");
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut q = QueryParams::parse("theme=a&theme=b");
        q.set(THEME_PARAM, "light");
        assert_eq!(q.encode(), "theme=light");
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("/", &QueryParams::new()), "/");
        let q = QueryParams::from_pairs([("x", "1")]);
        assert_eq!(build_url("/sandbox/button", &q), "/sandbox/button?x=1");
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("renderMode"));
        assert!(!is_reserved("label"));
    }
}
