//! Loaded server templates.
//!
//! The template engine itself lives outside this crate. Resolution only needs
//! to know which named templates were loaded, so that is all this tracks:
//! every `{{define "Name"}}` found in template files under the given roots.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SandboxError};

lazy_static! {
    static ref DEFINE_RE: Regex = Regex::new(r#"\{\{-?\s*define\s+"([^"]+)"\s*-?\}\}"#).unwrap();
}

/// Answers whether a server template with a given name is loaded.
pub trait TemplateIndex {
    fn has_template(&self, name: &str) -> bool;
}

impl TemplateIndex for HashSet<String> {
    fn has_template(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl TemplateIndex for BTreeSet<String> {
    fn has_template(&self, name: &str) -> bool {
        self.contains(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    names: BTreeSet<String>,
}

impl TemplateCatalog {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Scan `dirs` for files with one of `extensions` and collect the names
    /// they define. A missing directory is an error; an unreadable file is
    /// skipped.
    pub fn load(dirs: &[impl AsRef<Path>], extensions: &[&str]) -> Result<Self> {
        let mut catalog = Self::default();

        for dir in dirs {
            let dir = dir.as_ref();
            for entry in WalkDir::new(dir).sort_by_file_name() {
                let entry = entry.map_err(|e| SandboxError::DirectoryWalkFailure {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                })?;
                let path = entry.path();
                let wanted = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.contains(&ext));
                if !entry.file_type().is_file() || !wanted {
                    continue;
                }
                match fs::read_to_string(path) {
                    Ok(source) => catalog.add_source(&source),
                    Err(e) => warn!(path = %path.display(), "skipping unreadable template: {}", e),
                }
            }
        }

        debug!(templates = catalog.names.len(), "template catalog loaded");
        Ok(catalog)
    }

    /// Register every template defined in `source`.
    pub fn add_source(&mut self, source: &str) {
        for caps in DEFINE_RE.captures_iter(source) {
            self.names.insert(caps[1].to_string());
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TemplateIndex for TemplateCatalog {
    fn has_template(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_source_collects_defines() {
        let mut catalog = TemplateCatalog::default();
        catalog.add_source(
            r#"{{define "Primary"}}<button>{{.label}}</button>{{end}}
{{- define "Ghost" -}}x{{end}}
{{template "Primary" .}}"#,
        );
        assert!(catalog.has_template("Primary"));
        assert!(catalog.has_template("Ghost"));
        assert_eq!(catalog.len(), 2);
    }

    fn knows<T: TemplateIndex + ?Sized>(index: &T, name: &str) -> bool {
        index.has_template(name)
    }

    #[test]
    fn test_plain_sets_are_indexes() {
        let hashed: HashSet<String> = ["Primary".to_string()].into_iter().collect();
        let ordered: BTreeSet<String> = ["Ghost".to_string()].into_iter().collect();
        assert!(knows(&hashed, "Primary"));
        assert!(!knows(&hashed, "Ghost"));
        assert!(knows(&ordered, "Ghost"));
        assert!(!knows(&ordered, "Primary"));
    }

    #[test]
    fn test_load_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.gohtml"), r#"{{define "A"}}{{end}}"#).unwrap();
        fs::write(dir.path().join("b.txt"), r#"{{define "B"}}{{end}}"#).unwrap();
        let catalog = TemplateCatalog::load(&[dir.path()], &["gohtml", "html"]).unwrap();
        assert!(catalog.has_template("A"));
        assert!(!catalog.has_template("B"));
    }

    #[test]
    fn test_load_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(TemplateCatalog::load(&[missing], &["gohtml"]).is_err());
    }
}
