//! Discovery Module for the Sandbox Core
//!
//! Recursively scans a components directory for `<name>.stories.<ext>` files
//! and extracts components, story variants and typed arguments from them.
//! Extraction is pattern based. A file that cannot be read or only partly
//! parsed is reported as a warning and discovery moves on; only a root that
//! cannot be walked is fatal.

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::args::{apply_arg_types, find_block_end, parse_args, ParsedArgs};
use crate::enrich::enrich_templates;
use crate::error::{DiscoveryWarning, Result, SandboxError};
use crate::models::{ArgValue, ArgumentType, ComponentGroup, Registry, StoryVariant};

/// Implicit boolean derived from the story key.
pub const SQUARE_ARG: &str = "IsSquare";
/// Story keys containing this marker default `IsSquare` to true.
const SQUARE_MARKER: &str = "Icon";
pub const PENDING_TEXT_ARG: &str = "PendingText";

lazy_static! {
    static ref STORY_KEY_RE: Regex =
        Regex::new(r"export\s+const\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*\{").unwrap();
    static ref STORY_TITLE_RE: Regex = Regex::new(r#"title:\s*["']([^"']+)["']"#).unwrap();
    static ref DEFAULT_TITLE_RE: Regex =
        Regex::new(r#"export\s+default\s*\{\s*title:\s*["']([^"']+)["']"#).unwrap();
    static ref ARGS_START_RE: Regex = Regex::new(r"\bargs:\s*\{").unwrap();
    static ref ARG_TYPES_START_RE: Regex = Regex::new(r"\bargTypes:\s*\{").unwrap();
    static ref PENDING_TEXT_RE: Regex = Regex::new(r#"pendingText:\s*["']([^"']+)["']"#).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS & RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Component paths are recorded relative to this directory.
    pub static_root: PathBuf,
    pub story_extension: String,
    pub template_extension: String,
    /// Write argument-type sidecars next to server templates after the walk.
    pub enrich_templates: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static"),
            story_extension: "js".to_string(),
            template_extension: "gohtml".to_string(),
            enrich_templates: false,
        }
    }
}

impl DiscoveryOptions {
    fn story_suffix(&self) -> String {
        format!(".stories.{}", self.story_extension)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub registry: Registry,
    pub warnings: Vec<DiscoveryWarning>,
}

/// What parsing one story file produced.
#[derive(Debug)]
struct FileOutcome {
    dir: PathBuf,
    component: Option<ComponentGroup>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORY DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Discover all component stories below `components_dir`.
pub fn discover_stories(components_dir: &Path, options: &DiscoveryOptions) -> Result<Discovery> {
    info!(dir = %components_dir.display(), "discovering stories");

    let mut warnings = Vec::new();
    let files = find_story_files(components_dir, options, &mut warnings)?;

    let outcomes: Vec<std::result::Result<FileOutcome, SandboxError>> = files
        .par_iter()
        .map(|path| parse_story_file(path, options))
        .collect();

    let mut seen = HashSet::new();
    let mut components = Vec::new();
    let mut dirs = Vec::new();

    for outcome in outcomes {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}", e);
                warnings.push(DiscoveryWarning::from(&e));
                continue;
            }
        };

        let Some(component) = outcome.component else {
            continue;
        };
        if !seen.insert(component.name.clone()) {
            warn!(component = %component.name, path = %component.path, "duplicate component name, skipped");
            continue;
        }
        info!(
            component = %component.name,
            title = %component.title,
            variants = component.variants.len(),
            can_ssr = component.can_ssr,
            "discovered component"
        );
        dirs.push(outcome.dir);
        components.push(component);
    }

    if components.is_empty() {
        warn!(dir = %components_dir.display(), "no component stories were discovered");
    }

    if options.enrich_templates {
        let entries: Vec<(&Path, &ComponentGroup)> = dirs
            .iter()
            .map(PathBuf::as_path)
            .zip(components.iter())
            .collect();
        match enrich_templates(&entries, &options.template_extension) {
            Ok(written) => debug!(written, "template enrichment finished"),
            Err(e) => warn!("template enrichment failed: {}", e),
        }
    }

    Ok(Discovery {
        registry: Registry::new(components),
        warnings,
    })
}

/// Walks `dir` in sorted order and returns every story file.
fn find_story_files(
    dir: &Path,
    options: &DiscoveryOptions,
    warnings: &mut Vec<DiscoveryWarning>,
) -> Result<Vec<PathBuf>> {
    let root_meta = fs::metadata(dir).map_err(|e| SandboxError::DirectoryWalkFailure {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !root_meta.is_dir() {
        return Err(SandboxError::DirectoryWalkFailure {
            path: dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let suffix = options.story_suffix();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(SandboxError::DirectoryWalkFailure {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                let err = SandboxError::DirectoryWalkFailure {
                    path: e.path().map(Path::to_path_buf).unwrap_or_default(),
                    reason: e.to_string(),
                };
                warn!("{}", err);
                warnings.push(DiscoveryWarning::from(&err));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_story = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.len() > suffix.len() && name.ends_with(&suffix));
        if is_story {
            debug!(path = %entry.path().display(), "found story file");
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Parse one story file. Read failures are errors; everything else is a warning.
fn parse_story_file(
    path: &Path,
    options: &DiscoveryOptions,
) -> std::result::Result<FileOutcome, SandboxError> {
    let suffix = options.story_suffix();
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = file_name
        .strip_suffix(suffix.as_str())
        .unwrap_or(file_name)
        .to_string();
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let tmpl = &options.template_extension;
    let story_template = dir.join(format!("{}.stories.{}", name, tmpl));
    let component_template = dir.join(format!("{}.{}", name, tmpl));
    let can_ssr = story_template.is_file() && component_template.is_file();
    debug!(
        component = %name,
        story_template = %story_template.display(),
        component_template = %component_template.display(),
        can_ssr,
        "server template probe"
    );

    let content = fs::read_to_string(path).map_err(|source| SandboxError::FileReadFailure {
        path: path.to_path_buf(),
        source,
    })?;

    let variants = extract_variants(&content, path, can_ssr)?;

    if variants.is_empty() {
        info!(component = %name, path = %path.display(), "no variants found, component not added");
        return Ok(FileOutcome {
            dir,
            component: None,
        });
    }

    let title = DEFAULT_TITLE_RE
        .captures(&content)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| title_case(&name));

    let component = ComponentGroup {
        path: relative_to(path, &options.static_root),
        ssr_template_path: relative_to(&story_template, &options.static_root),
        component_template_path: relative_to(&component_template, &options.static_root),
        name,
        title,
        variants,
        can_ssr,
    };

    Ok(FileOutcome {
        dir,
        component: Some(component),
    })
}

/// Extract every exported story declaration from a story file.
///
/// A declaration whose body cannot be delimited fails the whole file.
pub fn extract_variants(
    content: &str,
    path: &Path,
    can_ssr: bool,
) -> std::result::Result<Vec<StoryVariant>, SandboxError> {
    let mut variants: Vec<StoryVariant> = Vec::new();

    // File-level on purpose: the first pendingText anywhere applies to every story.
    let pending_text = PENDING_TEXT_RE.captures(content).map(|c| c[1].to_string());

    for caps in STORY_KEY_RE.captures_iter(content) {
        let key = caps[1].to_string();
        if variants.iter().any(|v| v.key == key) {
            debug!(story = %key, path = %path.display(), "duplicate story export ignored");
            continue;
        }

        let body = story_body(content, &key).ok_or_else(|| SandboxError::FileParseIncomplete {
            path: path.to_path_buf(),
            reason: format!("could not extract the body of story '{}'", key),
        })?;

        let title = STORY_TITLE_RE
            .captures(&strip_blocks(body))
            .map_or_else(|| key.clone(), |t| t[1].to_string());

        let mut parsed = match block_inner(body, &ARGS_START_RE) {
            Some(args) => parse_args(args),
            None => {
                debug!(story = %key, path = %path.display(), "no args block");
                ParsedArgs::default()
            }
        };
        apply_arg_types(body, &mut parsed.specs);

        parsed.insert(
            SQUARE_ARG,
            ArgumentType::Boolean,
            ArgValue::Bool(key.contains(SQUARE_MARKER)),
        );
        if let Some(text) = &pending_text {
            parsed.insert(
                PENDING_TEXT_ARG,
                ArgumentType::String,
                ArgValue::Text(text.clone()),
            );
        }

        debug!(story = %key, title = %title, args = parsed.specs.len(), "found story");
        variants.push(StoryVariant {
            key,
            title,
            args: parsed.specs,
            has_csr: true,
            has_ssr: can_ssr,
            has_pending_text: pending_text.is_some(),
        });
    }

    Ok(variants)
}

/// The brace-delimited body of `export const <key> = { ... }`, without the braces.
fn story_body<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    let re = Regex::new(&format!(
        r"export\s+const\s+{}\s*=\s*\{{",
        regex::escape(key)
    ))
    .ok()?;
    let open = re.find(content)?.end() - 1;
    let end = find_block_end(content, open)?;
    Some(&content[open + 1..end - 1])
}

/// Inner text of the first block introduced by `start` (which ends at `{`).
fn block_inner<'a>(body: &'a str, start: &Regex) -> Option<&'a str> {
    let open = start.find(body)?.end() - 1;
    let end = find_block_end(body, open)?;
    Some(&body[open + 1..end - 1])
}

/// The story body with its `args` and `argTypes` blocks removed, so a
/// `title` argument is not mistaken for the story title.
fn strip_blocks(body: &str) -> String {
    let mut out = body.to_string();
    for re in [&*ARGS_START_RE, &*ARG_TYPES_START_RE] {
        if let Some(m) = re.find(&out) {
            let open = m.end() - 1;
            if let Some(end) = find_block_end(&out, open) {
                out.replace_range(m.start()..end, " ");
            }
        }
    }
    out
}

/// `"icon-button"` → `"Icon Button"`.
pub fn title_case(name: &str) -> String {
    name.replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn relative_to(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
