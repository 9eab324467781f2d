//! Sandbox configuration.
//!
//! Layered: built-in defaults, then an optional file, then environment
//! variables prefixed with `SANDBOX__` (`SANDBOX__LOGGING__LEVEL=debug`
//! maps to `logging.level`).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::discovery::DiscoveryOptions;
use crate::error::Result;

pub const ENV_PREFIX: &str = "SANDBOX";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub static_root: PathBuf,
    pub components_dir: PathBuf,
    pub story_extension: String,
    pub template_extension: String,
    /// Directories scanned for loaded server templates.
    pub template_dirs: Vec<PathBuf>,
    /// Header marking an in-page (programmatic) request when set to `true`.
    pub programmatic_header: String,
    pub enrich_templates: bool,
    pub logging: LoggingConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static"),
            components_dir: PathBuf::from("static/components"),
            story_extension: "js".to_string(),
            template_extension: "gohtml".to_string(),
            template_dirs: vec![PathBuf::from("static")],
            programmatic_header: "X-Mach-Request".to_string(),
            enrich_templates: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl SandboxConfig {
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            static_root: self.static_root.clone(),
            story_extension: self.story_extension.clone(),
            template_extension: self.template_extension.clone(),
            enrich_templates: self.enrich_templates,
        }
    }

    /// Whether a request carrying `header_value` in the programmatic header
    /// is an in-page navigation.
    pub fn is_programmatic(&self, header_value: Option<&str>) -> bool {
        header_value == Some("true")
    }
}

/// Load configuration from an optional file plus `SANDBOX__*` environment
/// variables. A given path must exist.
pub fn load_config(path: Option<impl AsRef<Path>>) -> Result<SandboxConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<SandboxConfig>()?;

    Ok(config)
}
