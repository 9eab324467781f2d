//! # Sandbox Native Core
//!
//! Component-preview sandbox: discovers component stories from
//! `<name>.stories.<ext>` files and resolves, per request, which story to
//! show, in which render mode and theme, and with which arguments.
//!
//! ## Ground Rules
//!
//! 1. **Discovery runs once.** [`discover_stories`] builds an immutable
//!    [`Registry`]. A broken story file is skipped with a warning; only an
//!    unreadable components root aborts discovery.
//!
//! 2. **Argument extraction order.** markup → string → boolean → number.
//!    Each pass blanks what it consumed, so a value inside a markup or string
//!    literal is never picked up again as an argument of its own.
//!
//! 3. **Requests never write to the registry.** Selection is an index overlay
//!    ([`SelectionView`]); effective arguments always live in a fresh map.
//!
//! 4. **Server rendering needs two things.** The component must ship both
//!    templates on disk, and a template named after the story key must be
//!    loaded. Registry eligibility alone does not make `ssr` available.
//!
//! 5. **Absent booleans are false.** A boolean argument missing from the
//!    query string renders as `false`, whatever its discovered default.

use std::sync::Arc;

mod args;
mod config;
mod discovery;
mod enrich;
mod error;
mod logging;
mod merge;
mod models;
mod query;
mod render;
mod resolve;
mod templates;

#[cfg(feature = "napi")]
mod native;


pub use args::{apply_arg_types, parse_args, ParsedArgs, MARKUP_ARG};
pub use crate::config::{load_config, LoggingConfig, SandboxConfig};
pub use discovery::{
    discover_stories, title_case, Discovery, DiscoveryOptions, PENDING_TEXT_ARG, SQUARE_ARG,
};
pub use enrich::{enrich_templates, sidecar_path, ArgTypesSidecar};
pub use error::{DiscoveryWarning, ErrorKind, Result, SandboxError};
pub use logging::init_logging;
pub use merge::{coerce, merge_args, passthrough_extras, EffectiveArgs};
pub use models::{
    ArgValue, ArgumentSpec, ArgumentType, ComponentGroup, Number, Registry, StoryVariant,
};
pub use query::{build_url, QueryParams, RENDER_MODE_PARAM, THEME_PARAM};
pub use render::{escape_html, render_server_frame, ErrorPage, StoryRenderer};
pub use resolve::{
    BrowserFrame, ContentFrame, ContentRequest, FrameConfig, HomeView, ModeSwitchLink,
    NavComponent, NavStory, Redirect, RenderMode, Resolution, ResolvedView, Resolver,
    SelectionView, ServerFrame, Theme, ViewLinks, ViewRequest,
};
pub use templates::{TemplateCatalog, TemplateIndex};

#[cfg(feature = "napi")]
pub use native::{discover_stories_native, Sandbox};

/// Everything a request handler shares: configuration, the registry and the
/// loaded template names. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SandboxState {
    pub config: Arc<SandboxConfig>,
    pub registry: Arc<Registry>,
    pub templates: Arc<TemplateCatalog>,
}

impl SandboxState {
    /// Discover stories and load templates as configured. Returns the
    /// discovery warnings alongside the state.
    pub fn load(config: SandboxConfig) -> Result<(Self, Vec<DiscoveryWarning>)> {
        let discovery = discover_stories(&config.components_dir, &config.discovery_options())?;
        let extensions = [config.template_extension.as_str(), "html"];
        let templates = TemplateCatalog::load(&config.template_dirs, &extensions)?;
        let state = Self {
            config: Arc::new(config),
            registry: Arc::new(discovery.registry),
            templates: Arc::new(templates),
        };
        Ok((state, discovery.warnings))
    }

    pub fn resolver(&self) -> Resolver<'_, TemplateCatalog> {
        Resolver::new(&self.registry, &self.templates)
    }
}
