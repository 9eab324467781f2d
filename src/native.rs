//! Node.js bridge.
//!
//! Exposes discovery and per-request resolution to a JavaScript host. Results
//! cross the boundary as JSON values.

use napi_derive::napi;
use std::path::Path;

use crate::config::{load_config, SandboxConfig};
use crate::discovery::discover_stories;
use crate::query::QueryParams;
use crate::render::ErrorPage;
use crate::resolve::{ContentRequest, ViewRequest};
use crate::SandboxState;

fn to_napi(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Discover stories below `components_dir`, returning the registry and warnings.
#[napi]
pub fn discover_stories_native(
    components_dir: String,
    static_root: Option<String>,
) -> napi::Result<serde_json::Value> {
    let mut options = SandboxConfig::default().discovery_options();
    if let Some(root) = static_root {
        options.static_root = root.into();
    }
    let discovery = discover_stories(Path::new(&components_dir), &options).map_err(to_napi)?;
    Ok(serde_json::json!({
        "components": serde_json::to_value(&discovery.registry).map_err(to_napi)?,
        "warnings": serde_json::to_value(&discovery.warnings).map_err(to_napi)?,
    }))
}

/// A discovered registry plus loaded templates, shared by every request.
#[napi]
pub struct Sandbox {
    state: SandboxState,
}

#[napi]
impl Sandbox {
    #[napi(constructor)]
    pub fn new(config_path: Option<String>) -> napi::Result<Self> {
        let config = load_config(config_path).map_err(to_napi)?;
        let (state, _warnings) = SandboxState::load(config).map_err(to_napi)?;
        Ok(Self { state })
    }

    #[napi]
    pub fn programmatic_header(&self) -> String {
        self.state.config.programmatic_header.clone()
    }

    #[napi]
    pub fn resolve_view(
        &self,
        component: String,
        story: Option<String>,
        query: String,
        programmatic_header: Option<String>,
    ) -> napi::Result<serde_json::Value> {
        let query = QueryParams::parse(&query);
        let request = ViewRequest {
            component: &component,
            story: story.as_deref(),
            query: &query,
            programmatic: self
                .state
                .config
                .is_programmatic(programmatic_header.as_deref()),
        };
        let resolution = self.state.resolver().resolve_view(&request);
        serde_json::to_value(resolution).map_err(to_napi)
    }

    #[napi]
    pub fn resolve_content(
        &self,
        component: String,
        story: Option<String>,
        query: String,
    ) -> napi::Result<serde_json::Value> {
        let query = QueryParams::parse(&query);
        let request = ContentRequest {
            component: &component,
            story: story.as_deref(),
            query: &query,
        };
        match self.state.resolver().resolve_content(&request) {
            Ok(frame) => serde_json::to_value(frame).map_err(to_napi),
            Err(e) => serde_json::to_value(ErrorPage::from_error(&e)).map_err(to_napi),
        }
    }

    #[napi]
    pub fn resolve_home(&self, query: String) -> napi::Result<serde_json::Value> {
        let query = QueryParams::parse(&query);
        let home = self.state.resolver().resolve_home(&query);
        serde_json::to_value(home).map_err(to_napi)
    }
}
