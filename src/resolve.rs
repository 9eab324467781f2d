//! Resolve Module for the Sandbox Core
//!
//! Per-request decisions: which component and story a request targets, which
//! render mode and theme apply, whether the URL must be canonicalized with a
//! redirect, and which arguments the story renders with.
//!
//! The registry is never touched. Selection is an overlay of indices into it
//! ([`SelectionView`]) and everything handed to the renderer is a fresh copy.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, Result, SandboxError};
use crate::merge::{merge_args, passthrough_extras, EffectiveArgs};
use crate::models::{ArgValue, ComponentGroup, Registry, StoryVariant};
use crate::query::{build_url, is_reserved, QueryParams, RENDER_MODE_PARAM, THEME_PARAM};
use crate::templates::TemplateIndex;

pub const VIEW_PREFIX: &str = "/sandbox";
pub const CONTENT_PREFIX: &str = "/sandbox-content";
pub const BODY_SWAP_PREFIX: &str = "/sandbox-body-swap";
/// Component name the content endpoint treats as "no component at all".
pub const FALLBACK_COMPONENT: &str = "fallback";
pub const STORY_CLIENT_SCRIPT: &str = "/static/modules/sandbox/iframe-client.js";
pub const FALLBACK_CLIENT_SCRIPT: &str = "/static/modules/sandbox/sandbox-fallback.js";
pub const HOME_TITLE: &str = "Component Playground";
/// Argument the server frame adds so templates can style per theme.
pub const THEME_ARG: &str = "Theme";

// ═══════════════════════════════════════════════════════════════════════════════
// MODES & THEMES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Csr,
    Ssr,
}

impl RenderMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "csr" => Some(Self::Csr),
            "ssr" => Some(Self::Ssr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csr => "csr",
            Self::Ssr => "ssr",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// The requested theme when recognized, else the default.
    pub fn resolve(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUESTS & RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A request for the story page, `/sandbox/<component>[/<story>]`.
#[derive(Debug, Clone, Copy)]
pub struct ViewRequest<'a> {
    pub component: &'a str,
    pub story: Option<&'a str>,
    pub query: &'a QueryParams,
    /// In-page navigation rather than a full browser load.
    pub programmatic: bool,
}

impl ViewRequest<'_> {
    fn story_key(&self) -> Option<&str> {
        self.story.filter(|s| !s.is_empty())
    }

    fn path(&self) -> String {
        match self.story_key() {
            Some(story) => format!("{}/{}/{}", VIEW_PREFIX, self.component, story),
            None => format!("{}/{}", VIEW_PREFIX, self.component),
        }
    }
}

/// Which component and story a request selected, as indices into the
/// shared registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionView {
    pub component: Option<usize>,
    pub story: Option<usize>,
}

impl SelectionView {
    pub fn none() -> Self {
        Self {
            component: None,
            story: None,
        }
    }

    pub fn is_component_selected(&self, index: usize) -> bool {
        self.component == Some(index)
    }

    pub fn is_story_selected(&self, component: usize, story: usize) -> bool {
        self.is_component_selected(component) && self.story == Some(story)
    }

    /// Request-scoped navigation listing with selection flags applied.
    pub fn navigation(&self, registry: &Registry) -> Vec<NavComponent> {
        registry
            .components()
            .iter()
            .enumerate()
            .map(|(ci, component)| NavComponent {
                name: component.name.clone(),
                title: component.title.clone(),
                selected: self.is_component_selected(ci),
                stories: component
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(si, story)| NavStory {
                        key: story.key.clone(),
                        title: story.title.clone(),
                        selected: self.is_story_selected(ci, si),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavComponent {
    pub name: String,
    pub title: String,
    pub selected: bool,
    pub stories: Vec<NavStory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavStory {
    pub key: String,
    pub title: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSwitchLink {
    pub mode: RenderMode,
    pub url: String,
    pub active: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewLinks {
    pub current_path: String,
    pub iframe_src: String,
    pub toggle_theme: String,
    pub reset_args: String,
    pub mode_switches: Vec<ModeSwitchLink>,
}

/// Everything the page renderer needs for a resolved story page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedView {
    pub page_title: String,
    pub component: String,
    pub component_title: String,
    pub story: Option<String>,
    pub mode: RenderMode,
    pub theme: Theme,
    pub available_modes: Vec<RenderMode>,
    pub ssr_available: bool,
    /// No story selected; the component's raw preview is shown.
    pub fallback: bool,
    pub programmatic: bool,
    pub args: EffectiveArgs,
    pub selection: SelectionView,
    pub navigation: Vec<NavComponent>,
    pub links: ViewLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub location: String,
    /// Why the redirect happened; `None` for a canonicalizing redirect.
    pub cause: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Resolution {
    Redirect(Redirect),
    Render(Box<ResolvedView>),
}

impl Resolution {
    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            Self::Redirect(r) => Some(&r.location),
            Self::Render(_) => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Resolver<'a, T: TemplateIndex + ?Sized> {
    registry: &'a Registry,
    templates: &'a T,
}

/// Target resolution outcome for a story page request.
enum Target<'a> {
    Story(usize, &'a StoryVariant),
    Fallback,
}

impl<'a, T: TemplateIndex + ?Sized> Resolver<'a, T> {
    pub fn new(registry: &'a Registry, templates: &'a T) -> Self {
        Self {
            registry,
            templates,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Modes a story can currently be shown in. Server rendering needs both
    /// registry eligibility and a loaded template named after the story key.
    pub fn available_modes(&self, component: &ComponentGroup, story: &StoryVariant) -> Vec<RenderMode> {
        let mut modes = Vec::new();
        if story.has_csr {
            modes.push(RenderMode::Csr);
        }
        if story.has_ssr {
            if self.templates.has_template(&story.key) {
                modes.push(RenderMode::Ssr);
            } else {
                warn!(
                    component = %component.name,
                    story = %story.key,
                    "story marked server-capable but its template is not loaded"
                );
            }
        }
        modes
    }

    /// Resolve a story page request.
    pub fn resolve_view(&self, request: &ViewRequest<'_>) -> Resolution {
        let Some((component_index, component)) = self.registry.find(request.component) else {
            info!(component = %request.component, "component not found, redirecting to root");
            return Resolution::Redirect(Redirect {
                location: "/".to_string(),
                cause: Some(ErrorKind::ComponentNotFound),
            });
        };

        let target = match request.story_key() {
            None => match component.variants.first() {
                Some(first) => Target::Story(0, first),
                None => Target::Fallback,
            },
            Some(key) => match component.variant(key) {
                Some((index, story)) => Target::Story(index, story),
                None => match component.first_variant() {
                    Some(first) => {
                        info!(component = %component.name, story = %key, "story not found, redirecting to first story");
                        let path = format!("{}/{}/{}", VIEW_PREFIX, component.name, first.key);
                        return Resolution::Redirect(Redirect {
                            location: build_url(&path, request.query),
                            cause: Some(ErrorKind::StoryNotFound),
                        });
                    }
                    None => Target::Fallback,
                },
            },
        };

        let (selection, story) = match target {
            Target::Story(index, story) => (
                SelectionView {
                    component: Some(component_index),
                    story: Some(index),
                },
                Some(story),
            ),
            Target::Fallback => (
                SelectionView {
                    component: Some(component_index),
                    story: None,
                },
                None,
            ),
        };
        let fallback = story.is_none();

        let available_modes = match story {
            Some(story) => self.available_modes(component, story),
            None => vec![RenderMode::Csr],
        };
        let ssr_available = available_modes.contains(&RenderMode::Ssr);

        let requested_mode = request.query.get_or_empty(RENDER_MODE_PARAM);
        let requested_theme = request.query.get_or_empty(THEME_PARAM);

        let honored = RenderMode::parse(requested_mode).filter(|m| available_modes.contains(m));
        let mut mode = match honored {
            Some(mode) => mode,
            None => default_mode(&available_modes, request.programmatic),
        };
        if fallback {
            mode = RenderMode::Csr;
        }
        let theme = Theme::resolve(requested_theme);

        if !request.programmatic {
            let mode_defaulted = honored.is_none() && requested_mode != mode.as_str();
            let theme_defaulted = requested_theme != theme.as_str()
                && !(requested_theme.is_empty() && theme == Theme::default());
            if mode_defaulted || theme_defaulted {
                let mut canonical = request.query.clone();
                canonical.set(RENDER_MODE_PARAM, mode.as_str());
                canonical.set(THEME_PARAM, theme.as_str());
                let location = build_url(&request.path(), &canonical);
                debug!(%location, mode_defaulted, theme_defaulted, "canonical redirect");
                return Resolution::Redirect(Redirect {
                    location,
                    cause: None,
                });
            }
        }

        let args = match story {
            Some(story) => merge_args(&story.args, request.query),
            None => passthrough_extras(request.query),
        };

        let story_key = story.map(|s| s.key.clone());
        let page_title = match story {
            Some(story) => format!("{} - {}", component.title, story.title),
            None => format!("{} - Info", component.title),
        };

        let links = view_links(
            request,
            &component.name,
            story_key.as_deref(),
            story,
            mode,
            theme,
            &available_modes,
            &args,
        );

        debug!(
            component = %component.name,
            story = ?story_key,
            %mode,
            %theme,
            ssr_available,
            programmatic = request.programmatic,
            "resolved story view"
        );

        Resolution::Render(Box::new(ResolvedView {
            page_title,
            component: component.name.clone(),
            component_title: component.title.clone(),
            story: story_key,
            mode,
            theme,
            available_modes,
            ssr_available,
            fallback,
            programmatic: request.programmatic,
            args,
            selection,
            navigation: selection.navigation(self.registry),
            links,
        }))
    }

    /// Resolve the landing page: every component listed, nothing selected.
    pub fn resolve_home(&self, query: &QueryParams) -> HomeView {
        let theme = if query.get(THEME_PARAM) == Some("dark") {
            Theme::Dark
        } else {
            Theme::Light
        };
        let body_swap = format!("{}/", BODY_SWAP_PREFIX);

        let mut toggle = query.clone();
        toggle.set(THEME_PARAM, theme.toggled().as_str());

        let iframe = QueryParams::from_pairs([
            (RENDER_MODE_PARAM, RenderMode::Csr.as_str()),
            (THEME_PARAM, theme.as_str()),
        ]);

        HomeView {
            title: HOME_TITLE.to_string(),
            theme,
            mode: RenderMode::Csr,
            navigation: SelectionView::none().navigation(self.registry),
            toggle_theme_url: build_url(&body_swap, &toggle),
            reset_args_url: build_url(&body_swap, query),
            iframe_src: build_url(
                &format!("{}/{}", CONTENT_PREFIX, FALLBACK_COMPONENT),
                &iframe,
            ),
        }
    }

    /// Resolve what the content frame for `/sandbox-content/<component>[/<story>]`
    /// should show. Failures come back as errors for an error page.
    pub fn resolve_content(&self, request: &ContentRequest<'_>) -> Result<ContentFrame> {
        let query = request.query;
        let theme = Theme::resolve(query.get_or_empty(THEME_PARAM));
        let story_key = request.story.filter(|s| !s.is_empty());

        if request.component == FALLBACK_COMPONENT {
            debug!("content request for the fallback frame");
            return Ok(ContentFrame::Browser(BrowserFrame {
                theme,
                script: FALLBACK_CLIENT_SCRIPT.to_string(),
                fallback: true,
                config: FrameConfig {
                    component_name: FALLBACK_COMPONENT.to_string(),
                    render_mode: RenderMode::Csr,
                    extra: passthrough_extras(query).extras,
                    ..FrameConfig::default()
                },
            }));
        }

        let Some((_, component)) = self.registry.find(request.component) else {
            return Err(SandboxError::ComponentNotFound {
                component: request.component.to_string(),
            });
        };
        let story = story_key.and_then(|key| component.variant(key)).map(|(_, s)| s);

        match RenderMode::parse(query.get_or_empty(RENDER_MODE_PARAM)) {
            Some(RenderMode::Csr) => Ok(ContentFrame::Browser(browser_frame(component, story, query, theme))),
            Some(RenderMode::Ssr) => {
                let Some(key) = story_key else {
                    return Err(SandboxError::StoryNotFound {
                        component: component.name.clone(),
                        story: "N/A".to_string(),
                    });
                };
                let Some(story) = story else {
                    return Err(SandboxError::StoryNotFound {
                        component: component.name.clone(),
                        story: key.to_string(),
                    });
                };
                if !story.has_ssr || !self.templates.has_template(&story.key) {
                    warn!(
                        component = %component.name,
                        story = %story.key,
                        has_ssr = story.has_ssr,
                        "server template unavailable"
                    );
                    return Err(SandboxError::ServerTemplateUnavailable {
                        component: component.name.clone(),
                        story: story.key.clone(),
                        reason: format!(
                            "SSR template definition '{}' not found or story not marked for SSR.",
                            story.key
                        ),
                    });
                }

                let mut args = merge_args(&story.args, query);
                args.values
                    .insert(THEME_ARG.to_string(), ArgValue::Text(theme.as_str().to_string()));
                Ok(ContentFrame::Server(ServerFrame {
                    component: component.name.clone(),
                    story: story.key.clone(),
                    theme,
                    stylesheet: format!("/static/components/{0}/{0}.css", component.name),
                    args,
                }))
            }
            None => Err(SandboxError::InvalidRenderMode {
                requested: query.get_or_empty(RENDER_MODE_PARAM).to_string(),
            }),
        }
    }
}

fn default_mode(available: &[RenderMode], programmatic: bool) -> RenderMode {
    if !programmatic {
        // Full page loads try server rendering; the content frame reports
        // an error page if it turns out to be unavailable.
        return RenderMode::Ssr;
    }
    if available.contains(&RenderMode::Csr) {
        RenderMode::Csr
    } else if available.contains(&RenderMode::Ssr) {
        RenderMode::Ssr
    } else {
        available.first().copied().unwrap_or(RenderMode::Csr)
    }
}

#[allow(clippy::too_many_arguments)]
fn view_links(
    request: &ViewRequest<'_>,
    component: &str,
    story_key: Option<&str>,
    story: Option<&StoryVariant>,
    mode: RenderMode,
    theme: Theme,
    available: &[RenderMode],
    args: &EffectiveArgs,
) -> ViewLinks {
    let suffix = story_key.map(|k| format!("/{}", k)).unwrap_or_default();
    let body_swap = format!("{}/{}{}", BODY_SWAP_PREFIX, component, suffix);

    let mut iframe = QueryParams::from_pairs([
        (RENDER_MODE_PARAM, mode.as_str()),
        (THEME_PARAM, theme.as_str()),
    ]);
    let forwarded = if story.is_some() {
        &args.query_values
    } else {
        &args.extras
    };
    for (name, value) in forwarded {
        iframe.set(name.as_str(), value.as_str());
    }

    let mut toggle = request.query.clone();
    toggle.set(THEME_PARAM, theme.toggled().as_str());

    let mut reset = request.query.clone();
    if let Some(story) = story {
        for name in story.args.keys() {
            reset.remove(name);
        }
    }

    let mode_switches = available
        .iter()
        .map(|&m| {
            let mut q = request.query.clone();
            q.set(RENDER_MODE_PARAM, m.as_str());
            let active = m == mode;
            let label = m.as_str().to_uppercase();
            ModeSwitchLink {
                mode: m,
                url: build_url(&body_swap, &q),
                active,
                text: if active {
                    format!("{} Active", label)
                } else {
                    format!("Switch to {}", label)
                },
            }
        })
        .collect();

    ViewLinks {
        current_path: request.path(),
        iframe_src: build_url(&format!("{}/{}{}", CONTENT_PREFIX, component, suffix), &iframe),
        toggle_theme: build_url(&body_swap, &toggle),
        reset_args: build_url(&body_swap, &reset),
        mode_switches,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOME & CONTENT FRAMES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub title: String,
    pub theme: Theme,
    pub mode: RenderMode,
    pub navigation: Vec<NavComponent>,
    pub toggle_theme_url: String,
    pub reset_args_url: String,
    pub iframe_src: String,
}

/// A request for iframe content, `/sandbox-content/<component>[/<story>]`.
#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    pub component: &'a str,
    pub story: Option<&'a str>,
    pub query: &'a QueryParams,
}

/// Configuration the browser-side sandbox script boots from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameConfig {
    pub component_name: String,
    pub render_mode: RenderMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_module_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_path: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub current_args: IndexMap<String, ArgValue>,
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            component_name: String::new(),
            render_mode: RenderMode::Csr,
            story_key: None,
            story_module_path: None,
            component_title: None,
            component_path: None,
            current_args: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserFrame {
    pub theme: Theme,
    pub script: String,
    pub fallback: bool,
    pub config: FrameConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFrame {
    pub component: String,
    pub story: String,
    pub theme: Theme,
    pub stylesheet: String,
    pub args: EffectiveArgs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ContentFrame {
    #[serde(rename = "csr")]
    Browser(BrowserFrame),
    #[serde(rename = "ssr")]
    Server(ServerFrame),
}

fn browser_frame(
    component: &ComponentGroup,
    story: Option<&StoryVariant>,
    query: &QueryParams,
    theme: Theme,
) -> BrowserFrame {
    match story {
        Some(story) => BrowserFrame {
            theme,
            script: STORY_CLIENT_SCRIPT.to_string(),
            fallback: false,
            config: FrameConfig {
                component_name: component.name.clone(),
                story_key: Some(story.key.clone()),
                story_module_path: Some(format!("/static/{}", component.path)),
                current_args: merge_args(&story.args, query).values,
                ..FrameConfig::default()
            },
        },
        None => BrowserFrame {
            theme,
            script: FALLBACK_CLIENT_SCRIPT.to_string(),
            fallback: true,
            config: FrameConfig {
                component_name: component.name.clone(),
                component_title: Some(component.title.clone()),
                component_path: Some(format!("/static/{}", component.path)),
                current_args: query
                    .iter()
                    .filter(|(key, _)| !is_reserved(key))
                    .map(|(key, value)| (key.to_string(), ArgValue::Text(value.to_string())))
                    .collect(),
                ..FrameConfig::default()
            },
        },
    }
}
