//! Error Module for the Sandbox Core
//!
//! One error type for discovery, resolution and rendering. Discovery keeps
//! going on per-file failures and collects them as [`DiscoveryWarning`]s;
//! only a root directory that cannot be walked aborts it.

use serde::Serialize;
use std::path::PathBuf;

pub type Result<T, E = SandboxError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The components root could not be walked at all.
    #[error("failed to walk components directory {}: {reason}", path.display())]
    DirectoryWalkFailure { path: PathBuf, reason: String },

    #[error("failed to read story file {}: {source}", path.display())]
    FileReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A story declaration was found but its body could not be extracted.
    #[error("incomplete story file {}: {reason}", path.display())]
    FileParseIncomplete { path: PathBuf, reason: String },

    #[error("component '{component}' not found")]
    ComponentNotFound { component: String },

    #[error("story '{story}' not found in component '{component}'")]
    StoryNotFound { component: String, story: String },

    #[error("server template '{story}' for component '{component}' is unavailable: {reason}")]
    ServerTemplateUnavailable {
        component: String,
        story: String,
        reason: String,
    },

    #[error("template execution failed for '{component}/{story}': {cause}")]
    TemplateExecutionFailure {
        component: String,
        story: String,
        cause: String,
    },

    #[error("invalid renderMode '{requested}'")]
    InvalidRenderMode { requested: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("logging initialization failed: {0}")]
    Logging(String),
}

/// Stable classification of a [`SandboxError`], handed to error-page renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    DirectoryWalkFailure,
    FileReadFailure,
    FileParseIncomplete,
    ComponentNotFound,
    StoryNotFound,
    ServerTemplateUnavailable,
    TemplateExecutionFailure,
    InvalidRenderMode,
    Config,
    Logging,
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DirectoryWalkFailure { .. } => ErrorKind::DirectoryWalkFailure,
            Self::FileReadFailure { .. } => ErrorKind::FileReadFailure,
            Self::FileParseIncomplete { .. } => ErrorKind::FileParseIncomplete,
            Self::ComponentNotFound { .. } => ErrorKind::ComponentNotFound,
            Self::StoryNotFound { .. } => ErrorKind::StoryNotFound,
            Self::ServerTemplateUnavailable { .. } => ErrorKind::ServerTemplateUnavailable,
            Self::TemplateExecutionFailure { .. } => ErrorKind::TemplateExecutionFailure,
            Self::InvalidRenderMode { .. } => ErrorKind::InvalidRenderMode,
            Self::Config(_) => ErrorKind::Config,
            Self::Logging(_) => ErrorKind::Logging,
        }
    }

    /// HTTP status an error page for this error should carry.
    pub fn status(&self) -> u16 {
        match self {
            Self::ComponentNotFound { .. }
            | Self::StoryNotFound { .. }
            | Self::ServerTemplateUnavailable { .. } => 404,
            Self::InvalidRenderMode { .. } => 400,
            _ => 500,
        }
    }
}

/// A non-fatal discovery problem. The affected file (or story) is skipped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryWarning {
    pub kind: ErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl From<&SandboxError> for DiscoveryWarning {
    fn from(err: &SandboxError) -> Self {
        let path = match err {
            SandboxError::DirectoryWalkFailure { path, .. }
            | SandboxError::FileReadFailure { path, .. }
            | SandboxError::FileParseIncomplete { path, .. } => path.clone(),
            _ => PathBuf::new(),
        };
        Self {
            kind: err.kind(),
            path,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let missing = SandboxError::ServerTemplateUnavailable {
            component: "button".to_string(),
            story: "Primary".to_string(),
            reason: "not loaded".to_string(),
        };
        assert_eq!(missing.status(), 404);
        assert_eq!(missing.kind(), ErrorKind::ServerTemplateUnavailable);

        let exec = SandboxError::TemplateExecutionFailure {
            component: "button".to_string(),
            story: "Primary".to_string(),
            cause: "boom".to_string(),
        };
        assert_eq!(exec.status(), 500);
        assert!(exec.to_string().contains("boom"));
    }

    #[test]
    fn test_warning_keeps_path() {
        let err = SandboxError::FileParseIncomplete {
            path: PathBuf::from("static/components/button/button.stories.js"),
            reason: "no body for Primary".to_string(),
        };
        let warning = DiscoveryWarning::from(&err);
        assert_eq!(warning.kind, ErrorKind::FileParseIncomplete);
        assert!(warning.path.ends_with("button.stories.js"));
    }
}
