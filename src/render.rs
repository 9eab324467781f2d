//! Renderer seam and error pages.
//!
//! Template execution belongs to an external engine plugged in through
//! [`StoryRenderer`]. Its failures surface as `TemplateExecutionFailure`;
//! every request-time error can be turned into an [`ErrorPage`].

use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::error::{ErrorKind, Result, SandboxError};
use crate::resolve::ServerFrame;

/// Executes the server template for a resolved story.
pub trait StoryRenderer {
    type Error: fmt::Display;

    fn render_story(&self, frame: &ServerFrame) -> std::result::Result<String, Self::Error>;
}

/// Run the renderer, never swallowing its failure.
pub fn render_server_frame<R: StoryRenderer + ?Sized>(renderer: &R, frame: &ServerFrame) -> Result<String> {
    renderer.render_story(frame).map_err(|e| {
        error!(component = %frame.component, story = %frame.story, "template execution failed: {}", e);
        SandboxError::TemplateExecutionFailure {
            component: frame.component.clone(),
            story: frame.story.clone(),
            cause: e.to_string(),
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPage {
    pub kind: ErrorKind,
    pub status: u16,
    pub title: String,
    pub heading: String,
    pub message: String,
    pub reason: String,
}

impl ErrorPage {
    pub fn from_error(err: &SandboxError) -> Self {
        let (title, heading, message, reason) = match err {
            SandboxError::StoryNotFound { component, story } => (
                "SSR Template Error",
                "Server-Side Rendering Error",
                format!("Could not render story {} / {} using SSR.", component, story),
                "Story not found.".to_string(),
            ),
            SandboxError::ServerTemplateUnavailable {
                component,
                story,
                reason,
            } => (
                "SSR Template Error",
                "Server-Side Rendering Error",
                format!("Could not render story {} / {} using SSR.", component, story),
                reason.clone(),
            ),
            SandboxError::TemplateExecutionFailure {
                component,
                story,
                cause,
            } => (
                "SSR Execution Error",
                "Server-Side Rendering Error",
                format!(
                    "An error occurred while executing the template for story {} / {}.",
                    component, story
                ),
                cause.clone(),
            ),
            SandboxError::ComponentNotFound { component } => (
                "Component Not Found",
                "Component Not Found",
                format!("No component named {} was discovered.", component),
                "Component not found.".to_string(),
            ),
            other => (
                "Sandbox Error",
                "Sandbox Error",
                "The request could not be completed.".to_string(),
                other.to_string(),
            ),
        };

        Self {
            kind: err.kind(),
            status: err.status(),
            title: title.to_string(),
            heading: heading.to_string(),
            message,
            reason,
        }
    }

    /// Standalone HTML document for this error. Every dynamic part is escaped.
    pub fn to_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{}</title>
    <link rel="stylesheet" href="/static/styles/global.css" />
</head>
<body>
    <h1>{}</h1>
    <p>{}</p>
    <p><strong>Reason:</strong> {}</p>
</body>
</html>"#,
            escape_html(&self.title),
            escape_html(&self.heading),
            escape_html(&self.message),
            escape_html(&self.reason),
        )
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::EffectiveArgs;
    use crate::resolve::Theme;

    struct Failing;

    impl StoryRenderer for Failing {
        type Error = String;

        fn render_story(&self, _frame: &ServerFrame) -> std::result::Result<String, String> {
            Err("unexpected <eof>".to_string())
        }
    }

    fn frame() -> ServerFrame {
        ServerFrame {
            component: "button".to_string(),
            story: "Primary".to_string(),
            theme: Theme::Light,
            stylesheet: "/static/components/button/button.css".to_string(),
            args: EffectiveArgs::default(),
        }
    }

    #[test]
    fn test_renderer_failure_is_surfaced() {
        let err = render_server_frame(&Failing, &frame()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateExecutionFailure);
        let page = ErrorPage::from_error(&err);
        assert_eq!(page.status, 500);
        let html = page.to_html();
        assert!(html.contains("unexpected &lt;eof&gt;"));
        assert!(!html.contains("<eof>"));
    }

    #[test]
    fn test_template_unavailable_page() {
        let err = SandboxError::ServerTemplateUnavailable {
            component: "button".to_string(),
            story: "Primary".to_string(),
            reason: "missing".to_string(),
        };
        let page = ErrorPage::from_error(&err);
        assert_eq!(page.status, 404);
        assert_eq!(page.kind, ErrorKind::ServerTemplateUnavailable);
        assert_eq!(page.reason, "missing");
        assert!(page.message.contains("button / Primary"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
