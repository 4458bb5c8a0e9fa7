use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies which pipeline a source document is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Source code in any language the syntax pack knows about.
    Code,
    /// A Markdown document, optionally carrying YAML front matter.
    Markdown,
    /// A Jupyter notebook serialised as nbformat v4 JSON.
    Notebook,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Code => "code",
            DocumentKind::Markdown => "markdown",
            DocumentKind::Notebook => "notebook",
        }
    }
}

/// Conversion request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub kind: DocumentKind,
    /// Raw document text as received from the caller.
    pub source: String,
    /// Language name for code documents. Ignored for the other kinds.
    #[serde(default)]
    pub lexer_hint: Option<String>,
}

impl RenderRequest {
    pub fn new(kind: DocumentKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            lexer_hint: None,
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Self::new(DocumentKind::Code, source)
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Self::new(DocumentKind::Markdown, source)
    }

    pub fn notebook(source: impl Into<String>) -> Self {
        Self::new(DocumentKind::Notebook, source)
    }

    /// Attach a lexer hint. Blank hints are dropped so they behave like an
    /// absent hint.
    pub fn with_lexer_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        let trimmed = hint.trim();
        self.lexer_hint = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

/// Structured errors surfaced by the conversion pipelines. The display strings
/// are the exact messages callers on the other side of the C boundary see
/// after the `error: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Could not render source code (tokenization error): {detail}")]
    Tokenization { detail: String },
    #[error("Could not render source code (formatting error): {detail}")]
    Formatting { detail: String },
    #[error("Could not convert Notebook to HTML: {detail}")]
    Notebook { detail: String },
    #[error("unknown highlighting theme `{name}`")]
    UnknownTheme { name: String },
}

impl RenderError {
    pub fn tokenization(detail: impl Into<String>) -> Self {
        Self::Tokenization {
            detail: detail.into(),
        }
    }

    pub fn formatting(detail: impl Into<String>) -> Self {
        Self::Formatting {
            detail: detail.into(),
        }
    }

    pub fn notebook(detail: impl Into<String>) -> Self {
        Self::Notebook {
            detail: detail.into(),
        }
    }
}

/// Trait exposed by the conversion pipelines. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    /// Highlight `source` as a single `<pre>` block using class-based styling.
    fn code_to_html(&self, source: &str, lexer_hint: Option<&str>) -> Result<String, RenderError>;

    /// Render Markdown to sanitised HTML. Malformed Markdown never fails.
    fn markdown_to_html(&self, source: &str) -> String;

    /// Render an nbformat v4 notebook into a `<div class="notebook">` fragment.
    fn notebook_to_html(&self, source: &str) -> Result<String, RenderError>;

    fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        match request.kind {
            DocumentKind::Code => self.code_to_html(&request.source, request.lexer_hint.as_deref()),
            DocumentKind::Markdown => Ok(self.markdown_to_html(&request.source)),
            DocumentKind::Notebook => self.notebook_to_html(&request.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lexer_hint_is_treated_as_absent() {
        let request = RenderRequest::code("x = 1").with_lexer_hint("   ");
        assert_eq!(request.lexer_hint, None);

        let request = RenderRequest::code("x = 1").with_lexer_hint(" python ");
        assert_eq!(request.lexer_hint.as_deref(), Some("python"));
    }

    #[test]
    fn error_messages_match_boundary_wording() {
        assert_eq!(
            RenderError::tokenization("bad state").to_string(),
            "Could not render source code (tokenization error): bad state"
        );
        assert_eq!(
            RenderError::formatting("stack underflow").to_string(),
            "Could not render source code (formatting error): stack underflow"
        );
        assert_eq!(
            RenderError::notebook("expected value at line 1 column 1").to_string(),
            "Could not convert Notebook to HTML: expected value at line 1 column 1"
        );
    }

    #[test]
    fn document_kind_serialises_lowercase() {
        let json = serde_json::to_string(&DocumentKind::Notebook).expect("serialise");
        assert_eq!(json, "\"notebook\"");
    }
}
