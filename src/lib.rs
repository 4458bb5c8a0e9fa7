//! Conversion of source code, Markdown and Jupyter notebooks into HTML
//! fragments, exposed to Rust callers and, through [`infra::ffi`], to C hosts.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

pub use application::render::{
    DocumentKind, HIGHLIGHT_THEME, HtmlConvertService, RenderError, RenderRequest, RenderService,
    render_service,
};

/// Highlight `source` as a single HTML block.
///
/// `lexer_hint` names a language (name, alias or file extension); when it is
/// absent or unknown the language is detected from the content.
pub fn code_to_html(source: &str, lexer_hint: Option<&str>) -> Result<String, RenderError> {
    render_service().code_to_html(source, lexer_hint)
}

/// Render a Markdown document to sanitised HTML. Never fails.
pub fn markdown_to_html(source: &str) -> String {
    render_service().markdown_to_html(source)
}

/// Render a Jupyter notebook (nbformat 4 JSON) to HTML.
pub fn notebook_to_html(source: &str) -> Result<String, RenderError> {
    render_service().notebook_to_html(source)
}

/// CSS for the classes emitted by [`code_to_html`] and [`markdown_to_html`].
pub fn stylesheet() -> Result<String, RenderError> {
    render_service().stylesheet()
}

/// CSS for the highlighting classes using a named theme.
pub fn stylesheet_for_theme(name: &str) -> Result<String, RenderError> {
    render_service().stylesheet_for_theme(name)
}
