mod config;
mod front_matter;
mod highlight;
mod notebook;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use metrics::counter;
use once_cell::sync::Lazy;
use syntect::{dumps::from_uncompressed_data, parsing::SyntaxSet};
use tracing::{debug, warn};

use crate::application::render::types::{DocumentKind, RenderError, RenderService};

use config::{build_sanitizer, default_options};
use front_matter::strip_front_matter;
use rewrite::rewrite_ast;

pub use highlight::HIGHLIGHT_THEME;

/// Comrak-based conversion pipelines with Syntect highlighting and Ammonia
/// sanitisation. Holds only immutable state, so one instance serves every
/// caller.
pub struct HtmlConvertService {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    sanitizer: ammonia::Builder<'static>,
}

impl HtmlConvertService {
    /// Construct the converter with the bundled syntax pack and the Markdown
    /// sanitisation policy.
    fn new() -> Self {
        let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
        let syntax_set: SyntaxSet =
            from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid");

        Self {
            options: default_options(),
            syntax_set,
            sanitizer: build_sanitizer(),
        }
    }

    pub(crate) fn syntax_set(&self) -> &SyntaxSet {
        &self.syntax_set
    }

    /// Render Markdown into HTML while skipping the sanitisation stage. This is
    /// intended for diagnostics when refining sanitizer rules.
    pub fn render_unsanitized(&self, markdown: &str) -> String {
        let source = strip_front_matter(markdown);
        let arena = Arena::new();
        let root = parse_document(&arena, &source, &self.options);

        rewrite_stage(root, &self.syntax_set);
        render_html_stage(root, &self.options)
    }

    /// Apply the Markdown sanitisation policy to arbitrary HTML.
    pub fn sanitize(&self, html: &str) -> String {
        sanitize_stage(html, &self.sanitizer)
    }

    /// CSS for the fixed highlighting theme, matching the emitted class names.
    pub fn stylesheet(&self) -> Result<String, RenderError> {
        highlight::stylesheet()
    }

    /// CSS for any bundled theme.
    pub fn stylesheet_for_theme(&self, theme: &str) -> Result<String, RenderError> {
        highlight::stylesheet_for_theme(theme)
    }

    pub fn theme_names(&self) -> Vec<&'static str> {
        highlight::theme_names()
    }

    pub(crate) fn markdown_html(&self, markdown: &str) -> String {
        let unsanitized = self.render_unsanitized(markdown);
        self.sanitize(&unsanitized)
    }

    fn code_html(&self, source: &str, lexer_hint: Option<&str>) -> Result<String, RenderError> {
        let syntax = highlight::resolve_lexer(&self.syntax_set, lexer_hint, source);
        let body = highlight::highlight_code(&self.syntax_set, syntax, source)?;
        Ok(highlight::wrap_code_block(syntax, None, &body))
    }
}

static RENDER_SERVICE: Lazy<Arc<HtmlConvertService>> =
    Lazy::new(|| Arc::new(HtmlConvertService::new()));

/// Access the shared conversion service, initialised on first use.
pub fn render_service() -> Arc<HtmlConvertService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for HtmlConvertService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for HtmlConvertService {
    fn code_to_html(&self, source: &str, lexer_hint: Option<&str>) -> Result<String, RenderError> {
        record_outcome(DocumentKind::Code, self.code_html(source, lexer_hint))
    }

    fn markdown_to_html(&self, source: &str) -> String {
        counter!("htmlconverter_conversions_total", "kind" => DocumentKind::Markdown.as_str())
            .increment(1);
        self.markdown_html(source)
    }

    fn notebook_to_html(&self, source: &str) -> Result<String, RenderError> {
        record_outcome(
            DocumentKind::Notebook,
            notebook::render_notebook(self, source),
        )
    }
}

fn record_outcome(
    kind: DocumentKind,
    result: Result<String, RenderError>,
) -> Result<String, RenderError> {
    counter!("htmlconverter_conversions_total", "kind" => kind.as_str()).increment(1);
    if let Err(err) = &result {
        counter!("htmlconverter_conversion_failures_total", "kind" => kind.as_str()).increment(1);
        debug!(
            target = "application::render",
            kind = kind.as_str(),
            error = %err,
            "conversion failed"
        );
    }
    result
}

fn rewrite_stage<'a>(root: &'a AstNode<'a>, syntax_set: &SyntaxSet) {
    let outcome = rewrite_ast(root, syntax_set);
    debug!(
        target = "application::render::rewrite",
        code_blocks = outcome.code_blocks,
        degraded_blocks = outcome.degraded_blocks,
        "code blocks rewritten"
    );
}

fn render_html_stage<'a>(root: &'a AstNode<'a>, options: &comrak::Options<'static>) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail; keep whatever was produced if comrak
    // ever reports otherwise.
    if let Err(err) = format_html(root, options, &mut html) {
        warn!(
            target = "application::render",
            error = %err,
            "markdown formatting stopped early"
        );
    }
    html
}

fn sanitize_stage(html: &str, sanitizer: &ammonia::Builder<'static>) -> String {
    sanitizer.clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(html: &str) -> String {
        html.lines().map(str::trim).collect()
    }

    #[test]
    fn markdown_heading_and_paragraph() {
        let html = render_service().markdown_to_html("# Heading\n\nText");
        assert_eq!(minify(&html), "<h1>Heading</h1><p>Text</p>");
    }

    #[test]
    fn markdown_front_matter_is_excluded() {
        let html = render_service().markdown_to_html("---\nsecret: value\n---\n# Title\n");
        assert!(!html.contains("secret"));
        assert!(html.contains("<h1>Title</h1>"));
    }

    #[test]
    fn markdown_keeps_highlight_classes_after_sanitising() {
        let html = render_service().markdown_to_html("```rust\nfn main() {}\n```\n");
        assert!(html.contains("class=\"syntax-highlight syntax-lang-rust\""));
        assert!(html.contains("<span class=\"syntax-"));
    }

    #[test]
    fn unsanitized_render_keeps_raw_html() {
        let html = render_service().render_unsanitized("<div onclick=\"x()\">hi</div>\n");
        assert!(html.contains("onclick"));
        let clean = render_service().sanitize(&html);
        assert!(!clean.contains("onclick"));
    }

    #[test]
    fn code_output_is_one_pre_block() {
        let html = render_service()
            .code_to_html("const print = (text) => console.log(text);", Some("js"))
            .expect("highlight");
        assert!(html.starts_with("<pre class=\"syntax-highlight"));
        assert!(html.ends_with("</pre>"));
        assert_eq!(html.matches("<pre").count(), 1);
    }

    #[test]
    fn empty_code_renders_empty_block() {
        let html = render_service().code_to_html("", None).expect("highlight");
        assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-plain-text\""));
        assert!(html.ends_with("<code class=\"language-plain-text syntax-code\"></code></pre>"));
    }

    #[test]
    fn render_dispatches_on_kind() {
        use crate::application::render::types::RenderRequest;

        let service = render_service();
        let code = service
            .render(&RenderRequest::code("x = 1\n").with_lexer_hint("python"))
            .expect("code");
        assert!(code.contains("syntax-lang-python"));

        let markdown = service
            .render(&RenderRequest::markdown("*hi*"))
            .expect("markdown");
        assert!(markdown.contains("<em>hi</em>"));

        let notebook = service.render(&RenderRequest::notebook("nope"));
        assert!(matches!(notebook, Err(RenderError::Notebook { .. })));
    }
}
