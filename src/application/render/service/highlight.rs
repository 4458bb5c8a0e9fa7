use once_cell::sync::Lazy;
use syntect::{
    highlighting::ThemeSet,
    html::{ClassStyle, css_for_theme_with_class_style, line_tokens_to_classed_spans},
    parsing::{ParseState, ScopeStack, ScopeStackOp, SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use tracing::debug;

use crate::application::render::types::RenderError;

/// Theme whose palette backs the generated stylesheet.
pub const HIGHLIGHT_THEME: &str = "InspiredGitHub";

pub(crate) const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

static STYLESHEET: Lazy<Result<String, RenderError>> =
    Lazy::new(|| stylesheet_for_theme(HIGHLIGHT_THEME));

/// Pick a lexer for a standalone source file: the hint wins when it names a
/// known syntax, then first-line detection, then plain text.
pub(crate) fn resolve_lexer<'a>(
    syntax_set: &'a SyntaxSet,
    hint: Option<&str>,
    source: &str,
) -> &'a SyntaxReference {
    let hint = hint.map(str::trim).filter(|token| !token.is_empty());

    if let Some(token) = hint {
        if let Some(syntax) = find_syntax(syntax_set, token) {
            debug!(
                target = "application::render::highlight",
                hint = token,
                syntax = %syntax.name,
                "lexer resolved from hint"
            );
            return syntax;
        }
        debug!(
            target = "application::render::highlight",
            hint = token,
            "lexer hint not recognised; falling back to detection"
        );
    }

    if let Some(syntax) = detect_syntax(syntax_set, source) {
        debug!(
            target = "application::render::highlight",
            syntax = %syntax.name,
            "lexer detected from content"
        );
        return syntax;
    }

    syntax_set.find_syntax_plain_text()
}

/// Pick a lexer for a fenced Markdown block. The fence language is
/// authoritative, so there is no content detection here.
pub(crate) fn resolve_fence_lexer<'a>(
    syntax_set: &'a SyntaxSet,
    language: Option<&str>,
) -> &'a SyntaxReference {
    language
        .and_then(|token| find_syntax(syntax_set, token))
        .unwrap_or_else(|| syntax_set.find_syntax_plain_text())
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn detect_syntax<'a>(syntax_set: &'a SyntaxSet, source: &str) -> Option<&'a SyntaxReference> {
    let first_line = source.lines().next()?;
    syntax_set
        .find_syntax_by_first_line(first_line)
        .or_else(|| {
            if looks_like_json(source) {
                syntax_set.find_syntax_by_token("json")
            } else {
                None
            }
        })
}

fn looks_like_json(source: &str) -> bool {
    let trimmed = source.trim_start();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(source).is_ok()
}

/// Tokenise `code` with `syntax` and emit class-based spans. The result is the
/// inner markup only; see [`wrap_code_block`] for the surrounding `<pre>`.
pub(crate) fn highlight_code(
    syntax_set: &SyntaxSet,
    syntax: &SyntaxReference,
    code: &str,
) -> Result<String, RenderError> {
    let mut code_with_newline = code.to_string();
    if !code_with_newline.is_empty() && !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut parse_state = ParseState::new(syntax);
    let mut coalescer = Coalescer::new();
    let mut writer = ClassedSpanWriter::new(CLASS_STYLE);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        let ops = parse_state
            .parse_line(line, syntax_set)
            .map_err(|err| RenderError::tokenization(err.to_string()))?;
        let ops = coalescer.coalesce(ops)?;
        writer.write_line(line, &ops)?;
    }

    Ok(writer.finish())
}

/// Wrap highlighted markup in the container every caller relies on:
/// `<pre class="syntax-highlight …">` with a nested `<code>`.
pub(crate) fn wrap_code_block(syntax: &SyntaxReference, meta: Option<&str>, body: &str) -> String {
    let language = language_slug(syntax);
    let meta_attr = meta
        .filter(|m| !m.is_empty())
        .map(|m| format!(" data-meta=\"{}\"", ammonia::clean_text(m)))
        .unwrap_or_default();

    format!(
        "<pre class=\"syntax-highlight syntax-lang-{language}\" data-language=\"{language}\"><code class=\"language-{language} syntax-code\"{meta_attr}>{body}</code></pre>"
    )
}

fn language_slug(syntax: &SyntaxReference) -> String {
    syntax
        .name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '#' | '.' | '_'))
        .collect()
}

/// CSS for the fixed highlighting theme, generated once per process.
pub(crate) fn stylesheet() -> Result<String, RenderError> {
    STYLESHEET.clone()
}

pub(crate) fn stylesheet_for_theme(name: &str) -> Result<String, RenderError> {
    let theme = THEME_SET
        .themes
        .get(name)
        .ok_or_else(|| RenderError::UnknownTheme {
            name: name.to_string(),
        })?;

    css_for_theme_with_class_style(theme, CLASS_STYLE)
        .map_err(|err| RenderError::formatting(err.to_string()))
}

/// Names of the themes [`stylesheet_for_theme`] accepts.
pub(crate) fn theme_names() -> Vec<&'static str> {
    THEME_SET.themes.keys().map(String::as_str).collect()
}

/// Drops scope operations that would split one token into two identical ones:
/// a scope closed and reopened at the same offset, or a scope opened and
/// closed again without any text in between.
struct Coalescer {
    stack: ScopeStack,
}

impl Coalescer {
    fn new() -> Self {
        Self {
            stack: ScopeStack::new(),
        }
    }

    fn coalesce(
        &mut self,
        ops: Vec<(usize, ScopeStackOp)>,
    ) -> Result<Vec<(usize, ScopeStackOp)>, RenderError> {
        let mut merged = Vec::with_capacity(ops.len());
        let mut iter = ops.into_iter().peekable();

        while let Some((index, op)) = iter.next() {
            let redundant_pair = match (&op, iter.peek()) {
                (ScopeStackOp::Pop(1), Some((next_index, ScopeStackOp::Push(scope)))) => {
                    *next_index == index && self.stack.as_slice().last() == Some(scope)
                }
                (ScopeStackOp::Push(_), Some((next_index, ScopeStackOp::Pop(1)))) => {
                    *next_index == index
                }
                _ => false,
            };

            if redundant_pair {
                iter.next();
                continue;
            }

            self.stack
                .apply(&op)
                .map_err(|err| RenderError::tokenization(err.to_string()))?;
            merged.push((index, op));
        }

        Ok(merged)
    }
}

/// Streams classed spans line by line, keeping spans that straddle line
/// boundaries open until [`ClassedSpanWriter::finish`].
struct ClassedSpanWriter {
    style: ClassStyle,
    stack: ScopeStack,
    html: String,
    open_spans: isize,
}

impl ClassedSpanWriter {
    fn new(style: ClassStyle) -> Self {
        Self {
            style,
            stack: ScopeStack::new(),
            html: String::new(),
            open_spans: 0,
        }
    }

    fn write_line(&mut self, line: &str, ops: &[(usize, ScopeStackOp)]) -> Result<(), RenderError> {
        let (formatted, delta) =
            line_tokens_to_classed_spans(line, ops, self.style, &mut self.stack)
                .map_err(|err| RenderError::formatting(err.to_string()))?;
        self.open_spans += delta;
        self.html.push_str(&formatted);
        Ok(())
    }

    fn finish(mut self) -> String {
        for _ in 0..self.open_spans.max(0) {
            self.html.push_str("</span>");
        }
        self.html
    }
}
