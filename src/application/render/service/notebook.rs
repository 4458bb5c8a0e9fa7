use base64::{Engine as _, engine::general_purpose::STANDARD};
use once_cell::sync::Lazy;
use regex::Regex;
use syntect::parsing::SyntaxReference;
use tracing::{debug, warn};

use crate::application::render::types::RenderError;
use crate::domain::notebook::{
    Cell, CodeCell, ErrorOutput, MIN_NBFORMAT, Notebook, Output, RichOutput, StreamOutput,
};

use super::{HtmlConvertService, highlight};

/// Mime types tried for rich outputs, most preferred first.
const MIME_PRIORITY: [&str; 9] = [
    "text/html",
    "image/svg+xml",
    "image/png",
    "image/jpeg",
    "image/gif",
    "text/markdown",
    "text/latex",
    "application/json",
    "text/plain",
];

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07")
        .expect("ansi escape pattern is valid")
});

/// Parse `source` as nbformat v4 JSON and render every cell. Nothing is
/// emitted unless the whole document parses.
pub(crate) fn render_notebook(
    service: &HtmlConvertService,
    source: &str,
) -> Result<String, RenderError> {
    let notebook =
        Notebook::from_json(source).map_err(|err| RenderError::notebook(err.to_string()))?;

    if notebook.nbformat < MIN_NBFORMAT {
        return Err(RenderError::notebook(format!(
            "unsupported nbformat version {}; version {MIN_NBFORMAT} or newer is required",
            notebook.nbformat
        )));
    }

    let renderer = NotebookRenderer::new(service, notebook.language());
    renderer.render(&notebook)
}

struct NotebookRenderer<'a> {
    service: &'a HtmlConvertService,
    syntax: &'a SyntaxReference,
}

impl<'a> NotebookRenderer<'a> {
    fn new(service: &'a HtmlConvertService, language: Option<&str>) -> Self {
        let syntax = highlight::resolve_fence_lexer(service.syntax_set(), language);
        debug!(
            target = "application::render::notebook",
            language = language.unwrap_or("unknown"),
            syntax = %syntax.name,
            "notebook language resolved"
        );
        Self { service, syntax }
    }

    fn render(&self, notebook: &Notebook) -> Result<String, RenderError> {
        let mut html = String::from("<div class=\"notebook\">");
        for cell in &notebook.cells {
            html.push_str(&format!("<div class=\"cell cell-{}\">", cell.kind()));
            match cell {
                Cell::Code(code) => self.render_code_cell(&mut html, code)?,
                Cell::Markdown(text) => {
                    let body = self.service.markdown_html(&text.source.text());
                    push_input(&mut html, "", "input markdown-body", &body);
                }
                Cell::Raw(text) => {
                    let body = format!("<pre>{}</pre>", escape_html(&text.source.text()));
                    push_input(&mut html, "", "input raw", &body);
                }
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
        Ok(html)
    }

    fn render_code_cell(&self, html: &mut String, cell: &CodeCell) -> Result<(), RenderError> {
        let source = cell.source.text();
        let body = highlight::highlight_code(self.service.syntax_set(), self.syntax, &source)?;
        let block = highlight::wrap_code_block(self.syntax, None, &body);
        push_input(html, &prompt("In", cell.execution_count), "input", &block);

        for output in &cell.outputs {
            let (prompt_text, kind, body) = match output {
                Output::Stream(stream) => (String::new(), "stream", render_stream(stream)),
                Output::ExecuteResult(rich) => (
                    prompt("Out", rich.execution_count.or(cell.execution_count)),
                    "execute-result",
                    self.render_rich(rich),
                ),
                Output::DisplayData(rich) => (String::new(), "display-data", self.render_rich(rich)),
                Output::Error(error) => (String::new(), "error", render_error(error)),
            };
            html.push_str(&format!(
                "<div class=\"output-wrapper\"><div class=\"output-prompt\">{prompt_text}</div><div class=\"output output-{kind}\">{body}</div></div>"
            ));
        }

        Ok(())
    }

    fn render_rich(&self, output: &RichOutput) -> String {
        MIME_PRIORITY
            .iter()
            .find_map(|mime| self.render_mime(output, mime))
            .unwrap_or_default()
    }

    fn render_mime(&self, output: &RichOutput, mime: &str) -> Option<String> {
        match mime {
            "text/html" | "image/svg+xml" => {
                let text = output.text(mime)?;
                Some(self.service.sanitize(&text))
            }
            "image/png" | "image/jpeg" | "image/gif" => render_image(mime, &output.text(mime)?),
            "text/markdown" => Some(self.service.markdown_html(&output.text(mime)?)),
            "text/latex" => Some(format!(
                "<div class=\"math\">{}</div>",
                escape_html(&output.text(mime)?)
            )),
            "application/json" => {
                let value = output.json(mime)?;
                let pretty = serde_json::to_string_pretty(value).ok()?;
                Some(format!("<pre class=\"json\">{}</pre>", escape_html(&pretty)))
            }
            "text/plain" => Some(format!(
                "<pre>{}</pre>",
                escape_html(&strip_ansi(&output.text(mime)?))
            )),
            _ => None,
        }
    }
}

fn push_input(html: &mut String, prompt_text: &str, class: &str, body: &str) {
    html.push_str(&format!(
        "<div class=\"input-wrapper\"><div class=\"input-prompt\">{prompt_text}</div><div class=\"{class}\">{body}</div></div>"
    ));
}

fn prompt(label: &str, execution_count: Option<u32>) -> String {
    match execution_count {
        Some(count) => format!("{label} [{count}]:"),
        None => format!("{label} [ ]:"),
    }
}

fn render_stream(stream: &StreamOutput) -> String {
    let name = if stream.name == "stderr" {
        "stderr"
    } else {
        "stdout"
    };
    format!(
        "<pre class=\"stream stream-{name}\">{}</pre>",
        escape_html(&strip_ansi(&stream.text.text()))
    )
}

fn render_error(error: &ErrorOutput) -> String {
    let text = if error.traceback.is_empty() {
        format!("{}: {}", error.ename, error.evalue)
    } else {
        error.traceback.join("\n")
    };
    format!("<pre class=\"traceback\">{}</pre>", escape_html(&strip_ansi(&text)))
}

fn render_image(mime: &str, payload: &str) -> Option<String> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(_) => Some(format!("<img src=\"data:{mime};base64,{compact}\" alt=\"\">")),
        Err(err) => {
            warn!(
                target = "application::render::notebook",
                mime,
                error = %err,
                "skipping image output with invalid base64 payload"
            );
            None
        }
    }
}

fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
