use std::thread;

use htmlconverter::{
    RenderError, RenderRequest, RenderService, code_to_html, markdown_to_html, notebook_to_html,
    render_service, stylesheet, stylesheet_for_theme,
};

fn minify(html: &str) -> String {
    html.lines().map(str::trim).collect()
}

#[test]
fn code_with_known_hint_is_wrapped_in_highlight_container() {
    let html = code_to_html("fn main() {\n    println!(\"hi\");\n}\n", Some("rust"))
        .expect("rust source highlights");

    assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-rust\""));
    assert!(html.ends_with("</code></pre>"));
    assert!(html.contains("<span class=\"syntax-"));
}

#[test]
fn code_with_unknown_hint_still_renders() {
    let html = code_to_html("just some words\n", Some("definitely-not-a-language"))
        .expect("unknown hint falls back to detection");

    assert!(html.starts_with("<pre class=\"syntax-highlight"));
    assert!(html.contains("just some words"));
}

#[test]
fn code_without_hint_detects_shebang() {
    let html = code_to_html("#!/usr/bin/env python3\nprint('x')\n", None).expect("detect");
    assert!(html.contains("syntax-lang-python"));
}

#[test]
fn code_escapes_markup_in_source() {
    let html = code_to_html("<script>alert(1)</script>", Some("txt")).expect("plain text");
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn markdown_heading_and_paragraph_minify_exactly() {
    let html = markdown_to_html("# Heading\n\nText");
    assert_eq!(minify(&html), "<h1>Heading</h1><p>Text</p>");
}

#[test]
fn markdown_strips_front_matter_and_hostile_markup() {
    let html = markdown_to_html(include_str!("fixtures/hostile.md"));

    assert!(!html.contains("Injection attempts"));
    assert!(!html.contains("draft"));
    assert!(html.contains("<h1>Hostile document</h1>"));
    assert!(!html.contains("<script"));
    assert!(!html.contains("onerror="));
    assert!(!html.contains("javascript:"));
    assert!(html.contains("color: red"));
    assert!(html.contains("syntax-lang-python"));
}

#[test]
fn markdown_without_front_matter_keeps_leading_rule_content() {
    let html = markdown_to_html("Intro\n\n---\n\nmore\n");
    assert!(html.contains("<p>Intro</p>"));
    assert!(html.contains("<hr"));
    assert!(html.contains("<p>more</p>"));
}

#[test]
fn markdown_gfm_extensions_are_enabled() {
    let html = markdown_to_html(
        "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n\nhttps://example.com\n",
    );

    assert!(html.contains("<table>"));
    assert!(html.contains("<del>gone</del>"));
    assert!(html.contains("type=\"checkbox\""));
    assert!(html.contains("href=\"https://example.com\""));
}

#[test]
fn sanitising_sanitised_markdown_is_idempotent() {
    let service = render_service();
    let once = service.markdown_to_html(include_str!("fixtures/hostile.md"));
    let twice = service.sanitize(&once);
    assert_eq!(once, twice);
}

#[test]
fn notebook_single_cell_is_wrapped_in_container() {
    let html = notebook_to_html(include_str!("fixtures/single_cell.ipynb")).expect("notebook");

    assert!(html.starts_with("<div class=\"notebook\">"));
    assert!(html.ends_with("</div>"));
    assert!(html.contains("In [1]:"));
    assert!(html.contains("syntax-lang-python"));
    assert!(html.contains("hello, world"));
}

#[test]
fn notebook_invalid_json_is_an_error() {
    let err = notebook_to_html("This is not a valid JSON file.").expect_err("invalid json");

    assert!(matches!(err, RenderError::Notebook { .. }));
    assert!(
        err.to_string()
            .starts_with("Could not convert Notebook to HTML: ")
    );
}

#[test]
fn notebook_missing_cells_is_an_error() {
    let err = notebook_to_html(r#"{"metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#)
        .expect_err("cells are required");
    assert!(matches!(err, RenderError::Notebook { .. }));
}

#[test]
fn stylesheet_targets_emitted_classes() {
    let css = stylesheet().expect("default theme");
    assert!(css.contains(".syntax-"));

    let err = stylesheet_for_theme("no-such-theme").expect_err("unknown theme");
    assert!(matches!(err, RenderError::UnknownTheme { .. }));
}

#[test]
fn concurrent_conversions_match_sequential_output() {
    let markdown = "# Title\n\n```rust\nlet x = 1;\n```\n";
    let code = "def f(x):\n    return x * 2\n";
    let expected_markdown = markdown_to_html(markdown);
    let expected_code = code_to_html(code, Some("python")).expect("code");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(move || {
                let service = render_service();
                let markdown_html = service.markdown_to_html(markdown);
                let code_html = service
                    .render(&RenderRequest::code(code).with_lexer_hint("python"))
                    .expect("code");
                (markdown_html, code_html)
            })
        })
        .collect();

    for handle in handles {
        let (markdown_html, code_html) = handle.join().expect("thread completes");
        assert_eq!(markdown_html, expected_markdown);
        assert_eq!(code_html, expected_code);
    }
}
