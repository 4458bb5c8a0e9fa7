use std::ffi::{CStr, CString, c_char};

use htmlconverter::infra::ffi::{
    ERROR_PREFIX, codeStylesheet, convertCodeToHTML, convertMarkdownToHTML,
    convertNotebookToHTML, freeConvertedString,
};

fn take(ptr: *mut c_char) -> String {
    assert!(!ptr.is_null(), "boundary never returns null");
    // SAFETY: `ptr` was returned by the library and is released exactly once below.
    let text = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .expect("boundary output is UTF-8")
        .to_owned();
    unsafe { freeConvertedString(ptr) };
    text
}

fn c(text: &str) -> CString {
    CString::new(text).expect("test input has no interior nul")
}

#[test]
fn code_conversion_round_trips_through_c_strings() {
    let source = c("SELECT 1;");
    let hint = c("sql");
    // SAFETY: both buffers outlive the call.
    let html = take(unsafe { convertCodeToHTML(source.as_ptr(), hint.as_ptr()) });

    assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-sql\""));
    assert!(html.ends_with("</pre>"));
}

#[test]
fn code_conversion_accepts_null_hint() {
    let source = c("{\"key\": [1, 2, 3]}");
    // SAFETY: null is allowed for both arguments.
    let html = take(unsafe { convertCodeToHTML(source.as_ptr(), std::ptr::null()) });

    assert!(!html.starts_with(ERROR_PREFIX));
    assert!(html.contains("syntax-lang-json"));
}

#[test]
fn markdown_conversion_sanitises() {
    let source = c("# Hi\n\n<script>alert(1)</script><img src=x onerror=alert(1)>");
    // SAFETY: `source` outlives the call.
    let html = take(unsafe { convertMarkdownToHTML(source.as_ptr()) });

    assert!(html.contains("<h1>Hi</h1>"));
    assert!(!html.contains("<script"));
    assert!(!html.contains("onerror="));
}

#[test]
fn markdown_null_input_is_empty_document() {
    // SAFETY: null is allowed.
    let html = take(unsafe { convertMarkdownToHTML(std::ptr::null()) });
    assert_eq!(html, "");
}

#[test]
fn notebook_errors_use_prefix() {
    let source = c("This is not a valid JSON file.");
    // SAFETY: `source` outlives the call.
    let text = take(unsafe { convertNotebookToHTML(source.as_ptr()) });

    assert!(text.starts_with("error: Could not convert Notebook to HTML: "));
}

#[test]
fn notebook_success_has_no_prefix() {
    let source = c(include_str!("fixtures/single_cell.ipynb"));
    // SAFETY: `source` outlives the call.
    let html = take(unsafe { convertNotebookToHTML(source.as_ptr()) });

    assert!(html.starts_with("<div class=\"notebook\">"));
    assert!(html.ends_with("</div>"));
}

#[test]
fn stylesheet_is_exported() {
    let css = take(codeStylesheet());
    assert!(!css.starts_with(ERROR_PREFIX));
    assert!(css.contains(".syntax-"));
}
