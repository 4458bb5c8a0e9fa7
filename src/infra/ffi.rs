//! C-callable surface.
//!
//! Every exported function takes NUL-terminated UTF-8 buffers and returns a
//! newly allocated NUL-terminated buffer that the host must hand back to
//! [`freeConvertedString`]. The boundary has a single return channel, so
//! failures are returned as text starting with [`ERROR_PREFIX`].
//!
//! Decoding and encoding live here only; the pipelines work on `&str` and
//! `Result<String, RenderError>`.

use std::{
    any::Any,
    borrow::Cow,
    ffi::{CStr, CString, c_char},
    panic::{self, AssertUnwindSafe},
};

use tracing::error;

use crate::application::render::{RenderError, RenderRequest, RenderService, render_service};

/// Prefix marking a failed conversion in boundary results.
pub const ERROR_PREFIX: &str = "error: ";

/// Convert `request` and serialise the outcome with the boundary's error
/// convention. Panics are caught and reported the same way.
pub fn convert_to_boundary_text(request: &RenderRequest) -> String {
    guarded(|| render_service().render(request))
}

/// Fold a typed result into boundary text.
pub fn into_boundary_text(result: Result<String, RenderError>) -> String {
    match result {
        Ok(html) => html,
        Err(err) => format!("{ERROR_PREFIX}{err}"),
    }
}

/// # Safety
///
/// `source` and `lexer_hint` must each be null or point to a NUL-terminated
/// buffer that stays valid for the duration of the call.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn convertCodeToHTML(
    source: *const c_char,
    lexer_hint: *const c_char,
) -> *mut c_char {
    // SAFETY: forwarded from this function's contract.
    let (source, lexer_hint) = unsafe { (decode(source), decode(lexer_hint)) };
    let request = RenderRequest::code(source).with_lexer_hint(lexer_hint);
    encode(convert_to_boundary_text(&request))
}

/// # Safety
///
/// `source` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of the call.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn convertMarkdownToHTML(source: *const c_char) -> *mut c_char {
    // SAFETY: forwarded from this function's contract.
    let source = unsafe { decode(source) };
    encode(convert_to_boundary_text(&RenderRequest::markdown(source)))
}

/// # Safety
///
/// `source` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of the call.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn convertNotebookToHTML(source: *const c_char) -> *mut c_char {
    // SAFETY: forwarded from this function's contract.
    let source = unsafe { decode(source) };
    encode(convert_to_boundary_text(&RenderRequest::notebook(source)))
}

/// Stylesheet for the classes emitted by the code and Markdown converters.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "C" fn codeStylesheet() -> *mut c_char {
    encode(guarded(|| render_service().stylesheet()))
}

/// Release a buffer returned by one of the conversion functions.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this library that
/// has not been freed yet.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn freeConvertedString(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: `ptr` came from `CString::into_raw` in `encode` and is released
    // exactly once per the contract above.
    drop(unsafe { CString::from_raw(ptr) });
}

/// Borrow a host buffer as text. Null decodes to the empty string and invalid
/// UTF-8 is replaced lossily.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer valid for `'a`.
unsafe fn decode<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        return Cow::Borrowed("");
    }
    // SAFETY: non-null and NUL-terminated per the contract above.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
}

/// Hand ownership of `text` to the host. Interior NULs would truncate the
/// buffer, so they are replaced with U+FFFD first.
fn encode(text: String) -> *mut c_char {
    let text = if text.contains('\0') {
        text.replace('\0', "\u{FFFD}")
    } else {
        text
    };
    CString::new(text).unwrap_or_default().into_raw()
}

fn guarded(convert: impl FnOnce() -> Result<String, RenderError>) -> String {
    match panic::catch_unwind(AssertUnwindSafe(convert)) {
        Ok(result) => into_boundary_text(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(target = "infra::ffi", panic = %message, "conversion panicked");
            format!("{ERROR_PREFIX}Conversion panicked: {message}")
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
