//! Conversion pipelines for source code, Markdown and notebooks.
//!
//! The pipelines are pure: they accept document text, produce deterministic
//! HTML, and surface structured errors. Turning those errors into the
//! `error: ` string convention is left to the C boundary in `infra::ffi`.

mod service;
mod types;

pub use service::{HIGHLIGHT_THEME, HtmlConvertService, render_service};
pub use types::{DocumentKind, RenderError, RenderRequest, RenderService};
