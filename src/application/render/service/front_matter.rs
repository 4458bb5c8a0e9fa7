use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

// Anchored at byte 0 only: a BOM or leading blank line keeps the block.
static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A---\n[\s\S]*?\n---\n").expect("front matter pattern is valid"));

/// Remove a leading `---` delimited YAML block, returning the input untouched
/// when there is none.
pub(crate) fn strip_front_matter(source: &str) -> Cow<'_, str> {
    FRONT_MATTER.replace(source, "")
}
