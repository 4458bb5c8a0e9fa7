use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitiser for rendered Markdown and for HTML found inside notebook outputs.
/// Permissive enough for user-generated content; keeps `class` so highlighting
/// survives and `style` after filtering each declaration.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = base_builder();

    builder.add_generic_attributes(&["style"]);
    builder.attribute_filter(|_element, attribute, value| {
        if attribute.eq_ignore_ascii_case("style") {
            sanitize_style_attribute(value).map(Cow::Owned)
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder
}

fn base_builder() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "b",
        "blockquote",
        "br",
        "caption",
        "cite",
        "code",
        "col",
        "colgroup",
        "dd",
        "del",
        "details",
        "dfn",
        "div",
        "dl",
        "dt",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "q",
        "s",
        "samp",
        "section",
        "small",
        "span",
        "strike",
        "strong",
        "sub",
        "summary",
        "sup",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "tt",
        "u",
        "ul",
        "var",
        "svg",
        "g",
        "path",
        "rect",
        "circle",
        "ellipse",
        "polygon",
        "polyline",
        "line",
        "marker",
        "defs",
        "lineargradient",
        "linearGradient",
        "stop",
        "title",
        "desc",
        "text",
        "tspan",
        "use",
        "clipPath",
        "clippath",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
        "data-footnote-backref-idx",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["title", "width", "height", "alt", "loading"]);
    builder.add_tag_attributes("code", &["data-meta", "data-language", "class"]);
    builder.add_tag_attributes("pre", &["class", "data-language"]);
    builder.add_tag_attributes("div", &["class", "data-footnotes"]);
    builder.add_tag_attributes("span", &["class"]);
    builder.add_tag_attributes("ol", &["start"]);
    builder.add_tag_attributes("details", &["open"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled", "class"]);
    builder.add_tag_attributes(
        "svg",
        &[
            "viewBox",
            "xmlns",
            "xmlns:xlink",
            "width",
            "height",
            "preserveAspectRatio",
            "version",
        ],
    );
    builder.add_tag_attributes("g", &["transform", "class", "id", "fill", "stroke"]);
    builder.add_tag_attributes(
        "path",
        &[
            "d",
            "fill",
            "stroke",
            "stroke-width",
            "stroke-linecap",
            "stroke-linejoin",
            "marker-end",
            "marker-start",
            "opacity",
            "class",
        ],
    );
    builder.add_tag_attributes(
        "rect",
        &[
            "x",
            "y",
            "width",
            "height",
            "rx",
            "ry",
            "fill",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "circle",
        &["cx", "cy", "r", "fill", "stroke", "stroke-width", "class", "opacity"],
    );
    builder.add_tag_attributes(
        "ellipse",
        &["cx", "cy", "rx", "ry", "fill", "stroke", "stroke-width", "class", "opacity"],
    );
    builder.add_tag_attributes(
        "polygon",
        &["points", "fill", "stroke", "stroke-width", "class", "opacity"],
    );
    builder.add_tag_attributes(
        "polyline",
        &["points", "fill", "stroke", "stroke-width", "class", "opacity"],
    );
    builder.add_tag_attributes(
        "line",
        &["x1", "x2", "y1", "y2", "stroke", "stroke-width", "class", "opacity"],
    );
    builder.add_tag_attributes(
        "marker",
        &["id", "refX", "refY", "orient", "markerWidth", "markerHeight", "viewBox"],
    );
    builder.add_tag_attributes(
        "text",
        &[
            "x",
            "y",
            "fill",
            "stroke",
            "stroke-width",
            "text-anchor",
            "dominant-baseline",
            "class",
            "font-size",
        ],
    );
    builder.add_tag_attributes("tspan", &["x", "y", "dx", "dy", "font-size", "fill", "class"]);
    builder.add_tag_attributes(
        "lineargradient",
        &["id", "gradientUnits", "x1", "x2", "y1", "y2"],
    );
    builder.add_tag_attributes(
        "linearGradient",
        &["id", "gradientUnits", "x1", "x2", "y1", "y2"],
    );
    builder.add_tag_attributes("stop", &["offset", "stop-color", "stop-opacity"]);
    builder.add_tag_attributes("use", &["href", "xlink:href", "x", "y", "width", "height"]);
    builder.add_tag_attributes("clipPath", &["id"]);
    builder.add_tag_attributes("clippath", &["id"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = false;
    ext.footnotes = true;
    ext.description_lists = true;
    // Front matter is stripped before parsing; see `front_matter`.
    ext.front_matter_delimiter = None;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.tasklist_classes = true;
    // Raw HTML and the highlighted code blocks pass through here and are
    // cleaned by the sanitiser afterwards.
    render.r#unsafe = true;
    render.sourcepos = false;
}

fn sanitize_style_attribute(value: &str) -> Option<String> {
    let mut sanitized = Vec::new();

    for declaration in value.split(';') {
        let decl = declaration.trim();
        if decl.is_empty() {
            continue;
        }

        if is_safe_style_declaration(decl) {
            sanitized.push(decl);
        }
    }

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized.join("; "))
    }
}

fn is_safe_style_declaration(decl: &str) -> bool {
    let lower = decl.to_ascii_lowercase();

    const FORBIDDEN_SUBSTRINGS: [&str; 6] = [
        "expression(",
        "javascript:",
        "vbscript:",
        "-moz-binding",
        "behavior:",
        "behaviour:",
    ];

    if FORBIDDEN_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return false;
    }

    if lower.contains("@import") {
        return false;
    }

    !contains_unsafe_url(&lower)
}

fn contains_unsafe_url(lower_decl: &str) -> bool {
    let mut offset = 0;

    while let Some(start) = lower_decl[offset..].find("url(") {
        let open = offset + start + 4;
        let rest = &lower_decl[open..];
        let Some(close_rel) = rest.find(')') else {
            // unterminated url(
            return true;
        };
        let close = open + close_rel;
        let target = lower_decl[open..close]
            .trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"');

        if is_unsafe_url(target) {
            return true;
        }

        offset = close + 1;
    }

    false
}

fn is_unsafe_url(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return false;
    }

    url.starts_with("data:")
        || url.starts_with("file:")
        || url.contains("javascript:")
        || url.contains("vbscript:")
}
