//! nbformat v4 document model.
//!
//! Only the fields the HTML renderer needs are modelled; everything else
//! (cell ids, attachments, widget state) is ignored during deserialisation.

use std::{borrow::Cow, collections::BTreeMap};

use serde::Deserialize;
use serde_json::Value;

/// Oldest notebook format major version the renderer understands.
pub const MIN_NBFORMAT: u32 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: NotebookMetadata,
    pub nbformat: u32,
    #[serde(default)]
    pub nbformat_minor: u32,
}

impl Notebook {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Language used for code cells: `language_info.name` first, then the
    /// kernel spec's language.
    pub fn language(&self) -> Option<&str> {
        self.metadata
            .language_info
            .as_ref()
            .and_then(|info| info.name.as_deref())
            .or_else(|| {
                self.metadata
                    .kernelspec
                    .as_ref()
                    .and_then(|spec| spec.language.as_deref())
            })
            .filter(|language| !language.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default)]
    pub kernelspec: Option<KernelSpec>,
    #[serde(default)]
    pub language_info: Option<LanguageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KernelSpec {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Code(CodeCell),
    Markdown(TextCell),
    Raw(TextCell),
}

impl Cell {
    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Code(_) => "code",
            Cell::Markdown(_) => "markdown",
            Cell::Raw(_) => "raw",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeCell {
    pub source: MultilineString,
    #[serde(default)]
    pub execution_count: Option<u32>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextCell {
    pub source: MultilineString,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream(StreamOutput),
    ExecuteResult(RichOutput),
    DisplayData(RichOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamOutput {
    pub name: String,
    pub text: MultilineString,
}

/// `execute_result` and `display_data` payload: a mime bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct RichOutput {
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(default)]
    pub execution_count: Option<u32>,
}

impl RichOutput {
    /// Text content for `mime`, joining list-of-lines values.
    pub fn text(&self, mime: &str) -> Option<String> {
        match self.data.get(mime)? {
            Value::String(text) => Some(text.clone()),
            Value::Array(lines) => lines
                .iter()
                .map(|line| line.as_str())
                .collect::<Option<Vec<_>>>()
                .map(|lines| lines.concat()),
            _ => None,
        }
    }

    pub fn json(&self, mime: &str) -> Option<&Value> {
        self.data.get(mime)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorOutput {
    pub ename: String,
    pub evalue: String,
    #[serde(default)]
    pub traceback: Vec<String>,
}

/// nbformat stores multi-line text either as one string or as a list of
/// lines that already carry their `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MultilineString {
    Single(String),
    Lines(Vec<String>),
}

impl MultilineString {
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            MultilineString::Single(text) => Cow::Borrowed(text.as_str()),
            MultilineString::Lines(lines) => Cow::Owned(lines.concat()),
        }
    }
}
