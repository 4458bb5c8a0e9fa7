//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::HIGHLIGHT_THEME;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "htmlconverter";

/// Path argument meaning "read from standard input".
pub const STDIN_PATH: &str = "-";

/// Command-line arguments for the htmlconverter binary.
#[derive(Debug, Parser)]
#[command(
    name = "htmlconverter",
    version,
    about = "Convert source code, Markdown and Jupyter notebooks to HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "HTMLCONVERTER_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Highlight a source file as a single HTML block.
    Code(CodeArgs),
    /// Render a Markdown document to sanitised HTML.
    Markdown(InputArgs),
    /// Render a Jupyter notebook to HTML.
    Notebook(InputArgs),
    /// Print the CSS for the highlighting classes.
    Stylesheet(StylesheetArgs),
}

#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// File to convert, or `-` for standard input.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

impl InputArgs {
    pub fn is_stdin(&self) -> bool {
        self.file.as_os_str() == STDIN_PATH
    }
}

#[derive(Debug, Args, Clone)]
pub struct CodeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Language name; defaults to the file extension, then content detection.
    #[arg(long = "lexer", value_name = "NAME")]
    pub lexer: Option<String>,
}

impl CodeArgs {
    /// Explicit `--lexer` first, otherwise the input file's extension.
    pub fn lexer_hint(&self) -> Option<String> {
        self.lexer.clone().or_else(|| {
            if self.input.is_stdin() {
                return None;
            }
            self.input
                .file
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_string)
        })
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct StylesheetArgs {
    /// Override the theme used to generate the stylesheet.
    #[arg(long = "theme", value_name = "NAME")]
    pub theme: Option<String>,

    /// List the available themes instead of printing CSS.
    #[arg(long = "list-themes", action = clap::ArgAction::SetTrue)]
    pub list_themes: bool,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub highlight: HighlightSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct HighlightSettings {
    /// Theme used by the `stylesheet` command.
    pub theme: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("HTMLCONVERTER").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_logging_overrides(&cli.logging);
    if let Command::Stylesheet(args) = &cli.command {
        raw.apply_stylesheet_overrides(args);
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    highlight: RawHighlightSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_stylesheet_overrides(&mut self, overrides: &StylesheetArgs) {
        if let Some(theme) = overrides.theme.as_ref() {
            self.highlight.theme = Some(theme.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, highlight } = raw;

        let logging = build_logging_settings(logging)?;
        let highlight = build_highlight_settings(highlight)?;

        Ok(Self { logging, highlight })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_highlight_settings(
    highlight: RawHighlightSettings,
) -> Result<HighlightSettings, LoadError> {
    let theme = match highlight.theme {
        Some(theme) => {
            let trimmed = theme.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid("highlight.theme", "must not be empty"));
            }
            trimmed.to_string()
        }
        None => HIGHLIGHT_THEME.to_string(),
    };

    Ok(HighlightSettings { theme })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHighlightSettings {
    theme: Option<String>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
