use std::{
    fs,
    io::{self, Read, Write},
    process,
};

use htmlconverter::{
    application::{
        error::AppError,
        render::{RenderRequest, RenderService, render_service},
    },
    config::{self, InputArgs},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let output = match cli_args.command {
        config::Command::Code(args) => {
            let source = read_input(&args.input)?;
            let mut request = RenderRequest::code(source);
            if let Some(hint) = args.lexer_hint() {
                request = request.with_lexer_hint(hint);
            }
            convert(&request)?
        }
        config::Command::Markdown(args) => {
            let source = read_input(&args)?;
            convert(&RenderRequest::markdown(source))?
        }
        config::Command::Notebook(args) => {
            let source = read_input(&args)?;
            convert(&RenderRequest::notebook(source))?
        }
        config::Command::Stylesheet(args) => {
            let service = render_service();
            if args.list_themes {
                let mut names = service.theme_names().join("\n");
                names.push('\n');
                names
            } else {
                service.stylesheet_for_theme(&settings.highlight.theme)?
            }
        }
    };

    write_output(&output)
}

fn convert(request: &RenderRequest) -> Result<String, AppError> {
    info!(
        target = "htmlconverter::cli",
        kind = request.kind.as_str(),
        bytes = request.source.len(),
        "converting document"
    );
    Ok(render_service().render(request)?)
}

fn read_input(args: &InputArgs) -> Result<String, AppError> {
    if args.is_stdin() {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .map_err(|err| AppError::read(config::STDIN_PATH, err))?;
        return Ok(String::from_utf8_lossy(&buffer).into_owned());
    }

    let bytes = fs::read(&args.file).map_err(|err| AppError::read(&args.file, err))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_output(html: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(html.as_bytes()).map_err(AppError::Write)?;
    if !html.ends_with('\n') {
        stdout.write_all(b"\n").map_err(AppError::Write)?;
    }
    stdout.flush().map_err(AppError::Write)
}
