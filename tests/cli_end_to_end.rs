use std::io::Write;

use assert_cmd::Command;
use predicates::{
    prelude::PredicateBooleanExt,
    str::{contains, starts_with},
};
use tempfile::NamedTempFile;

fn input_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write input");
    file
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("htmlconverter"));
    cmd.env_remove("HTMLCONVERTER_CONFIG_FILE")
        .env_remove("HTMLCONVERTER__LOGGING__LEVEL")
        .env_remove("HTMLCONVERTER__LOGGING__JSON")
        .env_remove("HTMLCONVERTER__HIGHLIGHT__THEME")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn code_uses_file_extension_as_lexer() {
    let file = input_file(".py", "def answer():\n    return 42\n");

    cli()
        .arg("code")
        .arg(file.path())
        .assert()
        .success()
        .stdout(starts_with("<pre class=\"syntax-highlight syntax-lang-python\""));
}

#[test]
fn code_reads_stdin_with_explicit_lexer() {
    cli()
        .args(["code", "-", "--lexer", "rust"])
        .write_stdin("fn main() {}\n")
        .assert()
        .success()
        .stdout(contains("syntax-lang-rust"));
}

#[test]
fn markdown_renders_to_stdout() {
    let file = input_file(".md", "---\ntitle: hidden\n---\n# Visible\n");

    cli()
        .arg("markdown")
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("<h1>Visible</h1>"))
        .stdout(contains("hidden").not());
}

#[test]
fn invalid_notebook_fails_with_message() {
    let file = input_file(".ipynb", "This is not a valid JSON file.");

    cli()
        .arg("notebook")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(contains("Could not convert Notebook to HTML"));
}

#[test]
fn missing_input_file_fails() {
    cli()
        .args(["markdown", "/definitely/not/here.md"])
        .assert()
        .failure()
        .stderr(contains("failed to read"));
}

#[test]
fn stylesheet_honours_theme_flag() {
    cli()
        .args(["stylesheet", "--theme", "base16-ocean.dark"])
        .assert()
        .success()
        .stdout(contains(".syntax-"));

    cli()
        .args(["stylesheet", "--theme", "no-such-theme"])
        .assert()
        .failure()
        .stderr(contains("no-such-theme"));
}

#[test]
fn stylesheet_lists_themes() {
    cli()
        .args(["stylesheet", "--list-themes"])
        .assert()
        .success()
        .stdout(contains("InspiredGitHub"));
}
