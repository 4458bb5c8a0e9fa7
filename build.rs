use std::env;
use std::path::{Path, PathBuf};

use syntect::dumps::dump_to_uncompressed_file;
use two_face::syntax;

fn main() {
    prepare_syntax_pack().expect("failed to prepare syntax pack");

    println!("cargo:rerun-if-changed=build.rs");
}

fn prepare_syntax_pack() -> Result<(), String> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|err| err.to_string())?);
    write_syntax_pack(&out_dir)
}

fn write_syntax_pack(out_dir: &Path) -> Result<(), String> {
    // The newline variant is required by `ParseState::parse_line` callers that
    // feed lines with their trailing `\n`.
    let syntax_set = syntax::extra_newlines();
    let pack_path = out_dir.join("syntaxes.packdump");
    dump_to_uncompressed_file(&syntax_set, &pack_path)
        .map_err(|err| format!("failed to encode syntax set: {err}"))?;

    println!("cargo:rustc-env=SYNTAX_PACK_FILE={}", pack_path.display());

    Ok(())
}
