//! Mica compiler library
//!
//! Compiles Mica source — a small indentation-structured imperative
//! language — to 32-bit x86 assembly text, and drives an external
//! assembler and linker to produce an executable.
//!
//! The pipeline is three single-pass stages:
//!
//! 1. [`lexer`] turns characters into tokens, with explicit layout tokens
//!    for tabs and newlines.
//! 2. [`parser`] turns tokens into an AST rooted at a [`Block`].
//! 3. [`codegen`] walks the AST and emits assembly through a
//!    stack-machine protocol.
//!
//! Use [`compile_to_asm`] for string-to-string compilation (handy for
//! tests and tooling) or [`compile_file`] for the full build.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod types;

pub use ast::{Block, Expr};
pub use codegen::CodeGen;
pub use config::BuildConfig;
pub use error::CompileError;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};
pub use types::{Ty, TypeTable};

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::debug;

/// Compile Mica source text to assembly text.
pub fn compile_to_asm(source: &str) -> Result<String, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let block = parser::parse(tokens)?;
    codegen::compile(&block)
}

/// Compile a source file to an executable.
///
/// Writes the intermediate `.asm` next to the output (or into the
/// configured artifact directory), then invokes the external assembler
/// and linker. No `.asm` is written if compilation fails.
pub fn compile_file(
    input: &Path,
    output: &Path,
    config: &BuildConfig,
) -> Result<(), String> {
    let source = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;

    let started = Instant::now();
    let asm = compile_to_asm(&source).map_err(|e| e.to_string())?;
    debug!(elapsed = ?started.elapsed(), input = %input.display(), "compiled");

    let asm_path = artifact_path(output, config, "asm")?;
    fs::write(&asm_path, asm)
        .map_err(|e| format!("Failed to write {}: {}", asm_path.display(), e))?;

    let result = assemble_and_link(&asm_path, output, config);

    if !config.keep_asm {
        fs::remove_file(&asm_path).ok();
    }

    result
}

/// Where an intermediate artifact with the given extension goes: beside
/// the output, unless the config names an artifact directory.
fn artifact_path(
    output: &Path,
    config: &BuildConfig,
    extension: &str,
) -> Result<PathBuf, String> {
    match &config.output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

            let stem = output
                .file_stem()
                .ok_or_else(|| format!("Invalid output path {}", output.display()))?;
            Ok(dir.join(stem).with_extension(extension))
        }
        None => Ok(output.with_extension(extension)),
    }
}

/// Run the external assembler, then the linker.
fn assemble_and_link(
    asm_path: &Path,
    output: &Path,
    config: &BuildConfig,
) -> Result<(), String> {
    let obj_path = asm_path.with_extension("obj");

    let assembled = Command::new(&config.assembler)
        .args(&config.assembler_args)
        .arg(asm_path)
        .arg("-o")
        .arg(&obj_path)
        .output()
        .map_err(|e| format!("Failed to run {}: {}", config.assembler, e))?;

    if !assembled.status.success() {
        return Err(format!(
            "{} failed:\n{}",
            config.assembler,
            String::from_utf8_lossy(&assembled.stderr)
        ));
    }

    let linked = Command::new(&config.linker)
        .arg(&obj_path)
        .args(&config.linker_args)
        .arg("-o")
        .arg(output)
        .output()
        .map_err(|e| format!("Failed to run {}: {}", config.linker, e))?;

    fs::remove_file(&obj_path).ok();

    if !linked.status.success() {
        return Err(format!(
            "{} failed:\n{}",
            config.linker,
            String::from_utf8_lossy(&linked.stderr)
        ));
    }

    debug!(output = %output.display(), "linked");
    Ok(())
}
