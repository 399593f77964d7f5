//! Build configuration
//!
//! Controls how the driver turns emitted assembly into an executable: the
//! assembler and linker command lines, the output directory, and whether
//! the intermediate `.asm` file is kept. Settings can come from a TOML
//! project file; anything the file leaves out keeps its default.

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for a build: toolchain commands and artifact handling.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Assembler executable.
    pub assembler: String,
    /// Arguments passed to the assembler before the input path.
    pub assembler_args: Vec<String>,
    /// Linker executable.
    pub linker: String,
    /// Extra arguments passed to the linker.
    pub linker_args: Vec<String>,
    /// Directory for build artifacts. Defaults to the output path's own
    /// directory.
    pub output_dir: Option<PathBuf>,
    /// Keep the intermediate `.asm` file after linking.
    pub keep_asm: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            assembler: "nasm".to_string(),
            assembler_args: vec!["-f".to_string(), "win32".to_string()],
            linker: "gcc".to_string(),
            linker_args: Vec::new(),
            output_dir: None,
            keep_asm: false,
        }
    }
}

/// The optional-field shape of a `micac.toml` project file.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    assembler: Option<String>,
    assembler_args: Option<Vec<String>>,
    linker: Option<String>,
    linker_args: Option<Vec<String>>,
    output_dir: Option<PathBuf>,
    keep_asm: Option<bool>,
}

impl BuildConfig {
    pub fn new() -> Self {
        BuildConfig::default()
    }

    /// Parse a TOML project file, filling unset fields with defaults.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| format!("Invalid build config: {}", e))?;

        let mut config = BuildConfig::default();

        if let Some(assembler) = raw.assembler {
            config.assembler = assembler;
        }
        if let Some(args) = raw.assembler_args {
            config.assembler_args = args;
        }
        if let Some(linker) = raw.linker {
            config.linker = linker;
        }
        if let Some(args) = raw.linker_args {
            config.linker_args = args;
        }
        if let Some(dir) = raw.output_dir {
            config.output_dir = Some(dir);
        }
        if let Some(keep) = raw.keep_asm {
            config.keep_asm = keep;
        }

        Ok(config)
    }

    /// Keep the intermediate `.asm` file (builder pattern).
    pub fn with_keep_asm(mut self, keep: bool) -> Self {
        self.keep_asm = keep;
        self
    }

    /// Set the artifact directory (builder pattern).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}
