//! Mica compiler CLI
//!
//! Command-line interface for compiling `.mica` programs to executables
//! and running them.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use micac::BuildConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "micac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mica compiler - compile .mica programs to executables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .mica file to an executable
    Build {
        /// Input .mica source file
        input: PathBuf,

        /// Output executable path (defaults to input filename without
        /// the .mica extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the intermediate assembly file (.asm)
        #[arg(long)]
        keep_asm: bool,

        /// Path to a build configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compile and immediately run a .mica file
    Run {
        /// Input .mica source file
        input: PathBuf,

        /// Path to a build configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("micac=warn".parse().unwrap()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            keep_asm,
            config,
        } => {
            let output = output.unwrap_or_else(|| default_output(&input));
            let config = load_config(config.as_deref(), keep_asm);
            run_build(&input, &output, &config);
        }
        Commands::Run { input, config } => {
            let config = load_config(config.as_deref(), false);
            run_run(&input, &config);
        }
        Commands::Completions { shell } => {
            run_completions(shell);
        }
    }
}

/// Default output path: the input filename without its extension.
fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    PathBuf::from(stem)
}

/// Load the build configuration, folding in the `--keep-asm` flag.
fn load_config(path: Option<&Path>, keep_asm: bool) -> BuildConfig {
    let config = match path {
        Some(path) => {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("error: failed to read {}: {}", path.display(), e);
                    process::exit(1);
                }
            };
            match BuildConfig::from_toml(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            }
        }
        None => BuildConfig::default(),
    };

    if keep_asm {
        config.with_keep_asm(true)
    } else {
        config
    }
}

fn run_build(input: &Path, output: &Path, config: &BuildConfig) {
    match micac::compile_file(input, output, config) {
        Ok(()) => {
            println!("Compiled {} -> {}", input.display(), output.display());

            if config.keep_asm {
                let asm_path = output.with_extension("asm");
                if asm_path.exists() {
                    println!("Assembly saved to {}", asm_path.display());
                }
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn run_run(input: &Path, config: &BuildConfig) {
    let output = default_output(input);

    if let Err(e) = micac::compile_file(input, &output, config) {
        eprintln!("error: {}", e);
        process::exit(1);
    }

    // Run from an explicit path so the shell does not search PATH.
    let exe = if output.is_absolute() {
        output.clone()
    } else {
        Path::new(".").join(&output)
    };

    match process::Command::new(&exe).status() {
        Ok(status) => {
            process::exit(status.code().unwrap_or(1));
        }
        Err(e) => {
            eprintln!("error: failed to run {}: {}", exe.display(), e);
            process::exit(1);
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "micac", &mut io::stdout());
}
