//! ktx - command-line tools for KTX2 containers.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

/// Exit code for command-line usage errors.
const EXIT_USAGE: u8 = 1;
/// Exit code for an invalid file.
const EXIT_INVALID_FILE: u8 = 2;

#[derive(Parser)]
#[command(name = "ktx")]
#[command(author, version, about = "KTX2 container tools")]
#[command(long_about = "
Tools for the KTX2 GPU texture container format.

Examples:
  ktx validate texture.ktx2                 # Conformance check, text report
  ktx validate --format json texture.ktx2   # Machine-readable report
  ktx validate --gltf-basisu texture.ktx2   # Also apply the glTF profile
  ktx info texture.ktx2                     # Print the container layout
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a file against the KTX2 specification
    Validate(ValidateArgs),
    /// Print header, descriptor and metadata of a file
    Info(InfoArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// File to validate
    input: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Also apply the glTF KHR_texture_basisu profile rulebook
    #[arg(long)]
    gltf_basisu: bool,

    /// Count warnings as errors
    #[arg(long)]
    warnings_as_errors: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    /// Two lines per issue
    Text,
    /// Pretty-printed JSON
    Json,
    /// JSON without optional whitespace
    MiniJson,
}

#[derive(Args)]
struct InfoArgs {
    /// Files to describe
    input: Vec<PathBuf>,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "ktx=info",
        2 => "ktx=debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if verbose > 0 {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help/version requests are not usage errors
            if e.use_stderr() {
                eprint!("{e}");
                return ExitCode::from(EXIT_USAGE);
            }
            print!("{e}");
            return ExitCode::SUCCESS;
        }
    };
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Info(args) => match commands::info::run(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("ktx info: {e:#}");
                ExitCode::from(EXIT_INVALID_FILE)
            }
        },
    }
}
