//! Validate command: run the conformance validator and render its report.

use crate::{ReportFormat, ValidateArgs, EXIT_USAGE};
use ktx_validate::{ValidateOptions, Validator};
use std::path::Path;
use std::process::ExitCode;

pub fn run(args: ValidateArgs) -> ExitCode {
    // Streaming from a pipe defeats the random-access layout checks.
    if args.input == Path::new("-") {
        eprintln!("ktx validate: reading from stdin is not supported; pass a file path");
        return ExitCode::from(EXIT_USAGE);
    }

    let validator = Validator::new(ValidateOptions {
        warnings_as_errors: args.warnings_as_errors,
        gltf_basisu: args.gltf_basisu,
    });
    let report = validator.validate_file(&args.input);

    match args.format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Json => println!("{}", report.to_json()),
        ReportFormat::MiniJson => println!("{}", report.to_mini_json()),
    }

    ExitCode::from(report.exit_code() as u8)
}
