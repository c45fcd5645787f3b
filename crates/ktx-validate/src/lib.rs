//! # ktx-validate
//!
//! Conformance validator for KTX2 containers.
//!
//! The validator runs the same parse the reader in `ktx-container` does,
//! but leniently: each stage emits graded issues (warning, error, fatal)
//! with stable four-digit identifiers instead of halting on the first
//! defect. Only unrecoverable conditions, a foreign file or an
//! end-of-file mid-structure, cut the run short.
//!
//! # Example
//!
//! ```no_run
//! use ktx_validate::{ValidateOptions, Validator};
//!
//! let validator = Validator::new(ValidateOptions::default());
//! let report = validator.validate_file("texture.ktx2");
//! print!("{}", report.to_text());
//! std::process::exit(report.exit_code());
//! ```
//!
//! # Issue identifiers
//!
//! The catalogue lives in [`issue::codes`]; identifiers are stable across
//! releases and grouped by area (1000 I/O, 2000 identification, 3000
//! header, 4000 level index, 5000 infrastructure/profile, 6000 DFD,
//! 7000 metadata, 8000 SGD, 9000 system).

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod gltf;
mod report;
mod validator;

pub mod issue;

pub use issue::{Issue, IssueCode, Severity};
pub use report::{ValidationReport, REPORT_SCHEMA};
pub use validator::{ValidateOptions, Validator};
