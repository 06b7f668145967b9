//! # pdf-compare CLI
//!
//! Command-line interface for the PDF pair comparison tool.
//!
//! ## Usage
//! ```bash
//! pdf-compare compare input/from input/to output
//! pdf-compare compare input/from input/to output --html --sort --output json
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
